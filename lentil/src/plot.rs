use crate::common::*;
use image::{GrayImage, Luma};
use matrix_util::common_io::mkdir;

/// Each pixel of a 28 x 28 image becomes a `PIXEL_SCALE` square
pub const PIXEL_SCALE: u32 = 8;

/// Gap between panels, in output pixels
const PANEL_GAP: u32 = 4;

/// Grey level of an entry `v` in `[lo, hi]`, dark for large values
fn grey_level(v: f64, lo: f64, hi: f64) -> u8 {
    if !(hi > lo) || !v.is_finite() {
        return 255;
    }
    let t = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);
    255 - (t * 255.0).round() as u8
}

fn min_max(x: &Array1<f64>) -> (f64, f64) {
    x.iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

fn check_image_size(x: &Array1<f64>) -> anyhow::Result<()> {
    if x.len() != IMAGE_SIZE {
        anyhow::bail!(
            "only {} x {} images can be drawn, got a vector of size {}",
            IMAGE_SIDE,
            IMAGE_SIDE,
            x.len()
        );
    }
    Ok(())
}

/// Draw `x` as a min-max scaled panel with its top-left corner at `(x0, y0)`
fn draw_panel(canvas: &mut GrayImage, x: &Array1<f64>, x0: u32, y0: u32, scale: u32) {
    let (lo, hi) = min_max(x);
    let side = IMAGE_SIDE as u32;
    for (k, &v) in x.iter().enumerate() {
        let (row, col) = (k as u32 / side, k as u32 % side);
        let level = Luma([grey_level(v, lo, hi)]);
        for dy in 0..scale {
            for dx in 0..scale {
                canvas.put_pixel(x0 + col * scale + dx, y0 + row * scale + dy, level);
            }
        }
    }
}

/// Lay out `panels` on a `nrow x ncol` grid
pub fn panel_grid(panels: &[&Array1<f64>], nrow: u32, ncol: u32) -> anyhow::Result<GrayImage> {
    if panels.len() as u32 > nrow * ncol {
        anyhow::bail!("{} panels do not fit a {} x {} grid", panels.len(), nrow, ncol);
    }
    for x in panels {
        check_image_size(x)?;
    }

    let cell = IMAGE_SIDE as u32 * PIXEL_SCALE;
    let width = ncol * cell + (ncol + 1) * PANEL_GAP;
    let height = nrow * cell + (nrow + 1) * PANEL_GAP;
    let mut canvas = GrayImage::from_pixel(width, height, Luma([255]));

    for (k, x) in panels.iter().enumerate() {
        let (r, c) = (k as u32 / ncol, k as u32 % ncol);
        let x0 = PANEL_GAP + c * (cell + PANEL_GAP);
        let y0 = PANEL_GAP + r * (cell + PANEL_GAP);
        draw_panel(&mut canvas, x, x0, y0, PIXEL_SCALE);
    }
    Ok(canvas)
}

fn save_png(canvas: &GrayImage, file: &str) -> anyhow::Result<()> {
    mkdir(file)?;
    canvas
        .save(file)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {}", file, e))?;
    info!("Wrote {}", file);
    Ok(())
}

/// Truth, observation and estimate side by side
pub fn save_truth_vs_prediction(
    file: &str,
    truth: &Array1<f64>,
    observed: &Array1<f64>,
    estimate: &Array1<f64>,
) -> anyhow::Result<()> {
    let canvas = panel_grid(&[truth, observed, estimate], 1, 3)?;
    save_png(&canvas, file)
}

/// Up to `grid x grid` prior samples
pub fn save_sample_grid(file: &str, samples: &[Array1<f64>], grid: u32) -> anyhow::Result<()> {
    let panels: Vec<&Array1<f64>> = samples.iter().take((grid * grid) as usize).collect();
    let canvas = panel_grid(&panels, grid, grid)?;
    save_png(&canvas, file)
}

/// A signal next to its observation
pub fn save_signal_and_observation(
    file: &str,
    x: &Array1<f64>,
    observed: &Array1<f64>,
) -> anyhow::Result<()> {
    let canvas = panel_grid(&[x, observed], 1, 2)?;
    save_png(&canvas, file)
}

/// A single image
pub fn save_signal(file: &str, x: &Array1<f64>) -> anyhow::Result<()> {
    let canvas = panel_grid(&[x], 1, 1)?;
    save_png(&canvas, file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grey_levels_are_inverted() {
        assert_eq!(grey_level(0.0, 0.0, 1.0), 255);
        assert_eq!(grey_level(1.0, 0.0, 1.0), 0);
        assert_eq!(grey_level(3.0, 3.0, 3.0), 255);
    }

    #[test]
    fn grid_layout() -> anyhow::Result<()> {
        let x = Array1::from_shape_fn(IMAGE_SIZE, |i| i as f64);
        let canvas = panel_grid(&[&x, &x], 1, 3)?;
        let cell = IMAGE_SIDE as u32 * PIXEL_SCALE;
        assert_eq!(canvas.width(), 3 * cell + 4 * PANEL_GAP);
        assert_eq!(canvas.height(), cell + 2 * PANEL_GAP);
        // first pixel is the minimum, last one the maximum
        assert_eq!(canvas.get_pixel(PANEL_GAP, PANEL_GAP)[0], 255);
        assert_eq!(canvas.get_pixel(PANEL_GAP + cell - 1, PANEL_GAP + cell - 1)[0], 0);

        assert!(panel_grid(&[&Array1::zeros(10)], 1, 1).is_err());
        Ok(())
    }

    #[test]
    fn signal_and_observation_png() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("pair").join("x.png");
        let file = file.to_str().ok_or(anyhow::anyhow!("path"))?;
        let x = Array1::from_shape_fn(IMAGE_SIZE, |i| (i % 28) as f64);
        save_signal_and_observation(file, &x, &(-&x))?;

        let img = image::open(file)?.to_luma8();
        let cell = IMAGE_SIDE as u32 * PIXEL_SCALE;
        assert_eq!(img.width(), 2 * cell + 3 * PANEL_GAP);
        assert_eq!(img.height(), cell + 2 * PANEL_GAP);
        Ok(())
    }
}
