use crate::common::*;
use matrix_util::common_io::{first_existing_file, read_all_bytes};

/// Magic number of an IDX file holding unsigned bytes in three dimensions
const IDX3_UBYTE_MAGIC: u32 = 0x0000_0803;

const IDX_HEADER_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Mnist,
    FashionMnist,
}

impl ImageSource {
    pub fn dir_name(&self) -> &'static str {
        match self {
            ImageSource::Mnist => "mnist",
            ImageSource::FashionMnist => "fashion_mnist",
        }
    }

    /// Candidate locations of the held-out images under `data_dir`
    pub fn test_image_files(&self, data_dir: &str) -> Vec<String> {
        let dir = format!("{}/{}", data_dir, self.dir_name());
        [
            "t10k-images-idx3-ubyte",
            "t10k-images-idx3-ubyte.gz",
            "t10k-images.idx3-ubyte",
        ]
        .iter()
        .map(|f| format!("{}/{}", dir, f))
        .collect()
    }
}

/// Load the held-out split of an image collection as an `n x (rows * cols)`
/// matrix of raw pixel values in `[0, 255]`
pub fn load_test_images(source: ImageSource, data_dir: &str) -> anyhow::Result<Array2<f64>> {
    let candidates = source.test_image_files(data_dir);
    let file = first_existing_file(&candidates).ok_or(anyhow::anyhow!(
        "no {} test images found, tried {}",
        source.dir_name(),
        candidates.join(", ")
    ))?;

    info!("Reading {}", file);
    let bytes = read_all_bytes(&file)?;
    let images = parse_idx_images(&bytes)?;
    info!("Read {} images of {} pixels", images.nrows(), images.ncols());
    Ok(images)
}

fn read_be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Decode an `idx3-ubyte` payload
pub fn parse_idx_images(bytes: &[u8]) -> anyhow::Result<Array2<f64>> {
    if bytes.len() < IDX_HEADER_LEN {
        anyhow::bail!("IDX header is truncated ({} bytes)", bytes.len());
    }

    let magic = read_be_u32(bytes, 0);
    if magic != IDX3_UBYTE_MAGIC {
        anyhow::bail!("unexpected IDX magic number {:#010x}", magic);
    }

    let nimg = read_be_u32(bytes, 4) as usize;
    let nrow = read_be_u32(bytes, 8) as usize;
    let ncol = read_be_u32(bytes, 12) as usize;
    let (npix, total) = match nrow
        .checked_mul(ncol)
        .and_then(|npix| npix.checked_mul(nimg).map(|total| (npix, total)))
    {
        Some(x) => x,
        None => anyhow::bail!("IDX dimensions {} x {} x {} overflow", nimg, nrow, ncol),
    };

    let payload = &bytes[IDX_HEADER_LEN..];
    if payload.len() != total {
        anyhow::bail!(
            "IDX payload has {} bytes, expected {} x {} x {}",
            payload.len(),
            nimg,
            nrow,
            ncol
        );
    }

    let pixels: Vec<f64> = payload.iter().map(|&p| p as f64).collect();
    Ok(Array2::from_shape_vec((nimg, npix), pixels)?)
}
