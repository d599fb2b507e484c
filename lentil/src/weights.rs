//! Pretrained network weights stored by Keras in HDF5 files.
//!
//! Each layer is a group holding `kernel:0` of shape `(in, out)` and,
//! optionally, `bias:0` of length `out`. Kernels are transposed on load
//! so that a layer computes `W z` with `W` of shape `(out, in)`.

use crate::common::*;

#[derive(Debug, Clone, Default)]
pub struct LayerWeights {
    /// layer group names, in reading order
    pub names: Vec<String>,
    /// `out x in` weight matrices
    pub weights: Vec<Array2<f64>>,
    /// empty if any of the layers has no bias
    pub biases: Vec<Array1<f64>>,
}

impl LayerWeights {
    pub fn shapes(&self) -> Vec<(usize, usize)> {
        self.weights.iter().map(|w| w.dim()).collect()
    }
}

pub fn vae_weights_file(weights_dir: &str, kind: &str, id: &str) -> String {
    format!("{}/vae_weights/{}/vae_{}_{}.h5", weights_dir, kind, kind, id)
}

pub fn gan_weights_file(weights_dir: &str, kind: &str, id: &str) -> String {
    format!("{}/gan_weights/{}/gan_{}_{}.hdf5", weights_dir, kind, kind, id)
}

/// Decoder layers of a variational auto-encoder
pub fn load_decoder_weights(weights_dir: &str, kind: &str, id: &str) -> anyhow::Result<LayerWeights> {
    let file_name = vae_weights_file(weights_dir, kind, id);
    let file = hdf5::File::open(&file_name)
        .map_err(|e| anyhow::anyhow!("unable to open {}: {}", file_name, e))?;
    let decoder = file.group("decoder")?;
    let ret = read_layer_group(&decoder)?;
    info!("VAE weights loaded: {:?}", ret.shapes());
    Ok(ret)
}

/// Generator layers of a generative adversarial network
pub fn load_generator_weights(
    weights_dir: &str,
    kind: &str,
    id: &str,
) -> anyhow::Result<LayerWeights> {
    let file_name = gan_weights_file(weights_dir, kind, id);
    let file = hdf5::File::open(&file_name)
        .map_err(|e| anyhow::anyhow!("unable to open {}: {}", file_name, e))?;
    let generator = file.group("model_weights/sequential_1")?;
    let ret = read_layer_group(&generator)?;
    info!("GAN weights loaded: {:?}", ret.shapes());
    Ok(ret)
}

fn read_matrix(dataset: &hdf5::Dataset) -> anyhow::Result<Array2<f64>> {
    let shape = dataset.shape();
    if shape.len() != 2 {
        anyhow::bail!("expected a matrix, found shape {:?}", shape);
    }
    let values = dataset.read_raw::<f64>()?;
    Ok(Array2::from_shape_vec((shape[0], shape[1]), values)?)
}

/// Read every layer group of `group` in name order
pub fn read_layer_group(group: &hdf5::Group) -> anyhow::Result<LayerWeights> {
    let mut names = group.member_names()?;
    names.sort();

    let mut weights = Vec::with_capacity(names.len());
    let mut biases = Vec::with_capacity(names.len());
    let mut has_biases = true;

    for name in names.iter() {
        let layer = group.group(name)?;
        let kernel = read_matrix(&layer.dataset("kernel:0")?)?;
        debug!("{}: kernel {:?}", name, kernel.dim());
        weights.push(kernel.t().to_owned());

        match layer.dataset("bias:0") {
            Ok(bias) if has_biases => {
                biases.push(Array1::from_vec(bias.read_raw::<f64>()?));
            }
            _ => has_biases = false,
        }
    }

    if !has_biases {
        warn!("no biases");
        biases.clear();
    }

    Ok(LayerWeights {
        names,
        weights,
        biases,
    })
}
