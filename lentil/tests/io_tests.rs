use flate2::write::GzEncoder;
use flate2::Compression;
use lentil::common::*;
use lentil::datasets::{load_test_images, ImageSource};
use lentil::experiment::Experiment;
use lentil::params::*;
use lentil::prior::VAE_BIAS_ID;
use lentil::weights::*;
use matrix_util::traits::SampleOps;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::path::Path;

/// Keras layout: `kernel:0` is `in x out`
fn write_layer(
    parent: &hdf5::Group,
    name: &str,
    n_in: usize,
    n_out: usize,
    with_bias: bool,
    rng: &mut StdRng,
) -> anyhow::Result<()> {
    let layer = parent.create_group(name)?;
    let kernel = Array2::<f64>::rnorm_with(n_in, n_out, rng) * 0.05;
    let values: Vec<f64> = kernel.iter().cloned().collect();
    layer
        .new_dataset::<f64>()
        .shape((n_in, n_out))
        .create("kernel:0")?
        .write_raw(&values)?;
    if with_bias {
        let bias = vec![0.1; n_out];
        layer
            .new_dataset::<f64>()
            .shape(n_out)
            .create("bias:0")?
            .write_raw(&bias)?;
    }
    Ok(())
}

fn write_vae(weights_dir: &Path, kind: &str, id: &str, with_bias: bool) -> anyhow::Result<()> {
    let file = vae_weights_file(weights_dir.to_str().unwrap(), kind, id);
    std::fs::create_dir_all(Path::new(&file).parent().unwrap())?;
    let h5 = hdf5::File::create(&file)?;
    let decoder = h5.create_group("decoder")?;
    let mut rng = StdRng::seed_from_u64(1);
    write_layer(&decoder, "dense_1", 20, 400, with_bias, &mut rng)?;
    write_layer(&decoder, "dense_2", 400, IMAGE_SIZE, with_bias, &mut rng)?;
    Ok(())
}

#[test]
fn decoder_weights_are_transposed() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_vae(dir.path(), "mnist", VAE_BIAS_ID, true)?;

    let layers = load_decoder_weights(dir.path().to_str().unwrap(), "mnist", VAE_BIAS_ID)?;
    assert_eq!(layers.names, vec!["dense_1", "dense_2"]);
    assert_eq!(layers.shapes(), vec![(400, 20), (IMAGE_SIZE, 400)]);
    assert_eq!(layers.biases.len(), 2);
    assert_eq!(layers.biases[1].len(), IMAGE_SIZE);
    Ok(())
}

#[test]
fn missing_biases_give_an_empty_list() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let id = "20_relu_400_sigmoid_784";
    write_vae(dir.path(), "fashion_mnist", id, false)?;

    let layers = load_decoder_weights(dir.path().to_str().unwrap(), "fashion_mnist", id)?;
    assert_eq!(layers.weights.len(), 2);
    assert!(layers.biases.is_empty());
    Ok(())
}

#[test]
fn generator_weights_live_under_model_weights() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = gan_weights_file(dir.path().to_str().unwrap(), "mnist", "7");
    std::fs::create_dir_all(Path::new(&file).parent().unwrap())?;
    {
        let h5 = hdf5::File::create(&file)?;
        let generator = h5.create_group("model_weights")?.create_group("sequential_1")?;
        let mut rng = StdRng::seed_from_u64(2);
        write_layer(&generator, "dense_a", 10, 30, true, &mut rng)?;
        write_layer(&generator, "dense_b", 30, 50, true, &mut rng)?;
    }

    let layers = load_generator_weights(dir.path().to_str().unwrap(), "mnist", "7")?;
    assert_eq!(layers.names, vec!["dense_a", "dense_b"]);
    assert_eq!(layers.shapes(), vec![(30, 10), (50, 30)]);
    Ok(())
}

#[test]
fn vae_prior_from_weight_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_vae(dir.path(), "mnist", VAE_BIAS_ID, true)?;

    let config = ExperimentConfig {
        model: ModelParams::Denoising { n: IMAGE_SIZE },
        prior: PriorParams::Vae {
            kind: "mnist".to_string(),
            id: VAE_BIAS_ID.to_string(),
        },
        delta: 0.1,
        seed: 3,
        weights_dir: dir.path().to_str().unwrap().to_string(),
        ..Default::default()
    };
    let mut experiment = Experiment::setup(config)?;
    assert_eq!(
        experiment.variable_ids(),
        &["z_0", "Wz_1", "Wz_2", "z_1", "z_2", "b_1", "b_2", "x"]
    );
    assert_eq!(experiment.model().num_variables(), 8);

    // hard tanh keeps every prior sample in [-1, 1]
    let samples = experiment.sample_prior(3);
    assert!(samples
        .iter()
        .all(|x| x.len() == IMAGE_SIZE && x.iter().all(|v| v.abs() <= 1.0)));
    Ok(())
}

#[test]
fn vae_with_biases_rejects_a_bias_free_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_vae(dir.path(), "mnist", VAE_BIAS_ID, false)?;

    let config = ExperimentConfig {
        model: ModelParams::Denoising { n: IMAGE_SIZE },
        prior: PriorParams::Vae {
            kind: "mnist".to_string(),
            id: VAE_BIAS_ID.to_string(),
        },
        seed: 3,
        weights_dir: dir.path().to_str().unwrap().to_string(),
        ..Default::default()
    };
    assert!(Experiment::setup(config).is_err());
    Ok(())
}

fn write_idx_gz(file: &Path, images: &[Vec<u8>]) -> anyhow::Result<()> {
    std::fs::create_dir_all(file.parent().unwrap())?;
    let mut encoder = GzEncoder::new(std::fs::File::create(file)?, Compression::default());
    for x in [2051u32, images.len() as u32, 28, 28] {
        encoder.write_all(&x.to_be_bytes())?;
    }
    for img in images {
        encoder.write_all(img)?;
    }
    encoder.finish()?;
    Ok(())
}

#[test]
fn image_data_from_gzipped_idx() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let images: Vec<Vec<u8>> = (0..3u8)
        .map(|k| (0..IMAGE_SIZE).map(|i| (i as u8) ^ k.wrapping_mul(37)).collect())
        .collect();
    write_idx_gz(
        &dir.path().join("mnist").join("t10k-images-idx3-ubyte.gz"),
        &images,
    )?;

    let data_dir = dir.path().to_str().unwrap();
    let loaded = load_test_images(ImageSource::Mnist, data_dir)?;
    assert_eq!(loaded.dim(), (3, IMAGE_SIZE));
    assert_eq!(loaded[[2, 5]], images[2][5] as f64);
    assert!(load_test_images(ImageSource::FashionMnist, data_dir).is_err());

    let config = ExperimentConfig {
        model: ModelParams::Denoising { n: IMAGE_SIZE },
        data: DataParams::Mnist,
        delta: 0.0,
        seed: 2,
        data_dir: data_dir.to_string(),
        ..Default::default()
    };
    let experiment = Experiment::setup(config.clone())?;
    let truth = experiment.truth();
    approx::assert_abs_diff_eq!(
        truth.x[5],
        2.0 * images[2][5] as f64 / 255.0 - 1.0,
        epsilon = 1e-12
    );
    let x_spec = truth.x_spec.as_ref().unwrap();
    approx::assert_abs_diff_eq!(x_spec.dot(x_spec), IMAGE_SIZE as f64, epsilon = 1e-8);
    assert!(experiment.observation_spec().is_some());

    let out_of_range = ExperimentConfig { seed: 3, ..config };
    assert!(Experiment::setup(out_of_range).is_err());
    Ok(())
}
