use clap::{Args, ValueEnum};
use lentil::weights::*;

#[derive(ValueEnum, Clone, Debug, PartialEq)]
#[clap(rename_all = "lowercase")]
pub enum WeightKind {
    /// decoder of a variational auto-encoder (`.h5`)
    Vae,
    /// generator of a generative adversarial network (`.hdf5`)
    Gan,
}

#[derive(Args, Debug)]
pub struct InspectWeightsArgs {
    /// Network family
    #[arg(long, short, value_enum, default_value = "vae")]
    kind: WeightKind,

    /// Dataset the network was trained on, e.g. `mnist`
    #[arg(long = "type", short)]
    data_type: Box<str>,

    /// Network identifier, e.g. `20_relu_400_sigmoid_784_bias`
    #[arg(long)]
    id: Box<str>,

    /// Root of the weight files
    #[arg(long, short, default_value = "GAN_VAE_weights")]
    weights_dir: Box<str>,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

pub fn run_inspect_weights(args: &InspectWeightsArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let layers = match args.kind {
        WeightKind::Vae => load_decoder_weights(&args.weights_dir, &args.data_type, &args.id)?,
        WeightKind::Gan => load_generator_weights(&args.weights_dir, &args.data_type, &args.id)?,
    };

    for (k, (name, w)) in layers.names.iter().zip(layers.weights.iter()).enumerate() {
        let bias = layers
            .biases
            .get(k)
            .map(|b| b.len().to_string())
            .unwrap_or("-".to_string());
        println!("{}\t{} x {}\tbias {}", name, w.nrows(), w.ncols(), bias);
    }
    Ok(())
}
