//! `enhance`: gaussian smoothing, 2x super-resolution and CLAHE on an image file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use superres_cli::backend::{self, BackendArgs};
use superres_cli::logging;
use superres_cli::pipeline::{self, EnhanceOptions};
use superres_core::preprocess::ClaheParams;
use superres_core::SuperResolution;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "enhance",
    version,
    about = "Smooth, upscale and contrast-enhance a grayscale image"
)]
struct Args {
    /// Input image (TIFF, PNG or JPEG); color images are converted to grayscale.
    #[arg(short, long)]
    image: PathBuf,

    /// Output image; 16-bit grayscale, format taken from the extension.
    #[arg(short, long)]
    output: PathBuf,

    /// Also write the enhanced array as .npy.
    #[arg(long)]
    npy: Option<PathBuf>,

    /// Gaussian sigma applied before upscaling.
    #[arg(long, default_value_t = 0.5)]
    sigma: f32,

    /// CLAHE clip limit as a fraction of tile pixels.
    #[arg(long, default_value_t = 0.01)]
    clip_limit: f32,

    /// CLAHE tile size in pixels (defaults to 1/8 of each dimension).
    #[arg(long)]
    kernel_size: Option<usize>,

    #[command(flatten)]
    backend: BackendArgs,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = args.backend.resolve()?;
    let sr = SuperResolution::new(backend::load(&config).context("failed to load upscaler")?);

    info!(image = %args.image.display(), "reading input image");
    let image = pipeline::load_gray(&args.image)?;
    info!(shape = ?image.dim(), "loaded grayscale image");

    let options = EnhanceOptions {
        sigma: args.sigma,
        clahe: ClaheParams {
            clip_limit: args.clip_limit,
            kernel_size: args.kernel_size.map(|k| (k, k)),
            ..ClaheParams::default()
        },
    };
    let enhanced = pipeline::enhance(&image, &sr, &options)?;

    pipeline::save_gray(&enhanced, &args.output)?;
    info!(output = %args.output.display(), "wrote enhanced image");
    if let Some(path) = &args.npy {
        pipeline::save_npy(&enhanced, path)?;
        info!(output = %path.display(), "wrote enhanced array");
    }
    Ok(())
}
