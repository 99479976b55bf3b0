//! `tobase64`: encode an `.npy` or image file as a `superres` payload.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use superres_cli::{logging, pipeline};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "tobase64",
    version,
    about = "Encode an .npy array or a grayscale image as a base64 payload"
)]
struct Args {
    /// `.npy` file, or an image (TIFF, PNG or JPEG) to load as grayscale.
    input: PathBuf,

    /// Write the payload here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let encoded = pipeline::encode_file(&args.input)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &encoded)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(output = %path.display(), "wrote payload");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(encoded.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
