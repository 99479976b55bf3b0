//! `superres`: upscale a base64-encoded `.npy` image.
//!
//! ```bash
//! superres --input "$(cat image_b64.txt)" --model x2.onnx
//! superres --input-file image_b64.txt --backend tch --model x2.pt
//! superres --input-file image_b64.txt --backend bilinear
//! ```
//!
//! The encoded result goes to stdout. On any failure a `(1, 1, 128, 128)`
//! zero array is written instead and the process exits with status 1.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use superres_cli::app::{self, Reply};
use superres_cli::backend::BackendArgs;
use superres_cli::logging;
use tracing::error;

#[derive(Parser, Debug)]
#[command(
    name = "superres",
    version,
    about = "Upscale a base64-encoded .npy grayscale image by 2x"
)]
struct Args {
    /// Input base64 encoded image.
    #[arg(long)]
    input: Option<String>,

    /// File containing the input base64 encoded image; wins over --input.
    #[arg(long)]
    input_file: Option<PathBuf>,

    #[command(flatten)]
    backend: BackendArgs,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    let reply = match args.backend.resolve() {
        Ok(config) => {
            let input = app::read_input(args.input.as_deref(), args.input_file.as_deref());
            app::handle(input, &config)
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "invalid configuration");
            Reply::failure(format!("{err:#}"))
        }
    };
    if let Reply::Failure { reason, .. } = &reply {
        error!(%reason, "returning placeholder payload");
    }

    if let Err(err) = app::emit(&reply) {
        error!(error = %err, "failed to write result to stdout");
        return ExitCode::FAILURE;
    }
    reply.exit_code()
}
