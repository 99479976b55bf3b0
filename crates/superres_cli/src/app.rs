//! Decode → upscale → encode for the `superres` binary.

use std::io::{self, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use superres_core::{payload, Outcome, SuperResolution, UpscalerConfig};
use tracing::{error, info};

use crate::backend;

/// What the process writes to stdout and how it exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Success(String),
    /// The placeholder payload plus the reason it was substituted.
    Failure { payload: String, reason: String },
}

impl Reply {
    pub fn failure(reason: impl Into<String>) -> Self {
        Reply::Failure {
            payload: payload::placeholder(),
            reason: reason.into(),
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            Reply::Success(payload) | Reply::Failure { payload, .. } => payload,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Reply::Success(_) => ExitCode::SUCCESS,
            Reply::Failure { .. } => ExitCode::FAILURE,
        }
    }
}

/// Read the base64 payload. The file wins over the inline argument; with
/// neither, stdin is read.
pub fn read_input(input: Option<&str>, input_file: Option<&Path>) -> Result<String> {
    if let Some(path) = input_file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display()))?;
        return Ok(raw.trim().to_string());
    }
    if let Some(input) = input {
        return Ok(input.to_string());
    }
    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read payload from stdin")?;
    Ok(raw.trim().to_string())
}

/// Run one request end to end. Never fails: every error becomes a
/// [`Reply::Failure`] carrying the placeholder payload.
pub fn handle(input: Result<String>, config: &UpscalerConfig) -> Reply {
    let result = panic::catch_unwind(AssertUnwindSafe(|| process(input, config)))
        .unwrap_or_else(|_| Err(anyhow!("processing panicked")))
        .and_then(|outcome| match outcome {
            Outcome::Upscaled(array) => {
                let encoded = payload::encode(&array).context("failed to encode result")?;
                info!("encoded result to base64");
                Ok(Reply::Success(encoded))
            }
            Outcome::Placeholder { reason, .. } => Ok(Reply::failure(reason)),
        });
    match result {
        Ok(reply) => reply,
        Err(err) => {
            error!(error = %format!("{err:#}"), "error in processing");
            Reply::failure(format!("{err:#}"))
        }
    }
}

fn process(input: Result<String>, config: &UpscalerConfig) -> Result<Outcome> {
    let input = input?;
    info!("processing input data");
    let image = payload::decode(&input).context("failed to decode input payload")?;
    info!(shape = ?image.shape(), "decoded input array");

    // A backend that cannot be loaded counts as an inference failure.
    let outcome = match backend::load(config) {
        Ok(upscaler) => SuperResolution::new(upscaler).run(&image),
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to load upscaler, substituting placeholder");
            Outcome::placeholder(format!("{err:#}"))
        }
    };
    info!(shape = ?outcome.array().shape(), "result array");
    Ok(outcome)
}

/// Write the payload to stdout and flush.
pub fn emit(reply: &Reply) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(reply.payload().as_bytes())?;
    stdout.flush()
}
