//! Backend selection shared by both binaries.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use superres_core::{BackendKind, InterpolationUpscaler, Upscaler, UpscalerConfig};
use superres_tch::TchUpscaler;
use superres_tract::TractUpscaler;
use tracing::info;

#[derive(Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// Upscaling backend: tract (ONNX), tch (TorchScript), nearest or bilinear.
    #[arg(short, long)]
    pub backend: Option<BackendKind>,

    /// Model file for the tract or tch backend.
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// JSON file with upscaler settings; flags given here take precedence.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Never use CUDA, even when available.
    #[arg(long)]
    pub cpu: bool,
}

impl BackendArgs {
    /// Merge the optional config file with the command-line overrides.
    pub fn resolve(&self) -> Result<UpscalerConfig> {
        let mut config = match &self.config {
            Some(path) => UpscalerConfig::from_json_file(path)?,
            None => UpscalerConfig::default(),
        };
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(model) = &self.model {
            config.model_path = Some(model.clone());
        }
        if self.cpu {
            config.use_cuda = false;
        }
        Ok(config)
    }
}

/// Build the upscaler the config asks for.
pub fn load(config: &UpscalerConfig) -> Result<Box<dyn Upscaler>> {
    let upscaler: Box<dyn Upscaler> = match config.backend {
        BackendKind::Tract => Box::new(TractUpscaler::from_config(config)?),
        BackendKind::Tch => Box::new(TchUpscaler::from_config(config)?),
        BackendKind::Nearest | BackendKind::Bilinear => {
            Box::new(InterpolationUpscaler::from_config(config)?)
        }
    };
    let info = upscaler.info();
    info!(
        backend = %info.backend,
        model = %info.name,
        device = %info.device,
        "upscaler ready"
    );
    Ok(upscaler)
}
