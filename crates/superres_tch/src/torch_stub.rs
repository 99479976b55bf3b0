//! Stand-in used when the crate is built without LibTorch.

use anyhow::{bail, Result};
use ndarray::ArrayD;
use superres_core::{Device, ModelInfo, Upscaler, UpscalerConfig};

pub struct TchUpscaler {
    name: String,
}

impl Upscaler for TchUpscaler {
    fn from_config(config: &UpscalerConfig) -> Result<Self> {
        let path = config.model_path()?;
        bail!(
            "cannot load TorchScript model {}: superres_tch was built without the `libtorch` feature",
            path.display()
        )
    }

    fn upscale(&self, _input: &ArrayD<f32>, _scale: u32) -> Result<ArrayD<f32>> {
        bail!("TorchScript backend is not available in this build")
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.clone(),
            backend: "tch".to_string(),
            device: Device::Cpu,
        }
    }
}
