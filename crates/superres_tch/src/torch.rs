use anyhow::{Context, Result};
use ndarray::{ArrayD, IxDyn};
use superres_core::tensor::check_scaled;
use superres_core::{Device, ModelInfo, Upscaler, UpscalerConfig};
use tch::{CModule, Kind, Tensor};
use tracing::{debug, info};

/// An upscaler backed by LibTorch (TorchScript models).
pub struct TchUpscaler {
    module: CModule,
    device: tch::Device,
    name: String,
}

impl Upscaler for TchUpscaler {
    fn from_config(config: &UpscalerConfig) -> Result<Self> {
        let path = config.model_path()?;
        let device = match Device::select(config.use_cuda, tch::Cuda::is_available()) {
            Device::Cuda(ordinal) => tch::Device::Cuda(ordinal),
            Device::Cpu => tch::Device::Cpu,
        };
        let mut module = CModule::load_on_device(path, device)
            .with_context(|| format!("failed to load TorchScript model {}", path.display()))?;
        module.set_eval();
        info!(model = %path.display(), ?device, "loaded TorchScript model");
        Ok(Self {
            module,
            device,
            name: path.display().to_string(),
        })
    }

    fn upscale(&self, input: &ArrayD<f32>, scale: u32) -> Result<ArrayD<f32>> {
        let input_shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let flat: Vec<f32> = input.iter().copied().collect();
        let t = Tensor::from_slice(&flat)
            .view(input_shape.as_slice())
            .to_device(self.device);

        debug!(shape = ?input_shape, "running TorchScript forward");
        let out = tch::no_grad(|| self.module.forward_ts(&[t]))?;
        let out = out.to_kind(Kind::Float).to_device(tch::Device::Cpu);

        let out_shape: Vec<usize> = out.size().iter().map(|&d| d as usize).collect();
        check_scaled(input.shape(), &out_shape, scale)?;
        let numel: usize = out_shape.iter().product();
        let mut out_vec = vec![0f32; numel];
        out.copy_data(&mut out_vec, numel);

        Ok(ArrayD::from_shape_vec(IxDyn(&out_shape), out_vec)?)
    }

    fn info(&self) -> ModelInfo {
        let device = match self.device {
            tch::Device::Cuda(ordinal) => Device::Cuda(ordinal),
            _ => Device::Cpu,
        };
        ModelInfo {
            name: self.name.clone(),
            backend: "tch".to_string(),
            device,
        }
    }
}
