//! # superres_tract
//!
//! ONNX upscaler running on tract. CPU only; a CUDA request is noted and
//! ignored. The graph is specialized to the input's concrete shape, and the
//! last optimized plan is kept for reuse.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use ndarray::{ArrayD, IxDyn};
use superres_core::tensor::check_scaled;
use superres_core::{Device, ModelInfo, Upscaler, UpscalerConfig};
use tracing::{debug, info};
use tract_onnx::prelude::*;

type Plan = TypedRunnableModel<TypedModel>;

pub struct TractUpscaler {
    model: InferenceModel,
    optimize: bool,
    name: String,
    plan: Mutex<Option<(Vec<usize>, Arc<Plan>)>>,
}

impl TractUpscaler {
    /// Load an ONNX model from a file path.
    pub fn load(path: &str) -> Result<Self> {
        let config = UpscalerConfig {
            model_path: Some(path.into()),
            use_cuda: false,
            ..UpscalerConfig::default()
        };
        Self::from_config(&config)
    }

    fn plan_for(&self, shape: &[usize]) -> Result<Arc<Plan>> {
        let mut cached = self
            .plan
            .lock()
            .map_err(|_| anyhow!("tract plan cache lock poisoned"))?;
        if let Some((cached_shape, plan)) = cached.as_ref() {
            if cached_shape.as_slice() == shape {
                return Ok(Arc::clone(plan));
            }
        }

        debug!(?shape, optimize = self.optimize, "building tract plan");
        let model = self
            .model
            .clone()
            .with_input_fact(0, f32::fact(shape.to_vec()).into())?;
        let typed = if self.optimize {
            model.into_optimized()?
        } else {
            model.into_typed()?
        };
        let plan = Arc::new(typed.into_runnable()?);
        *cached = Some((shape.to_vec(), Arc::clone(&plan)));
        Ok(plan)
    }
}

impl Upscaler for TractUpscaler {
    fn from_config(config: &UpscalerConfig) -> Result<Self> {
        let path = config.model_path()?;
        if config.use_cuda {
            debug!("tract has no CUDA support, running on CPU");
        }
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to load ONNX model {}", path.display()))?;
        info!(model = %path.display(), "loaded ONNX model");
        Ok(Self {
            model,
            optimize: config.optimize,
            name: path.display().to_string(),
            plan: Mutex::new(None),
        })
    }

    fn upscale(&self, input: &ArrayD<f32>, scale: u32) -> Result<ArrayD<f32>> {
        let shape = input.shape().to_vec();
        let plan = self.plan_for(&shape)?;

        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_shape(&shape, &data)?;
        let outputs = plan.run(tvec!(tensor.into()))?;
        let output = outputs
            .first()
            .context("model produced no outputs")?
            .to_array_view::<f32>()?;

        let out_shape = output.shape().to_vec();
        check_scaled(&shape, &out_shape, scale)?;
        Ok(ArrayD::from_shape_vec(
            IxDyn(&out_shape),
            output.iter().copied().collect(),
        )?)
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.clone(),
            backend: "tract".to_string(),
            device: Device::Cpu,
        }
    }
}
