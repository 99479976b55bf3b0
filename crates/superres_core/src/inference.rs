//! Guarded super-resolution call.
//!
//! [`SuperResolution::run`] never fails: shaping errors, backend errors and
//! backend panics all turn into [`Outcome::Placeholder`], so the caller
//! always has a well-formed array to hand on. The reason survives only as
//! text for diagnostics.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use anyhow::Result;
use ndarray::ArrayD;
use tracing::{debug, error, info};

use crate::tensor::{self, check_scaled, to_nchw};
use crate::{ModelInfo, Upscaler, SCALE_FACTOR};

/// Result of a guarded upscale.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The backend produced an upscaled tensor.
    Upscaled(ArrayD<f32>),
    /// Upscaling failed; `array` is the zero placeholder.
    Placeholder { array: ArrayD<f32>, reason: String },
}

impl Outcome {
    pub fn placeholder(reason: impl Into<String>) -> Self {
        Outcome::Placeholder {
            array: tensor::placeholder(),
            reason: reason.into(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Outcome::Placeholder { .. })
    }

    pub fn array(&self) -> &ArrayD<f32> {
        match self {
            Outcome::Upscaled(array) | Outcome::Placeholder { array, .. } => array,
        }
    }

    pub fn into_array(self) -> ArrayD<f32> {
        match self {
            Outcome::Upscaled(array) | Outcome::Placeholder { array, .. } => array,
        }
    }
}

/// An upscaler bound to the fixed scale factor.
pub struct SuperResolution {
    upscaler: Box<dyn Upscaler>,
    scale: u32,
}

impl SuperResolution {
    pub fn new(upscaler: Box<dyn Upscaler>) -> Self {
        Self {
            upscaler,
            scale: SCALE_FACTOR,
        }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn info(&self) -> ModelInfo {
        self.upscaler.info()
    }

    /// Shape the image to NCHW and upscale it, propagating any error.
    pub fn try_upscale(&self, image: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        let input = to_nchw(image)?;
        debug!(shape = ?input.shape(), scale = self.scale, "running super resolution");
        let output = self.upscaler.upscale(&input, self.scale)?;
        check_scaled(input.shape(), output.shape(), self.scale)?;
        Ok(output)
    }

    /// Upscale the image, substituting the placeholder on any failure.
    pub fn run(&self, image: &ArrayD<f32>) -> Outcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_upscale(image))) {
            Ok(Ok(output)) => {
                info!(shape = ?output.shape(), "super resolution completed");
                Outcome::Upscaled(output)
            }
            Ok(Err(err)) => {
                error!(error = %format!("{err:#}"), "super resolution failed, substituting placeholder");
                Outcome::placeholder(format!("{err:#}"))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%message, "super resolution backend panicked, substituting placeholder");
                Outcome::placeholder(format!("backend panicked: {message}"))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Device, Interpolation, InterpolationUpscaler, UpscalerConfig};
    use ndarray::{Array2, IxDyn};

    enum Mock {
        Fails,
        Panics,
        WrongShape,
    }

    impl Upscaler for Mock {
        fn from_config(_config: &UpscalerConfig) -> Result<Self> {
            Ok(Mock::Fails)
        }

        fn upscale(&self, input: &ArrayD<f32>, _scale: u32) -> Result<ArrayD<f32>> {
            match self {
                Mock::Fails => anyhow::bail!("CUDA out of memory"),
                Mock::Panics => panic!("index out of bounds"),
                Mock::WrongShape => Ok(input.clone()),
            }
        }

        fn info(&self) -> ModelInfo {
            ModelInfo {
                name: "mock".to_string(),
                backend: "mock".to_string(),
                device: Device::Cpu,
            }
        }
    }

    fn image() -> ArrayD<f32> {
        Array2::from_shape_fn((4, 4), |(y, x)| (y * 4 + x) as f32).into_dyn()
    }

    fn assert_placeholder(outcome: &Outcome, reason_part: &str) {
        match outcome {
            Outcome::Placeholder { array, reason } => {
                assert_eq!(array, &ArrayD::<f32>::zeros(IxDyn(&[1, 1, 128, 128])));
                assert!(reason.contains(reason_part), "reason was {reason}");
            }
            Outcome::Upscaled(_) => panic!("expected a placeholder"),
        }
    }

    #[test]
    fn upscales_2d_image() {
        let sr = SuperResolution::new(Box::new(InterpolationUpscaler::new(Interpolation::Nearest)));
        let outcome = sr.run(&image());
        assert!(!outcome.is_placeholder());
        assert_eq!(outcome.array().shape(), &[1, 1, 8, 8]);
        assert_eq!(outcome.into_array()[[0, 0, 7, 7]], 15.0);
    }

    #[test]
    fn backend_error_becomes_placeholder() {
        let sr = SuperResolution::new(Box::new(Mock::Fails));
        assert_placeholder(&sr.run(&image()), "CUDA out of memory");
    }

    #[test]
    fn backend_panic_becomes_placeholder() {
        let sr = SuperResolution::new(Box::new(Mock::Panics));
        assert_placeholder(&sr.run(&image()), "index out of bounds");
    }

    #[test]
    fn wrong_output_shape_becomes_placeholder() {
        let sr = SuperResolution::new(Box::new(Mock::WrongShape));
        assert_placeholder(&sr.run(&image()), "scaled by 2");
    }

    #[test]
    fn bad_input_shape_becomes_placeholder() {
        let sr = SuperResolution::new(Box::new(Mock::WrongShape));
        let volume = ArrayD::<f32>::zeros(IxDyn(&[2, 4, 4]));
        assert_placeholder(&sr.run(&volume), "expected a 2-D image");
    }

    #[test]
    fn try_upscale_propagates_errors() {
        let sr = SuperResolution::new(Box::new(Mock::Fails));
        assert!(sr.try_upscale(&image()).is_err());
        assert_eq!(sr.scale(), 2);
        assert_eq!(sr.info().backend, "mock");
    }
}
