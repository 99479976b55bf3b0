//! # superres_core
//!
//! Shared trait and types for superres upscaling backends.
//! All backend crates (`superres_tract`, `superres_tch`) and the built-in
//! interpolation upscalers implement the [`Upscaler`] trait defined here,
//! so the payload CLI and the enhance pipeline stay generic over the
//! choice of runtime.
//!
//! Besides the trait, this crate owns the boundary plumbing around a
//! model call: the `.npy` codec ([`npy`]), the base64 payload codec
//! ([`payload`]), NCHW shaping and the placeholder array ([`tensor`]),
//! the catch-and-substitute wrapper ([`inference`]) and the image filters
//! used before and after upscaling ([`preprocess`]).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod inference;
pub mod interp;
pub mod npy;
pub mod payload;
pub mod preprocess;
pub mod tensor;

pub use error::{NpyError, PayloadError, ShapeError};
pub use inference::{Outcome, SuperResolution};
pub use interp::{Interpolation, InterpolationUpscaler};

/// Upscale factor handed to every backend.
pub const SCALE_FACTOR: u32 = 2;

/// Which backend implementation serves the upscale call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// ONNX model executed by tract.
    #[default]
    Tract,
    /// TorchScript model executed by LibTorch.
    Tch,
    /// Nearest-neighbour resampling, no model.
    Nearest,
    /// Bilinear resampling, no model.
    Bilinear,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Tract => "tract",
            BackendKind::Tch => "tch",
            BackendKind::Nearest => "nearest",
            BackendKind::Bilinear => "bilinear",
        }
    }

    /// Whether this backend needs a model file.
    pub fn needs_model(&self) -> bool {
        matches!(self, BackendKind::Tract | BackendKind::Tch)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tract" | "onnx" => Ok(BackendKind::Tract),
            "tch" | "torch" | "torchscript" => Ok(BackendKind::Tch),
            "nearest" => Ok(BackendKind::Nearest),
            "bilinear" => Ok(BackendKind::Bilinear),
            other => Err(format!(
                "unknown backend '{other}' (expected tract, tch, nearest or bilinear)"
            )),
        }
    }
}

/// Execution device picked for a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    Cpu,
    Cuda(usize),
}

impl Device {
    /// Use the first CUDA device when it was asked for and is present,
    /// otherwise fall back to the CPU.
    pub fn select(use_cuda: bool, cuda_available: bool) -> Self {
        if use_cuda && cuda_available {
            Device::Cuda(0)
        } else {
            Device::Cpu
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}

/// Metadata describing a loaded upscaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Human-readable name of the model (usually its path).
    pub name: String,
    /// Backend serving inference (e.g. "tract", "tch", "nearest").
    pub backend: String,
    /// Device inference runs on.
    pub device: Device,
}

/// Configuration for loading an upscaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpscalerConfig {
    /// Backend to load.
    pub backend: BackendKind,
    /// Path to the model file, required by model-backed backends.
    pub model_path: Option<PathBuf>,
    /// Whether to use CUDA when the backend and machine support it.
    pub use_cuda: bool,
    /// Whether to apply backend-specific graph optimizations.
    pub optimize: bool,
}

impl Default for UpscalerConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            model_path: None,
            use_cuda: true,
            optimize: true,
        }
    }
}

impl UpscalerConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// The configured model path, or an error naming the backend that needed it.
    pub fn model_path(&self) -> Result<&Path> {
        self.model_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .with_context(|| format!("the {} backend needs a model path", self.backend))
    }
}

/// The core trait that all upscaling backends must implement.
///
/// The model behind it is opaque: it receives a `[1, 1, H, W]` tensor and
/// the requested scale factor and returns the upscaled tensor.
///
/// # Example
/// ```ignore
/// let upscaler = TractUpscaler::from_config(&config)?;
/// let input = ndarray::ArrayD::<f32>::zeros(IxDyn(&[1, 1, 64, 64]));
/// let output = upscaler.upscale(&input, SCALE_FACTOR)?;
/// assert_eq!(output.shape(), &[1, 1, 128, 128]);
/// ```
pub trait Upscaler: Send + Sync {
    /// Create an upscaler from a configuration.
    fn from_config(config: &UpscalerConfig) -> Result<Self>
    where
        Self: Sized;

    /// Upscale an NCHW tensor by `scale` along both spatial axes.
    fn upscale(&self, input: &ArrayD<f32>, scale: u32) -> Result<ArrayD<f32>>;

    /// Return metadata about the loaded upscaler.
    fn info(&self) -> ModelInfo;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_info_serialize() {
        let info = ModelInfo {
            name: "esrgan_x2.onnx".to_string(),
            backend: "tract".to_string(),
            device: Device::Cpu,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("esrgan_x2.onnx"));
        assert!(json.contains("Cpu"));
    }

    #[test]
    fn test_upscaler_config_default() {
        let config = UpscalerConfig::default();
        assert_eq!(config.backend, BackendKind::Tract);
        assert!(config.model_path.is_none());
        assert!(config.use_cuda);
        assert!(config.optimize);
    }

    #[test]
    fn test_model_path_required() {
        let config = UpscalerConfig::default();
        let err = config.model_path().unwrap_err();
        assert!(err.to_string().contains("tract"));

        let config = UpscalerConfig {
            model_path: Some(PathBuf::new()),
            ..UpscalerConfig::default()
        };
        assert!(config.model_path().is_err());
    }

    #[test]
    fn test_config_from_json_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("superres.json");
        std::fs::write(&path, r#"{"backend": "bilinear", "use_cuda": false}"#).unwrap();

        let config = UpscalerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Bilinear);
        assert!(!config.use_cuda);
        assert!(config.optimize);
        assert!(config.model_path.is_none());
    }

    #[test]
    fn test_config_from_json_file_rejects_unknown_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("superres.json");
        std::fs::write(&path, r#"{"backend": "tensorrt"}"#).unwrap();
        assert!(UpscalerConfig::from_json_file(&path).is_err());
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("onnx".parse::<BackendKind>(), Ok(BackendKind::Tract));
        assert_eq!("Torch".parse::<BackendKind>(), Ok(BackendKind::Tch));
        assert_eq!("nearest".parse::<BackendKind>(), Ok(BackendKind::Nearest));
        assert!("cubic".parse::<BackendKind>().is_err());
        assert!(BackendKind::Tch.needs_model());
        assert!(!BackendKind::Bilinear.needs_model());
    }

    #[test]
    fn test_device_select() {
        assert_eq!(Device::select(true, true), Device::Cuda(0));
        assert_eq!(Device::select(true, false), Device::Cpu);
        assert_eq!(Device::select(false, true), Device::Cpu);
        assert_eq!(Device::Cuda(0).to_string(), "cuda:0");
    }
}
