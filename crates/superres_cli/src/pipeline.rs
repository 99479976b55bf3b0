//! Load → gaussian → super-resolution → CLAHE, for the `enhance` binary.

use std::path::Path;

use anyhow::{Context, Result};
use image::{ImageBuffer, Luma};
use ndarray::Array2;
use superres_core::preprocess::{self, ClaheParams};
use superres_core::{npy, payload, tensor, SuperResolution};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhanceOptions {
    /// Gaussian sigma applied before upscaling.
    pub sigma: f32,
    pub clahe: ClaheParams,
}

impl Default for EnhanceOptions {
    fn default() -> Self {
        Self {
            sigma: 0.5,
            clahe: ClaheParams::default(),
        }
    }
}

/// Load any supported image as a grayscale plane with samples in `[0, 1]`.
pub fn load_gray(path: &Path) -> Result<Array2<f32>> {
    let img = image::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?
        .to_luma32f();
    let (width, height) = img.dimensions();
    Ok(Array2::from_shape_vec(
        (height as usize, width as usize),
        img.into_raw(),
    )?)
}

/// Save a `[0, 1]` plane as a 16-bit grayscale image; the format follows the
/// file extension.
pub fn save_gray(image: &Array2<f32>, path: &Path) -> Result<()> {
    let (height, width) = image.dim();
    let samples: Vec<u16> = image
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16)
        .collect();
    let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(width as u32, height as u32, samples)
            .context("image buffer size does not match its dimensions")?;
    buffer
        .save(path)
        .with_context(|| format!("failed to write image {}", path.display()))
}

/// Save a plane as a `.npy` file.
pub fn save_npy(image: &Array2<f32>, path: &Path) -> Result<()> {
    let bytes = npy::write_npy(&image.clone().into_dyn())?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

/// Turn a file into a base64 payload for `superres`. An `.npy` file is sent
/// as stored once it parses; any other file is loaded as a grayscale image.
pub fn encode_file(path: &Path) -> Result<String> {
    let is_npy = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("npy"));
    if is_npy {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let array = npy::read_npy(&bytes)
            .with_context(|| format!("{} is not a readable .npy file", path.display()))?;
        info!(shape = ?array.shape(), "encoding .npy file");
        return Ok(payload::encode_bytes(&bytes));
    }
    let image = load_gray(path)?;
    info!(shape = ?image.dim(), "encoding grayscale image");
    Ok(payload::encode(&image.into_dyn())?)
}

/// Smooth, upscale and contrast-enhance a grayscale plane. Upscaling errors
/// propagate; there is no placeholder on this path.
pub fn enhance(
    image: &Array2<f32>,
    sr: &SuperResolution,
    options: &EnhanceOptions,
) -> Result<Array2<f32>> {
    let smoothed = preprocess::gaussian(image, options.sigma);
    info!(sigma = options.sigma, "applied gaussian filter");

    let upscaled = sr.try_upscale(&smoothed.into_dyn())?;
    let upscaled = tensor::squeeze_nchw(upscaled)?;
    info!(shape = ?upscaled.dim(), "super resolution completed");

    let enhanced = preprocess::equalize_adapthist(&upscaled, &options.clahe);
    info!(clip_limit = options.clahe.clip_limit, "applied adaptive histogram equalization");
    Ok(enhanced)
}
