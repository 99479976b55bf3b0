//! Model-free upscalers.
//!
//! These resample the two trailing axes of a tensor. They stand in for a
//! model when none is available and give the CLI a deterministic backend
//! to smoke-test against.

use anyhow::{bail, ensure, Result};
use ndarray::{ArrayD, IxDyn};

use crate::{BackendKind, Device, ModelInfo, Upscaler, UpscalerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Nearest,
    /// Half-pixel centres, edges clamped.
    Bilinear,
}

pub struct InterpolationUpscaler {
    method: Interpolation,
}

impl InterpolationUpscaler {
    pub fn new(method: Interpolation) -> Self {
        Self { method }
    }

    fn sample(&self, plane: &[f32], (h, w): (usize, usize), y: usize, x: usize, scale: usize) -> f32 {
        match self.method {
            Interpolation::Nearest => plane[(y / scale) * w + x / scale],
            Interpolation::Bilinear => {
                let (y0, y1, fy) = source_coord(y, scale, h);
                let (x0, x1, fx) = source_coord(x, scale, w);
                let top = plane[y0 * w + x0] * (1.0 - fx) + plane[y0 * w + x1] * fx;
                let bottom = plane[y1 * w + x0] * (1.0 - fx) + plane[y1 * w + x1] * fx;
                top * (1.0 - fy) + bottom * fy
            }
        }
    }
}

/// Map an output index back to the two neighbouring source indices and the
/// weight of the second one.
fn source_coord(out: usize, scale: usize, len: usize) -> (usize, usize, f32) {
    let src = ((out as f32 + 0.5) / scale as f32 - 0.5).clamp(0.0, (len - 1) as f32);
    let lo = src.floor() as usize;
    let hi = (lo + 1).min(len - 1);
    (lo, hi, src - lo as f32)
}

impl Upscaler for InterpolationUpscaler {
    fn from_config(config: &UpscalerConfig) -> Result<Self> {
        match config.backend {
            BackendKind::Nearest => Ok(Self::new(Interpolation::Nearest)),
            BackendKind::Bilinear => Ok(Self::new(Interpolation::Bilinear)),
            other => bail!("{other} is not an interpolation backend"),
        }
    }

    fn upscale(&self, input: &ArrayD<f32>, scale: u32) -> Result<ArrayD<f32>> {
        ensure!(scale >= 1, "scale factor must be at least 1");
        let ndim = input.ndim();
        ensure!(ndim >= 2, "cannot upscale a {ndim}-D array");
        let (h, w) = (input.shape()[ndim - 2], input.shape()[ndim - 1]);
        ensure!(h > 0 && w > 0, "cannot upscale an empty image");

        let scale = scale as usize;
        let (out_h, out_w) = (h * scale, w * scale);
        let mut out_shape = input.shape().to_vec();
        out_shape[ndim - 2] = out_h;
        out_shape[ndim - 1] = out_w;

        let src: Vec<f32> = input.iter().copied().collect();
        let mut dst = Vec::with_capacity(src.len() * scale * scale);
        for plane in src.chunks_exact(h * w) {
            for y in 0..out_h {
                for x in 0..out_w {
                    dst.push(self.sample(plane, (h, w), y, x, scale));
                }
            }
        }
        Ok(ArrayD::from_shape_vec(IxDyn(&out_shape), dst)?)
    }

    fn info(&self) -> ModelInfo {
        let name = match self.method {
            Interpolation::Nearest => "nearest",
            Interpolation::Bilinear => "bilinear",
        };
        ModelInfo {
            name: name.to_string(),
            backend: "interpolation".to_string(),
            device: Device::Cpu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array4};

    #[test]
    fn nearest_replicates_pixels() {
        let input = array![[[[1.0f32, 2.0], [3.0, 4.0]]]].into_dyn();
        let out = InterpolationUpscaler::new(Interpolation::Nearest)
            .upscale(&input, 2)
            .unwrap();
        let expected = array![[[
            [1.0f32, 1.0, 2.0, 2.0],
            [1.0, 1.0, 2.0, 2.0],
            [3.0, 3.0, 4.0, 4.0],
            [3.0, 3.0, 4.0, 4.0]
        ]]]
        .into_dyn();
        assert_eq!(out, expected);
    }

    #[test]
    fn bilinear_stays_within_input_range() {
        let input = Array4::from_shape_fn((1, 1, 3, 3), |(_, _, y, x)| (y * 3 + x) as f32).into_dyn();
        let out = InterpolationUpscaler::new(Interpolation::Bilinear)
            .upscale(&input, 2)
            .unwrap();
        assert_eq!(out.shape(), &[1, 1, 6, 6]);
        assert!(out.iter().all(|&v| (0.0..=8.0).contains(&v)));
        assert_eq!(out[[0, 0, 0, 0]], 0.0);
        assert_eq!(out[[0, 0, 5, 5]], 8.0);
        // Between source columns 0 and 1 of the first row.
        assert!((out[[0, 0, 0, 1]] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn bilinear_preserves_constant_image() {
        let input = ArrayD::from_elem(IxDyn(&[1, 1, 5, 7]), 0.3f32);
        let out = InterpolationUpscaler::new(Interpolation::Bilinear)
            .upscale(&input, 2)
            .unwrap();
        assert!(out.iter().all(|&v| (v - 0.3).abs() < 1e-6));
    }

    #[test]
    fn from_config_picks_method() {
        let config = UpscalerConfig {
            backend: BackendKind::Bilinear,
            ..UpscalerConfig::default()
        };
        let upscaler = InterpolationUpscaler::from_config(&config).unwrap();
        assert_eq!(upscaler.info().name, "bilinear");

        assert!(InterpolationUpscaler::from_config(&UpscalerConfig::default()).is_err());
    }

    #[test]
    fn rejects_empty_input() {
        let input = ArrayD::<f32>::zeros(IxDyn(&[1, 1, 0, 4]));
        assert!(InterpolationUpscaler::new(Interpolation::Nearest)
            .upscale(&input, 2)
            .is_err());
    }
}
