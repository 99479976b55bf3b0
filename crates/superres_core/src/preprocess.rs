//! Image filters applied around the upscale in the enhance pipeline.
//!
//! Both operate on a single grayscale plane of `f32` samples.

use ndarray::{Array2, Axis};

/// Kernel radius in standard deviations.
const GAUSSIAN_TRUNCATE: f32 = 4.0;

/// Normalized 1-D gaussian kernel, truncated at `truncate` sigmas.
pub fn gaussian_kernel(sigma: f32, truncate: f32) -> Vec<f32> {
    let radius = (truncate * sigma + 0.5) as isize;
    let weights: Vec<f32> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f32 / sigma).powi(2)).exp())
        .collect();
    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Separable gaussian blur with edge samples repeated past the border.
///
/// A non-positive or non-finite `sigma` returns the image unchanged.
pub fn gaussian(image: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if !(sigma.is_finite() && sigma > 0.0) || image.is_empty() {
        return image.clone();
    }
    let kernel = gaussian_kernel(sigma, GAUSSIAN_TRUNCATE);
    let rows = convolve_axis(image, &kernel, Axis(0));
    convolve_axis(&rows, &kernel, Axis(1))
}

fn convolve_axis(image: &Array2<f32>, kernel: &[f32], axis: Axis) -> Array2<f32> {
    let (h, w) = image.dim();
    let radius = (kernel.len() / 2) as isize;
    let clamp = |i: isize, len: usize| i.clamp(0, len as isize - 1) as usize;
    Array2::from_shape_fn((h, w), |(y, x)| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, weight)| {
                let offset = k as isize - radius;
                let (sy, sx) = if axis == Axis(0) {
                    (clamp(y as isize + offset, h), x)
                } else {
                    (y, clamp(x as isize + offset, w))
                };
                weight * image[[sy, sx]]
            })
            .sum()
    })
}

/// Parameters for [`equalize_adapthist`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaheParams {
    /// Fraction of a tile's pixels any histogram bin may hold before clipping.
    pub clip_limit: f32,
    pub nbins: usize,
    /// Tile size as `(rows, cols)`; defaults to an eighth of each dimension.
    pub kernel_size: Option<(usize, usize)>,
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 0.01,
            nbins: 256,
            kernel_size: None,
        }
    }
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is first stretched to `[0, 1]`. Each tile gets a clipped,
/// redistributed histogram whose cumulative sum is its intensity mapping;
/// every pixel blends the mappings of the four nearest tile centres
/// bilinearly. Output lies in `[0, 1]`. A constant image has no contrast to
/// work with and is returned clamped to `[0, 1]`.
pub fn equalize_adapthist(image: &Array2<f32>, params: &ClaheParams) -> Array2<f32> {
    let (h, w) = image.dim();
    if image.is_empty() {
        return image.clone();
    }
    let (lo, hi) = image
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !(hi > lo) {
        return image.mapv(|v| v.clamp(0.0, 1.0));
    }

    let nbins = params.nbins.max(2);
    let top = (nbins - 1) as f32;
    let bins = image.mapv(|v| (((v - lo) / (hi - lo)) * top).round().clamp(0.0, top) as usize);

    let (kh, kw) = tile_size((h, w), params.kernel_size);
    let (tiles_y, tiles_x) = (h.div_ceil(kh), w.div_ceil(kw));

    let mut luts = Vec::with_capacity(tiles_y * tiles_x);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (y0, x0) = (ty * kh, tx * kw);
            let (y1, x1) = ((y0 + kh).min(h), (x0 + kw).min(w));
            let mut hist = vec![0f32; nbins];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[bins[[y, x]]] += 1.0;
                }
            }
            let pixels = ((y1 - y0) * (x1 - x0)) as f32;
            clip_histogram(&mut hist, (params.clip_limit * pixels).max(1.0));
            luts.push(cumulative_mapping(&hist, pixels));
        }
    }

    let lut = |ty: usize, tx: usize| &luts[ty * tiles_x + tx];
    Array2::from_shape_fn((h, w), |(y, x)| {
        let (ty0, ty1, fy) = tile_coord(y, kh, tiles_y);
        let (tx0, tx1, fx) = tile_coord(x, kw, tiles_x);
        let b = bins[[y, x]];
        let top_row = lut(ty0, tx0)[b] * (1.0 - fx) + lut(ty0, tx1)[b] * fx;
        let bottom_row = lut(ty1, tx0)[b] * (1.0 - fx) + lut(ty1, tx1)[b] * fx;
        (top_row * (1.0 - fy) + bottom_row * fy).clamp(0.0, 1.0)
    })
}

/// Contextual region size: an eighth of each side, rounded down, unless given.
/// Never smaller than one pixel or larger than the image.
fn tile_size((h, w): (usize, usize), kernel_size: Option<(usize, usize)>) -> (usize, usize) {
    let (kh, kw) = kernel_size.unwrap_or((h / 8, w / 8));
    (kh.clamp(1, h.max(1)), kw.clamp(1, w.max(1)))
}

/// Cap every bin at `limit` and spread the clipped mass evenly over all bins.
fn clip_histogram(hist: &mut [f32], limit: f32) {
    let mut excess = 0.0;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }
    let share = excess / hist.len() as f32;
    for count in hist.iter_mut() {
        *count += share;
    }
}

fn cumulative_mapping(hist: &[f32], pixels: f32) -> Vec<f32> {
    let mut running = 0.0;
    hist.iter()
        .map(|count| {
            running += count;
            (running / pixels).min(1.0)
        })
        .collect()
}

/// Neighbouring tile indices for a pixel and the weight of the second tile.
fn tile_coord(pos: usize, tile: usize, tiles: usize) -> (usize, usize, f32) {
    let centre = ((pos as f32 + 0.5) / tile as f32 - 0.5).clamp(0.0, (tiles - 1) as f32);
    let lo = centre.floor() as usize;
    let hi = (lo + 1).min(tiles - 1);
    (lo, hi, centre - lo as f32)
}
