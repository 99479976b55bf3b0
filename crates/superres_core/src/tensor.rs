//! NCHW shaping helpers and the placeholder tensor.

use ndarray::{Array2, ArrayD, Axis, Ix2, IxDyn};

use crate::error::ShapeError;

/// Shape of the zero array substituted when upscaling fails.
pub const PLACEHOLDER_SHAPE: [usize; 4] = [1, 1, 128, 128];

pub fn placeholder() -> ArrayD<f32> {
    ArrayD::zeros(IxDyn(&PLACEHOLDER_SHAPE))
}

/// Promote a grayscale image to a `[1, 1, H, W]` tensor.
///
/// A 2-D image gains batch and channel axes; a tensor that already has the
/// `[1, 1, H, W]` layout is passed through. Anything else is rejected.
pub fn to_nchw(image: &ArrayD<f32>) -> Result<ArrayD<f32>, ShapeError> {
    match *image.shape() {
        [h, w] | [1, 1, h, w] if h == 0 || w == 0 => {
            Err(ShapeError::Empty(image.shape().to_vec()))
        }
        [_, _] => Ok(image
            .to_owned()
            .insert_axis(Axis(0))
            .insert_axis(Axis(0))),
        [1, 1, _, _] => Ok(image.to_owned()),
        _ => Err(ShapeError::NotAnImage(image.shape().to_vec())),
    }
}

/// Drop the batch and channel axes of a `[1, 1, H, W]` tensor.
pub fn squeeze_nchw(tensor: ArrayD<f32>) -> Result<Array2<f32>, ShapeError> {
    let shape = tensor.shape().to_vec();
    match shape.as_slice() {
        [1, 1, _, _] => tensor
            .index_axis_move(Axis(0), 0)
            .index_axis_move(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map_err(|_| ShapeError::NotAnImage(shape)),
        _ => Err(ShapeError::NotAnImage(shape)),
    }
}

/// Check that `output` is `input` with its two trailing axes multiplied by `scale`.
pub fn check_scaled(input: &[usize], output: &[usize], scale: u32) -> Result<(), ShapeError> {
    let scale = scale as usize;
    let ndim = input.len();
    let matches = ndim >= 2
        && output.len() == ndim
        && input[..ndim - 2] == output[..ndim - 2]
        && input[ndim - 2..]
            .iter()
            .zip(&output[ndim - 2..])
            .all(|(i, o)| i * scale == *o);
    if matches {
        Ok(())
    } else {
        Err(ShapeError::ScaleMismatch {
            input: input.to_vec(),
            output: output.to_vec(),
            scale: scale as u32,
        })
    }
}
