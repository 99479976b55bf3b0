//! `.npy` buffers in and out, on top of `npyz`.
//!
//! Reading accepts C or Fortran order, either byte order, and the float,
//! integer and bool dtypes an image can reasonably arrive in. Every element
//! is converted to `f32`. Writing always produces little-endian `f32` in C
//! order.

use std::panic;

use ndarray::{ArrayD, ShapeBuilder};
use npyz::{DType, NpyFile, Order, WriteOptions, WriterBuilder};

use crate::error::NpyError;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Parse an `.npy` buffer into an `f32` array of the stored shape.
pub fn read_npy(bytes: &[u8]) -> Result<ArrayD<f32>, NpyError> {
    if !bytes.starts_with(MAGIC) {
        return Err(NpyError::BadMagic);
    }
    // npyz multiplies the declared dimensions while parsing the header.
    let npy = panic::catch_unwind(|| NpyFile::new(bytes))
        .map_err(|_| NpyError::Header("declared shape does not fit in memory".into()))??;

    let shape = npy
        .shape()
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<Result<Vec<usize>, _>>()
        .map_err(|_| NpyError::Header(format!("shape {:?} is too large", npy.shape())))?;
    let count = shape
        .iter()
        .try_fold(1usize, |n, &d| n.checked_mul(d))
        .ok_or_else(|| NpyError::Header(format!("shape {shape:?} is too large")))?;

    let descr = match npy.dtype() {
        DType::Plain(ty) => ty.to_string(),
        other => return Err(NpyError::UnsupportedDtype(format!("{other:?}"))),
    };
    let code = descr.trim_start_matches(&['<', '>', '|', '='][..]).to_string();
    let item_size = match code.as_bytes() {
        [_, d @ b'1'..=b'8'] => usize::from(*d - b'0'),
        _ => return Err(NpyError::UnsupportedDtype(descr)),
    };
    // Checked before npyz sizes its output buffer.
    let need = count
        .checked_mul(item_size)
        .ok_or_else(|| NpyError::Header(format!("shape {shape:?} is too large")))?;
    if need > bytes.len() {
        return Err(NpyError::Truncated {
            need,
            have: bytes.len(),
        });
    }

    let fortran = npy.order() == Order::Fortran;
    let values: Vec<f32> = match code.as_str() {
        "f4" => npy.into_vec::<f32>()?,
        "f8" => widen(npy.into_vec::<f64>()?, |v| v as f32),
        "i1" => widen(npy.into_vec::<i8>()?, f32::from),
        "i2" => widen(npy.into_vec::<i16>()?, f32::from),
        "i4" => widen(npy.into_vec::<i32>()?, |v| v as f32),
        "i8" => widen(npy.into_vec::<i64>()?, |v| v as f32),
        "u1" => widen(npy.into_vec::<u8>()?, f32::from),
        "u2" => widen(npy.into_vec::<u16>()?, f32::from),
        "u4" => widen(npy.into_vec::<u32>()?, |v| v as f32),
        "u8" => widen(npy.into_vec::<u64>()?, |v| v as f32),
        "b1" => widen(npy.into_vec::<bool>()?, |v| if v { 1.0 } else { 0.0 }),
        _ => return Err(NpyError::UnsupportedDtype(descr)),
    };

    Ok(ArrayD::from_shape_vec(shape.set_f(fortran), values)?)
}

fn widen<T>(values: Vec<T>, convert: impl Fn(T) -> f32) -> Vec<f32> {
    values.into_iter().map(convert).collect()
}

/// Serialize an array as a little-endian `f32`, C-order `.npy` buffer.
pub fn write_npy(array: &ArrayD<f32>) -> Result<Vec<u8>, NpyError> {
    let shape: Vec<u64> = array.shape().iter().map(|&d| d as u64).collect();
    let mut out = Vec::with_capacity(128 + array.len() * 4);
    let mut writer = WriteOptions::<f32>::new()
        .default_dtype()
        .shape(&shape)
        .writer(&mut out)
        .begin_nd()?;
    // Logical iteration order is C order whatever the memory layout.
    for v in array.iter() {
        writer.push(v)?;
    }
    writer.finish()?;
    Ok(out)
}
