//! Typed errors for the payload boundary.
//!
//! Backends and binaries wrap these in `anyhow::Result` at call sites.

/// Failures while reading or writing an `.npy` buffer.
#[derive(Debug, thiserror::Error)]
pub enum NpyError {
    #[error("not an .npy payload: bad magic string")]
    BadMagic,

    #[error("truncated .npy payload: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("malformed .npy header: {0}")]
    Header(String),

    #[error("unsupported dtype descriptor '{0}'")]
    UnsupportedDtype(String),

    #[error(".npy i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Failures while turning a base64 string into an array.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Npy(#[from] NpyError),
}

/// Tensor layout contract violations.
#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("expected a 2-D image or a [1, 1, H, W] tensor, got shape {0:?}")]
    NotAnImage(Vec<usize>),

    #[error("image has no pixels: shape {0:?}")]
    Empty(Vec<usize>),

    #[error("upscaled shape {output:?} is not input shape {input:?} scaled by {scale}")]
    ScaleMismatch {
        input: Vec<usize>,
        output: Vec<usize>,
        scale: u32,
    },
}
