//! # superres_tch
//!
//! TorchScript upscaler using the `tch` crate (LibTorch bindings).
//! Runs on CUDA when it is requested and available, otherwise on CPU.
//!
//! LibTorch is only linked with the `libtorch` feature. Without it
//! [`TchUpscaler`] still exists but refuses to load, so callers can select
//! the backend at runtime without conditional compilation of their own.

#[cfg(feature = "libtorch")]
mod torch;

#[cfg(not(feature = "libtorch"))]
#[path = "torch_stub.rs"]
mod torch;

pub use torch::TchUpscaler;
