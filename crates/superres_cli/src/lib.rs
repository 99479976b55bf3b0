//! Shared plumbing for the `superres` and `enhance` binaries.

pub mod app;
pub mod backend;
pub mod logging;
pub mod pipeline;
