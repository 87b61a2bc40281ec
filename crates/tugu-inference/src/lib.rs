//! Model runtime abstraction for tugu.
//!
//! A classifier talks to exactly one [`InferenceBackend`] at a time. Two
//! implementations are provided:
//! - `ort` with XNNPACK (and optionally CUDA) for native platforms
//! - `tract` for builds that must stay pure Rust

mod backend;
mod error;
mod tensor;

pub use backend::{BackendOptions, InferenceBackend};
pub use error::InferenceError;
pub use tensor::{InputTensor, OutputTensor};

#[cfg(feature = "native")]
pub use backend::ort::OrtBackend;

#[cfg(feature = "tract")]
pub use backend::tract::TractBackend;

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
