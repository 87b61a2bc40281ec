//! Construction of model runtimes from model bytes.

use tugu_inference::{InferenceBackend, InferenceError};

/// Creates a fresh backend for each model that gets loaded.
pub trait BackendFactory: Send + Sync + 'static {
    type Backend: InferenceBackend + 'static;

    /// Initialize a runtime over `model`. Called on a blocking thread.
    fn create(&self, model: &[u8]) -> Result<Self::Backend, InferenceError>;
}

/// Factory for ONNX Runtime sessions.
#[cfg(feature = "native")]
pub struct OrtFactory {
    options: tugu_inference::BackendOptions,
}

#[cfg(feature = "native")]
impl OrtFactory {
    pub fn new(options: tugu_inference::BackendOptions) -> Self {
        Self { options }
    }
}

#[cfg(feature = "native")]
impl BackendFactory for OrtFactory {
    type Backend = tugu_inference::OrtBackend;

    fn create(&self, model: &[u8]) -> Result<Self::Backend, InferenceError> {
        tugu_inference::OrtBackend::from_bytes(model, &self.options)
    }
}

/// Factory for Tract plans.
#[cfg(feature = "tract")]
pub struct TractFactory {
    options: tugu_inference::BackendOptions,
}

#[cfg(feature = "tract")]
impl TractFactory {
    pub fn new(options: tugu_inference::BackendOptions) -> Self {
        Self { options }
    }
}

#[cfg(feature = "tract")]
impl BackendFactory for TractFactory {
    type Backend = tugu_inference::TractBackend;

    fn create(&self, model: &[u8]) -> Result<Self::Backend, InferenceError> {
        tugu_inference::TractBackend::from_bytes(model, &self.options)
    }
}
