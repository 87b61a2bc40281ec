//! Inference backend implementations.

#[cfg(feature = "native")]
pub mod ort;

#[cfg(feature = "tract")]
pub mod tract;

use crate::{InputTensor, OutputTensor, Result};

/// Trait for model runtimes.
///
/// A backend owns its loaded model for its whole lifetime and releases it
/// on drop. Implementations must be usable from a blocking worker thread.
pub trait InferenceBackend: Send + Sync {
    /// Run inference with the given named inputs.
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>>;

    /// Get the input names expected by the model.
    fn input_names(&self) -> &[String];

    /// Get the output names produced by the model.
    fn output_names(&self) -> &[String];
}

/// Session options shared by all backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOptions {
    /// Register a GPU execution provider when one is available.
    pub use_gpu: bool,
    /// Intra-op thread count.
    pub num_threads: usize,
    /// Concrete input shape, for runtimes that need it up front.
    pub input_shape: Vec<usize>,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            use_gpu: false,
            num_threads: 4,
            input_shape: vec![1, 224, 224, 3],
        }
    }
}
