//! Error types for the inference layer.

use thiserror::Error;

/// Errors raised by a model runtime.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// The model bytes could not be parsed.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The runtime session could not be created (device, options, resources).
    #[error("failed to create session: {0}")]
    SessionCreate(String),

    /// Input tensor has the wrong shape or element count.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The runtime failed while executing the graph.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// An output tensor could not be read back.
    #[error("failed to extract output: {0}")]
    OutputExtraction(String),
}
