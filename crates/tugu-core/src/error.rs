//! Error types for the tugu-core library.

use thiserror::Error;

/// Main error type for the tugu library.
#[derive(Error, Debug)]
pub enum TuguError {
    /// Prediction pipeline error.
    #[error(transparent)]
    Prediction(#[from] PredictionError),

    /// Inference error from the runtime layer.
    #[error("inference error: {0}")]
    Inference(#[from] tugu_inference::InferenceError),

    /// Image decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Failures surfaced by the prediction component.
///
/// Every variant carries or renders a human-readable message. None of them
/// is retried; re-issuing a load or prediction is left to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// The runtime or the model could not be brought up.
    #[error("model initialization failed: {0}")]
    Initialization(String),

    /// A prediction was requested while no model was loaded.
    #[error("interpreter is not initialized yet")]
    NotReady,

    /// Malformed input or a runtime failure during inference.
    #[error("prediction failed: {0}")]
    Inference(String),

    /// The remote model could not be fetched.
    #[error("model download failed: {0}")]
    Download(String),
}

/// Result type for the tugu library.
pub type Result<T> = std::result::Result<T, TuguError>;
