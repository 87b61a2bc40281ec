//! Core library for monument recognition.
//!
//! This crate provides:
//! - image preprocessing into the classifier's 224x224 RGB input
//! - arg-max selection and the monument label table
//! - a classifier bound to a loaded model runtime
//! - model lifecycle: bundled files and cached remote downloads
//! - a channel-driven prediction service owning the live runtime

pub mod classifier;
pub mod error;
pub mod labels;
pub mod models;
pub mod preprocessing;
pub mod runtime;
pub mod selector;
pub mod service;

pub use classifier::MonumentClassifier;
pub use error::{PredictionError, Result, TuguError};
pub use labels::{LabelTable, MONUMENT_LABELS, UNKNOWN_LABEL};
pub use models::{ModelLoader, ModelOrigin, ModelSource, NetworkKind, TuguConfig};
pub use preprocessing::{ArgbImage, ImagePreprocessor};
pub use runtime::BackendFactory;
pub use selector::Prediction;
pub use service::{ClassifierSlot, PredictionEvent, PredictionHandle, PredictionService};

/// Re-export inference types.
pub use tugu_inference::{BackendOptions, InferenceBackend, InferenceError, InputTensor, OutputTensor};

#[cfg(feature = "native")]
pub use runtime::OrtFactory;

#[cfg(feature = "tract")]
pub use runtime::TractFactory;
