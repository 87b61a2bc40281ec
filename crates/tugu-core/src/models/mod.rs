//! Model sources, loading and configuration.

pub mod config;
pub mod loader;
pub mod source;

pub use config::TuguConfig;
pub use loader::{CachedModel, DownloadProgress, ModelFile, ModelLoader, ModelOrigin};
pub use source::{DownloadConditions, ModelSource, NetworkKind};
