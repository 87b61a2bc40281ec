//! Configuration for the recognition pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::loader::ModelLoader;
use super::source::{ModelSource, NetworkKind};
use crate::error::{Result, TuguError};
use crate::preprocessing::ImagePreprocessor;
use tugu_inference::BackendOptions;

/// Main configuration for tugu.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TuguConfig {
    /// Model source and cache location.
    pub model: ModelConfig,

    /// Runtime session options.
    pub runtime: RuntimeConfig,

    /// Network state used to evaluate download conditions.
    pub network: NetworkConfig,
}

/// Model configuration.
///
/// The input geometry is fixed by the model and is not configurable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// The active model source.
    pub source: ModelSource,

    /// Directory remote models are cached in. Unset means the platform data dir.
    pub cache_dir: Option<PathBuf>,
}

/// Runtime session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Use a GPU execution provider if available.
    pub use_gpu: bool,

    /// Number of CPU threads for inference.
    pub num_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            use_gpu: false,
            num_threads: 4,
        }
    }
}

/// Network configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Current network kind.
    pub kind: NetworkKind,
}

impl TuguConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| TuguError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| TuguError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Cache directory, falling back to `default_dir` when unset.
    pub fn cache_dir_or(&self, default_dir: PathBuf) -> PathBuf {
        self.model.cache_dir.clone().unwrap_or(default_dir)
    }

    /// Build a loader for this configuration.
    pub fn loader(&self, default_cache_dir: PathBuf) -> ModelLoader {
        ModelLoader::new(self.cache_dir_or(default_cache_dir), self.network.kind)
    }

    /// Session options for the runtime.
    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            use_gpu: self.runtime.use_gpu,
            num_threads: self.runtime.num_threads,
            input_shape: ImagePreprocessor::new().input_shape().to_vec(),
        }
    }
}
