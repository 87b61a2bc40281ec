//! Subcommands and the helpers they share.

pub mod batch;
pub mod classify;
pub mod config;
pub mod models;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use tugu_core::{ModelSource, Prediction, PredictionHandle, PredictionService, TuguConfig};

#[cfg(not(feature = "tract"))]
type Factory = tugu_core::OrtFactory;

#[cfg(feature = "tract")]
type Factory = tugu_core::TractFactory;

/// Default location of the config file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tugu")
        .join("config.json")
}

/// Default directory for downloaded models.
pub fn default_cache_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tugu")
        .join("models")
}

/// Resolve which config file a command works on.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

/// Load the config file if present, defaults otherwise.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<TuguConfig> {
    let path = config_file(config_path);
    if path.exists() {
        Ok(TuguConfig::from_file(&path)?)
    } else if config_path.is_some() {
        anyhow::bail!("Config file not found: {}", path.display())
    } else {
        Ok(TuguConfig::default())
    }
}

/// Spawn a prediction service and load the configured model into it.
pub async fn start_service(
    config: &TuguConfig,
    model_override: Option<&Path>,
) -> anyhow::Result<PredictionHandle> {
    let source = match model_override {
        Some(path) => ModelSource::Bundled {
            path: path.to_path_buf(),
        },
        None => config.model.source.clone(),
    };

    let factory = Factory::new(config.backend_options());
    // Replies carry every outcome here, so the event stream is not read.
    let (handle, _) = PredictionService::builder(factory, config.loader(default_cache_dir())).spawn();

    handle
        .load_and_wait(source)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(handle)
}

/// One classified file, as written to output.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub file: PathBuf,
    pub label: String,
    pub index: usize,
    pub confidence: f32,
    pub processing_time_ms: u64,
    pub classified_at: DateTime<Utc>,
}

impl ClassificationReport {
    pub fn new(file: &Path, prediction: Prediction, processing_time_ms: u64) -> Self {
        Self {
            file: file.to_path_buf(),
            label: prediction.label,
            index: prediction.index,
            confidence: prediction.confidence,
            processing_time_ms,
            classified_at: Utc::now(),
        }
    }

    /// Human-readable one-liner.
    pub fn summary_line(&self) -> String {
        format!("{} ({:.1}%)", self.label, self.confidence)
    }
}

/// Whether a path looks like an image this tool can decode.
pub fn is_supported_image(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "webp" | "tiff")
}
