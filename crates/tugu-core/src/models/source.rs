//! Where a model comes from.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::PredictionError;

/// The single active model source, selected by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSource {
    /// A model file shipped alongside the application.
    Bundled {
        path: PathBuf,
    },

    /// A named, versioned model fetched from a model host and cached locally.
    Remote {
        name: String,
        version: String,
        url: String,
        #[serde(default)]
        conditions: DownloadConditions,
    },
}

impl ModelSource {
    /// File name a remote model is cached under.
    pub fn cache_file_name(name: &str, version: &str) -> String {
        format!("{}-{}.onnx", name, version)
    }
}

impl Default for ModelSource {
    fn default() -> Self {
        ModelSource::Bundled {
            path: PathBuf::from("models/xception_v3.onnx"),
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Bundled { path } => write!(f, "bundled model {}", path.display()),
            ModelSource::Remote { name, version, .. } => write!(f, "remote model {}@{}", name, version),
        }
    }
}

/// Kind of network the host is currently on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    #[default]
    Unmetered,
    Metered,
    Offline,
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkKind::Unmetered => write!(f, "unmetered"),
            NetworkKind::Metered => write!(f, "metered"),
            NetworkKind::Offline => write!(f, "offline"),
        }
    }
}

/// Preconditions a remote download must satisfy before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConditions {
    /// Only download over an unmetered (e.g. Wi-Fi) connection.
    pub require_unmetered: bool,
}

impl Default for DownloadConditions {
    fn default() -> Self {
        Self {
            require_unmetered: true,
        }
    }
}

impl DownloadConditions {
    /// Check the conditions against the current network.
    pub fn check(&self, network: NetworkKind) -> Result<(), PredictionError> {
        match network {
            NetworkKind::Offline => Err(PredictionError::Download("network is offline".to_string())),
            NetworkKind::Metered if self.require_unmetered => Err(PredictionError::Download(
                "download requires an unmetered network".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
