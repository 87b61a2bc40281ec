//! Resolving a [`ModelSource`] to a model file on local disk.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};
use tracing::{debug, info};

use super::source::{ModelSource, NetworkKind};
use crate::error::PredictionError;

/// How a resolved model file was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelOrigin {
    Bundled,
    Cached,
    Downloaded,
}

impl fmt::Display for ModelOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelOrigin::Bundled => write!(f, "bundled"),
            ModelOrigin::Cached => write!(f, "cached"),
            ModelOrigin::Downloaded => write!(f, "downloaded"),
        }
    }
}

/// A model available on local disk.
#[derive(Debug, Clone)]
pub struct ModelFile {
    path: PathBuf,
    origin: ModelOrigin,
}

impl ModelFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn origin(&self) -> ModelOrigin {
        self.origin
    }

    /// Map the model read-only into memory.
    pub fn map(&self) -> Result<Mmap, PredictionError> {
        let map_err = |e: std::io::Error| {
            PredictionError::Initialization(format!(
                "failed to map model {}: {}",
                self.path.display(),
                e
            ))
        };

        let file = File::open(&self.path).map_err(map_err)?;
        // SAFETY: the mapping is read-only and dropped once the runtime is built.
        unsafe { MmapOptions::new().map(&file) }.map_err(map_err)
    }
}

/// Progress of a model download, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct DownloadProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
}

/// A remote model sitting in the local cache.
#[derive(Debug, Clone)]
pub struct CachedModel {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub partial: bool,
}

/// Resolves model sources, downloading remote models into a cache directory.
pub struct ModelLoader {
    cache_dir: PathBuf,
    network: NetworkKind,
    #[cfg(feature = "download")]
    client: reqwest::Client,
}

impl ModelLoader {
    /// Create a loader caching remote models under `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>, network: NetworkKind) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            network,
            #[cfg(feature = "download")]
            client: reqwest::Client::builder()
                .user_agent(concat!("tugu/", env!("CARGO_PKG_VERSION")))
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn network(&self) -> NetworkKind {
        self.network
    }

    /// Path a remote model is (or would be) cached at.
    pub fn cached_path(&self, name: &str, version: &str) -> PathBuf {
        self.cache_dir.join(ModelSource::cache_file_name(name, version))
    }

    /// Resolve a source to a local file.
    pub async fn resolve(&self, source: &ModelSource) -> Result<ModelFile, PredictionError> {
        self.resolve_with_progress(source, |_| {}).await
    }

    /// Resolve a source, reporting download progress to `on_progress`.
    ///
    /// A remote model already present in the cache is used as is.
    pub async fn resolve_with_progress<F>(
        &self,
        source: &ModelSource,
        on_progress: F,
    ) -> Result<ModelFile, PredictionError>
    where
        F: FnMut(DownloadProgress),
    {
        match source {
            ModelSource::Bundled { path } => {
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Err(PredictionError::Initialization(format!(
                        "model file not found: {}",
                        path.display()
                    )));
                }
                debug!("Using bundled model {}", path.display());
                Ok(ModelFile {
                    path: path.clone(),
                    origin: ModelOrigin::Bundled,
                })
            }
            ModelSource::Remote {
                name,
                version,
                url,
                conditions,
            } => {
                let path = self.cached_path(name, version);
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    debug!("Using cached model {}", path.display());
                    return Ok(ModelFile {
                        path,
                        origin: ModelOrigin::Cached,
                    });
                }

                conditions.check(self.network)?;

                info!("Downloading {}@{} from {}", name, version, url);
                let size = self.download(url, &path, on_progress).await?;
                info!("Downloaded {} ({} bytes)", path.display(), size);

                Ok(ModelFile {
                    path,
                    origin: ModelOrigin::Downloaded,
                })
            }
        }
    }

    #[cfg(feature = "download")]
    async fn download<F>(&self, url: &str, path: &Path, mut on_progress: F) -> Result<u64, PredictionError>
    where
        F: FnMut(DownloadProgress),
    {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(download_err)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(download_err)?;

        if !response.status().is_success() {
            return Err(PredictionError::Download(format!("HTTP {}", response.status())));
        }

        let total = response.content_length();

        // Write to a temp file first so a failed download never looks cached.
        let temp_path = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(download_err)?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(download_err)?;
            file.write_all(&chunk).await.map_err(download_err)?;
            downloaded += chunk.len() as u64;
            on_progress(DownloadProgress { downloaded, total });
        }

        file.flush().await.map_err(download_err)?;
        drop(file);

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(download_err)?;

        Ok(downloaded)
    }

    #[cfg(not(feature = "download"))]
    async fn download<F>(&self, _url: &str, _path: &Path, _on_progress: F) -> Result<u64, PredictionError>
    where
        F: FnMut(DownloadProgress),
    {
        Err(PredictionError::Download(
            "built without download support".to_string(),
        ))
    }

    /// List model files (complete and partial) in the cache directory.
    pub fn cached_models(&self) -> std::io::Result<Vec<CachedModel>> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }

        let mut models = Vec::new();
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            let partial = match path.extension().and_then(|e| e.to_str()) {
                Some("onnx") => false,
                Some("tmp") => true,
                _ => continue,
            };
            let size_bytes = std::fs::metadata(&path)?.len();
            models.push(CachedModel {
                path,
                size_bytes,
                partial,
            });
        }
        models.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(models)
    }
}

#[cfg(feature = "download")]
fn download_err(e: impl fmt::Display) -> PredictionError {
    PredictionError::Download(e.to_string())
}
