// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::SyncConfig;
use crate::error::CacheError;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};

use super::color::extract_color_async;
use super::download::{PARTIAL_SUFFIX, download_asset};
use super::filename::{cache_filename, is_private_origin, public_path, source_filename};
use super::metadata::{
    AssetMetadata, META_DIR, read_asset_metadata, sidecar_path, write_asset_metadata,
};
use super::transcode::SharedTranscoder;

/// What resolving one asset reference produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetResolution {
    /// Downloaded, converted and stored during this call
    Cached {
        local_path: String,
        dominant_color: Option<String>,
    },
    /// Already present in the cache; no network or conversion work done
    Reused {
        local_path: String,
        dominant_color: Option<String>,
    },
    /// Downloaded, but conversion failed; the original file is served
    Degraded { local_path: String },
    /// Not eligible for caching; the reference is returned untouched
    PassThrough { url: Option<String> },
    /// Could not be downloaded or stored
    Failed,
}

impl AssetResolution {
    /// The reference to use in place of the remote URL, if any
    pub fn local_path(&self) -> Option<&str> {
        match self {
            Self::Cached { local_path, .. }
            | Self::Reused { local_path, .. }
            | Self::Degraded { local_path } => Some(local_path),
            Self::PassThrough { url } => url.as_deref(),
            Self::Failed => None,
        }
    }

    pub fn dominant_color(&self) -> Option<&str> {
        match self {
            Self::Cached { dominant_color, .. } | Self::Reused { dominant_color, .. } => {
                dominant_color.as_deref()
            }
            _ => None,
        }
    }

    /// Whether a file now exists locally for this reference
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Cached { .. } | Self::Reused { .. } | Self::Degraded { .. }
        )
    }
}

/// Maps a remote asset URL to something the rendering layer can serve
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Resolve `url`; never fails, failures degrade to [`AssetResolution::Failed`]
    async fn resolve(&self, url: Option<&str>) -> AssetResolution;
}

/// On-disk asset cache mirrored across a dev-facing and a production-facing root
///
/// The presence of `<primary root>/<filename>` is the only thing consulted
/// before doing network work; an existing file is never re-validated.
/// Assets whose conversion failed are remembered for the lifetime of the
/// cache so they are fetched at most once per run.
pub struct AssetCache<C> {
    client: C,
    transcoder: SharedTranscoder,
    roots: Vec<PathBuf>,
    public_prefix: String,
    private_hosts: Vec<String>,
    reporter: SharedProgressReporter,
    degraded: Mutex<HashMap<String, AssetResolution>>,
}

impl<C: HttpClient> AssetCache<C> {
    pub fn new(
        client: C,
        transcoder: SharedTranscoder,
        config: &SyncConfig,
        reporter: SharedProgressReporter,
    ) -> Self {
        // Identical roots would make mirroring copy a file onto itself.
        let mut roots = config.cache_roots().to_vec();
        roots.dedup();

        Self {
            client,
            transcoder,
            roots,
            public_prefix: config.public_prefix.clone(),
            private_hosts: config.private_hosts.clone(),
            reporter,
            degraded: Mutex::new(HashMap::new()),
        }
    }

    fn primary_root(&self) -> &Path {
        &self.roots[0]
    }

    fn mirror_roots(&self) -> &[PathBuf] {
        &self.roots[1..]
    }

    fn degraded_resolution(&self, filename: &str) -> Option<AssetResolution> {
        self.degraded.lock().ok()?.get(filename).cloned()
    }

    fn remember_degraded(&self, filename: &str, resolution: &AssetResolution) {
        if let Ok(mut degraded) = self.degraded.lock() {
            degraded.insert(filename.to_string(), resolution.clone());
        }
    }

    /// Create every cache directory and remove leftover `.partial` files
    ///
    /// Returns the number of partial files removed.
    pub fn prepare(&self) -> Result<usize, CacheError> {
        self.ensure_directories()?;

        let mut partial_files_cleaned = 0;
        for root in &self.roots {
            let entries = std::fs::read_dir(root).map_err(|e| CacheError::ReadDirectoryFailed {
                path: root.clone(),
                source: e,
            })?;

            for entry in entries {
                let entry = entry.map_err(|e| CacheError::ReadDirectoryFailed {
                    path: root.clone(),
                    source: e,
                })?;
                let path = entry.path();
                let is_partial = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(PARTIAL_SUFFIX));

                if is_partial && std::fs::remove_file(&path).is_ok() {
                    partial_files_cleaned += 1;
                }
            }
        }

        Ok(partial_files_cleaned)
    }

    fn ensure_directories(&self) -> Result<(), CacheError> {
        for root in &self.roots {
            let meta = root.join(META_DIR);
            std::fs::create_dir_all(&meta)
                .map_err(|e| CacheError::CreateDirectoryFailed { path: meta, source: e })?;
        }
        Ok(())
    }

    async fn reuse(&self, url: &str, filename: &str) -> Result<AssetResolution, CacheError> {
        self.ensure_directories()?;

        let cached = self.primary_root().join(filename);
        let sidecar = sidecar_path(self.primary_root(), filename);

        let metadata = match read_asset_metadata(&sidecar) {
            Ok(metadata) => metadata,
            Err(_) => {
                let metadata = AssetMetadata {
                    dominant_color: self.color_of(&cached).await,
                };
                write_asset_metadata(&metadata, &sidecar)?;
                self.reporter.report(ProgressEvent::MetadataBackfilled {
                    filename: filename.to_string(),
                });
                metadata
            }
        };

        for root in self.mirror_roots() {
            let mirrored = root.join(filename);
            if !mirrored.exists() {
                copy_file(&cached, &mirrored).await?;
            }
            let mirrored_sidecar = sidecar_path(root, filename);
            if !mirrored_sidecar.exists() {
                write_asset_metadata(&metadata, &mirrored_sidecar)?;
            }
        }

        let local_path = public_path(&self.public_prefix, filename);
        self.reporter.report(ProgressEvent::AssetReused {
            url: url.to_string(),
            local_path: local_path.clone(),
        });

        Ok(AssetResolution::Reused {
            local_path,
            dominant_color: metadata.dominant_color,
        })
    }

    async fn fetch_and_store(
        &self,
        url: &str,
        filename: &str,
    ) -> Result<AssetResolution, CacheError> {
        self.ensure_directories()?;

        let raw_name = source_filename(url).unwrap_or_else(|| filename.to_string());
        let raw_primary = self.primary_root().join(&raw_name);

        download_asset(&self.client, url, &raw_primary, &self.reporter).await?;
        self.copy_to_mirrors(&raw_name).await?;

        if raw_name != filename {
            let target = self.primary_root().join(filename);
            if let Err(e) = self.transcoder.transcode(&raw_primary, &target).await {
                // A half-written target would be taken as authoritative next run.
                let _ = tokio::fs::remove_file(&target).await;
                self.reporter.report(ProgressEvent::TranscodeFailed {
                    url: url.to_string(),
                    error: e.to_string(),
                });
                let resolution = AssetResolution::Degraded {
                    local_path: public_path(&self.public_prefix, &raw_name),
                };
                self.remember_degraded(filename, &resolution);
                return Ok(resolution);
            }

            self.remove_everywhere(&raw_name).await?;
            self.copy_to_mirrors(filename).await?;
        }

        let metadata = AssetMetadata {
            dominant_color: self.color_of(&self.primary_root().join(filename)).await,
        };
        for root in &self.roots {
            write_asset_metadata(&metadata, &sidecar_path(root, filename))?;
        }

        let local_path = public_path(&self.public_prefix, filename);
        self.reporter.report(ProgressEvent::AssetCached {
            url: url.to_string(),
            local_path: local_path.clone(),
        });

        Ok(AssetResolution::Cached {
            local_path,
            dominant_color: metadata.dominant_color,
        })
    }

    async fn color_of(&self, path: &Path) -> Option<String> {
        match extract_color_async(path.to_path_buf()).await {
            Ok(color) => Some(color),
            Err(e) => {
                self.reporter.report(ProgressEvent::ColorExtractionFailed {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    async fn copy_to_mirrors(&self, name: &str) -> Result<(), CacheError> {
        let source = self.primary_root().join(name);
        for root in self.mirror_roots() {
            copy_file(&source, &root.join(name)).await?;
        }
        Ok(())
    }

    async fn remove_everywhere(&self, name: &str) -> Result<(), CacheError> {
        for root in &self.roots {
            let path = root.join(name);
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| CacheError::RemoveFailed { path, source: e })?;
        }
        Ok(())
    }
}

async fn copy_file(from: &Path, to: &Path) -> Result<(), CacheError> {
    tokio::fs::copy(from, to)
        .await
        .map(|_| ())
        .map_err(|e| CacheError::CopyFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        })
}

#[async_trait]
impl<C: HttpClient> AssetResolver for AssetCache<C> {
    async fn resolve(&self, url: Option<&str>) -> AssetResolution {
        let Some(url) = url.filter(|u| !u.is_empty()) else {
            return AssetResolution::PassThrough { url: None };
        };

        if !is_private_origin(url, &self.private_hosts) {
            self.reporter.report(ProgressEvent::AssetPassedThrough {
                url: url.to_string(),
            });
            return AssetResolution::PassThrough {
                url: Some(url.to_string()),
            };
        }

        let Some(filename) = cache_filename(url) else {
            self.reporter.report(ProgressEvent::AssetFetchFailed {
                url: url.to_string(),
                error: "URL has no file name".to_string(),
            });
            return AssetResolution::Failed;
        };

        if let Some(resolution) = self.degraded_resolution(&filename) {
            self.reporter.report(ProgressEvent::AssetReused {
                url: url.to_string(),
                local_path: resolution.local_path().unwrap_or_default().to_string(),
            });
            return resolution;
        }

        let result = if self.primary_root().join(&filename).exists() {
            self.reuse(url, &filename).await
        } else {
            self.fetch_and_store(url, &filename).await
        };

        result.unwrap_or_else(|e| {
            self.reporter.report(ProgressEvent::AssetFetchFailed {
                url: url.to_string(),
                error: e.to_string(),
            });
            AssetResolution::Failed
        })
    }
}
