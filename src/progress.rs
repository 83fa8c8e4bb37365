// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::sync::Arc;

/// Events emitted during a content sync for progress reporting
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The content query is being sent
    FetchingContent { endpoint: String },

    /// The content query returned records
    ContentFetched { record_count: usize },

    /// The content query failed
    ContentUnavailable { error: String },

    /// Leftover `.partial` files were removed from the cache roots
    PartialFilesCleanedUp { count: usize },

    /// A record is about to be transformed
    RecordStarting {
        slug: String,
        /// Index of this record in the fetched list
        record_index: usize,
        total_records: usize,
    },

    /// A record was transformed and will be written
    RecordCompleted { slug: String },

    /// A record could not be transformed and is left out of the output
    RecordFailed { slug: String, error: String },

    /// An asset is being downloaded
    AssetDownloading {
        url: String,
        content_length: Option<u64>,
    },

    /// An asset was downloaded and stored
    AssetCached { url: String, local_path: String },

    /// An asset was already in the cache
    AssetReused { url: String, local_path: String },

    /// An asset is not on the private origin and was left alone
    AssetPassedThrough { url: String },

    /// An asset could not be downloaded
    AssetFetchFailed { url: String, error: String },

    /// WebP conversion failed; the original file is served instead
    TranscodeFailed { url: String, error: String },

    /// No dominant color could be derived
    ColorExtractionFailed { path: PathBuf, error: String },

    /// A missing metadata sidecar was written for an existing asset
    MetadataBackfilled { filename: String },

    /// The aggregate output was written
    OutputWritten { path: PathBuf, record_count: usize },

    /// Sync operation completed
    SyncCompleted {
        processed_count: usize,
        skipped_count: usize,
        failed_count: usize,
        degraded_count: usize,
    },
}

/// Trait for reporting progress events during synchronization.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

/// Reporter that records every event, for assertions in tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: std::sync::Mutex<Vec<ProgressEvent>>,
}

#[cfg(test)]
impl RecordingReporter {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ProgressReporter for RecordingReporter {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}
