// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;

use crate::asset::{AssetCache, SharedTranscoder};
use crate::config::SyncConfig;
use crate::content::{TransformOutcome, fetch_content, transform_record};
use crate::error::{SyncError, TransformError};
use crate::http::HttpClient;
use crate::output::write_records;
use crate::progress::{ProgressEvent, SharedProgressReporter};

/// Tally of one sync run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncRun {
    /// Records with at least one asset now served locally
    pub processed: usize,
    /// Records with nothing to cache (no images, or only public ones)
    pub skipped: usize,
    /// Records with a failed asset or that could not be transformed
    pub failed: usize,
    /// Assets served in their original format because conversion failed
    pub degraded: usize,
    /// Number of records written to the output artifact
    pub written: usize,
    /// Details of failed records (slug, error message)
    pub failed_records: Vec<(String, String)>,
}

impl SyncRun {
    fn classify(&mut self, outcome: &TransformOutcome) {
        self.degraded += outcome.degraded_assets;

        if outcome.failed_assets > 0 {
            self.failed += 1;
            self.failed_records.push((
                outcome.record.slug.clone(),
                format!("{} asset(s) could not be fetched", outcome.failed_assets),
            ));
        } else if outcome.local_assets > 0 {
            self.processed += 1;
        } else {
            self.skipped += 1;
        }
    }

    fn reject(&mut self, slug: &str, error: &TransformError) {
        self.failed += 1;
        self.failed_records
            .push((slug.to_string(), error.to_string()));
    }
}

/// Mirror the content source into the local cache and output artifact
///
/// This is the main entry point for the library. It:
/// 1. Queries the content source; no records aborts the run before anything is written
/// 2. Prepares the cache directories
/// 3. Transforms each record in order, caching its images
/// 4. Writes the aggregate output
pub async fn sync_content<C: HttpClient + Clone>(
    client: &C,
    transcoder: SharedTranscoder,
    config: &SyncConfig,
    reporter: SharedProgressReporter,
) -> Result<SyncRun, SyncError> {
    let endpoint = config.graphql_endpoint();
    reporter.report(ProgressEvent::FetchingContent {
        endpoint: endpoint.clone(),
    });

    let records = match fetch_content(client, &endpoint, config.limit).await {
        Ok(records) => records,
        Err(e) => {
            reporter.report(ProgressEvent::ContentUnavailable {
                error: e.to_string(),
            });
            return Err(SyncError::SourceUnavailable(e));
        }
    };

    if records.is_empty() {
        reporter.report(ProgressEvent::ContentUnavailable {
            error: "no records returned".to_string(),
        });
        return Err(SyncError::EmptySource);
    }

    let total_records = records.len();
    reporter.report(ProgressEvent::ContentFetched {
        record_count: total_records,
    });

    let cache = AssetCache::new(client.clone(), transcoder, config, reporter.clone());
    let partial_files_cleaned = cache.prepare()?;
    if partial_files_cleaned > 0 {
        reporter.report(ProgressEvent::PartialFilesCleanedUp {
            count: partial_files_cleaned,
        });
    }

    let mut run = SyncRun::default();
    let mut seen_slugs = HashSet::new();
    let mut normalized = Vec::with_capacity(total_records);

    for (record_index, record) in records.into_iter().enumerate() {
        let slug = record.slug.clone();
        reporter.report(ProgressEvent::RecordStarting {
            slug: slug.clone(),
            record_index,
            total_records,
        });

        if !seen_slugs.insert(slug.clone()) {
            let error = TransformError::DuplicateSlug(slug.clone());
            reporter.report(ProgressEvent::RecordFailed {
                slug: slug.clone(),
                error: error.to_string(),
            });
            run.reject(&slug, &error);
            continue;
        }

        match transform_record(record, &cache).await {
            Ok(outcome) => {
                run.classify(&outcome);
                reporter.report(ProgressEvent::RecordCompleted { slug });
                normalized.push(outcome.record);
            }
            Err(e) => {
                reporter.report(ProgressEvent::RecordFailed {
                    slug: slug.clone(),
                    error: e.to_string(),
                });
                run.reject(&slug, &e);
            }
        }
    }

    write_records(&normalized, &config.output_path)?;
    run.written = normalized.len();
    reporter.report(ProgressEvent::OutputWritten {
        path: config.output_path.clone(),
        record_count: run.written,
    });

    reporter.report(ProgressEvent::SyncCompleted {
        processed_count: run.processed,
        skipped_count: run.skipped,
        failed_count: run.failed,
        degraded_count: run.degraded,
    });

    Ok(run)
}
