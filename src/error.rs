// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when querying the remote content source
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Failed to query content from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} from content endpoint {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Content query returned errors: {}", messages.join("; "))]
    QueryErrors { messages: Vec<String> },

    #[error("Failed to decode content response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Errors that can occur while downloading a single asset
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to finalize download {path}: {source}")]
    FinalizeFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors that can occur when converting an image to WebP
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to run {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ExitStatus {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to encode {path}: {source}")]
    EncodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcoding task failed: {0}")]
    TaskFailed(String),
}

/// Errors that can occur when deriving a dominant color
#[derive(Error, Debug)]
pub enum ColorError {
    #[error("Failed to decode image {path}: {source}")]
    DecodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Image {path} has no opaque pixels")]
    NoPixels { path: PathBuf },

    #[error("Color extraction task failed: {0}")]
    TaskFailed(String),
}

/// Errors that can occur reading or writing JSON files
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read metadata file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write metadata file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse metadata JSON in {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize metadata: {0}")]
    JsonSerializeFailed(#[from] serde_json::Error),
}

/// Errors that can occur inside the asset cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

/// Errors that make a single record unusable
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Invalid publish date '{date_str}': {reason}")]
    InvalidDate { date_str: String, reason: String },

    #[error("Duplicate slug '{0}'")]
    DuplicateSlug(String),
}

/// Top-level errors for sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Content source unavailable: {0}")]
    SourceUnavailable(#[from] ContentError),

    #[error("Content source returned no records")]
    EmptySource,

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Failed to write output: {0}")]
    Output(#[from] MetadataError),
}
