pub mod asset;
pub mod config;
pub mod content;
pub mod error;
pub mod http;
pub mod output;
pub mod progress;
pub mod sync;

// Re-export main types for convenience
pub use asset::{
    AssetCache, AssetResolution, AssetResolver, CwebpTranscoder, NativeTranscoder,
    SharedTranscoder, Transcoder,
};
pub use config::SyncConfig;
pub use content::{ContentRecord, NormalizedRecord, fetch_content, transform_record};
pub use error::{
    CacheError, ColorError, ContentError, DownloadError, MetadataError, SyncError,
    TranscodeError, TransformError,
};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use output::{read_records, write_records};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use sync::{SyncRun, sync_content};
