mod cache;
mod color;
mod download;
mod filename;
mod metadata;
mod transcode;

pub use cache::{AssetCache, AssetResolution, AssetResolver};
pub use color::{dominant_color, extract_color, extract_color_async, to_hex};
pub use download::{PARTIAL_SUFFIX, download_asset};
pub use filename::{
    TARGET_EXTENSION, cache_filename, is_private_origin, is_raster_extension, public_path,
    source_filename,
};
pub use metadata::{
    AssetMetadata, META_DIR, read_asset_metadata, sidecar_path, write_asset_metadata,
};
pub use transcode::{CwebpTranscoder, NativeTranscoder, SharedTranscoder, Transcoder};
