// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

/// Directory under each cache root holding the sidecars
pub const META_DIR: &str = "meta";

/// Sidecar stored next to every cached asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub dominant_color: Option<String>,
}

/// `<root>/meta/<filename>.json`
pub fn sidecar_path(root: &Path, filename: &str) -> PathBuf {
    root.join(META_DIR).join(format!("{}.json", filename))
}

/// Write asset metadata to a JSON file
pub fn write_asset_metadata(metadata: &AssetMetadata, path: &Path) -> Result<(), MetadataError> {
    let json = serde_json::to_string_pretty(metadata)?;
    std::fs::write(path, json).map_err(|e| MetadataError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read asset metadata from a JSON file
pub fn read_asset_metadata(path: &Path) -> Result<AssetMetadata, MetadataError> {
    let content = std::fs::read_to_string(path).map_err(|e| MetadataError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| MetadataError::JsonParseFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sidecar_lives_in_meta_dir() {
        assert_eq!(
            sidecar_path(Path::new("public/images"), "rocket.webp"),
            PathBuf::from("public/images/meta/rocket.webp.json")
        );
    }

    #[test]
    fn null_color_is_written_explicitly() {
        let json = serde_json::to_string(&AssetMetadata {
            dominant_color: None,
        })
        .unwrap();
        assert_eq!(json, r##"{"dominantColor":null}"##);
    }

    #[test]
    fn write_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rocket.webp.json");
        let metadata = AssetMetadata {
            dominant_color: Some("#a1b2c3".to_string()),
        };

        write_asset_metadata(&metadata, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r##""dominantColor": "#a1b2c3""##));
        assert_eq!(read_asset_metadata(&path).unwrap(), metadata);
    }

    #[test]
    fn read_nonexistent_returns_error() {
        let dir = tempdir().unwrap();
        let result = read_asset_metadata(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(MetadataError::ReadFailed { .. })));
    }

    #[test]
    fn read_corrupt_returns_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            read_asset_metadata(&path),
            Err(MetadataError::JsonParseFailed { .. })
        ));
    }
}
