// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use crate::asset::PARTIAL_SUFFIX;
use crate::content::NormalizedRecord;
use crate::error::MetadataError;

/// Write the aggregate artifact consumed by the rendering layer
///
/// The document goes to `<path>.partial` first and is renamed over `path`,
/// so readers never observe a half-written file.
pub fn write_records(records: &[NormalizedRecord], path: &Path) -> Result<(), MetadataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| MetadataError::WriteFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let json = serde_json::to_string_pretty(records)?;

    let mut partial = path.as_os_str().to_owned();
    partial.push(PARTIAL_SUFFIX);
    let partial = Path::new(&partial);

    std::fs::write(partial, json).map_err(|e| MetadataError::WriteFailed {
        path: partial.to_path_buf(),
        source: e,
    })?;

    std::fs::rename(partial, path).map_err(|e| MetadataError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read the aggregate artifact back
pub fn read_records(path: &Path) -> Result<Vec<NormalizedRecord>, MetadataError> {
    let content = std::fs::read_to_string(path).map_err(|e| MetadataError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| MetadataError::JsonParseFailed {
        path: path.to_path_buf(),
        source: e,
    })
}
