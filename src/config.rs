// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::time::Duration;

/// Base URL used when `WORDPRESS_URL` is not set
pub const DEFAULT_BASE_URL: &str = "http://wordpress.local";

/// Default number of records requested from the content source
pub const DEFAULT_LIMIT: usize = 100;

/// Default WebP quality handed to the transcoder
pub const DEFAULT_QUALITY: u8 = 80;

/// Host fragments that mark an asset as living on the private origin
pub const DEFAULT_PRIVATE_HOSTS: &[&str] = &[".local", "localhost"];

/// Configuration for a sync run
///
/// Built once by the caller and handed to each component at construction;
/// nothing in the library reads process-wide state.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the WordPress install (the GraphQL endpoint hangs off it)
    pub base_url: String,
    /// Maximum number of records to request
    pub limit: usize,
    /// Dev-facing cache root; cache presence is checked here
    pub dev_root: PathBuf,
    /// Production-facing cache root, mirrored from `dev_root`
    pub prod_root: PathBuf,
    /// URL prefix under which cached assets are served
    pub public_prefix: String,
    /// Path of the aggregate JSON artifact
    pub output_path: PathBuf,
    /// Host fragments eligible for caching
    pub private_hosts: Vec<String>,
    /// WebP quality (0-100)
    pub quality: u8,
    /// Per-request network timeout
    pub timeout: Duration,
}

impl SyncConfig {
    /// The GraphQL endpoint for `base_url`
    pub fn graphql_endpoint(&self) -> String {
        format!("{}/graphql", self.base_url.trim_end_matches('/'))
    }

    /// Both cache roots, primary first
    pub fn cache_roots(&self) -> [PathBuf; 2] {
        [self.dev_root.clone(), self.prod_root.clone()]
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            limit: DEFAULT_LIMIT,
            dev_root: PathBuf::from("public/images"),
            prod_root: PathBuf::from("dist/images"),
            public_prefix: "/images".to_string(),
            output_path: PathBuf::from("src/data/posts.json"),
            private_hosts: DEFAULT_PRIVATE_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            quality: DEFAULT_QUALITY,
            timeout: Duration::from_secs(60),
        }
    }
}
