// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use url::Url;

/// Extension every cached raster image is converted to
pub const TARGET_EXTENSION: &str = "webp";

/// Check if a string is a raster image extension we know how to convert
pub fn is_raster_extension(ext: &str) -> bool {
    matches!(
        ext.to_lowercase().as_str(),
        "jpg" | "jpeg" | "png" | "gif" | "webp"
    )
}

/// Whether `url` points at the private origin and should be cached locally
///
/// Matches when the URL's host contains any of `private_hosts`. Unparseable
/// URLs and URLs without a host are never eligible.
pub fn is_private_origin(url: &str, private_hosts: &[String]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    private_hosts
        .iter()
        .any(|fragment| host.contains(&fragment.to_lowercase()))
}

/// The file name the remote asset is downloaded as, before conversion
///
/// This is the sanitized final path segment of the URL. Returns `None` when
/// the URL has no usable final segment.
pub fn source_filename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())?;

    let sanitized = sanitize_filename::sanitize(segment);
    if sanitized.is_empty() || sanitized.starts_with('.') {
        return None;
    }
    Some(sanitized)
}

/// The deterministic cache file name for a remote asset
///
/// Known raster extensions are replaced with [`TARGET_EXTENSION`]; anything
/// else keeps its name and is cached as-is.
pub fn cache_filename(url: &str) -> Option<String> {
    let source = source_filename(url)?;
    Some(convert_extension(&source))
}

fn convert_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && is_raster_extension(ext) => {
            format!("{}.{}", stem, TARGET_EXTENSION)
        }
        _ => filename.to_string(),
    }
}

/// The path under which a cached file is served
pub fn public_path(prefix: &str, filename: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn private_hosts() -> Vec<String> {
        vec![".local".to_string(), "localhost".to_string()]
    }

    // === Origin gating ===

    #[test]
    fn local_hosts_are_private() {
        assert!(is_private_origin(
            "http://site.local/img/rocket.jpg",
            &private_hosts()
        ));
        assert!(is_private_origin(
            "http://localhost:8080/wp-content/uploads/a.png",
            &private_hosts()
        ));
        assert!(is_private_origin(
            "https://CMS.LOCAL/a.png",
            &private_hosts()
        ));
    }

    #[test]
    fn public_hosts_pass_through() {
        assert!(!is_private_origin(
            "https://cdn.example.com/img/rocket.jpg",
            &private_hosts()
        ));
        assert!(!is_private_origin(
            "https://example.com/site.local/rocket.jpg",
            &private_hosts()
        ));
    }

    #[test]
    fn local_paths_pass_through() {
        assert!(!is_private_origin("/images/rocket.webp", &private_hosts()));
        assert!(!is_private_origin("", &private_hosts()));
    }

    // === Filename derivation ===

    #[test]
    fn raster_extension_becomes_webp() {
        assert_eq!(
            cache_filename("http://site.local/img/rocket.jpg").as_deref(),
            Some("rocket.webp")
        );
        assert_eq!(
            cache_filename("http://site.local/a/b/photo-1024x768.JPEG").as_deref(),
            Some("photo-1024x768.webp")
        );
        assert_eq!(
            cache_filename("http://site.local/chart.png").as_deref(),
            Some("chart.webp")
        );
    }

    #[test]
    fn webp_keeps_its_name() {
        assert_eq!(
            cache_filename("http://site.local/already.webp").as_deref(),
            Some("already.webp")
        );
    }

    #[test]
    fn non_raster_keeps_its_name() {
        assert_eq!(
            cache_filename("http://site.local/logo.svg").as_deref(),
            Some("logo.svg")
        );
        assert_eq!(
            cache_filename("http://site.local/README").as_deref(),
            Some("README")
        );
    }

    #[test]
    fn query_string_is_ignored() {
        assert_eq!(
            cache_filename("http://site.local/img/rocket.jpg?ver=3").as_deref(),
            Some("rocket.webp")
        );
    }

    #[test]
    fn trailing_slash_has_no_filename() {
        assert_eq!(cache_filename("http://site.local/img/"), None);
        assert_eq!(cache_filename("not a url"), None);
    }

    #[test]
    fn source_filename_keeps_original_extension() {
        assert_eq!(
            source_filename("http://site.local/img/rocket.jpg").as_deref(),
            Some("rocket.jpg")
        );
    }

    #[test]
    fn public_path_joins_prefix() {
        assert_eq!(public_path("/images", "rocket.webp"), "/images/rocket.webp");
        assert_eq!(public_path("/images/", "rocket.webp"), "/images/rocket.webp");
    }
}
