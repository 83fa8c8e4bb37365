// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::asset::{AssetResolution, AssetResolver};
use crate::error::TransformError;

use super::record::{ContentRecord, FeaturedImage, Term};

/// Double-quoted `src` pointing at an absolute http(s) raster image
static INLINE_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src="(https?://[^"\s]*\.(?i:jpe?g|png|gif|webp))""#).unwrap()
});

/// Attributes that only make sense against the origin's own image sizes
static PORTABILITY_ATTRIBUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+(?i:srcset|sizes|width|height)=(?:"[^"]*"|'[^']*')"#).unwrap()
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// A content record ready for the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub id: i64,
    pub slug: String,
    pub title: String,
    /// Body markup with inline images pointing at local paths
    pub content: String,
    /// Plain-text excerpt
    pub excerpt: String,
    /// RFC 3339, UTC
    pub date: String,
    pub author: Option<String>,
    pub categories: Vec<Term>,
    pub tags: Vec<Term>,
    pub hero_image: Option<String>,
    pub hero_width: Option<u32>,
    pub hero_height: Option<u32>,
    pub hero_color: Option<String>,
}

impl From<NormalizedRecord> for ContentRecord {
    /// Lets a previously written record be run through the pipeline again
    fn from(record: NormalizedRecord) -> Self {
        Self {
            id: record.id,
            slug: record.slug,
            title: record.title,
            content: record.content,
            excerpt: Some(record.excerpt).filter(|e| !e.is_empty()),
            date: record.date,
            featured_image: record.hero_image.map(|source_url| FeaturedImage {
                source_url,
                width: record.hero_width,
                height: record.hero_height,
            }),
            author: record.author,
            categories: record.categories,
            tags: record.tags,
        }
    }
}

/// A transformed record plus what happened to its assets
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    pub record: NormalizedRecord,
    /// Assets now served from the local cache (fresh, reused or degraded)
    pub local_assets: usize,
    /// Assets left untouched because they are not on the private origin
    pub passed_through: usize,
    /// Assets that could not be resolved
    pub failed_assets: usize,
    /// Assets served in their original format because conversion failed
    pub degraded_assets: usize,
}

impl TransformOutcome {
    fn tally(&mut self, resolution: &AssetResolution) {
        match resolution {
            AssetResolution::Cached { .. } | AssetResolution::Reused { .. } => {
                self.local_assets += 1
            }
            AssetResolution::Degraded { .. } => {
                self.local_assets += 1;
                self.degraded_assets += 1;
            }
            AssetResolution::PassThrough { url: Some(_) } => self.passed_through += 1,
            AssetResolution::PassThrough { url: None } => {}
            AssetResolution::Failed => self.failed_assets += 1,
        }
    }
}

/// Strip every tag, decode entities and trim
pub fn strip_tags(markup: &str) -> String {
    let text = TAG.replace_all(markup, "");
    html_escape::decode_html_entities(&text).trim().to_string()
}

/// Remove `srcset`, `sizes`, `width` and `height` attributes everywhere
pub fn strip_attributes(markup: &str) -> String {
    PORTABILITY_ATTRIBUTES.replace_all(markup, "").into_owned()
}

/// Normalize the source's publish date to RFC 3339 UTC
///
/// Accepts RFC 3339 with an offset, or the naive `YYYY-MM-DDTHH:MM:SS`
/// form which is taken as UTC.
pub fn normalize_date(date_str: &str) -> Result<String, TransformError> {
    let trimmed = date_str.trim();

    let parsed = DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.and_utc())
        })
        .map_err(|e| TransformError::InvalidDate {
            date_str: date_str.to_string(),
            reason: e.to_string(),
        })?;

    Ok(parsed.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Rewrite every eligible inline image in document order, then strip the
/// origin-specific sizing attributes
///
/// References that fail to resolve become `src=""`. Returns the new markup
/// and the resolution of each reference.
pub async fn rewrite_body<R: AssetResolver + ?Sized>(
    body: &str,
    resolver: &R,
) -> (String, Vec<AssetResolution>) {
    let mut rewritten = String::with_capacity(body.len());
    let mut resolutions = Vec::new();
    let mut last_end = 0;

    let references: Vec<_> = INLINE_IMAGE
        .captures_iter(body)
        .filter_map(|captures| Some((captures.get(0)?.range(), captures.get(1)?.as_str())))
        .collect();

    for (range, url) in references {
        let resolution = resolver.resolve(Some(url)).await;

        rewritten.push_str(&body[last_end..range.start]);
        rewritten.push_str("src=\"");
        rewritten.push_str(resolution.local_path().unwrap_or(""));
        rewritten.push('"');
        last_end = range.end;
        resolutions.push(resolution);
    }
    rewritten.push_str(&body[last_end..]);

    (strip_attributes(&rewritten), resolutions)
}

/// Transform one record: resolve its hero image and inline images through
/// `resolver`, clean the excerpt and normalize the date
pub async fn transform_record<R: AssetResolver + ?Sized>(
    record: ContentRecord,
    resolver: &R,
) -> Result<TransformOutcome, TransformError> {
    let date = normalize_date(&record.date)?;

    let mut outcome = TransformOutcome {
        record: NormalizedRecord {
            id: record.id,
            slug: record.slug,
            title: record.title,
            content: String::new(),
            excerpt: record.excerpt.as_deref().map(strip_tags).unwrap_or_default(),
            date,
            author: record.author,
            categories: record.categories,
            tags: record.tags,
            hero_image: None,
            hero_width: None,
            hero_height: None,
            hero_color: None,
        },
        local_assets: 0,
        passed_through: 0,
        failed_assets: 0,
        degraded_assets: 0,
    };

    if let Some(featured) = record.featured_image {
        let resolution = resolver.resolve(Some(&featured.source_url)).await;
        outcome.tally(&resolution);
        outcome.record.hero_image = resolution.local_path().map(String::from);
        outcome.record.hero_color = resolution.dominant_color().map(String::from);
        outcome.record.hero_width = featured.width;
        outcome.record.hero_height = featured.height;
    }

    let (content, inline) = rewrite_body(&record.content, resolver).await;
    outcome.record.content = content;
    for resolution in &inline {
        outcome.tally(resolution);
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    /// Resolves `.local` URLs to `/images/<name>.webp`, fails `broken` ones
    #[derive(Default)]
    struct StubResolver {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AssetResolver for StubResolver {
        async fn resolve(&self, url: Option<&str>) -> AssetResolution {
            let Some(url) = url else {
                return AssetResolution::PassThrough { url: None };
            };
            self.seen.lock().unwrap().push(url.to_string());

            if !url.contains(".local") {
                return AssetResolution::PassThrough {
                    url: Some(url.to_string()),
                };
            }
            if url.contains("broken") {
                return AssetResolution::Failed;
            }
            let name = url.rsplit('/').next().unwrap();
            let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
            AssetResolution::Cached {
                local_path: format!("/images/{stem}.webp"),
                dominant_color: Some("#336699".to_string()),
            }
        }
    }

    fn make_record(content: &str) -> ContentRecord {
        ContentRecord {
            id: 1,
            slug: "launch-day".to_string(),
            title: "Launch Day".to_string(),
            content: content.to_string(),
            excerpt: Some("<p>We have liftoff &hellip; finally&#8217;s here</p>\n".to_string()),
            date: "2024-01-15T12:00:00".to_string(),
            featured_image: Some(FeaturedImage {
                source_url: "http://site.local/img/rocket.jpg".to_string(),
                width: Some(1200),
                height: Some(800),
            }),
            author: Some("Ada".to_string()),
            categories: vec![Term {
                name: "News".to_string(),
                slug: "news".to_string(),
            }],
            tags: vec![],
        }
    }

    #[test]
    fn strip_tags_yields_plain_text() {
        assert_eq!(
            strip_tags("<p>Hello <strong>world</strong> &amp; more</p>\n"),
            "Hello world & more"
        );
        assert_eq!(strip_tags("   "), "");
    }

    #[test]
    fn strip_attributes_removes_all_four() {
        let markup = r#"<img src="/images/a.webp" width="300" height="200" srcset="a-300.jpg 300w, a-600.jpg 600w" sizes="(max-width: 300px) 100vw, 300px" alt="A">"#;
        assert_eq!(
            strip_attributes(markup),
            r#"<img src="/images/a.webp" alt="A">"#
        );
    }

    #[test]
    fn strip_attributes_leaves_data_attributes() {
        let markup = r#"<div data-width="3" class="x"></div>"#;
        assert_eq!(strip_attributes(markup), markup);
    }

    #[test]
    fn normalize_naive_date_as_utc() {
        assert_eq!(
            normalize_date("2024-01-15T12:00:00").unwrap(),
            "2024-01-15T12:00:00Z"
        );
    }

    #[test]
    fn normalize_offset_date_to_utc() {
        assert_eq!(
            normalize_date("2024-01-15T12:00:00+02:00").unwrap(),
            "2024-01-15T10:00:00Z"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_date("2024-01-15T12:00:00").unwrap();
        assert_eq!(normalize_date(&once).unwrap(), once);
    }

    #[test]
    fn invalid_date_fails() {
        assert!(matches!(
            normalize_date("last tuesday"),
            Err(TransformError::InvalidDate { .. })
        ));
        assert!(normalize_date("").is_err());
    }

    #[tokio::test]
    async fn body_images_rewritten_and_attributes_stripped() {
        let resolver = StubResolver::default();
        let body = r#"<figure><img src="http://host.local/a.jpg" srcset="http://host.local/a-300x200.jpg 300w" sizes="(max-width: 300px) 100vw" width="300" height="200" alt=""></figure>"#;

        let (rewritten, _) = rewrite_body(body, &resolver).await;

        assert_eq!(
            rewritten,
            r#"<figure><img src="/images/a.webp" alt=""></figure>"#
        );
        for attribute in ["srcset=", "sizes=", "width=", "height="] {
            assert!(!rewritten.contains(attribute), "{attribute} survived");
        }
    }

    #[tokio::test]
    async fn extension_match_is_case_insensitive() {
        let resolver = StubResolver::default();
        let body = r#"<img src="http://host.local/PHOTO.JPG">"#;

        let (rewritten, _) = rewrite_body(body, &resolver).await;

        assert_eq!(rewritten, r#"<img src="/images/PHOTO.webp">"#);
    }

    #[tokio::test]
    async fn only_double_quoted_raster_src_is_matched() {
        let resolver = StubResolver::default();
        let body = concat!(
            r#"<img src='http://host.local/single.jpg'>"#,
            r#"<a href="http://host.local/linked.jpg">x</a>"#,
            r#"<img src="http://host.local/vector.svg">"#,
            r#"<img src="/images/local.webp">"#,
        );

        let (rewritten, _) = rewrite_body(body, &resolver).await;

        assert_eq!(rewritten, body);
        assert!(resolver.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_reference_becomes_empty() {
        let resolver = StubResolver::default();
        let body = r#"<img src="http://host.local/broken.png">"#;

        let (rewritten, _) = rewrite_body(body, &resolver).await;

        assert_eq!(rewritten, r#"<img src="">"#);
        assert!(!rewritten.contains("host.local"));
    }

    #[tokio::test]
    async fn references_resolved_in_document_order() {
        let resolver = StubResolver::default();
        let body = r#"<img src="http://host.local/1.jpg"><p>text</p><img src="https://cdn.example.com/2.png"><img src="http://host.local/3.gif">"#;

        rewrite_body(body, &resolver).await;

        assert_eq!(
            *resolver.seen.lock().unwrap(),
            vec![
                "http://host.local/1.jpg",
                "https://cdn.example.com/2.png",
                "http://host.local/3.gif",
            ]
        );
    }

    #[tokio::test]
    async fn transform_fills_hero_fields_and_excerpt() {
        let resolver = StubResolver::default();
        let record = make_record(r#"<p><img src="http://site.local/img/inline.png" width="10"></p>"#);

        let outcome = transform_record(record, &resolver).await.unwrap();
        let normalized = &outcome.record;

        assert_eq!(normalized.slug, "launch-day");
        assert_eq!(normalized.hero_image.as_deref(), Some("/images/rocket.webp"));
        assert_eq!(normalized.hero_color.as_deref(), Some("#336699"));
        assert_eq!(normalized.hero_width, Some(1200));
        assert_eq!(normalized.hero_height, Some(800));
        assert_eq!(normalized.excerpt, "We have liftoff … finally’s here");
        assert_eq!(normalized.date, "2024-01-15T12:00:00Z");
        assert_eq!(
            normalized.content,
            r#"<p><img src="/images/inline.webp"></p>"#
        );
        assert_eq!(outcome.local_assets, 2);
        assert_eq!(outcome.failed_assets, 0);
    }

    #[tokio::test]
    async fn transform_counts_failures_and_pass_through() {
        let resolver = StubResolver::default();
        let mut record = make_record(
            r#"<img src="http://site.local/broken.jpg"><img src="https://cdn.example.com/x.jpg">"#,
        );
        record.featured_image = None;

        let outcome = transform_record(record, &resolver).await.unwrap();

        assert_eq!(outcome.record.hero_image, None);
        assert_eq!(outcome.record.hero_color, None);
        assert_eq!(outcome.failed_assets, 1);
        assert_eq!(outcome.passed_through, 1);
        assert_eq!(outcome.local_assets, 0);
    }

    #[tokio::test]
    async fn transform_is_idempotent() {
        let resolver = StubResolver::default();
        let record = make_record(
            r#"<img src="http://site.local/a.jpg" srcset="x 1w" sizes="1px" width="1" height="1"><img src="https://cdn.example.com/b.png">"#,
        );

        let once = transform_record(record, &resolver).await.unwrap().record;
        let twice = transform_record(ContentRecord::from(once.clone()), &resolver)
            .await
            .unwrap()
            .record;

        assert_eq!(once.content, twice.content);
        assert_eq!(once.excerpt, twice.excerpt);
        assert_eq!(once.date, twice.date);
        assert_eq!(once.hero_image, twice.hero_image);
    }

    #[tokio::test]
    async fn transform_rejects_bad_date() {
        let resolver = StubResolver::default();
        let mut record = make_record("");
        record.date = "not a date".to_string();

        let result = transform_record(record, &resolver).await;

        assert!(matches!(result, Err(TransformError::InvalidDate { .. })));
        assert!(resolver.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn normalized_record_serializes_camel_case() {
        let record = NormalizedRecord {
            id: 1,
            slug: "a".to_string(),
            title: "A".to_string(),
            content: String::new(),
            excerpt: String::new(),
            date: "2024-01-15T12:00:00Z".to_string(),
            author: None,
            categories: vec![],
            tags: vec![],
            hero_image: Some("/images/a.webp".to_string()),
            hero_width: Some(10),
            hero_height: Some(20),
            hero_color: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["heroImage"], "/images/a.webp");
        assert_eq!(json["heroWidth"], 10);
        assert!(json["heroColor"].is_null());
    }
}
