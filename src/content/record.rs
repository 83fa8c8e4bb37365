// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ContentError;

/// A content item as delivered by the remote source
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRecord {
    pub id: i64,
    /// Unique across a sync; joins content to rendering
    pub slug: String,
    pub title: String,
    /// Raw body markup
    pub content: String,
    pub excerpt: Option<String>,
    /// Publish timestamp exactly as the source reported it
    pub date: String,
    pub featured_image: Option<FeaturedImage>,
    pub author: Option<String>,
    pub categories: Vec<Term>,
    pub tags: Vec<Term>,
}

/// The hero image attached to a record
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturedImage {
    pub source_url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A category or tag label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
}

/// GraphQL servers send `null` for absent lists and strings; treat it like a
/// missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Wire schema of the GraphQL response. Every field is defaulted so a
// sparse node still yields a complete ContentRecord.

#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub data: Option<QueryData>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<QueryError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryData {
    #[serde(default)]
    pub posts: Option<Connection<PostNode>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryError {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct Connection<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Edge<T> {
    pub node: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostNode {
    #[serde(default, deserialize_with = "null_as_default")]
    pub database_id: i64,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub featured_image: Option<Edge<MediaNode>>,
    #[serde(default)]
    pub author: Option<Edge<AuthorNode>>,
    #[serde(default)]
    pub categories: Option<Connection<Term>>,
    #[serde(default)]
    pub tags: Option<Connection<Term>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MediaNode {
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub media_details: Option<MediaDetails>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaDetails {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthorNode {
    #[serde(default)]
    pub name: Option<String>,
}

impl From<PostNode> for ContentRecord {
    fn from(node: PostNode) -> Self {
        let slug = node
            .slug
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("post-{}", node.database_id));

        let featured_image = node
            .featured_image
            .and_then(|edge| edge.node)
            .and_then(|media| {
                let source_url = media.source_url.filter(|u| !u.is_empty())?;
                let details = media.media_details;
                Some(FeaturedImage {
                    source_url,
                    width: details.as_ref().and_then(|d| d.width),
                    height: details.as_ref().and_then(|d| d.height),
                })
            });

        Self {
            id: node.database_id,
            slug,
            title: node.title.unwrap_or_else(|| "Untitled".to_string()),
            content: node.content.unwrap_or_default(),
            excerpt: node.excerpt.filter(|e| !e.is_empty()),
            date: node.date.unwrap_or_default(),
            featured_image,
            author: node
                .author
                .and_then(|edge| edge.node)
                .and_then(|author| author.name),
            categories: node.categories.map(|c| c.nodes).unwrap_or_default(),
            tags: node.tags.map(|t| t.nodes).unwrap_or_default(),
        }
    }
}

/// Decode a GraphQL response body into content records
///
/// A non-empty `errors` array fails the whole response even when `data`
/// is also present.
pub fn parse_response(body: &[u8]) -> Result<Vec<ContentRecord>, ContentError> {
    let response: QueryResponse = serde_json::from_slice(body)?;

    if !response.errors.is_empty() {
        return Err(ContentError::QueryErrors {
            messages: response.errors.into_iter().map(|e| e.message).collect(),
        });
    }

    let nodes = response
        .data
        .and_then(|data| data.posts)
        .map(|posts| posts.nodes)
        .unwrap_or_default();

    Ok(nodes.into_iter().map(ContentRecord::from).collect())
}
