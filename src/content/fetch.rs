// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde_json::json;

use crate::error::ContentError;
use crate::http::HttpClient;

use super::record::{ContentRecord, parse_response};

/// Published posts with every field the sync needs
pub const POSTS_QUERY: &str = r#"
query SyncPosts($first: Int!) {
  posts(first: $first, where: { status: PUBLISH }) {
    nodes {
      databaseId
      slug
      title
      content
      excerpt
      date
      featuredImage {
        node {
          sourceUrl
          mediaDetails {
            width
            height
          }
        }
      }
      author {
        node {
          name
        }
      }
      categories {
        nodes {
          name
          slug
        }
      }
      tags {
        nodes {
          name
          slug
        }
      }
    }
  }
}
"#;

/// Build the POST body for the posts query
pub fn build_query(first: usize) -> serde_json::Value {
    json!({
        "query": POSTS_QUERY,
        "variables": { "first": first },
    })
}

/// Fetch up to `first` published records from the GraphQL endpoint
///
/// Any transport failure, non-2xx status or `errors` payload is returned
/// as a [`ContentError`]. An `Ok` with an empty list is possible; callers
/// treat both as "source unavailable".
pub async fn fetch_content<C: HttpClient>(
    client: &C,
    endpoint: &str,
    first: usize,
) -> Result<Vec<ContentRecord>, ContentError> {
    let fetch_failed = |e: reqwest::Error| ContentError::FetchFailed {
        url: endpoint.to_string(),
        source: e,
    };

    let response = client
        .post_json(endpoint, &build_query(first))
        .await
        .map_err(fetch_failed)?;

    if !response.is_success() {
        return Err(ContentError::HttpStatus {
            url: endpoint.to_string(),
            status: response.status,
        });
    }

    let body = response.bytes().await.map_err(fetch_failed)?;
    parse_response(&body)
}
