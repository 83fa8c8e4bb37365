// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

/// A streaming response body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// HTTP response with status, content length, and body stream
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Length header value, if present
    pub content_length: Option<u64>,
    /// Response body as a stream of bytes
    pub body: ByteStream,
}

impl HttpResponse {
    /// Whether the status code is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body stream into a single buffer
    pub async fn bytes(self) -> Result<Bytes, reqwest::Error> {
        let mut buffer = BytesMut::new();
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

/// HTTP client abstraction for testability
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET request and return a streaming response
    async fn get_stream(&self, url: &str) -> Result<HttpResponse, reqwest::Error>;

    /// POST a JSON document and return the response
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, reqwest::Error>;
}

/// Default HTTP client implementation using reqwest
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Create a new ReqwestClient with default settings (no timeout)
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a client whose requests fail once `timeout` has elapsed
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Create a new ReqwestClient with a custom reqwest::Client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn into_response(response: reqwest::Response) -> HttpResponse {
        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body: ByteStream = Box::pin(response.bytes_stream());

        HttpResponse {
            status,
            content_length,
            body,
        }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_stream(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        Ok(Self::into_response(response))
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<HttpResponse, reqwest::Error> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json")
            .body(body.to_string())
            .send()
            .await?;
        Ok(Self::into_response(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_from_chunks(status: u16, chunks: Vec<&'static [u8]>) -> HttpResponse {
        let stream = futures::stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, reqwest::Error>(Bytes::from_static(chunk))),
        );
        HttpResponse {
            status,
            content_length: None,
            body: Box::pin(stream),
        }
    }

    #[test]
    fn reqwest_client_can_be_created() {
        let _client = ReqwestClient::new();
        let _client_default = ReqwestClient::default();
        let _client_timeout = ReqwestClient::with_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn reqwest_client_can_be_cloned() {
        let client = ReqwestClient::new();
        let _cloned = client.clone();
    }

    #[test]
    fn success_covers_2xx_only() {
        assert!(response_from_chunks(200, vec![]).is_success());
        assert!(response_from_chunks(204, vec![]).is_success());
        assert!(!response_from_chunks(304, vec![]).is_success());
        assert!(!response_from_chunks(404, vec![]).is_success());
        assert!(!response_from_chunks(500, vec![]).is_success());
    }

    #[tokio::test]
    async fn bytes_concatenates_chunks() {
        let response = response_from_chunks(200, vec![b"hello ", b"world"]);
        let body = response.bytes().await.unwrap();
        assert_eq!(&body[..], b"hello world");
    }
}
