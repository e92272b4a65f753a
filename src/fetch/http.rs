use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use super::{FetchedBody, ResourceFetcher};
use crate::error::{LoadError, Result};

/// Fetches resources over HTTP(S), streaming the body.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
    base_url: Option<Url>,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Relative references such as `/batas_provinsi.fgb` are joined onto `base`.
    pub fn with_base_url(mut self, base: Option<Url>) -> Self {
        self.base_url = base;
        self
    }

    pub fn resolve(&self, resource: &str) -> Result<Url> {
        match Url::parse(resource) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_ref().ok_or_else(|| LoadError::Resource {
                    resource: resource.to_string(),
                    reason: "relative reference without a base URL".to_string(),
                })?;
                base.join(resource).map_err(|e| LoadError::Resource {
                    resource: resource.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(LoadError::Resource {
                resource: resource.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, resource: &str) -> Result<FetchedBody> {
        let url = self.resolve(resource)?;
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() || status == StatusCode::NO_CONTENT {
            return Err(LoadError::Status {
                resource: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_length = response.content_length();
        debug!(url = %url, ?content_length, "response headers received");

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(LoadError::from))
            .boxed();

        Ok(FetchedBody {
            content_length,
            stream,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response and returns the server's base URL.
    async fn serve_once(status_line: &'static str, body: &'static [u8]) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        Url::parse(&format!("http://{}/", addr)).unwrap()
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let fetcher = HttpFetcher::default()
            .with_base_url(Some(Url::parse("https://example.org/maps/").unwrap()));

        assert_eq!(
            fetcher.resolve("/batas_provinsi.fgb").unwrap().as_str(),
            "https://example.org/batas_provinsi.fgb"
        );
        assert_eq!(
            fetcher.resolve("kelurahan.fgb").unwrap().as_str(),
            "https://example.org/maps/kelurahan.fgb"
        );
        assert_eq!(
            fetcher.resolve("https://cdn.example.com/a.fgb").unwrap().as_str(),
            "https://cdn.example.com/a.fgb"
        );
    }

    #[test]
    fn test_resolve_relative_without_base_fails() {
        let err = HttpFetcher::default().resolve("/batas_provinsi.fgb").unwrap_err();
        assert!(matches!(err, LoadError::Resource { .. }));
        assert!(err.is_io());
    }

    #[tokio::test]
    async fn test_fetch_streams_body_with_length() {
        let base = serve_once("HTTP/1.1 200 OK", b"flatgeobuf-bytes").await;
        let fetcher = HttpFetcher::default().with_base_url(Some(base));

        let body = fetcher.fetch("/data.fgb").await.unwrap();
        assert_eq!(body.content_length, Some(16));

        let chunks: Vec<_> = body.stream.collect().await;
        let bytes: Vec<u8> = chunks
            .into_iter()
            .flat_map(|c| c.unwrap().to_vec())
            .collect();
        assert_eq!(bytes, b"flatgeobuf-bytes");
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let base = serve_once("HTTP/1.1 404 Not Found", b"missing").await;
        let fetcher = HttpFetcher::default().with_base_url(Some(base));

        let err = fetcher.fetch("/missing.fgb").await.unwrap_err();
        assert!(matches!(err, LoadError::Status { status: 404, .. }));
        assert!(err.is_io());
    }
}
