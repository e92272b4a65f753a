//! Fetching raw feature bytes, either over HTTP or from local disk.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::Result;

pub mod file;
pub mod http;

pub use file::FileFetcher;
pub use http::HttpFetcher;

/// Body of a fetched resource, delivered as an ordered stream of chunks.
pub struct FetchedBody {
    /// Total body size when the transport announced one.
    pub content_length: Option<u64>,
    pub stream: BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for FetchedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Source of resource bodies.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Opens `resource` and returns its body without reading it.
    async fn fetch(&self, resource: &str) -> Result<FetchedBody>;
}
