use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::{stream, StreamExt};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::{FetchedBody, ResourceFetcher};
use crate::error::{LoadError, Result};

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Reads resources from local disk in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: Option<PathBuf>,
    chunk_size: usize,
}

impl Default for FileFetcher {
    fn default() -> Self {
        Self {
            root: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl FileFetcher {
    /// Relative resource paths are resolved under `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn path_for(&self, resource: &str) -> PathBuf {
        let relative = resource.trim_start_matches('/');
        match &self.root {
            Some(root) => root.join(relative),
            None => PathBuf::from(resource),
        }
    }
}

#[async_trait]
impl ResourceFetcher for FileFetcher {
    async fn fetch(&self, resource: &str) -> Result<FetchedBody> {
        let path = self.path_for(resource);
        let file = File::open(&path).await?;
        let content_length = Some(file.metadata().await?.len());
        let chunk_size = self.chunk_size;

        let stream = stream::try_unfold(file, move |mut file| async move {
            let mut buf = BytesMut::zeroed(chunk_size);
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok::<_, std::io::Error>(None);
            }
            buf.truncate(n);
            Ok::<_, std::io::Error>(Some((buf.freeze(), file)))
        })
        .map(|chunk| chunk.map_err(LoadError::from))
        .boxed();

        Ok(FetchedBody {
            content_length,
            stream,
        })
    }
}
