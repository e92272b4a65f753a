//! Streaming feature loader: fetch, count bytes, decode, collect.

use bytes::Bytes;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::LoaderConfig;
use crate::decode::{ChunkReader, FeatureDecoder, FlatGeobufDecoder};
use crate::error::{DecodeError, LoadError, Result};
use crate::fetch::{HttpFetcher, ResourceFetcher};
use crate::model::Feature;
use crate::progress::{CountingStream, ProgressIndicator, ProgressTracker};

/// Province boundaries, relative to the configured base URL.
pub const DEFAULT_RESOURCE: &str = "/batas_provinsi.fgb";

/// Loads a whole feature collection while reporting download progress.
///
/// Chunks are read in order on the calling task and handed, through a
/// bounded channel, to the decoder running on a blocking worker. The
/// decoder never sees progress; the counting happens in [`CountingStream`].
pub struct FeatureLoader<F, D> {
    fetcher: F,
    decoder: Arc<D>,
    config: LoaderConfig,
}

impl FeatureLoader<HttpFetcher, FlatGeobufDecoder> {
    /// FlatGeobuf over HTTP, relative references resolved against `config.base_url`.
    pub fn http(config: LoaderConfig) -> Self {
        let fetcher = HttpFetcher::default().with_base_url(config.base_url.clone());
        Self::new(fetcher, FlatGeobufDecoder, config)
    }
}

impl<F, D> FeatureLoader<F, D>
where
    F: ResourceFetcher,
    D: FeatureDecoder + 'static,
{
    pub fn new(fetcher: F, decoder: D, config: LoaderConfig) -> Self {
        Self {
            fetcher,
            decoder: Arc::new(decoder),
            config,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loads `resource` using the configured progress span.
    pub async fn load(
        &self,
        resource: &str,
        progress: Option<Arc<dyn ProgressIndicator>>,
    ) -> Result<Vec<Feature>> {
        self.load_with_units(resource, progress, self.config.total_progress_units)
            .await
    }

    /// Loads `resource`, advancing `progress` from its current value by at
    /// most `units`. On success the indicator ends exactly `units` above
    /// where it started; on failure it is left at the last pushed value, or
    /// restored when `reset_progress_on_failure` is set. Any error discards
    /// every feature decoded so far.
    #[instrument(level = "debug", skip(self, resource, progress), fields(resource = %resource))]
    pub async fn load_with_units(
        &self,
        resource: &str,
        progress: Option<Arc<dyn ProgressIndicator>>,
        units: f64,
    ) -> Result<Vec<Feature>> {
        let start = Instant::now();
        let tracker = ProgressTracker::start(progress, units);

        let body = self.fetcher.fetch(resource).await.map_err(|e| {
            warn!(resource, error = %e, "fetch failed");
            e
        })?;
        debug!(content_length = ?body.content_length, "streaming body");

        let tracker = tracker.with_total_bytes(body.content_length);
        let mut counting = CountingStream::new(body.stream, tracker);

        let (tx, rx) = mpsc::channel::<Bytes>(self.config.channel_capacity.max(1));
        let decoder = Arc::clone(&self.decoder);
        let decode_task = tokio::task::spawn_blocking(
            move || -> std::result::Result<Vec<Feature>, DecodeError> {
                decoder.decode(Box::new(ChunkReader::new(rx)))?.collect()
            },
        );

        let mut transport_error = None;
        while let Some(chunk) = counting.next().await {
            match chunk {
                Ok(bytes) => {
                    if tx.send(bytes).await.is_err() {
                        // decoder stopped reading, its result says why
                        break;
                    }
                }
                Err(e) => {
                    transport_error = Some(e);
                    break;
                }
            }
        }
        drop(tx);

        let tracker = counting.into_tracker();
        let decoded = decode_task.await;

        let outcome = match (transport_error, decoded) {
            (Some(e), _) => Err(e),
            (None, Err(join)) => Err(LoadError::from(join)),
            (None, Ok(Err(decode))) => Err(LoadError::from(decode)),
            (None, Ok(Ok(features))) => Ok(features),
        };

        match outcome {
            Ok(features) => {
                tracker.complete();
                info!(
                    resource,
                    features = features.len(),
                    bytes = tracker.loaded_bytes(),
                    elapsed = ?start.elapsed(),
                    "features loaded"
                );
                Ok(features)
            }
            Err(e) => {
                if self.config.reset_progress_on_failure {
                    tracker.reset();
                }
                warn!(
                    resource,
                    bytes = tracker.loaded_bytes(),
                    error = %e,
                    "feature load aborted"
                );
                Err(e)
            }
        }
    }
}
