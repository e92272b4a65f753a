//! Feature decoders and the blocking reader that feeds them.

use bytes::{Buf, Bytes};
use std::io::{self, Read};
use tokio::sync::mpsc;

use crate::error::DecodeError;
use crate::model::Feature;

mod fgb;

pub use fgb::FlatGeobufDecoder;

/// Lazily decoded features, in stream order.
pub type FeatureIter = Box<dyn Iterator<Item = Result<Feature, DecodeError>>>;

/// Turns a byte stream into features. Knows nothing about where bytes come
/// from or how progress is reported.
pub trait FeatureDecoder: Send + Sync {
    fn decode(&self, reader: Box<dyn Read + Send>) -> Result<FeatureIter, DecodeError>;
}

/// Blocking `Read` over chunks arriving on a channel.
///
/// Must be used from a blocking thread (e.g. `spawn_blocking`). A closed
/// channel reads as end of stream.
pub struct ChunkReader {
    rx: mpsc::Receiver<Bytes>,
    current: Bytes,
}

impl ChunkReader {
    pub fn new(rx: mpsc::Receiver<Bytes>) -> Self {
        Self {
            rx,
            current: Bytes::new(),
        }
    }
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.current.is_empty() {
            match self.rx.blocking_recv() {
                Some(chunk) => self.current = chunk,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        Ok(n)
    }
}
