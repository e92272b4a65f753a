//! Byte-level progress reporting for feature loads.
//!
//! A [`ProgressIndicator`] is owned by the caller (typically a UI progress bar)
//! and treated as a write sink. Each load reads its value exactly once, at the
//! start, and afterwards only writes. Two loads sharing one indicator will
//! overwrite each other's values: serialize them or give each its own indicator.

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tracing::{debug, info};

/// External progress widget.
pub trait ProgressIndicator: Send + Sync {
    fn progress(&self) -> f64;
    fn update_progress(&self, value: f64);
}

/// Lock-free progress cell, the simplest indicator.
#[derive(Debug, Default)]
pub struct SharedProgress {
    bits: AtomicU64,
}

impl SharedProgress {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }
}

impl ProgressIndicator for SharedProgress {
    fn progress(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    fn update_progress(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }
}

/// Indicator that logs whenever progress crosses another `step` units.
#[derive(Debug)]
pub struct LoggedProgress {
    label: String,
    step: f64,
    state: Mutex<(f64, f64)>,
}

impl LoggedProgress {
    pub fn new(label: impl Into<String>, step: f64) -> Self {
        Self {
            label: label.into(),
            step,
            state: Mutex::new((0.0, 0.0)),
        }
    }
}

impl ProgressIndicator for LoggedProgress {
    fn progress(&self) -> f64 {
        self.state.lock().map(|s| s.0).unwrap_or_default()
    }

    fn update_progress(&self, value: f64) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let (current, last_logged) = &mut *state;
        *current = value;
        if (value - *last_logged).abs() >= self.step {
            *last_logged = value;
            info!(label = %self.label, progress = value, "loading");
        }
    }
}

/// Per-load progress state: baseline captured at start plus bytes seen so far.
pub struct ProgressTracker {
    indicator: Option<Arc<dyn ProgressIndicator>>,
    baseline: f64,
    units: f64,
    total_bytes: Option<u64>,
    loaded_bytes: u64,
}

impl ProgressTracker {
    /// Captures the indicator's current value as the baseline.
    pub fn start(indicator: Option<Arc<dyn ProgressIndicator>>, units: f64) -> Self {
        let baseline = indicator.as_ref().map(|i| i.progress()).unwrap_or(0.0);
        Self {
            indicator,
            baseline,
            units,
            total_bytes: None,
            loaded_bytes: 0,
        }
    }

    /// Sets the expected body size. Unknown or zero turns every later update
    /// into a no-op.
    pub fn with_total_bytes(mut self, total_bytes: Option<u64>) -> Self {
        self.total_bytes = total_bytes.filter(|&t| t > 0);
        if self.indicator.is_some() && self.total_bytes.is_none() {
            debug!("content length unknown, progress reporting disabled for this load");
        }
        self
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn loaded_bytes(&self) -> u64 {
        self.loaded_bytes
    }

    fn active(&self) -> Option<(&dyn ProgressIndicator, u64)> {
        match (&self.indicator, self.total_bytes) {
            (Some(indicator), Some(total)) => Some((indicator.as_ref(), total)),
            _ => None,
        }
    }

    /// Value the indicator should show for the bytes seen so far.
    pub fn current_value(&self) -> Option<f64> {
        let (_, total) = self.active()?;
        let fraction = (self.loaded_bytes as f64 / total as f64).min(1.0);
        Some(self.baseline + fraction * self.units)
    }

    /// Records one chunk and pushes the new value.
    pub fn observe(&mut self, chunk_len: usize) {
        self.loaded_bytes = self.loaded_bytes.saturating_add(chunk_len as u64);
        if let (Some(value), Some((indicator, _))) = (self.current_value(), self.active()) {
            indicator.update_progress(value);
        }
    }

    /// Pins the indicator to exactly `baseline + units`.
    pub fn complete(&self) {
        if let Some((indicator, _)) = self.active() {
            indicator.update_progress(self.baseline + self.units);
        }
    }

    /// Puts the indicator back where this load found it.
    pub fn reset(&self) {
        if let Some((indicator, _)) = self.active() {
            indicator.update_progress(self.baseline);
        }
    }
}

/// Stream decorator that forwards chunks unchanged while counting their bytes.
pub struct CountingStream<S> {
    inner: S,
    tracker: ProgressTracker,
}

impl<S> CountingStream<S> {
    pub fn new(inner: S, tracker: ProgressTracker) -> Self {
        Self { inner, tracker }
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn into_tracker(self) -> ProgressTracker {
        self.tracker
    }
}

impl<S, E> Stream for CountingStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_next(cx);
        if let Poll::Ready(Some(Ok(chunk))) = &polled {
            this.tracker.observe(chunk.len());
        }
        polled
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
