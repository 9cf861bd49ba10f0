//! Observability Port
//!
//! Side channel the dispatcher reports each event through before handling
//! it. Implementations must not block and must not fail; nothing they do
//! can change a handling outcome.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sink for per-event attributes
pub trait EventObserver: Send + Sync {
    fn record_event(&self, sequence: u64, kind: &str);
}

/// Records attributes on the current tracing span
///
/// Spans opened with `event.sequence` and `event.kind` fields (see
/// `EventConsumer::process`) receive the values; other spans ignore them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EventObserver for TracingObserver {
    fn record_event(&self, sequence: u64, kind: &str) {
        let span = tracing::Span::current();
        span.record("event.sequence", sequence);
        span.record("event.kind", kind);
    }
}

/// Counts recorded events; handy for health endpoints and tests
#[derive(Debug, Default)]
pub struct CountingObserver {
    events: AtomicU64,
    last_sequence: AtomicU64,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::Relaxed)
    }
}

impl EventObserver for CountingObserver {
    fn record_event(&self, sequence: u64, _kind: &str) {
        self.events.fetch_add(1, Ordering::Relaxed);
        self.last_sequence.store(sequence, Ordering::Relaxed);
    }
}
