//! Event Consumer
//!
//! Drains a channel of chain events, dispatching each delivery once.
//! Failures are logged and forwarded to an optional dead-letter channel;
//! the consumer never retries on its own.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::common::error::AppError;
use crate::common::logging::{generate_correlation_id, log_settlement_event, log_system_event};
use crate::settlement::{classify, Outcome, SettlementDispatcher, SettlementError};
use crate::types::ChainEvent;

/// An event that failed, with the error it failed with
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub event: ChainEvent,
    pub error: SettlementError,
}

/// Consumer counters
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ConsumerStats {
    pub received: u64,
    pub applied: u64,
    pub absorbed: u64,
    pub ignored: u64,
    pub failed: u64,
    /// Absorbed wallet-not-found conditions, kept apart for alerting
    pub wallet_not_found: u64,
    pub last_sequence: Option<u64>,
}

impl ConsumerStats {
    fn record(&mut self, sequence: u64, result: &Result<Outcome, SettlementError>) {
        self.received += 1;
        self.last_sequence = Some(sequence);
        match result {
            Ok(Outcome::Applied) => self.applied += 1,
            Ok(Outcome::Absorbed(condition)) => {
                self.absorbed += 1;
                if condition.needs_monitoring() {
                    self.wallet_not_found += 1;
                }
            }
            Ok(Outcome::Ignored) => self.ignored += 1,
            Err(_) => self.failed += 1,
        }
    }
}

impl std::fmt::Display for ConsumerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Events: {} received | {} applied | {} absorbed ({} wallet not found) | {} ignored | {} failed",
            self.received,
            self.applied,
            self.absorbed,
            self.wallet_not_found,
            self.ignored,
            self.failed
        )
    }
}

/// Sequential consumer around a dispatcher
pub struct EventConsumer {
    dispatcher: SettlementDispatcher,
    dead_letters: Option<mpsc::Sender<DeadLetter>>,
    correlation_id: String,
    stats: ConsumerStats,
}

impl EventConsumer {
    pub fn new(dispatcher: SettlementDispatcher) -> Self {
        Self {
            dispatcher,
            dead_letters: None,
            correlation_id: generate_correlation_id(),
            stats: ConsumerStats::default(),
        }
    }

    /// Forward failed events to `sender`
    pub fn with_dead_letters(mut self, sender: mpsc::Sender<DeadLetter>) -> Self {
        self.dead_letters = Some(sender);
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn stats(&self) -> &ConsumerStats {
        &self.stats
    }

    /// Handle one delivery
    pub async fn process(&mut self, event: ChainEvent) -> Result<Outcome, SettlementError> {
        let span = tracing::info_span!(
            "chain_event",
            run = %self.correlation_id,
            event.sequence = tracing::field::Empty,
            event.kind = tracing::field::Empty,
        );
        let result = self.dispatcher.handle(&event).instrument(span).await;

        let kind = classify(&event);
        self.stats.record(event.sequence, &result);
        match &result {
            Ok(outcome) => log_settlement_event(
                kind,
                event.sequence,
                outcome.as_str(),
                Some(&self.correlation_id),
                None,
            ),
            Err(err) => {
                let message = err.to_string();
                log_settlement_event(
                    kind,
                    event.sequence,
                    "failed",
                    Some(&self.correlation_id),
                    Some((err.error_code(), message.as_str())),
                );
                if let Some(sender) = &self.dead_letters {
                    let letter = DeadLetter {
                        event,
                        error: err.clone(),
                    };
                    if sender.send(letter).await.is_err() {
                        tracing::warn!(
                            target: "settlement::consumer",
                            "dead-letter channel closed"
                        );
                    }
                }
            }
        }

        result
    }

    /// Consume until the channel closes
    pub async fn run(mut self, mut events: mpsc::Receiver<ChainEvent>) -> ConsumerStats {
        log_system_event(
            "consumer started",
            &self.correlation_id,
            serde_json::json!({ "dead_letters": self.dead_letters.is_some() }),
        );

        while let Some(event) = events.recv().await {
            // Outcome already logged and counted
            let _ = self.process(event).await;
        }

        let summary = serde_json::to_value(&self.stats).unwrap_or(serde_json::Value::Null);
        log_system_event("consumer finished", &self.correlation_id, summary);
        self.stats
    }
}

/// Decode one JSON-lines record. Blank lines and `#` comments yield `None`.
pub fn decode_event_line(line: &str, line_no: usize) -> Result<Option<ChainEvent>, AppError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| AppError::Decode {
            line: line_no,
            source,
        })
}

/// Result of feeding a JSON-lines source into the consumer channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedReport {
    /// Events handed to the channel
    pub sent: usize,
    /// Malformed lines that were logged and skipped
    pub skipped: usize,
}

/// Read JSON-lines events and send them into `sender`
///
/// A malformed line is logged and skipped. Reading stops early if the
/// consumer side of the channel has gone away.
pub async fn feed_json_lines<R>(
    reader: R,
    sender: mpsc::Sender<ChainEvent>,
) -> Result<FeedReport, AppError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0;
    let mut report = FeedReport::default();

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let event = match decode_event_line(&line, line_no) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(
                    target: "settlement::consumer",
                    line = line_no,
                    error = %e,
                    "skipping malformed event"
                );
                report.skipped += 1;
                continue;
            }
        };

        if sender.send(event).await.is_err() {
            break;
        }
        report.sent += 1;
    }

    Ok(report)
}
