//! Event Classifier

use crate::types::{ChainEvent, EventPayload};

/// Kind of a chain event, derived from its payload tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    UtxoDetected,
    UtxoDropped,
    UtxoSettled,
    PayoutSubmitted,
    PayoutBroadcast,
    PayoutSettled,
    Unknown,
}

impl EventKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UtxoDetected => "utxo_detected",
            Self::UtxoDropped => "utxo_dropped",
            Self::UtxoSettled => "utxo_settled",
            Self::PayoutSubmitted => "payout_submitted",
            Self::PayoutBroadcast => "payout_broadcast",
            Self::PayoutSettled => "payout_settled",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the caller must attach payout info before dispatch
    pub fn requires_payout_info(&self) -> bool {
        matches!(self, Self::PayoutSubmitted | Self::PayoutBroadcast)
    }

    pub fn is_payout(&self) -> bool {
        matches!(
            self,
            Self::PayoutSubmitted | Self::PayoutBroadcast | Self::PayoutSettled
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::UtxoDetected(_) => EventKind::UtxoDetected,
            EventPayload::UtxoDropped(_) => EventKind::UtxoDropped,
            EventPayload::UtxoSettled(_) => EventKind::UtxoSettled,
            EventPayload::PayoutSubmitted(_) => EventKind::PayoutSubmitted,
            EventPayload::PayoutBroadcast(_) => EventKind::PayoutBroadcast,
            EventPayload::PayoutSettled(_) => EventKind::PayoutSettled,
            EventPayload::Unknown => EventKind::Unknown,
        }
    }
}

/// Determine the kind of an event. Pure and infallible.
pub fn classify(event: &ChainEvent) -> EventKind {
    event.payload.kind()
}
