//! Shared Types Module
//!
//! Data types shared across the settlement core.

pub mod event;

// Re-exports for convenience
pub use event::{
    Augmentation, ChainEvent, EventPayload, GaloyMetadata, JournalId, PayoutBroadcast, PayoutId,
    PayoutInfo, PayoutMetadata, PayoutSettled, PayoutSubmitted, UtxoDetected, UtxoDropped,
    UtxoSettled, WalletId,
};
