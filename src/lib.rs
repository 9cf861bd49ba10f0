//! On-chain Settlement Core
//!
//! Consumes events from an on-chain wallet watcher and settles them against
//! a wallet ledger.
//!
//! ## Modules
//!
//! 1. **settlement** - Classifier, dispatcher, per-kind handlers, benign-error policy
//! 2. **ledger** - `LedgerFacade` trait, its errors, and an in-memory ledger
//! 3. **consumer** - Sequential channel consumer with dead-letter forwarding
//! 4. **observability** - Fire-and-forget `{sequence, kind}` reporting
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use onchain_settlement::{MemoryLedger, SettlementDispatcher};
//!
//! let dispatcher = SettlementDispatcher::new(Arc::new(MemoryLedger::new(5_000, 0)));
//! let outcome = dispatcher.handle(&event).await?;
//! ```

pub mod common;
pub mod consumer;
pub mod ledger;
pub mod observability;
pub mod settlement;
pub mod types;

// Re-exports: settlement core
pub use settlement::{
    classify, BenignCondition, EventKind, Outcome, SettlementDispatcher, SettlementError,
};

// Re-exports: ledger
pub use ledger::{
    ColdTransferError, IncomingTxError, LedgerFacade, MemoryLedger, PayoutSettleError,
    PayoutUpdateError,
};

// Re-exports: consumer
pub use consumer::{ConsumerStats, DeadLetter, EventConsumer};

// Re-exports: observability
pub use observability::{CountingObserver, EventObserver, TracingObserver};

// Re-exports: types
pub use types::{ChainEvent, EventPayload};
