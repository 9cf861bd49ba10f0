//! Settlement Core
//!
//! Turns watcher events into ledger operations:
//!
//! ```text
//! utxo_detected    → add_pending_transaction
//! utxo_dropped     → remove_pending_transaction
//! utxo_settled     → add_settled_transaction
//! payout_submitted → set_payout_journal_link        (needs payout info)
//! payout_broadcast → register_broadcasted_payout    (needs payout info)
//!                  └ record_hot_to_cold_transfer    (cold wallet rebalance)
//! payout_settled   → settle_payout
//! anything else    → ignored
//! ```
//!
//! ## Components
//!
//! - **classify**: event kind from the payload tag
//! - **dispatcher**: routes an event to its handler
//! - **handlers**: one ledger call per kind
//! - **policy**: per-handler whitelists of benign ledger errors
//! - **outcome**: success variants and `SettlementError`

pub mod classify;
pub mod dispatcher;
pub mod handlers;
pub mod outcome;
pub mod policy;

// Re-exports
pub use classify::{classify, EventKind};
pub use dispatcher::SettlementDispatcher;
pub use outcome::{BenignCondition, Outcome, SettlementError};
