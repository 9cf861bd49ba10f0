//! Wallet Ledger Module
//!
//! - `LedgerFacade` trait the settlement core calls
//! - Per-operation error enums
//! - In-memory implementation

pub mod errors;
pub mod facade;
pub mod memory;

// Re-exports for convenience
pub use errors::{ColdTransferError, IncomingTxError, PayoutSettleError, PayoutUpdateError};
pub use facade::LedgerFacade;
pub use memory::{IncomingStatus, LedgerStats, MemoryLedger, PayoutState};
