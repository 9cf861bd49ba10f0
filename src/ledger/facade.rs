//! Wallet Ledger Facade
//!
//! The narrow interface the settlement core calls into. Implementations own
//! idempotency: replaying the same event must leave the ledger unchanged.
//!
//! Implementations:
//! - `MemoryLedger` - In-memory ledger for the consumer binary and tests

use async_trait::async_trait;
use bitcoin::Txid;

use super::errors::{ColdTransferError, IncomingTxError, PayoutSettleError, PayoutUpdateError};
use crate::types::{JournalId, PayoutBroadcast, PayoutId, UtxoDetected, UtxoDropped, UtxoSettled};

/// Ledger operations driven by chain events
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerFacade: Send + Sync {
    /// Register an unconfirmed incoming transaction
    async fn add_pending_transaction(&self, event: &UtxoDetected) -> Result<(), IncomingTxError>;

    /// Remove an unconfirmed incoming transaction that was dropped
    async fn remove_pending_transaction(&self, event: &UtxoDropped)
        -> Result<(), IncomingTxError>;

    /// Credit the receiving wallet for a settled incoming transaction
    async fn add_settled_transaction(&self, event: &UtxoSettled) -> Result<(), IncomingTxError>;

    /// Associate a payout id with the journal entry that created it
    async fn set_payout_journal_link(
        &self,
        journal_id: &JournalId,
        payout_id: &PayoutId,
    ) -> Result<(), PayoutUpdateError>;

    /// Record an internal hot-to-cold wallet transfer
    async fn record_hot_to_cold_transfer(
        &self,
        event: &PayoutBroadcast,
    ) -> Result<(), ColdTransferError>;

    /// Attach broadcast details to a submitted payout
    async fn register_broadcasted_payout(
        &self,
        payout_id: &PayoutId,
        proportional_fee: u64,
        tx_id: Txid,
        vout: u32,
    ) -> Result<(), PayoutUpdateError>;

    /// Mark a broadcast payout as settled
    async fn settle_payout(&self, payout_id: &PayoutId) -> Result<(), PayoutSettleError>;
}
