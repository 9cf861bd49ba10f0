//! Ledger Facade Errors
//!
//! One closed enum per family of facade operations. Handlers match on
//! variants to decide which failures are benign.

use thiserror::Error;

/// Errors from incoming-transaction operations
/// (`add_pending_transaction`, `remove_pending_transaction`, `add_settled_transaction`)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncomingTxError {
    #[error("amount {amount} sats is not greater than fee {fee} sats")]
    AmountLessThanFee { amount: u64, fee: u64 },

    #[error("amount {amount} sats is below dust threshold {threshold} sats")]
    LessThanDustThreshold { amount: u64, threshold: u64 },

    #[error("no wallet found for on-chain address: {0}")]
    WalletNotFoundForAddress(String),

    #[error("ledger error: {0}")]
    Ledger(String),
}

/// Errors from payout update operations
/// (`set_payout_journal_link`, `register_broadcasted_payout`)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayoutUpdateError {
    #[error("no transaction to update: {0}")]
    NoTransactionToUpdate(String),

    #[error("ledger error: {0}")]
    Ledger(String),
}

/// Errors from `settle_payout`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayoutSettleError {
    #[error("no transaction to settle: {0}")]
    NoTransactionToSettle(String),

    #[error("ledger error: {0}")]
    Ledger(String),
}

/// Errors from `record_hot_to_cold_transfer`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColdTransferError {
    #[error("invalid cold wallet transfer: {0}")]
    InvalidTransfer(String),

    #[error("ledger error: {0}")]
    Ledger(String),
}
