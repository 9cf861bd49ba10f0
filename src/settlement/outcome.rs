//! Handling outcomes and errors

use thiserror::Error;

use super::classify::EventKind;
use crate::ledger::{ColdTransferError, IncomingTxError, PayoutSettleError, PayoutUpdateError};

/// Expected facade failure that a handler may treat as a no-op
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BenignCondition {
    AmountLessThanFee,
    LessThanDustThreshold,
    WalletNotFoundForAddress,
    NoTransactionToUpdate,
    NoTransactionToSettle,
}

impl BenignCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AmountLessThanFee => "amount_less_than_fee",
            Self::LessThanDustThreshold => "less_than_dust_threshold",
            Self::WalletNotFoundForAddress => "wallet_not_found_for_address",
            Self::NoTransactionToUpdate => "no_transaction_to_update",
            Self::NoTransactionToSettle => "no_transaction_to_settle",
        }
    }

    /// Absorbed, but may hide an address deallocated while its output was in
    /// flight. Tagged in logs so it can be alerted on.
    pub fn needs_monitoring(&self) -> bool {
        matches!(self, Self::WalletNotFoundForAddress)
    }
}

impl std::fmt::Display for BenignCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful handling of one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The ledger operation succeeded
    Applied,
    /// The ledger reported an expected condition; nothing to do
    Absorbed(BenignCondition),
    /// Kind not handled by this build
    Ignored,
}

impl Outcome {
    /// Always true; every `Outcome` is a success
    pub fn is_success(&self) -> bool {
        true
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Absorbed(_) => "absorbed",
            Self::Ignored => "ignored",
        }
    }
}

/// Failure handling one event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("{kind} event {sequence} is missing payout info augmentation")]
    EventAugmentationMissing { sequence: u64, kind: EventKind },

    #[error(transparent)]
    Incoming(#[from] IncomingTxError),

    #[error(transparent)]
    PayoutUpdate(#[from] PayoutUpdateError),

    #[error(transparent)]
    PayoutSettle(#[from] PayoutSettleError),

    #[error(transparent)]
    ColdTransfer(#[from] ColdTransferError),
}

impl SettlementError {
    /// Only ledger-side failures can succeed on redelivery
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SettlementError::Incoming(IncomingTxError::Ledger(_))
                | SettlementError::PayoutUpdate(PayoutUpdateError::Ledger(_))
                | SettlementError::PayoutSettle(PayoutSettleError::Ledger(_))
                | SettlementError::ColdTransfer(ColdTransferError::Ledger(_))
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SettlementError::EventAugmentationMissing { .. } => "EVENT_AUGMENTATION_MISSING",
            SettlementError::Incoming(e) => match e {
                IncomingTxError::AmountLessThanFee { .. } => "AMOUNT_LESS_THAN_FEE",
                IncomingTxError::LessThanDustThreshold { .. } => "LESS_THAN_DUST_THRESHOLD",
                IncomingTxError::WalletNotFoundForAddress(_) => "WALLET_NOT_FOUND_FOR_ADDRESS",
                IncomingTxError::Ledger(_) => "LEDGER_ERROR",
            },
            SettlementError::PayoutUpdate(e) => match e {
                PayoutUpdateError::NoTransactionToUpdate(_) => "NO_TRANSACTION_TO_UPDATE",
                PayoutUpdateError::Ledger(_) => "LEDGER_ERROR",
            },
            SettlementError::PayoutSettle(e) => match e {
                PayoutSettleError::NoTransactionToSettle(_) => "NO_TRANSACTION_TO_SETTLE",
                PayoutSettleError::Ledger(_) => "LEDGER_ERROR",
            },
            SettlementError::ColdTransfer(e) => match e {
                ColdTransferError::InvalidTransfer(_) => "INVALID_COLD_TRANSFER",
                ColdTransferError::Ledger(_) => "LEDGER_ERROR",
            },
        }
    }
}
