//! Benign-error suppression
//!
//! The watcher reports every output touching a tracked address, including
//! dust and outputs of addresses that are no longer tracked. Handlers list
//! which facade errors are expected for their operation; those become
//! `Outcome::Absorbed`, everything else propagates.

use std::fmt::Display;

use super::outcome::{BenignCondition, Outcome, SettlementError};
use crate::ledger::{IncomingTxError, PayoutSettleError, PayoutUpdateError};

pub const DETECTED_BENIGN: &[BenignCondition] = &[
    BenignCondition::AmountLessThanFee,
    BenignCondition::LessThanDustThreshold,
    BenignCondition::WalletNotFoundForAddress,
];

pub const DROPPED_BENIGN: &[BenignCondition] = &[BenignCondition::WalletNotFoundForAddress];

pub const SETTLED_BENIGN: &[BenignCondition] = &[
    BenignCondition::AmountLessThanFee,
    BenignCondition::LessThanDustThreshold,
    BenignCondition::WalletNotFoundForAddress,
];

pub const PAYOUT_UPDATE_BENIGN: &[BenignCondition] = &[BenignCondition::NoTransactionToUpdate];

pub const PAYOUT_SETTLE_BENIGN: &[BenignCondition] = &[BenignCondition::NoTransactionToSettle];

/// Maps a facade error onto the benign condition it represents, if any
pub trait BenignClassify {
    fn benign_condition(&self) -> Option<BenignCondition>;
}

impl BenignClassify for IncomingTxError {
    fn benign_condition(&self) -> Option<BenignCondition> {
        match self {
            IncomingTxError::AmountLessThanFee { .. } => Some(BenignCondition::AmountLessThanFee),
            IncomingTxError::LessThanDustThreshold { .. } => {
                Some(BenignCondition::LessThanDustThreshold)
            }
            IncomingTxError::WalletNotFoundForAddress(_) => {
                Some(BenignCondition::WalletNotFoundForAddress)
            }
            IncomingTxError::Ledger(_) => None,
        }
    }
}

impl BenignClassify for PayoutUpdateError {
    fn benign_condition(&self) -> Option<BenignCondition> {
        match self {
            PayoutUpdateError::NoTransactionToUpdate(_) => {
                Some(BenignCondition::NoTransactionToUpdate)
            }
            PayoutUpdateError::Ledger(_) => None,
        }
    }
}

impl BenignClassify for PayoutSettleError {
    fn benign_condition(&self) -> Option<BenignCondition> {
        match self {
            PayoutSettleError::NoTransactionToSettle(_) => {
                Some(BenignCondition::NoTransactionToSettle)
            }
            PayoutSettleError::Ledger(_) => None,
        }
    }
}

/// Interpret a facade result through a handler's whitelist
pub fn absorb<E>(
    result: Result<(), E>,
    whitelist: &[BenignCondition],
) -> Result<Outcome, SettlementError>
where
    E: BenignClassify + Display + Into<SettlementError>,
{
    let err = match result {
        Ok(()) => return Ok(Outcome::Applied),
        Err(err) => err,
    };

    match err.benign_condition() {
        Some(condition) if whitelist.contains(&condition) => {
            tracing::info!(
                target: "settlement::policy",
                condition = condition.as_str(),
                monitor = condition.needs_monitoring(),
                error = %err,
                "absorbed benign ledger error"
            );
            Ok(Outcome::Absorbed(condition))
        }
        _ => Err(err.into()),
    }
}
