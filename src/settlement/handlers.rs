//! Per-kind event handlers
//!
//! Each handler performs exactly one ledger operation and applies its own
//! benign-error whitelist.

use super::outcome::{Outcome, SettlementError};
use super::policy::{
    absorb, DETECTED_BENIGN, DROPPED_BENIGN, PAYOUT_SETTLE_BENIGN, PAYOUT_UPDATE_BENIGN,
    SETTLED_BENIGN,
};
use crate::ledger::LedgerFacade;
use crate::types::{
    PayoutBroadcast, PayoutInfo, PayoutSettled, PayoutSubmitted, UtxoDetected, UtxoDropped,
    UtxoSettled,
};

pub async fn utxo_detected(
    ledger: &dyn LedgerFacade,
    event: &UtxoDetected,
) -> Result<Outcome, SettlementError> {
    absorb(ledger.add_pending_transaction(event).await, DETECTED_BENIGN)
}

pub async fn utxo_dropped(
    ledger: &dyn LedgerFacade,
    event: &UtxoDropped,
) -> Result<Outcome, SettlementError> {
    absorb(ledger.remove_pending_transaction(event).await, DROPPED_BENIGN)
}

pub async fn utxo_settled(
    ledger: &dyn LedgerFacade,
    event: &UtxoSettled,
) -> Result<Outcome, SettlementError> {
    absorb(ledger.add_settled_transaction(event).await, SETTLED_BENIGN)
}

/// Links the payout to the journal it was created from. The submission can
/// race ahead of the journal write, so a missing journal is absorbed.
pub async fn payout_submitted(
    ledger: &dyn LedgerFacade,
    event: &PayoutSubmitted,
    payout_info: &PayoutInfo,
) -> Result<Outcome, SettlementError> {
    let res = ledger
        .set_payout_journal_link(&payout_info.external_id, &event.id)
        .await;
    absorb(res, PAYOUT_UPDATE_BENIGN)
}

/// Cold wallet rebalances are a separate ledger effect and get no suppression.
pub async fn payout_broadcast(
    ledger: &dyn LedgerFacade,
    event: &PayoutBroadcast,
    payout_info: &PayoutInfo,
) -> Result<Outcome, SettlementError> {
    if payout_info.is_cold_wallet_rebalance() {
        ledger.record_hot_to_cold_transfer(event).await?;
        return Ok(Outcome::Applied);
    }

    let res = ledger
        .register_broadcasted_payout(&event.id, event.proportional_fee, event.tx_id, event.vout)
        .await;
    absorb(res, PAYOUT_UPDATE_BENIGN)
}

pub async fn payout_settled(
    ledger: &dyn LedgerFacade,
    event: &PayoutSettled,
) -> Result<Outcome, SettlementError> {
    absorb(ledger.settle_payout(&event.id).await, PAYOUT_SETTLE_BENIGN)
}
