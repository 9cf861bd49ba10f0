//! In-Memory Ledger
//!
//! Reference `LedgerFacade` for the consumer binary and tests.
//! Data is lost when the process exits.
//!
//! Every write is idempotent: replaying an event that was already applied
//! returns success (or the facade's "no matching transaction" error for
//! payouts) without touching balances.

use async_trait::async_trait;
use bitcoin::{OutPoint, Txid};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::errors::{ColdTransferError, IncomingTxError, PayoutSettleError, PayoutUpdateError};
use super::facade::LedgerFacade;
use crate::common::config::SettlementConfig;
use crate::types::{
    JournalId, PayoutBroadcast, PayoutId, UtxoDetected, UtxoDropped, UtxoSettled, WalletId,
};

/// Status of an incoming on-chain transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomingStatus {
    Pending,
    Settled,
}

/// Lifecycle of a payout journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutState {
    /// Journal written, watcher has not acknowledged the payout yet
    Initiated,
    Submitted,
    Broadcast,
    Settled,
}

impl std::fmt::Display for PayoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initiated => write!(f, "initiated"),
            Self::Submitted => write!(f, "submitted"),
            Self::Broadcast => write!(f, "broadcast"),
            Self::Settled => write!(f, "settled"),
        }
    }
}

#[derive(Debug, Clone)]
struct PayoutJournal {
    wallet_id: WalletId,
    satoshis: u64,
    payout_id: Option<PayoutId>,
    state: PayoutState,
    proportional_fee: Option<u64>,
    tx_id: Option<Txid>,
    vout: Option<u32>,
}

#[derive(Debug, Default)]
struct LedgerState {
    wallets_by_address: HashMap<String, WalletId>,
    balances: HashMap<WalletId, u64>,
    incoming: HashMap<OutPoint, IncomingStatus>,
    journals: HashMap<JournalId, PayoutJournal>,
    /// Index: payout id -> journal id
    payouts: HashMap<PayoutId, JournalId>,
    cold_transfers: HashMap<PayoutId, u64>,
    effects: u64,
}

/// Summary of ledger contents
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LedgerStats {
    pub wallets: u64,
    pub pending_incoming: u64,
    pub settled_incoming: u64,
    pub open_payouts: u64,
    pub settled_payouts: u64,
    pub cold_transfers: u64,
    pub cold_transfer_sats: u64,
    pub effects: u64,
}

/// In-memory wallet ledger
///
/// Thread-safe; all state sits behind one lock so each facade call is
/// atomic with respect to the others.
#[derive(Clone)]
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    dust_threshold_sats: u64,
    deposit_fee_sats: u64,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new(dust_threshold_sats: u64, deposit_fee_sats: u64) -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::default())),
            dust_threshold_sats,
            deposit_fee_sats,
        }
    }

    /// Create using thresholds from configuration
    pub fn from_config(config: &SettlementConfig) -> Self {
        Self::new(config.dust_threshold_sats, config.deposit_fee_sats)
    }

    /// Track an on-chain address as belonging to a wallet
    pub async fn register_address(&self, address: impl Into<String>, wallet_id: WalletId) {
        let mut state = self.state.write().await;
        state.balances.entry(wallet_id.clone()).or_insert(0);
        state.wallets_by_address.insert(address.into(), wallet_id);
    }

    /// Stop tracking an address
    pub async fn deallocate_address(&self, address: &str) -> Option<WalletId> {
        self.state.write().await.wallets_by_address.remove(address)
    }

    /// Seed a wallet balance, e.g. opening balances before a replay
    pub async fn fund_wallet(
        &self,
        wallet_id: WalletId,
        satoshis: u64,
    ) -> Result<(), IncomingTxError> {
        let mut state = self.state.write().await;
        let balance = credited_balance(&state, &wallet_id, satoshis)?;
        state.balances.insert(wallet_id, balance);
        state.effects += 1;
        Ok(())
    }

    /// Write the journal entry for an outgoing payment and debit the wallet
    pub async fn open_payout_journal(
        &self,
        journal_id: JournalId,
        wallet_id: WalletId,
        satoshis: u64,
    ) -> Result<(), PayoutUpdateError> {
        let mut state = self.state.write().await;

        if state.journals.contains_key(&journal_id) {
            return Err(PayoutUpdateError::Ledger(format!(
                "journal already exists: {}",
                journal_id
            )));
        }

        let balance = state.balances.get(&wallet_id).copied().ok_or_else(|| {
            PayoutUpdateError::Ledger(format!("unknown wallet: {}", wallet_id))
        })?;
        let remaining = balance.checked_sub(satoshis).ok_or_else(|| {
            PayoutUpdateError::Ledger(format!(
                "insufficient balance in {}: {} < {}",
                wallet_id, balance, satoshis
            ))
        })?;

        state.balances.insert(wallet_id.clone(), remaining);
        state.journals.insert(
            journal_id,
            PayoutJournal {
                wallet_id,
                satoshis,
                payout_id: None,
                state: PayoutState::Initiated,
                proportional_fee: None,
                tx_id: None,
                vout: None,
            },
        );
        state.effects += 1;

        Ok(())
    }

    /// Current balance of a wallet
    pub async fn balance(&self, wallet_id: &WalletId) -> Option<u64> {
        self.state.read().await.balances.get(wallet_id).copied()
    }

    /// Status of an incoming output, if known
    pub async fn incoming_status(&self, tx_id: Txid, vout: u32) -> Option<IncomingStatus> {
        self.state
            .read()
            .await
            .incoming
            .get(&OutPoint::new(tx_id, vout))
            .copied()
    }

    /// State of the journal linked to a payout
    pub async fn payout_state(&self, payout_id: &PayoutId) -> Option<PayoutState> {
        let state = self.state.read().await;
        let journal_id = state.payouts.get(payout_id)?;
        state.journals.get(journal_id).map(|j| j.state)
    }

    /// State of a journal by id
    pub async fn journal_state(&self, journal_id: &JournalId) -> Option<PayoutState> {
        self.state
            .read()
            .await
            .journals
            .get(journal_id)
            .map(|j| j.state)
    }

    /// Number of ledger writes performed so far
    pub async fn ledger_effects(&self) -> u64 {
        self.state.read().await.effects
    }

    /// Get statistics
    pub async fn stats(&self) -> LedgerStats {
        let state = self.state.read().await;

        let mut stats = LedgerStats {
            wallets: state.balances.len() as u64,
            effects: state.effects,
            cold_transfers: state.cold_transfers.len() as u64,
            cold_transfer_sats: state
                .cold_transfers
                .values()
                .fold(0u64, |total, sats| total.saturating_add(*sats)),
            ..LedgerStats::default()
        };

        for status in state.incoming.values() {
            match status {
                IncomingStatus::Pending => stats.pending_incoming += 1,
                IncomingStatus::Settled => stats.settled_incoming += 1,
            }
        }

        for journal in state.journals.values() {
            match journal.state {
                PayoutState::Settled => stats.settled_payouts += 1,
                _ => stats.open_payouts += 1,
            }
        }

        stats
    }

    /// Resolve the wallet for an address and check the amount is worth crediting
    fn check_incoming(
        &self,
        state: &LedgerState,
        address: &str,
        satoshis: u64,
    ) -> Result<WalletId, IncomingTxError> {
        let wallet_id = state
            .wallets_by_address
            .get(address)
            .cloned()
            .ok_or_else(|| IncomingTxError::WalletNotFoundForAddress(address.to_string()))?;

        if satoshis < self.dust_threshold_sats {
            return Err(IncomingTxError::LessThanDustThreshold {
                amount: satoshis,
                threshold: self.dust_threshold_sats,
            });
        }

        if satoshis <= self.deposit_fee_sats {
            return Err(IncomingTxError::AmountLessThanFee {
                amount: satoshis,
                fee: self.deposit_fee_sats,
            });
        }

        Ok(wallet_id)
    }
}

/// Balance of `wallet_id` after crediting `satoshis`, without writing it
fn credited_balance(
    state: &LedgerState,
    wallet_id: &WalletId,
    satoshis: u64,
) -> Result<u64, IncomingTxError> {
    let balance = state.balances.get(wallet_id).copied().unwrap_or(0);
    balance.checked_add(satoshis).ok_or_else(|| {
        IncomingTxError::Ledger(format!(
            "balance overflow in {}: {} + {}",
            wallet_id, balance, satoshis
        ))
    })
}

#[async_trait]
impl LedgerFacade for MemoryLedger {
    async fn add_pending_transaction(&self, event: &UtxoDetected) -> Result<(), IncomingTxError> {
        let mut state = self.state.write().await;
        let wallet_id = self.check_incoming(&state, &event.address, event.satoshis)?;

        let outpoint = OutPoint::new(event.tx_id, event.vout);
        if state.incoming.contains_key(&outpoint) {
            tracing::debug!(
                target: "settlement::ledger",
                %outpoint,
                "pending transaction already recorded"
            );
            return Ok(());
        }

        tracing::debug!(
            target: "settlement::ledger",
            %outpoint,
            wallet_id = %wallet_id,
            satoshis = event.satoshis,
            "pending transaction recorded"
        );
        state.incoming.insert(outpoint, IncomingStatus::Pending);
        state.effects += 1;

        Ok(())
    }

    async fn remove_pending_transaction(
        &self,
        event: &UtxoDropped,
    ) -> Result<(), IncomingTxError> {
        let mut state = self.state.write().await;

        if !state.wallets_by_address.contains_key(&event.address) {
            return Err(IncomingTxError::WalletNotFoundForAddress(
                event.address.clone(),
            ));
        }

        let outpoint = OutPoint::new(event.tx_id, event.vout);
        match state.incoming.get(&outpoint).copied() {
            None => Ok(()),
            Some(IncomingStatus::Settled) => Err(IncomingTxError::Ledger(format!(
                "cannot drop settled output {}",
                outpoint
            ))),
            Some(IncomingStatus::Pending) => {
                state.incoming.remove(&outpoint);
                state.effects += 1;
                Ok(())
            }
        }
    }

    async fn add_settled_transaction(&self, event: &UtxoSettled) -> Result<(), IncomingTxError> {
        let mut state = self.state.write().await;
        let wallet_id = self.check_incoming(&state, &event.address, event.satoshis)?;

        let outpoint = OutPoint::new(event.tx_id, event.vout);
        if state.incoming.get(&outpoint) == Some(&IncomingStatus::Settled) {
            tracing::debug!(
                target: "settlement::ledger",
                %outpoint,
                "settled transaction already recorded"
            );
            return Ok(());
        }

        // check_incoming guarantees satoshis > deposit_fee_sats
        let credit = event.satoshis - self.deposit_fee_sats;
        let balance = credited_balance(&state, &wallet_id, credit)?;

        state.incoming.insert(outpoint, IncomingStatus::Settled);
        state.balances.insert(wallet_id, balance);
        state.effects += 1;

        Ok(())
    }

    async fn set_payout_journal_link(
        &self,
        journal_id: &JournalId,
        payout_id: &PayoutId,
    ) -> Result<(), PayoutUpdateError> {
        let mut state = self.state.write().await;

        let journal = state.journals.get_mut(journal_id).ok_or_else(|| {
            PayoutUpdateError::NoTransactionToUpdate(format!("journal {}", journal_id))
        })?;

        match &journal.payout_id {
            Some(existing) if existing == payout_id => return Ok(()),
            Some(existing) => {
                return Err(PayoutUpdateError::NoTransactionToUpdate(format!(
                    "journal {} already linked to payout {}",
                    journal_id, existing
                )))
            }
            None => {}
        }

        journal.payout_id = Some(payout_id.clone());
        journal.state = PayoutState::Submitted;
        state.payouts.insert(payout_id.clone(), journal_id.clone());
        state.effects += 1;

        Ok(())
    }

    async fn record_hot_to_cold_transfer(
        &self,
        event: &PayoutBroadcast,
    ) -> Result<(), ColdTransferError> {
        let mut state = self.state.write().await;

        if state.cold_transfers.contains_key(&event.id) {
            return Ok(());
        }

        if event.satoshis == 0 {
            return Err(ColdTransferError::InvalidTransfer(format!(
                "zero amount for payout {}",
                event.id
            )));
        }

        state.cold_transfers.insert(event.id.clone(), event.satoshis);
        state.effects += 1;

        Ok(())
    }

    async fn register_broadcasted_payout(
        &self,
        payout_id: &PayoutId,
        proportional_fee: u64,
        tx_id: Txid,
        vout: u32,
    ) -> Result<(), PayoutUpdateError> {
        let mut state = self.state.write().await;

        let journal_id = state.payouts.get(payout_id).cloned().ok_or_else(|| {
            PayoutUpdateError::NoTransactionToUpdate(format!("payout {}", payout_id))
        })?;
        let journal = state.journals.get_mut(&journal_id).ok_or_else(|| {
            PayoutUpdateError::Ledger(format!("dangling payout index for {}", payout_id))
        })?;

        if journal.state != PayoutState::Submitted {
            return Err(PayoutUpdateError::NoTransactionToUpdate(format!(
                "payout {} is {}",
                payout_id, journal.state
            )));
        }

        journal.proportional_fee = Some(proportional_fee);
        journal.tx_id = Some(tx_id);
        journal.vout = Some(vout);
        journal.state = PayoutState::Broadcast;
        tracing::debug!(
            target: "settlement::ledger",
            payout_id = %payout_id,
            wallet_id = %journal.wallet_id,
            satoshis = journal.satoshis,
            proportional_fee,
            "payout broadcast recorded"
        );
        state.effects += 1;

        Ok(())
    }

    async fn settle_payout(&self, payout_id: &PayoutId) -> Result<(), PayoutSettleError> {
        let mut state = self.state.write().await;

        let journal_id = state.payouts.get(payout_id).cloned().ok_or_else(|| {
            PayoutSettleError::NoTransactionToSettle(format!("payout {}", payout_id))
        })?;
        let journal = state.journals.get_mut(&journal_id).ok_or_else(|| {
            PayoutSettleError::Ledger(format!("dangling payout index for {}", payout_id))
        })?;

        if journal.state != PayoutState::Broadcast {
            return Err(PayoutSettleError::NoTransactionToSettle(format!(
                "payout {} is {}",
                payout_id, journal.state
            )));
        }

        journal.state = PayoutState::Settled;
        state.effects += 1;

        Ok(())
    }
}
