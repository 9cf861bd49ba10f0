//! Chain Event Types
//!
//! Events emitted by the on-chain wallet watcher. Each event carries a
//! per-source sequence number, a tagged payload and optional augmentation
//! attached by the caller:
//!
//! ```text
//! utxo_detected → utxo_settled          (or utxo_dropped)
//! payout_submitted → payout_broadcast → payout_settled
//! ```

use bitcoin::Txid;
use serde::{Deserialize, Serialize};

/// Identifier of a payout assigned by the watcher
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayoutId(pub String);

/// Ledger journal entry identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JournalId(pub String);

/// Wallet identifier inside the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(pub String);

macro_rules! string_id {
    ($($name:ident),*) => {
        $(
            impl $name {
                pub fn new(id: impl Into<String>) -> Self {
                    Self(id.into())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

string_id!(PayoutId, JournalId, WalletId);

/// An output seen in the mempool at a tracked address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoDetected {
    pub tx_id: Txid,
    pub vout: u32,
    pub satoshis: u64,
    pub address: String,
}

/// A previously detected output that left the mempool unconfirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoDropped {
    pub tx_id: Txid,
    pub vout: u32,
    pub satoshis: u64,
    pub address: String,
}

/// An output that reached the settlement depth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoSettled {
    pub tx_id: Txid,
    pub vout: u32,
    pub satoshis: u64,
    pub address: String,
    pub block_number: u64,
}

/// Payout accepted by the watcher and queued for batching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutSubmitted {
    pub id: PayoutId,
    pub satoshis: u64,
}

/// Payout included in a broadcast batch transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutBroadcast {
    pub id: PayoutId,
    /// This payout's share of the batch fee
    pub proportional_fee: u64,
    pub tx_id: Txid,
    pub vout: u32,
    pub satoshis: u64,
    pub address: String,
}

/// Payout whose batch transaction reached the settlement depth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutSettled {
    pub id: PayoutId,
    pub proportional_fee: u64,
    pub tx_id: Txid,
    pub vout: u32,
    pub satoshis: u64,
    pub address: String,
}

/// Tagged event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    UtxoDetected(UtxoDetected),
    UtxoDropped(UtxoDropped),
    UtxoSettled(UtxoSettled),
    PayoutSubmitted(PayoutSubmitted),
    PayoutBroadcast(PayoutBroadcast),
    PayoutSettled(PayoutSettled),
    /// Any tag this build does not know about
    #[serde(other)]
    Unknown,
}

/// `galoy` namespace inside payout metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaloyMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebalance_to_cold_wallet: Option<bool>,
}

/// Free-form metadata the payout was submitted with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub galoy: Option<GaloyMetadata>,
}

/// Payout details looked up by the caller before dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutInfo {
    pub id: PayoutId,
    /// Ledger journal the payout was created from
    pub external_id: JournalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PayoutMetadata>,
}

impl PayoutInfo {
    /// True when the payout moves funds from the hot wallet to cold storage
    pub fn is_cold_wallet_rebalance(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.galoy.as_ref())
            .and_then(|g| g.rebalance_to_cold_wallet)
            .unwrap_or(false)
    }
}

/// Side-channel data attached to an event by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Augmentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_info: Option<PayoutInfo>,
}

/// A single sequence-numbered event from the watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    /// Monotonic per source; ordering is enforced upstream
    pub sequence: u64,
    pub payload: EventPayload,
    #[serde(default)]
    pub augmentation: Augmentation,
}

impl ChainEvent {
    pub fn new(sequence: u64, payload: EventPayload) -> Self {
        Self {
            sequence,
            payload,
            augmentation: Augmentation::default(),
        }
    }

    pub fn with_payout_info(mut self, payout_info: PayoutInfo) -> Self {
        self.augmentation.payout_info = Some(payout_info);
        self
    }
}
