//! End-to-end settlement against the in-memory ledger
//!
//! Events are decoded from the watcher's JSON wire format and replayed,
//! including duplicate deliveries.

use bitcoin::Txid;
use onchain_settlement::ledger::{IncomingStatus, MemoryLedger, PayoutState};
use onchain_settlement::settlement::{
    BenignCondition, Outcome, SettlementDispatcher, SettlementError,
};
use onchain_settlement::types::{ChainEvent, EventPayload, JournalId, PayoutId, WalletId};
use onchain_settlement::{ColdTransferError, IncomingTxError};
use std::str::FromStr;
use std::sync::Arc;

const DEPOSIT_TX: &str = "e8b43fb8ef7fd6c7d1bc4d0c5d2d3e5f1c7a6b9c0d1e2f30415263748596a7b8";
const PAYOUT_TX: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f00112233445566778899aabbccddeeff0";
const ADDRESS: &str = "bcrt1qtracked";

fn event(json: &str) -> ChainEvent {
    serde_json::from_str(json).expect("valid event json")
}

fn utxo_settled(sequence: u64, satoshis: u64) -> ChainEvent {
    event(&format!(
        r#"{{"sequence":{},"payload":{{"type":"utxo_settled","txId":"{}","vout":0,"satoshis":{},"address":"{}","blockNumber":120}}}}"#,
        sequence, DEPOSIT_TX, satoshis, ADDRESS
    ))
}

fn utxo_detected(sequence: u64, address: &str, satoshis: u64) -> ChainEvent {
    event(&format!(
        r#"{{"sequence":{},"payload":{{"type":"utxo_detected","txId":"{}","vout":0,"satoshis":{},"address":"{}"}}}}"#,
        sequence, DEPOSIT_TX, satoshis, address
    ))
}

fn payout_event(sequence: u64, kind: &str, rebalance: bool) -> ChainEvent {
    let payload = match kind {
        "payout_submitted" => r#"{"type":"payout_submitted","id":"payout-7","satoshis":30000}"#
            .to_string(),
        _ => format!(
            r#"{{"type":"{}","id":"payout-7","proportionalFee":340,"txId":"{}","vout":1,"satoshis":30000,"address":"bcrt1qexternal"}}"#,
            kind, PAYOUT_TX
        ),
    };
    event(&format!(
        r#"{{"sequence":{},"payload":{},"augmentation":{{"payoutInfo":{{"id":"payout-7","externalId":"journal-7","metadata":{{"galoy":{{"rebalanceToColdWallet":{}}}}}}}}}}}"#,
        sequence, payload, rebalance
    ))
}

async fn setup() -> (MemoryLedger, SettlementDispatcher, WalletId) {
    let ledger = MemoryLedger::new(1_000, 0);
    let wallet = WalletId::new("wallet-1");
    ledger.register_address(ADDRESS, wallet.clone()).await;
    let dispatcher = SettlementDispatcher::new(Arc::new(ledger.clone()));
    (ledger, dispatcher, wallet)
}

#[tokio::test]
async fn test_settled_replay_has_single_effect() {
    let (ledger, dispatcher, wallet) = setup().await;
    let settled = utxo_settled(10, 75_000);

    assert_eq!(dispatcher.handle(&settled).await, Ok(Outcome::Applied));
    let effects = ledger.ledger_effects().await;

    // Redelivery of the same event
    assert_eq!(dispatcher.handle(&settled).await, Ok(Outcome::Applied));
    assert_eq!(ledger.ledger_effects().await, effects);
    assert_eq!(ledger.balance(&wallet).await, Some(75_000));
}

#[tokio::test]
async fn test_detected_then_settled() {
    let (ledger, dispatcher, _) = setup().await;
    let tx = Txid::from_str(DEPOSIT_TX).unwrap();

    dispatcher
        .handle(&utxo_detected(1, ADDRESS, 75_000))
        .await
        .unwrap();
    assert_eq!(
        ledger.incoming_status(tx, 0).await,
        Some(IncomingStatus::Pending)
    );

    dispatcher.handle(&utxo_settled(2, 75_000)).await.unwrap();
    assert_eq!(
        ledger.incoming_status(tx, 0).await,
        Some(IncomingStatus::Settled)
    );
}

#[tokio::test]
async fn test_chain_noise_is_absorbed() {
    let (ledger, dispatcher, _) = setup().await;

    let dust = dispatcher.handle(&utxo_detected(1, ADDRESS, 546)).await;
    assert_eq!(
        dust,
        Ok(Outcome::Absorbed(BenignCondition::LessThanDustThreshold))
    );

    let untracked = dispatcher
        .handle(&utxo_detected(2, "bcrt1qsomeoneelse", 50_000))
        .await;
    assert_eq!(
        untracked,
        Ok(Outcome::Absorbed(BenignCondition::WalletNotFoundForAddress))
    );

    assert_eq!(ledger.ledger_effects().await, 0);
}

#[tokio::test]
async fn test_address_deallocated_mid_flight() {
    let (ledger, dispatcher, _) = setup().await;

    dispatcher
        .handle(&utxo_detected(1, ADDRESS, 20_000))
        .await
        .unwrap();
    ledger.deallocate_address(ADDRESS).await;

    let dropped = event(&format!(
        r#"{{"sequence":2,"payload":{{"type":"utxo_dropped","txId":"{}","vout":0,"satoshis":20000,"address":"{}"}}}}"#,
        DEPOSIT_TX, ADDRESS
    ));
    assert_eq!(
        dispatcher.handle(&dropped).await,
        Ok(Outcome::Absorbed(BenignCondition::WalletNotFoundForAddress))
    );
}

#[tokio::test]
async fn test_payout_lifecycle_with_redelivery() {
    let (ledger, dispatcher, wallet) = setup().await;
    dispatcher.handle(&utxo_settled(1, 100_000)).await.unwrap();
    ledger
        .open_payout_journal(JournalId::new("journal-7"), wallet.clone(), 30_000)
        .await
        .unwrap();

    let payout = PayoutId::new("payout-7");
    let submitted = payout_event(2, "payout_submitted", false);
    let broadcast = payout_event(3, "payout_broadcast", false);
    let settled = payout_event(4, "payout_settled", false);

    assert_eq!(dispatcher.handle(&submitted).await, Ok(Outcome::Applied));
    assert_eq!(
        ledger.payout_state(&payout).await,
        Some(PayoutState::Submitted)
    );

    assert_eq!(dispatcher.handle(&broadcast).await, Ok(Outcome::Applied));
    assert_eq!(
        dispatcher.handle(&broadcast).await,
        Ok(Outcome::Absorbed(BenignCondition::NoTransactionToUpdate))
    );

    assert_eq!(dispatcher.handle(&settled).await, Ok(Outcome::Applied));
    assert_eq!(
        dispatcher.handle(&settled).await,
        Ok(Outcome::Absorbed(BenignCondition::NoTransactionToSettle))
    );

    assert_eq!(
        ledger.payout_state(&payout).await,
        Some(PayoutState::Settled)
    );
    assert_eq!(ledger.balance(&wallet).await, Some(70_000));
}

#[tokio::test]
async fn test_submission_ahead_of_journal_is_absorbed() {
    let (ledger, dispatcher, _) = setup().await;

    let outcome = dispatcher
        .handle(&payout_event(1, "payout_submitted", false))
        .await;
    assert_eq!(
        outcome,
        Ok(Outcome::Absorbed(BenignCondition::NoTransactionToUpdate))
    );
    assert_eq!(ledger.journal_state(&JournalId::new("journal-7")).await, None);
}

#[tokio::test]
async fn test_cold_wallet_rebalance_bypasses_payout_bookkeeping() {
    let (ledger, dispatcher, _) = setup().await;

    let broadcast = payout_event(5, "payout_broadcast", true);
    assert_eq!(dispatcher.handle(&broadcast).await, Ok(Outcome::Applied));
    assert_eq!(dispatcher.handle(&broadcast).await, Ok(Outcome::Applied));

    let stats = ledger.stats().await;
    assert_eq!(stats.cold_transfers, 1);
    assert_eq!(stats.cold_transfer_sats, 30_000);
    assert_eq!(ledger.payout_state(&PayoutId::new("payout-7")).await, None);
}

#[tokio::test]
async fn test_cold_wallet_errors_are_not_suppressed() {
    let (_, dispatcher, _) = setup().await;

    let mut zero = payout_event(5, "payout_broadcast", true);
    if let EventPayload::PayoutBroadcast(payload) = &mut zero.payload {
        payload.satoshis = 0;
    }

    assert!(matches!(
        dispatcher.handle(&zero).await,
        Err(SettlementError::ColdTransfer(
            ColdTransferError::InvalidTransfer(_)
        ))
    ));
}

#[tokio::test]
async fn test_unknown_kind_from_newer_watcher() {
    let (ledger, dispatcher, _) = setup().await;

    let committed =
        event(r#"{"sequence":8,"payload":{"type":"payout_committed","id":"p","txId":"x"}}"#);
    assert_eq!(dispatcher.handle(&committed).await, Ok(Outcome::Ignored));
    assert_eq!(ledger.ledger_effects().await, 0);
}

#[tokio::test]
async fn test_balance_overflow_is_a_ledger_error() {
    let (ledger, dispatcher, wallet) = setup().await;
    let tx = Txid::from_str(DEPOSIT_TX).unwrap();

    assert_eq!(
        dispatcher.handle(&utxo_settled(1, u64::MAX)).await,
        Ok(Outcome::Applied)
    );

    let mut second = utxo_settled(2, 10_000);
    if let EventPayload::UtxoSettled(payload) = &mut second.payload {
        payload.vout = 1;
    }
    let result = dispatcher.handle(&second).await;

    assert!(matches!(
        result,
        Err(SettlementError::Incoming(IncomingTxError::Ledger(_)))
    ));
    assert!(result.unwrap_err().is_retryable());
    assert_eq!(ledger.incoming_status(tx, 1).await, None);
    assert_eq!(ledger.balance(&wallet).await, Some(u64::MAX));
}
