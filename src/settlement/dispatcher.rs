//! Settlement Dispatcher
//!
//! Routes one chain event to its handler and returns the handler's outcome
//! verbatim. Holds no state between calls.

use std::sync::Arc;

use super::classify::{classify, EventKind};
use super::handlers;
use super::outcome::{Outcome, SettlementError};
use crate::ledger::LedgerFacade;
use crate::observability::{EventObserver, TracingObserver};
use crate::types::{ChainEvent, EventPayload, PayoutInfo};

/// Entry point for watcher events
#[derive(Clone)]
pub struct SettlementDispatcher {
    ledger: Arc<dyn LedgerFacade>,
    observer: Arc<dyn EventObserver>,
}

impl SettlementDispatcher {
    /// Create a dispatcher reporting to the current tracing span
    pub fn new(ledger: Arc<dyn LedgerFacade>) -> Self {
        Self {
            ledger,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the observability sink
    pub fn with_observer(mut self, observer: Arc<dyn EventObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Handle a single event
    pub async fn handle(&self, event: &ChainEvent) -> Result<Outcome, SettlementError> {
        let kind = classify(event);
        tracing::info!(
            target: "settlement::dispatch",
            sequence = event.sequence,
            kind = kind.as_str(),
            "chain event handler"
        );
        self.observer.record_event(event.sequence, kind.as_str());

        let ledger = self.ledger.as_ref();
        match &event.payload {
            EventPayload::UtxoDetected(payload) => handlers::utxo_detected(ledger, payload).await,
            EventPayload::UtxoDropped(payload) => handlers::utxo_dropped(ledger, payload).await,
            EventPayload::UtxoSettled(payload) => handlers::utxo_settled(ledger, payload).await,
            EventPayload::PayoutSubmitted(payload) => {
                let payout_info = require_payout_info(event, kind)?;
                handlers::payout_submitted(ledger, payload, payout_info).await
            }
            EventPayload::PayoutBroadcast(payload) => {
                let payout_info = require_payout_info(event, kind)?;
                handlers::payout_broadcast(ledger, payload, payout_info).await
            }
            EventPayload::PayoutSettled(payload) => handlers::payout_settled(ledger, payload).await,
            // Kinds added by newer watchers must not stall the stream
            EventPayload::Unknown => Ok(Outcome::Ignored),
        }
    }
}

fn require_payout_info(
    event: &ChainEvent,
    kind: EventKind,
) -> Result<&PayoutInfo, SettlementError> {
    event
        .augmentation
        .payout_info
        .as_ref()
        .ok_or(SettlementError::EventAugmentationMissing {
            sequence: event.sequence,
            kind,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::facade::MockLedgerFacade;
    use crate::ledger::{ColdTransferError, IncomingTxError, PayoutSettleError, PayoutUpdateError};
    use crate::observability::CountingObserver;
    use crate::settlement::BenignCondition;
    use crate::types::*;
    use bitcoin::Txid;
    use std::str::FromStr;

    fn txid() -> Txid {
        Txid::from_str(&"ab".repeat(32)).unwrap()
    }

    fn dispatcher(mock: MockLedgerFacade) -> SettlementDispatcher {
        SettlementDispatcher::new(Arc::new(mock))
    }

    fn detected() -> ChainEvent {
        ChainEvent::new(
            1,
            EventPayload::UtxoDetected(UtxoDetected {
                tx_id: txid(),
                vout: 0,
                satoshis: 300,
                address: "bc1qdust".to_string(),
            }),
        )
    }

    fn dropped() -> ChainEvent {
        ChainEvent::new(
            2,
            EventPayload::UtxoDropped(UtxoDropped {
                tx_id: txid(),
                vout: 0,
                satoshis: 300,
                address: "bc1qgone".to_string(),
            }),
        )
    }

    fn settled() -> ChainEvent {
        ChainEvent::new(
            3,
            EventPayload::UtxoSettled(UtxoSettled {
                tx_id: txid(),
                vout: 0,
                satoshis: 300,
                address: "bc1qdust".to_string(),
                block_number: 812_000,
            }),
        )
    }

    fn submitted() -> ChainEvent {
        ChainEvent::new(
            4,
            EventPayload::PayoutSubmitted(PayoutSubmitted {
                id: PayoutId::new("payout-1"),
                satoshis: 20_000,
            }),
        )
    }

    fn broadcast() -> ChainEvent {
        ChainEvent::new(
            5,
            EventPayload::PayoutBroadcast(PayoutBroadcast {
                id: PayoutId::new("payout-1"),
                proportional_fee: 210,
                tx_id: txid(),
                vout: 1,
                satoshis: 20_000,
                address: "bc1qdest".to_string(),
            }),
        )
    }

    fn payout_settled() -> ChainEvent {
        ChainEvent::new(
            6,
            EventPayload::PayoutSettled(PayoutSettled {
                id: PayoutId::new("payout-1"),
                proportional_fee: 210,
                tx_id: txid(),
                vout: 1,
                satoshis: 20_000,
                address: "bc1qdest".to_string(),
            }),
        )
    }

    fn payout_info(rebalance: Option<bool>) -> PayoutInfo {
        PayoutInfo {
            id: PayoutId::new("payout-1"),
            external_id: JournalId::new("journal-1"),
            metadata: Some(PayoutMetadata {
                galoy: Some(GaloyMetadata {
                    rebalance_to_cold_wallet: rebalance,
                }),
            }),
        }
    }

    fn benign_incoming() -> Vec<IncomingTxError> {
        vec![
            IncomingTxError::AmountLessThanFee { amount: 300, fee: 500 },
            IncomingTxError::LessThanDustThreshold {
                amount: 300,
                threshold: 546,
            },
            IncomingTxError::WalletNotFoundForAddress("bc1qdust".into()),
        ]
    }

    #[tokio::test]
    async fn test_utxo_detected_absorbs_benign_errors() {
        for err in benign_incoming() {
            let mut mock = MockLedgerFacade::new();
            let returned = err.clone();
            mock.expect_add_pending_transaction()
                .times(1)
                .returning(move |_| Err(returned.clone()));

            let outcome = dispatcher(mock).handle(&detected()).await.unwrap();
            assert!(matches!(outcome, Outcome::Absorbed(_)), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn test_utxo_settled_absorbs_benign_errors() {
        for err in benign_incoming() {
            let mut mock = MockLedgerFacade::new();
            let returned = err.clone();
            mock.expect_add_settled_transaction()
                .times(1)
                .returning(move |_| Err(returned.clone()));

            let outcome = dispatcher(mock).handle(&settled()).await.unwrap();
            assert!(matches!(outcome, Outcome::Absorbed(_)), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn test_utxo_dropped_absorbs_wallet_not_found() {
        let mut mock = MockLedgerFacade::new();
        mock.expect_remove_pending_transaction()
            .times(1)
            .returning(|e| Err(IncomingTxError::WalletNotFoundForAddress(e.address.clone())));

        let outcome = dispatcher(mock).handle(&dropped()).await;
        assert_eq!(
            outcome,
            Ok(Outcome::Absorbed(BenignCondition::WalletNotFoundForAddress))
        );
    }

    #[tokio::test]
    async fn test_utxo_ledger_error_propagates() {
        let mut mock = MockLedgerFacade::new();
        mock.expect_add_pending_transaction()
            .times(1)
            .returning(|_| Err(IncomingTxError::Ledger("store offline".into())));

        let outcome = dispatcher(mock).handle(&detected()).await;
        assert_eq!(
            outcome,
            Err(SettlementError::Incoming(IncomingTxError::Ledger(
                "store offline".into()
            )))
        );
    }

    #[tokio::test]
    async fn test_utxo_applied() {
        let mut mock = MockLedgerFacade::new();
        mock.expect_add_settled_transaction()
            .times(1)
            .returning(|_| Ok(()));

        assert_eq!(dispatcher(mock).handle(&settled()).await, Ok(Outcome::Applied));
    }

    #[tokio::test]
    async fn test_missing_augmentation_never_calls_ledger() {
        for event in [submitted(), broadcast()] {
            let mut mock = MockLedgerFacade::new();
            mock.expect_set_payout_journal_link().never();
            mock.expect_register_broadcasted_payout().never();
            mock.expect_record_hot_to_cold_transfer().never();

            let result = dispatcher(mock).handle(&event).await;
            assert!(matches!(
                result,
                Err(SettlementError::EventAugmentationMissing { sequence, .. })
                    if sequence == event.sequence
            ));
        }
    }

    #[tokio::test]
    async fn test_payout_submitted_links_journal() {
        let mut mock = MockLedgerFacade::new();
        mock.expect_set_payout_journal_link()
            .withf(|journal, payout| {
                journal.as_str() == "journal-1" && payout.as_str() == "payout-1"
            })
            .times(1)
            .returning(|_, _| Err(PayoutUpdateError::NoTransactionToUpdate("journal-1".into())));

        let event = submitted().with_payout_info(payout_info(None));
        assert_eq!(
            dispatcher(mock).handle(&event).await,
            Ok(Outcome::Absorbed(BenignCondition::NoTransactionToUpdate))
        );
    }

    #[tokio::test]
    async fn test_rebalance_broadcast_returns_cold_transfer_result() {
        let mut mock = MockLedgerFacade::new();
        mock.expect_register_broadcasted_payout().never();
        mock.expect_record_hot_to_cold_transfer()
            .times(1)
            .returning(|_| Err(ColdTransferError::Ledger("cold wallet unknown".into())));

        let event = broadcast().with_payout_info(payout_info(Some(true)));
        assert_eq!(
            dispatcher(mock).handle(&event).await,
            Err(SettlementError::ColdTransfer(ColdTransferError::Ledger(
                "cold wallet unknown".into()
            )))
        );

        let mut mock = MockLedgerFacade::new();
        mock.expect_register_broadcasted_payout().never();
        mock.expect_record_hot_to_cold_transfer()
            .times(1)
            .returning(|_| Ok(()));
        assert_eq!(dispatcher(mock).handle(&event).await, Ok(Outcome::Applied));
    }

    #[tokio::test]
    async fn test_broadcast_without_marker_absorbs_no_transaction() {
        let mut mock = MockLedgerFacade::new();
        mock.expect_record_hot_to_cold_transfer().never();
        mock.expect_register_broadcasted_payout()
            .withf(|id, fee, _, vout| id.as_str() == "payout-1" && *fee == 210 && *vout == 1)
            .times(1)
            .returning(|id, _, _, _| Err(PayoutUpdateError::NoTransactionToUpdate(id.to_string())));

        let event = broadcast().with_payout_info(payout_info(Some(false)));
        assert_eq!(
            dispatcher(mock).handle(&event).await,
            Ok(Outcome::Absorbed(BenignCondition::NoTransactionToUpdate))
        );
    }

    #[tokio::test]
    async fn test_payout_settled_policy() {
        let mut mock = MockLedgerFacade::new();
        mock.expect_settle_payout()
            .times(1)
            .returning(|id| Err(PayoutSettleError::NoTransactionToSettle(id.to_string())));
        assert_eq!(
            dispatcher(mock).handle(&payout_settled()).await,
            Ok(Outcome::Absorbed(BenignCondition::NoTransactionToSettle))
        );

        let mut mock = MockLedgerFacade::new();
        mock.expect_settle_payout()
            .times(1)
            .returning(|_| Err(PayoutSettleError::Ledger("lock timeout".into())));
        assert_eq!(
            dispatcher(mock).handle(&payout_settled()).await,
            Err(SettlementError::PayoutSettle(PayoutSettleError::Ledger(
                "lock timeout".into()
            )))
        );
    }

    #[tokio::test]
    async fn test_unknown_kind_is_ignored() {
        // No expectations: any ledger call panics
        let mock = MockLedgerFacade::new();
        let observer = Arc::new(CountingObserver::new());
        let dispatcher = dispatcher(mock).with_observer(observer.clone());

        let outcome = dispatcher
            .handle(&ChainEvent::new(77, EventPayload::Unknown))
            .await;

        assert_eq!(outcome, Ok(Outcome::Ignored));
        assert_eq!(observer.events(), 1);
        assert_eq!(observer.last_sequence(), 77);
    }
}
