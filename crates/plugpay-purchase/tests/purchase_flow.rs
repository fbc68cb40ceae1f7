//! End-to-end purchase flows: settlement, the append-only journal, and
//! interleaving while a transfer is in flight.

use std::sync::Arc;

use plugpay_accounts::BalanceBook;
use plugpay_ledger::MockLedger;
use plugpay_purchase::PurchaseLedger;
use plugpay_types::{
    AccountId, AttemptStatus, InMemoryCatalog, PlugpayError, PluginId, PurchaseKey,
};
use tokio::sync::Semaphore;

const PRICE: u64 = 100;

struct Harness {
    catalog: InMemoryCatalog,
    purchases: PurchaseLedger,
    balances: BalanceBook,
    plugin: PluginId,
    author: AccountId,
}

fn harness() -> Harness {
    let mut catalog = InMemoryCatalog::new();
    let plugin = PluginId::new("dev.plugpay.linter");
    let author = AccountId::random();
    catalog.publish(plugin.clone(), "1.0.0", PRICE, author);
    Harness {
        catalog,
        purchases: PurchaseLedger::new(AccountId::random()),
        balances: BalanceBook::new(),
        plugin,
        author,
    }
}

#[tokio::test]
async fn purchase_settles_and_repeat_is_rejected() {
    let h = harness();
    let buyer = AccountId::random();
    let mock = MockLedger::new();
    mock.succeed_with(12);

    let receipt = h
        .purchases
        .purchase(&h.catalog, &mock, &h.balances, h.plugin.clone(), buyer, buyer)
        .await
        .unwrap();

    // 70/30 of the 100-unit price, author's share accrued.
    assert_eq!(receipt.author_share, 70);
    assert_eq!(receipt.registry_share, 30);
    assert_eq!(receipt.block_index, Some(12));
    assert_eq!(h.balances.balance_of(&h.author), 70);
    assert_eq!(h.purchases.registry_earned(), 30);
    assert!(h.purchases.is_purchased(&h.plugin, &buyer));

    let err = h
        .purchases
        .purchase(&h.catalog, &mock, &h.balances, h.plugin.clone(), buyer, buyer)
        .await
        .unwrap_err();
    assert!(matches!(err, PlugpayError::AlreadyPurchased(_)));

    // The rejection left no trace: one attempt, one ledger call, no
    // double-credit.
    let record = h
        .purchases
        .record(&PurchaseKey::derive(&h.plugin, &buyer))
        .unwrap();
    assert_eq!(record.attempt_count(), 1);
    assert!(matches!(
        record.last_attempt().unwrap().status,
        AttemptStatus::Completed { .. }
    ));
    assert_eq!(mock.call_count(), 1);
    assert_eq!(h.balances.balance_of(&h.author), 70);
}

#[tokio::test]
async fn interleaved_purchase_of_same_pair_sees_in_flight_attempt() {
    let h = harness();
    let buyer = AccountId::random();

    let gate = Arc::new(Semaphore::new(0));
    let mock = MockLedger::gated(Arc::clone(&gate));
    mock.succeed_with(40);

    // Drive the first purchase up to its suspension point: the PENDING
    // attempt is in the journal before the transfer parks on the gate.
    let mut first = Box::pin(h.purchases.purchase(
        &h.catalog,
        &mock,
        &h.balances,
        h.plugin.clone(),
        buyer,
        buyer,
    ));
    tokio::select! {
        _ = &mut first => panic!("purchase resolved while gated"),
        () = tokio::task::yield_now() => {}
    }

    // A second handler for the same pair is rejected without touching the
    // ledger.
    let err = h
        .purchases
        .purchase(&h.catalog, &mock, &h.balances, h.plugin.clone(), buyer, buyer)
        .await
        .unwrap_err();
    assert!(matches!(err, PlugpayError::AlreadyProcessing));
    assert_eq!(mock.call_count(), 1);

    // Release the transfer; the first purchase settles normally.
    gate.add_permits(1);
    let receipt = first.await.unwrap();
    assert_eq!(receipt.block_index, Some(40));
    assert_eq!(h.balances.balance_of(&h.author), 70);

    let record = h
        .purchases
        .record(&PurchaseKey::derive(&h.plugin, &buyer))
        .unwrap();
    assert_eq!(record.attempt_count(), 1);
}

#[tokio::test]
async fn interleaved_purchases_of_distinct_buyers_both_settle() {
    let h = harness();
    let alice = AccountId::random();
    let bob = AccountId::random();

    let gate = Arc::new(Semaphore::new(0));
    let mock = MockLedger::gated(Arc::clone(&gate));

    let mut first = Box::pin(h.purchases.purchase(
        &h.catalog,
        &mock,
        &h.balances,
        h.plugin.clone(),
        alice,
        alice,
    ));
    let mut second = Box::pin(h.purchases.purchase(
        &h.catalog,
        &mock,
        &h.balances,
        h.plugin.clone(),
        bob,
        bob,
    ));

    // Park both transfers in flight. Distinct (plugin, buyer) pairs never
    // block each other.
    tokio::select! {
        _ = &mut first => panic!("purchase resolved while gated"),
        _ = &mut second => panic!("purchase resolved while gated"),
        () = tokio::task::yield_now() => {}
    }
    assert_eq!(mock.call_count(), 2);

    gate.add_permits(2);
    first.await.unwrap();
    second.await.unwrap();

    assert!(h.purchases.is_purchased(&h.plugin, &alice));
    assert!(h.purchases.is_purchased(&h.plugin, &bob));
    assert_eq!(h.balances.balance_of(&h.author), 140);
    assert_eq!(h.purchases.registry_earned(), 60);
    assert_eq!(h.purchases.purchases_of_plugin(&h.plugin).len(), 2);
}

#[tokio::test]
async fn failed_purchase_can_be_bought_again_immediately() {
    let h = harness();
    let buyer = AccountId::random();
    let mock = MockLedger::new();
    mock.reject_with("connection reset");
    mock.succeed_with(8);

    let err = h
        .purchases
        .purchase(&h.catalog, &mock, &h.balances, h.plugin.clone(), buyer, buyer)
        .await
        .unwrap_err();
    assert!(matches!(err, PlugpayError::AsyncCallFailed(_)));
    assert_eq!(h.balances.balance_of(&h.author), 0);

    // The failed attempt stays in the journal; the new one appends after it.
    h.purchases
        .purchase(&h.catalog, &mock, &h.balances, h.plugin.clone(), buyer, buyer)
        .await
        .unwrap();

    let record = h
        .purchases
        .record(&PurchaseKey::derive(&h.plugin, &buyer))
        .unwrap();
    assert_eq!(record.attempt_count(), 2);
    assert!(matches!(
        record.attempts[0].status,
        AttemptStatus::CallRejected { .. }
    ));
    assert!(record.is_completed());
    assert_eq!(h.balances.balance_of(&h.author), 70);
}

#[tokio::test]
async fn late_outcome_of_superseded_attempt_leaves_retry_intact() {
    let h = harness();
    let buyer = AccountId::random();
    let key = PurchaseKey::derive(&h.plugin, &buyer);

    // The original purchase parks in flight on a ledger that will reject it.
    let slow_gate = Arc::new(Semaphore::new(0));
    let slow = MockLedger::gated(Arc::clone(&slow_gate));
    slow.reject_with("network down");
    let mut original = Box::pin(h.purchases.purchase(
        &h.catalog,
        &slow,
        &h.balances,
        h.plugin.clone(),
        buyer,
        buyer,
    ));
    tokio::select! {
        _ = &mut original => panic!("purchase resolved while gated"),
        () = tokio::task::yield_now() => {}
    }
    assert!(h.purchases.record(&key).unwrap().has_pending());

    // An operator retry supersedes the stuck attempt and parks its own
    // transfer on a healthy ledger.
    let fast_gate = Arc::new(Semaphore::new(0));
    let fast = MockLedger::gated(Arc::clone(&fast_gate));
    fast.succeed_with(11);
    let mut retry = Box::pin(h.purchases.retry_purchase(&fast, &h.balances, key));
    tokio::select! {
        _ = &mut retry => panic!("retry resolved while gated"),
        () = tokio::task::yield_now() => {}
    }

    // The original resolves first. Its attempt was superseded, so the late
    // rejection surfaces to its caller but never touches the retry's attempt.
    slow_gate.add_permits(1);
    let err = (&mut original).await.unwrap_err();
    assert!(matches!(err, PlugpayError::AsyncCallFailed(_)));
    let record = h.purchases.record(&key).unwrap();
    assert!(record.has_pending(), "retry attempt still in flight");
    assert!(matches!(
        record.attempts[0].status,
        AttemptStatus::CallRejected { .. }
    ));

    // The retry's own transfer lands and settles normally.
    fast_gate.add_permits(1);
    let receipt = retry.await.unwrap();
    assert_eq!(receipt.block_index, Some(11));
    assert!(h.purchases.is_purchased(&h.plugin, &buyer));
    assert_eq!(h.balances.balance_of(&h.author), 70);

    let record = h.purchases.record(&key).unwrap();
    assert_eq!(record.attempt_count(), 2);
    assert!(record.is_completed());
}

#[tokio::test]
async fn gift_purchase_charges_payer_and_grants_buyer() {
    let h = harness();
    let recipient = AccountId::random();
    let payer = AccountId::random();
    let mock = MockLedger::new();

    h.purchases
        .purchase(
            &h.catalog,
            &mock,
            &h.balances,
            h.plugin.clone(),
            recipient,
            payer,
        )
        .await
        .unwrap();

    assert!(h.purchases.is_purchased(&h.plugin, &recipient));
    assert!(!h.purchases.is_purchased(&h.plugin, &payer));
    assert_eq!(mock.last_call().unwrap().from, payer);
}
