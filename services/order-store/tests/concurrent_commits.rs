//! Concurrent lock commits against one order
//!
//! Two settlements that together want more than an order holds must never
//! both be recorded, and the mirrored remaining amount never goes negative.

use order_store::{InMemoryOrderStore, OrderStore, StoreError};
use rust_decimal::Decimal;
use std::sync::Arc;
use types::errors::OrderError;
use types::ids::{FiatCurrency, LockId, OrderId, PaymentChannel, TxHash, WalletAddress};
use types::numeric::{Markup, Token, TokenAmount};
use types::order::{Order, OrderStatus};
use types::trade::Trade;

fn seed_order(store: &InMemoryOrderStore, total: u128) {
    store
        .insert_order(Order::new(
            OrderId::new(1),
            WalletAddress::new("0xseller"),
            Token::new("USDC", 6),
            FiatCurrency::new("KES"),
            Markup::from_bps(150),
            TokenAmount::new(total),
            vec![PaymentChannel::new("M-PESA")],
            1,
            0,
        ))
        .unwrap();
}

fn trade(lock_id: u64, buyer: &str, amount: u128) -> Trade {
    Trade::locked(
        LockId::new(lock_id),
        OrderId::new(1),
        WalletAddress::new(buyer),
        WalletAddress::new("0xseller"),
        Token::new("USDC", 6),
        FiatCurrency::new("KES"),
        TokenAmount::new(amount),
        Decimal::from(130),
        TxHash::new(format!("0xtx{}", lock_id)),
        0,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_overlapping_commits_at_most_one_succeeds() {
    let store = Arc::new(InMemoryOrderStore::with_defaults());
    seed_order(&store, 100);

    let first = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.commit_lock(trade(1, "0xalice", 60)).await })
    };
    let second = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.commit_lock(trade(2, "0xbob", 60)).await })
    };

    let results = vec![first.await.unwrap(), second.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one overlapping commit must win");

    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(
        loser,
        StoreError::Order(OrderError::InsufficientRemaining { .. })
    ));

    let order = store.get_order(OrderId::new(1)).await.unwrap().unwrap();
    assert_eq!(order.remaining_amount, TokenAmount::new(40));
    assert_eq!(store.trades().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_many_commits_never_overdraw() {
    let store = Arc::new(InMemoryOrderStore::with_defaults());
    seed_order(&store, 100);

    let handles: Vec<_> = (0..25u64)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.commit_lock(trade(i, "0xbuyer", 7)).await })
        })
        .collect();

    let mut committed = 0u128;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            committed += 7;
        }
    }

    let order = store.get_order(OrderId::new(1)).await.unwrap().unwrap();
    assert!(committed <= 100);
    assert_eq!(order.remaining_amount, TokenAmount::new(100 - committed));
    assert_eq!(store.trades().unwrap().len() as u128, committed / 7);
    assert!(order.check_invariant());
}

#[tokio::test]
async fn test_drained_order_is_closed_and_rejects_further_locks() {
    let store = InMemoryOrderStore::with_defaults();
    seed_order(&store, 100);

    store.commit_lock(trade(1, "0xalice", 100)).await.unwrap();
    let err = store.commit_lock(trade(2, "0xbob", 1)).await.unwrap_err();
    assert!(matches!(err, StoreError::Order(OrderError::NotOpen { .. })));

    let order = store.get_order(OrderId::new(1)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Closed);
}
