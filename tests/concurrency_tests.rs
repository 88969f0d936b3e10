mod common;

use common::{harness, request, seed_product, seed_user};
use orderflow::domain::order::OrderStatus;
use orderflow::domain::ports::{InventoryStore, OrderRepository};
use orderflow::error::OrderError;
use rand::Rng;
use rust_decimal_macros::dec;
use tokio::task::JoinSet;

#[tokio::test]
async fn test_two_concurrent_creates_one_wins() {
    let h = harness();
    let user = seed_user(&h, 1).await;
    let widget = seed_product(&h, 101, "widget", dec!(10.00), 5).await;

    let mut tasks = JoinSet::new();
    for _ in 0..2 {
        let engine = h.engine.clone();
        tasks.spawn(async move { engine.create_order(user, &[request(widget, 3)]).await });
    }

    let mut succeeded = 0;
    let mut insufficient = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => succeeded += 1,
            Err(OrderError::InsufficientStock { .. }) => insufficient += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(insufficient, 1);
    let stock = h.inventory.get(widget).await.unwrap().unwrap();
    assert_eq!(stock.quantity, 2);
}

#[tokio::test]
async fn test_many_concurrent_creates_never_oversell() {
    let h = harness();
    let user = seed_user(&h, 1).await;
    let widget = seed_product(&h, 101, "widget", dec!(10.00), 50).await;

    let quantities: Vec<u32> = {
        let mut rng = rand::thread_rng();
        (0..20).map(|_| rng.gen_range(1..=5)).collect()
    };

    let mut tasks = JoinSet::new();
    for quantity in quantities {
        let engine = h.engine.clone();
        tasks.spawn(async move {
            engine
                .create_order(user, &[request(widget, quantity)])
                .await
                .map(|order| order.items[0].quantity)
        });
    }

    let mut reserved_total = 0u32;
    while let Some(result) = tasks.join_next().await {
        if let Ok(quantity) = result.unwrap() {
            reserved_total += quantity;
        }
    }

    assert!(reserved_total <= 50);
    let stock = h.inventory.get(widget).await.unwrap().unwrap();
    assert_eq!(stock.quantity, 50 - reserved_total);
}

#[tokio::test]
async fn test_concurrent_double_cancel_releases_once() {
    let h = harness();
    let user = seed_user(&h, 1).await;
    let widget = seed_product(&h, 101, "widget", dec!(10.00), 5).await;

    let order = h
        .engine
        .create_order(user, &[request(widget, 3)])
        .await
        .unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..2 {
        let engine = h.engine.clone();
        let order_id = order.id;
        tasks.spawn(async move { engine.cancel_order(order_id, user).await });
    }

    let mut succeeded = 0;
    while let Some(result) = tasks.join_next().await {
        if result.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    // Exactly one cancellation wins the transition; stock is released once.
    assert_eq!(succeeded, 1);
    let stock = h.inventory.get(widget).await.unwrap().unwrap();
    assert_eq!(stock.quantity, 5);
}

#[tokio::test]
async fn test_payment_racing_cancellation_keeps_invariants() {
    let h = harness();
    let user = seed_user(&h, 1).await;
    let widget = seed_product(&h, 101, "widget", dec!(10.00), 5).await;

    let order = h
        .engine
        .create_order(user, &[request(widget, 2)])
        .await
        .unwrap();

    let pay = {
        let engine = h.engine.clone();
        let order_id = order.id;
        tokio::spawn(async move { engine.process_payment(order_id, "pm_card_visa", user).await })
    };
    let cancel = {
        let engine = h.engine.clone();
        let order_id = order.id;
        tokio::spawn(async move { engine.cancel_order(order_id, user).await })
    };

    let _ = pay.await.unwrap();
    let _ = cancel.await.unwrap();

    // Whichever interleaving ran, cancellation is reachable from both
    // PENDING and PAID, so the order ends cancelled with stock restored
    // exactly once. A successful charge can never resurrect it.
    let stored = h.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Cancelled);
    let stock = h.inventory.get(widget).await.unwrap().unwrap();
    assert_eq!(stock.quantity, 5);
}

#[tokio::test]
async fn test_payment_after_cancellation_never_charges() {
    let h = harness();
    let user = seed_user(&h, 1).await;
    let widget = seed_product(&h, 101, "widget", dec!(10.00), 5).await;

    let order = h
        .engine
        .create_order(user, &[request(widget, 2)])
        .await
        .unwrap();
    h.engine.cancel_order(order.id, user).await.unwrap();

    let err = h
        .engine
        .process_payment(order.id, "pm_card_visa", user)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidState {
            status: OrderStatus::Cancelled,
            ..
        }
    ));
    assert_eq!(h.gateway.calls(), 0);
}
