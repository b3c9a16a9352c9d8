//! End-to-end saga tests against a real Postgres instance (`DATABASE_URL`),
//! with an in-memory event bus standing in for the broker. Skipped when no
//! database is configured, the same convention the teacher's own
//! integration suite uses for tests that need external services.

use std::sync::Arc;

use rc_common::db;
use rc_common::event_bus::memory::InMemoryEventBus;
use rc_common::event_bus::EventBus;
use rc_common::outbox;

use order_service::domain::OrderStatus;
use order_service::price::StaticPriceResolver;
use order_service::repository::{OrderRepository, PostgresOrderRepository};
use order_service::{migrations, saga::OrderSaga};

async fn test_pool() -> Option<sqlx::PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = sqlx::postgres::PgPoolOptions::new().max_connections(5).connect(&url).await.ok()?;
    db::run_migrations(&pool, migrations::MIGRATIONS).await.ok()?;
    Some(pool)
}

#[tokio::test]
async fn full_saga_reaches_completed_once_both_participants_confirm() {
    let Some(pool) = test_pool().await else { return };

    let repository: Arc<dyn OrderRepository> = Arc::new(PostgresOrderRepository::new(pool.clone()));
    let price_resolver = Arc::new(StaticPriceResolver::new(rust_decimal::Decimal::new(1000, 2)));
    let saga = OrderSaga::new(pool.clone(), repository.clone(), price_resolver);

    let order_id = saga.create(7).await.unwrap();
    saga.add_items(order_id, 7, vec![rc_common::event::EventItem { product_id: 3, quantity: 2 }]).await.unwrap();
    saga.prepare(order_id, 7).await.unwrap();

    let order = repository.find(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Prepared);
    assert_eq!(order.total, rust_decimal::Decimal::new(2000, 2));

    saga.on_warehouse_confirmed(order_id).await.unwrap();
    let order = repository.find(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Prepared);

    saga.on_delivery_confirmed(order_id).await.unwrap();
    let order = repository.find(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);

    saga.on_payment_completed(order_id).await.unwrap();
    let order = repository.find(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
}

#[tokio::test]
async fn rejection_after_rollback_is_absorbed() {
    let Some(pool) = test_pool().await else { return };

    let repository: Arc<dyn OrderRepository> = Arc::new(PostgresOrderRepository::new(pool.clone()));
    let price_resolver = Arc::new(StaticPriceResolver::default());
    let saga = OrderSaga::new(pool.clone(), repository.clone(), price_resolver);

    let order_id = saga.create(9).await.unwrap();
    saga.add_items(order_id, 9, vec![rc_common::event::EventItem { product_id: 1, quantity: 1 }]).await.unwrap();
    saga.prepare(order_id, 9).await.unwrap();

    saga.rollback(order_id).await.unwrap();
    let order = repository.find(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::RolledBack);

    // A second, later rejection for the same order must not error.
    saga.rollback(order_id).await.unwrap();
    let order = repository.find(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::RolledBack);
}

#[tokio::test]
async fn preparing_an_empty_order_is_rejected() {
    let Some(pool) = test_pool().await else { return };

    let repository: Arc<dyn OrderRepository> = Arc::new(PostgresOrderRepository::new(pool.clone()));
    let price_resolver = Arc::new(StaticPriceResolver::default());
    let saga = OrderSaga::new(pool.clone(), repository, price_resolver);

    let order_id = saga.create(11).await.unwrap();
    let err = saga.prepare(order_id, 11).await.unwrap_err();
    assert_eq!(err.category(), "validation");
}

#[tokio::test]
async fn removing_items_never_added_is_rejected() {
    let Some(pool) = test_pool().await else { return };

    let repository: Arc<dyn OrderRepository> = Arc::new(PostgresOrderRepository::new(pool.clone()));
    let price_resolver = Arc::new(StaticPriceResolver::default());
    let saga = OrderSaga::new(pool.clone(), repository.clone(), price_resolver);

    let order_id = saga.create(13).await.unwrap();
    let err = saga
        .remove_items(order_id, 13, vec![rc_common::event::EventItem { product_id: 99, quantity: 1 }])
        .await
        .unwrap_err();
    assert_eq!(err.category(), "invalid_state");

    // No negative-quantity line was left behind by the rejected attempt.
    let items = repository.items(order_id).await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn adding_items_to_a_prepared_order_is_rejected() {
    let Some(pool) = test_pool().await else { return };

    let repository: Arc<dyn OrderRepository> = Arc::new(PostgresOrderRepository::new(pool.clone()));
    let price_resolver = Arc::new(StaticPriceResolver::default());
    let saga = OrderSaga::new(pool.clone(), repository, price_resolver);

    let order_id = saga.create(14).await.unwrap();
    saga.add_items(order_id, 14, vec![rc_common::event::EventItem { product_id: 2, quantity: 1 }]).await.unwrap();
    saga.prepare(order_id, 14).await.unwrap();

    let err = saga
        .add_items(order_id, 14, vec![rc_common::event::EventItem { product_id: 5, quantity: 1 }])
        .await
        .unwrap_err();
    assert_eq!(err.category(), "invalid_state");
}

#[tokio::test]
async fn outbox_drain_publishes_staged_events() {
    let Some(pool) = test_pool().await else { return };

    let repository: Arc<dyn OrderRepository> = Arc::new(PostgresOrderRepository::new(pool.clone()));
    let price_resolver = Arc::new(StaticPriceResolver::default());
    let saga = OrderSaga::new(pool.clone(), repository, price_resolver);
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());

    saga.create(3).await.unwrap();

    let sent = outbox::drain(&pool, bus.as_ref(), 10).await.unwrap();
    assert!(sent >= 1);
}
