//! Warehouse participant tests against a real Postgres instance
//! (`DATABASE_URL`), skipped when no database is configured. Stock levels
//! aren't provisioned by this service (admin product CRUD is out of
//! scope), so each test seeds its own `store_item` rows directly.

use std::sync::Arc;

use rc_common::db;
use rc_common::event::EventItem;
use rc_common::event_bus::memory::InMemoryEventBus;
use rc_common::event_bus::EventBus;
use rc_common::outbox;

use warehouse_service::repository::{PostgresWarehouseRepository, WarehouseRepository};
use warehouse_service::{migrations, WarehouseApplication};

async fn test_pool() -> Option<sqlx::PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = sqlx::postgres::PgPoolOptions::new().max_connections(5).connect(&url).await.ok()?;
    db::run_migrations(&pool, migrations::MIGRATIONS).await.ok()?;
    Some(pool)
}

async fn seed_stock(pool: &sqlx::PgPool, product_id: i64, quantity: i64) {
    sqlx::query("INSERT INTO store_item (product_id, available_quantity) VALUES ($1, $2)")
        .bind(product_id)
        .bind(quantity)
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn preparing_an_order_reserves_every_item() {
    let Some(pool) = test_pool().await else { return };

    seed_stock(&pool, 201, 10).await;
    seed_stock(&pool, 202, 5).await;

    let repository = Arc::new(PostgresWarehouseRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = WarehouseApplication::new(pool.clone(), repository.clone(), bus);

    let items = vec![EventItem { product_id: 201, quantity: 3 }, EventItem { product_id: 202, quantity: 2 }];
    app.on_order_prepared(601, &items).await.unwrap();

    assert_eq!(repository.find_item(201).await.unwrap().available_quantity, 7);
    assert_eq!(repository.find_item(202).await.unwrap().available_quantity, 3);

    // Redelivery of the same `orderPrepared` must not double-reserve.
    app.on_order_prepared(601, &items).await.unwrap();
    assert_eq!(repository.find_item(201).await.unwrap().available_quantity, 7);
}

#[tokio::test]
async fn insufficient_stock_rejects_and_reserves_nothing() {
    let Some(pool) = test_pool().await else { return };

    seed_stock(&pool, 203, 1).await;

    let repository = Arc::new(PostgresWarehouseRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = WarehouseApplication::new(pool.clone(), repository.clone(), bus);

    let items = vec![EventItem { product_id: 203, quantity: 5 }];
    app.on_order_prepared(602, &items).await.unwrap();

    assert_eq!(repository.find_item(203).await.unwrap().available_quantity, 1);
}

#[tokio::test]
async fn rolling_back_a_reserved_order_returns_the_stock() {
    let Some(pool) = test_pool().await else { return };

    seed_stock(&pool, 204, 10).await;

    let repository = Arc::new(PostgresWarehouseRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = WarehouseApplication::new(pool.clone(), repository.clone(), bus);

    let items = vec![EventItem { product_id: 204, quantity: 4 }];
    app.on_order_prepared(603, &items).await.unwrap();
    assert_eq!(repository.find_item(204).await.unwrap().available_quantity, 6);

    app.on_order_rolled_back(603, &items).await.unwrap();
    assert_eq!(repository.find_item(204).await.unwrap().available_quantity, 10);

    // Rolling back an order that was never reserved is a no-op.
    app.on_order_rolled_back(9999, &items).await.unwrap();
}

#[tokio::test]
async fn rolling_back_a_rejected_reservation_does_not_add_stock() {
    let Some(pool) = test_pool().await else { return };

    seed_stock(&pool, 206, 1).await;

    let repository = Arc::new(PostgresWarehouseRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = WarehouseApplication::new(pool.clone(), repository.clone(), bus);

    let items = vec![EventItem { product_id: 206, quantity: 5 }];
    app.on_order_prepared(605, &items).await.unwrap();
    assert_eq!(repository.find_item(206).await.unwrap().available_quantity, 1);

    // The rejected reservation left no `processed_orders` row, so this
    // rollback must be a no-op rather than releasing stock that was
    // never decremented.
    app.on_order_rolled_back(605, &items).await.unwrap();
    assert_eq!(repository.find_item(206).await.unwrap().available_quantity, 1);
}

#[tokio::test]
async fn outbox_drain_publishes_warehouse_confirmed() {
    let Some(pool) = test_pool().await else { return };

    seed_stock(&pool, 205, 10).await;

    let repository = Arc::new(PostgresWarehouseRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = WarehouseApplication::new(pool.clone(), repository, bus.clone());

    app.on_order_prepared(604, &[EventItem { product_id: 205, quantity: 1 }]).await.unwrap();

    let sent = outbox::drain(&pool, bus.as_ref(), 10).await.unwrap();
    assert!(sent >= 1);
}
