//! Delivery participant tests against a real Postgres instance
//! (`DATABASE_URL`), skipped when no database is configured. Couriers
//! aren't provisioned by this service's saga, so each test seeds its own
//! `courier` rows directly.

use std::sync::Arc;

use chrono::NaiveDate;

use rc_common::db;
use rc_common::event_bus::memory::InMemoryEventBus;
use rc_common::event_bus::EventBus;
use rc_common::outbox;

use delivery_service::repository::{DeliveryRepository, PostgresDeliveryRepository};
use delivery_service::{migrations, DeliveryApplication};

async fn test_pool() -> Option<sqlx::PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = sqlx::postgres::PgPoolOptions::new().max_connections(5).connect(&url).await.ok()?;
    db::run_migrations(&pool, migrations::MIGRATIONS).await.ok()?;
    Some(pool)
}

async fn seed_courier(pool: &sqlx::PgPool, courier_id: i64, max_per_day: i32) {
    sqlx::query("INSERT INTO courier (courier_id, max_per_day) VALUES ($1, $2)")
        .bind(courier_id)
        .bind(max_per_day)
        .execute(pool)
        .await
        .unwrap();
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, day).unwrap()
}

#[tokio::test]
async fn preparing_an_order_assigns_a_free_courier() {
    let Some(pool) = test_pool().await else { return };

    seed_courier(&pool, 301, 1).await;

    let repository = Arc::new(PostgresDeliveryRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = DeliveryApplication::new(pool.clone(), repository.clone(), bus);

    app.submit_delivery(701, "1 Infinite Loop", date(1)).await.unwrap();
    app.on_order_prepared(701).await.unwrap();

    let delivery = repository.find_by_order(701).await.unwrap();
    assert_eq!(delivery.courier_id, Some(301));

    // Redelivery of `orderPrepared` must not reassign or error.
    app.on_order_prepared(701).await.unwrap();
    let delivery = repository.find_by_order(701).await.unwrap();
    assert_eq!(delivery.courier_id, Some(301));
}

#[tokio::test]
async fn no_free_courier_rejects_without_assigning() {
    let Some(pool) = test_pool().await else { return };

    seed_courier(&pool, 302, 1).await;

    let repository = Arc::new(PostgresDeliveryRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = DeliveryApplication::new(pool.clone(), repository.clone(), bus);

    app.submit_delivery(702, "addr a", date(2)).await.unwrap();
    app.on_order_prepared(702).await.unwrap();

    app.submit_delivery(703, "addr b", date(2)).await.unwrap();
    app.on_order_prepared(703).await.unwrap();

    let second = repository.find_by_order(703).await.unwrap();
    assert_eq!(second.courier_id, None);
}

#[tokio::test]
async fn preparing_an_order_with_no_delivery_request_is_a_silent_no_op() {
    let Some(pool) = test_pool().await else { return };

    let repository = Arc::new(PostgresDeliveryRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = DeliveryApplication::new(pool.clone(), repository, bus);

    app.on_order_prepared(704).await.unwrap();
}

#[tokio::test]
async fn rolling_back_frees_the_courier() {
    let Some(pool) = test_pool().await else { return };

    seed_courier(&pool, 303, 2).await;

    let repository = Arc::new(PostgresDeliveryRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = DeliveryApplication::new(pool.clone(), repository.clone(), bus);

    app.submit_delivery(705, "addr", date(3)).await.unwrap();
    app.on_order_prepared(705).await.unwrap();
    assert_eq!(repository.find_by_order(705).await.unwrap().courier_id, Some(303));

    app.on_order_rolled_back(705).await.unwrap();
    assert_eq!(repository.find_by_order(705).await.unwrap().courier_id, None);
}

#[tokio::test]
async fn outbox_drain_publishes_delivery_confirmed() {
    let Some(pool) = test_pool().await else { return };

    seed_courier(&pool, 304, 1).await;

    let repository = Arc::new(PostgresDeliveryRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = DeliveryApplication::new(pool.clone(), repository, bus.clone());

    app.submit_delivery(706, "addr", date(4)).await.unwrap();
    app.on_order_prepared(706).await.unwrap();

    let sent = outbox::drain(&pool, bus.as_ref(), 10).await.unwrap();
    assert!(sent >= 1);
}
