//! Billing participant tests against a real Postgres instance
//! (`DATABASE_URL`), skipped when no database is configured. Account
//! provisioning isn't part of this service's scope (spec: accounts are
//! seeded directly in tests and migrations), so each test inserts its own
//! account row before exercising `pay_order`.

use std::sync::Arc;

use rust_decimal::Decimal;

use rc_common::db;
use rc_common::event_bus::memory::InMemoryEventBus;
use rc_common::event_bus::EventBus;
use rc_common::inbox::{Inbox, ProcessOutcome};
use rc_common::outbox;

use billing_service::domain::BillStatus;
use billing_service::repository::{BillingRepository, PostgresBillingRepository};
use billing_service::{migrations, BillingApplication};

async fn test_pool() -> Option<sqlx::PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = sqlx::postgres::PgPoolOptions::new().max_connections(5).connect(&url).await.ok()?;
    db::run_migrations(&pool, migrations::MIGRATIONS).await.ok()?;
    Some(pool)
}

async fn seed_account(pool: &sqlx::PgPool, user_id: i64, balance: Decimal) -> i64 {
    sqlx::query_scalar("INSERT INTO account (user_id, balance) VALUES ($1, $2) RETURNING id")
        .bind(user_id)
        .bind(balance)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn pay_order_debits_account_and_completes_the_bill() {
    let Some(pool) = test_pool().await else { return };

    seed_account(&pool, 101, Decimal::new(10000, 2)).await;

    let repository = Arc::new(PostgresBillingRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = BillingApplication::new(pool.clone(), repository.clone(), bus);

    app.pay_order(101, 501, Decimal::new(2500, 2)).await.unwrap();

    let bill = repository.find_bill_by_order(501).await.unwrap();
    assert_eq!(bill.status, BillStatus::Completed);

    let account = repository.find_account_by_user(101).await.unwrap();
    assert_eq!(account.balance, Decimal::new(7500, 2));
}

#[tokio::test]
async fn insufficient_funds_rejects_and_leaves_the_account_untouched() {
    let Some(pool) = test_pool().await else { return };

    seed_account(&pool, 102, Decimal::new(1000, 2)).await;

    let repository = Arc::new(PostgresBillingRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = BillingApplication::new(pool.clone(), repository.clone(), bus);

    app.pay_order(102, 502, Decimal::new(5000, 2)).await.unwrap();

    let account = repository.find_account_by_user(102).await.unwrap();
    assert_eq!(account.balance, Decimal::new(1000, 2));

    // No bill survives the rolled-back savepoint.
    let missing = repository.find_bill_by_order(502).await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn redelivered_payment_is_absorbed_by_the_inbox() {
    let Some(pool) = test_pool().await else { return };

    seed_account(&pool, 103, Decimal::new(10000, 2)).await;

    let repository = Arc::new(PostgresBillingRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = Arc::new(BillingApplication::new(pool.clone(), repository.clone(), bus));

    let inbox = NoOpAlwaysContains::default();
    let event_id = uuid::Uuid::new_v4();

    let outcome = rc_common::inbox::process_once(&pool, &inbox, "billing-service", event_id, |tx| {
        app.pay_order_tx(tx, 103, 503, Decimal::new(1000, 2))
    })
    .await
    .unwrap();
    assert_eq!(outcome, ProcessOutcome::Applied);

    inbox.mark_seen(event_id);

    let outcome = rc_common::inbox::process_once(&pool, &inbox, "billing-service", event_id, |tx| {
        app.pay_order_tx(tx, 103, 503, Decimal::new(1000, 2))
    })
    .await
    .unwrap();
    assert_eq!(outcome, ProcessOutcome::Duplicate);

    let account = repository.find_account_by_user(103).await.unwrap();
    assert_eq!(account.balance, Decimal::new(9000, 2));
}

/// A tiny in-process inbox double, separate from [`NoOpInbox`]: it starts
/// empty and can be told to remember one event id, so a test can drive both
/// the first (new) and second (duplicate) delivery of the same event.
#[derive(Default)]
struct NoOpAlwaysContains {
    seen: std::sync::Mutex<Option<uuid::Uuid>>,
}

impl NoOpAlwaysContains {
    fn mark_seen(&self, id: uuid::Uuid) {
        *self.seen.lock().unwrap() = Some(id);
    }
}

#[async_trait::async_trait]
impl Inbox for NoOpAlwaysContains {
    async fn contains(&self, _consumer_group: &str, event_id: uuid::Uuid) -> rc_common::Result<bool> {
        Ok(*self.seen.lock().unwrap() == Some(event_id))
    }

    async fn register(
        &self,
        _tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        _consumer_group: &str,
        _event_id: uuid::Uuid,
    ) -> rc_common::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn outbox_drain_publishes_payment_completed() {
    let Some(pool) = test_pool().await else { return };

    seed_account(&pool, 104, Decimal::new(10000, 2)).await;

    let repository = Arc::new(PostgresBillingRepository::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::default());
    let app = BillingApplication::new(pool.clone(), repository, bus.clone());

    app.pay_order(104, 504, Decimal::new(1000, 2)).await.unwrap();

    let sent = outbox::drain(&pool, bus.as_ref(), 10).await.unwrap();
    assert!(sent >= 1);
}

