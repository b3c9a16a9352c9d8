//! Consumer-side dedup (spec §4.4), ported from `src/toolbox/inbox.go`.
//!
//! Keyed on `(consumer_group, event_id)` rather than the Go source's bare
//! `event_id`, since here each service runs its own independent consumer
//! group against the same topics (see DESIGN.md).

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::Result;

#[async_trait]
pub trait Inbox: Send + Sync {
    async fn contains(&self, consumer_group: &str, event_id: Uuid) -> Result<bool>;
    async fn register(&self, tx: &mut Transaction<'_, Postgres>, consumer_group: &str, event_id: Uuid) -> Result<()>;
}

pub struct SqlInbox {
    pool: PgPool,
}

impl SqlInbox {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Inbox for SqlInbox {
    async fn contains(&self, consumer_group: &str, event_id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT count(1) FROM event_inbox WHERE consumer_group = $1 AND event_id = $2",
        )
        .bind(consumer_group)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn register(&self, tx: &mut Transaction<'_, Postgres>, consumer_group: &str, event_id: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT INTO event_inbox (consumer_group, event_id, processed_at) VALUES ($1, $2, now())
             ON CONFLICT (consumer_group, event_id) DO NOTHING",
        )
        .bind(consumer_group)
        .bind(event_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

/// Test double that never remembers anything — every event looks new.
pub struct NoOpInbox;

#[async_trait]
impl Inbox for NoOpInbox {
    async fn contains(&self, _consumer_group: &str, _event_id: Uuid) -> Result<bool> {
        Ok(false)
    }

    async fn register(&self, _tx: &mut Transaction<'_, Postgres>, _consumer_group: &str, _event_id: Uuid) -> Result<()> {
        Ok(())
    }
}

/// Outcome of running a handler through [`process_once`].
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The event was new; `handler` ran and its transaction committed.
    Applied,
    /// `(consumer_group, event_id)` was already registered; `handler` did
    /// not run.
    Duplicate,
}

/// Run `handler` inside a single transaction that also checks and registers
/// the inbox entry, so "already processed" and "apply the effect" commit or
/// roll back together. `handler` receives the open transaction so its own
/// writes share it.
pub async fn process_once<F, Fut>(
    pool: &PgPool,
    inbox: &dyn Inbox,
    consumer_group: &str,
    event_id: Uuid,
    handler: F,
) -> Result<ProcessOutcome>
where
    F: FnOnce(&mut Transaction<'_, Postgres>) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    if inbox.contains(consumer_group, event_id).await? {
        return Ok(ProcessOutcome::Duplicate);
    }

    let mut tx = pool.begin().await?;
    handler(&mut tx).await?;
    inbox.register(&mut tx, consumer_group, event_id).await?;
    tx.commit().await?;

    Ok(ProcessOutcome::Applied)
}
