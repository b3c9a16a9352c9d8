//! Transactional outbox (spec §4.3), ported from `src/toolbox/outbox.go`.
//!
//! `submit` stages an event inside the caller's own transaction so the
//! business write and the event's durability commit atomically. `drain`
//! runs on an interval and is the only thing that ever talks to the broker
//! for outbound events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::event_bus::EventBus;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum OutboxStatus {
    New,
    Sent,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub topic: String,
    pub key: String,
    pub payload: serde_json::Value,
    pub status: OutboxStatus,
    pub created_at: DateTime<Utc>,
}

/// Stage `payload` for publication to `topic`, partitioned by `key`, inside
/// `tx`. `ON CONFLICT (id) DO NOTHING` makes this safe to call twice with
/// the same event id — e.g. when a handler is retried after a crash between
/// the insert and the caller's own commit.
pub async fn submit(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    topic: &str,
    key: &str,
    payload: serde_json::Value,
) -> Result<Uuid> {
    sqlx::query(
        r#"
        INSERT INTO event_outbox (id, topic, key, payload, status, created_at)
        VALUES ($1, $2, $3, $4, 'new', now())
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(topic)
    .bind(key)
    .bind(&payload)
    .execute(&mut **tx)
    .await?;

    Ok(id)
}

/// Publish up to `batch_size` unsent records, oldest first. A single
/// publish failure stops the batch at that row (rather than skipping it)
/// so ordering per aggregate is preserved on retry; already-sent rows in
/// the same batch stay sent.
pub async fn drain(pool: &PgPool, bus: &dyn EventBus, batch_size: i64) -> Result<usize> {
    let rows: Vec<OutboxRecord> = sqlx::query_as(
        r#"
        SELECT id, topic, key, payload, status, created_at
        FROM event_outbox
        WHERE status = 'new'
        ORDER BY created_at ASC
        LIMIT $1
        "#,
    )
    .bind(batch_size)
    .fetch_all(pool)
    .await?;

    let mut sent = 0;
    for row in rows {
        if let Err(e) = bus.publish(&row.topic, &row.key, row.payload.clone()).await {
            tracing::warn!(event_id = %row.id, error = %e, "outbox publish failed, stopping batch here");
            break;
        }

        sqlx::query("UPDATE event_outbox SET status = 'sent' WHERE id = $1")
            .bind(row.id)
            .execute(pool)
            .await?;
        sent += 1;
    }

    Ok(sent)
}

/// Run `drain` on a fixed interval until `shutdown` resolves. Broker
/// failures are logged and retried on the next tick rather than killing
/// the task (spec's `Transient` failure model).
pub async fn run(
    pool: PgPool,
    bus: std::sync::Arc<dyn EventBus>,
    poll_interval: std::time::Duration,
    batch_size: i64,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match drain(&pool, bus.as_ref(), batch_size).await {
                    Ok(n) if n > 0 => tracing::debug!(sent = n, "outbox drained"),
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "outbox drain failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!("outbox drain loop shutting down");
                    return;
                }
            }
        }
    }
}
