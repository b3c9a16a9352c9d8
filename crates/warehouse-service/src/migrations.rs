//! Schema for the stock ledger plus this service's own outbox/inbox tables
//! (each service owns its own copies, spec §4.3/§4.4).

use rc_common::db::Migration;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "store items and processed orders",
        sql: r#"
            CREATE TABLE store_item (
                product_id BIGINT PRIMARY KEY,
                available_quantity BIGINT NOT NULL DEFAULT 0 CHECK (available_quantity >= 0)
            );

            CREATE TABLE processed_orders (
                order_id BIGINT PRIMARY KEY
            );
        "#,
    },
    Migration {
        version: 2,
        name: "event outbox",
        sql: r#"
            CREATE TABLE event_outbox (
                id UUID PRIMARY KEY,
                topic TEXT NOT NULL,
                key TEXT NOT NULL,
                payload JSONB NOT NULL,
                status TEXT NOT NULL DEFAULT 'new',
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );

            CREATE INDEX event_outbox_status_created_at_idx
                ON event_outbox (status, created_at);
        "#,
    },
    Migration {
        version: 3,
        name: "event inbox",
        sql: r#"
            CREATE TABLE event_inbox (
                consumer_group TEXT NOT NULL,
                event_id UUID NOT NULL,
                processed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (consumer_group, event_id)
            );
        "#,
    },
];
