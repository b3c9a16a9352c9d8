//! Schema for the order aggregate plus the shared outbox/inbox tables this
//! service owns its own copies of (each service has its own outbox/inbox,
//! spec §4.3/§4.4 — there is no cross-service shared table).

use rc_common::db::Migration;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "orders and order items",
        sql: r#"
            CREATE SEQUENCE IF NOT EXISTS orders_id_seq;

            CREATE TABLE orders (
                id BIGINT PRIMARY KEY,
                user_id BIGINT NOT NULL,
                status TEXT NOT NULL,
                total NUMERIC NOT NULL DEFAULT 0,
                warehouse_confirmed BOOLEAN NOT NULL DEFAULT false,
                delivery_confirmed BOOLEAN NOT NULL DEFAULT false,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );

            CREATE TABLE order_items (
                order_id BIGINT NOT NULL REFERENCES orders(id),
                product_id BIGINT NOT NULL,
                quantity BIGINT NOT NULL,
                unit_price NUMERIC NOT NULL,
                line_total NUMERIC NOT NULL,
                PRIMARY KEY (order_id, product_id)
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
