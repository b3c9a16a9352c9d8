//! Schema for the account/bill ledger plus this service's own outbox/inbox
//! tables (each service owns its own copies, spec §4.3/§4.4).

use rc_common::db::Migration;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "accounts and bills",
        sql: r#"
            CREATE SEQUENCE IF NOT EXISTS account_id_seq;
            CREATE SEQUENCE IF NOT EXISTS bill_id_seq;

            CREATE TABLE account (
                id BIGINT PRIMARY KEY DEFAULT nextval('account_id_seq'),
                user_id BIGINT NOT NULL UNIQUE,
                balance NUMERIC NOT NULL DEFAULT 0 CHECK (balance >= 0)
            );

            CREATE TABLE bill (
                id BIGINT PRIMARY KEY DEFAULT nextval('bill_id_seq'),
                account_id BIGINT NOT NULL REFERENCES account(id),
                order_id BIGINT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                total NUMERIC NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
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
