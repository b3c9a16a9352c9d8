//! Environment-driven configuration, shared shape for every participant
//! service.
//!
//! Follows the teacher's `Config::from_env` pattern but reads only the
//! variables named in the external-interfaces contract: database
//! connection, broker location, service mode, and a per-service consumer
//! group / outbox poll interval.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub service_mode: ServiceMode,
    pub database: DatabaseConfig,
    pub broker: BrokerConfig,
    pub consumer_group: String,
    #[serde(default = "default_outbox_poll_ms")]
    pub outbox_poll_interval_ms: u64,
    #[serde(default = "default_outbox_batch_size")]
    pub outbox_batch_size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceMode {
    /// Run migrations and exit.
    Init,
    /// Normal run: serve the HTTP edge, start consumers and the outbox drain loop.
    Run,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
}

impl BrokerConfig {
    pub fn bootstrap_servers(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_pool_size() -> u32 {
    10
}

fn default_outbox_poll_ms() -> u64 {
    5_000
}

fn default_outbox_batch_size() -> i64 {
    50
}

impl Config {
    /// Load configuration from the environment variables named in the
    /// external-interfaces contract (`SERVICE_MODE`, `DB_*`,
    /// `KAFKA_BROKER_*`).
    pub fn from_env(consumer_group: impl Into<String>) -> crate::Result<Self> {
        use crate::Error;

        let service_mode = match std::env::var("SERVICE_MODE").unwrap_or_default().as_str() {
            "INIT" => ServiceMode::Init,
            _ => ServiceMode::Run,
        };

        let database = DatabaseConfig {
            host: env_or("DB_HOST", "localhost"),
            port: env_or("DB_PORT", "5432")
                .parse()
                .map_err(|_| Error::config("DB_PORT must be a valid port number"))?,
            user: env_or("DB_USER", "postgres"),
            password: std::env::var("DB_PASSWORD").unwrap_or_default(),
            name: env_or("DB_NAME", "rcommerce"),
            pool_size: default_pool_size(),
        };

        let broker = BrokerConfig {
            host: env_or("KAFKA_BROKER_HOST", "localhost"),
            port: env_or("KAFKA_BROKER_PORT", "9092")
                .parse()
                .map_err(|_| Error::config("KAFKA_BROKER_PORT must be a valid port number"))?,
        };

        Ok(Self {
            service_mode,
            database,
            broker,
            consumer_group: consumer_group.into(),
            outbox_poll_interval_ms: default_outbox_poll_ms(),
            outbox_batch_size: default_outbox_batch_size(),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_url_includes_all_parts() {
        let db = DatabaseConfig {
            host: "db".into(),
            port: 5432,
            user: "u".into(),
            password: "p".into(),
            name: "n".into(),
            pool_size: 10,
        };
        assert_eq!(db.connection_url(), "postgres://u:p@db:5432/n");
    }

    #[test]
    fn bootstrap_servers_formats_host_port() {
        let b = BrokerConfig { host: "kafka".into(), port: 9092 };
        assert_eq!(b.bootstrap_servers(), "kafka:9092");
    }
}
