use std::fmt;

/// Error kinds shared by every participant service.
///
/// This is the concrete shape of the five semantic error kinds the saga
/// relies on: `NotFound` and `Validation`/`InvalidState` surface to HTTP and
/// decide event-handler acknowledgement, `Transient` tells the outbox drain
/// loop and consumer loop to retry without advancing, `Fatal` halts a
/// consumer rather than spinning on a poison message.
#[derive(Debug)]
pub enum Error {
    /// Aggregate or row does not exist.
    NotFound(String),

    /// Command disallowed by the state machine, or a business invariant
    /// (insufficient funds, insufficient stock, no free courier) failed.
    InvalidState(String),

    /// Malformed input / payload that didn't even reach the state machine.
    Validation(String),

    /// Broker unreachable, DB connection dropped, deadlock — safe to retry.
    Transient(String),

    /// Programming error or schema mismatch; the consumer should halt.
    Fatal(String),

    /// Database errors (SQLx wrapped).
    Database(sqlx::Error),

    /// Event bus / broker errors.
    Broker(String),

    /// Envelope encode/decode errors.
    Serialization(serde_json::Error),

    /// Configuration errors.
    Config(String),

    /// Generic errors with description.
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(msg) => write!(f, "not found: {}", msg),
            Error::InvalidState(msg) => write!(f, "invalid state: {}", msg),
            Error::Validation(msg) => write!(f, "validation error: {}", msg),
            Error::Transient(msg) => write!(f, "transient error: {}", msg),
            Error::Fatal(msg) => write!(f, "fatal error: {}", msg),
            Error::Database(e) => write!(f, "database error: {}", e),
            Error::Broker(msg) => write!(f, "broker error: {}", msg),
            Error::Serialization(e) => write!(f, "serialization error: {}", e),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Other(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(e) => Some(e),
            Error::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => Error::Transient(error.to_string()),
            _ => Error::Database(error),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Serialization(error)
    }
}

impl From<rdkafka::error::KafkaError> for Error {
    fn from(error: rdkafka::error::KafkaError) -> Self {
        Error::Transient(format!("kafka error: {}", error))
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::Config(error.to_string())
    }
}

impl Error {
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn invalid_state<T: Into<String>>(msg: T) -> Self {
        Error::InvalidState(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Error::Validation(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Error::Config(msg.into())
    }

    /// HTTP status code for the thin command edge.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::InvalidState(_) => 409,
            Error::Validation(_) => 400,
            Error::Transient(_) => 503,
            Error::Fatal(_) => 500,
            Error::Database(_) => 500,
            Error::Broker(_) => 503,
            Error::Serialization(_) => 500,
            Error::Config(_) => 500,
            Error::Other(_) => 500,
        }
    }

    /// Error category for structured logging/monitoring.
    pub fn category(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::InvalidState(_) => "invalid_state",
            Error::Validation(_) => "validation",
            Error::Transient(_) => "transient",
            Error::Fatal(_) => "fatal",
            Error::Database(_) => "database",
            Error::Broker(_) => "broker",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::Other(_) => "other",
        }
    }

    /// Whether a consumer should retry (not commit offset / not write inbox)
    /// rather than acknowledge and move on.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Broker(_) | Error::Database(_))
    }
}
