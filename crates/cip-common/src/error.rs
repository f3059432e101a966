//! Error types for CIP

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias for CIP operations
pub type Result<T> = std::result::Result<T, CipError>;

/// Main error type for CIP
///
/// Variants mirror the failure taxonomy of the job-run core: early aborts
/// (`BalanceCheck`, `PaymentCreation`), the explicit `InsufficientFunds`
/// transition to an errored run, per-record `Persistence` failures that are
/// logged and skipped, and `Producer` failures that end the ingestion phase
/// without failing the run.
#[derive(Error, Debug)]
pub enum CipError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Balance check failed: {0}")]
    BalanceCheck(String),

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Decimal, required: Decimal },

    #[error("Payment creation failed: {0}")]
    PaymentCreation(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Producer failed: {0}")]
    Producer(String),

    #[error("Notification failed: {0}")]
    Notification(String),
}
