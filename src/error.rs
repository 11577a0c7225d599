use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, MarketError>;

/// Errors surfaced by the marketplace core.
///
/// Every variant maps to a distinct caller remedy: `Validation` and
/// `InsufficientFunds` need corrected input or external funding,
/// `Conflict`/`AlreadyAccepted` mean a race was lost and the caller should
/// refresh, `InvalidState`/`IrreversibleState` indicate a stale view of the
/// lifecycle, and `NoCapacity` is retryable after admin intervention.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("user {0} must complete KYC verification first")]
    KycRequired(Uuid),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("deal {0} has already been accepted by another customer")]
    AlreadyAccepted(Uuid),

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("no active admin contact number available")]
    NoCapacity,

    #[error("irreversible state: {0}")]
    IrreversibleState(String),

    #[error("remaining payment is pending for deal {0}")]
    PaymentPending(Uuid),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl MarketError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("serialization error: {err}"))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for MarketError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
