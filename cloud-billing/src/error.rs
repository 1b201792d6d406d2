//! Error taxonomy for catalog, account, consumption and billing operations.

use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingError {
    /// A field is malformed or missing.
    #[error("Validation error: {0}")]
    ValidationError(anyhow::Error),

    /// A foreign key does not resolve to an existing record.
    #[error("Reference error: {0}")]
    ReferenceError(anyhow::Error),

    /// A create was issued for a key that already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    /// The persisted document exists but cannot be parsed.
    #[error("Store corrupt: {0}")]
    StoreCorrupt(anyhow::Error),

    /// The persistence medium cannot be read or written.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(anyhow::Error),

    #[error("Invalid billing range: start {start} is after end {end}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

impl BillingError {
    /// Stable label used for the error metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            BillingError::ValidationError(_) => "validation",
            BillingError::ReferenceError(_) => "reference",
            BillingError::DuplicateKey(_) => "duplicate_key",
            BillingError::NotFound(_) => "not_found",
            BillingError::StoreCorrupt(_) => "store_corrupt",
            BillingError::StoreUnavailable(_) => "store_unavailable",
            BillingError::InvalidRange { .. } => "invalid_range",
        }
    }
}

impl From<validator::ValidationErrors> for BillingError {
    fn from(err: validator::ValidationErrors) -> Self {
        BillingError::ValidationError(anyhow::Error::new(err))
    }
}
