//! Error types for ledger operations.
//!
//! Business-rule violations that reflect a customer-facing redemption attempt
//! (bad token, insufficient balance) are returned as
//! [`crate::RedemptionResult`] values, not errors; the variants here cover
//! ledger-level failures callers branch on, plus opaque storage failures.

use database::{DatabaseError, ValidationError};
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum CouponError {
    /// Policy or tier input failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown token or tier.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The token was already redeemed.
    #[error("token already redeemed: {code}")]
    AlreadyRedeemed { code: String },

    /// The token expired before it was presented.
    #[error("token expired: {code}")]
    TokenExpired { code: String },

    /// The requested transition is not legal from the token's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The per-phone daily earn cap was reached.
    #[error("daily coupon cap reached for {phone} ({cap} per day)")]
    DailyCapExceeded { phone: String, cap: i64 },

    /// Token code generation kept colliding; fatal, not user-facing.
    #[error("token code generation exhausted after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    /// Storage failure, passed through opaquely.
    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for CouponError {
    fn from(e: DatabaseError) -> Self {
        // Missing rows are a business outcome, not a storage failure.
        match e {
            DatabaseError::NotFound { entity, id } => CouponError::NotFound { entity, id },
            other => CouponError::Database(other),
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, CouponError>;
