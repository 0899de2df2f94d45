//! Token state machine.
//!
//! States: issued -> used (redemption), issued -> expired (lazy, at read
//! time), issued/expired -> deleted (administrative). `used` and `deleted`
//! are terminal. There is no background sweep; every read path applies the
//! expiry transition before reporting status.

use std::sync::Arc;

use tracing::{debug, info, warn};

use database::{token, Database, DatabaseError, Token, TokenStatus};

use crate::clock::{format_timestamp, Clock};
use crate::code::generate_code;
use crate::error::{CouponError, Result};

/// Creates, looks up, consumes, and deletes single-use tokens.
#[derive(Clone)]
pub struct TokenLedger {
    db: Database,
    clock: Arc<dyn Clock>,
    code_length: usize,
    max_attempts: u32,
}

impl TokenLedger {
    /// Create a new token ledger.
    pub fn new(db: Database, clock: Arc<dyn Clock>, code_length: usize, max_attempts: u32) -> Self {
        Self { db, clock, code_length, max_attempts }
    }

    /// Issue a new token, optionally pre-bound to a phone.
    ///
    /// Codes are regenerated on unique-constraint violation, up to the
    /// configured retry bound; exhausting it fails with
    /// [`CouponError::GenerationExhausted`].
    pub async fn issue(&self, phone: Option<&str>, ttl_hours: i64) -> Result<Token> {
        let now = self.clock.now();
        let created_at = format_timestamp(now);
        let expires_at = format_timestamp(now + chrono::Duration::hours(ttl_hours));

        for attempt in 1..=self.max_attempts {
            let token = Token {
                code: generate_code(self.code_length),
                phone: phone.map(str::to_string),
                status: TokenStatus::Issued.as_str().to_string(),
                created_at: created_at.clone(),
                expires_at: expires_at.clone(),
                used_at: None,
            };

            match token::create_token(self.db.pool(), &token).await {
                Ok(()) => {
                    debug!("Issued token {} (expires {})", token.code, token.expires_at);
                    return Ok(token);
                }
                Err(DatabaseError::AlreadyExists { .. }) => {
                    warn!("Token code collision on attempt {}/{}", attempt, self.max_attempts);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CouponError::GenerationExhausted { attempts: self.max_attempts })
    }

    /// Consume a token: the issued -> used transition.
    ///
    /// Exactly-once: a single conditional UPDATE decides the winner, so under
    /// concurrent calls on the same code one caller gets the token and every
    /// other caller fails fast with the observed state.
    pub async fn consume(&self, code: &str) -> Result<Token> {
        let now = format_timestamp(self.clock.now());

        if token::mark_used_if_issued(self.db.pool(), code, &now).await? {
            return token::get_token(self.db.pool(), code)
                .await?
                .ok_or_else(|| CouponError::NotFound { entity: "Token", id: code.to_string() });
        }

        // Lost the conditional update. Apply the lazy expiry transition,
        // then classify from the stored state.
        token::mark_expired_if_due(self.db.pool(), code, &now).await?;

        let stored = token::get_token(self.db.pool(), code).await?;
        match stored.as_ref().and_then(Token::parsed_status) {
            Some(TokenStatus::Used) => {
                Err(CouponError::AlreadyRedeemed { code: code.to_string() })
            }
            Some(TokenStatus::Expired) => {
                Err(CouponError::TokenExpired { code: code.to_string() })
            }
            // A concurrent consumer won and was rolled back between our
            // update and this read; the presentation still lost.
            Some(TokenStatus::Issued) => {
                Err(CouponError::AlreadyRedeemed { code: code.to_string() })
            }
            // Deleted tokens are administratively gone.
            Some(TokenStatus::Deleted) | None => {
                Err(CouponError::NotFound { entity: "Token", id: code.to_string() })
            }
        }
    }

    /// Get a token by code, with lazily computed expiry applied.
    pub async fn get(&self, code: &str) -> Result<Token> {
        let now = format_timestamp(self.clock.now());
        token::mark_expired_if_due(self.db.pool(), code, &now).await?;

        token::get_token(self.db.pool(), code)
            .await?
            .ok_or_else(|| CouponError::NotFound { entity: "Token", id: code.to_string() })
    }

    /// List tokens newest-first, optionally filtered by status.
    ///
    /// Reflects lazily computed expiry at call time, not stale stored status.
    pub async fn list(&self, status: Option<TokenStatus>, limit: i64) -> Result<Vec<Token>> {
        let now = format_timestamp(self.clock.now());
        let swept = token::expire_due(self.db.pool(), &now).await?;
        if swept > 0 {
            debug!("Expired {} overdue token(s)", swept);
        }

        Ok(token::list_tokens(self.db.pool(), status.as_ref().map(TokenStatus::as_str), limit).await?)
    }

    /// Administratively delete a token.
    ///
    /// Used tokens are permanent audit artifacts and cannot be deleted.
    pub async fn delete(&self, code: &str) -> Result<()> {
        if token::mark_deleted(self.db.pool(), code).await? {
            info!("Deleted token {}", code);
            return Ok(());
        }

        match token::get_token(self.db.pool(), code).await? {
            Some(t) if t.parsed_status() == Some(TokenStatus::Used) => Err(CouponError::InvalidState(
                format!("used token {code} cannot be deleted"),
            )),
            _ => Err(CouponError::NotFound { entity: "Token", id: code.to_string() }),
        }
    }

    /// Revert a just-consumed token to issued.
    ///
    /// Only called when the redemption policy leaves ineligible tokens
    /// retryable (`burn_on_ineligible` off).
    pub(crate) async fn restore(&self, code: &str) -> Result<()> {
        if token::restore_issued(self.db.pool(), code).await? {
            info!("Restored token {} to issued", code);
        }
        Ok(())
    }
}
