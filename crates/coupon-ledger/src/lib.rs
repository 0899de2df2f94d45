//! Coupon token and wallet ledger core for Kiosko.
//!
//! This crate provides the [`CouponService`] type which coordinates token
//! issuance, redemption, coupon awards, and policy management over the
//! `database` persistence layer. It is the in-process contract consumed by
//! the admin API and the messaging layer.
//!
//! # Architecture
//!
//! ```text
//! Admin API / messaging layer
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      COUPON SERVICE                         │
//! │                                                             │
//! │  award ──→ PolicyStore (daily cap) ──→ EventLog append      │
//! │  issue ──→ PolicyStore (TTL) ──→ TokenLedger.issue          │
//! │  redeem:                                                    │
//! │     1. EventLog append (redemption_attempt)                 │
//! │     2. TokenLedger.consume  ← single conditional UPDATE     │
//! │     3. PolicyStore + WalletLedger (threshold, tiers)        │
//! │     4. EventLog append (granted / blocked)                  │
//! └─────────────────────────────────────────────────────────────┘
//!          ↓
//! events table (append-only, source of truth)
//! wallets table (materialized in the same transaction)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use coupon_ledger::{CouponService, LedgerConfig};
//! use database::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:kiosko.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let service = CouponService::with_system_clock(db, LedgerConfig::from_env());
//!
//!     let issued = service.issue_token(Some("+5215512345678")).await?;
//!     println!("Share: {}", issued.deep_link.unwrap_or(issued.token.code));
//!
//!     let result = service.redeem(&issued.token.code, "+5215512345678").await?;
//!     println!("Granted: {}", result.granted);
//!     Ok(())
//! }
//! ```

mod clock;
mod code;
mod config;
mod deeplink;
mod error;
mod policy_store;
mod redemption;
mod service;
mod token_ledger;
mod wallet_ledger;

// Public exports
pub use clock::{format_timestamp, parse_timestamp, utc_day_bounds, Clock, FixedClock, SystemClock};
pub use code::{generate_code, CODE_ALPHABET, DEFAULT_CODE_LENGTH};
pub use config::{LedgerConfig, DEFAULT_MAX_CODE_ATTEMPTS};
pub use deeplink::wa_me_link;
pub use error::{CouponError, Result};
pub use policy_store::{Policy, PolicyStore};
pub use redemption::{select_reward, BlockReason, RedemptionResult, SelectedReward};
pub use service::{CouponService, IssuedToken};
pub use token_ledger::TokenLedger;
pub use wallet_ledger::{fold_events, WalletLedger};

// Re-export commonly used types from the persistence layer
pub use database::{
    Database, Event, EventKind, RewardTier, Settings, SettingsUpdate, TierUpdate, Token,
    TokenStatus, WalletEntry,
};
