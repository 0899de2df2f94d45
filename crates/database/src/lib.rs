//! SQLite persistence layer for Kiosko.
//!
//! This crate provides async storage operations for redemption tokens, the
//! append-only event log, materialized wallets, and redemption policy using
//! SQLx with SQLite.
//!
//! Timestamps are supplied by the caller as fixed-width RFC 3339 UTC strings
//! rather than `datetime('now')`, so the domain layer's injectable clock
//! governs every time comparison.
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, event::{self, NewEvent, WalletDelta}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:kiosko.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Record a coupon award
//!     let new = NewEvent {
//!         phone: "+5215512345678",
//!         event: "coupon_awarded",
//!         token: None,
//!         details: "{}",
//!         created_at: "2026-01-01T10:00:00.000000Z",
//!     };
//!     event::record_event(db.pool(), &new, &WalletDelta::earn(1)).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod event;
pub mod models;
pub mod settings;
pub mod tier;
pub mod token;
pub mod validation;
pub mod wallet;

pub use error::{DatabaseError, Result};
pub use event::{NewEvent, WalletDelta};
pub use models::{Event, EventKind, RewardTier, Settings, Token, TokenStatus, WalletEntry};
pub use settings::SettingsUpdate;
pub use tier::TierUpdate;
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// Set high enough to handle concurrent redemption and award traffic.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/kiosko.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Token;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let db = test_db().await;

        // Issue
        let new = Token {
            code: "K7DWMQ4R".to_string(),
            phone: Some("+5215512345678".to_string()),
            status: "issued".to_string(),
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
            expires_at: "2026-01-02T00:00:00.000000Z".to_string(),
            used_at: None,
        };
        token::create_token(db.pool(), &new).await.unwrap();

        // Read
        let fetched = token::get_token(db.pool(), "K7DWMQ4R").await.unwrap().unwrap();
        assert_eq!(fetched.status, "issued");
        assert_eq!(fetched.phone.as_deref(), Some("+5215512345678"));

        // Redeem
        let won = token::mark_used_if_issued(db.pool(), "K7DWMQ4R", "2026-01-01T12:00:00.000000Z")
            .await
            .unwrap();
        assert!(won);

        // List
        let used = token::list_tokens(db.pool(), Some("used"), 10).await.unwrap();
        assert_eq!(used.len(), 1);

        // Used tokens cannot be deleted
        let deleted = token::mark_deleted(db.pool(), "K7DWMQ4R").await.unwrap();
        assert!(!deleted);
    }
}
