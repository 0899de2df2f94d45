//! Materialized wallet reads.
//!
//! Wallet rows are written exclusively by [`crate::event::record_event`];
//! this module only reads them.

use sqlx::SqlitePool;

use crate::models::WalletEntry;
use crate::Result;

/// Get the materialized wallet for a phone, or None if it has no history.
pub async fn get_wallet(pool: &SqlitePool, phone: &str) -> Result<Option<WalletEntry>> {
    let wallet = sqlx::query_as::<_, WalletEntry>(
        r#"
        SELECT phone, coupon_count, total_earned, total_redeemed,
               last_message_at, opted_in_marketing
        FROM wallets
        WHERE phone = ?
        "#,
    )
    .bind(phone)
    .fetch_optional(pool)
    .await?;

    Ok(wallet)
}
