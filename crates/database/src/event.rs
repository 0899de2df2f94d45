//! Append-only event log persistence.
//!
//! Appending is the only mutation; events are never updated or deleted. Each
//! append also applies the wallet delta to the materialized `wallets` row in
//! the same transaction, so a caller that just wrote always reads its own
//! write.

use sqlx::SqlitePool;

use crate::models::Event;
use crate::Result;

/// A new event to append.
#[derive(Debug, Clone)]
pub struct NewEvent<'a> {
    /// Phone number the event belongs to.
    pub phone: &'a str,
    /// Event kind column value.
    pub event: &'a str,
    /// Token code involved, if any.
    pub token: Option<&'a str>,
    /// JSON decision snapshot.
    pub details: &'a str,
    /// Creation timestamp.
    pub created_at: &'a str,
}

/// Balance effect of an event on the materialized wallet row.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalletDelta {
    /// Coupons earned by this event.
    pub earned: i64,
    /// Coupons redeemed by this event.
    pub redeemed: i64,
    /// Whether this event opts the phone out of marketing.
    pub opted_out: bool,
}

impl WalletDelta {
    /// No balance effect (informational events).
    pub fn none() -> Self {
        Self::default()
    }

    /// Earn `n` coupons.
    pub fn earn(n: i64) -> Self {
        Self { earned: n, ..Self::default() }
    }

    /// Redeem `n` coupons.
    pub fn redeem(n: i64) -> Self {
        Self { redeemed: n, ..Self::default() }
    }

    /// Flip the marketing opt-in off.
    pub fn opt_out() -> Self {
        Self { opted_out: true, ..Self::default() }
    }
}

/// Append an event and apply its wallet delta in one transaction.
///
/// The wallet row materializes on the first event for a phone and is never
/// deleted afterwards.
pub async fn record_event(
    pool: &SqlitePool,
    new: &NewEvent<'_>,
    delta: &WalletDelta,
) -> Result<Event> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO events (phone, event, token, details, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.phone)
    .bind(new.event)
    .bind(new.token)
    .bind(new.details)
    .bind(new.created_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO wallets (phone, coupon_count, total_earned, total_redeemed,
                             last_message_at, opted_in_marketing)
        VALUES (?1, ?2 - ?3, ?2, ?3, ?4, CASE WHEN ?5 THEN 0 ELSE 1 END)
        ON CONFLICT(phone) DO UPDATE SET
            coupon_count = coupon_count + ?2 - ?3,
            total_earned = total_earned + ?2,
            total_redeemed = total_redeemed + ?3,
            last_message_at = excluded.last_message_at,
            opted_in_marketing = CASE WHEN ?5 THEN 0 ELSE opted_in_marketing END
        "#,
    )
    .bind(new.phone)
    .bind(delta.earned)
    .bind(delta.redeemed)
    .bind(new.created_at)
    .bind(delta.opted_out)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Event {
        id: inserted.last_insert_rowid(),
        phone: new.phone.to_string(),
        event: new.event.to_string(),
        token: new.token.map(str::to_string),
        details: new.details.to_string(),
        created_at: new.created_at.to_string(),
    })
}

/// List events for a phone, optionally filtered by kind.
///
/// Events for a phone are totally ordered by `(created_at, id)`. Pass a
/// negative limit for no limit.
pub async fn list_events(
    pool: &SqlitePool,
    phone: &str,
    kind: Option<&str>,
    newest_first: bool,
    limit: i64,
) -> Result<Vec<Event>> {
    // SQLite cannot bind the sort direction, so it is interpolated from a
    // bool; everything user-supplied stays bound.
    let order = if newest_first { "DESC" } else { "ASC" };
    let query = format!(
        r#"
        SELECT id, phone, event, token, details, created_at
        FROM events
        WHERE phone = ?1 AND (?2 IS NULL OR event = ?2)
        ORDER BY created_at {order}, id {order}
        LIMIT ?3
        "#,
    );

    let events = sqlx::query_as::<_, Event>(&query)
        .bind(phone)
        .bind(kind)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(events)
}

/// Count `coupon_awarded` events for a phone within `[start, end)`.
pub async fn count_awards_between(
    pool: &SqlitePool,
    phone: &str,
    start: &str,
    end: &str,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM events
        WHERE phone = ? AND event = 'coupon_awarded'
          AND created_at >= ? AND created_at < ?
        "#,
    )
    .bind(phone)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
