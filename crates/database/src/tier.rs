//! Reward tier CRUD operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::RewardTier;

/// A partial tier update. None fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TierUpdate {
    /// Display name.
    pub name: Option<String>,
    /// Coupons consumed when granted.
    pub coupons_required: Option<i64>,
    /// Whether the tier participates in redemption.
    pub is_active: Option<bool>,
    /// Display ordering.
    pub sort_order: Option<i64>,
}

/// Create a new reward tier and return it.
pub async fn create_tier(
    pool: &SqlitePool,
    name: &str,
    coupons_required: i64,
    sort_order: i64,
    now: &str,
) -> Result<RewardTier> {
    let result = sqlx::query(
        r#"
        INSERT INTO reward_tiers (name, coupons_required, sort_order, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(coupons_required)
    .bind(sort_order)
    .bind(now)
    .execute(pool)
    .await?;

    get_tier(pool, result.last_insert_rowid()).await
}

/// Get a tier by ID.
pub async fn get_tier(pool: &SqlitePool, id: i64) -> Result<RewardTier> {
    sqlx::query_as::<_, RewardTier>(
        r#"
        SELECT id, name, coupons_required, is_active, sort_order, created_at
        FROM reward_tiers
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "RewardTier",
        id: id.to_string(),
    })
}

/// Apply a partial update to a tier and return it.
pub async fn update_tier(pool: &SqlitePool, id: i64, update: &TierUpdate) -> Result<RewardTier> {
    let result = sqlx::query(
        r#"
        UPDATE reward_tiers
        SET name = COALESCE(?, name),
            coupons_required = COALESCE(?, coupons_required),
            is_active = COALESCE(?, is_active),
            sort_order = COALESCE(?, sort_order)
        WHERE id = ?
        "#,
    )
    .bind(&update.name)
    .bind(update.coupons_required)
    .bind(update.is_active)
    .bind(update.sort_order)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "RewardTier",
            id: id.to_string(),
        });
    }

    get_tier(pool, id).await
}

/// Delete a tier by ID.
///
/// Historical events keep their own snapshot of the tier applied at decision
/// time, so deletion never rewrites history.
pub async fn delete_tier(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM reward_tiers
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "RewardTier",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// List tiers in display order, optionally only active ones.
pub async fn list_tiers(pool: &SqlitePool, active_only: bool) -> Result<Vec<RewardTier>> {
    let tiers = sqlx::query_as::<_, RewardTier>(
        r#"
        SELECT id, name, coupons_required, is_active, sort_order, created_at
        FROM reward_tiers
        WHERE (?1 = 0 OR is_active = 1)
        ORDER BY sort_order, coupons_required
        "#,
    )
    .bind(active_only)
    .fetch_all(pool)
    .await?;

    Ok(tiers)
}
