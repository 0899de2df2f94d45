//! Singleton policy settings storage.

use sqlx::SqlitePool;

use crate::models::Settings;
use crate::Result;

/// A partial settings update. None fields are left unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsUpdate {
    /// Coupons required for the base reward.
    pub redemption_threshold: Option<i64>,
    /// Token TTL in hours.
    pub token_expiration_hours: Option<i64>,
    /// Per-phone daily earn cap.
    pub max_coupons_per_day: Option<i64>,
    /// Whether ineligible redemptions consume the token.
    pub burn_on_ineligible: Option<bool>,
}

/// Get the current settings.
///
/// The row is seeded by the initial migration and always present.
pub async fn get_settings(pool: &SqlitePool) -> Result<Settings> {
    let settings = sqlx::query_as::<_, Settings>(
        r#"
        SELECT redemption_threshold, token_expiration_hours, max_coupons_per_day,
               burn_on_ineligible, updated_at
        FROM settings
        WHERE id = 1
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(settings)
}

/// Apply a partial settings update atomically and return the new settings.
///
/// A single UPDATE statement, so concurrent readers never observe a torn
/// policy.
pub async fn update_settings(
    pool: &SqlitePool,
    update: &SettingsUpdate,
    now: &str,
) -> Result<Settings> {
    sqlx::query(
        r#"
        UPDATE settings
        SET redemption_threshold = COALESCE(?, redemption_threshold),
            token_expiration_hours = COALESCE(?, token_expiration_hours),
            max_coupons_per_day = COALESCE(?, max_coupons_per_day),
            burn_on_ineligible = COALESCE(?, burn_on_ineligible),
            updated_at = ?
        WHERE id = 1
        "#,
    )
    .bind(update.redemption_threshold)
    .bind(update.token_expiration_hours)
    .bind(update.max_coupons_per_day)
    .bind(update.burn_on_ineligible)
    .bind(now)
    .execute(pool)
    .await?;

    get_settings(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_defaults_seeded() {
        let db = test_db().await;
        let settings = get_settings(db.pool()).await.unwrap();
        assert_eq!(settings.redemption_threshold, 4);
        assert_eq!(settings.token_expiration_hours, 24);
        assert_eq!(settings.max_coupons_per_day, 5);
        assert!(settings.burn_on_ineligible);
    }

    #[tokio::test]
    async fn test_partial_update_leaves_other_fields() {
        let db = test_db().await;

        let update = SettingsUpdate {
            max_coupons_per_day: Some(2),
            ..SettingsUpdate::default()
        };
        let settings = update_settings(db.pool(), &update, "2026-01-01T00:00:00.000000Z")
            .await
            .unwrap();

        assert_eq!(settings.max_coupons_per_day, 2);
        assert_eq!(settings.redemption_threshold, 4);
        assert_eq!(settings.token_expiration_hours, 24);
        assert_eq!(settings.updated_at, "2026-01-01T00:00:00.000000Z");
    }

    #[tokio::test]
    async fn test_flag_update() {
        let db = test_db().await;

        let update = SettingsUpdate {
            burn_on_ineligible: Some(false),
            ..SettingsUpdate::default()
        };
        let settings = update_settings(db.pool(), &update, "2026-01-01T00:00:00.000000Z")
            .await
            .unwrap();
        assert!(!settings.burn_on_ineligible);
    }
}
