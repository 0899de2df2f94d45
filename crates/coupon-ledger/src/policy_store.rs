//! Redemption policy management.
//!
//! The policy is a singleton (settings row + reward tiers), read on every
//! evaluation. Updates validate first and write with a single statement, so
//! readers never observe a partial policy; decisions already computed are
//! not retroactively altered.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use database::{settings, tier, validation, Database, RewardTier, Settings, SettingsUpdate, TierUpdate};

use crate::clock::{format_timestamp, Clock};
use crate::error::Result;

/// The full redemption policy: settings plus the ordered reward tiers.
#[derive(Debug, Clone, Serialize)]
pub struct Policy {
    /// Thresholds, TTL, daily cap, and the burn flag.
    pub settings: Settings,
    /// All reward tiers, in display order. Inactive tiers are retained for
    /// the admin surface but ignored during redemption.
    pub tiers: Vec<RewardTier>,
}

/// Holds the current redemption policy and supports atomic updates.
#[derive(Clone)]
pub struct PolicyStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl PolicyStore {
    /// Create a new policy store.
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Get the current settings without the tier list.
    pub async fn settings(&self) -> Result<Settings> {
        Ok(settings::get_settings(self.db.pool()).await?)
    }

    /// Get the full policy.
    pub async fn get(&self) -> Result<Policy> {
        let settings = settings::get_settings(self.db.pool()).await?;
        let tiers = tier::list_tiers(self.db.pool(), false).await?;
        Ok(Policy { settings, tiers })
    }

    /// Apply a partial settings update and return the new settings.
    ///
    /// Out-of-range values fail validation before anything is written. The
    /// new policy takes effect on the next evaluation.
    pub async fn update_settings(&self, update: &SettingsUpdate) -> Result<Settings> {
        validation::validate_settings_update(update)?;

        let now = format_timestamp(self.clock.now());
        let updated = settings::update_settings(self.db.pool(), update, &now).await?;
        info!(
            "Policy settings updated: threshold={} ttl={}h cap={}/day burn_on_ineligible={}",
            updated.redemption_threshold,
            updated.token_expiration_hours,
            updated.max_coupons_per_day,
            updated.burn_on_ineligible,
        );
        Ok(updated)
    }

    /// Create a reward tier.
    pub async fn create_tier(
        &self,
        name: &str,
        coupons_required: i64,
        sort_order: i64,
    ) -> Result<RewardTier> {
        validation::validate_tier_name(name)?;
        validation::validate_tier_cost(coupons_required)?;

        let now = format_timestamp(self.clock.now());
        let created =
            tier::create_tier(self.db.pool(), name.trim(), coupons_required, sort_order, &now)
                .await?;
        info!("Created reward tier '{}' at {} coupons", created.name, created.coupons_required);
        Ok(created)
    }

    /// Apply a partial update to a reward tier.
    pub async fn update_tier(&self, id: i64, update: &TierUpdate) -> Result<RewardTier> {
        if let Some(name) = update.name.as_deref() {
            validation::validate_tier_name(name)?;
        }
        if let Some(cost) = update.coupons_required {
            validation::validate_tier_cost(cost)?;
        }

        Ok(tier::update_tier(self.db.pool(), id, update).await?)
    }

    /// Delete a reward tier.
    ///
    /// Historical events carry their own snapshot of the tier applied, so
    /// deletion does not rewrite history.
    pub async fn delete_tier(&self, id: i64) -> Result<()> {
        tier::delete_tier(self.db.pool(), id).await?;
        info!("Deleted reward tier {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{parse_timestamp, FixedClock};
    use crate::error::CouponError;

    async fn store() -> PolicyStore {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let clock = Arc::new(FixedClock::at(parse_timestamp("2026-01-01T00:00:00Z").unwrap()));
        PolicyStore::new(db, clock)
    }

    #[tokio::test]
    async fn test_defaults() {
        let store = store().await;
        let policy = store.get().await.unwrap();
        assert_eq!(policy.settings.redemption_threshold, 4);
        assert!(policy.tiers.is_empty());
    }

    #[tokio::test]
    async fn test_update_rejects_out_of_range() {
        let store = store().await;

        let update = SettingsUpdate {
            max_coupons_per_day: Some(0),
            ..SettingsUpdate::default()
        };
        let result = store.update_settings(&update).await;
        assert!(matches!(result, Err(CouponError::Validation(_))));

        // Nothing was written.
        let settings = store.settings().await.unwrap();
        assert_eq!(settings.max_coupons_per_day, 5);
    }

    #[tokio::test]
    async fn test_tier_validation() {
        let store = store().await;

        let result = store.create_tier("", 4, 0).await;
        assert!(matches!(result, Err(CouponError::Validation(_))));

        let result = store.create_tier("Free drink", 0, 0).await;
        assert!(matches!(result, Err(CouponError::Validation(_))));

        let tier = store.create_tier("  Free drink  ", 4, 0).await.unwrap();
        assert_eq!(tier.name, "Free drink");

        let result = store
            .update_tier(tier.id, &TierUpdate { coupons_required: Some(-1), ..TierUpdate::default() })
            .await;
        assert!(matches!(result, Err(CouponError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_tier() {
        let store = store().await;
        let result = store.delete_tier(42).await;
        assert!(matches!(result, Err(CouponError::NotFound { .. })));
    }
}
