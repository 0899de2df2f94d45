//! Input validation for policy settings and reward tiers.

use std::fmt;

use crate::settings::SettingsUpdate;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Numeric setting outside its allowed range.
    OutOfRange { field: &'static str, min: i64, max: i64, actual: i64 },
    /// Value too long.
    TooLong { field: &'static str, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::OutOfRange { field, min, max, actual } => {
                write!(f, "{} must be between {} and {} (got {})", field, min, max, actual)
            }
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Allowed range for the base redemption threshold.
pub const THRESHOLD_RANGE: (i64, i64) = (1, 100);

/// Allowed range for the token TTL in hours (one hour to one week).
pub const EXPIRATION_HOURS_RANGE: (i64, i64) = (1, 168);

/// Allowed range for the per-phone daily earn cap.
pub const DAILY_CAP_RANGE: (i64, i64) = (1, 50);

/// Maximum allowed length for tier names.
pub const MAX_TIER_NAME_LENGTH: usize = 100;

fn check_range(field: &'static str, range: (i64, i64), actual: i64) -> Result<(), ValidationError> {
    let (min, max) = range;
    if actual < min || actual > max {
        return Err(ValidationError::OutOfRange { field, min, max, actual });
    }
    Ok(())
}

/// Validate a partial settings update.
///
/// Unset fields are skipped; they keep their already-valid stored value.
pub fn validate_settings_update(update: &SettingsUpdate) -> Result<(), ValidationError> {
    if let Some(threshold) = update.redemption_threshold {
        check_range("redemption threshold", THRESHOLD_RANGE, threshold)?;
    }
    if let Some(hours) = update.token_expiration_hours {
        check_range("token expiration hours", EXPIRATION_HOURS_RANGE, hours)?;
    }
    if let Some(cap) = update.max_coupons_per_day {
        check_range("max coupons per day", DAILY_CAP_RANGE, cap)?;
    }
    Ok(())
}

/// Validate a tier name.
pub fn validate_tier_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Empty("tier name"));
    }

    if name.len() > MAX_TIER_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "tier name",
            max: MAX_TIER_NAME_LENGTH,
            actual: name.len(),
        });
    }

    Ok(())
}

/// Validate a tier's coupon cost.
pub fn validate_tier_cost(coupons_required: i64) -> Result<(), ValidationError> {
    if coupons_required < 1 {
        return Err(ValidationError::OutOfRange {
            field: "coupons required",
            min: 1,
            max: i64::MAX,
            actual: coupons_required,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_settings_in_range() {
        let update = SettingsUpdate {
            redemption_threshold: Some(4),
            token_expiration_hours: Some(24),
            max_coupons_per_day: Some(5),
            burn_on_ineligible: Some(true),
        };
        assert!(validate_settings_update(&update).is_ok());

        // Unset fields are not checked.
        assert!(validate_settings_update(&SettingsUpdate::default()).is_ok());
    }

    #[test]
    fn test_validate_settings_out_of_range() {
        let update = SettingsUpdate {
            redemption_threshold: Some(0),
            ..SettingsUpdate::default()
        };
        assert!(matches!(
            validate_settings_update(&update),
            Err(ValidationError::OutOfRange { field: "redemption threshold", .. })
        ));

        let update = SettingsUpdate {
            token_expiration_hours: Some(169),
            ..SettingsUpdate::default()
        };
        assert!(matches!(
            validate_settings_update(&update),
            Err(ValidationError::OutOfRange { field: "token expiration hours", .. })
        ));

        let update = SettingsUpdate {
            max_coupons_per_day: Some(51),
            ..SettingsUpdate::default()
        };
        assert!(matches!(
            validate_settings_update(&update),
            Err(ValidationError::OutOfRange { field: "max coupons per day", .. })
        ));
    }

    #[test]
    fn test_validate_tier_name() {
        assert!(validate_tier_name("Free drink").is_ok());
        assert!(matches!(validate_tier_name("   "), Err(ValidationError::Empty(_))));
        assert!(matches!(
            validate_tier_name(&"x".repeat(101)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_tier_cost() {
        assert!(validate_tier_cost(1).is_ok());
        assert!(matches!(validate_tier_cost(0), Err(ValidationError::OutOfRange { .. })));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::OutOfRange {
            field: "max coupons per day",
            min: 1,
            max: 50,
            actual: 51,
        };
        assert_eq!(err.to_string(), "max coupons per day must be between 1 and 50 (got 51)");
    }
}
