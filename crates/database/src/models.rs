//! Database models.
//!
//! Timestamps are stored as RFC 3339 UTC strings with fixed-width fractional
//! seconds, so lexicographic comparison matches chronological order.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single-use redemption token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Token {
    /// Human-typeable redemption code (e.g., "K7DWMQ4R").
    pub code: String,
    /// E.164 phone number the token was pre-bound to, if any.
    pub phone: Option<String>,
    /// Lifecycle status: issued, used, expired, or deleted.
    pub status: String,
    /// Issue timestamp.
    pub created_at: String,
    /// Expiry timestamp (`created_at` + policy TTL).
    pub expires_at: String,
    /// Set exactly once, on the issued -> used transition.
    pub used_at: Option<String>,
}

/// Token lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// Live, redeemable until expiry.
    Issued,
    /// Redeemed. Terminal; used tokens are permanent audit artifacts.
    Used,
    /// Past expiry. May still be deleted, never redeemed.
    Expired,
    /// Administratively removed. Terminal.
    Deleted,
}

impl TokenStatus {
    /// Get the stored column value for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Issued => "issued",
            TokenStatus::Used => "used",
            TokenStatus::Expired => "expired",
            TokenStatus::Deleted => "deleted",
        }
    }

    /// Parse a stored column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "issued" => Some(TokenStatus::Issued),
            "used" => Some(TokenStatus::Used),
            "expired" => Some(TokenStatus::Expired),
            "deleted" => Some(TokenStatus::Deleted),
            _ => None,
        }
    }
}

impl Token {
    /// Parsed lifecycle status.
    pub fn parsed_status(&self) -> Option<TokenStatus> {
        TokenStatus::parse(&self.status)
    }
}

/// An immutable audit record of a wallet-affecting or attempted action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Event {
    /// Auto-incrementing ID; insertion sequence within a timestamp.
    pub id: i64,
    /// Phone number the event belongs to.
    pub phone: String,
    /// Event kind (see [`EventKind`]).
    pub event: String,
    /// Token code involved, if any.
    pub token: Option<String>,
    /// JSON payload snapshotting the decision inputs (threshold, tier,
    /// block reason). Captured at decision time so later policy changes do
    /// not reinterpret history.
    pub details: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Audit event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A coupon was earned.
    CouponAwarded,
    /// A token was presented for redemption.
    RedemptionAttempt,
    /// A redemption was granted; deducts the reward's coupon cost.
    RedemptionGranted,
    /// A redemption was refused (bad token or insufficient balance).
    RedemptionBlocked,
    /// A customer checked their balance.
    BalanceChecked,
    /// The customer opted out of marketing messages.
    OptOut,
}

impl EventKind {
    /// Get the stored column value for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CouponAwarded => "coupon_awarded",
            EventKind::RedemptionAttempt => "redemption_attempt",
            EventKind::RedemptionGranted => "redemption_granted",
            EventKind::RedemptionBlocked => "redemption_blocked",
            EventKind::BalanceChecked => "balance_checked",
            EventKind::OptOut => "opt_out",
        }
    }

    /// Parse a stored column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "coupon_awarded" => Some(EventKind::CouponAwarded),
            "redemption_attempt" => Some(EventKind::RedemptionAttempt),
            "redemption_granted" => Some(EventKind::RedemptionGranted),
            "redemption_blocked" => Some(EventKind::RedemptionBlocked),
            "balance_checked" => Some(EventKind::BalanceChecked),
            "opt_out" => Some(EventKind::OptOut),
            _ => None,
        }
    }
}

/// Per-phone balance aggregate, materialized alongside the event log.
///
/// Invariant: `coupon_count == total_earned - total_redeemed`, never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WalletEntry {
    /// E.164 phone number.
    pub phone: String,
    /// Current unredeemed balance.
    pub coupon_count: i64,
    /// Lifetime coupons earned.
    pub total_earned: i64,
    /// Lifetime coupons redeemed.
    pub total_redeemed: i64,
    /// Timestamp of the last recorded interaction.
    pub last_message_at: Option<String>,
    /// Marketing opt-in flag; flipped off by an `opt_out` event.
    pub opted_in_marketing: bool,
}

impl WalletEntry {
    /// Zero-valued entry for a phone with no history.
    pub fn empty(phone: &str) -> Self {
        Self {
            phone: phone.to_string(),
            coupon_count: 0,
            total_earned: 0,
            total_redeemed: 0,
            last_message_at: None,
            opted_in_marketing: true,
        }
    }
}

/// The singleton redemption policy row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Settings {
    /// Coupons required for the base reward.
    pub redemption_threshold: i64,
    /// Token TTL in hours.
    pub token_expiration_hours: i64,
    /// Per-phone daily earn cap.
    pub max_coupons_per_day: i64,
    /// Whether a presented-but-ineligible token stays consumed.
    pub burn_on_ineligible: bool,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A named reward unlocked at a coupon-count threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RewardTier {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Display name (e.g., "Free drink").
    pub name: String,
    /// Coupons consumed when this tier is granted.
    pub coupons_required: i64,
    /// Inactive tiers are ignored during redemption.
    pub is_active: bool,
    /// Display ordering for the admin UI.
    pub sort_order: i64,
    /// Creation timestamp.
    pub created_at: String,
}
