//! Redemption outcomes and reward selection.

use serde::Serialize;

use database::RewardTier;

/// Why a redemption attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// The code was never issued, or was administratively deleted.
    TokenNotFound,
    /// The token was already consumed by an earlier presentation.
    AlreadyRedeemed,
    /// The token expired before it was presented.
    TokenExpired,
    /// The token was valid but the wallet balance is below the base
    /// threshold.
    InsufficientBalance,
}

impl BlockReason {
    /// Stable identifier recorded in event details.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::TokenNotFound => "token_not_found",
            BlockReason::AlreadyRedeemed => "already_redeemed",
            BlockReason::TokenExpired => "token_expired",
            BlockReason::InsufficientBalance => "insufficient_balance",
        }
    }

    /// Human-readable reason shown to the operator.
    pub fn message(&self) -> &'static str {
        match self {
            BlockReason::TokenNotFound => "This code is not valid.",
            BlockReason::AlreadyRedeemed => "This code was already used.",
            BlockReason::TokenExpired => "This code has expired.",
            BlockReason::InsufficientBalance => "Not enough coupons yet.",
        }
    }
}

/// The reward selected for a granted redemption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SelectedReward {
    /// The base reward at the policy's redemption threshold.
    Base {
        /// Coupons consumed.
        coupons_required: i64,
    },
    /// A named reward tier.
    Tier(RewardTier),
}

impl SelectedReward {
    /// Coupons this reward deducts from the wallet.
    pub fn coupons_required(&self) -> i64 {
        match self {
            SelectedReward::Base { coupons_required } => *coupons_required,
            SelectedReward::Tier(tier) => tier.coupons_required,
        }
    }

    /// Display name of the reward.
    pub fn name(&self) -> &str {
        match self {
            SelectedReward::Base { .. } => "Base reward",
            SelectedReward::Tier(tier) => &tier.name,
        }
    }
}

/// Outcome of a redemption attempt. Business refusals are values here, never
/// errors; callers branch on `granted`/`reason`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedemptionResult {
    /// Whether the redemption was granted.
    pub granted: bool,
    /// The reward granted, when `granted` is true.
    pub reward: Option<SelectedReward>,
    /// The refusal reason, when `granted` is false.
    pub reason: Option<BlockReason>,
}

impl RedemptionResult {
    /// A granted redemption.
    pub fn granted(reward: SelectedReward) -> Self {
        Self { granted: true, reward: Some(reward), reason: None }
    }

    /// A refused redemption.
    pub fn blocked(reason: BlockReason) -> Self {
        Self { granted: false, reward: None, reason: Some(reason) }
    }
}

/// Select the reward for a balance, or None if the balance is below the base
/// threshold.
///
/// The highest satisfied reward wins: among active tiers with
/// `coupons_required <= balance`, the most expensive one; a named tier beats
/// the base reward at equal cost. Tiers below the base threshold do not make
/// an otherwise-ineligible balance redeemable.
pub fn select_reward(balance: i64, threshold: i64, tiers: &[RewardTier]) -> Option<SelectedReward> {
    if balance < threshold {
        return None;
    }

    let best = tiers
        .iter()
        .filter(|t| t.is_active && t.coupons_required <= balance)
        .max_by_key(|t| t.coupons_required);

    match best {
        Some(tier) if tier.coupons_required >= threshold => {
            Some(SelectedReward::Tier(tier.clone()))
        }
        _ => Some(SelectedReward::Base { coupons_required: threshold }),
    }
}
