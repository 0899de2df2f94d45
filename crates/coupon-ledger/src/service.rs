//! The coupon service: orchestrates tokens, wallets, events, and policy.
//!
//! This is the only component other subsystems call. Every wallet-affecting
//! decision is appended to the event log with a snapshot of the policy
//! inputs that produced it.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use database::{
    event::{self, NewEvent, WalletDelta},
    Database, Event, EventKind, RewardTier, Settings, SettingsUpdate, TierUpdate, Token,
    TokenStatus, WalletEntry,
};

use crate::clock::{format_timestamp, utc_day_bounds, Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::deeplink::wa_me_link;
use crate::error::{CouponError, Result};
use crate::policy_store::{Policy, PolicyStore};
use crate::redemption::{select_reward, BlockReason, RedemptionResult};
use crate::token_ledger::TokenLedger;
use crate::wallet_ledger::WalletLedger;

/// A freshly issued token plus its customer-facing deep link.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// The issued token.
    pub token: Token,
    /// `wa.me` link embedding the code; None when no channel is configured.
    pub deep_link: Option<String>,
}

/// Coupon ledger entry point for the admin API and messaging layer.
#[derive(Clone)]
pub struct CouponService {
    db: Database,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    tokens: TokenLedger,
    wallets: WalletLedger,
    policy: PolicyStore,
}

impl CouponService {
    /// Create a new service with the given clock.
    pub fn new(db: Database, clock: Arc<dyn Clock>, config: LedgerConfig) -> Self {
        let tokens = TokenLedger::new(
            db.clone(),
            clock.clone(),
            config.code_length,
            config.max_code_attempts,
        );
        let wallets = WalletLedger::new(db.clone());
        let policy = PolicyStore::new(db.clone(), clock.clone());

        Self { db, clock, config, tokens, wallets, policy }
    }

    /// Create a new service on the system clock.
    pub fn with_system_clock(db: Database, config: LedgerConfig) -> Self {
        Self::new(db, Arc::new(SystemClock), config)
    }

    // ------------------------------------------------------------------
    // Customer-facing operations
    // ------------------------------------------------------------------

    /// Award one coupon to a phone, subject to the daily cap.
    ///
    /// Cap rejections append nothing: a silently rejected award is a
    /// caller-side no-op, not a wallet event.
    pub async fn award(&self, phone: &str) -> Result<WalletEntry> {
        let now = self.clock.now();
        let settings = self.policy.settings().await?;

        let (day_start, day_end) = utc_day_bounds(now);
        let today = event::count_awards_between(self.db.pool(), phone, &day_start, &day_end).await?;
        if today >= settings.max_coupons_per_day {
            debug!("Daily cap reached for {} ({}/day)", phone, settings.max_coupons_per_day);
            return Err(CouponError::DailyCapExceeded {
                phone: phone.to_string(),
                cap: settings.max_coupons_per_day,
            });
        }

        let details = json!({
            "daily_count": today + 1,
            "daily_cap": settings.max_coupons_per_day,
        })
        .to_string();
        event::record_event(
            self.db.pool(),
            &NewEvent {
                phone,
                event: EventKind::CouponAwarded.as_str(),
                token: None,
                details: &details,
                created_at: &format_timestamp(now),
            },
            &WalletDelta::earn(1),
        )
        .await?;

        info!("Awarded coupon to {} ({}/{} today)", phone, today + 1, settings.max_coupons_per_day);
        self.wallets.get(phone).await
    }

    /// Issue a single-use redemption token, optionally pre-bound to a phone.
    ///
    /// Token issuance is not a balance event and appends nothing.
    pub async fn issue_token(&self, phone: Option<&str>) -> Result<IssuedToken> {
        let settings = self.policy.settings().await?;
        let token = self.tokens.issue(phone, settings.token_expiration_hours).await?;

        let deep_link = self
            .config
            .whatsapp_number
            .as_deref()
            .map(|number| wa_me_link(number, &token.code));

        info!("Issued token {} (expires {})", token.code, token.expires_at);
        Ok(IssuedToken { token, deep_link })
    }

    /// Redeem a token presented by a phone.
    ///
    /// The composite decision: consume the token (exactly-once), evaluate the
    /// wallet against the policy, and append the outcome. A consumed token
    /// stays consumed even when the balance turns out to be insufficient,
    /// unless the `burn_on_ineligible` policy flag is off.
    pub async fn redeem(&self, code: &str, phone: &str) -> Result<RedemptionResult> {
        let now = format_timestamp(self.clock.now());

        event::record_event(
            self.db.pool(),
            &NewEvent {
                phone,
                event: EventKind::RedemptionAttempt.as_str(),
                token: Some(code),
                details: "{}",
                created_at: &now,
            },
            &WalletDelta::none(),
        )
        .await?;

        if let Err(err) = self.tokens.consume(code).await {
            return match err {
                CouponError::NotFound { .. } => {
                    self.block(phone, code, &now, BlockReason::TokenNotFound, json!({})).await
                }
                CouponError::AlreadyRedeemed { .. } => {
                    self.block(phone, code, &now, BlockReason::AlreadyRedeemed, json!({})).await
                }
                CouponError::TokenExpired { .. } => {
                    self.block(phone, code, &now, BlockReason::TokenExpired, json!({})).await
                }
                other => Err(other),
            };
        }

        let policy = self.policy.get().await?;
        let wallet = self.wallets.get(phone).await?;
        let threshold = policy.settings.redemption_threshold;

        match select_reward(wallet.coupon_count, threshold, &policy.tiers) {
            None => {
                if !policy.settings.burn_on_ineligible {
                    self.tokens.restore(code).await?;
                }
                let extra = json!({
                    "balance": wallet.coupon_count,
                    "threshold": threshold,
                    "token_burned": policy.settings.burn_on_ineligible,
                });
                self.block(phone, code, &now, BlockReason::InsufficientBalance, extra).await
            }
            Some(reward) => {
                let cost = reward.coupons_required();
                let details = json!({
                    "reward": reward.name(),
                    "coupons_required": cost,
                    "threshold": threshold,
                    "balance_before": wallet.coupon_count,
                })
                .to_string();
                event::record_event(
                    self.db.pool(),
                    &NewEvent {
                        phone,
                        event: EventKind::RedemptionGranted.as_str(),
                        token: Some(code),
                        details: &details,
                        created_at: &now,
                    },
                    &WalletDelta::redeem(cost),
                )
                .await?;

                info!("Granted '{}' to {} for token {}", reward.name(), phone, code);
                Ok(RedemptionResult::granted(reward))
            }
        }
    }

    /// Append a `redemption_blocked` event and return the refusal.
    async fn block(
        &self,
        phone: &str,
        code: &str,
        now: &str,
        reason: BlockReason,
        extra: serde_json::Value,
    ) -> Result<RedemptionResult> {
        let mut details = extra;
        details["reason"] = json!(reason.as_str());
        let details = details.to_string();

        event::record_event(
            self.db.pool(),
            &NewEvent {
                phone,
                event: EventKind::RedemptionBlocked.as_str(),
                token: Some(code),
                details: &details,
                created_at: now,
            },
            &WalletDelta::none(),
        )
        .await?;

        debug!("Blocked redemption of {} for {}: {}", code, phone, reason.as_str());
        Ok(RedemptionResult::blocked(reason))
    }

    /// Customer-facing balance check. Appends a `balance_checked` event.
    pub async fn check_balance(&self, phone: &str) -> Result<WalletEntry> {
        let wallet = self.wallets.get(phone).await?;
        let details = json!({ "coupon_count": wallet.coupon_count }).to_string();

        event::record_event(
            self.db.pool(),
            &NewEvent {
                phone,
                event: EventKind::BalanceChecked.as_str(),
                token: None,
                details: &details,
                created_at: &format_timestamp(self.clock.now()),
            },
            &WalletDelta::none(),
        )
        .await?;

        self.wallets.get(phone).await
    }

    /// Opt a phone out of marketing messages.
    pub async fn opt_out(&self, phone: &str) -> Result<WalletEntry> {
        event::record_event(
            self.db.pool(),
            &NewEvent {
                phone,
                event: EventKind::OptOut.as_str(),
                token: None,
                details: "{}",
                created_at: &format_timestamp(self.clock.now()),
            },
            &WalletDelta::opt_out(),
        )
        .await?;

        info!("{} opted out of marketing", phone);
        self.wallets.get(phone).await
    }

    // ------------------------------------------------------------------
    // Admin operations
    // ------------------------------------------------------------------

    /// Get a wallet without recording anything.
    pub async fn get_wallet(&self, phone: &str) -> Result<WalletEntry> {
        self.wallets.get(phone).await
    }

    /// Re-derive a wallet from its event history, for reconciliation.
    pub async fn recompute_wallet(&self, phone: &str) -> Result<WalletEntry> {
        self.wallets.recompute(phone).await
    }

    /// List a phone's events, optionally filtered by kind.
    pub async fn list_events(
        &self,
        phone: &str,
        kind: Option<EventKind>,
        newest_first: bool,
        limit: i64,
    ) -> Result<Vec<Event>> {
        Ok(event::list_events(
            self.db.pool(),
            phone,
            kind.map(|k| k.as_str()),
            newest_first,
            limit,
        )
        .await?)
    }

    /// Look up a token by code.
    pub async fn get_token(&self, code: &str) -> Result<Token> {
        self.tokens.get(code).await
    }

    /// List tokens newest-first, optionally filtered by status.
    pub async fn list_tokens(&self, status: Option<TokenStatus>, limit: i64) -> Result<Vec<Token>> {
        self.tokens.list(status, limit).await
    }

    /// Administratively delete a token.
    pub async fn delete_token(&self, code: &str) -> Result<()> {
        self.tokens.delete(code).await
    }

    /// Get the full redemption policy.
    pub async fn policy(&self) -> Result<Policy> {
        self.policy.get().await
    }

    /// Apply a partial settings update.
    pub async fn update_settings(&self, update: &SettingsUpdate) -> Result<Settings> {
        self.policy.update_settings(update).await
    }

    /// Create a reward tier.
    pub async fn create_tier(
        &self,
        name: &str,
        coupons_required: i64,
        sort_order: i64,
    ) -> Result<RewardTier> {
        self.policy.create_tier(name, coupons_required, sort_order).await
    }

    /// Apply a partial update to a reward tier.
    pub async fn update_tier(&self, id: i64, update: &TierUpdate) -> Result<RewardTier> {
        self.policy.update_tier(id, update).await
    }

    /// Delete a reward tier.
    pub async fn delete_tier(&self, id: i64) -> Result<()> {
        self.policy.delete_tier(id).await
    }
}
