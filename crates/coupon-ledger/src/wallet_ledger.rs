//! Per-phone wallet aggregation.
//!
//! The materialized `wallets` row is written in the same transaction as each
//! event append, so ordinary reads are a single row fetch. The event log
//! remains the source of truth: [`fold_events`] re-derives the same aggregate
//! from scratch for reconciliation and debugging.

use database::{event, wallet, Database, Event, EventKind, WalletEntry};

use crate::error::Result;

/// Read side of the per-phone wallet aggregate.
#[derive(Clone)]
pub struct WalletLedger {
    db: Database,
}

impl WalletLedger {
    /// Create a new wallet ledger.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the wallet for a phone.
    ///
    /// A phone with no history gets a zero-valued entry; no record found is
    /// not an error.
    pub async fn get(&self, phone: &str) -> Result<WalletEntry> {
        Ok(wallet::get_wallet(self.db.pool(), phone)
            .await?
            .unwrap_or_else(|| WalletEntry::empty(phone)))
    }

    /// Re-derive the wallet by folding the phone's full event history.
    ///
    /// Must always agree with [`WalletLedger::get`]; disagreement means the
    /// materialized row and the log have diverged.
    pub async fn recompute(&self, phone: &str) -> Result<WalletEntry> {
        let events = event::list_events(self.db.pool(), phone, None, false, -1).await?;
        Ok(fold_events(phone, &events))
    }
}

/// Left-fold a phone's event sequence into a wallet entry.
///
/// `coupon_awarded` earns one coupon; `redemption_granted` deducts the
/// coupons recorded in its decision snapshot; `opt_out` flips the marketing
/// flag; everything else is informational.
pub fn fold_events(phone: &str, events: &[Event]) -> WalletEntry {
    let mut entry = WalletEntry::empty(phone);

    for event in events {
        match EventKind::parse(&event.event) {
            Some(EventKind::CouponAwarded) => {
                entry.total_earned += 1;
                entry.coupon_count += 1;
            }
            Some(EventKind::RedemptionGranted) => {
                let n = redeemed_coupons(event);
                entry.total_redeemed += n;
                entry.coupon_count -= n;
            }
            Some(EventKind::OptOut) => {
                entry.opted_in_marketing = false;
            }
            _ => {}
        }
        entry.last_message_at = Some(event.created_at.clone());
    }

    entry
}

/// Coupons deducted by a `redemption_granted` event, from its snapshot.
fn redeemed_coupons(event: &Event) -> i64 {
    serde_json::from_str::<serde_json::Value>(&event.details)
        .ok()
        .and_then(|details| details.get("coupons_required")?.as_i64())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: i64, kind: EventKind, details: &str, at: &str) -> Event {
        Event {
            id,
            phone: "+5215512345678".to_string(),
            event: kind.as_str().to_string(),
            token: None,
            details: details.to_string(),
            created_at: at.to_string(),
        }
    }

    #[test]
    fn test_fold_empty_history() {
        let entry = fold_events("+5215512345678", &[]);
        assert_eq!(entry, WalletEntry::empty("+5215512345678"));
    }

    #[test]
    fn test_fold_earn_and_redeem() {
        let events = vec![
            event(1, EventKind::CouponAwarded, "{}", "2026-01-01T10:00:00.000000Z"),
            event(2, EventKind::CouponAwarded, "{}", "2026-01-01T11:00:00.000000Z"),
            event(3, EventKind::CouponAwarded, "{}", "2026-01-01T12:00:00.000000Z"),
            event(4, EventKind::CouponAwarded, "{}", "2026-01-01T13:00:00.000000Z"),
            event(
                5,
                EventKind::RedemptionGranted,
                r#"{"reward":"Base reward","coupons_required":4}"#,
                "2026-01-01T14:00:00.000000Z",
            ),
        ];

        let entry = fold_events("+5215512345678", &events);
        assert_eq!(entry.total_earned, 4);
        assert_eq!(entry.total_redeemed, 4);
        assert_eq!(entry.coupon_count, 0);
        assert_eq!(entry.coupon_count, entry.total_earned - entry.total_redeemed);
        assert_eq!(entry.last_message_at.as_deref(), Some("2026-01-01T14:00:00.000000Z"));
    }

    #[test]
    fn test_fold_informational_events_have_no_balance_effect() {
        let events = vec![
            event(1, EventKind::CouponAwarded, "{}", "2026-01-01T10:00:00.000000Z"),
            event(2, EventKind::RedemptionAttempt, "{}", "2026-01-01T11:00:00.000000Z"),
            event(
                3,
                EventKind::RedemptionBlocked,
                r#"{"reason":"insufficient_balance"}"#,
                "2026-01-01T11:00:00.000000Z",
            ),
            event(4, EventKind::BalanceChecked, "{}", "2026-01-01T12:00:00.000000Z"),
        ];

        let entry = fold_events("+5215512345678", &events);
        assert_eq!(entry.coupon_count, 1);
        assert_eq!(entry.total_earned, 1);
        assert_eq!(entry.total_redeemed, 0);
        assert!(entry.opted_in_marketing);
    }

    #[test]
    fn test_fold_opt_out() {
        let events = vec![
            event(1, EventKind::CouponAwarded, "{}", "2026-01-01T10:00:00.000000Z"),
            event(2, EventKind::OptOut, "{}", "2026-01-01T11:00:00.000000Z"),
        ];

        let entry = fold_events("+5215512345678", &events);
        assert!(!entry.opted_in_marketing);
        assert_eq!(entry.coupon_count, 1);
    }
}
