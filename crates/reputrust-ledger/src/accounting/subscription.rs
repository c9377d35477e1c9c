//! Subscription-scheme accounting.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use reputrust_core::amount::AmountMicros;
use reputrust_core::error::CoreError;
use reputrust_core::ids::{AgentId, SubscriptionId};
use reputrust_core::types::{Subscription, SubscriptionStatus};

pub struct SubscriptionLedger {
    subscriptions: DashMap<SubscriptionId, Mutex<Subscription>>,
    next_id: AtomicU64,
}

impl Default for SubscriptionLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionLedger {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// `trial_end.is_some()` starts the subscription in `trial`; otherwise
    /// it starts `active`.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        subscriber: AgentId,
        provider: AgentId,
        amount: AmountMicros,
        period_seconds: i64,
        auto_renew: bool,
        grace_seconds: i64,
        trial_end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let status = if trial_end.is_some() {
            SubscriptionStatus::Trial
        } else {
            SubscriptionStatus::Active
        };
        let subscription = Subscription {
            subscription_id: id,
            subscriber,
            provider,
            amount,
            period_seconds,
            status,
            current_period_start: now,
            current_period_end: now + Duration::seconds(period_seconds),
            auto_renew,
            renewal_count: 0,
            grace_seconds,
            trial_end,
        };
        self.subscriptions
            .insert(id, Mutex::new(subscription));
        id
    }

    pub fn get(&self, id: SubscriptionId) -> Option<Subscription> {
        self.subscriptions.get(&id).map(|s| s.lock().clone())
    }

    /// Advance the current period on a confirmed recurring payment, and
    /// increment `renewal_count`. Also promotes a `trial` subscription to
    /// `active` on its first payment.
    pub fn record_payment(
        &self,
        id: SubscriptionId,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Subscription, CoreError> {
        if period_end <= period_start {
            return Err(CoreError::InvalidRange {
                field: "period_end",
                reason: "current_period_end must be after current_period_start".to_string(),
            });
        }
        let slot = self.subscriptions.get(&id).ok_or(CoreError::InvalidRange {
            field: "subscription_id",
            reason: "unknown subscription".to_string(),
        })?;
        let mut sub = slot.lock();
        if matches!(sub.status, SubscriptionStatus::Cancelled | SubscriptionStatus::Expired) {
            return Err(CoreError::InvalidRange {
                field: "status",
                reason: format!("cannot record a payment against a {:?} subscription", sub.status),
            });
        }
        sub.current_period_start = period_start;
        sub.current_period_end = period_end;
        sub.renewal_count += 1;
        if sub.status == SubscriptionStatus::Trial {
            sub.status = SubscriptionStatus::Active;
        } else if sub.status == SubscriptionStatus::Paused {
            sub.status = SubscriptionStatus::Active;
        }
        Ok(sub.clone())
    }

    /// Cancel immediately (status flips now) or at the end of the current
    /// period (status stays `active`/`trial` until the sweep notices
    /// `current_period_end` has passed and `auto_renew` is false; the
    /// caller is expected to have already flipped `auto_renew` off for a
    /// period-end cancellation).
    pub fn cancel(&self, id: SubscriptionId, immediate: bool) -> Result<(), CoreError> {
        let slot = self.subscriptions.get(&id).ok_or(CoreError::InvalidRange {
            field: "subscription_id",
            reason: "unknown subscription".to_string(),
        })?;
        let mut sub = slot.lock();
        if immediate {
            sub.status = SubscriptionStatus::Cancelled;
        } else {
            sub.auto_renew = false;
        }
        Ok(())
    }

    /// Periodic sweep: subscriptions past
    /// `current_period_end + grace_seconds` with `auto_renew = false`
    /// transition to `expired`. Returns the ids that were transitioned.
    pub fn sweep_expirations(&self, now: DateTime<Utc>) -> Vec<SubscriptionId> {
        let mut expired = Vec::new();
        for entry in self.subscriptions.iter() {
            let mut sub = entry.value().lock();
            if !matches!(sub.status, SubscriptionStatus::Active | SubscriptionStatus::Trial) {
                continue;
            }
            let deadline = sub.current_period_end + Duration::seconds(sub.grace_seconds);
            if now > deadline && !sub.auto_renew {
                sub.status = SubscriptionStatus::Expired;
                expired.push(*entry.key());
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> SubscriptionLedger {
        SubscriptionLedger::new()
    }

    #[test]
    fn trial_subscription_starts_in_trial_and_activates_on_payment() {
        let l = ledger();
        let now = Utc::now();
        let id = l.create(
            AgentId(1),
            AgentId(2),
            AmountMicros::new(10_000_000).unwrap(),
            30 * 24 * 3600,
            true,
            3600,
            Some(now + Duration::days(14)),
            now,
        );
        assert_eq!(l.get(id).unwrap().status, SubscriptionStatus::Trial);
        l.record_payment(id, now + Duration::days(14), now + Duration::days(44))
            .unwrap();
        let sub = l.get(id).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.renewal_count, 1);
    }

    #[test]
    fn no_trial_starts_active() {
        let l = ledger();
        let now = Utc::now();
        let id = l.create(
            AgentId(1),
            AgentId(2),
            AmountMicros::new(1).unwrap(),
            3600,
            true,
            0,
            None,
            now,
        );
        assert_eq!(l.get(id).unwrap().status, SubscriptionStatus::Active);
    }

    #[test]
    fn non_renewing_subscription_expires_after_grace() {
        let l = ledger();
        let now = Utc::now();
        let id = l.create(
            AgentId(1),
            AgentId(2),
            AmountMicros::new(1).unwrap(),
            3600,
            false,
            60,
            None,
            now,
        );
        let before_grace = now + Duration::seconds(3600 + 30);
        assert!(l.sweep_expirations(before_grace).is_empty());
        let after_grace = now + Duration::seconds(3600 + 90);
        let expired = l.sweep_expirations(after_grace);
        assert_eq!(expired, vec![id]);
        assert_eq!(l.get(id).unwrap().status, SubscriptionStatus::Expired);
    }

    #[test]
    fn auto_renewing_subscription_never_auto_expires() {
        let l = ledger();
        let now = Utc::now();
        let id = l.create(
            AgentId(1),
            AgentId(2),
            AmountMicros::new(1).unwrap(),
            3600,
            true,
            0,
            None,
            now,
        );
        let far_future = now + Duration::seconds(3600 * 100);
        assert!(l.sweep_expirations(far_future).is_empty());
        assert_eq!(l.get(id).unwrap().status, SubscriptionStatus::Active);
    }

    #[test]
    fn immediate_cancel_flips_status_right_away() {
        let l = ledger();
        let now = Utc::now();
        let id = l.create(
            AgentId(1),
            AgentId(2),
            AmountMicros::new(1).unwrap(),
            3600,
            true,
            0,
            None,
            now,
        );
        l.cancel(id, true).unwrap();
        assert_eq!(l.get(id).unwrap().status, SubscriptionStatus::Cancelled);
    }

    #[test]
    fn deferred_cancel_only_disables_auto_renew_until_period_end() {
        let l = ledger();
        let now = Utc::now();
        let id = l.create(
            AgentId(1),
            AgentId(2),
            AmountMicros::new(1).unwrap(),
            3600,
            true,
            0,
            None,
            now,
        );
        l.cancel(id, false).unwrap();
        let sub = l.get(id).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(!sub.auto_renew);
        let expired = l.sweep_expirations(now + Duration::seconds(3601));
        assert_eq!(expired, vec![id]);
    }
}
