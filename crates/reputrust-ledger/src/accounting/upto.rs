//! Upto-scheme (variable-with-cap) accounting.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use reputrust_core::amount::AmountMicros;
use reputrust_core::error::CoreError;
use reputrust_core::ids::{AgentId, AuthorizationId};
use reputrust_core::types::{AuthorizationStatus, PaymentAuthorization, Tag};

pub struct ChargeBreakdown {
    pub base_cost: AmountMicros,
    pub unit_cost: AmountMicros,
    pub units: i64,
    pub amount: AmountMicros,
}

/// One authorization's mutable state, guarded by its own mutex so
/// concurrent charges against the *same* authorization serialize (the
/// invariant this scheme requires) without blocking charges against
/// other authorizations.
struct AuthorizationSlot {
    record: Mutex<PaymentAuthorization>,
}

pub struct UptoLedger {
    authorizations: DashMap<AuthorizationId, AuthorizationSlot>,
    next_id: AtomicU64,
}

impl Default for UptoLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl UptoLedger {
    pub fn new() -> Self {
        Self {
            authorizations: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn authorize(
        &self,
        payer: AgentId,
        payee: AgentId,
        max_amount: AmountMicros,
        base_cost: AmountMicros,
        unit_cost: AmountMicros,
        unit_type: Tag,
        expires_at: Option<DateTime<Utc>>,
    ) -> AuthorizationId {
        let id = AuthorizationId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = PaymentAuthorization {
            authorization_id: id,
            payer,
            payee,
            max_amount,
            used_amount: AmountMicros::ZERO,
            remaining_amount: max_amount,
            base_cost,
            unit_cost,
            unit_type,
            status: AuthorizationStatus::Active,
            expires_at,
        };
        self.authorizations.insert(
            id,
            AuthorizationSlot {
                record: Mutex::new(record),
            },
        );
        id
    }

    pub fn get(&self, id: AuthorizationId) -> Option<PaymentAuthorization> {
        self.authorizations.get(&id).map(|s| s.record.lock().clone())
    }

    /// `amount = min(max - used, base_cost + unit_cost * units)`. Flips
    /// status to `exhausted` exactly when `remaining` reaches zero.
    pub fn charge(
        &self,
        id: AuthorizationId,
        units: i64,
        now: DateTime<Utc>,
    ) -> Result<ChargeBreakdown, CoreError> {
        let slot = self
            .authorizations
            .get(&id)
            .ok_or(CoreError::InvalidRange {
                field: "authorization_id",
                reason: "unknown authorization".to_string(),
            })?;
        let mut record = slot.record.lock();

        if record.status == AuthorizationStatus::Revoked {
            return Err(CoreError::AuthorizationRevoked(id.0));
        }
        if let Some(expires_at) = record.expires_at {
            if now > expires_at && record.status == AuthorizationStatus::Active {
                record.status = AuthorizationStatus::Expired;
            }
        }
        if record.status == AuthorizationStatus::Expired {
            return Err(CoreError::AuthorizationExpired(id.0));
        }
        if record.status == AuthorizationStatus::Exhausted {
            return Err(CoreError::AuthorizationExhausted(id.0));
        }

        let unit_cost_total = AmountMicros::new(record.unit_cost.micros() * units)?;
        let uncapped = record.base_cost.checked_add(unit_cost_total)?;
        let amount = uncapped.min(record.remaining_amount);

        record.used_amount = record.used_amount.checked_add(amount)?;
        record.remaining_amount = record.remaining_amount.saturating_sub(amount);
        if record.remaining_amount == AmountMicros::ZERO {
            record.status = AuthorizationStatus::Exhausted;
        }

        Ok(ChargeBreakdown {
            base_cost: record.base_cost,
            unit_cost: record.unit_cost,
            units,
            amount,
        })
    }

    pub fn revoke(&self, id: AuthorizationId) -> Result<(), CoreError> {
        let slot = self
            .authorizations
            .get(&id)
            .ok_or(CoreError::InvalidRange {
                field: "authorization_id",
                reason: "unknown authorization".to_string(),
            })?;
        slot.record.lock().status = AuthorizationStatus::Revoked;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_upto_accounting_scenario_three() {
        let ledger = UptoLedger::new();
        let now = Utc::now();
        let id = ledger.authorize(
            AgentId(1),
            AgentId(2),
            AmountMicros::new(10_000).unwrap(),
            AmountMicros::new(100).unwrap(),
            AmountMicros::new(5).unwrap(),
            "tokens".to_string(),
            None,
        );

        let first = ledger.charge(id, 1_000, now).unwrap();
        assert_eq!(first.amount.micros(), 5_100);
        assert_eq!(ledger.get(id).unwrap().remaining_amount.micros(), 4_900);

        let second = ledger.charge(id, 1_500, now).unwrap();
        assert_eq!(second.amount.micros(), 4_900);
        let record = ledger.get(id).unwrap();
        assert_eq!(record.remaining_amount.micros(), 0);
        assert_eq!(record.status, AuthorizationStatus::Exhausted);
    }

    #[test]
    fn charge_after_exhaustion_fails() {
        let ledger = UptoLedger::new();
        let now = Utc::now();
        let id = ledger.authorize(
            AgentId(1),
            AgentId(2),
            AmountMicros::new(100).unwrap(),
            AmountMicros::new(100).unwrap(),
            AmountMicros::ZERO,
            "tokens".to_string(),
            None,
        );
        ledger.charge(id, 0, now).unwrap();
        let err = ledger.charge(id, 0, now).unwrap_err();
        assert!(matches!(err, CoreError::AuthorizationExhausted(_)));
    }

    #[test]
    fn charge_after_expiry_fails() {
        let ledger = UptoLedger::new();
        let authorized_at = Utc::now();
        let id = ledger.authorize(
            AgentId(1),
            AgentId(2),
            AmountMicros::new(1_000).unwrap(),
            AmountMicros::new(10).unwrap(),
            AmountMicros::ZERO,
            "tokens".to_string(),
            Some(authorized_at),
        );
        let later = authorized_at + chrono::Duration::seconds(1);
        let err = ledger.charge(id, 0, later).unwrap_err();
        assert!(matches!(err, CoreError::AuthorizationExpired(_)));
    }

    #[test]
    fn revoked_authorization_rejects_charges() {
        let ledger = UptoLedger::new();
        let now = Utc::now();
        let id = ledger.authorize(
            AgentId(1),
            AgentId(2),
            AmountMicros::new(1_000).unwrap(),
            AmountMicros::new(10).unwrap(),
            AmountMicros::ZERO,
            "tokens".to_string(),
            None,
        );
        ledger.revoke(id).unwrap();
        let err = ledger.charge(id, 0, now).unwrap_err();
        assert!(matches!(err, CoreError::AuthorizationRevoked(_)));
    }
}
