//! Periodic anomaly pass: runs the agent, volume, and facilitator checks
//! and materializes their findings as queryable `Alert`s.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reputrust_core::constants::FACILITATOR_INCIDENT_DEDUP_WINDOW_SECS;
use reputrust_core::ids::AgentId;
use reputrust_core::types::{Alert, AlertType, FacilitatorHealthSample};
use reputrust_ledger::PaymentLedger;

use crate::agent::{check_error_rate_spike, check_success_rate_drop, Finding};
use crate::error::AnomalyError;
use crate::facilitator::FacilitatorTracker;
use crate::volume::check_volume_anomaly;

pub struct AnomalyDetector {
    ledger: std::sync::Arc<PaymentLedger>,
    facilitators: FacilitatorTracker,
    alerts: DashMap<u64, Alert>,
    next_alert_id: AtomicU64,
}

impl AnomalyDetector {
    pub fn new(ledger: std::sync::Arc<PaymentLedger>) -> Self {
        Self {
            ledger,
            facilitators: FacilitatorTracker::new(),
            alerts: DashMap::new(),
            next_alert_id: AtomicU64::new(1),
        }
    }

    fn open_alert(&self, subject: String, finding: Finding, now: DateTime<Utc>) -> Alert {
        let id = self.next_alert_id.fetch_add(1, Ordering::SeqCst);
        let alert = Alert {
            id,
            alert_type: finding.alert_type,
            subject,
            metric: finding.metric.to_string(),
            current: finding.current,
            historical: finding.historical,
            change_percent: finding.change_percent,
            severity: finding.severity,
            timestamp: now,
            resolved: false,
        };
        self.alerts.insert(id, alert.clone());
        alert
    }

    /// One sweep over `agent_ids`' payment histories plus the network-wide
    /// volume check. Run on `ANOMALY_PASS_INTERVAL_SECS` cadence by the node
    /// scheduler.
    pub fn run_pass(&self, agent_ids: &[AgentId], now: DateTime<Utc>) -> Vec<Alert> {
        let mut fired = Vec::new();

        for &agent_id in agent_ids {
            let payments = self.ledger.payments_for(agent_id);
            if let Some(finding) = check_success_rate_drop(agent_id, &payments, now) {
                fired.push(self.open_alert(agent_id.to_string(), finding, now));
            }
            if let Some(finding) = check_error_rate_spike(agent_id, &payments, now) {
                fired.push(self.open_alert(agent_id.to_string(), finding, now));
            }
        }

        let all_payments = self.ledger.all_payments();
        if let Some(finding) = check_volume_anomaly(&all_payments, now) {
            fired.push(self.open_alert("network".to_string(), finding, now));
        }

        fired
    }

    /// Feed one facilitator health-check result; opens a `FacilitatorOutage`
    /// alert if the consecutive-failure run just crossed the threshold and
    /// no non-resolved incident for it is already open within the dedup
    /// window.
    pub fn observe_facilitator_health(&self, sample: &FacilitatorHealthSample, now: DateTime<Utc>) -> Option<Alert> {
        let finding = self
            .facilitators
            .observe(sample, FACILITATOR_INCIDENT_DEDUP_WINDOW_SECS)?;
        Some(self.open_alert(
            finding.facilitator.clone(),
            Finding {
                alert_type: AlertType::FacilitatorOutage,
                metric: "consecutive_failures",
                current: finding.consecutive_failures as f64,
                historical: 0.0,
                change_percent: 0.0,
                severity: finding.severity,
            },
            now,
        ))
    }

    pub fn alert(&self, id: u64) -> Option<Alert> {
        self.alerts.get(&id).map(|e| e.clone())
    }

    pub fn resolve(&self, id: u64) -> Result<(), AnomalyError> {
        let mut alert = self.alerts.get_mut(&id).ok_or(AnomalyError::UnknownAlert(id))?;
        alert.resolved = true;
        if alert.alert_type == AlertType::FacilitatorOutage {
            self.facilitators.clear_incident(&alert.subject);
        }
        Ok(())
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alerts.iter().filter(|e| !e.resolved).map(|e| e.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reputrust_core::amount::AmountMicros;
    use reputrust_core::ids::Signature;
    use reputrust_core::types::{FacilitatorStatus, PaymentRecord, PaymentStatus, Tag};
    use std::sync::Arc;

    fn payment(status: PaymentStatus, hours_ago: i64) -> PaymentRecord {
        PaymentRecord {
            signature: Signature::from(format!("sig-{hours_ago}-{status:?}").as_str()),
            payer_address: "A".into(),
            payee_address: "B".into(),
            amount: AmountMicros::new(1).unwrap(),
            currency: Tag::from("USDC"),
            network: Tag::from("base"),
            facilitator: Tag::from("x402"),
            status,
            timestamp: Utc::now() - chrono::Duration::hours(hours_ago),
            endpoint: None,
        }
    }

    #[test]
    fn run_pass_emits_and_stores_an_alert() {
        let ledger = Arc::new(PaymentLedger::new());
        let a = AgentId(1);
        let b = AgentId(2);
        for _ in 0..10 {
            ledger
                .observe(
                    Signature::from(format!("h-{}", rand_suffix()).as_str()),
                    a,
                    "A",
                    b,
                    "B",
                    payment(PaymentStatus::Confirmed, 5),
                )
                .unwrap();
        }
        for _ in 0..6 {
            ledger
                .observe(
                    Signature::from(format!("r-{}", rand_suffix()).as_str()),
                    a,
                    "A",
                    b,
                    "B",
                    payment(PaymentStatus::Failed, 0),
                )
                .unwrap();
        }

        let detector = AnomalyDetector::new(ledger);
        let alerts = detector.run_pass(&[a], Utc::now());
        assert!(alerts.iter().any(|al| al.alert_type == AlertType::SuccessRateDrop));
        assert_eq!(detector.active_alerts().len(), alerts.len());
    }

    #[test]
    fn resolving_a_facilitator_alert_clears_the_incident_lockout() {
        let ledger = Arc::new(PaymentLedger::new());
        let detector = AnomalyDetector::new(ledger);
        let now = Utc::now();
        let sample = FacilitatorHealthSample {
            facilitator: "x402".to_string(),
            status: FacilitatorStatus::Offline,
            latency_ms: 1,
            timestamp: now,
        };
        detector.observe_facilitator_health(&sample, now);
        detector.observe_facilitator_health(&sample, now);
        let alert = detector
            .observe_facilitator_health(&sample, now)
            .expect("third consecutive failure opens an incident");
        detector.resolve(alert.id).unwrap();
        assert!(detector.alert(alert.id).unwrap().resolved);
    }

    fn rand_suffix() -> u64 {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        COUNTER.fetch_add(1, Ordering::SeqCst)
    }
}
