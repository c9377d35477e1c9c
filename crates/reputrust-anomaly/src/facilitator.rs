//! Facilitator outage detection: consecutive health-check failures, with
//! incident-window dedup so a flapping facilitator doesn't spam alerts.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reputrust_core::constants::{
    ANOMALY_FACILITATOR_FAILURES_CRITICAL, ANOMALY_FACILITATOR_FAILURES_MIN,
};
use reputrust_core::types::{AlertSeverity, FacilitatorHealthSample, FacilitatorStatus, Tag};

/// Per-facilitator consecutive-failure counter and last-incident-opened
/// timestamp, kept independent of the alert store so a new `FacilitatorTracker`
/// can be unit-tested without one.
#[derive(Default)]
pub struct FacilitatorTracker {
    consecutive_failures: DashMap<Tag, AtomicU32>,
    last_incident_opened_at: DashMap<Tag, DateTime<Utc>>,
}

pub struct FacilitatorFinding {
    pub facilitator: Tag,
    pub consecutive_failures: u32,
    pub severity: AlertSeverity,
}

impl FacilitatorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one health-check sample. Returns a finding exactly when the
    /// consecutive-failure run just crossed the minimum threshold and no
    /// non-resolved incident is already open for this facilitator within
    /// the dedup window.
    pub fn observe(
        &self,
        sample: &FacilitatorHealthSample,
        dedup_window_secs: i64,
    ) -> Option<FacilitatorFinding> {
        let counter = self
            .consecutive_failures
            .entry(sample.facilitator.clone())
            .or_insert_with(|| AtomicU32::new(0));

        let failures = if sample.status == FacilitatorStatus::Online {
            counter.store(0, Ordering::SeqCst);
            0
        } else {
            counter.fetch_add(1, Ordering::SeqCst) + 1
        };
        drop(counter);

        if failures < ANOMALY_FACILITATOR_FAILURES_MIN {
            return None;
        }

        if let Some(last) = self.last_incident_opened_at.get(&sample.facilitator) {
            if (sample.timestamp - *last).num_seconds() < dedup_window_secs {
                return None;
            }
        }

        self.last_incident_opened_at
            .insert(sample.facilitator.clone(), sample.timestamp);

        let severity = if failures >= ANOMALY_FACILITATOR_FAILURES_CRITICAL {
            AlertSeverity::Critical
        } else {
            AlertSeverity::High
        };
        Some(FacilitatorFinding {
            facilitator: sample.facilitator.clone(),
            consecutive_failures: failures,
            severity,
        })
    }

    /// Clears the dedup lockout, e.g. once an operator marks the incident
    /// resolved.
    pub fn clear_incident(&self, facilitator: &str) {
        self.last_incident_opened_at.remove(facilitator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: FacilitatorStatus, now: DateTime<Utc>) -> FacilitatorHealthSample {
        FacilitatorHealthSample {
            facilitator: "x402".to_string(),
            status,
            latency_ms: 50,
            timestamp: now,
        }
    }

    #[test]
    fn below_minimum_failures_does_not_fire() {
        let tracker = FacilitatorTracker::new();
        let now = Utc::now();
        assert!(tracker.observe(&sample(FacilitatorStatus::Offline, now), 3600).is_none());
        assert!(tracker.observe(&sample(FacilitatorStatus::Offline, now), 3600).is_none());
    }

    #[test]
    fn third_consecutive_failure_fires_high() {
        let tracker = FacilitatorTracker::new();
        let now = Utc::now();
        tracker.observe(&sample(FacilitatorStatus::Offline, now), 3600);
        tracker.observe(&sample(FacilitatorStatus::Offline, now), 3600);
        let finding = tracker
            .observe(&sample(FacilitatorStatus::Offline, now), 3600)
            .expect("third consecutive failure should fire");
        assert_eq!(finding.severity, AlertSeverity::High);
    }

    #[test]
    fn fifth_consecutive_failure_escalates_to_critical() {
        let tracker = FacilitatorTracker::new();
        let now = Utc::now();
        for _ in 0..4 {
            tracker.observe(&sample(FacilitatorStatus::Offline, now), 0);
        }
        let finding = tracker
            .observe(&sample(FacilitatorStatus::Offline, now), 0)
            .expect("fifth consecutive failure should fire");
        assert_eq!(finding.severity, AlertSeverity::Critical);
    }

    #[test]
    fn repeat_incident_within_dedup_window_is_suppressed() {
        let tracker = FacilitatorTracker::new();
        let now = Utc::now();
        tracker.observe(&sample(FacilitatorStatus::Offline, now), 3600);
        tracker.observe(&sample(FacilitatorStatus::Offline, now), 3600);
        tracker
            .observe(&sample(FacilitatorStatus::Offline, now), 3600)
            .expect("opens the first incident");
        let suppressed = tracker.observe(
            &sample(FacilitatorStatus::Offline, now + chrono::Duration::minutes(10)),
            3600,
        );
        assert!(suppressed.is_none());
    }

    #[test]
    fn a_recovery_resets_the_counter() {
        let tracker = FacilitatorTracker::new();
        let now = Utc::now();
        tracker.observe(&sample(FacilitatorStatus::Offline, now), 3600);
        tracker.observe(&sample(FacilitatorStatus::Online, now), 3600);
        assert!(tracker.observe(&sample(FacilitatorStatus::Offline, now), 3600).is_none());
    }
}
