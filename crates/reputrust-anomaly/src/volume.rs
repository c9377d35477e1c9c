//! Network-wide transaction volume anomaly check: this hour vs. the same
//! hour one day prior.

use chrono::{DateTime, Duration, Utc};
use reputrust_core::constants::{
    ANOMALY_VOLUME_DROP_HIGH_PCT, ANOMALY_VOLUME_DROP_PCT, ANOMALY_VOLUME_SPIKE_MIN_ABSOLUTE,
    ANOMALY_VOLUME_SPIKE_MULTIPLE,
};
use reputrust_core::types::{AlertSeverity, AlertType, PaymentRecord};

use crate::agent::Finding;

fn count_within(payments: &[PaymentRecord], start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    payments
        .iter()
        .filter(|p| p.timestamp >= start && p.timestamp < end)
        .count() as u64
}

pub fn check_volume_anomaly(payments: &[PaymentRecord], now: DateTime<Utc>) -> Option<Finding> {
    let this_hour_start = now - Duration::hours(1);
    let yesterday_hour_start = this_hour_start - Duration::days(1);
    let yesterday_hour_end = now - Duration::days(1);

    let current = count_within(payments, this_hour_start, now);
    let baseline = count_within(payments, yesterday_hour_start, yesterday_hour_end);

    if baseline == 0 {
        return None;
    }

    let change_percent = (current as f64 - baseline as f64) / baseline as f64 * 100.0;

    if current < baseline {
        let drop_pct = -change_percent;
        if drop_pct <= ANOMALY_VOLUME_DROP_PCT {
            return None;
        }
        let severity = if drop_pct > ANOMALY_VOLUME_DROP_HIGH_PCT {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        return Some(Finding {
            alert_type: AlertType::VolumeAnomaly,
            metric: "tx_count",
            current: current as f64,
            historical: baseline as f64,
            change_percent,
            severity,
        });
    }

    let spike = current as f64 > baseline as f64 * ANOMALY_VOLUME_SPIKE_MULTIPLE
        && current >= ANOMALY_VOLUME_SPIKE_MIN_ABSOLUTE;
    if !spike {
        return None;
    }
    Some(Finding {
        alert_type: AlertType::VolumeAnomaly,
        metric: "tx_count",
        current: current as f64,
        historical: baseline as f64,
        change_percent,
        severity: AlertSeverity::High,
    })
}
