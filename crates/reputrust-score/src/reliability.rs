//! `reliability` sub-score: success rate across 24h/7d/30d lookback
//! windows, weighted toward the most recent window.

use chrono::{DateTime, Utc};
use reputrust_core::constants::{
    RELIABILITY_WINDOW_HOURS_LONG, RELIABILITY_WINDOW_HOURS_MEDIUM, RELIABILITY_WINDOW_HOURS_SHORT,
};
use reputrust_core::types::{PaymentRecord, PaymentStatus};

const WINDOW_WEIGHTS: [f64; 3] = [0.5, 0.3, 0.2];

fn success_rate_within(payments: &[PaymentRecord], now: DateTime<Utc>, hours: i64) -> Option<f64> {
    let cutoff = now - chrono::Duration::hours(hours);
    let mut confirmed = 0u32;
    let mut terminal = 0u32;
    for p in payments {
        if p.timestamp < cutoff {
            continue;
        }
        match p.status {
            PaymentStatus::Confirmed => {
                confirmed += 1;
                terminal += 1;
            }
            PaymentStatus::Failed => terminal += 1,
            PaymentStatus::Pending => {}
        }
    }
    if terminal == 0 {
        None
    } else {
        Some(confirmed as f64 / terminal as f64 * 100.0)
    }
}

pub fn compute_reliability(payments: &[PaymentRecord], now: DateTime<Utc>) -> f64 {
    let windows = [
        RELIABILITY_WINDOW_HOURS_SHORT,
        RELIABILITY_WINDOW_HOURS_MEDIUM,
        RELIABILITY_WINDOW_HOURS_LONG,
    ];

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (hours, weight) in windows.iter().zip(WINDOW_WEIGHTS) {
        if let Some(rate) = success_rate_within(payments, now, *hours) {
            weighted_sum += weight * rate;
            weight_total += weight;
        }
    }

    if weight_total <= 0.0 {
        return 50.0;
    }
    (weighted_sum / weight_total).clamp(0.0, 100.0)
}
