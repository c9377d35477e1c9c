//! `economic` sub-score: log-scaled cumulative and recent payment volume,
//! clipped so whales don't dominate the scale.

use chrono::{DateTime, Utc};
use reputrust_core::constants::ECONOMIC_VOLUME_CLIP_UNITS;
use reputrust_core::types::{PaymentRecord, PaymentStatus};

const RECENT_WINDOW_DAYS: i64 = 30;

fn log_scaled(volume_units: f64) -> f64 {
    let clip = ECONOMIC_VOLUME_CLIP_UNITS;
    (volume_units.max(0.0).ln_1p() / clip.ln_1p()).min(1.0) * 100.0
}

pub fn compute_economic(payments: &[PaymentRecord], now: DateTime<Utc>) -> f64 {
    let cutoff = now - chrono::Duration::days(RECENT_WINDOW_DAYS);
    let mut cumulative_micros = 0i64;
    let mut recent_micros = 0i64;
    for p in payments {
        if p.status != PaymentStatus::Confirmed {
            continue;
        }
        cumulative_micros += p.amount.micros();
        if p.timestamp >= cutoff {
            recent_micros += p.amount.micros();
        }
    }

    let cumulative_units = cumulative_micros as f64 / reputrust_core::amount::MICROS_PER_UNIT as f64;
    let recent_units = recent_micros as f64 / reputrust_core::amount::MICROS_PER_UNIT as f64;

    (0.5 * log_scaled(cumulative_units) + 0.5 * log_scaled(recent_units)).clamp(0.0, 100.0)
}
