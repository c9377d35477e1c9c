//! Per-agent success-rate-drop and error-rate-spike checks.

use chrono::{DateTime, Duration, Utc};
use reputrust_core::constants::{
    ANOMALY_ERROR_RATE_HIGH_PCT, ANOMALY_ERROR_RATE_MIN_PCT, ANOMALY_ERROR_RATE_MULTIPLE,
    ANOMALY_HISTORICAL_MIN_TXS, ANOMALY_HISTORICAL_SUCCESS_RATE_MIN_PCT,
    ANOMALY_HISTORICAL_WINDOW_HOURS, ANOMALY_RECENT_MIN_TXS, ANOMALY_RECENT_WINDOW_HOURS,
    ANOMALY_SUCCESS_RATE_DROP_HIGH_PP, ANOMALY_SUCCESS_RATE_DROP_PP,
};
use reputrust_core::ids::AgentId;
use reputrust_core::types::{AlertSeverity, AlertType, PaymentRecord, PaymentStatus};

pub struct Finding {
    pub alert_type: AlertType,
    pub metric: &'static str,
    pub current: f64,
    pub historical: f64,
    pub change_percent: f64,
    pub severity: AlertSeverity,
}

struct WindowStats {
    total: u32,
    confirmed: u32,
    failed: u32,
}

fn stats_within(payments: &[PaymentRecord], start: DateTime<Utc>, end: DateTime<Utc>) -> WindowStats {
    let mut total = 0u32;
    let mut confirmed = 0u32;
    let mut failed = 0u32;
    for p in payments {
        if p.timestamp < start || p.timestamp >= end {
            continue;
        }
        if p.status == PaymentStatus::Pending {
            continue;
        }
        total += 1;
        match p.status {
            PaymentStatus::Confirmed => confirmed += 1,
            PaymentStatus::Failed => failed += 1,
            PaymentStatus::Pending => unreachable!(),
        }
    }
    WindowStats {
        total,
        confirmed,
        failed,
    }
}

/// Windows: "recent" is the last hour, "historical" is the 23 hours before
/// that, so together they cover a trailing 24h without overlap.
fn recent_and_historical(payments: &[PaymentRecord], now: DateTime<Utc>) -> (WindowStats, WindowStats) {
    let recent_start = now - Duration::hours(ANOMALY_RECENT_WINDOW_HOURS);
    let historical_start = recent_start - Duration::hours(ANOMALY_HISTORICAL_WINDOW_HOURS);
    (
        stats_within(payments, recent_start, now),
        stats_within(payments, historical_start, recent_start),
    )
}

pub fn check_success_rate_drop(_agent: AgentId, payments: &[PaymentRecord], now: DateTime<Utc>) -> Option<Finding> {
    let (recent, historical) = recent_and_historical(payments, now);
    if recent.total < ANOMALY_RECENT_MIN_TXS || historical.total < ANOMALY_HISTORICAL_MIN_TXS {
        return None;
    }

    let recent_rate = recent.confirmed as f64 / recent.total as f64 * 100.0;
    let historical_rate = historical.confirmed as f64 / historical.total as f64 * 100.0;
    if historical_rate <= ANOMALY_HISTORICAL_SUCCESS_RATE_MIN_PCT {
        return None;
    }

    let drop = historical_rate - recent_rate;
    if drop <= ANOMALY_SUCCESS_RATE_DROP_PP {
        return None;
    }

    let severity = if drop > ANOMALY_SUCCESS_RATE_DROP_HIGH_PP {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    };
    Some(Finding {
        alert_type: AlertType::SuccessRateDrop,
        metric: "success_rate",
        current: recent_rate,
        historical: historical_rate,
        change_percent: -drop,
        severity,
    })
}

pub fn check_error_rate_spike(_agent: AgentId, payments: &[PaymentRecord], now: DateTime<Utc>) -> Option<Finding> {
    let (recent, historical) = recent_and_historical(payments, now);
    if recent.total < ANOMALY_RECENT_MIN_TXS || historical.total < ANOMALY_HISTORICAL_MIN_TXS {
        return None;
    }

    let recent_rate = recent.failed as f64 / recent.total as f64 * 100.0;
    let historical_rate = historical.failed as f64 / historical.total as f64 * 100.0;

    if recent_rate <= ANOMALY_ERROR_RATE_MIN_PCT {
        return None;
    }
    if historical_rate > 0.0 && recent_rate <= historical_rate * ANOMALY_ERROR_RATE_MULTIPLE {
        return None;
    }

    let severity = if recent_rate > ANOMALY_ERROR_RATE_HIGH_PCT {
        AlertSeverity::High
    } else {
        AlertSeverity::Medium
    };
    Some(Finding {
        alert_type: AlertType::ErrorRateSpike,
        metric: "error_rate",
        current: recent_rate,
        historical: historical_rate,
        change_percent: recent_rate - historical_rate,
        severity,
    })
}
