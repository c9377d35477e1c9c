//! Pinned numeric tunables, kept as named constants rather than runtime
//! config: these are protocol-level invariants, not operator knobs.

/// PageRank damping factor `d`.
pub const AUTHORITY_DAMPING: f64 = 0.85;

/// Maximum PageRank power-iteration rounds before giving up on convergence.
pub const AUTHORITY_MAX_ITERATIONS: u32 = 20;

/// Convergence threshold: iterate until the L1 delta between successive
/// vectors drops below this.
pub const AUTHORITY_CONVERGENCE_EPSILON: f64 = 1e-4;

/// Maximum hop count a bounded trust-path search will explore.
pub const TRUST_PATH_MAX_HOPS: u32 = 4;

/// Per-hop multiplicative confidence decay applied along a discovered path.
pub const TRUST_PATH_HOP_DECAY: f64 = 0.7;

/// Minimum distinct endorsers before an agent's endorsement diversity is
/// considered healthy rather than Sybil-suspicious.
pub const SYBIL_MIN_ENDORSER_DIVERSITY: usize = 3;

/// Composite score tier thresholds (inclusive lower bounds), on a 0-1000
/// scale.
pub const TIER_SILVER_MIN: u32 = 500;
pub const TIER_GOLD_MIN: u32 = 750;
pub const TIER_PLATINUM_MIN: u32 = 900;

/// Composite score sub-score weights (trust, quality, reliability, economic,
/// social). Must sum to 1.0.
pub const WEIGHT_TRUST: f64 = 0.25;
pub const WEIGHT_QUALITY: f64 = 0.25;
pub const WEIGHT_RELIABILITY: f64 = 0.20;
pub const WEIGHT_ECONOMIC: f64 = 0.15;
pub const WEIGHT_SOCIAL: f64 = 0.15;

/// Multiplicative Sybil-risk penalty applied to the composite score:
/// `overall *= 1 - SYBIL_PENALTY_FACTOR * sybil_risk/100`.
pub const SYBIL_PENALTY_FACTOR: f64 = 0.2;

/// Bayesian smoothing prior for the `trust` sub-score's positive-vote ratio
/// (added to both numerator and denominator to avoid overconfidence on
/// agents with few votes).
pub const TRUST_SMOOTHING_PRIOR: f64 = 5.0;

/// Votes older than this are excluded from the `quality` sub-score window.
pub const QUALITY_WINDOW_DAYS: i64 = 90;

/// Reliability sub-score lookback windows, in hours.
pub const RELIABILITY_WINDOW_HOURS_SHORT: i64 = 24;
pub const RELIABILITY_WINDOW_HOURS_MEDIUM: i64 = 24 * 7;
pub const RELIABILITY_WINDOW_HOURS_LONG: i64 = 24 * 30;

/// Economic sub-score log-scaling clip ceiling, in whole currency units.
pub const ECONOMIC_VOLUME_CLIP_UNITS: f64 = 1_000_000.0;

/// Rolling window width for anomaly detection, in number of observations.
pub const ANOMALY_WINDOW_SIZE: usize = 50;

/// Minimum observations in a window before anomaly checks activate, to
/// avoid false positives on cold-start agents.
pub const ANOMALY_MIN_WINDOW_SIZE: usize = 10;

/// Anomaly detector cadence.
pub const ANOMALY_PASS_INTERVAL_SECS: u64 = 5 * 60;

/// Agent success-rate-drop check: minimum recent/historical sample sizes and
/// lookback windows, in hours.
pub const ANOMALY_RECENT_WINDOW_HOURS: i64 = 1;
pub const ANOMALY_HISTORICAL_WINDOW_HOURS: i64 = 23;
pub const ANOMALY_RECENT_MIN_TXS: u32 = 5;
pub const ANOMALY_HISTORICAL_MIN_TXS: u32 = 10;
pub const ANOMALY_HISTORICAL_SUCCESS_RATE_MIN_PCT: f64 = 50.0;
/// Drop (in percentage points) that triggers a `medium` `SuccessRateDrop`.
pub const ANOMALY_SUCCESS_RATE_DROP_PP: f64 = 20.0;
/// Drop that escalates the alert to `high`.
pub const ANOMALY_SUCCESS_RATE_DROP_HIGH_PP: f64 = 40.0;

/// Agent error-rate-spike check: recent rate must exceed both this multiple
/// of the historical rate and this floor to fire.
pub const ANOMALY_ERROR_RATE_MULTIPLE: f64 = 2.0;
pub const ANOMALY_ERROR_RATE_MIN_PCT: f64 = 10.0;
/// Recent error rate that escalates the alert to `high`.
pub const ANOMALY_ERROR_RATE_HIGH_PCT: f64 = 30.0;

/// Network-wide volume anomaly: drop/spike thresholds relative to the same
/// hour one day prior.
pub const ANOMALY_VOLUME_DROP_PCT: f64 = 50.0;
pub const ANOMALY_VOLUME_DROP_HIGH_PCT: f64 = 75.0;
pub const ANOMALY_VOLUME_SPIKE_MULTIPLE: f64 = 3.0;
pub const ANOMALY_VOLUME_SPIKE_MIN_ABSOLUTE: u64 = 100;

/// Consecutive facilitator health-check failures before an outage alert
/// fires, and the stricter threshold that escalates it to `critical`.
pub const ANOMALY_FACILITATOR_FAILURES_MIN: u32 = 3;
pub const ANOMALY_FACILITATOR_FAILURES_CRITICAL: u32 = 5;

/// Facilitator-outage incident dedup window: a non-resolved incident for the
/// same facilitator within this window suppresses a new alert.
pub const FACILITATOR_INCIDENT_DEDUP_WINDOW_SECS: i64 = 6 * 60 * 60;

/// Time-to-live for cached transitive-trust and path-discovery results.
pub const TRUST_CACHE_TTL_SECS: i64 = 24 * 60 * 60;

/// Quality axis value above which a vote's edge gains a descriptive
/// category tag (e.g. `"high_accuracy"`).
pub const QUALITY_TAG_THRESHOLD: f64 = 80.0;

/// Alert deduplication window: a repeat of the same incident within this
/// window is folded into the existing alert rather than opening a new one.
pub const ALERT_DEDUP_WINDOW_SECS: i64 = 60 * 60;
