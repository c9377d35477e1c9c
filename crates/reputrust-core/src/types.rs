//! Entity model shared across the workspace. These are plain data types;
//! the invariants named in their doc comments are enforced by the crates
//! that mutate them (`reputrust-ledger`, `reputrust-graph`, `reputrust-score`,
//! `reputrust-anomaly`), not by the types themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::AmountMicros;
use crate::ids::{AgentId, BatchId, EdgeSourceId, Hash256, ReceiptId, Signature, SubscriptionId};

/// A tag string for categories, networks, currencies, capability names,
/// and similar open-ended vocabulary the core never branches on.
pub type Tag = String;

// ---------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Agent {
    pub agent_id: AgentId,
    pub address: String,
    pub display_name: Option<String>,
    pub category: Option<Tag>,
    pub capabilities: Vec<Tag>,
    pub active: bool,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_score: u32,
    pub current_tier: Tier,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    /// Canonical thresholds: silver >= 500, gold >= 750,
    /// platinum >= 900, else bronze.
    pub fn for_score(score: u32) -> Self {
        use crate::constants::{TIER_GOLD_MIN, TIER_PLATINUM_MIN, TIER_SILVER_MIN};
        if score >= TIER_PLATINUM_MIN {
            Tier::Platinum
        } else if score >= TIER_GOLD_MIN {
            Tier::Gold
        } else if score >= TIER_SILVER_MIN {
            Tier::Silver
        } else {
            Tier::Bronze
        }
    }
}

// ---------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PaymentRecord {
    pub signature: Signature,
    pub payer_address: String,
    pub payee_address: String,
    pub amount: AmountMicros,
    pub currency: Tag,
    pub network: Tag,
    pub facilitator: Tag,
    pub status: PaymentStatus,
    pub timestamp: DateTime<Utc>,
    pub endpoint: Option<String>,
}

/// Derived from exactly one confirmed [`PaymentRecord`]. `vote_cast` is
/// monotonic: false -> true exactly once.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Receipt {
    pub id: ReceiptId,
    pub amount: AmountMicros,
    pub content_category: Option<Tag>,
    pub created_at: DateTime<Utc>,
    pub vote_cast: bool,
}

// ---------------------------------------------------------------------
// Votes & endorsements
// ---------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    Up,
    Down,
}

impl Polarity {
    /// `polarity_weight`: 100 for up, 0 for down.
    pub fn weight(self) -> f64 {
        match self {
            Polarity::Up => 100.0,
            Polarity::Down => 0.0,
        }
    }
}

/// The four quality axes, each in `[0, 100]`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct QualityScores {
    pub response_quality: f64,
    pub response_speed: f64,
    pub accuracy: f64,
    pub professionalism: f64,
}

impl QualityScores {
    pub fn mean(&self) -> f64 {
        (self.response_quality + self.response_speed + self.accuracy + self.professionalism) / 4.0
    }

    pub fn all_in_range(&self) -> bool {
        [
            self.response_quality,
            self.response_speed,
            self.accuracy,
            self.professionalism,
        ]
        .into_iter()
        .all(|v| (0.0..=100.0).contains(&v))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Vote {
    pub receipt_id: ReceiptId,
    pub voter: AgentId,
    pub subject: AgentId,
    pub polarity: Polarity,
    pub quality: QualityScores,
    pub comment_hash: Option<Hash256>,
    /// Derived from the voter's current composite score at submission time.
    pub weight: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Endorsement {
    pub id: u64,
    pub endorsement_type: Tag,
    pub claim: String,
    pub confidence: f64,
    pub issuer: AgentId,
    pub subject: AgentId,
    pub active: bool,
    pub issued_at: DateTime<Utc>,
    pub evidence: Option<String>,
}

// ---------------------------------------------------------------------
// Trust graph
// ---------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeType {
    Vote,
    Endorsement,
    Attestation,
    Transaction,
    Computed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrustEdge {
    pub from: AgentId,
    pub to: AgentId,
    pub edge_type: EdgeType,
    pub weight: f64,
    pub categories: Vec<Tag>,
    pub source: EdgeSourceId,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrustPath {
    pub from: AgentId,
    pub to: AgentId,
    pub nodes: Vec<AgentId>,
    pub hop_weights: Vec<f64>,
    pub confidence: f64,
    pub calculated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// The graph version this path was computed against; entries from a
    /// stale version are invalid even if not yet expired.
    pub graph_version: u64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct AgentMetrics {
    pub agent_id: AgentId,
    pub pagerank: f64,
    pub pagerank_normalized: u32,
    pub in_degree: u32,
    pub out_degree: u32,
    pub endorser_diversity: f64,
    pub circular_endorsement_count: u32,
    pub sybil_risk_score: f64,
    pub graph_version: u64,
}

// ---------------------------------------------------------------------
// Score history
// ---------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScoreHistoryEntry {
    pub agent_id: AgentId,
    pub score: u32,
    pub tier: Tier,
    pub reason: Tag,
    pub timestamp: DateTime<Utc>,
}

/// Emitted whenever a recompute moves an agent across a tier boundary.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TierChangeEvent {
    pub agent_id: AgentId,
    pub from_tier: Tier,
    pub to_tier: Tier,
    pub score: u32,
    pub timestamp: DateTime<Utc>,
}

/// The five queryable sub-scores behind a composite score, each in
/// `[0, 100]`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SubScores {
    pub trust: f64,
    pub quality: f64,
    pub reliability: f64,
    pub economic: f64,
    pub social: f64,
}

// ---------------------------------------------------------------------
// Payment-scheme accounting
// ---------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Active,
    Exhausted,
    Expired,
    Revoked,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PaymentAuthorization {
    pub authorization_id: crate::ids::AuthorizationId,
    pub payer: AgentId,
    pub payee: AgentId,
    pub max_amount: AmountMicros,
    pub used_amount: AmountMicros,
    pub remaining_amount: AmountMicros,
    pub base_cost: AmountMicros,
    pub unit_cost: AmountMicros,
    pub unit_type: Tag,
    pub status: AuthorizationStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Paused,
    Cancelled,
    Expired,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Subscription {
    pub subscription_id: SubscriptionId,
    pub subscriber: AgentId,
    pub provider: AgentId,
    pub amount: AmountMicros,
    pub period_seconds: i64,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub auto_renew: bool,
    pub renewal_count: u32,
    pub grace_seconds: i64,
    pub trial_end: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchMode {
    Atomic,
    BestEffort,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Partial,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchItemStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BatchItem {
    pub recipient: AgentId,
    pub amount: AmountMicros,
    pub status: BatchItemStatus,
    pub tx_signature: Option<Signature>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Batch {
    pub batch_id: BatchId,
    pub initiator: AgentId,
    pub total_amount: AmountMicros,
    pub mode: BatchMode,
    pub items: Vec<BatchItem>,
    pub success_count: u32,
    pub failed_count: u32,
    pub status: BatchStatus,
}

// ---------------------------------------------------------------------
// Facilitator health & anomaly alerts
// ---------------------------------------------------------------------

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacilitatorStatus {
    Online,
    Degraded,
    Offline,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FacilitatorHealthSample {
    pub facilitator: Tag,
    pub status: FacilitatorStatus,
    pub latency_ms: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertSeverity {
    Medium,
    High,
    Critical,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertType {
    SuccessRateDrop,
    ErrorRateSpike,
    VolumeAnomaly,
    FacilitatorOutage,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Alert {
    pub id: u64,
    pub alert_type: AlertType,
    pub subject: Tag,
    pub metric: Tag,
    pub current: f64,
    pub historical: f64,
    pub change_percent: f64,
    pub severity: AlertSeverity,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
}

/// Per-task bookkeeping for the scheduler: last tick, last success, last
/// error, so a failed periodic pass is isolated and observable rather than
/// halting the process.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SchedulerHealth {
    pub task_name: Tag,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_duration_ms: Option<u64>,
    pub run_count: u64,
    pub skip_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds_match_spec() {
        assert_eq!(Tier::for_score(0), Tier::Bronze);
        assert_eq!(Tier::for_score(499), Tier::Bronze);
        assert_eq!(Tier::for_score(500), Tier::Silver);
        assert_eq!(Tier::for_score(749), Tier::Silver);
        assert_eq!(Tier::for_score(750), Tier::Gold);
        assert_eq!(Tier::for_score(899), Tier::Gold);
        assert_eq!(Tier::for_score(900), Tier::Platinum);
        assert_eq!(Tier::for_score(1000), Tier::Platinum);
    }

    #[test]
    fn quality_scores_mean_matches_happy_path_scenario() {
        let q = QualityScores {
            response_quality: 95.0,
            response_speed: 88.0,
            accuracy: 92.0,
            professionalism: 90.0,
        };
        assert!((q.mean() - 91.25).abs() < 1e-9);
        assert!(q.all_in_range());
    }

    #[test]
    fn polarity_weights_match_spec() {
        assert_eq!(Polarity::Up.weight(), 100.0);
        assert_eq!(Polarity::Down.weight(), 0.0);
    }
}
