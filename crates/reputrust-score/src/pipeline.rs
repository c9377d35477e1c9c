//! Wires the sub-score computations, the composition formula, and the
//! score-history log into a single per-agent recompute step.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reputrust_core::ids::AgentId;
use reputrust_core::types::{AgentMetrics, SubScores, Tier, TierChangeEvent};
use reputrust_graph::AgentRegistry;
use reputrust_ledger::{PaymentLedger, VoteIntake};

use crate::composite::{compose, tier_for_score};
use crate::economic::compute_economic;
use crate::history::ScoreHistoryStore;
use crate::quality::compute_quality;
use crate::reliability::compute_reliability;
use crate::social::compute_social;
use crate::trust::compute_trust;

pub struct RecomputeOutcome {
    pub sub_scores: SubScores,
    pub score: u32,
    pub tier: Tier,
    pub tier_change: Option<TierChangeEvent>,
}

/// Ties the ledger, vote intake, and agent registry together into the
/// composite-score recompute step. Authority (`pagerank_normalized`) and
/// Sybil indicators come in per-call via `AgentMetrics`, which the caller
/// refreshes from `reputrust-graph`'s authority pass on its own cadence.
pub struct ScorePipeline {
    ledger: Arc<PaymentLedger>,
    votes: Arc<VoteIntake>,
    registry: Arc<AgentRegistry>,
    history: ScoreHistoryStore,
}

impl ScorePipeline {
    pub fn new(ledger: Arc<PaymentLedger>, votes: Arc<VoteIntake>, registry: Arc<AgentRegistry>) -> Self {
        Self {
            ledger,
            votes,
            registry,
            history: ScoreHistoryStore::new(),
        }
    }

    /// Recompute one agent's composite score. `authority_of` resolves a
    /// voter's `pagerank_normalized`, used to weight the `trust` sub-score;
    /// it is expected to be backed by the same metrics snapshot as
    /// `metrics`.
    pub fn recompute_one(
        &self,
        metrics: &AgentMetrics,
        authority_of: impl Fn(AgentId) -> u32,
        now: DateTime<Utc>,
    ) -> RecomputeOutcome {
        let agent_id = metrics.agent_id;
        let received_votes = self.votes.votes_for_subject(agent_id);
        let payments = self.ledger.payments_for(agent_id);

        let sub_scores = SubScores {
            trust: compute_trust(&received_votes, authority_of),
            quality: compute_quality(&received_votes, now),
            reliability: compute_reliability(&payments, now),
            economic: compute_economic(&payments, now),
            social: compute_social(metrics),
        };

        let score = compose(&sub_scores, metrics.sybil_risk_score);
        let tier = tier_for_score(score);
        let tier_change = self.history.record(agent_id, score, tier, "recompute", now);
        self.registry.update_score(agent_id, score, tier);

        RecomputeOutcome {
            sub_scores,
            score,
            tier,
            tier_change,
        }
    }

    pub fn history_for(&self, agent_id: AgentId) -> Vec<reputrust_core::types::ScoreHistoryEntry> {
        self.history.history_for(agent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reputrust_core::clock::FixedClock;
    use reputrust_core::clock::Clock;
    use reputrust_graph::TrustGraphStore;

    fn metrics(agent_id: AgentId, pagerank_normalized: u32, sybil_risk_score: f64) -> AgentMetrics {
        AgentMetrics {
            agent_id,
            pagerank: 0.1,
            pagerank_normalized,
            in_degree: 0,
            out_degree: 0,
            endorser_diversity: 100.0,
            circular_endorsement_count: 0,
            sybil_risk_score,
            graph_version: 0,
        }
    }

    #[test]
    fn cold_start_agent_scores_at_the_neutral_midpoint() {
        let ledger = Arc::new(PaymentLedger::new());
        let graph = Arc::new(TrustGraphStore::new());
        let votes = Arc::new(VoteIntake::new(ledger.clone(), graph));
        let registry = Arc::new(AgentRegistry::new());
        let clock = FixedClock::default();
        let agent_id = registry.get_or_create("addr-a", &clock);

        let pipeline = ScorePipeline::new(ledger, votes, registry.clone());
        let m = metrics(agent_id, 0, 0.0);
        let outcome = pipeline.recompute_one(&m, |_| 0, clock.now());

        assert_eq!(outcome.tier, Tier::Bronze);
        assert!(outcome.tier_change.is_none(), "bronze is the implicit starting tier");
        assert_eq!(registry.get(agent_id).unwrap().current_tier, Tier::Bronze);
    }

    #[test]
    fn tier_change_is_reported_once() {
        let ledger = Arc::new(PaymentLedger::new());
        let graph = Arc::new(TrustGraphStore::new());
        let votes = Arc::new(VoteIntake::new(ledger.clone(), graph));
        let registry = Arc::new(AgentRegistry::new());
        let clock = FixedClock::default();
        let agent_id = registry.get_or_create("addr-a", &clock);
        let pipeline = ScorePipeline::new(ledger, votes, registry);

        let strong = metrics(agent_id, 90, 0.0);
        let first = pipeline.recompute_one(&strong, |_| 90, clock.now());
        assert!(first.tier_change.is_some());

        let second = pipeline.recompute_one(&strong, |_| 90, clock.now());
        assert!(second.tier_change.is_none());
    }
}
