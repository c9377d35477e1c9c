//! `social` sub-score: normalized PageRank authority, discounted by Sybil
//! risk before it ever reaches the composite weighting.

use reputrust_core::types::AgentMetrics;

const SUBSCORE_SYBIL_DISCOUNT: f64 = 0.5;

pub fn compute_social(metrics: &AgentMetrics) -> f64 {
    let base = metrics.pagerank_normalized as f64;
    let discount = 1.0 - SUBSCORE_SYBIL_DISCOUNT * (metrics.sybil_risk_score / 100.0);
    (base * discount).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reputrust_core::ids::AgentId;

    fn metrics(pagerank_normalized: u32, sybil_risk_score: f64) -> AgentMetrics {
        AgentMetrics {
            agent_id: AgentId(1),
            pagerank: 0.1,
            pagerank_normalized,
            in_degree: 1,
            out_degree: 1,
            endorser_diversity: 100.0,
            circular_endorsement_count: 0,
            sybil_risk_score,
            graph_version: 0,
        }
    }

    #[test]
    fn zero_sybil_risk_leaves_pagerank_unchanged() {
        assert_eq!(compute_social(&metrics(80, 0.0)), 80.0);
    }

    #[test]
    fn full_sybil_risk_halves_the_score() {
        assert_eq!(compute_social(&metrics(80, 100.0)), 40.0);
    }
}
