//! Sybil-resistance indicators, computed per agent from its
//! active edge set.

use std::collections::HashSet;

use reputrust_core::constants::SYBIL_MIN_ENDORSER_DIVERSITY;
use reputrust_core::ids::AgentId;
use reputrust_core::types::TrustEdge;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SybilIndicators {
    pub diversity: f64,
    pub circular_count: u32,
    pub risk_score: f64,
}

/// Computes indicators for `agent` given the full active edge set. `O(E)`
/// per call; callers recomputing for every agent should pre-bucket edges
/// by endpoint rather than calling this in a naive `O(V*E)` loop.
pub fn compute_sybil_indicators(
    agent: AgentId,
    active_edges: &[TrustEdge],
    in_degree: u32,
    out_degree: u32,
) -> SybilIndicators {
    let unique_endorsers: HashSet<AgentId> = active_edges
        .iter()
        .filter(|e| e.to == agent)
        .map(|e| e.from)
        .collect();

    let diversity = (100.0 * unique_endorsers.len() as f64 / SYBIL_MIN_ENDORSER_DIVERSITY as f64)
        .min(100.0);

    let mut circular_count = 0u32;
    for &u in &unique_endorsers {
        let reciprocal = active_edges
            .iter()
            .any(|e| e.from == agent && e.to == u);
        if reciprocal {
            circular_count += 1;
        }
    }

    let mut risk = 0.0;
    if unique_endorsers.len() < SYBIL_MIN_ENDORSER_DIVERSITY {
        risk += 30.0;
    }
    risk += (10.0 * circular_count as f64).min(50.0);
    if in_degree > 10 && out_degree < 2 {
        risk += 20.0;
    }

    SybilIndicators {
        diversity,
        circular_count,
        risk_score: risk.clamp(0.0, 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reputrust_core::ids::{EdgeSourceId, Hash256, ReceiptId};
    use reputrust_core::types::EdgeType;

    fn edge(from: AgentId, to: AgentId) -> TrustEdge {
        TrustEdge {
            from,
            to,
            edge_type: EdgeType::Endorsement,
            weight: 100.0,
            categories: vec![],
            source: EdgeSourceId::Vote(ReceiptId {
                payer: from,
                payee: to,
                signature_hash: Hash256::of(format!("{from}-{to}")),
            }),
            active: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn two_agent_bidirectional_matches_boundary_scenario() {
        let a = AgentId(1);
        let b = AgentId(2);
        let edges = vec![edge(a, b), edge(b, a)];
        let indicators = compute_sybil_indicators(a, &edges, 1, 1);
        assert_eq!(indicators.circular_count, 1);
        assert!((indicators.diversity - 33.333).abs() < 0.01);
    }

    #[test]
    fn high_in_degree_low_out_degree_triggers_structural_penalty() {
        let a = AgentId(1);
        let edges: Vec<TrustEdge> = (2..=12).map(|i| edge(AgentId(i), a)).collect();
        let indicators = compute_sybil_indicators(a, &edges, 11, 0);
        assert!(indicators.risk_score >= 20.0);
    }

    #[test]
    fn isolated_agent_has_zero_diversity_and_max_low_diversity_penalty() {
        let a = AgentId(1);
        let indicators = compute_sybil_indicators(a, &[], 0, 0);
        assert_eq!(indicators.diversity, 0.0);
        assert_eq!(indicators.circular_count, 0);
        assert_eq!(indicators.risk_score, 30.0);
    }

    #[test]
    fn diversity_caps_at_100() {
        let a = AgentId(1);
        let edges: Vec<TrustEdge> = (2..=10).map(|i| edge(AgentId(i), a)).collect();
        let indicators = compute_sybil_indicators(a, &edges, 9, 0);
        assert_eq!(indicators.diversity, 100.0);
    }
}
