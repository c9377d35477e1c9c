//! Ties the authority pass and Sybil indicators together into the
//! per-agent [`AgentMetrics`] view the composite score pipeline reads.

use std::collections::HashMap;

use reputrust_core::ids::AgentId;
use reputrust_core::types::AgentMetrics;

use crate::authority::AuthorityPass;
use crate::sybil::SybilIndicators;

pub fn build_agent_metrics(
    pass: &AuthorityPass,
    degrees: &HashMap<AgentId, (u32, u32)>,
    sybil: &HashMap<AgentId, SybilIndicators>,
) -> Vec<AgentMetrics> {
    pass.results
        .iter()
        .map(|r| {
            let (in_degree, out_degree) = degrees.get(&r.agent_id).copied().unwrap_or((0, 0));
            let s = sybil.get(&r.agent_id).copied().unwrap_or(crate::sybil::SybilIndicators {
                diversity: 0.0,
                circular_count: 0,
                risk_score: 0.0,
            });
            AgentMetrics {
                agent_id: r.agent_id,
                pagerank: r.pagerank,
                pagerank_normalized: r.pagerank_normalized,
                in_degree,
                out_degree,
                endorser_diversity: s.diversity,
                circular_endorsement_count: s.circular_count,
                sybil_risk_score: s.risk_score,
                graph_version: pass.graph_version,
            }
        })
        .collect()
}
