//! Damped PageRank authority engine.
//!
//! A pure function over a graph snapshot: no IO, fully unit- and
//! property-testable as a stateless numeric engine over a fixed input.

use std::collections::HashMap;

use reputrust_core::constants::{
    AUTHORITY_CONVERGENCE_EPSILON, AUTHORITY_DAMPING, AUTHORITY_MAX_ITERATIONS,
};
use reputrust_core::ids::AgentId;
use reputrust_core::types::TrustEdge;

/// An immutable view of the active graph fed to one authority pass.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub version: u64,
    pub active_agents: Vec<AgentId>,
    pub edges: Vec<TrustEdge>,
}

/// Per-agent raw and normalized authority, plus the iteration count it took
/// to reach the snapshot's result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthorityResult {
    pub agent_id: AgentId,
    pub pagerank: f64,
    pub pagerank_normalized: u32,
}

/// Outcome of one authority pass.
#[derive(Debug, Clone)]
pub struct AuthorityPass {
    pub results: Vec<AuthorityResult>,
    pub iterations: u32,
    pub converged: bool,
    pub graph_version: u64,
}

/// Compute damped PageRank over `snapshot`. Deactivated/unknown agents are
/// never part of `active_agents` and are assigned `pagerank = 0` by the
/// caller, not by this function.
pub fn compute_authority(snapshot: &GraphSnapshot) -> AuthorityPass {
    let n = snapshot.active_agents.len();
    if n == 0 {
        return AuthorityPass {
            results: Vec::new(),
            iterations: 0,
            converged: true,
            graph_version: snapshot.version,
        };
    }

    let d = AUTHORITY_DAMPING;
    let teleport = (1.0 - d) / n as f64;

    // Outgoing edges grouped by source, weight already divided by 100.
    let mut out_edges: HashMap<AgentId, Vec<(AgentId, f64)>> = HashMap::new();
    for edge in &snapshot.edges {
        out_edges
            .entry(edge.from)
            .or_default()
            .push((edge.to, edge.weight / 100.0));
    }
    let out_count: HashMap<AgentId, usize> = out_edges
        .iter()
        .map(|(&from, edges)| (from, edges.len()))
        .collect();

    // Incoming edges grouped by target, for the per-vertex update sum.
    let mut in_edges: HashMap<AgentId, Vec<(AgentId, f64)>> = HashMap::new();
    for edge in &snapshot.edges {
        in_edges
            .entry(edge.to)
            .or_default()
            .push((edge.from, edge.weight / 100.0));
    }

    let mut scores: HashMap<AgentId, f64> = snapshot
        .active_agents
        .iter()
        .map(|&a| (a, 1.0 / n as f64))
        .collect();

    let mut converged = false;
    let mut iterations = 0;
    for _ in 0..AUTHORITY_MAX_ITERATIONS {
        iterations += 1;
        let mut next: HashMap<AgentId, f64> = HashMap::with_capacity(n);
        let mut max_delta = 0.0_f64;

        for &v in &snapshot.active_agents {
            let mut inbound_sum = 0.0;
            if let Some(incoming) = in_edges.get(&v) {
                for &(u, w) in incoming {
                    let r_u = *scores.get(&u).unwrap_or(&0.0);
                    let out_count_u = (*out_count.get(&u).unwrap_or(&0)).max(1) as f64;
                    inbound_sum += r_u * w / out_count_u;
                }
            }
            let r_next = teleport + d * inbound_sum;
            let prev = *scores.get(&v).unwrap_or(&0.0);
            max_delta = max_delta.max((r_next - prev).abs());
            next.insert(v, r_next);
        }

        scores = next;
        if max_delta < AUTHORITY_CONVERGENCE_EPSILON {
            converged = true;
            break;
        }
    }

    // The iterate only sums to 1 by construction when every out-edge carries
    // the full weight of 100; for mixed weights the per-vertex update divides
    // by out-count rather than out-weight-sum, so the mass must be
    // renormalized here to satisfy the sum-to-one invariant (spec.md §4.4,
    // §8).
    let total: f64 = scores.values().sum();
    let total = if total > 0.0 { total } else { 1.0 };

    let results = snapshot
        .active_agents
        .iter()
        .map(|&agent_id| {
            let pagerank = *scores.get(&agent_id).unwrap_or(&0.0) / total;
            let normalized = (pagerank * n as f64 * 100.0).round().max(0.0) as u32;
            AuthorityResult {
                agent_id,
                pagerank,
                pagerank_normalized: normalized,
            }
        })
        .collect();

    AuthorityPass {
        results,
        iterations,
        converged,
        graph_version: snapshot.version,
    }
}
