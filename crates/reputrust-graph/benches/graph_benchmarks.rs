//! Criterion benchmarks for reputrust-graph's two highest-share hot paths:
//! damped PageRank authority recompute and bounded BFS trust-path discovery.

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use reputrust_core::ids::{AgentId, EdgeSourceId, Hash256, ReceiptId};
use reputrust_core::types::{EdgeType, TrustEdge};
use reputrust_graph::authority::{compute_authority, GraphSnapshot};
use reputrust_graph::path::discover_path;

fn edge(from: AgentId, to: AgentId, weight: f64) -> TrustEdge {
    TrustEdge {
        from,
        to,
        edge_type: EdgeType::Vote,
        weight,
        categories: vec![],
        source: EdgeSourceId::Vote(ReceiptId {
            payer: from,
            payee: to,
            signature_hash: Hash256::of(format!("{from}-{to}")),
        }),
        active: true,
        updated_at: chrono::Utc::now(),
    }
}

/// A ring of `n` agents, each with two extra chords forward, so the graph
/// has enough cross-traffic to exercise more than one PageRank iteration.
fn ring_snapshot(n: usize) -> GraphSnapshot {
    let agents: Vec<AgentId> = (0..n as u64).map(AgentId).collect();
    let mut edges = Vec::with_capacity(n * 3);
    for i in 0..n {
        edges.push(edge(agents[i], agents[(i + 1) % n], 100.0));
        edges.push(edge(agents[i], agents[(i + 2) % n], 60.0));
        edges.push(edge(agents[i], agents[(i + 5) % n], 30.0));
    }
    GraphSnapshot {
        version: 1,
        active_agents: agents,
        edges,
    }
}

fn bench_authority_recompute(c: &mut Criterion) {
    let snapshot = ring_snapshot(500);
    c.bench_function("authority_recompute_500_agents", |b| {
        b.iter(|| compute_authority(black_box(&snapshot)))
    });
}

fn bench_trust_path(c: &mut Criterion) {
    // A chain just under the hop bound, so discovery has to walk the full
    // bounded-BFS frontier before finding the target.
    let chain: Vec<AgentId> = (0..=4).map(AgentId).collect();
    let mut by_from: HashMap<AgentId, Vec<TrustEdge>> = HashMap::new();
    for w in chain.windows(2) {
        by_from.entry(w[0]).or_default().push(edge(w[0], w[1], 85.0));
    }
    let from = chain[0];
    let to = *chain.last().unwrap();

    c.bench_function("trust_path_four_hops", |b| {
        b.iter(|| discover_path(black_box(from), black_box(to), black_box(&by_from)))
    });
}

criterion_group!(benches, bench_authority_recompute, bench_trust_path);
criterion_main!(benches);
