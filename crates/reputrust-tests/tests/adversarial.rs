//! Property-based tests attempting to break invariants of the pure
//! numeric engines (composite scoring, PageRank authority, trust-path
//! decay, fixed-point amounts) under randomized inputs.

use proptest::prelude::*;
use reputrust_core::amount::AmountMicros;
use reputrust_core::ids::{AgentId, EdgeSourceId, Hash256, ReceiptId};
use reputrust_core::types::{EdgeType, SubScores, TrustEdge};
use reputrust_graph::authority::{compute_authority, GraphSnapshot};
use reputrust_graph::path::{discover_path, transitive_trust};
use reputrust_score::compose;

fn arb_subscore() -> impl Strategy<Value = f64> {
    0.0f64..=100.0
}

fn arb_subscores() -> impl Strategy<Value = SubScores> {
    (arb_subscore(), arb_subscore(), arb_subscore(), arb_subscore(), arb_subscore()).prop_map(
        |(trust, quality, reliability, economic, social)| SubScores {
            trust,
            quality,
            reliability,
            economic,
            social,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The composite score never leaves the four-tier range [0, 1000],
    /// regardless of input mix or how much Sybil-risk penalty is applied.
    #[test]
    fn composite_score_never_leaves_its_declared_range(sub in arb_subscores(), sybil_risk in 0.0f64..=100.0) {
        let score = compose(&sub, sybil_risk);
        prop_assert!(score <= 1000);
    }

    /// Raising the Sybil-risk penalty can only ever push the score down,
    /// never up, for the same underlying sub-scores.
    #[test]
    fn higher_sybil_risk_never_increases_the_score(sub in arb_subscores(), low in 0.0f64..=50.0, delta in 0.0f64..=50.0) {
        let high = low + delta;
        let score_low = compose(&sub, low);
        let score_high = compose(&sub, high);
        prop_assert!(score_high <= score_low);
    }

    /// `AmountMicros::new` rejects every negative value and accepts every
    /// non-negative one, with no silent clamping in either direction.
    #[test]
    fn amount_micros_rejects_only_negatives(v in i64::MIN..=i64::MAX) {
        match AmountMicros::new(v) {
            Ok(amount) => {
                prop_assert!(v >= 0);
                prop_assert_eq!(amount.micros(), v);
            }
            Err(_) => prop_assert!(v < 0),
        }
    }

    /// Trust-path confidence only ever shrinks (or holds, at weight 100)
    /// hop over hop; it can never exceed the single-hop ceiling of 100.
    #[test]
    fn transitive_trust_is_bounded_by_its_inputs(direct in 0.0f64..=100.0, transitive in 0.0f64..=100.0) {
        let blended = transitive_trust(direct, transitive);
        prop_assert!((0.0..=100.0).contains(&blended));
    }

    /// A three-node chain's discovered confidence is strictly the product
    /// of each hop's decayed weight: it can never exceed 100 and is zero
    /// only when some hop weight is zero.
    #[test]
    fn chain_path_confidence_matches_the_decay_formula(w1 in 1.0f64..=100.0, w2 in 1.0f64..=100.0) {
        let a = AgentId(1);
        let b = AgentId(2);
        let c = AgentId(3);
        let edges = [
            (a, make_edge(a, b, w1)),
            (b, make_edge(b, c, w2)),
        ];
        let mut by_from = std::collections::HashMap::new();
        for (from, edge) in edges {
            by_from.entry(from).or_insert_with(Vec::new).push(edge);
        }
        let (path, weights, confidence) = discover_path(a, c, &by_from).unwrap();
        prop_assert_eq!(path, vec![a, b, c]);
        prop_assert_eq!(weights, vec![w1, w2]);
        let expected = 100.0 * (0.7 * w1 / 100.0) * (0.7 * w2 / 100.0);
        prop_assert!((confidence - expected).abs() < 1e-6);
        prop_assert!(confidence <= 100.0 + 1e-9);
    }
}

fn make_edge(from: AgentId, to: AgentId, weight: f64) -> TrustEdge {
    TrustEdge {
        from,
        to,
        edge_type: EdgeType::Endorsement,
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

/// Damped PageRank never assigns negative or NaN authority, and the raw
/// scores always sum close to 1.0 regardless of the graph's shape: the
/// damping factor redistributes mass, it never creates or destroys it.
#[test]
fn pagerank_mass_is_conserved_across_random_cycles() {
    for cycle_len in 2..=8usize {
        let agents: Vec<AgentId> = (0..cycle_len as u64).map(AgentId).collect();
        let edges: Vec<TrustEdge> = (0..cycle_len)
            .map(|i| make_edge(agents[i], agents[(i + 1) % cycle_len], 100.0))
            .collect();
        let snapshot = GraphSnapshot {
            version: 1,
            active_agents: agents.clone(),
            edges,
        };
        let pass = compute_authority(&snapshot);
        let total: f64 = pass.results.iter().map(|r| r.pagerank).sum();
        assert!((total - 1.0).abs() < 1e-3, "cycle_len={cycle_len} total={total}");
        for r in &pass.results {
            assert!(r.pagerank.is_finite());
            assert!(r.pagerank >= 0.0);
        }
    }
}

/// An isolated agent (no in- or out-edges) still receives its teleport
/// share rather than being dropped from the result set.
#[test]
fn isolated_agents_still_receive_teleport_mass() {
    let agents = vec![AgentId(1), AgentId(2), AgentId(3)];
    let edges = vec![make_edge(AgentId(1), AgentId(2), 100.0)];
    let snapshot = GraphSnapshot {
        version: 1,
        active_agents: agents,
        edges,
    };
    let pass = compute_authority(&snapshot);
    assert_eq!(pass.results.len(), 3);
    let isolated = pass.results.iter().find(|r| r.agent_id == AgentId(3)).unwrap();
    assert!(isolated.pagerank > 0.0);
}
