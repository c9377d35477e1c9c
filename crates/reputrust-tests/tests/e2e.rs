//! End-to-end integration tests for the reputation & trust core.
//!
//! Each test boots a full in-process node against a temp RocksDB directory
//! and a [`FixedClock`], then drives it through its public async/sync
//! surface exactly as the RPC layer and CLI would.

use chrono::{Duration, TimeZone, Utc};
use reputrust_core::ids::EdgeSourceId;
use reputrust_core::types::{AlertSeverity, PaymentStatus, Polarity, Tier};
use reputrust_node::node::{EndorsementSubmission, PaymentObservation, UptoAuthorization};
use reputrust_core::amount::AmountMicros;
use reputrust_core::ids::Signature;
use reputrust_tests::helpers::*;

// ======================================================================
// Scenario 1: happy-path vote
// ======================================================================

#[tokio::test]
async fn happy_path_vote_weight_matches_worked_example() {
    let (node, _clock, _dir) = test_node().await;
    let ts = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
    let receipt = confirm_payment(&node, "sig-1", "payer-a", "payee-b", 50_000_000, ts).await;
    assert!(!receipt.vote_cast);

    let q = quality(95.0, 88.0, 92.0, 90.0);
    let vote = cast_vote(&node, &receipt, "payer-a", "payee-b", Polarity::Up, q).await;

    // 0.6 * 100 (up) + 0.4 * 91.25 (quality mean) = 96.5, rounds to 97.
    assert!((vote.weight - 97.0).abs() < 1e-9);
}

#[tokio::test]
async fn double_vote_on_the_same_receipt_is_rejected() {
    let (node, _clock, _dir) = test_node().await;
    let ts = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
    let receipt = confirm_payment(&node, "sig-2", "payer-a", "payee-b", 50_000_000, ts).await;

    let q = quality(80.0, 80.0, 80.0, 80.0);
    cast_vote(&node, &receipt, "payer-a", "payee-b", Polarity::Up, q).await;

    let err = node
        .submit_vote(reputrust_node::node::VoteSubmission {
            receipt_id: receipt.id,
            voter_address: "payer-a".to_string(),
            subject_address: "payee-b".to_string(),
            polarity: Polarity::Down,
            quality: q,
            comment_hash: None,
        })
        .await
        .expect_err("a receipt can only gate one vote");

    assert!(matches!(
        err,
        reputrust_node::NodeError::Core(reputrust_core::error::CoreError::ReceiptAlreadyUsed { .. })
    ));
}

#[tokio::test]
async fn vote_from_a_party_not_on_the_receipt_is_rejected() {
    let (node, _clock, _dir) = test_node().await;
    let ts = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
    let receipt = confirm_payment(&node, "sig-3", "payer-a", "payee-b", 50_000_000, ts).await;
    let q = quality(80.0, 80.0, 80.0, 80.0);

    let err = node
        .submit_vote(reputrust_node::node::VoteSubmission {
            receipt_id: receipt.id,
            voter_address: "some-stranger".to_string(),
            subject_address: "payee-b".to_string(),
            polarity: Polarity::Up,
            quality: q,
            comment_hash: None,
        })
        .await
        .expect_err("the voter must be one of the receipt's two parties");

    assert!(matches!(
        err,
        reputrust_node::NodeError::Core(reputrust_core::error::CoreError::PartiesMismatch)
    ));
}

// ======================================================================
// Scenario 2: upto-scheme accounting
// ======================================================================

#[tokio::test]
async fn upto_authorization_charges_accumulate_and_exhaust() {
    let (node, _clock, _dir) = test_node().await;
    // Register both parties first so the authorization resolves real agent ids.
    let ts = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
    confirm_payment(&node, "seed", "payer-a", "payee-b", 1, ts).await;

    let authorization_id = node
        .upto_authorize(UptoAuthorization {
            payer_address: "payer-a".to_string(),
            payee_address: "payee-b".to_string(),
            max_amount: AmountMicros::new(10_000).unwrap(),
            base_cost: AmountMicros::new(100).unwrap(),
            unit_cost: AmountMicros::new(5).unwrap(),
            unit_type: "token".to_string(),
            expires_at: None,
        })
        .unwrap();

    let after_first = node.upto_charge(authorization_id, 1000).unwrap();
    assert_eq!(after_first.used_amount, AmountMicros::new(5_100).unwrap());
    assert_eq!(after_first.remaining_amount, AmountMicros::new(4_900).unwrap());
    assert_eq!(after_first.status, reputrust_core::types::AuthorizationStatus::Active);

    // base_cost + unit_cost * 1500 = 7600, but only 4900 remains: capped.
    let after_second = node.upto_charge(authorization_id, 1500).unwrap();
    assert_eq!(after_second.used_amount, AmountMicros::new(10_000).unwrap());
    assert_eq!(after_second.remaining_amount, AmountMicros::ZERO);
    assert_eq!(after_second.status, reputrust_core::types::AuthorizationStatus::Exhausted);

    let err = node.upto_charge(authorization_id, 1).unwrap_err();
    assert!(matches!(
        err,
        reputrust_node::NodeError::Core(reputrust_core::error::CoreError::AuthorizationExhausted(_))
    ));
}

// ======================================================================
// Scenario 3: PageRank convergence over a 3-agent cycle
// ======================================================================

#[tokio::test]
async fn pagerank_converges_to_equal_authority_on_a_symmetric_cycle() {
    let (node, _clock, _dir) = test_node().await;
    let ts = Utc.timestamp_opt(1_700_000_100, 0).unwrap();

    // Endorse in a cycle: A -> B -> C -> A, equal confidence all the way
    // round, so the resulting PageRank distribution should be symmetric.
    for (issuer, subject) in [("a", "b"), ("b", "c"), ("c", "a")] {
        node.submit_endorsement(EndorsementSubmission {
            issuer_address: issuer.to_string(),
            subject_address: subject.to_string(),
            endorsement_type: "capability".to_string(),
            claim: "reliable-peer".to_string(),
            confidence: 100.0,
            evidence: None,
        })
        .await
        .unwrap();
    }
    let _ = ts;

    node.run_authority_recompute().unwrap();

    let a = agent_id(&node, "a");
    let b = agent_id(&node, "b");
    let c = agent_id(&node, "c");

    let ma = node.agent_metrics(a).expect("a has metrics after recompute");
    let mb = node.agent_metrics(b).expect("b has metrics after recompute");
    let mc = node.agent_metrics(c).expect("c has metrics after recompute");

    assert_eq!(ma.pagerank_normalized, mb.pagerank_normalized);
    assert_eq!(mb.pagerank_normalized, mc.pagerank_normalized);
    assert!(ma.pagerank_normalized > 0);
}

// ======================================================================
// Scenario 4: decayed trust path across three hops
// ======================================================================

#[tokio::test]
async fn trust_path_confidence_decays_across_hops() {
    let (node, _clock, _dir) = test_node().await;

    for (issuer, subject, confidence) in [("a", "b", 80.0), ("b", "c", 50.0), ("c", "d", 90.0)] {
        node.submit_endorsement(EndorsementSubmission {
            issuer_address: issuer.to_string(),
            subject_address: subject.to_string(),
            endorsement_type: "capability".to_string(),
            claim: "worked-together".to_string(),
            confidence,
            evidence: None,
        })
        .await
        .unwrap();
    }

    let a = agent_id(&node, "a");
    let d = agent_id(&node, "d");

    let path = node.trust_path(a, d).expect("a four-node chain is within the hop bound");
    assert_eq!(path.nodes.len(), 4);
    assert_eq!(path.hop_weights, vec![80.0, 50.0, 90.0]);
    // 100 * (0.7*0.8) * (0.7*0.5) * (0.7*0.9) = 12.348
    assert!((path.confidence - 12.348).abs() < 0.01);
}

// ======================================================================
// Scenario 5: anomaly detection on a success-rate drop
// ======================================================================

#[tokio::test]
async fn success_rate_drop_raises_a_medium_severity_alert() {
    let (node, clock, _dir) = test_node().await;
    let now = clock.now();

    // 18/20 confirmed in the 23h historical window (90%).
    for i in 0..20u32 {
        let status = if i < 18 { PaymentStatus::Confirmed } else { PaymentStatus::Failed };
        let ts = now - Duration::hours(2) - Duration::minutes(i as i64);
        node.observe_payment(PaymentObservation {
            signature: Signature::from(format!("hist-{i}")),
            payer_address: "payer-x".to_string(),
            payee_address: "payee-y".to_string(),
            amount: AmountMicros::new(1_000).unwrap(),
            currency: "USDC".to_string(),
            network: "base".to_string(),
            facilitator: "coinbase".to_string(),
            status,
            timestamp: ts,
            endpoint: None,
        })
        .await
        .unwrap();
    }

    clock.advance(3 * 3600);
    let now = clock.now();

    // 6/10 confirmed in the most recent hour (60%): a 30pp drop.
    for i in 0..10u32 {
        let status = if i < 6 { PaymentStatus::Confirmed } else { PaymentStatus::Failed };
        let ts = now - Duration::minutes(i as i64);
        node.observe_payment(PaymentObservation {
            signature: Signature::from(format!("recent-{i}")),
            payer_address: "payer-x".to_string(),
            payee_address: "payee-y".to_string(),
            amount: AmountMicros::new(1_000).unwrap(),
            currency: "USDC".to_string(),
            network: "base".to_string(),
            facilitator: "coinbase".to_string(),
            status,
            timestamp: ts,
            endpoint: None,
        })
        .await
        .unwrap();
    }

    node.run_anomaly_scan().unwrap();

    let alerts = node.recent_alerts();
    let payee = agent_id(&node, "payee-y");
    let alert = alerts
        .iter()
        .find(|a| a.subject == payee.to_string())
        .expect("the success-rate drop should have raised an alert");
    assert_eq!(alert.severity, AlertSeverity::Medium);
    assert!(!alert.resolved);
}

// ======================================================================
// Composite score / tier progression
// ======================================================================

#[tokio::test]
async fn repeated_high_quality_votes_lift_an_agent_into_a_higher_tier() {
    let (node, clock, _dir) = test_node().await;
    let q = quality(98.0, 95.0, 97.0, 96.0);

    for i in 0..12u32 {
        let ts = clock.now() + Duration::minutes(i as i64);
        let receipt = confirm_payment(&node, &format!("tier-sig-{i}"), "client", "provider", 10_000_000, ts).await;
        cast_vote(&node, &receipt, "client", "provider", Polarity::Up, q).await;
    }

    node.run_authority_recompute().unwrap();

    let provider = agent_id(&node, "provider");
    let agent = node.get_agent(provider).expect("provider is registered");
    assert!(agent.current_score > 0);
    assert!(agent.current_tier >= Tier::Bronze);
}

// ======================================================================
// Edge revocation removes the edge from future path discovery
// ======================================================================

#[tokio::test]
async fn revoking_an_endorsement_removes_it_from_trust_paths() {
    let (node, _clock, _dir) = test_node().await;

    node.submit_endorsement(EndorsementSubmission {
        issuer_address: "a".to_string(),
        subject_address: "b".to_string(),
        endorsement_type: "capability".to_string(),
        claim: "worked-together".to_string(),
        confidence: 90.0,
        evidence: None,
    })
    .await
    .unwrap();

    let a = agent_id(&node, "a");
    let b = agent_id(&node, "b");
    assert!(node.trust_path(a, b).is_none()); // direct edges aren't "paths"
    assert_eq!(node.direct_edge_weight(a, b), 90.0);

    let source = EdgeSourceId::Endorsement(1);
    node.revoke_edge(source).await.unwrap();

    assert_eq!(node.direct_edge_weight(a, b), 0.0);
}
