//! Shared test helpers for end-to-end and adversarial tests.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reputrust_core::amount::AmountMicros;
use reputrust_core::clock::FixedClock;
use reputrust_core::ids::{AgentId, Signature};
use reputrust_core::types::{PaymentStatus, Polarity, QualityScores, Receipt};
use reputrust_node::node::{Node, PaymentObservation, VoteSubmission};
use reputrust_node::NodeConfig;

/// Boot a node backed by a fresh temp directory and a manually-advanced
/// clock, so every test controls "now" instead of racing the wall clock.
pub async fn test_node() -> (Arc<Node>, Arc<FixedClock>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::at(1_700_000_000));
    let config = NodeConfig {
        data_dir: dir.path().to_path_buf(),
        ..NodeConfig::default()
    };
    let node = Node::with_clock(config, clock.clone()).await.unwrap();
    (node, clock, dir)
}

pub fn quality(response_quality: f64, response_speed: f64, accuracy: f64, professionalism: f64) -> QualityScores {
    QualityScores {
        response_quality,
        response_speed,
        accuracy,
        professionalism,
    }
}

/// Observe a confirmed payment from `payer_address` to `payee_address` and
/// return the receipt it materializes (panics if no receipt was created,
/// since every confirmed payment in these tests is expected to produce
/// one).
pub async fn confirm_payment(
    node: &Node,
    signature: &str,
    payer_address: &str,
    payee_address: &str,
    amount_micros: i64,
    timestamp: DateTime<Utc>,
) -> Receipt {
    node.observe_payment(PaymentObservation {
        signature: Signature::from(signature),
        payer_address: payer_address.to_string(),
        payee_address: payee_address.to_string(),
        amount: AmountMicros::new(amount_micros).unwrap(),
        currency: "USDC".to_string(),
        network: "base".to_string(),
        facilitator: "coinbase".to_string(),
        status: PaymentStatus::Confirmed,
        timestamp,
        endpoint: None,
    })
    .await
    .unwrap()
    .expect("confirmed payment yields a receipt")
}

/// Cast a payment-gated vote from whichever side of the receipt isn't
/// `voter_address`, since the protocol requires voter and subject to be
/// the receipt's two parties.
pub async fn cast_vote(
    node: &Node,
    receipt: &Receipt,
    voter_address: &str,
    subject_address: &str,
    polarity: Polarity,
    q: QualityScores,
) -> reputrust_core::types::Vote {
    node.submit_vote(VoteSubmission {
        receipt_id: receipt.id,
        voter_address: voter_address.to_string(),
        subject_address: subject_address.to_string(),
        polarity,
        quality: q,
        comment_hash: None,
    })
    .await
    .unwrap()
}

pub fn agent_id(node: &Node, address: &str) -> AgentId {
    node.lookup_address(address).expect("agent should be registered")
}

#[allow(dead_code)]
pub fn data_dir_of(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().to_path_buf()
}
