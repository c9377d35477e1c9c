//! Vote & Endorsement Intake.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use reputrust_core::constants::QUALITY_TAG_THRESHOLD;
use reputrust_core::error::CoreError;
use reputrust_core::ids::{AgentId, EdgeSourceId, Hash256, ReceiptId};
use reputrust_core::types::{Endorsement, EdgeType, Polarity, QualityScores, Vote};
use reputrust_graph::TrustGraphStore;

use crate::error::LedgerError;
use crate::receipts::PaymentLedger;

/// Validates and persists votes and endorsements, and maintains the
/// corresponding `TrustEdge`s in the shared graph store.
pub struct VoteIntake {
    ledger: Arc<PaymentLedger>,
    graph: Arc<TrustGraphStore>,
    votes: DashMap<ReceiptId, Vote>,
    votes_by_subject: DashMap<AgentId, Vec<ReceiptId>>,
    endorsements: DashMap<u64, Endorsement>,
    next_endorsement_id: AtomicU64,
}

fn quality_categories(quality: &QualityScores) -> Vec<String> {
    let mut tags = Vec::new();
    if quality.response_quality >= QUALITY_TAG_THRESHOLD {
        tags.push("high_response_quality".to_string());
    }
    if quality.response_speed >= QUALITY_TAG_THRESHOLD {
        tags.push("high_response_speed".to_string());
    }
    if quality.accuracy >= QUALITY_TAG_THRESHOLD {
        tags.push("high_accuracy".to_string());
    }
    if quality.professionalism >= QUALITY_TAG_THRESHOLD {
        tags.push("high_professionalism".to_string());
    }
    tags
}

impl VoteIntake {
    pub fn new(ledger: Arc<PaymentLedger>, graph: Arc<TrustGraphStore>) -> Self {
        Self {
            ledger,
            graph,
            votes: DashMap::new(),
            votes_by_subject: DashMap::new(),
            endorsements: DashMap::new(),
            next_endorsement_id: AtomicU64::new(1),
        }
    }

    /// `voter` and `subject` must already be resolved to ids and must be
    /// the two parties of `receipt_id`. Weight is
    /// `0.6*polarity_weight + 0.4*mean(quality)`, rounded to the nearest
    /// integer.
    pub fn submit_vote(
        &self,
        receipt_id: ReceiptId,
        voter: AgentId,
        subject: AgentId,
        polarity: Polarity,
        quality: QualityScores,
        comment_hash: Option<Hash256>,
    ) -> Result<Vote, LedgerError> {
        if voter == subject {
            return Err(CoreError::InvalidRange {
                field: "subject",
                reason: "voter and subject must be distinct".to_string(),
            }
            .into());
        }
        if !quality.all_in_range() {
            return Err(CoreError::InvalidRange {
                field: "quality",
                reason: "each quality axis must be in [0, 100]".to_string(),
            }
            .into());
        }
        let parties_match = (voter == receipt_id.payer && subject == receipt_id.payee)
            || (voter == receipt_id.payee && subject == receipt_id.payer);
        if !parties_match {
            return Err(CoreError::PartiesMismatch.into());
        }

        self.ledger.mark_vote_cast(&receipt_id)?;

        let weight = (0.6 * polarity.weight() + 0.4 * quality.mean()).round();
        let vote = Vote {
            receipt_id,
            voter,
            subject,
            polarity,
            quality,
            comment_hash,
            weight,
            timestamp: Utc::now(),
        };
        self.votes.insert(receipt_id, vote.clone());
        self.votes_by_subject.entry(subject).or_default().push(receipt_id);

        self.graph.upsert_edge(
            voter,
            subject,
            EdgeType::Vote,
            weight,
            quality_categories(&quality),
            EdgeSourceId::Vote(receipt_id),
        )?;

        Ok(vote)
    }

    pub fn submit_endorsement(
        &self,
        issuer: AgentId,
        subject: AgentId,
        endorsement_type: String,
        claim: String,
        confidence: f64,
        evidence: Option<String>,
    ) -> Result<Endorsement, LedgerError> {
        if issuer == subject {
            return Err(CoreError::InvalidRange {
                field: "subject",
                reason: "issuer and subject must be distinct".to_string(),
            }
            .into());
        }
        if !(0.0..=100.0).contains(&confidence) {
            return Err(CoreError::InvalidRange {
                field: "confidence",
                reason: "confidence must be in [0, 100]".to_string(),
            }
            .into());
        }

        let id = self.next_endorsement_id.fetch_add(1, Ordering::SeqCst);
        let endorsement = Endorsement {
            id,
            endorsement_type,
            claim,
            confidence,
            issuer,
            subject,
            active: true,
            issued_at: Utc::now(),
            evidence,
        };
        self.endorsements.insert(id, endorsement.clone());

        self.graph.upsert_edge(
            issuer,
            subject,
            EdgeType::Endorsement,
            confidence,
            Vec::new(),
            EdgeSourceId::Endorsement(id),
        )?;

        Ok(endorsement)
    }

    /// Revoke the edge (and underlying record) behind `source`.
    /// Irreversible: resubmission creates a new edge.
    pub fn revoke(&self, source: EdgeSourceId) -> Result<(), LedgerError> {
        if let EdgeSourceId::Endorsement(id) = source {
            if let Some(mut e) = self.endorsements.get_mut(&id) {
                e.active = false;
            }
        }
        self.graph.deactivate_by_source(source)?;
        Ok(())
    }

    pub fn vote_for_receipt(&self, receipt_id: &ReceiptId) -> Option<Vote> {
        self.votes.get(receipt_id).map(|e| e.clone())
    }

    /// Every vote received by `subject`, in submission order. Feeds the
    /// `trust` and `quality` sub-scores.
    pub fn votes_for_subject(&self, subject: AgentId) -> Vec<Vote> {
        match self.votes_by_subject.get(&subject) {
            Some(ids) => ids.iter().filter_map(|id| self.votes.get(id).map(|e| e.clone())).collect(),
            None => Vec::new(),
        }
    }

    pub fn endorsement(&self, id: u64) -> Option<Endorsement> {
        self.endorsements.get(&id).map(|e| e.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reputrust_core::ids::Signature;
    use reputrust_core::types::{PaymentRecord, PaymentStatus, Tag};
    use reputrust_core::amount::AmountMicros;

    fn quality(rq: f64, rs: f64, acc: f64, prof: f64) -> QualityScores {
        QualityScores {
            response_quality: rq,
            response_speed: rs,
            accuracy: acc,
            professionalism: prof,
        }
    }

    fn setup() -> (Arc<PaymentLedger>, Arc<TrustGraphStore>, VoteIntake, ReceiptId) {
        let ledger = Arc::new(PaymentLedger::new());
        let graph = Arc::new(TrustGraphStore::new());
        let a = AgentId(1);
        let b = AgentId(2);
        let sig = Signature::from("S1");
        let record = PaymentRecord {
            signature: sig.clone(),
            payer_address: "ADDR_A".into(),
            payee_address: "ADDR_B".into(),
            amount: AmountMicros::new(78_000_000).unwrap(),
            currency: Tag::from("USDC"),
            network: Tag::from("base"),
            facilitator: Tag::from("x402"),
            status: PaymentStatus::Confirmed,
            timestamp: Utc::now(),
            endpoint: None,
        };
        let receipt = ledger
            .observe(sig, a, "ADDR_A", b, "ADDR_B", record)
            .unwrap()
            .unwrap();
        let intake = VoteIntake::new(ledger.clone(), graph.clone());
        (ledger, graph, intake, receipt.id)
    }

    #[test]
    fn happy_path_vote_matches_scenario_one() {
        let (_ledger, graph, intake, receipt_id) = setup();
        let vote = intake
            .submit_vote(
                receipt_id,
                receipt_id.payer,
                receipt_id.payee,
                Polarity::Up,
                quality(95.0, 88.0, 92.0, 90.0),
                None,
            )
            .unwrap();
        assert_eq!(vote.weight, 97.0);
        let edge = graph
            .active_edge(receipt_id.payer, receipt_id.payee, EdgeType::Vote)
            .unwrap();
        assert_eq!(edge.weight, 97.0);
    }

    #[test]
    fn double_vote_is_rejected() {
        let (_ledger, _graph, intake, receipt_id) = setup();
        intake
            .submit_vote(
                receipt_id,
                receipt_id.payer,
                receipt_id.payee,
                Polarity::Up,
                quality(95.0, 88.0, 92.0, 90.0),
                None,
            )
            .unwrap();
        let err = intake
            .submit_vote(
                receipt_id,
                receipt_id.payer,
                receipt_id.payee,
                Polarity::Up,
                quality(95.0, 88.0, 92.0, 90.0),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::ReceiptAlreadyUsed { .. })));
    }

    #[test]
    fn parties_mismatch_is_rejected() {
        let (_ledger, _graph, intake, receipt_id) = setup();
        let err = intake
            .submit_vote(
                receipt_id,
                AgentId(99),
                receipt_id.payee,
                Polarity::Up,
                quality(50.0, 50.0, 50.0, 50.0),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::PartiesMismatch)));
    }

    #[test]
    fn votes_for_subject_returns_received_votes() {
        let (_ledger, _graph, intake, receipt_id) = setup();
        intake
            .submit_vote(
                receipt_id,
                receipt_id.payer,
                receipt_id.payee,
                Polarity::Up,
                quality(95.0, 88.0, 92.0, 90.0),
                None,
            )
            .unwrap();
        let received = intake.votes_for_subject(receipt_id.payee);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].subject, receipt_id.payee);
        assert!(intake.votes_for_subject(receipt_id.payer).is_empty());
    }

    #[test]
    fn revoke_then_resubmit_endorsement_leaves_one_active() {
        let (_ledger, graph, intake, _receipt_id) = setup();
        let a = AgentId(1);
        let b = AgentId(2);
        let e1 = intake
            .submit_endorsement(a, b, "skill".into(), "claim".into(), 80.0, None)
            .unwrap();
        intake.revoke(EdgeSourceId::Endorsement(e1.id)).unwrap();
        let e2 = intake
            .submit_endorsement(a, b, "skill".into(), "claim".into(), 60.0, None)
            .unwrap();

        assert!(!intake.endorsement(e1.id).unwrap().active);
        assert!(intake.endorsement(e2.id).unwrap().active);
        let edge = graph.active_edge(a, b, EdgeType::Endorsement).unwrap();
        assert_eq!(edge.weight, 60.0);
    }
}
