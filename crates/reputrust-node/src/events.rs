//! The node's write-ahead event log schema.
//!
//! `reputrust_core::types` structs carry `chrono::DateTime<Utc>` fields,
//! which `bincode` (unlike `serde`) has no built-in support for deriving
//! against, so events here are serialized with `serde_json` before they
//! go into RocksDB. Addresses, not resolved `AgentId`s, are
//! what gets persisted: replay re-resolves them through the same
//! `AgentRegistry::get_or_create` path a live call would have taken, so a
//! registry rebuilt from the log assigns the same ids in the same order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reputrust_core::amount::AmountMicros;
use reputrust_core::ids::{AuthorizationId, BatchId, EdgeSourceId, Hash256, ReceiptId, Signature, SubscriptionId};
use reputrust_core::types::{
    BatchItemStatus, BatchMode, FacilitatorHealthSample, PaymentRecord, Polarity, QualityScores, Tag,
};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum NodeEvent {
    PaymentObserved {
        signature: Signature,
        payer_address: String,
        payee_address: String,
        record: PaymentRecord,
    },
    FacilitatorHealthObserved {
        sample: FacilitatorHealthSample,
    },
    VoteSubmitted {
        receipt_id: ReceiptId,
        voter_address: String,
        subject_address: String,
        polarity: Polarity,
        quality: QualityScores,
        comment_hash: Option<Hash256>,
    },
    EndorsementSubmitted {
        issuer_address: String,
        subject_address: String,
        endorsement_type: String,
        claim: String,
        confidence: f64,
        evidence: Option<String>,
    },
    EdgeRevoked {
        source: EdgeSourceId,
    },
    UptoAuthorized {
        payer_address: String,
        payee_address: String,
        max_amount: AmountMicros,
        base_cost: AmountMicros,
        unit_cost: AmountMicros,
        unit_type: Tag,
        expires_at: Option<DateTime<Utc>>,
    },
    UptoCharged {
        authorization_id: AuthorizationId,
        units: i64,
        at: DateTime<Utc>,
    },
    SubscriptionCreated {
        subscriber_address: String,
        provider_address: String,
        amount: AmountMicros,
        period_seconds: i64,
        auto_renew: bool,
        grace_seconds: i64,
        trial_end: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    SubscriptionPaymentRecorded {
        subscription_id: SubscriptionId,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    },
    SubscriptionCancelled {
        subscription_id: SubscriptionId,
        immediate: bool,
    },
    BatchCreated {
        batch_id: BatchId,
        initiator_address: String,
        items: Vec<(String, AmountMicros)>,
        declared_total: AmountMicros,
        mode: BatchMode,
    },
    BatchItemUpdated {
        batch_id: BatchId,
        recipient_address: String,
        status: BatchItemStatus,
        tx_signature: Option<Signature>,
    },
}
