//! Wires every collaborator crate into one long-running process: the
//! agent registry, trust graph, payment ledger, vote/endorsement intake,
//! the three payment-scheme accountants, the score pipeline, the anomaly
//! detector, and the periodic scheduler that keeps authority, Sybil
//! indicators, the path cache, and subscription lifecycle current.
//!
//! Structured as a struct of `Arc`-shared collaborators, a bounded intake
//! queue feeding a fixed worker pool, and a `run()` loop built from
//! `tokio::time::interval` tickers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};

use reputrust_core::amount::AmountMicros;
use reputrust_core::clock::{Clock, SystemClock};
use reputrust_core::ids::{
    AgentId, AuthorizationId, BatchId, EdgeSourceId, Hash256, ReceiptId, Signature, SubscriptionId,
};
use reputrust_core::types::{
    Agent, Alert, Batch, BatchItemStatus, BatchMode, Endorsement,
    FacilitatorHealthSample, PaymentAuthorization, PaymentRecord, PaymentStatus, Polarity,
    QualityScores, SchedulerHealth, Subscription, Tag, Tier, TrustEdge, TrustPath, Vote,
};
use reputrust_anomaly::AnomalyDetector;
use reputrust_graph::authority::{compute_authority, GraphSnapshot};
use reputrust_graph::metrics::build_agent_metrics;
use reputrust_graph::path::{discover_path, transitive_trust, PathCache};
use reputrust_graph::sybil::compute_sybil_indicators;
use reputrust_graph::{AgentRegistry, TrustGraphStore};
use reputrust_ledger::accounting::{BatchLedger, SubscriptionLedger, UptoLedger};
use reputrust_ledger::{PaymentLedger, VoteIntake};
use reputrust_score::pipeline::ScorePipeline;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::events::NodeEvent;
use crate::storage::EventLog;

/// Everything a caller needs to submit to `observe_payment`.
pub struct PaymentObservation {
    pub signature: Signature,
    pub payer_address: String,
    pub payee_address: String,
    pub amount: AmountMicros,
    pub currency: Tag,
    pub network: Tag,
    pub facilitator: Tag,
    pub status: PaymentStatus,
    pub timestamp: DateTime<Utc>,
    pub endpoint: Option<String>,
}

pub struct VoteSubmission {
    pub receipt_id: ReceiptId,
    pub voter_address: String,
    pub subject_address: String,
    pub polarity: Polarity,
    pub quality: QualityScores,
    pub comment_hash: Option<Hash256>,
}

pub struct EndorsementSubmission {
    pub issuer_address: String,
    pub subject_address: String,
    pub endorsement_type: String,
    pub claim: String,
    pub confidence: f64,
    pub evidence: Option<String>,
}

pub struct UptoAuthorization {
    pub payer_address: String,
    pub payee_address: String,
    pub max_amount: AmountMicros,
    pub base_cost: AmountMicros,
    pub unit_cost: AmountMicros,
    pub unit_type: Tag,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct SubscriptionCreation {
    pub subscriber_address: String,
    pub provider_address: String,
    pub amount: AmountMicros,
    pub period_seconds: i64,
    pub auto_renew: bool,
    pub grace_seconds: i64,
    pub trial_end: Option<DateTime<Utc>>,
}

pub struct BatchCreation {
    pub batch_id: BatchId,
    pub initiator_address: String,
    pub items: Vec<(String, AmountMicros)>,
    pub declared_total: AmountMicros,
    pub mode: BatchMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentSortBy {
    Score,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

enum IntakeRequest {
    ObservePayment(PaymentObservation),
    SubmitVote(VoteSubmission),
    SubmitEndorsement(EndorsementSubmission),
    RevokeEdge(EdgeSourceId),
    SubmitFacilitatorHealth(FacilitatorHealthSample),
}

enum IntakeResponse {
    Payment(Result<Option<reputrust_core::types::Receipt>, NodeError>),
    Vote(Result<Vote, NodeError>),
    Endorsement(Result<Endorsement, NodeError>),
    Revoke(Result<(), NodeError>),
    Health(Result<Option<Alert>, NodeError>),
}

const INTAKE_QUEUE_CAPACITY: usize = 1024;
const INTAKE_WORKER_COUNT: usize = 4;

/// The process-wide, shared node state. Every public method either goes
/// through the bounded intake queue (payment/vote/endorsement/revoke/health
/// submissions, so a burst of callers never blocks on a background
/// recompute) or reads directly from the concurrent collaborator stores
/// (every query).
pub struct Node {
    config: NodeConfig,
    clock: Arc<dyn Clock>,
    log: EventLog,

    registry: Arc<AgentRegistry>,
    graph: Arc<TrustGraphStore>,
    ledger: Arc<PaymentLedger>,
    votes: Arc<VoteIntake>,
    upto: UptoLedger,
    subscriptions: SubscriptionLedger,
    batches: BatchLedger,
    score_pipeline: ScorePipeline,
    anomaly: AnomalyDetector,
    path_cache: PathCache,

    metrics: RwLock<HashMap<AgentId, reputrust_core::types::AgentMetrics>>,
    sub_scores: DashMap<AgentId, reputrust_core::types::SubScores>,
    scheduler_health: DashMap<&'static str, SchedulerHealth>,
    next_batch_id: AtomicU64,
    upto_charge_seq: DashMap<AuthorizationId, AtomicU64>,
    subscription_payment_seq: DashMap<SubscriptionId, AtomicU64>,

    intake_tx: mpsc::Sender<(IntakeRequest, oneshot::Sender<IntakeResponse>)>,

    authority_running: AtomicBool,
    path_sweep_running: AtomicBool,
    anomaly_running: AtomicBool,
    subscription_running: AtomicBool,
}

impl Node {
    /// Open (or create) the node's data directory, replay its event log,
    /// and spawn the intake worker pool. The returned node is ready to
    /// serve RPC traffic; call [`Node::run`] separately to start the
    /// periodic scheduler.
    pub async fn new(config: NodeConfig) -> Result<Arc<Self>, NodeError> {
        Self::with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Arc<Self>, NodeError> {
        std::fs::create_dir_all(config.db_path().parent().unwrap_or(Path::new(".")))
            .map_err(|e| NodeError::Storage(e.to_string()))?;
        let log = EventLog::open(config.db_path())?;

        let registry = Arc::new(AgentRegistry::new());
        let graph = Arc::new(TrustGraphStore::new());
        let ledger = Arc::new(PaymentLedger::new());
        let votes = Arc::new(VoteIntake::new(ledger.clone(), graph.clone()));
        let score_pipeline = ScorePipeline::new(ledger.clone(), votes.clone(), registry.clone());
        let anomaly = AnomalyDetector::new(ledger.clone());

        let (intake_tx, intake_rx) = mpsc::channel(INTAKE_QUEUE_CAPACITY);

        let node = Arc::new(Self {
            config,
            clock,
            log,
            registry,
            graph,
            ledger,
            votes,
            upto: UptoLedger::new(),
            subscriptions: SubscriptionLedger::new(),
            batches: BatchLedger::new(),
            score_pipeline,
            anomaly,
            path_cache: PathCache::new(),
            metrics: RwLock::new(HashMap::new()),
            sub_scores: DashMap::new(),
            scheduler_health: DashMap::new(),
            next_batch_id: AtomicU64::new(1),
            upto_charge_seq: DashMap::new(),
            subscription_payment_seq: DashMap::new(),
            intake_tx,
            authority_running: AtomicBool::new(false),
            path_sweep_running: AtomicBool::new(false),
            anomaly_running: AtomicBool::new(false),
            subscription_running: AtomicBool::new(false),
        });

        node.replay_log()?;

        let shared_rx = Arc::new(AsyncMutex::new(intake_rx));
        for worker in 0..INTAKE_WORKER_COUNT {
            let node = node.clone();
            let rx = shared_rx.clone();
            tokio::spawn(async move {
                debug!(worker, "intake worker started");
                loop {
                    let next = { rx.lock().await.recv().await };
                    match next {
                        Some((req, respond)) => {
                            let resp = node.handle_intake(req);
                            let _ = respond.send(resp);
                        }
                        None => break,
                    }
                }
            });
        }

        Ok(node)
    }

    fn replay_log(&self) -> Result<(), NodeError> {
        let events = self.log.replay()?;
        let count = events.len();
        for event in events {
            self.apply_event(event)?;
        }
        info!(count, "replayed event log");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Event application (shared by live intake and startup replay)
    // -----------------------------------------------------------------

    fn apply_event(&self, event: NodeEvent) -> Result<(), NodeError> {
        match event {
            NodeEvent::PaymentObserved { payer_address, payee_address, record, .. } => {
                self.apply_payment(&payer_address, &payee_address, record)?;
            }
            NodeEvent::FacilitatorHealthObserved { sample } => {
                let now = self.clock.now();
                self.anomaly.observe_facilitator_health(&sample, now);
            }
            NodeEvent::VoteSubmitted {
                receipt_id,
                voter_address,
                subject_address,
                polarity,
                quality,
                comment_hash,
            } => {
                self.apply_vote(receipt_id, &voter_address, &subject_address, polarity, quality, comment_hash)?;
            }
            NodeEvent::EndorsementSubmitted {
                issuer_address,
                subject_address,
                endorsement_type,
                claim,
                confidence,
                evidence,
            } => {
                self.apply_endorsement(&issuer_address, &subject_address, endorsement_type, claim, confidence, evidence)?;
            }
            NodeEvent::EdgeRevoked { source } => {
                self.votes.revoke(source)?;
            }
            NodeEvent::UptoAuthorized {
                payer_address,
                payee_address,
                max_amount,
                base_cost,
                unit_cost,
                unit_type,
                expires_at,
            } => {
                self.apply_upto_authorize(&payer_address, &payee_address, max_amount, base_cost, unit_cost, unit_type, expires_at);
            }
            NodeEvent::UptoCharged { authorization_id, units, at } => {
                self.apply_upto_charge(authorization_id, units, at)?;
            }
            NodeEvent::SubscriptionCreated {
                subscriber_address,
                provider_address,
                amount,
                period_seconds,
                auto_renew,
                grace_seconds,
                trial_end,
                at,
            } => {
                self.apply_subscription_create(&subscriber_address, &provider_address, amount, period_seconds, auto_renew, grace_seconds, trial_end, at);
            }
            NodeEvent::SubscriptionPaymentRecorded { subscription_id, period_start, period_end } => {
                self.apply_subscription_record_payment(subscription_id, period_start, period_end)?;
            }
            NodeEvent::SubscriptionCancelled { subscription_id, immediate } => {
                self.subscriptions.cancel(subscription_id, immediate)?;
            }
            NodeEvent::BatchCreated {
                batch_id,
                initiator_address,
                items,
                declared_total,
                mode,
            } => {
                self.apply_batch_create(batch_id, &initiator_address, items, declared_total, mode)?;
            }
            NodeEvent::BatchItemUpdated { batch_id, recipient_address, status, tx_signature } => {
                self.apply_batch_update_item(batch_id, &recipient_address, status, tx_signature)?;
            }
        }
        Ok(())
    }

    fn apply_payment(
        &self,
        payer_address: &str,
        payee_address: &str,
        record: PaymentRecord,
    ) -> Result<Option<reputrust_core::types::Receipt>, NodeError> {
        let payer = self.registry.get_or_create(payer_address, self.clock.as_ref());
        let payee = self.registry.get_or_create(payee_address, self.clock.as_ref());
        Ok(self
            .ledger
            .observe(record.signature.clone(), payer, payer_address, payee, payee_address, record)?)
    }

    fn apply_vote(
        &self,
        receipt_id: ReceiptId,
        voter_address: &str,
        subject_address: &str,
        polarity: Polarity,
        quality: QualityScores,
        comment_hash: Option<Hash256>,
    ) -> Result<Vote, NodeError> {
        let voter = self.registry.get_or_create(voter_address, self.clock.as_ref());
        let subject = self.registry.get_or_create(subject_address, self.clock.as_ref());
        Ok(self.votes.submit_vote(receipt_id, voter, subject, polarity, quality, comment_hash)?)
    }

    fn apply_endorsement(
        &self,
        issuer_address: &str,
        subject_address: &str,
        endorsement_type: String,
        claim: String,
        confidence: f64,
        evidence: Option<String>,
    ) -> Result<Endorsement, NodeError> {
        let issuer = self.registry.get_or_create(issuer_address, self.clock.as_ref());
        let subject = self.registry.get_or_create(subject_address, self.clock.as_ref());
        Ok(self.votes.submit_endorsement(issuer, subject, endorsement_type, claim, confidence, evidence)?)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_upto_authorize(
        &self,
        payer_address: &str,
        payee_address: &str,
        max_amount: AmountMicros,
        base_cost: AmountMicros,
        unit_cost: AmountMicros,
        unit_type: Tag,
        expires_at: Option<DateTime<Utc>>,
    ) -> AuthorizationId {
        let payer = self.registry.get_or_create(payer_address, self.clock.as_ref());
        let payee = self.registry.get_or_create(payee_address, self.clock.as_ref());
        self.upto.authorize(payer, payee, max_amount, base_cost, unit_cost, unit_type, expires_at)
    }

    fn apply_upto_charge(
        &self,
        authorization_id: AuthorizationId,
        units: i64,
        at: DateTime<Utc>,
    ) -> Result<PaymentAuthorization, NodeError> {
        let breakdown = self.upto.charge(authorization_id, units, at)?;
        let auth = self
            .upto
            .get(authorization_id)
            .ok_or_else(|| NodeError::Storage("authorization vanished after charge".to_string()))?;
        let payer = self.registry.get(auth.payer);
        let payee = self.registry.get(auth.payee);
        if let (Some(payer), Some(payee)) = (payer, payee) {
            let seq = self
                .upto_charge_seq
                .entry(authorization_id)
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::SeqCst);
            let signature = Signature::from(format!("upto:{authorization_id}:{seq}"));
            let record = PaymentRecord {
                signature: signature.clone(),
                payer_address: payer.address.clone(),
                payee_address: payee.address.clone(),
                amount: breakdown.amount,
                currency: auth.unit_type.clone(),
                network: "upto".to_string(),
                facilitator: "upto-scheme".to_string(),
                status: PaymentStatus::Confirmed,
                timestamp: at,
                endpoint: None,
            };
            self.apply_payment(&payer.address, &payee.address, record)?;
        }
        Ok(auth)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_subscription_create(
        &self,
        subscriber_address: &str,
        provider_address: &str,
        amount: AmountMicros,
        period_seconds: i64,
        auto_renew: bool,
        grace_seconds: i64,
        trial_end: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> SubscriptionId {
        let subscriber = self.registry.get_or_create(subscriber_address, self.clock.as_ref());
        let provider = self.registry.get_or_create(provider_address, self.clock.as_ref());
        self.subscriptions
            .create(subscriber, provider, amount, period_seconds, auto_renew, grace_seconds, trial_end, at)
    }

    fn apply_subscription_record_payment(
        &self,
        subscription_id: SubscriptionId,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Subscription, NodeError> {
        let sub = self.subscriptions.record_payment(subscription_id, period_start, period_end)?;
        let subscriber = self.registry.get(sub.subscriber);
        let provider = self.registry.get(sub.provider);
        if let (Some(subscriber), Some(provider)) = (subscriber, provider) {
            let seq = self
                .subscription_payment_seq
                .entry(subscription_id)
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::SeqCst);
            let signature = Signature::from(format!("sub:{subscription_id}:{seq}"));
            let record = PaymentRecord {
                signature: signature.clone(),
                payer_address: subscriber.address.clone(),
                payee_address: provider.address.clone(),
                amount: sub.amount,
                currency: "subscription".to_string(),
                network: "subscription".to_string(),
                facilitator: "subscription-scheme".to_string(),
                status: PaymentStatus::Confirmed,
                timestamp: period_start,
                endpoint: None,
            };
            self.apply_payment(&subscriber.address, &provider.address, record)?;
        }
        Ok(sub)
    }

    fn apply_batch_create(
        &self,
        batch_id: BatchId,
        initiator_address: &str,
        items: Vec<(String, AmountMicros)>,
        declared_total: AmountMicros,
        mode: BatchMode,
    ) -> Result<Batch, NodeError> {
        let initiator = self.registry.get_or_create(initiator_address, self.clock.as_ref());
        let resolved = items
            .into_iter()
            .map(|(address, amount)| (self.registry.get_or_create(&address, self.clock.as_ref()), amount))
            .collect();
        Ok(self.batches.create(batch_id, initiator, resolved, declared_total, mode)?)
    }

    fn apply_batch_update_item(
        &self,
        batch_id: BatchId,
        recipient_address: &str,
        status: BatchItemStatus,
        tx_signature: Option<Signature>,
    ) -> Result<Batch, NodeError> {
        let recipient = self.registry.get_or_create(recipient_address, self.clock.as_ref());
        let batch = self.batches.update_item(batch_id, recipient, status, tx_signature.clone())?;

        // Per-item confirmed transfers each materialize their own receipt
        // (one receipt per item-level confirmation, not one per batch).
        if status == BatchItemStatus::Succeeded {
            if let (Some(initiator), Some(recipient_agent), Some(item), Some(signature)) = (
                self.registry.get(batch.initiator),
                self.registry.get(recipient),
                batch.items.iter().find(|i| i.recipient == recipient),
                tx_signature,
            ) {
                let record = PaymentRecord {
                    signature: signature.clone(),
                    payer_address: initiator.address.clone(),
                    payee_address: recipient_agent.address.clone(),
                    amount: item.amount,
                    currency: "batch".to_string(),
                    network: "batch".to_string(),
                    facilitator: "batch-scheme".to_string(),
                    status: PaymentStatus::Confirmed,
                    timestamp: self.clock.now(),
                    endpoint: None,
                };
                self.apply_payment(&initiator.address, &recipient_agent.address, record)?;
            }
        }
        Ok(batch)
    }

    // -----------------------------------------------------------------
    // Intake worker dispatch
    // -----------------------------------------------------------------

    fn handle_intake(&self, req: IntakeRequest) -> IntakeResponse {
        match req {
            IntakeRequest::ObservePayment(input) => {
                let result = self.handle_observe_payment(input);
                IntakeResponse::Payment(result)
            }
            IntakeRequest::SubmitVote(input) => {
                let result = self.handle_submit_vote(input);
                IntakeResponse::Vote(result)
            }
            IntakeRequest::SubmitEndorsement(input) => {
                let result = self.handle_submit_endorsement(input);
                IntakeResponse::Endorsement(result)
            }
            IntakeRequest::RevokeEdge(source) => {
                let result = self.handle_revoke_edge(source);
                IntakeResponse::Revoke(result)
            }
            IntakeRequest::SubmitFacilitatorHealth(sample) => {
                let result = self.handle_submit_facilitator_health(sample);
                IntakeResponse::Health(result)
            }
        }
    }

    fn handle_observe_payment(
        &self,
        input: PaymentObservation,
    ) -> Result<Option<reputrust_core::types::Receipt>, NodeError> {
        let record = PaymentRecord {
            signature: input.signature.clone(),
            payer_address: input.payer_address.clone(),
            payee_address: input.payee_address.clone(),
            amount: input.amount,
            currency: input.currency,
            network: input.network,
            facilitator: input.facilitator,
            status: input.status,
            timestamp: input.timestamp,
            endpoint: input.endpoint,
        };
        self.log.append(&NodeEvent::PaymentObserved {
            signature: input.signature,
            payer_address: input.payer_address.clone(),
            payee_address: input.payee_address.clone(),
            record: record.clone(),
        })?;
        self.apply_payment(&input.payer_address, &input.payee_address, record)
    }

    fn handle_submit_vote(&self, input: VoteSubmission) -> Result<Vote, NodeError> {
        self.log.append(&NodeEvent::VoteSubmitted {
            receipt_id: input.receipt_id,
            voter_address: input.voter_address.clone(),
            subject_address: input.subject_address.clone(),
            polarity: input.polarity,
            quality: input.quality,
            comment_hash: input.comment_hash,
        })?;
        self.apply_vote(
            input.receipt_id,
            &input.voter_address,
            &input.subject_address,
            input.polarity,
            input.quality,
            input.comment_hash,
        )
    }

    fn handle_submit_endorsement(&self, input: EndorsementSubmission) -> Result<Endorsement, NodeError> {
        self.log.append(&NodeEvent::EndorsementSubmitted {
            issuer_address: input.issuer_address.clone(),
            subject_address: input.subject_address.clone(),
            endorsement_type: input.endorsement_type.clone(),
            claim: input.claim.clone(),
            confidence: input.confidence,
            evidence: input.evidence.clone(),
        })?;
        self.apply_endorsement(
            &input.issuer_address,
            &input.subject_address,
            input.endorsement_type,
            input.claim,
            input.confidence,
            input.evidence,
        )
    }

    fn handle_revoke_edge(&self, source: EdgeSourceId) -> Result<(), NodeError> {
        self.log.append(&NodeEvent::EdgeRevoked { source })?;
        Ok(self.votes.revoke(source)?)
    }

    fn handle_submit_facilitator_health(
        &self,
        sample: FacilitatorHealthSample,
    ) -> Result<Option<Alert>, NodeError> {
        self.log.append(&NodeEvent::FacilitatorHealthObserved { sample: sample.clone() })?;
        let now = self.clock.now();
        Ok(self.anomaly.observe_facilitator_health(&sample, now))
    }

    async fn submit<T>(&self, req: IntakeRequest, unwrap: impl FnOnce(IntakeResponse) -> T) -> Result<T, NodeError> {
        let (tx, rx) = oneshot::channel();
        self.intake_tx.try_send((req, tx)).map_err(|_| {
            NodeError::Core(reputrust_core::error::CoreError::Transient(
                "intake queue full, retry".to_string(),
            ))
        })?;
        let resp = rx.await.map_err(|_| {
            NodeError::Storage("intake worker dropped the response channel".to_string())
        })?;
        Ok(unwrap(resp))
    }

    // -----------------------------------------------------------------
    // Public inbound surface
    // -----------------------------------------------------------------

    pub async fn observe_payment(
        &self,
        input: PaymentObservation,
    ) -> Result<Option<reputrust_core::types::Receipt>, NodeError> {
        self.submit(IntakeRequest::ObservePayment(input), |r| match r {
            IntakeResponse::Payment(res) => res,
            _ => unreachable!(),
        })
        .await?
    }

    pub async fn submit_facilitator_health(
        &self,
        sample: FacilitatorHealthSample,
    ) -> Result<Option<Alert>, NodeError> {
        self.submit(IntakeRequest::SubmitFacilitatorHealth(sample), |r| match r {
            IntakeResponse::Health(res) => res,
            _ => unreachable!(),
        })
        .await?
    }

    pub async fn submit_vote(&self, input: VoteSubmission) -> Result<Vote, NodeError> {
        self.submit(IntakeRequest::SubmitVote(input), |r| match r {
            IntakeResponse::Vote(res) => res,
            _ => unreachable!(),
        })
        .await?
    }

    pub async fn submit_endorsement(&self, input: EndorsementSubmission) -> Result<Endorsement, NodeError> {
        self.submit(IntakeRequest::SubmitEndorsement(input), |r| match r {
            IntakeResponse::Endorsement(res) => res,
            _ => unreachable!(),
        })
        .await?
    }

    pub async fn revoke_edge(&self, source: EdgeSourceId) -> Result<(), NodeError> {
        self.submit(IntakeRequest::RevokeEdge(source), |r| match r {
            IntakeResponse::Revoke(res) => res,
            _ => unreachable!(),
        })
        .await?
    }

    // upto / subscription / batch mutations are less contention-sensitive
    // (callers are already holding a prior id) and go straight to the log
    // plus the relevant ledger, without the shared intake queue.

    #[allow(clippy::too_many_arguments)]
    pub fn upto_authorize(&self, input: UptoAuthorization) -> Result<AuthorizationId, NodeError> {
        self.log.append(&NodeEvent::UptoAuthorized {
            payer_address: input.payer_address.clone(),
            payee_address: input.payee_address.clone(),
            max_amount: input.max_amount,
            base_cost: input.base_cost,
            unit_cost: input.unit_cost,
            unit_type: input.unit_type.clone(),
            expires_at: input.expires_at,
        })?;
        Ok(self.apply_upto_authorize(
            &input.payer_address,
            &input.payee_address,
            input.max_amount,
            input.base_cost,
            input.unit_cost,
            input.unit_type,
            input.expires_at,
        ))
    }

    pub fn upto_charge(&self, authorization_id: AuthorizationId, units: i64) -> Result<PaymentAuthorization, NodeError> {
        let now = self.clock.now();
        self.log.append(&NodeEvent::UptoCharged { authorization_id, units, at: now })?;
        self.apply_upto_charge(authorization_id, units, now)
    }

    pub fn upto_revoke(&self, authorization_id: AuthorizationId) -> Result<(), NodeError> {
        Ok(self.upto.revoke(authorization_id)?)
    }

    pub fn upto_get(&self, authorization_id: AuthorizationId) -> Option<PaymentAuthorization> {
        self.upto.get(authorization_id)
    }

    pub fn subscription_create(&self, input: SubscriptionCreation) -> Result<SubscriptionId, NodeError> {
        let now = self.clock.now();
        self.log.append(&NodeEvent::SubscriptionCreated {
            subscriber_address: input.subscriber_address.clone(),
            provider_address: input.provider_address.clone(),
            amount: input.amount,
            period_seconds: input.period_seconds,
            auto_renew: input.auto_renew,
            grace_seconds: input.grace_seconds,
            trial_end: input.trial_end,
            at: now,
        })?;
        Ok(self.apply_subscription_create(
            &input.subscriber_address,
            &input.provider_address,
            input.amount,
            input.period_seconds,
            input.auto_renew,
            input.grace_seconds,
            input.trial_end,
            now,
        ))
    }

    pub fn subscription_record_payment(
        &self,
        subscription_id: SubscriptionId,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Subscription, NodeError> {
        self.log.append(&NodeEvent::SubscriptionPaymentRecorded { subscription_id, period_start, period_end })?;
        self.apply_subscription_record_payment(subscription_id, period_start, period_end)
    }

    pub fn subscription_cancel(&self, subscription_id: SubscriptionId, immediate: bool) -> Result<(), NodeError> {
        self.log.append(&NodeEvent::SubscriptionCancelled { subscription_id, immediate })?;
        Ok(self.subscriptions.cancel(subscription_id, immediate)?)
    }

    pub fn subscription_get(&self, subscription_id: SubscriptionId) -> Option<Subscription> {
        self.subscriptions.get(subscription_id)
    }

    pub fn batch_create(
        &self,
        initiator_address: String,
        items: Vec<(String, AmountMicros)>,
        declared_total: AmountMicros,
        mode: BatchMode,
    ) -> Result<Batch, NodeError> {
        let batch_id = BatchId(self.next_batch_id.fetch_add(1, Ordering::SeqCst));
        self.log.append(&NodeEvent::BatchCreated {
            batch_id,
            initiator_address: initiator_address.clone(),
            items: items.clone(),
            declared_total,
            mode,
        })?;
        self.apply_batch_create(batch_id, &initiator_address, items, declared_total, mode)
    }

    pub fn batch_update_item(
        &self,
        batch_id: BatchId,
        recipient_address: String,
        status: BatchItemStatus,
        tx_signature: Option<Signature>,
    ) -> Result<Batch, NodeError> {
        self.log.append(&NodeEvent::BatchItemUpdated {
            batch_id,
            recipient_address: recipient_address.clone(),
            status,
            tx_signature: tx_signature.clone(),
        })?;
        self.apply_batch_update_item(batch_id, &recipient_address, status, tx_signature)
    }

    pub fn batch_get(&self, batch_id: BatchId) -> Option<Batch> {
        self.batches.get(batch_id)
    }

    // -----------------------------------------------------------------
    // Outbound query surface
    // -----------------------------------------------------------------

    pub fn get_agent_by_address(&self, address: &str) -> Option<Agent> {
        let id = self.registry.lookup(address)?;
        self.registry.get(id)
    }

    pub fn get_agent(&self, agent_id: AgentId) -> Option<Agent> {
        self.registry.get(agent_id)
    }

    /// Linear scan over active agents, filtered by the caller-supplied
    /// predicates, sorted, and paged. Fine at the scale a reputation core
    /// for an agent-payment network runs at; a dedicated index is the
    /// natural next step if this ever shows up in profiling.
    #[allow(clippy::too_many_arguments)]
    pub fn search_agents(
        &self,
        min_score: Option<u32>,
        tier: Option<Tier>,
        category: Option<&str>,
        tags: &[String],
        search: Option<&str>,
        sort_by: AgentSortBy,
        order: SortOrder,
        limit: usize,
        offset: usize,
    ) -> (Vec<Agent>, usize) {
        let mut matched: Vec<Agent> = self
            .registry
            .active_ids()
            .into_iter()
            .filter_map(|id| self.registry.get(id))
            .filter(|a| min_score.map(|m| a.current_score >= m).unwrap_or(true))
            .filter(|a| tier.map(|t| a.current_tier == t).unwrap_or(true))
            .filter(|a| category.map(|c| a.category.as_deref() == Some(c)).unwrap_or(true))
            .filter(|a| tags.iter().all(|t| a.capabilities.iter().any(|c| c == t)))
            .filter(|a| {
                search
                    .map(|needle| {
                        let needle = needle.to_lowercase();
                        a.address.to_lowercase().contains(&needle)
                            || a.display_name
                                .as_deref()
                                .map(|n| n.to_lowercase().contains(&needle))
                                .unwrap_or(false)
                    })
                    .unwrap_or(true)
            })
            .collect();

        matched.sort_by(|a, b| {
            let primary = match sort_by {
                AgentSortBy::Score => a.current_score.cmp(&b.current_score),
                AgentSortBy::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            let primary = match order {
                SortOrder::Asc => primary,
                SortOrder::Desc => primary.reverse(),
            };
            primary.then_with(|| a.agent_id.cmp(&b.agent_id))
        });

        let total = matched.len();
        let page = matched.into_iter().skip(offset).take(limit).collect();
        (page, total)
    }

    fn edges_by_from(&self) -> HashMap<AgentId, Vec<TrustEdge>> {
        let (_, edges) = self.graph.snapshot_active_edges();
        let mut by_from: HashMap<AgentId, Vec<TrustEdge>> = HashMap::new();
        for edge in edges {
            by_from.entry(edge.from).or_default().push(edge);
        }
        by_from
    }

    pub fn trust_path(&self, from: AgentId, to: AgentId) -> Option<TrustPath> {
        let now = self.clock.now();
        let version = self.graph.version();
        if let Some(cached) = self.path_cache.get(from, to, version, now) {
            return Some(cached);
        }
        let by_from = self.edges_by_from();
        let (nodes, hop_weights, confidence) = discover_path(from, to, &by_from)?;
        let path = TrustPath {
            from,
            to,
            nodes,
            hop_weights,
            confidence,
            calculated_at: now,
            expires_at: now,
            graph_version: version,
        };
        self.path_cache.insert(path.clone(), now);
        self.path_cache.get(from, to, version, now)
    }

    /// The active direct edge weight from `from` to `to`, 0.0 if none.
    pub fn direct_edge_weight(&self, from: AgentId, to: AgentId) -> f64 {
        self.graph
            .edges_from(from, true)
            .into_iter()
            .find(|e| e.to == to)
            .map(|e| e.weight)
            .unwrap_or(0.0)
    }

    /// Blends the direct edge weight (if any) between `from` and `to` with
    /// the bounded-hop transitive path's confidence.
    pub fn transitive_trust(&self, from: AgentId, to: AgentId) -> f64 {
        let direct = self.direct_edge_weight(from, to);
        let transitive = self.trust_path(from, to).map(|p| p.confidence).unwrap_or(0.0);
        transitive_trust(direct, transitive)
    }

    pub fn top_by_authority(&self, limit: usize) -> Vec<reputrust_core::types::AgentMetrics> {
        let metrics = self.metrics.read();
        let mut all: Vec<_> = metrics.values().copied().collect();
        all.sort_by(|a, b| b.pagerank_normalized.cmp(&a.pagerank_normalized));
        all.truncate(limit);
        all
    }

    pub fn sybil_risk(&self, agent_id: AgentId) -> Option<f64> {
        self.metrics.read().get(&agent_id).map(|m| m.sybil_risk_score)
    }

    pub fn agent_metrics(&self, agent_id: AgentId) -> Option<reputrust_core::types::AgentMetrics> {
        self.metrics.read().get(&agent_id).copied()
    }

    pub fn sub_scores(&self, agent_id: AgentId) -> Option<reputrust_core::types::SubScores> {
        self.sub_scores.get(&agent_id).map(|e| *e.value())
    }

    pub fn lookup_address(&self, address: &str) -> Option<AgentId> {
        self.registry.lookup(address)
    }

    pub fn recent_alerts(&self) -> Vec<Alert> {
        self.anomaly.active_alerts()
    }

    pub fn resolve_alert(&self, id: u64) -> Result<(), NodeError> {
        Ok(self.anomaly.resolve(id)?)
    }

    pub fn scheduler_health(&self) -> Vec<SchedulerHealth> {
        self.scheduler_health.iter().map(|e| e.value().clone()).collect()
    }

    pub fn score_history(&self, agent_id: AgentId) -> Vec<reputrust_core::types::ScoreHistoryEntry> {
        self.score_pipeline.history_for(agent_id)
    }

    // -----------------------------------------------------------------
    // Periodic passes
    // -----------------------------------------------------------------

    fn record_tick(&self, name: &'static str) {
        let now = self.clock.now();
        let mut entry = self.scheduler_health.entry(name).or_insert_with(|| SchedulerHealth {
            task_name: name.to_string(),
            last_tick_at: None,
            last_success_at: None,
            last_error: None,
            last_duration_ms: None,
            run_count: 0,
            skip_count: 0,
        });
        entry.last_tick_at = Some(now);
        entry.run_count += 1;
    }

    fn record_skip(&self, name: &'static str) {
        warn!(task = name, "periodic pass still running, skipping this tick");
        let mut entry = self.scheduler_health.entry(name).or_insert_with(|| SchedulerHealth {
            task_name: name.to_string(),
            last_tick_at: None,
            last_success_at: None,
            last_error: None,
            last_duration_ms: None,
            run_count: 0,
            skip_count: 0,
        });
        entry.skip_count += 1;
    }

    fn record_outcome(&self, name: &'static str, result: Result<(), NodeError>, started: Instant) {
        let duration_ms = started.elapsed().as_millis() as u64;
        let mut entry = self.scheduler_health.entry(name).or_insert_with(|| SchedulerHealth {
            task_name: name.to_string(),
            last_tick_at: None,
            last_success_at: None,
            last_error: None,
            last_duration_ms: None,
            run_count: 0,
            skip_count: 0,
        });
        entry.last_duration_ms = Some(duration_ms);
        match result {
            Ok(()) => {
                entry.last_success_at = Some(self.clock.now());
                entry.last_error = None;
            }
            Err(e) => {
                error!(task = name, error = %e, "periodic pass failed");
                entry.last_error = Some(e.to_string());
            }
        }
    }

    /// Recompute damped PageRank authority and Sybil indicators over the
    /// current active graph, then feed every active agent's metrics
    /// through the composite score pipeline.
    pub fn run_authority_recompute(&self) -> Result<(), NodeError> {
        let (version, edges) = self.graph.snapshot_active_edges();
        let active_agents = self.registry.active_ids();
        let snapshot = GraphSnapshot { version, active_agents: active_agents.clone(), edges: edges.clone() };
        let pass = compute_authority(&snapshot);

        let mut degrees = HashMap::new();
        let mut sybil_map = HashMap::new();
        for &agent in &active_agents {
            let in_degree = self.graph.in_degree(agent);
            let out_degree = self.graph.out_degree(agent);
            degrees.insert(agent, (in_degree, out_degree));
            sybil_map.insert(agent, compute_sybil_indicators(agent, &edges, in_degree, out_degree));
        }

        let metrics_vec = build_agent_metrics(&pass, &degrees, &sybil_map);
        {
            let mut guard = self.metrics.write();
            guard.clear();
            for m in &metrics_vec {
                guard.insert(m.agent_id, *m);
            }
        }

        let now = self.clock.now();
        for m in &metrics_vec {
            let authority_of = |voter: AgentId| -> u32 {
                self.metrics.read().get(&voter).map(|mm| mm.pagerank_normalized).unwrap_or(0)
            };
            let outcome = self.score_pipeline.recompute_one(m, authority_of, now);
            self.sub_scores.insert(m.agent_id, outcome.sub_scores);
            if let Some(change) = outcome.tier_change {
                info!(agent = %change.agent_id, from = ?change.from_tier, to = ?change.to_tier, score = change.score, "tier change");
            }
        }
        Ok(())
    }

    pub fn run_path_cache_sweep(&self) -> Result<(), NodeError> {
        let now = self.clock.now();
        let removed = self.path_cache.sweep_expired(now);
        debug!(removed, "swept expired trust paths");
        Ok(())
    }

    pub fn run_anomaly_scan(&self) -> Result<(), NodeError> {
        let now = self.clock.now();
        let active = self.registry.active_ids();
        let alerts = self.anomaly.run_pass(&active, now);
        for alert in &alerts {
            warn!(subject = %alert.subject, alert_type = ?alert.alert_type, severity = ?alert.severity, "anomaly alert raised");
        }
        Ok(())
    }

    pub fn run_subscription_sweep(&self) -> Result<(), NodeError> {
        let now = self.clock.now();
        let expired = self.subscriptions.sweep_expirations(now);
        if !expired.is_empty() {
            info!(count = expired.len(), "subscriptions expired");
        }
        Ok(())
    }

    /// At most one concurrent execution per task: if the previous spawn of
    /// `name` hasn't finished, this tick is skipped and logged rather than
    /// queueing up behind it.
    fn spawn_authority_recompute(self: &Arc<Self>) {
        if self.authority_running.swap(true, Ordering::SeqCst) {
            self.record_skip("authority_recompute");
            return;
        }
        let node = self.clone();
        tokio::spawn(async move {
            node.record_tick("authority_recompute");
            let started = Instant::now();
            let result = node.run_authority_recompute();
            node.record_outcome("authority_recompute", result, started);
            node.authority_running.store(false, Ordering::SeqCst);
        });
    }

    fn spawn_path_cache_sweep(self: &Arc<Self>) {
        if self.path_sweep_running.swap(true, Ordering::SeqCst) {
            self.record_skip("path_cache_sweep");
            return;
        }
        let node = self.clone();
        tokio::spawn(async move {
            node.record_tick("path_cache_sweep");
            let started = Instant::now();
            let result = node.run_path_cache_sweep();
            node.record_outcome("path_cache_sweep", result, started);
            node.path_sweep_running.store(false, Ordering::SeqCst);
        });
    }

    fn spawn_anomaly_scan(self: &Arc<Self>) {
        if self.anomaly_running.swap(true, Ordering::SeqCst) {
            self.record_skip("anomaly_scan");
            return;
        }
        let node = self.clone();
        tokio::spawn(async move {
            node.record_tick("anomaly_scan");
            let started = Instant::now();
            let result = node.run_anomaly_scan();
            node.record_outcome("anomaly_scan", result, started);
            node.anomaly_running.store(false, Ordering::SeqCst);
        });
    }

    fn spawn_subscription_sweep(self: &Arc<Self>) {
        if self.subscription_running.swap(true, Ordering::SeqCst) {
            self.record_skip("subscription_sweep");
            return;
        }
        let node = self.clone();
        tokio::spawn(async move {
            node.record_tick("subscription_sweep");
            let started = Instant::now();
            let result = node.run_subscription_sweep();
            node.record_outcome("subscription_sweep", result, started);
            node.subscription_running.store(false, Ordering::SeqCst);
        });
    }

    /// Run the periodic scheduler loop. Each periodic task spawns onto its
    /// own task so a slow pass never blocks intake or the other passes;
    /// an `AtomicBool` guard ensures at most one instance of a given task
    /// runs at a time, with a skipped tick recorded in its
    /// [`SchedulerHealth`] rather than silently queueing up.
    pub async fn run(self: Arc<Self>) {
        let mut authority_tick = tokio::time::interval(std::time::Duration::from_secs(self.config.authority_recompute_interval_secs));
        let mut path_sweep_tick = tokio::time::interval(std::time::Duration::from_secs(self.config.path_cache_sweep_interval_secs));
        let mut anomaly_tick = tokio::time::interval(std::time::Duration::from_secs(self.config.anomaly_scan_interval_secs));
        let mut subscription_tick = tokio::time::interval(std::time::Duration::from_secs(self.config.subscription_sweep_interval_secs));

        loop {
            tokio::select! {
                _ = authority_tick.tick() => self.spawn_authority_recompute(),
                _ = path_sweep_tick.tick() => self.spawn_path_cache_sweep(),
                _ = anomaly_tick.tick() => self.spawn_anomaly_scan(),
                _ = subscription_tick.tick() => self.spawn_subscription_sweep(),
            }
        }
    }
}
