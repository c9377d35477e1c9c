//! JSON-RPC server for the reputation and trust core.
//!
//! Uses jsonrpsee 0.24: a `#[rpc(server)]` trait describing the wire
//! methods, a thin impl struct wrapping `Arc<Node>`, and JSON view types
//! that translate the core's internal entities into stable, serializable
//! shapes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};

use reputrust_core::amount::AmountMicros;
use reputrust_core::ids::{AgentId, AuthorizationId, BatchId, EdgeSourceId, ReceiptId, Signature, SubscriptionId};
use reputrust_core::types::{
    AlertSeverity, AlertType, BatchItemStatus, BatchMode, FacilitatorHealthSample, FacilitatorStatus,
    PaymentStatus, Polarity, QualityScores, SubScores, Tier,
};

use crate::error::NodeError;
use crate::node::{
    AgentSortBy, EndorsementSubmission, Node, PaymentObservation, SortOrder, SubscriptionCreation,
    UptoAuthorization, VoteSubmission,
};

fn rpc_error(code: i32, msg: impl ToString) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, msg.to_string(), None::<()>)
}

/// Maps a [`NodeError`] to a JSON-RPC error code, using small negative
/// codes per failure family rather than one generic "internal error"
/// bucket.
fn node_error_to_rpc(e: NodeError) -> ErrorObjectOwned {
    use reputrust_core::error::CoreError;
    let code = match &e {
        NodeError::Core(CoreError::UnknownAgent(_)) => -1,
        NodeError::Core(CoreError::ReceiptAlreadyUsed { .. }) => -2,
        NodeError::Core(CoreError::PartiesMismatch) => -3,
        NodeError::Core(CoreError::InvalidRange { .. }) => -4,
        NodeError::Core(CoreError::InconsistentTerminalState(_)) => -5,
        NodeError::Core(CoreError::AuthorizationExhausted(_)) => -6,
        NodeError::Core(CoreError::AuthorizationExpired(_)) => -7,
        NodeError::Core(CoreError::AuthorizationRevoked(_)) => -8,
        NodeError::Core(CoreError::BatchTotalMismatch { .. }) => -9,
        NodeError::Core(CoreError::GraphVersionConflict { .. }) => -10,
        NodeError::Core(CoreError::Transient(_)) => -11,
        _ => -32000,
    };
    rpc_error(code, e.to_string())
}

fn parse_agent(address: &str) -> Result<&str, ErrorObjectOwned> {
    if address.trim().is_empty() {
        return Err(rpc_error(-4, "address must not be empty"));
    }
    Ok(address)
}

fn parse_polarity(polarity: &str) -> Result<Polarity, ErrorObjectOwned> {
    match polarity {
        "up" => Ok(Polarity::Up),
        "down" => Ok(Polarity::Down),
        other => Err(rpc_error(-4, format!("polarity must be 'up' or 'down', got '{other}'"))),
    }
}

fn parse_status(status: &str) -> Result<PaymentStatus, ErrorObjectOwned> {
    match status {
        "pending" => Ok(PaymentStatus::Pending),
        "confirmed" => Ok(PaymentStatus::Confirmed),
        "failed" => Ok(PaymentStatus::Failed),
        other => Err(rpc_error(-4, format!("unknown payment status '{other}'"))),
    }
}

fn parse_facilitator_status(status: &str) -> Result<FacilitatorStatus, ErrorObjectOwned> {
    match status {
        "online" => Ok(FacilitatorStatus::Online),
        "degraded" => Ok(FacilitatorStatus::Degraded),
        "offline" => Ok(FacilitatorStatus::Offline),
        other => Err(rpc_error(-4, format!("unknown facilitator status '{other}'"))),
    }
}

fn parse_batch_mode(mode: &str) -> Result<BatchMode, ErrorObjectOwned> {
    match mode {
        "atomic" => Ok(BatchMode::Atomic),
        "best_effort" => Ok(BatchMode::BestEffort),
        other => Err(rpc_error(-4, format!("unknown batch mode '{other}'"))),
    }
}

fn parse_batch_item_status(status: &str) -> Result<BatchItemStatus, ErrorObjectOwned> {
    match status {
        "pending" => Ok(BatchItemStatus::Pending),
        "succeeded" => Ok(BatchItemStatus::Succeeded),
        "failed" => Ok(BatchItemStatus::Failed),
        other => Err(rpc_error(-4, format!("unknown batch item status '{other}'"))),
    }
}

fn parse_tier(tier: &str) -> Result<Tier, ErrorObjectOwned> {
    match tier {
        "bronze" => Ok(Tier::Bronze),
        "silver" => Ok(Tier::Silver),
        "gold" => Ok(Tier::Gold),
        "platinum" => Ok(Tier::Platinum),
        other => Err(rpc_error(-4, format!("unknown tier '{other}'"))),
    }
}

fn tier_str(tier: Tier) -> &'static str {
    match tier {
        Tier::Bronze => "bronze",
        Tier::Silver => "silver",
        Tier::Gold => "gold",
        Tier::Platinum => "platinum",
    }
}

fn amount(micros: i64) -> Result<AmountMicros, ErrorObjectOwned> {
    AmountMicros::new(micros).map_err(|e| rpc_error(-4, e.to_string()))
}

// ---------------------------------------------------------------------
// JSON view types (outbound queries)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubScoresJson {
    pub trust: f64,
    pub quality: f64,
    pub reliability: f64,
    pub economic: f64,
    pub social: f64,
}

impl From<SubScores> for SubScoresJson {
    fn from(s: SubScores) -> Self {
        Self {
            trust: s.trust,
            quality: s.quality,
            reliability: s.reliability,
            economic: s.economic,
            social: s.social,
        }
    }
}

/// Denormalized agent view returned by `getAgent` and every other query
/// that surfaces an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentViewJson {
    pub agent_id: u64,
    pub address: String,
    pub display_name: Option<String>,
    pub category: Option<String>,
    pub capabilities: Vec<String>,
    pub active: bool,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub score: u32,
    pub tier: String,
    pub sub_scores: Option<SubScoresJson>,
    pub pagerank_normalized: Option<u32>,
    pub in_degree: Option<u32>,
    pub out_degree: Option<u32>,
    pub sybil_risk_score: Option<f64>,
}

fn agent_view(node: &Node, agent: reputrust_core::types::Agent) -> AgentViewJson {
    let metrics = node.agent_metrics(agent.agent_id);
    let sub_scores = node.sub_scores(agent.agent_id);
    AgentViewJson {
        agent_id: agent.agent_id.0,
        address: agent.address,
        display_name: agent.display_name,
        category: agent.category,
        capabilities: agent.capabilities,
        active: agent.active,
        verified: agent.verified,
        created_at: agent.created_at,
        updated_at: agent.updated_at,
        score: agent.current_score,
        tier: tier_str(agent.current_tier).to_string(),
        sub_scores: sub_scores.map(Into::into),
        pagerank_normalized: metrics.as_ref().map(|m| m.pagerank_normalized),
        in_degree: metrics.as_ref().map(|m| m.in_degree),
        out_degree: metrics.as_ref().map(|m| m.out_degree),
        sybil_risk_score: metrics.as_ref().map(|m| m.sybil_risk_score),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageJson<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustPathJson {
    pub found: bool,
    pub path: Vec<u64>,
    pub hop_weights: Vec<f64>,
    pub confidence: f64,
    pub distance: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitiveTrustJson {
    pub direct: f64,
    pub transitive: f64,
    pub combined: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertJson {
    pub id: u64,
    pub alert_type: String,
    pub subject: String,
    pub metric: String,
    pub current: f64,
    pub historical: f64,
    pub change_percent: f64,
    pub severity: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
}

fn alert_type_str(t: AlertType) -> &'static str {
    match t {
        AlertType::SuccessRateDrop => "success_rate_drop",
        AlertType::ErrorRateSpike => "error_rate_spike",
        AlertType::VolumeAnomaly => "volume_anomaly",
        AlertType::FacilitatorOutage => "facilitator_outage",
    }
}

fn severity_str(s: AlertSeverity) -> &'static str {
    match s {
        AlertSeverity::Medium => "medium",
        AlertSeverity::High => "high",
        AlertSeverity::Critical => "critical",
    }
}

impl From<reputrust_core::types::Alert> for AlertJson {
    fn from(a: reputrust_core::types::Alert) -> Self {
        Self {
            id: a.id,
            alert_type: alert_type_str(a.alert_type).to_string(),
            subject: a.subject,
            metric: a.metric,
            current: a.current,
            historical: a.historical,
            change_percent: a.change_percent,
            severity: severity_str(a.severity).to_string(),
            timestamp: a.timestamp,
            resolved: a.resolved,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerHealthJson {
    pub task_name: String,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_duration_ms: Option<u64>,
    pub run_count: u64,
    pub skip_count: u64,
}

impl From<reputrust_core::types::SchedulerHealth> for SchedulerHealthJson {
    fn from(h: reputrust_core::types::SchedulerHealth) -> Self {
        Self {
            task_name: h.task_name,
            last_tick_at: h.last_tick_at,
            last_success_at: h.last_success_at,
            last_error: h.last_error,
            last_duration_ms: h.last_duration_ms,
            run_count: h.run_count,
            skip_count: h.skip_count,
        }
    }
}

// ---------------------------------------------------------------------
// The RPC interface
// ---------------------------------------------------------------------

#[rpc(server)]
pub trait ReputrustRpc {
    // -- inbound event feed --

    #[method(name = "observePayment")]
    #[allow(clippy::too_many_arguments)]
    async fn observe_payment(
        &self,
        signature: String,
        payer_address: String,
        payee_address: String,
        amount_micros: i64,
        currency: String,
        network: String,
        facilitator: String,
        status: String,
        timestamp: DateTime<Utc>,
        endpoint: Option<String>,
    ) -> Result<Option<String>, ErrorObjectOwned>;

    #[method(name = "submitFacilitatorHealth")]
    async fn submit_facilitator_health(
        &self,
        facilitator: String,
        status: String,
        latency_ms: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<AlertJson>, ErrorObjectOwned>;

    #[method(name = "submitVote")]
    #[allow(clippy::too_many_arguments)]
    async fn submit_vote(
        &self,
        receipt_id: String,
        voter_address: String,
        subject_address: String,
        polarity: String,
        response_quality: f64,
        response_speed: f64,
        accuracy: f64,
        professionalism: f64,
        comment_hash: Option<String>,
    ) -> Result<String, ErrorObjectOwned>;

    #[method(name = "submitEndorsement")]
    async fn submit_endorsement(
        &self,
        issuer_address: String,
        subject_address: String,
        endorsement_type: String,
        claim: String,
        confidence: f64,
        evidence: Option<String>,
    ) -> Result<u64, ErrorObjectOwned>;

    #[method(name = "revokeEdge")]
    async fn revoke_edge(&self, source: String) -> Result<(), ErrorObjectOwned>;

    // -- payment-scheme accounting --

    #[method(name = "uptoAuthorize")]
    #[allow(clippy::too_many_arguments)]
    async fn upto_authorize(
        &self,
        payer_address: String,
        payee_address: String,
        max_amount_micros: i64,
        base_cost_micros: i64,
        unit_cost_micros: i64,
        unit_type: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<u64, ErrorObjectOwned>;

    #[method(name = "uptoCharge")]
    async fn upto_charge(&self, authorization_id: u64, units: i64) -> Result<serde_json::Value, ErrorObjectOwned>;

    #[method(name = "uptoRevoke")]
    async fn upto_revoke(&self, authorization_id: u64) -> Result<(), ErrorObjectOwned>;

    #[method(name = "uptoGet")]
    async fn upto_get(&self, authorization_id: u64) -> Result<Option<serde_json::Value>, ErrorObjectOwned>;

    #[method(name = "subscriptionCreate")]
    #[allow(clippy::too_many_arguments)]
    async fn subscription_create(
        &self,
        subscriber_address: String,
        provider_address: String,
        amount_micros: i64,
        period_seconds: i64,
        auto_renew: bool,
        grace_seconds: i64,
        trial_end: Option<DateTime<Utc>>,
    ) -> Result<u64, ErrorObjectOwned>;

    #[method(name = "subscriptionRecordPayment")]
    async fn subscription_record_payment(
        &self,
        subscription_id: u64,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<serde_json::Value, ErrorObjectOwned>;

    #[method(name = "subscriptionCancel")]
    async fn subscription_cancel(&self, subscription_id: u64, immediate: bool) -> Result<(), ErrorObjectOwned>;

    #[method(name = "subscriptionGet")]
    async fn subscription_get(&self, subscription_id: u64) -> Result<Option<serde_json::Value>, ErrorObjectOwned>;

    #[method(name = "batchCreate")]
    async fn batch_create(
        &self,
        initiator_address: String,
        items: Vec<(String, i64)>,
        declared_total_micros: i64,
        mode: String,
    ) -> Result<serde_json::Value, ErrorObjectOwned>;

    #[method(name = "batchUpdateItem")]
    async fn batch_update_item(
        &self,
        batch_id: u64,
        recipient_address: String,
        status: String,
        tx_signature: Option<String>,
    ) -> Result<serde_json::Value, ErrorObjectOwned>;

    #[method(name = "batchGet")]
    async fn batch_get(&self, batch_id: u64) -> Result<Option<serde_json::Value>, ErrorObjectOwned>;

    // -- outbound queries --

    #[method(name = "getAgent")]
    async fn get_agent(&self, address: String) -> Result<AgentViewJson, ErrorObjectOwned>;

    #[method(name = "searchAgents")]
    #[allow(clippy::too_many_arguments)]
    async fn search_agents(
        &self,
        category: Option<String>,
        min_score: Option<u32>,
        tier: Option<String>,
        tags: Option<Vec<String>>,
        search: Option<String>,
        sort_by: Option<String>,
        order: Option<String>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<PageJson<AgentViewJson>, ErrorObjectOwned>;

    #[method(name = "trustPath")]
    async fn trust_path(
        &self,
        from_address: String,
        to_address: String,
    ) -> Result<TrustPathJson, ErrorObjectOwned>;

    #[method(name = "transitiveTrust")]
    async fn transitive_trust(
        &self,
        from_address: String,
        to_address: String,
    ) -> Result<TransitiveTrustJson, ErrorObjectOwned>;

    #[method(name = "topByAuthority")]
    async fn top_by_authority(&self, limit: usize) -> Result<Vec<AgentViewJson>, ErrorObjectOwned>;

    #[method(name = "sybilRisk")]
    async fn sybil_risk(&self, min_risk: f64, limit: usize) -> Result<Vec<AgentViewJson>, ErrorObjectOwned>;

    #[method(name = "recentAlerts")]
    async fn recent_alerts(&self, since: Option<DateTime<Utc>>) -> Result<Vec<AlertJson>, ErrorObjectOwned>;

    #[method(name = "resolveAlert")]
    async fn resolve_alert(&self, id: u64) -> Result<(), ErrorObjectOwned>;

    #[method(name = "schedulerHealth")]
    async fn scheduler_health(&self) -> Result<Vec<SchedulerHealthJson>, ErrorObjectOwned>;
}

pub struct RpcServerImpl {
    node: Arc<Node>,
}

impl RpcServerImpl {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    fn agent_id_for(&self, address: &str) -> Result<AgentId, ErrorObjectOwned> {
        self.node
            .lookup_address(address)
            .ok_or_else(|| rpc_error(-1, format!("unknown agent address: {address}")))
    }
}

#[async_trait]
impl ReputrustRpcServer for RpcServerImpl {
    async fn observe_payment(
        &self,
        signature: String,
        payer_address: String,
        payee_address: String,
        amount_micros: i64,
        currency: String,
        network: String,
        facilitator: String,
        status: String,
        timestamp: DateTime<Utc>,
        endpoint: Option<String>,
    ) -> Result<Option<String>, ErrorObjectOwned> {
        parse_agent(&payer_address)?;
        parse_agent(&payee_address)?;
        let input = PaymentObservation {
            signature: Signature::from(signature),
            payer_address,
            payee_address,
            amount: amount(amount_micros)?,
            currency,
            network,
            facilitator,
            status: parse_status(&status)?,
            timestamp,
            endpoint,
        };
        let receipt = self.node.observe_payment(input).await.map_err(node_error_to_rpc)?;
        Ok(receipt.map(|r| r.id.to_string()))
    }

    async fn submit_facilitator_health(
        &self,
        facilitator: String,
        status: String,
        latency_ms: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<AlertJson>, ErrorObjectOwned> {
        let sample = FacilitatorHealthSample {
            facilitator,
            status: parse_facilitator_status(&status)?,
            latency_ms,
            timestamp,
        };
        let alert = self
            .node
            .submit_facilitator_health(sample)
            .await
            .map_err(node_error_to_rpc)?;
        Ok(alert.map(Into::into))
    }

    async fn submit_vote(
        &self,
        receipt_id: String,
        voter_address: String,
        subject_address: String,
        polarity: String,
        response_quality: f64,
        response_speed: f64,
        accuracy: f64,
        professionalism: f64,
        comment_hash: Option<String>,
    ) -> Result<String, ErrorObjectOwned> {
        let receipt_id = parse_receipt_id(&receipt_id)?;
        let comment_hash = comment_hash
            .map(|h| reputrust_core::ids::Hash256::from_hex(&h))
            .transpose()
            .map_err(|e| rpc_error(-4, format!("invalid comment_hash: {e}")))?;
        let input = VoteSubmission {
            receipt_id,
            voter_address,
            subject_address,
            polarity: parse_polarity(&polarity)?,
            quality: QualityScores {
                response_quality,
                response_speed,
                accuracy,
                professionalism,
            },
            comment_hash,
        };
        let vote = self.node.submit_vote(input).await.map_err(node_error_to_rpc)?;
        Ok(format!("{}", vote.receipt_id))
    }

    async fn submit_endorsement(
        &self,
        issuer_address: String,
        subject_address: String,
        endorsement_type: String,
        claim: String,
        confidence: f64,
        evidence: Option<String>,
    ) -> Result<u64, ErrorObjectOwned> {
        let input = EndorsementSubmission {
            issuer_address,
            subject_address,
            endorsement_type,
            claim,
            confidence,
            evidence,
        };
        let endorsement = self.node.submit_endorsement(input).await.map_err(node_error_to_rpc)?;
        Ok(endorsement.id)
    }

    async fn revoke_edge(&self, source: String) -> Result<(), ErrorObjectOwned> {
        let source = parse_edge_source_id(&source)?;
        self.node.revoke_edge(source).await.map_err(node_error_to_rpc)
    }

    async fn upto_authorize(
        &self,
        payer_address: String,
        payee_address: String,
        max_amount_micros: i64,
        base_cost_micros: i64,
        unit_cost_micros: i64,
        unit_type: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<u64, ErrorObjectOwned> {
        let input = UptoAuthorization {
            payer_address,
            payee_address,
            max_amount: amount(max_amount_micros)?,
            base_cost: amount(base_cost_micros)?,
            unit_cost: amount(unit_cost_micros)?,
            unit_type,
            expires_at,
        };
        let id = self.node.upto_authorize(input).map_err(node_error_to_rpc)?;
        Ok(id.0)
    }

    async fn upto_charge(&self, authorization_id: u64, units: i64) -> Result<serde_json::Value, ErrorObjectOwned> {
        let auth = self
            .node
            .upto_charge(AuthorizationId(authorization_id), units)
            .map_err(node_error_to_rpc)?;
        Ok(serde_json::to_value(&auth).expect("PaymentAuthorization always serializes"))
    }

    async fn upto_revoke(&self, authorization_id: u64) -> Result<(), ErrorObjectOwned> {
        self.node
            .upto_revoke(AuthorizationId(authorization_id))
            .map_err(node_error_to_rpc)
    }

    async fn upto_get(&self, authorization_id: u64) -> Result<Option<serde_json::Value>, ErrorObjectOwned> {
        Ok(self
            .node
            .upto_get(AuthorizationId(authorization_id))
            .map(|a| serde_json::to_value(&a).expect("PaymentAuthorization always serializes")))
    }

    async fn subscription_create(
        &self,
        subscriber_address: String,
        provider_address: String,
        amount_micros: i64,
        period_seconds: i64,
        auto_renew: bool,
        grace_seconds: i64,
        trial_end: Option<DateTime<Utc>>,
    ) -> Result<u64, ErrorObjectOwned> {
        let input = SubscriptionCreation {
            subscriber_address,
            provider_address,
            amount: amount(amount_micros)?,
            period_seconds,
            auto_renew,
            grace_seconds,
            trial_end,
        };
        let id = self.node.subscription_create(input).map_err(node_error_to_rpc)?;
        Ok(id.0)
    }

    async fn subscription_record_payment(
        &self,
        subscription_id: u64,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<serde_json::Value, ErrorObjectOwned> {
        let sub = self
            .node
            .subscription_record_payment(SubscriptionId(subscription_id), period_start, period_end)
            .map_err(node_error_to_rpc)?;
        Ok(serde_json::to_value(&sub).expect("Subscription always serializes"))
    }

    async fn subscription_cancel(&self, subscription_id: u64, immediate: bool) -> Result<(), ErrorObjectOwned> {
        self.node
            .subscription_cancel(SubscriptionId(subscription_id), immediate)
            .map_err(node_error_to_rpc)
    }

    async fn subscription_get(&self, subscription_id: u64) -> Result<Option<serde_json::Value>, ErrorObjectOwned> {
        Ok(self
            .node
            .subscription_get(SubscriptionId(subscription_id))
            .map(|s| serde_json::to_value(&s).expect("Subscription always serializes")))
    }

    async fn batch_create(
        &self,
        initiator_address: String,
        items: Vec<(String, i64)>,
        declared_total_micros: i64,
        mode: String,
    ) -> Result<serde_json::Value, ErrorObjectOwned> {
        let mut resolved = Vec::with_capacity(items.len());
        for (address, micros) in items {
            resolved.push((address, amount(micros)?));
        }
        let batch = self
            .node
            .batch_create(initiator_address, resolved, amount(declared_total_micros)?, parse_batch_mode(&mode)?)
            .map_err(node_error_to_rpc)?;
        Ok(serde_json::to_value(&batch).expect("Batch always serializes"))
    }

    async fn batch_update_item(
        &self,
        batch_id: u64,
        recipient_address: String,
        status: String,
        tx_signature: Option<String>,
    ) -> Result<serde_json::Value, ErrorObjectOwned> {
        let batch = self
            .node
            .batch_update_item(
                BatchId(batch_id),
                recipient_address,
                parse_batch_item_status(&status)?,
                tx_signature.map(Signature::from),
            )
            .map_err(node_error_to_rpc)?;
        Ok(serde_json::to_value(&batch).expect("Batch always serializes"))
    }

    async fn batch_get(&self, batch_id: u64) -> Result<Option<serde_json::Value>, ErrorObjectOwned> {
        Ok(self
            .node
            .batch_get(BatchId(batch_id))
            .map(|b| serde_json::to_value(&b).expect("Batch always serializes")))
    }

    async fn get_agent(&self, address: String) -> Result<AgentViewJson, ErrorObjectOwned> {
        let agent = self
            .node
            .get_agent_by_address(&address)
            .ok_or_else(|| rpc_error(-1, format!("unknown agent address: {address}")))?;
        Ok(agent_view(&self.node, agent))
    }

    async fn search_agents(
        &self,
        category: Option<String>,
        min_score: Option<u32>,
        tier: Option<String>,
        tags: Option<Vec<String>>,
        search: Option<String>,
        sort_by: Option<String>,
        order: Option<String>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<PageJson<AgentViewJson>, ErrorObjectOwned> {
        let tier = tier.as_deref().map(parse_tier).transpose()?;
        let sort_by = match sort_by.as_deref() {
            None | Some("score") => AgentSortBy::Score,
            Some("created_at") => AgentSortBy::CreatedAt,
            Some(other) => return Err(rpc_error(-4, format!("unknown sort_by '{other}'"))),
        };
        let order = match order.as_deref() {
            None | Some("desc") => SortOrder::Desc,
            Some("asc") => SortOrder::Asc,
            Some(other) => return Err(rpc_error(-4, format!("unknown order '{other}'"))),
        };
        let tags = tags.unwrap_or_default();
        let limit = limit.unwrap_or(50);
        let offset = offset.unwrap_or(0);

        let (agents, total) = self.node.search_agents(
            min_score,
            tier,
            category.as_deref(),
            &tags,
            search.as_deref(),
            sort_by,
            order,
            limit,
            offset,
        );

        Ok(PageJson {
            items: agents.into_iter().map(|a| agent_view(&self.node, a)).collect(),
            total,
            limit,
            offset,
        })
    }

    async fn trust_path(&self, from_address: String, to_address: String) -> Result<TrustPathJson, ErrorObjectOwned> {
        let from = self.agent_id_for(&from_address)?;
        let to = self.agent_id_for(&to_address)?;
        match self.node.trust_path(from, to) {
            Some(path) => Ok(TrustPathJson {
                found: true,
                path: path.nodes.iter().map(|id| id.0).collect(),
                hop_weights: path.hop_weights,
                confidence: path.confidence,
                distance: path.nodes.len().saturating_sub(1),
            }),
            None => Ok(TrustPathJson {
                found: false,
                path: Vec::new(),
                hop_weights: Vec::new(),
                confidence: 0.0,
                distance: 0,
            }),
        }
    }

    async fn transitive_trust(
        &self,
        from_address: String,
        to_address: String,
    ) -> Result<TransitiveTrustJson, ErrorObjectOwned> {
        let from = self.agent_id_for(&from_address)?;
        let to = self.agent_id_for(&to_address)?;
        let direct = self.node.direct_edge_weight(from, to);
        let transitive = self.node.trust_path(from, to).map(|p| p.confidence).unwrap_or(0.0);
        let combined = self.node.transitive_trust(from, to);
        Ok(TransitiveTrustJson { direct, transitive, combined })
    }

    async fn top_by_authority(&self, limit: usize) -> Result<Vec<AgentViewJson>, ErrorObjectOwned> {
        let metrics = self.node.top_by_authority(limit);
        Ok(metrics
            .into_iter()
            .filter_map(|m| self.node.get_agent(m.agent_id))
            .map(|a| agent_view(&self.node, a))
            .collect())
    }

    async fn sybil_risk(&self, min_risk: f64, limit: usize) -> Result<Vec<AgentViewJson>, ErrorObjectOwned> {
        let mut views: Vec<AgentViewJson> = self
            .node
            .search_agents(None, None, None, &[], None, AgentSortBy::Score, SortOrder::Desc, usize::MAX, 0)
            .0
            .into_iter()
            .filter(|a| {
                self.node
                    .sybil_risk(a.agent_id)
                    .map(|r| r >= min_risk)
                    .unwrap_or(false)
            })
            .map(|a| agent_view(&self.node, a))
            .collect();
        views.sort_by(|a, b| {
            b.sybil_risk_score
                .partial_cmp(&a.sybil_risk_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        views.truncate(limit);
        Ok(views)
    }

    async fn recent_alerts(&self, since: Option<DateTime<Utc>>) -> Result<Vec<AlertJson>, ErrorObjectOwned> {
        let mut alerts: Vec<AlertJson> = self
            .node
            .recent_alerts()
            .into_iter()
            .filter(|a| since.map(|s| a.timestamp >= s).unwrap_or(true))
            .map(Into::into)
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(alerts)
    }

    async fn resolve_alert(&self, id: u64) -> Result<(), ErrorObjectOwned> {
        self.node.resolve_alert(id).map_err(node_error_to_rpc)
    }

    async fn scheduler_health(&self) -> Result<Vec<SchedulerHealthJson>, ErrorObjectOwned> {
        Ok(self.node.scheduler_health().into_iter().map(Into::into).collect())
    }
}

fn parse_receipt_id(s: &str) -> Result<ReceiptId, ErrorObjectOwned> {
    let (parties, hash) = s
        .rsplit_once(':')
        .ok_or_else(|| rpc_error(-4, "receipt_id must be 'payer->payee:hash'"))?;
    let (payer, payee) = parties
        .split_once("->")
        .ok_or_else(|| rpc_error(-4, "receipt_id must be 'payer->payee:hash'"))?;
    let payer = payer
        .trim_start_matches("agent:")
        .parse::<u64>()
        .map_err(|_| rpc_error(-4, "invalid payer agent id in receipt_id"))?;
    let payee = payee
        .trim_start_matches("agent:")
        .parse::<u64>()
        .map_err(|_| rpc_error(-4, "invalid payee agent id in receipt_id"))?;
    let signature_hash = reputrust_core::ids::Hash256::from_hex(hash)
        .map_err(|e| rpc_error(-4, format!("invalid receipt hash: {e}")))?;
    Ok(ReceiptId {
        payer: AgentId(payer),
        payee: AgentId(payee),
        signature_hash,
    })
}

fn parse_edge_source_id(s: &str) -> Result<EdgeSourceId, ErrorObjectOwned> {
    if let Some(rest) = s.strip_prefix("vote:") {
        return Ok(EdgeSourceId::Vote(parse_receipt_id(rest)?));
    }
    if let Some(rest) = s.strip_prefix("endorsement:") {
        let id = rest
            .parse::<u64>()
            .map_err(|_| rpc_error(-4, "invalid endorsement id in edge source"))?;
        return Ok(EdgeSourceId::Endorsement(id));
    }
    Err(rpc_error(-4, "edge source must be 'vote:...' or 'endorsement:...'"))
}

/// Start the JSON-RPC server on `addr`. Returns a [`ServerHandle`] the
/// caller uses to stop the server on shutdown.
pub async fn start_rpc_server(addr: &str, node: Arc<Node>) -> Result<ServerHandle, NodeError> {
    let server = Server::builder()
        .build(addr)
        .await
        .map_err(|e| NodeError::Storage(format!("RPC server error: {e}")))?;

    let rpc_impl = RpcServerImpl::new(node);
    let handle = server.start(rpc_impl.into_rpc());
    Ok(handle)
}
