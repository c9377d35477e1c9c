//! Payment Ledger & Receipt Materializer.
//!
//! Multi-index in-memory store: a primary map keyed by the natural id
//! (here, payment `Signature`) plus secondary indices for the queries
//! callers actually need.

use chrono::Utc;
use dashmap::DashMap;
use reputrust_core::error::CoreError;
use reputrust_core::ids::{AgentId, Hash256, ReceiptId, Signature};
use reputrust_core::types::{PaymentRecord, PaymentStatus, Receipt};

/// Normalizes payment events into `PaymentRecord`s and derives exactly one
/// `Receipt` per confirmed payment.
pub struct PaymentLedger {
    payments: DashMap<Signature, PaymentRecord>,
    payments_by_agent: DashMap<AgentId, Vec<Signature>>,
    receipts: DashMap<ReceiptId, Receipt>,
    receipts_by_signature: DashMap<Signature, ReceiptId>,
    receipts_by_agent: DashMap<AgentId, Vec<ReceiptId>>,
}

impl Default for PaymentLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentLedger {
    pub fn new() -> Self {
        Self {
            payments: DashMap::new(),
            payments_by_agent: DashMap::new(),
            receipts: DashMap::new(),
            receipts_by_signature: DashMap::new(),
            receipts_by_agent: DashMap::new(),
        }
    }

    /// Ingest a payment event for agents already resolved to ids by the
    /// caller. Idempotent on `signature`: a repeat of the same terminal
    /// status is a no-op; a conflicting terminal status is
    /// `InconsistentTerminalState`. Returns the newly created receipt, if
    /// any (only `confirmed` events produce one, and only on first
    /// observation).
    pub fn observe(
        &self,
        signature: Signature,
        payer: AgentId,
        payer_address: &str,
        payee: AgentId,
        payee_address: &str,
        record: PaymentRecord,
    ) -> Result<Option<Receipt>, CoreError> {
        if let Some(existing) = self.payments.get(&signature) {
            if existing.status == record.status {
                return Ok(None);
            }
            let existing_terminal = matches!(
                existing.status,
                PaymentStatus::Confirmed | PaymentStatus::Failed
            );
            if existing_terminal {
                return Err(CoreError::InconsistentTerminalState(format!(
                    "signature {signature} already {:?}, observed {:?}",
                    existing.status, record.status
                )));
            }
        }

        let first_observation = !self.payments.contains_key(&signature);
        self.payments.insert(signature.clone(), record.clone());
        if first_observation {
            self.payments_by_agent.entry(payer).or_default().push(signature.clone());
            self.payments_by_agent.entry(payee).or_default().push(signature.clone());
        }

        if record.status != PaymentStatus::Confirmed {
            return Ok(None);
        }

        let receipt_id = ReceiptId {
            payer,
            payee,
            signature_hash: Hash256::of(signature.0.as_bytes()),
        };
        if self.receipts.contains_key(&receipt_id) {
            return Ok(None);
        }

        let _ = (payer_address, payee_address);
        let receipt = Receipt {
            id: receipt_id,
            amount: record.amount,
            content_category: None,
            created_at: Utc::now(),
            vote_cast: false,
        };
        self.receipts.insert(receipt_id, receipt.clone());
        self.receipts_by_signature.insert(signature, receipt_id);
        self.receipts_by_agent.entry(payer).or_default().push(receipt_id);
        self.receipts_by_agent.entry(payee).or_default().push(receipt_id);

        Ok(Some(receipt))
    }

    pub fn receipt_for(&self, signature: &Signature) -> Option<Receipt> {
        let id = self.receipts_by_signature.get(signature)?;
        self.receipts.get(&*id).map(|e| e.clone())
    }

    pub fn receipt_by_id(&self, id: &ReceiptId) -> Option<Receipt> {
        self.receipts.get(id).map(|e| e.clone())
    }

    pub fn receipts_for(&self, agent: AgentId) -> Vec<Receipt> {
        match self.receipts_by_agent.get(&agent) {
            Some(ids) => ids.iter().filter_map(|id| self.receipts.get(id).map(|e| e.clone())).collect(),
            None => Vec::new(),
        }
    }

    /// Every payment event (any status, any number of updates collapsed to
    /// their latest observed status) touching `agent` as payer or payee, in
    /// insertion order. Feeds the reliability sub-score and the anomaly
    /// detector's success/error-rate checks, both of which need terminal
    /// failures as well as confirmations.
    pub fn payments_for(&self, agent: AgentId) -> Vec<PaymentRecord> {
        match self.payments_by_agent.get(&agent) {
            Some(sigs) => sigs
                .iter()
                .filter_map(|sig| self.payments.get(sig).map(|e| e.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Network-wide snapshot of every payment event, for the volume-anomaly
    /// check.
    pub fn all_payments(&self) -> Vec<PaymentRecord> {
        self.payments.iter().map(|e| e.clone()).collect()
    }

    /// Flip `vote_cast` false -> true, atomically. Returns
    /// `ReceiptAlreadyUsed` if it was already true, matching the
    /// compare-and-set gate this requires.
    pub fn mark_vote_cast(&self, id: &ReceiptId) -> Result<(), CoreError> {
        let mut entry = self
            .receipts
            .get_mut(id)
            .ok_or_else(|| CoreError::CorruptInput(format!("unknown receipt {id}")))?;
        if entry.vote_cast {
            return Err(CoreError::ReceiptAlreadyUsed {
                signature: id.to_string(),
            });
        }
        entry.vote_cast = true;
        Ok(())
    }
}
