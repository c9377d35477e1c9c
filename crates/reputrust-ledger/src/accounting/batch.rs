//! Batch-scheme accounting.

use dashmap::DashMap;
use parking_lot::Mutex;
use reputrust_core::amount::AmountMicros;
use reputrust_core::error::CoreError;
use reputrust_core::ids::{AgentId, BatchId, Signature};
use reputrust_core::types::{Batch, BatchItem, BatchItemStatus, BatchMode, BatchStatus};

pub struct BatchLedger {
    batches: DashMap<BatchId, Mutex<Batch>>,
}

impl Default for BatchLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchLedger {
    pub fn new() -> Self {
        Self {
            batches: DashMap::new(),
        }
    }

    /// Every item starts `pending`; `declared_total` must equal the sum of
    /// item amounts within one micro-unit.
    pub fn create(
        &self,
        batch_id: BatchId,
        initiator: AgentId,
        items: Vec<(AgentId, AmountMicros)>,
        declared_total: AmountMicros,
        mode: BatchMode,
    ) -> Result<Batch, CoreError> {
        let summed: AmountMicros = items.iter().map(|(_, amount)| *amount).sum();
        if !declared_total.approx_eq(summed, 1) {
            return Err(CoreError::BatchTotalMismatch {
                declared: declared_total.to_string(),
                summed: summed.to_string(),
            });
        }

        let items = items
            .into_iter()
            .map(|(recipient, amount)| BatchItem {
                recipient,
                amount,
                status: BatchItemStatus::Pending,
                tx_signature: None,
            })
            .collect::<Vec<_>>();

        let batch = Batch {
            batch_id,
            initiator,
            total_amount: declared_total,
            mode,
            items,
            success_count: 0,
            failed_count: 0,
            status: BatchStatus::Processing,
        };
        self.batches.insert(batch_id, Mutex::new(batch.clone()));
        Ok(batch)
    }

    pub fn get(&self, batch_id: BatchId) -> Option<Batch> {
        self.batches.get(&batch_id).map(|b| b.lock().clone())
    }

    /// Record the outcome of one recipient's leg. In `atomic` mode a single
    /// failure drags every other still-pending item to `failed` and the
    /// batch itself to `failed`; in `best_effort` mode each item settles
    /// independently and the batch status is only ever `completed` (all
    /// succeeded), `failed` (all failed) or `partial` (mixed) once nothing
    /// remains `pending`.
    pub fn update_item(
        &self,
        batch_id: BatchId,
        recipient: AgentId,
        status: BatchItemStatus,
        tx_signature: Option<Signature>,
    ) -> Result<Batch, CoreError> {
        let slot = self.batches.get(&batch_id).ok_or(CoreError::InvalidRange {
            field: "batch_id",
            reason: "unknown batch".to_string(),
        })?;
        let mut batch = slot.lock();

        let idx = batch
            .items
            .iter()
            .position(|item| item.recipient == recipient && item.status == BatchItemStatus::Pending)
            .ok_or(CoreError::InvalidRange {
                field: "recipient",
                reason: "no pending item for this recipient".to_string(),
            })?;
        batch.items[idx].status = status;
        batch.items[idx].tx_signature = tx_signature;

        if batch.mode == BatchMode::Atomic && status == BatchItemStatus::Failed {
            for item in batch.items.iter_mut() {
                if item.status == BatchItemStatus::Pending {
                    item.status = BatchItemStatus::Failed;
                }
            }
        }

        batch.success_count = batch
            .items
            .iter()
            .filter(|i| i.status == BatchItemStatus::Succeeded)
            .count() as u32;
        batch.failed_count = batch
            .items
            .iter()
            .filter(|i| i.status == BatchItemStatus::Failed)
            .count() as u32;

        let all_settled = batch
            .items
            .iter()
            .all(|i| i.status != BatchItemStatus::Pending);
        batch.status = if !all_settled {
            BatchStatus::Processing
        } else if batch.failed_count == 0 {
            BatchStatus::Completed
        } else if batch.success_count == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Partial
        };

        Ok(batch.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(v: i64) -> AmountMicros {
        AmountMicros::new(v).unwrap()
    }

    #[test]
    fn rejects_mismatched_total() {
        let ledger = BatchLedger::new();
        let err = ledger
            .create(
                BatchId(1),
                AgentId(1),
                vec![(AgentId(2), amt(100))],
                amt(999),
                BatchMode::BestEffort,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::BatchTotalMismatch { .. }));
    }

    #[test]
    fn atomic_batch_fails_all_pending_items_on_one_failure() {
        let ledger = BatchLedger::new();
        let batch_id = BatchId(1);
        ledger
            .create(
                batch_id,
                AgentId(1),
                vec![(AgentId(2), amt(100)), (AgentId(3), amt(200)), (AgentId(4), amt(300))],
                amt(600),
                BatchMode::Atomic,
            )
            .unwrap();

        let batch = ledger
            .update_item(batch_id, AgentId(2), BatchItemStatus::Failed, None)
            .unwrap();

        assert_eq!(batch.status, BatchStatus::Failed);
        assert_eq!(batch.failed_count, 3);
        assert!(batch
            .items
            .iter()
            .all(|i| i.status == BatchItemStatus::Failed));
    }

    #[test]
    fn best_effort_batch_settles_independently_to_partial() {
        let ledger = BatchLedger::new();
        let batch_id = BatchId(1);
        ledger
            .create(
                batch_id,
                AgentId(1),
                vec![(AgentId(2), amt(100)), (AgentId(3), amt(200))],
                amt(300),
                BatchMode::BestEffort,
            )
            .unwrap();

        ledger
            .update_item(batch_id, AgentId(2), BatchItemStatus::Succeeded, Some(Signature::from("S1")))
            .unwrap();
        let batch = ledger
            .update_item(batch_id, AgentId(3), BatchItemStatus::Failed, None)
            .unwrap();

        assert_eq!(batch.status, BatchStatus::Partial);
        assert_eq!(batch.success_count, 1);
        assert_eq!(batch.failed_count, 1);
    }

    #[test]
    fn best_effort_batch_completes_when_all_succeed() {
        let ledger = BatchLedger::new();
        let batch_id = BatchId(1);
        ledger
            .create(
                batch_id,
                AgentId(1),
                vec![(AgentId(2), amt(100)), (AgentId(3), amt(200))],
                amt(300),
                BatchMode::BestEffort,
            )
            .unwrap();

        ledger
            .update_item(batch_id, AgentId(2), BatchItemStatus::Succeeded, None)
            .unwrap();
        let batch = ledger
            .update_item(batch_id, AgentId(3), BatchItemStatus::Succeeded, None)
            .unwrap();

        assert_eq!(batch.status, BatchStatus::Completed);
    }
}
