//! RocksDB-backed write-ahead event log.
//!
//! This store persists nothing but the append-only sequence of
//! [`NodeEvent`]s that produced the in-memory
//! state. On restart the node replays the log from the beginning through
//! the same apply path a live call would have taken, rebuilding every
//! collaborator (registry, graph, ledger, score history, alerts) from
//! scratch. A single column family is enough for that.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use rocksdb::{IteratorMode, Options, DB};

use crate::error::NodeError;
use crate::events::NodeEvent;

const CF_EVENTS: &str = "events";
const ALL_CFS: &[&str] = &[CF_EVENTS];

/// Append-only, replayable event log.
pub struct EventLog {
    db: DB,
    next_seq: AtomicU64,
}

fn seq_key(seq: u64) -> [u8; 8] {
    seq.to_be_bytes()
}

impl EventLog {
    /// Open or create the log at `path`. Does not replay; callers pull
    /// events out via [`EventLog::replay`] and apply them themselves, since
    /// only the caller knows how to reconstruct the in-memory engines.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let db = DB::open_cf(&db_opts, path.as_ref(), ALL_CFS)
            .map_err(|e| NodeError::Storage(e.to_string()))?;

        let cf = db
            .cf_handle(CF_EVENTS)
            .ok_or_else(|| NodeError::Storage("missing events column family".to_string()))?;
        let next_seq = match db.iterator_cf(&cf, IteratorMode::End).next() {
            Some(Ok((key, _))) => {
                let bytes: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                    NodeError::Storage("corrupt event log key".to_string())
                })?;
                u64::from_be_bytes(bytes) + 1
            }
            Some(Err(e)) => return Err(NodeError::Storage(e.to_string())),
            None => 0,
        };

        Ok(Self {
            db,
            next_seq: AtomicU64::new(next_seq),
        })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily, NodeError> {
        self.db
            .cf_handle(CF_EVENTS)
            .ok_or_else(|| NodeError::Storage("missing events column family".to_string()))
    }

    /// Append `event` durably and return the sequence number it was
    /// assigned. Sequence numbers are monotonic and gap-free.
    pub fn append(&self, event: &NodeEvent) -> Result<u64, NodeError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let bytes = serde_json::to_vec(event)
            .map_err(|e| NodeError::Storage(format!("event serialize: {e}")))?;
        self.db
            .put_cf(&self.cf()?, seq_key(seq), bytes)
            .map_err(|e| NodeError::Storage(e.to_string()))?;
        Ok(seq)
    }

    /// Every event in the log, in the order they were appended.
    pub fn replay(&self) -> Result<Vec<NodeEvent>, NodeError> {
        let cf = self.cf()?;
        let mut events = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| NodeError::Storage(e.to_string()))?;
            let event: NodeEvent = serde_json::from_slice(&value)
                .map_err(|e| NodeError::Storage(format!("event deserialize: {e}")))?;
            events.push(event);
        }
        Ok(events)
    }

    pub fn flush(&self) -> Result<(), NodeError> {
        self.db.flush().map_err(|e| NodeError::Storage(e.to_string()))
    }
}
