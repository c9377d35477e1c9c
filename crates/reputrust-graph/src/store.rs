//! Directed multi-edge trust graph: the single shared mutable structure the
//! rest of the workspace reads from and writes to.
//!
//! Edges live in a flat arena (`Vec<TrustEdge>`, indexed by position) plus
//! secondary `from`/`to`/`type` indices over those positions: "graph as
//! arena + indices", never an owning pointer graph.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use reputrust_core::ids::{AgentId, EdgeSourceId};
use reputrust_core::types::{EdgeType, TrustEdge};

use crate::error::GraphError;

type EdgeIdx = usize;

#[derive(Default)]
struct Indices {
    by_from: HashMap<AgentId, Vec<EdgeIdx>>,
    by_to: HashMap<AgentId, Vec<EdgeIdx>>,
    by_type: HashMap<EdgeType, Vec<EdgeIdx>>,
    /// Active-edge lookup for the merge/at-most-one-active-per-key rule.
    active_by_key: HashMap<(AgentId, AgentId, EdgeType), EdgeIdx>,
    by_source: HashMap<EdgeSourceId, EdgeIdx>,
}

struct Inner {
    edges: Vec<TrustEdge>,
    index: Indices,
    version: u64,
}

/// The shared trust graph. Cheap to clone (an `Arc` wrapper is expected at
/// the call site); internally single-lock, matching the "single-writer per
/// edge identity, many readers" concurrency note.
pub struct TrustGraphStore {
    inner: RwLock<Inner>,
}

impl Default for TrustGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TrustGraphStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                edges: Vec::new(),
                index: Indices::default(),
                version: 0,
            }),
        }
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    /// Insert a new edge or merge into the existing active edge for
    /// `(from, to, edge_type)`, per the merge policy: weight
    /// becomes the running arithmetic mean, categories union, source
    /// replaced by the most recent.
    pub fn upsert_edge(
        &self,
        from: AgentId,
        to: AgentId,
        edge_type: EdgeType,
        weight: f64,
        categories: Vec<String>,
        source: EdgeSourceId,
    ) -> Result<(), GraphError> {
        if from == to {
            return Err(GraphError::SelfEdge(from));
        }
        let mut inner = self.inner.write();
        let key = (from, to, edge_type);
        if let Some(&idx) = inner.index.active_by_key.get(&key) {
            let old_source = inner.edges[idx].source;
            let merged_weight = (inner.edges[idx].weight + weight) / 2.0;
            let edge = &mut inner.edges[idx];
            edge.weight = merged_weight;
            for c in categories {
                if !edge.categories.contains(&c) {
                    edge.categories.push(c);
                }
            }
            edge.source = source;
            edge.updated_at = Utc::now();
            inner.index.by_source.remove(&old_source);
            inner.index.by_source.insert(source, idx);
        } else {
            let idx = inner.edges.len();
            inner.edges.push(TrustEdge {
                from,
                to,
                edge_type,
                weight,
                categories,
                source,
                active: true,
                updated_at: Utc::now(),
            });
            inner.index.by_from.entry(from).or_default().push(idx);
            inner.index.by_to.entry(to).or_default().push(idx);
            inner.index.by_type.entry(edge_type).or_default().push(idx);
            inner.index.active_by_key.insert(key, idx);
            inner.index.by_source.insert(source, idx);
        }
        inner.version += 1;
        Ok(())
    }

    /// Deactivate the edge created from `source`. Irreversible: a later
    /// resubmission creates a brand-new edge, not a reactivation.
    pub fn deactivate_by_source(&self, source: EdgeSourceId) -> Result<(), GraphError> {
        let mut inner = self.inner.write();
        let idx = *inner
            .index
            .by_source
            .get(&source)
            .ok_or_else(|| GraphError::UnknownEdgeSource(format!("{source}")))?;
        let key = {
            let edge = &mut inner.edges[idx];
            edge.active = false;
            edge.updated_at = Utc::now();
            (edge.from, edge.to, edge.edge_type)
        };
        if inner.index.active_by_key.get(&key) == Some(&idx) {
            inner.index.active_by_key.remove(&key);
        }
        inner.version += 1;
        Ok(())
    }

    fn resolve(inner: &Inner, idxs: &[EdgeIdx], active_only: bool) -> Vec<TrustEdge> {
        idxs.iter()
            .map(|&i| inner.edges[i].clone())
            .filter(|e| !active_only || e.active)
            .collect()
    }

    pub fn edges_from(&self, agent: AgentId, active_only: bool) -> Vec<TrustEdge> {
        let inner = self.inner.read();
        match inner.index.by_from.get(&agent) {
            Some(idxs) => Self::resolve(&inner, idxs, active_only),
            None => Vec::new(),
        }
    }

    pub fn edges_to(&self, agent: AgentId, active_only: bool) -> Vec<TrustEdge> {
        let inner = self.inner.read();
        match inner.index.by_to.get(&agent) {
            Some(idxs) => Self::resolve(&inner, idxs, active_only),
            None => Vec::new(),
        }
    }

    pub fn edges_of_type(&self, edge_type: EdgeType, active_only: bool) -> Vec<TrustEdge> {
        let inner = self.inner.read();
        match inner.index.by_type.get(&edge_type) {
            Some(idxs) => Self::resolve(&inner, idxs, active_only),
            None => Vec::new(),
        }
    }

    pub fn active_edge(&self, from: AgentId, to: AgentId, edge_type: EdgeType) -> Option<TrustEdge> {
        let inner = self.inner.read();
        inner
            .index
            .active_by_key
            .get(&(from, to, edge_type))
            .map(|&idx| inner.edges[idx].clone())
    }

    pub fn out_degree(&self, agent: AgentId) -> u32 {
        self.edges_from(agent, true).len() as u32
    }

    pub fn in_degree(&self, agent: AgentId) -> u32 {
        self.edges_to(agent, true).len() as u32
    }

    /// Snapshot of all active edges, for a PageRank pass to iterate over a
    /// consistent view while writers continue ahead of it.
    pub fn snapshot_active_edges(&self) -> (u64, Vec<TrustEdge>) {
        let inner = self.inner.read();
        let edges = inner.edges.iter().filter(|e| e.active).cloned().collect();
        (inner.version, edges)
    }
}
