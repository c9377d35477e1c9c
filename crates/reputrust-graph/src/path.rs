//! Bounded BFS trust-path discovery with per-hop confidence decay, and a
//! version-aware TTL cache for discovered paths.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use reputrust_core::constants::{TRUST_CACHE_TTL_SECS, TRUST_PATH_HOP_DECAY, TRUST_PATH_MAX_HOPS};
use reputrust_core::ids::AgentId;
use reputrust_core::types::{EdgeType, TrustEdge, TrustPath};

/// Bounded BFS from `from` to `to` over `active` edges. Returns the
/// shortest path (by hop count); among equal-length paths, the one with
/// the greatest aggregate confidence wins; remaining ties break on the
/// lexicographically smallest node-id sequence, for determinism.
pub fn discover_path(
    from: AgentId,
    to: AgentId,
    edges_by_from: &HashMap<AgentId, Vec<TrustEdge>>,
) -> Option<(Vec<AgentId>, Vec<f64>, f64)> {
    if from == to {
        return None;
    }

    // BFS layer by layer so we can compare all minimum-length candidates
    // before picking a winner, rather than returning the first one found.
    let mut frontier: Vec<(Vec<AgentId>, Vec<f64>)> = vec![(vec![from], vec![])];
    let mut visited_at_hop: HashMap<AgentId, u32> = HashMap::new();
    visited_at_hop.insert(from, 0);

    for hop in 1..=TRUST_PATH_MAX_HOPS {
        let mut next_frontier = Vec::new();
        let mut candidates: Vec<(Vec<AgentId>, Vec<f64>)> = Vec::new();

        for (path, weights) in &frontier {
            let tail = *path.last().unwrap();
            let Some(out) = edges_by_from.get(&tail) else {
                continue;
            };
            for edge in out {
                if !edge.active {
                    continue;
                }
                if path.contains(&edge.to) {
                    continue; // visited set per traversal rejects cycles
                }
                let mut new_path = path.clone();
                new_path.push(edge.to);
                let mut new_weights = weights.clone();
                new_weights.push(edge.weight);

                if edge.to == to {
                    candidates.push((new_path.clone(), new_weights.clone()));
                }

                if !visited_at_hop.contains_key(&edge.to) {
                    visited_at_hop.insert(edge.to, hop);
                    next_frontier.push((new_path, new_weights));
                }
            }
        }

        if !candidates.is_empty() {
            return Some(pick_best(candidates));
        }

        if next_frontier.is_empty() {
            break;
        }
        frontier = next_frontier;
    }

    None
}

fn confidence_of(weights: &[f64]) -> f64 {
    let mut confidence = 100.0;
    for &w in weights {
        confidence *= TRUST_PATH_HOP_DECAY * (w / 100.0);
    }
    confidence
}

fn pick_best(candidates: Vec<(Vec<AgentId>, Vec<f64>)>) -> (Vec<AgentId>, Vec<f64>, f64) {
    let mut scored: Vec<(Vec<AgentId>, Vec<f64>, f64)> = candidates
        .into_iter()
        .map(|(path, weights)| {
            let c = confidence_of(&weights);
            (path, weights, c)
        })
        .collect();
    scored.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap()
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.into_iter().next().unwrap()
}

/// Transitive trust: `0.7*direct + 0.3*transitive`.
pub fn transitive_trust(direct: f64, transitive: f64) -> f64 {
    (0.7 * direct + 0.3 * transitive).clamp(0.0, 100.0)
}

/// Version-aware TTL cache for discovered paths, single-writer per
/// `(from, to)` pair.
pub struct PathCache {
    entries: RwLock<HashMap<(AgentId, AgentId), TrustPath>>,
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PathCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, path: TrustPath, now: DateTime<Utc>) {
        let key = (path.from, path.to);
        let mut path = path;
        path.calculated_at = now;
        path.expires_at = now + Duration::seconds(TRUST_CACHE_TTL_SECS);
        self.entries.write().insert(key, path);
    }

    /// Returns a cached path only if it is both unexpired and was computed
    /// against the current graph version; otherwise the entry is treated
    /// as invalid (and lazily evicted) even if its TTL hasn't lapsed.
    pub fn get(&self, from: AgentId, to: AgentId, current_version: u64, now: DateTime<Utc>) -> Option<TrustPath> {
        let mut entries = self.entries.write();
        let key = (from, to);
        let stale = match entries.get(&key) {
            Some(p) => p.graph_version != current_version || p.expires_at <= now,
            None => return None,
        };
        if stale {
            entries.remove(&key);
            None
        } else {
            entries.get(&key).cloned()
        }
    }

    /// Evict every entry expired as of `now`. Run on a periodic sweep rather
    /// than relying solely on lazy eviction via `get`, so cold entries don't
    /// linger indefinitely.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, p| p.expires_at > now);
        before - entries.len()
    }
}
