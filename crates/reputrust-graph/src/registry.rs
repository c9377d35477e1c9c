//! Dense agent table: assigns a stable [`AgentId`] to each address the first
//! time it is observed. Agents are never deleted, only deactivated.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use reputrust_core::clock::Clock;
use reputrust_core::ids::AgentId;
use reputrust_core::types::{Agent, Tier};

/// Shared agent directory. Readers and writers both go through `DashMap`,
/// so agent creation during concurrent intake never blocks on the graph
/// store's own lock.
pub struct AgentRegistry {
    by_address: DashMap<String, AgentId>,
    agents: DashMap<AgentId, Agent>,
    next_id: AtomicU64,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            by_address: DashMap::new(),
            agents: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Look up an agent id by address without creating one.
    pub fn lookup(&self, address: &str) -> Option<AgentId> {
        self.by_address.get(address).map(|e| *e)
    }

    /// Assign (or reuse) a stable id for `address`.
    pub fn get_or_create(&self, address: &str, clock: &dyn Clock) -> AgentId {
        if let Some(id) = self.lookup(address) {
            return id;
        }
        let id = AgentId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let now = clock.now();
        let agent = Agent {
            agent_id: id,
            address: address.to_string(),
            display_name: None,
            category: None,
            capabilities: Vec::new(),
            active: true,
            verified: false,
            created_at: now,
            updated_at: now,
            current_score: 0,
            current_tier: Tier::Bronze,
        };
        self.by_address.insert(address.to_string(), id);
        self.agents.insert(id, agent);
        id
    }

    pub fn get(&self, id: AgentId) -> Option<Agent> {
        self.agents.get(&id).map(|e| e.clone())
    }

    pub fn set_active(&self, id: AgentId, active: bool) {
        if let Some(mut agent) = self.agents.get_mut(&id) {
            agent.active = active;
            agent.updated_at = Utc::now();
        }
    }

    pub fn update_score(&self, id: AgentId, score: u32, tier: Tier) {
        if let Some(mut agent) = self.agents.get_mut(&id) {
            agent.current_score = score;
            agent.current_tier = tier;
            agent.updated_at = Utc::now();
        }
    }

    /// All ids currently marked active, used as the PageRank agent universe.
    pub fn active_ids(&self) -> Vec<AgentId> {
        self.agents
            .iter()
            .filter(|e| e.active)
            .map(|e| *e.key())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reputrust_core::clock::FixedClock;

    #[test]
    fn same_address_returns_same_id() {
        let reg = AgentRegistry::new();
        let clock = FixedClock::default();
        let a1 = reg.get_or_create("addr-a", &clock);
        let a2 = reg.get_or_create("addr-a", &clock);
        assert_eq!(a1, a2);
    }

    #[test]
    fn distinct_addresses_get_distinct_ids() {
        let reg = AgentRegistry::new();
        let clock = FixedClock::default();
        let a = reg.get_or_create("addr-a", &clock);
        let b = reg.get_or_create("addr-b", &clock);
        assert_ne!(a, b);
    }

    #[test]
    fn deactivation_is_reflected_in_active_ids() {
        let reg = AgentRegistry::new();
        let clock = FixedClock::default();
        let a = reg.get_or_create("addr-a", &clock);
        let b = reg.get_or_create("addr-b", &clock);
        assert_eq!(reg.active_ids().len(), 2);
        reg.set_active(a, false);
        let active = reg.active_ids();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0], b);
    }
}
