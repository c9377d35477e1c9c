//! Score history log and tier-change event emission.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use reputrust_core::ids::AgentId;
use reputrust_core::types::{ScoreHistoryEntry, Tier, TierChangeEvent};

pub struct ScoreHistoryStore {
    history: DashMap<AgentId, Vec<ScoreHistoryEntry>>,
}

impl Default for ScoreHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreHistoryStore {
    pub fn new() -> Self {
        Self {
            history: DashMap::new(),
        }
    }

    /// Appends a history entry and returns a `TierChangeEvent` if this
    /// recompute crossed a tier boundary relative to the agent's last
    /// recorded tier (an agent with no prior history is compared against
    /// `Tier::Bronze`, the implicit starting tier).
    pub fn record(
        &self,
        agent_id: AgentId,
        score: u32,
        tier: Tier,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Option<TierChangeEvent> {
        let mut entries = self.history.entry(agent_id).or_default();
        let previous_tier = entries.last().map(|e| e.tier).unwrap_or(Tier::Bronze);

        entries.push(ScoreHistoryEntry {
            agent_id,
            score,
            tier,
            reason: reason.to_string(),
            timestamp: now,
        });

        if tier != previous_tier {
            Some(TierChangeEvent {
                agent_id,
                from_tier: previous_tier,
                to_tier: tier,
                score,
                timestamp: now,
            })
        } else {
            None
        }
    }

    pub fn history_for(&self, agent_id: AgentId) -> Vec<ScoreHistoryEntry> {
        self.history
            .get(&agent_id)
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_recompute_above_bronze_emits_a_tier_change() {
        let store = ScoreHistoryStore::new();
        let event = store
            .record(AgentId(1), 600, Tier::Silver, "recompute", Utc::now())
            .expect("silver is above the implicit bronze starting tier");
        assert_eq!(event.from_tier, Tier::Bronze);
        assert_eq!(event.to_tier, Tier::Silver);
    }

    #[test]
    fn repeat_recompute_in_same_tier_emits_nothing() {
        let store = ScoreHistoryStore::new();
        store.record(AgentId(1), 600, Tier::Silver, "recompute", Utc::now());
        let event = store.record(AgentId(1), 650, Tier::Silver, "recompute", Utc::now());
        assert!(event.is_none());
        assert_eq!(store.history_for(AgentId(1)).len(), 2);
    }

    #[test]
    fn demotion_is_also_reported() {
        let store = ScoreHistoryStore::new();
        store.record(AgentId(1), 800, Tier::Gold, "recompute", Utc::now());
        let event = store
            .record(AgentId(1), 400, Tier::Bronze, "recompute", Utc::now())
            .expect("demotion crosses a tier boundary too");
        assert_eq!(event.from_tier, Tier::Gold);
        assert_eq!(event.to_tier, Tier::Bronze);
    }
}
