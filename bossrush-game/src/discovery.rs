//! Which affinities the player has tried against each enemy.
use std::collections::{HashMap, HashSet};

use crate::affinity::AffinityType;

/// Append-only record keyed by enemy id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffinityDiscoveryTracker {
    discovered: HashMap<u32, HashSet<AffinityType>>,
}

impl AffinityDiscoveryTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attack; returns `true` the first time the pair is seen.
    pub fn register_discovery(&mut self, enemy_id: u32, affinity: AffinityType) -> bool {
        self.discovered.entry(enemy_id).or_default().insert(affinity)
    }

    #[must_use]
    pub fn is_discovered(&self, enemy_id: u32, affinity: AffinityType) -> bool {
        self.discovered
            .get(&enemy_id)
            .is_some_and(|set| set.contains(&affinity))
    }

    /// Affinities revealed for one enemy, in declaration order.
    #[must_use]
    pub fn discovered_for(&self, enemy_id: u32) -> Vec<AffinityType> {
        AffinityType::ALL
            .into_iter()
            .filter(|affinity| self.is_discovered(enemy_id, *affinity))
            .collect()
    }
}
