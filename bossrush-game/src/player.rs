//! Player resources for one run.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::affinity::{AffinityTable, AffinityType};
use crate::error::UsageError;

/// Per-run counters reported in the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub enemies_defeated: u32,
    pub combats_won: u32,
    pub combats_lost: u32,
    pub combats_escaped: u32,
    pub turns_used: u32,
    pub curses_obtained: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    life: i32,
    max_life: i32,
    pub score: u32,
    cards: AffinityTable<u32>,
    /// Most cards ever held per affinity this run.
    peak_cards: AffinityTable<u32>,
    pub stats: RunStats,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PlayerState {
    #[must_use]
    pub fn new(max_life: i32) -> Self {
        let max_life = max_life.max(1);
        Self {
            life: max_life,
            max_life,
            score: 0,
            cards: AffinityTable::default(),
            peak_cards: AffinityTable::default(),
            stats: RunStats::default(),
        }
    }

    /// Full life, no score, no cards, fresh counters.
    pub fn reset(&mut self, max_life: i32) {
        *self = Self::new(max_life);
    }

    #[must_use]
    pub const fn life(&self) -> i32 {
        self.life
    }

    #[must_use]
    pub const fn max_life(&self) -> i32 {
        self.max_life
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.life > 0
    }

    /// Apply a life delta clamped to `[0, max_life]`; returns the applied change.
    pub fn adjust_life(&mut self, delta: i32) -> i32 {
        let before = self.life;
        self.life = before.saturating_add(delta).clamp(0, self.max_life);
        self.life - before
    }

    pub fn heal(&mut self, amount: i32) -> i32 {
        self.adjust_life(amount.max(0))
    }

    /// Returns the life actually lost.
    pub fn damage(&mut self, amount: i32) -> i32 {
        -self.adjust_life(-amount.max(0))
    }

    pub(crate) fn set_life(&mut self, life: i32) {
        self.life = life.clamp(0, self.max_life);
    }

    #[must_use]
    pub const fn cards(&self) -> &AffinityTable<u32> {
        &self.cards
    }

    #[must_use]
    pub const fn peak_cards(&self) -> &AffinityTable<u32> {
        &self.peak_cards
    }

    #[must_use]
    pub const fn card_count(&self, affinity: AffinityType) -> u32 {
        *self.cards.get(affinity)
    }

    pub fn add_cards(&mut self, affinity: AffinityType, amount: u32) {
        let count = self.cards.get_mut(affinity);
        *count = count.saturating_add(amount);
        let current = *count;
        let peak = self.peak_cards.get_mut(affinity);
        *peak = (*peak).max(current);
    }

    /// Remove cards, rejecting the whole call if it would underflow.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InsufficientCards`] without touching the inventory.
    pub fn remove_cards(&mut self, affinity: AffinityType, amount: u32) -> Result<(), UsageError> {
        let count = self.cards.get_mut(affinity);
        if *count < amount {
            return Err(UsageError::InsufficientCards {
                affinity,
                requested: amount,
                available: *count,
            });
        }
        *count -= amount;
        Ok(())
    }

    /// Grant one card of a uniformly drawn affinity.
    pub fn grant_random_card<R>(&mut self, rng: &mut R) -> AffinityType
    where
        R: Rng + ?Sized,
    {
        let affinity = AffinityType::random(rng);
        self.add_cards(affinity, 1);
        affinity
    }

    /// Remove one card from a random affinity that still has cards.
    pub fn remove_random_card<R>(&mut self, rng: &mut R) -> Option<AffinityType>
    where
        R: Rng + ?Sized,
    {
        let stocked: Vec<AffinityType> = self
            .cards
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(affinity, _)| affinity)
            .collect();
        if stocked.is_empty() {
            return None;
        }
        let affinity = stocked[rng.gen_range(0..stocked.len())];
        *self.cards.get_mut(affinity) -= 1;
        Some(affinity)
    }
}
