//! Ability usability, card spending and unlock tracking.
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::affinity::{AffinityTable, AffinityType};
use crate::config::SpendingPolicy;
use crate::data::{AbilityDefinition, GameData};
use crate::error::UsageError;
use crate::player::PlayerState;

static BASIC_ATTACKS: OnceLock<AffinityTable<AbilityDefinition>> = OnceLock::new();

/// Plain attack of one affinity, built once and shared.
#[must_use]
pub fn basic_attack(affinity: AffinityType) -> &'static AbilityDefinition {
    BASIC_ATTACKS
        .get_or_init(|| {
            AffinityTable::new(
                AbilityDefinition::basic_attack(AffinityType::Force),
                AbilityDefinition::basic_attack(AffinityType::Agility),
                AbilityDefinition::basic_attack(AffinityType::Skill),
            )
        })
        .get(affinity)
}

/// Whether the player can currently pay for `ability`. Never mutates.
#[must_use]
pub fn can_use_ability(
    ability: &AbilityDefinition,
    player: &PlayerState,
    attempts_remaining: i32,
) -> bool {
    ability.costs.health <= player.life()
        && ability.costs.turns <= attempts_remaining
        && ability.costs.cards <= player.card_count(ability.affinity)
}

/// Unlock state and the per-combat card ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbilityTracker {
    policy: SpendingPolicy,
    unlocked: BTreeSet<u32>,
    spent_this_combat: AffinityTable<u32>,
}

impl AbilityTracker {
    #[must_use]
    pub fn new(policy: SpendingPolicy) -> Self {
        Self {
            policy,
            unlocked: BTreeSet::new(),
            spent_this_combat: AffinityTable::default(),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> SpendingPolicy {
        self.policy
    }

    #[must_use]
    pub const fn spent_this_combat(&self) -> &AffinityTable<u32> {
        &self.spent_this_combat
    }

    /// Deduct cards and record them on the combat ledger.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InsufficientCards`] and leaves both the
    /// inventory and the ledger untouched.
    pub fn spend_cards(
        &mut self,
        player: &mut PlayerState,
        affinity: AffinityType,
        amount: u32,
    ) -> Result<(), UsageError> {
        player.remove_cards(affinity, amount)?;
        let spent = self.spent_this_combat.get_mut(affinity);
        *spent = spent.saturating_add(amount);
        Ok(())
    }

    /// Refund the ledger under the per-instance policy, then clear it.
    pub fn on_combat_won(&mut self, player: &mut PlayerState) {
        if self.policy == SpendingPolicy::PerInstance {
            for (affinity, amount) in self.spent_this_combat.iter() {
                if *amount > 0 {
                    log::debug!("refunding {amount} {affinity} cards");
                    player.add_cards(affinity, *amount);
                }
            }
        }
        self.reset_ledger();
    }

    pub fn reset_ledger(&mut self) {
        self.spent_this_combat = AffinityTable::default();
    }

    /// Card count unlocks are measured against.
    #[must_use]
    pub const fn unlock_count(&self, player: &PlayerState, affinity: AffinityType) -> u32 {
        match self.policy {
            SpendingPolicy::Relative => *player.peak_cards().get(affinity),
            SpendingPolicy::Absolute | SpendingPolicy::PerInstance => player.card_count(affinity),
        }
    }

    /// Unlock every ability whose requirement is met; returns the new ids.
    pub fn check_unlocks(&mut self, data: &GameData, player: &PlayerState) -> Vec<u32> {
        let mut newly = Vec::new();
        for ability in &data.abilities {
            if ability.is_basic || self.unlocked.contains(&ability.id) {
                continue;
            }
            if self.unlock_count(player, ability.affinity) >= ability.unlock_requirement {
                log::info!("unlocked ability {}", ability.name);
                self.unlocked.insert(ability.id);
                newly.push(ability.id);
            }
        }
        newly
    }

    #[must_use]
    pub fn is_unlocked(&self, ability: &AbilityDefinition) -> bool {
        ability.is_basic || self.unlocked.contains(&ability.id)
    }

    #[must_use]
    pub fn unlocked_ids(&self) -> Vec<u32> {
        self.unlocked.iter().copied().collect()
    }

    /// Unlocked abilities of one affinity in catalog order.
    #[must_use]
    pub fn available_abilities<'a>(
        &self,
        data: &'a GameData,
        affinity: AffinityType,
    ) -> Vec<&'a AbilityDefinition> {
        data.abilities_for(affinity)
            .filter(|ability| self.is_unlocked(ability))
            .collect()
    }

    /// Cards reported at the end of a run.
    #[must_use]
    pub fn final_card_count(&self, player: &PlayerState) -> AffinityTable<u32> {
        match self.policy {
            SpendingPolicy::Relative => *player.peak_cards(),
            SpendingPolicy::Absolute | SpendingPolicy::PerInstance => *player.cards(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AbilityCosts;

    fn costly(cards: u32, health: i32, turns: i32) -> AbilityDefinition {
        AbilityDefinition {
            id: 42,
            name: String::from("Costly"),
            costs: AbilityCosts {
                cards,
                health,
                turns,
            },
            unlock_requirement: 3,
            is_basic: false,
            ..AbilityDefinition::basic_attack(AffinityType::Force)
        }
    }

    #[test]
    fn usability_fails_iff_a_cost_exceeds_resources() {
        let mut player = PlayerState::new(20);
        player.add_cards(AffinityType::Force, 2);
        let before = player.clone();

        assert!(can_use_ability(&costly(2, 20, 3), &player, 3));
        assert!(!can_use_ability(&costly(3, 0, 0), &player, 3));
        assert!(!can_use_ability(&costly(0, 21, 0), &player, 3));
        assert!(!can_use_ability(&costly(0, 0, 4), &player, 3));
        assert!(can_use_ability(basic_attack(AffinityType::Skill), &player, 0));
        assert_eq!(player, before);
    }

    #[test]
    fn basic_attacks_are_shared() {
        let first = basic_attack(AffinityType::Agility);
        let second = basic_attack(AffinityType::Agility);
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.affinity, AffinityType::Agility);
    }

    #[test]
    fn per_instance_refunds_on_victory() {
        let mut player = PlayerState::new(100);
        player.add_cards(AffinityType::Skill, 3);
        let mut tracker = AbilityTracker::new(SpendingPolicy::PerInstance);
        tracker.spend_cards(&mut player, AffinityType::Skill, 2).unwrap();
        assert_eq!(player.card_count(AffinityType::Skill), 1);
        tracker.on_combat_won(&mut player);
        assert_eq!(player.card_count(AffinityType::Skill), 3);
        assert_eq!(tracker.spent_this_combat().total(), 0);
    }

    #[test]
    fn absolute_keeps_spent_cards_gone() {
        let mut player = PlayerState::new(100);
        player.add_cards(AffinityType::Skill, 3);
        let mut tracker = AbilityTracker::new(SpendingPolicy::Absolute);
        tracker.spend_cards(&mut player, AffinityType::Skill, 2).unwrap();
        tracker.on_combat_won(&mut player);
        assert_eq!(player.card_count(AffinityType::Skill), 1);
        assert_eq!(tracker.spent_this_combat().total(), 0);
    }

    #[test]
    fn failed_spend_leaves_ledger_alone() {
        let mut player = PlayerState::new(100);
        let mut tracker = AbilityTracker::new(SpendingPolicy::PerInstance);
        assert!(tracker.spend_cards(&mut player, AffinityType::Force, 1).is_err());
        assert_eq!(tracker.spent_this_combat().total(), 0);
    }

    #[test]
    fn unlocks_are_monotonic_and_policy_aware() {
        let mut data = GameData::empty();
        data.abilities.push(costly(1, 0, 0));
        let mut player = PlayerState::new(100);
        player.add_cards(AffinityType::Force, 3);

        let mut relative = AbilityTracker::new(SpendingPolicy::Relative);
        let mut absolute = AbilityTracker::new(SpendingPolicy::Absolute);
        player.remove_cards(AffinityType::Force, 2).unwrap();
        assert_eq!(relative.check_unlocks(&data, &player), vec![42]);
        assert!(absolute.check_unlocks(&data, &player).is_empty());

        player.add_cards(AffinityType::Force, 2);
        assert_eq!(absolute.check_unlocks(&data, &player), vec![42]);
        player.remove_cards(AffinityType::Force, 3).unwrap();
        assert!(absolute.check_unlocks(&data, &player).is_empty());
        assert!(absolute.is_unlocked(&data.abilities[0]));
        assert_eq!(absolute.available_abilities(&data, AffinityType::Force).len(), 1);
        assert!(absolute.available_abilities(&data, AffinityType::Skill).is_empty());
    }

    #[test]
    fn relative_policy_reports_peak_cards() {
        let mut player = PlayerState::new(100);
        player.add_cards(AffinityType::Agility, 5);
        player.remove_cards(AffinityType::Agility, 4).unwrap();
        let relative = AbilityTracker::new(SpendingPolicy::Relative);
        let absolute = AbilityTracker::new(SpendingPolicy::Absolute);
        assert_eq!(relative.final_card_count(&player).agility, 5);
        assert_eq!(absolute.final_card_count(&player).agility, 1);
    }
}
