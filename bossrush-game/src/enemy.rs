//! Runtime enemy state and roster selection.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::affinity::{AffinityMultiplier, AffinityType};
use crate::config::TierWeights;
use crate::data::{CombatMode, EnemyDefinition, EnemyTier, EnemyTierProfile, GameData};
use crate::error::ConfigError;
use crate::events::EnemySnapshot;
use crate::numbers::scale_round;

/// One encounter's copy of an enemy and its chosen tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyInstance {
    definition: EnemyDefinition,
    profile: EnemyTierProfile,
    pub attempts_remaining: i32,
    pub rpg_health: i32,
    pub rpg_dice_count: u32,
}

impl EnemyInstance {
    /// Build an instance for `tier`, falling back to the first profile when
    /// the enemy lacks that tier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnemyWithoutTiers`] if the enemy has no profiles.
    pub fn spawn(definition: &EnemyDefinition, tier: EnemyTier) -> Result<Self, ConfigError> {
        let profile = match definition.profile_for(tier) {
            Some(profile) => profile,
            None => {
                let fallback = definition.tiers.first().ok_or_else(|| {
                    ConfigError::EnemyWithoutTiers {
                        id: definition.id,
                        name: definition.name.clone(),
                    }
                })?;
                log::warn!(
                    "{} has no {tier} profile; using {}",
                    definition.name,
                    fallback.tier
                );
                fallback
            }
        };
        Ok(Self::from_profile(definition, profile))
    }

    fn from_profile(definition: &EnemyDefinition, profile: &EnemyTierProfile) -> Self {
        Self {
            definition: definition.clone(),
            attempts_remaining: profile.max_attempts,
            rpg_health: profile.rpg_health.unwrap_or(profile.health_threshold),
            rpg_dice_count: profile.rpg_dice_count.unwrap_or(profile.dice_count),
            profile: profile.clone(),
        }
    }

    #[must_use]
    pub const fn definition(&self) -> &EnemyDefinition {
        &self.definition
    }

    #[must_use]
    pub const fn profile(&self) -> &EnemyTierProfile {
        &self.profile
    }

    #[must_use]
    pub const fn id(&self) -> u32 {
        self.definition.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    #[must_use]
    pub const fn tier(&self) -> EnemyTier {
        self.profile.tier
    }

    #[must_use]
    pub const fn is_spirit(&self) -> bool {
        self.definition.is_spirit
    }

    /// Resistance to `affinity`; Passive mode ignores resistances.
    #[must_use]
    pub fn multiplier_for(&self, affinity: AffinityType, mode: CombatMode) -> AffinityMultiplier {
        if mode == CombatMode::Passive {
            AffinityMultiplier::Neutral
        } else {
            self.definition.multiplier_for(affinity)
        }
    }

    /// Dice rolled before ability modifiers.
    #[must_use]
    pub const fn base_dice(&self, mode: CombatMode) -> u32 {
        match mode {
            CombatMode::TraditionalRpg => self.rpg_dice_count,
            CombatMode::Passive | CombatMode::PlayerChooses => self.profile.dice_count,
        }
    }

    /// Shrink the RPG health pool, keeping at least one point.
    pub fn weaken(&mut self, multiplier: f32) {
        self.rpg_health = scale_round(self.rpg_health, multiplier).max(1);
    }

    #[must_use]
    pub fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.definition.id,
            name: self.definition.name.clone(),
            tier: self.profile.tier,
            is_spirit: self.definition.is_spirit,
            attempts_remaining: self.attempts_remaining,
            rpg_health: self.rpg_health,
        }
    }
}

/// Weighted tier draw, normalized by the sum of the weights.
pub fn draw_tier<R>(weights: &TierWeights, rng: &mut R) -> EnemyTier
where
    R: Rng + ?Sized,
{
    let total = weights.total();
    if total <= 0.0 || !total.is_finite() {
        return EnemyTier::Tier1;
    }
    let roll = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for tier in EnemyTier::ALL {
        cumulative += weights.weight(tier);
        if roll < cumulative {
            return tier;
        }
    }
    EnemyTier::Tier3
}

/// Pick a uniform enemy and a weighted tier, then spawn it.
///
/// # Errors
///
/// Returns a config error when the roster is empty or the drawn enemy has no
/// tier profiles.
pub fn spawn_random<R>(
    data: &GameData,
    weights: &TierWeights,
    rng: &mut R,
) -> Result<EnemyInstance, ConfigError>
where
    R: Rng + ?Sized,
{
    if data.enemies.is_empty() {
        log::error!("cannot start an encounter: enemy roster is empty");
        return Err(ConfigError::NoEnemies);
    }
    let definition = &data.enemies[rng.gen_range(0..data.enemies.len())];
    let tier = draw_tier(weights, rng);
    EnemyInstance::spawn(definition, tier).inspect_err(|err| log::error!("{err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AffinityRelation;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn profile(tier: EnemyTier, rpg: bool) -> EnemyTierProfile {
        EnemyTierProfile {
            tier,
            health_threshold: 10 * i32::try_from(tier.ordinal()).unwrap(),
            dice_count: 2,
            max_attempts: 3,
            failure_damage: 10,
            rpg_health: rpg.then_some(20),
            rpg_dice_count: rpg.then_some(4),
        }
    }

    fn golem(tiers: Vec<EnemyTierProfile>) -> EnemyDefinition {
        EnemyDefinition {
            id: 7,
            name: String::from("Golem"),
            default_affinity: AffinityType::Force,
            relations: vec![AffinityRelation {
                affinity: AffinityType::Agility,
                multiplier: AffinityMultiplier::Weak,
            }],
            is_spirit: false,
            tiers,
        }
    }

    #[test]
    fn spawn_copies_counters_from_profile() {
        let enemy = EnemyInstance::spawn(&golem(vec![profile(EnemyTier::Tier1, true)]), EnemyTier::Tier1)
            .unwrap();
        assert_eq!(enemy.attempts_remaining, 3);
        assert_eq!(enemy.rpg_health, 20);
        assert_eq!(enemy.base_dice(CombatMode::TraditionalRpg), 4);
        assert_eq!(enemy.base_dice(CombatMode::Passive), 2);
    }

    #[test]
    fn missing_tier_falls_back_to_first_profile() {
        let def = golem(vec![profile(EnemyTier::Tier2, false), profile(EnemyTier::Tier3, false)]);
        let enemy = EnemyInstance::spawn(&def, EnemyTier::Tier1).unwrap();
        assert_eq!(enemy.tier(), EnemyTier::Tier2);
        assert_eq!(enemy.rpg_health, 20);
        assert_eq!(enemy.rpg_dice_count, 2);
    }

    #[test]
    fn tierless_enemy_is_a_config_error() {
        let err = EnemyInstance::spawn(&golem(Vec::new()), EnemyTier::Tier1).unwrap_err();
        assert!(matches!(err, ConfigError::EnemyWithoutTiers { id: 7, .. }));

        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let err = spawn_random(&GameData::empty(), &TierWeights::default(), &mut rng).unwrap_err();
        assert!(matches!(err, ConfigError::NoEnemies));
    }

    #[test]
    fn passive_mode_ignores_resistances() {
        let enemy = EnemyInstance::spawn(&golem(vec![profile(EnemyTier::Tier1, false)]), EnemyTier::Tier1)
            .unwrap();
        assert_eq!(
            enemy.multiplier_for(AffinityType::Agility, CombatMode::Passive),
            AffinityMultiplier::Neutral
        );
        assert_eq!(
            enemy.multiplier_for(AffinityType::Agility, CombatMode::PlayerChooses),
            AffinityMultiplier::Weak
        );
    }

    #[test]
    fn weaken_halves_rpg_health() {
        let mut enemy =
            EnemyInstance::spawn(&golem(vec![profile(EnemyTier::Tier1, true)]), EnemyTier::Tier1)
                .unwrap();
        enemy.weaken(0.5);
        assert_eq!(enemy.rpg_health, 10);
        enemy.weaken(0.0);
        assert_eq!(enemy.rpg_health, 1);
    }

    #[test]
    fn tier_draw_respects_zero_weights() {
        let mut rng = ChaCha20Rng::seed_from_u64(99);
        let weights = TierWeights {
            tier1: 0.0,
            tier2: 3.0,
            tier3: 0.0,
        };
        for _ in 0..50 {
            assert_eq!(draw_tier(&weights, &mut rng), EnemyTier::Tier2);
        }
    }

    #[test]
    fn tier_draw_uses_every_weighted_tier() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let weights = TierWeights::default();
        let mut counts = [0_u32; 3];
        for _ in 0..2_000 {
            let tier = draw_tier(&weights, &mut rng);
            counts[usize::try_from(tier.ordinal() - 1).unwrap()] += 1;
        }
        assert!(counts[0] > counts[1]);
        assert!(counts[1] > counts[2]);
        assert!(counts[2] > 0);
    }
}
