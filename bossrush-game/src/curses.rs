//! Curse inventory, phase bookkeeping and the queries combat consults.
//!
//! Curses act in one of five phases. Instant curses apply on acquisition and
//! are never stored. The others are stored with a remaining duration that
//! counts down once per matching phase invocation: `-1` lasts until the
//! effect consumes it, and reaching `0` removes the curse.
//!
//! TurnStart and PreCombat effects latch for the turn or combat they fired
//! in, so a curse expiring in that very invocation still applies once.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::data::{CombatMode, CurseActivation, CurseDefinition, CurseEffect};
use crate::enemy::EnemyInstance;
use crate::error::UsageError;
use crate::player::PlayerState;

/// Duration marker for curses that last until their effect consumes them.
pub const UNTIL_CONSUMED: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurseInstance {
    pub definition: CurseDefinition,
    pub remaining_duration: i32,
    pub is_activated: bool,
}

impl CurseInstance {
    #[must_use]
    pub fn new(definition: &CurseDefinition) -> Self {
        Self {
            definition: definition.clone(),
            remaining_duration: definition.duration,
            is_activated: false,
        }
    }

    #[must_use]
    pub const fn id(&self) -> u32 {
        self.definition.id
    }

    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.remaining_duration != 0
    }

    fn has_effect(&self, effect: CurseEffect) -> bool {
        self.is_live() && self.definition.effect == effect
    }
}

/// What obtaining a curse did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObtainOutcome {
    /// Applied immediately; deltas actually applied to the player.
    Applied { life_delta: i32, card_delta: i32 },
    /// Kept in the active set.
    Stored,
    /// A timed curse with no duration; nothing to keep.
    Discarded,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurseEngine {
    active: Vec<CurseInstance>,
    cards_negated_this_turn: bool,
    victory_inverted_this_combat: bool,
}

impl CurseEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active(&self) -> &[CurseInstance] {
        &self.active
    }

    /// Drop every curse and latch; used when a run starts.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Apply an instant curse or store a timed one.
    pub fn obtain<R>(
        &mut self,
        definition: &CurseDefinition,
        player: &mut PlayerState,
        dice_max: u32,
        rng: &mut R,
    ) -> ObtainOutcome
    where
        R: Rng + ?Sized,
    {
        if definition.activation == CurseActivation::Instant {
            let outcome = apply_instant(definition, player, dice_max, rng);
            log::info!("curse {} applied: {outcome:?}", definition.name);
            return outcome;
        }
        if definition.duration == 0 {
            log::warn!(
                "curse {} has no duration outside the instant phase; discarding",
                definition.name
            );
            return ObtainOutcome::Discarded;
        }
        log::info!(
            "curse {} stored for {} ({:?})",
            definition.name,
            definition.duration,
            definition.activation
        );
        self.active.push(CurseInstance::new(definition));
        ObtainOutcome::Stored
    }

    /// Count down every curse of `activation`; returns the effects that fired.
    fn run_phase(&mut self, activation: CurseActivation) -> Vec<(CurseEffect, f32)> {
        let mut fired = Vec::new();
        for curse in &mut self.active {
            if curse.definition.activation != activation || !curse.is_live() {
                continue;
            }
            fired.push((curse.definition.effect, curse.definition.enemy_health_multiplier));
            if curse.remaining_duration > 0 {
                curse.remaining_duration -= 1;
                log::debug!(
                    "curse {} now has {} left",
                    curse.definition.name,
                    curse.remaining_duration
                );
            }
        }
        self.active.retain(CurseInstance::is_live);
        fired
    }

    /// Encounter start: weaken the enemy and latch combat-wide effects.
    pub fn on_pre_combat(&mut self, enemy: &mut EnemyInstance, mode: CombatMode) {
        self.victory_inverted_this_combat = false;
        self.cards_negated_this_turn = false;
        for (effect, multiplier) in self.run_phase(CurseActivation::PreCombat) {
            match effect {
                CurseEffect::WeakenEnemy if mode == CombatMode::TraditionalRpg => {
                    let before = enemy.rpg_health;
                    enemy.weaken(multiplier);
                    log::debug!("{} weakened from {before} to {}", enemy.name(), enemy.rpg_health);
                }
                CurseEffect::InvertVictoryCondition => self.victory_inverted_this_combat = true,
                _ => {}
            }
        }
    }

    /// Start of an attempt: latch per-turn effects.
    pub fn on_turn_start(&mut self) {
        self.cards_negated_this_turn = false;
        for (effect, _) in self.run_phase(CurseActivation::TurnStart) {
            match effect {
                CurseEffect::NegateCards => self.cards_negated_this_turn = true,
                CurseEffect::InvertVictoryCondition => self.victory_inverted_this_combat = true,
                _ => {}
            }
        }
    }

    /// After a victory: decay post-combat curses.
    pub fn on_post_combat(&mut self) {
        let fired = self.run_phase(CurseActivation::PostCombat);
        log::debug!("post-combat phase touched {} curses", fired.len());
    }

    /// Requires a manual curse with an unactivated instance, and turn one
    /// when the curse demands it.
    #[must_use]
    pub fn can_activate(&self, curse_id: u32, current_turn: u32) -> bool {
        self.active.iter().any(|curse| {
            curse.id() == curse_id
                && curse.definition.requires_player_activation
                && !curse.is_activated
                && curse.is_live()
                && (!curse.definition.must_activate_on_turn_one || current_turn == 1)
        })
    }

    /// Activate a manual curse and return its effect. Escape curses are
    /// consumed immediately.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::UnknownCurse`] if no such curse is held, or
    /// [`UsageError::CurseNotActivatable`] if it cannot be activated now.
    pub fn activate(&mut self, curse_id: u32, current_turn: u32) -> Result<CurseEffect, UsageError> {
        if !self.active.iter().any(|curse| curse.id() == curse_id) {
            return Err(UsageError::UnknownCurse(curse_id));
        }
        if !self.can_activate(curse_id, current_turn) {
            return Err(UsageError::CurseNotActivatable(curse_id));
        }
        let index = self
            .active
            .iter()
            .position(|curse| curse.id() == curse_id && !curse.is_activated)
            .ok_or(UsageError::CurseNotActivatable(curse_id))?;
        let effect = self.active[index].definition.effect;
        if effect == CurseEffect::EscapeCombat {
            let curse = self.active.remove(index);
            log::info!("curse {} used to escape", curse.definition.name);
        } else {
            self.active[index].is_activated = true;
            log::info!("curse {} activated", self.active[index].definition.name);
        }
        Ok(effect)
    }

    #[must_use]
    pub fn has_inverted_victory_condition(&self) -> bool {
        self.victory_inverted_this_combat
            || self
                .active
                .iter()
                .any(|curse| curse.has_effect(CurseEffect::InvertVictoryCondition))
    }

    #[must_use]
    pub fn has_negated_cards(&self) -> bool {
        self.cards_negated_this_turn
            || self
                .active
                .iter()
                .any(|curse| curse.has_effect(CurseEffect::NegateCards))
    }

    #[must_use]
    pub fn has_damage_negation(&self) -> bool {
        self.active
            .iter()
            .any(|curse| curse.is_activated && curse.has_effect(CurseEffect::NegateDamage))
    }

    #[must_use]
    pub fn has_reward_block(&self) -> bool {
        self.active
            .iter()
            .any(|curse| curse.has_effect(CurseEffect::BlockRewards))
    }

    /// Consume an activated, unlimited damage shield to keep the player at
    /// one life. Returns whether a shield was used.
    pub fn on_player_death(&mut self, player: &mut PlayerState) -> bool {
        let shield = self.active.iter().position(|curse| {
            curse.is_activated
                && curse.definition.effect == CurseEffect::NegateDamage
                && curse.remaining_duration == UNTIL_CONSUMED
        });
        let Some(index) = shield else {
            return false;
        };
        let curse = self.active.remove(index);
        player.set_life(1);
        log::info!("curse {} saved the player", curse.definition.name);
        true
    }
}

/// Percent chance a curse event follows a victory.
#[must_use]
pub fn trigger_chance(is_spirit: bool, turns_used: u32, config: &EngineConfig) -> f32 {
    if is_spirit {
        config.spirit_curse_chance
    } else {
        let turns = f32::from(u16::try_from(turns_used).unwrap_or(u16::MAX));
        config.base_curse_chance + turns * config.curse_chance_per_turn
    }
}

/// Roll whether a curse event triggers.
pub fn should_trigger_event<R>(
    is_spirit: bool,
    turns_used: u32,
    config: &EngineConfig,
    rng: &mut R,
) -> bool
where
    R: Rng + ?Sized,
{
    let chance = trigger_chance(is_spirit, turns_used, config);
    let roll: f32 = rng.gen_range(0.0..100.0);
    log::debug!("curse event roll {roll:.2} against {chance:.2}");
    roll < chance
}

fn apply_instant<R>(
    definition: &CurseDefinition,
    player: &mut PlayerState,
    dice_max: u32,
    rng: &mut R,
) -> ObtainOutcome
where
    R: Rng + ?Sized,
{
    match definition.effect {
        CurseEffect::ModifyHealth => ObtainOutcome::Applied {
            life_delta: player.adjust_life(definition.magnitude),
            card_delta: 0,
        },
        CurseEffect::ModifyCards => {
            let mut card_delta = 0;
            if definition.magnitude >= 0 {
                for _ in 0..definition.magnitude {
                    player.grant_random_card(rng);
                    card_delta += 1;
                }
            } else {
                for _ in 0..definition.magnitude.unsigned_abs() {
                    if player.remove_random_card(rng).is_none() {
                        break;
                    }
                    card_delta -= 1;
                }
            }
            ObtainOutcome::Applied {
                life_delta: 0,
                card_delta,
            }
        }
        CurseEffect::GamblingDice => {
            let roll = i32::try_from(rng.gen_range(1..=dice_max.max(1))).unwrap_or(1);
            let delta = if roll % 2 == 0 { roll } else { -roll };
            log::debug!("gambling die rolled {roll}");
            ObtainOutcome::Applied {
                life_delta: player.adjust_life(delta),
                card_delta: 0,
            }
        }
        other => {
            log::warn!("curse {} has no instant form of {other:?}", definition.name);
            ObtainOutcome::Applied {
                life_delta: 0,
                card_delta: 0,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity::AffinityType;
    use crate::data::{CurseCategory, EnemyDefinition, EnemyTier, EnemyTierProfile};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn curse(id: u32, activation: CurseActivation, effect: CurseEffect, duration: i32) -> CurseDefinition {
        CurseDefinition {
            id,
            name: format!("curse-{id}"),
            description: String::new(),
            category: CurseCategory::Negative,
            activation,
            effect,
            magnitude: 0,
            duration,
            requires_player_activation: activation == CurseActivation::PlayerActivated,
            must_activate_on_turn_one: false,
            enemy_health_multiplier: 1.0,
            modes: Vec::new(),
        }
    }

    fn enemy() -> EnemyInstance {
        let definition = EnemyDefinition {
            id: 1,
            name: String::from("Target"),
            default_affinity: AffinityType::Force,
            relations: Vec::new(),
            is_spirit: false,
            tiers: vec![EnemyTierProfile {
                tier: EnemyTier::Tier1,
                health_threshold: 10,
                dice_count: 2,
                max_attempts: 3,
                failure_damage: 10,
                rpg_health: Some(40),
                rpg_dice_count: Some(2),
            }],
        };
        EnemyInstance::spawn(&definition, EnemyTier::Tier1).unwrap()
    }

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(21)
    }

    #[test]
    fn timed_curse_expires_after_exactly_n_phases() {
        let mut engine = CurseEngine::new();
        let mut player = PlayerState::new(100);
        let def = curse(1, CurseActivation::PostCombat, CurseEffect::BlockRewards, 3);
        assert_eq!(engine.obtain(&def, &mut player, 12, &mut rng()), ObtainOutcome::Stored);
        for _ in 0..2 {
            engine.on_post_combat();
            assert!(engine.has_reward_block());
        }
        engine.on_post_combat();
        assert!(!engine.has_reward_block());
        assert!(engine.active().is_empty());
    }

    #[test]
    fn unlimited_curse_never_expires() {
        let mut engine = CurseEngine::new();
        let mut player = PlayerState::new(100);
        let def = curse(2, CurseActivation::TurnStart, CurseEffect::NegateCards, UNTIL_CONSUMED);
        engine.obtain(&def, &mut player, 12, &mut rng());
        for _ in 0..25 {
            engine.on_turn_start();
        }
        assert_eq!(engine.active().len(), 1);
        assert!(engine.has_negated_cards());
    }

    #[test]
    fn phases_only_touch_matching_curses() {
        let mut engine = CurseEngine::new();
        let mut player = PlayerState::new(100);
        engine.obtain(
            &curse(3, CurseActivation::PostCombat, CurseEffect::BlockRewards, 1),
            &mut player,
            12,
            &mut rng(),
        );
        engine.on_turn_start();
        let mut target = enemy();
        engine.on_pre_combat(&mut target, CombatMode::Passive);
        assert_eq!(engine.active()[0].remaining_duration, 1);
    }

    #[test]
    fn turn_start_negation_latches_for_the_turn() {
        let mut engine = CurseEngine::new();
        let mut player = PlayerState::new(100);
        engine.obtain(
            &curse(4, CurseActivation::TurnStart, CurseEffect::NegateCards, 1),
            &mut player,
            12,
            &mut rng(),
        );
        engine.on_turn_start();
        assert!(engine.active().is_empty());
        assert!(engine.has_negated_cards());
        engine.on_turn_start();
        assert!(!engine.has_negated_cards());
    }

    #[test]
    fn pre_combat_weakens_rpg_enemies_only() {
        let mut player = PlayerState::new(100);
        let mut weaken = curse(5, CurseActivation::PreCombat, CurseEffect::WeakenEnemy, 2);
        weaken.enemy_health_multiplier = 0.5;

        let mut engine = CurseEngine::new();
        engine.obtain(&weaken, &mut player, 12, &mut rng());
        let mut target = enemy();
        engine.on_pre_combat(&mut target, CombatMode::TraditionalRpg);
        assert_eq!(target.rpg_health, 20);

        let mut target = enemy();
        engine.on_pre_combat(&mut target, CombatMode::PlayerChooses);
        assert_eq!(target.rpg_health, 40);
        assert!(engine.active().is_empty());
    }

    #[test]
    fn instant_curses_apply_without_storing() {
        let mut engine = CurseEngine::new();
        let mut player = PlayerState::new(100);
        player.damage(50);
        let mut heal = curse(6, CurseActivation::Instant, CurseEffect::ModifyHealth, 0);
        heal.magnitude = 15;
        assert_eq!(
            engine.obtain(&heal, &mut player, 12, &mut rng()),
            ObtainOutcome::Applied {
                life_delta: 15,
                card_delta: 0
            }
        );
        assert_eq!(player.life(), 65);

        let mut gift = curse(7, CurseActivation::Instant, CurseEffect::ModifyCards, 0);
        gift.magnitude = 3;
        engine.obtain(&gift, &mut player, 12, &mut rng());
        assert_eq!(player.cards().total(), 3);

        let mut theft = curse(8, CurseActivation::Instant, CurseEffect::ModifyCards, 0);
        theft.magnitude = -5;
        assert_eq!(
            engine.obtain(&theft, &mut player, 12, &mut rng()),
            ObtainOutcome::Applied {
                life_delta: 0,
                card_delta: -3
            }
        );
        assert_eq!(player.cards().total(), 0);
        assert!(engine.active().is_empty());
    }

    #[test]
    fn gambling_die_sign_follows_parity() {
        let mut engine = CurseEngine::new();
        let gamble = curse(9, CurseActivation::Instant, CurseEffect::GamblingDice, 0);
        let mut rng = rng();
        for _ in 0..30 {
            let mut player = PlayerState::new(100);
            player.damage(50);
            let ObtainOutcome::Applied { life_delta, .. } =
                engine.obtain(&gamble, &mut player, 12, &mut rng)
            else {
                panic!("gambling dice applies instantly");
            };
            assert!(life_delta != 0 && life_delta.abs() <= 12);
            assert_eq!(life_delta > 0, life_delta % 2 == 0);
        }
    }

    #[test]
    fn activation_rules() {
        let mut engine = CurseEngine::new();
        let mut player = PlayerState::new(100);
        let mut shield = curse(10, CurseActivation::PlayerActivated, CurseEffect::NegateDamage, UNTIL_CONSUMED);
        shield.must_activate_on_turn_one = true;
        let escape = curse(11, CurseActivation::PlayerActivated, CurseEffect::EscapeCombat, UNTIL_CONSUMED);
        let passive = curse(12, CurseActivation::TurnStart, CurseEffect::NegateCards, 2);
        for def in [&shield, &escape, &passive] {
            engine.obtain(def, &mut player, 12, &mut rng());
        }

        assert!(!engine.can_activate(10, 2));
        assert!(engine.can_activate(10, 1));
        assert!(!engine.can_activate(12, 1));
        assert_eq!(engine.activate(99, 1), Err(UsageError::UnknownCurse(99)));
        assert_eq!(engine.activate(12, 1), Err(UsageError::CurseNotActivatable(12)));

        assert!(!engine.has_damage_negation());
        assert_eq!(engine.activate(10, 1), Ok(CurseEffect::NegateDamage));
        assert!(engine.has_damage_negation());
        assert!(!engine.can_activate(10, 1));

        assert_eq!(engine.activate(11, 4), Ok(CurseEffect::EscapeCombat));
        assert!(engine.active().iter().all(|curse| curse.id() != 11));
    }

    #[test]
    fn death_shield_is_consumed_once() {
        let mut engine = CurseEngine::new();
        let mut player = PlayerState::new(100);
        let shield = curse(10, CurseActivation::PlayerActivated, CurseEffect::NegateDamage, UNTIL_CONSUMED);
        engine.obtain(&shield, &mut player, 12, &mut rng());
        player.damage(100);
        assert!(!engine.on_player_death(&mut player));
        assert_eq!(player.life(), 0);

        engine.activate(10, 1).unwrap();
        assert!(engine.on_player_death(&mut player));
        assert_eq!(player.life(), 1);
        assert!(engine.active().is_empty());
        player.damage(5);
        assert!(!engine.on_player_death(&mut player));
    }

    #[test]
    fn trigger_chance_grows_with_turns() {
        let cfg = EngineConfig::default();
        assert!((trigger_chance(false, 0, &cfg) - 5.0).abs() < f32::EPSILON);
        assert!((trigger_chance(false, 3, &cfg) - 20.0).abs() < f32::EPSILON);
        assert!((trigger_chance(true, 3, &cfg) - 80.0).abs() < f32::EPSILON);

        let never = EngineConfig {
            base_curse_chance: 0.0,
            curse_chance_per_turn: 0.0,
            ..EngineConfig::default()
        };
        let mut rng = rng();
        assert!((0..100).all(|_| !should_trigger_event(false, 10, &never, &mut rng)));
        let always = EngineConfig {
            spirit_curse_chance: 100.0,
            ..EngineConfig::default()
        };
        assert!((0..100).all(|_| should_trigger_event(true, 0, &always, &mut rng)));
    }

    #[test]
    fn clear_drops_curses_and_latches() {
        let mut engine = CurseEngine::new();
        let mut player = PlayerState::new(100);
        engine.obtain(
            &curse(4, CurseActivation::TurnStart, CurseEffect::NegateCards, 1),
            &mut player,
            12,
            &mut rng(),
        );
        engine.on_turn_start();
        engine.clear();
        assert!(!engine.has_negated_cards());
        assert!(engine.active().is_empty());
    }
}
