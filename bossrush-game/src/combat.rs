//! Attack resolution for a single encounter.
//!
//! An encounter moves `Idle -> InProgress -> Resolving -> Resolved`. Weakness
//! victories outside Passive mode pause in `AwaitingRewardChoice` until the
//! caller picks a card. Finalization consumes the `Resolving` phase, so it
//! cannot run twice for the same encounter.
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::smallvec;

use crate::abilities::{AbilityTracker, can_use_ability};
use crate::affinity::{AffinityType, WEAKNESS_MULTIPLIER};
use crate::config::EngineConfig;
use crate::curses::CurseEngine;
use crate::data::{AbilityDefinition, CombatMode, DiceModifiers, EnemyTier, GameData};
use crate::discovery::AffinityDiscoveryTracker;
use crate::enemy::EnemyInstance;
use crate::error::UsageError;
use crate::events::{
    AttackReport, CombatEvent, CombatOutcome, CombatReport, EventBatch, RunSummary,
};
use crate::numbers::{count_to_i32, scale_round};
use crate::player::PlayerState;

/// Outcome waiting for post-combat processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingResolution {
    pub outcome: CombatOutcome,
    /// Multiplier of the deciding attack.
    pub multiplier: f32,
}

impl PendingResolution {
    const fn defeat() -> Self {
        Self {
            outcome: CombatOutcome::Defeat,
            multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CombatPhase {
    Idle,
    InProgress,
    Resolving(PendingResolution),
    AwaitingRewardChoice { score: u32 },
    Resolved(CombatOutcome),
}

/// Everything an attempt reads or mutates besides the encounter itself.
pub struct CombatContext<'a, R: ?Sized> {
    pub data: &'a GameData,
    pub config: &'a EngineConfig,
    pub player: &'a mut PlayerState,
    pub curses: &'a mut CurseEngine,
    pub abilities: &'a mut AbilityTracker,
    pub discovery: &'a mut AffinityDiscoveryTracker,
    pub rng: &'a mut R,
}

/// Dice rolled once ability modifiers are applied; never fewer than one.
#[must_use]
pub fn dice_count(base: u32, dice: &DiceModifiers) -> u32 {
    let mut count = count_to_i32(base).saturating_add(dice.modifier);
    if let Some(scale) = dice.scale {
        count = scale_round(count, scale);
    }
    count = count.saturating_add(dice.addition);
    u32::try_from(count.max(1)).unwrap_or(1)
}

pub fn roll_dice<R>(count: u32, faces: u32, rng: &mut R) -> i32
where
    R: Rng + ?Sized,
{
    let faces = faces.max(1);
    (0..count)
        .map(|_| count_to_i32(rng.gen_range(1..=faces)))
        .fold(0, i32::saturating_add)
}

/// Card contribution: optionally scaled, then negated by curses.
#[must_use]
pub fn card_bonus(cards: u32, card_multiplier: Option<f32>, negated: bool) -> i32 {
    let mut bonus = count_to_i32(cards);
    if let Some(multiplier) = card_multiplier {
        bonus = scale_round(bonus, multiplier);
    }
    if negated { -bonus } else { bonus }
}

#[must_use]
pub fn final_total(mode: CombatMode, roll: i32, card_bonus: i32, multiplier: f32) -> i32 {
    match mode {
        CombatMode::Passive => roll.saturating_add(card_bonus),
        CombatMode::PlayerChooses => roll.saturating_add(scale_round(card_bonus, multiplier)),
        CombatMode::TraditionalRpg => scale_round(roll.saturating_add(card_bonus), multiplier),
    }
}

#[must_use]
pub const fn threshold_victory(total: i32, threshold: i32, inverted: bool) -> bool {
    if inverted {
        total <= threshold
    } else {
        total >= threshold
    }
}

/// Tier ordinal plus one for a weakness exploit.
#[must_use]
pub fn encounter_score(tier: EnemyTier, multiplier: f32) -> u32 {
    tier.ordinal() + u32::from(multiplier >= WEAKNESS_MULTIPLIER)
}

fn survived<R: ?Sized>(ctx: &mut CombatContext<'_, R>) -> bool {
    ctx.player.is_alive() || ctx.curses.on_player_death(ctx.player)
}

fn push_unlocks<R: ?Sized>(ctx: &mut CombatContext<'_, R>, events: &mut EventBatch) {
    for ability_id in ctx.abilities.check_unlocks(ctx.data, ctx.player) {
        events.push(CombatEvent::AbilityUnlocked { ability_id });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombatEngine {
    mode: CombatMode,
    phase: CombatPhase,
    enemy: Option<EnemyInstance>,
    selected_affinity: AffinityType,
    turn: u32,
    turns_used: u32,
}

impl CombatEngine {
    #[must_use]
    pub const fn new(mode: CombatMode) -> Self {
        Self {
            mode,
            phase: CombatPhase::Idle,
            enemy: None,
            selected_affinity: AffinityType::Force,
            turn: 0,
            turns_used: 0,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> CombatMode {
        self.mode
    }

    #[must_use]
    pub const fn phase(&self) -> CombatPhase {
        self.phase
    }

    #[must_use]
    pub const fn enemy(&self) -> Option<&EnemyInstance> {
        self.enemy.as_ref()
    }

    #[must_use]
    pub const fn selected_affinity(&self) -> AffinityType {
        self.selected_affinity
    }

    pub(crate) const fn set_selected_affinity(&mut self, affinity: AffinityType) {
        self.selected_affinity = affinity;
    }

    /// Attempts accepted so far this encounter.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Turn number the next attempt will have.
    #[must_use]
    pub const fn current_turn(&self) -> u32 {
        self.turn + 1
    }

    /// Turns taken this encounter. Turns that went unnoticed are not counted.
    #[must_use]
    pub const fn turns_used(&self) -> u32 {
        self.turns_used
    }

    #[must_use]
    pub const fn is_in_progress(&self) -> bool {
        matches!(self.phase, CombatPhase::InProgress)
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<CombatOutcome> {
        match self.phase {
            CombatPhase::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    fn ensure_in_progress(&self) -> Result<(), UsageError> {
        match self.phase {
            CombatPhase::InProgress => Ok(()),
            CombatPhase::Idle => Err(UsageError::CombatNotInProgress),
            CombatPhase::AwaitingRewardChoice { .. } => Err(UsageError::RewardSelectionPending),
            CombatPhase::Resolving(_) | CombatPhase::Resolved(_) => {
                Err(UsageError::CombatAlreadyResolved)
            }
        }
    }

    fn summary<R: ?Sized>(&self, ctx: &CombatContext<'_, R>) -> RunSummary {
        RunSummary::capture(self.mode, ctx.player, ctx.abilities, self.enemy.as_ref())
    }

    /// Start an encounter against `enemy`, running the pre-combat curses.
    pub fn begin<R>(&mut self, mut enemy: EnemyInstance, ctx: &mut CombatContext<'_, R>) -> EventBatch
    where
        R: Rng + ?Sized,
    {
        ctx.curses.on_pre_combat(&mut enemy, self.mode);
        ctx.abilities.reset_ledger();
        if self.mode == CombatMode::Passive {
            self.selected_affinity = enemy.definition().default_affinity;
        }
        self.turn = 0;
        self.turns_used = 0;
        log::info!(
            "combat started: {} ({}) in {} mode",
            enemy.name(),
            enemy.tier(),
            self.mode
        );
        let snapshot = enemy.snapshot();
        self.enemy = Some(enemy);
        self.phase = CombatPhase::InProgress;
        smallvec![CombatEvent::CombatStarted { enemy: snapshot }]
    }

    /// Resolve one player turn with `ability`.
    ///
    /// # Errors
    ///
    /// Rejects the call without any state change when the encounter is not
    /// in progress, the player is down, or the ability is locked or
    /// unaffordable.
    pub fn player_attempt<R>(
        &mut self,
        ability: &AbilityDefinition,
        ctx: &mut CombatContext<'_, R>,
    ) -> Result<EventBatch, UsageError>
    where
        R: Rng + ?Sized,
    {
        self.ensure_in_progress()?;
        if !ctx.player.is_alive() {
            return Err(UsageError::PlayerDefeated);
        }
        if !ctx.abilities.is_unlocked(ability) {
            return Err(UsageError::AbilityLocked(ability.id));
        }
        let attempts = self
            .enemy
            .as_ref()
            .map_or(0, |enemy| enemy.attempts_remaining);
        if !can_use_ability(ability, ctx.player, attempts) {
            return Err(UsageError::AbilityUnusable {
                name: ability.name.clone(),
            });
        }

        self.turn += 1;
        ctx.curses.on_turn_start();
        let mut events = EventBatch::new();
        if let Some(pending) = self.attack(ability, ctx, &mut events)? {
            self.phase = CombatPhase::Resolving(pending);
            events.extend(self.finalize(ctx)?);
        }
        Ok(events)
    }

    fn attack<R>(
        &mut self,
        ability: &AbilityDefinition,
        ctx: &mut CombatContext<'_, R>,
        events: &mut EventBatch,
    ) -> Result<Option<PendingResolution>, UsageError>
    where
        R: Rng + ?Sized,
    {
        let mode = self.mode;
        let Some(enemy) = self.enemy.as_mut() else {
            return Err(UsageError::CombatNotInProgress);
        };

        ctx.player.damage(ability.costs.health);
        if ability.costs.cards > 0 {
            ctx.abilities
                .spend_cards(ctx.player, ability.affinity, ability.costs.cards)?;
        }
        if !survived(ctx) {
            return Ok(Some(PendingResolution::defeat()));
        }

        if let Some(gate) = ability.success_gate {
            let draw: f32 = ctx.rng.gen_range(0.0..100.0);
            if draw >= gate.chance {
                ctx.player.damage(gate.health_penalty);
                enemy.attempts_remaining -= 1 + gate.turn_penalty.max(0);
                self.turns_used += 1;
                ctx.player.stats.turns_used += 1;
                log::debug!(
                    "{} failed its gate ({draw:.1} >= {:.1}); {} attempts left",
                    ability.name,
                    gate.chance,
                    enemy.attempts_remaining
                );
                events.push(CombatEvent::AttemptsChanged {
                    remaining: enemy.attempts_remaining,
                });
                let defeated = !survived(ctx) || enemy.attempts_remaining <= 0;
                return Ok(defeated.then(PendingResolution::defeat));
            }
        }

        let dice = dice_count(enemy.base_dice(mode), &ability.dice);
        let faces = ability.dice.max_face.unwrap_or(ctx.config.default_dice_max);
        let roll = roll_dice(dice, faces, ctx.rng);
        let bonus = card_bonus(
            ctx.player.card_count(ability.affinity),
            ability.card_multiplier,
            ctx.curses.has_negated_cards(),
        );
        let multiplier = enemy.multiplier_for(ability.affinity, mode).factor() + ability.multiplier_bonus;
        if mode.tracks_discovery() {
            ctx.discovery.register_discovery(enemy.id(), ability.affinity);
        }
        let total = final_total(mode, roll, bonus, multiplier);
        let victory = match mode {
            CombatMode::TraditionalRpg => {
                enemy.rpg_health = enemy.rpg_health.saturating_sub(total);
                enemy.rpg_health <= 0
            }
            CombatMode::Passive | CombatMode::PlayerChooses => threshold_victory(
                total,
                enemy.profile().health_threshold,
                ctx.curses.has_inverted_victory_condition(),
            ),
        };
        log::debug!(
            "{} rolled {dice}d{faces} = {roll}, cards {bonus}, x{multiplier:.2} -> {total} ({})",
            ability.name,
            if victory { "hit" } else { "miss" }
        );
        events.push(CombatEvent::AttackResult(AttackReport {
            ability_id: ability.id,
            affinity: ability.affinity,
            dice,
            roll,
            card_bonus: bonus,
            total,
            multiplier,
        }));

        if victory && let Some(heal) = ability.on_kill_heal {
            ctx.player.heal(heal);
        }

        let skipped = ability.turn_skip.is_some_and(|skip| {
            let draw: f32 = ctx.rng.gen_range(0.0..100.0);
            if draw < skip.chance {
                log::debug!("{} went unnoticed", ability.name);
                true
            } else {
                ctx.player.damage(skip.detection_penalty);
                false
            }
        });

        // A miss costs one attempt; the ability's turn cost applies either way.
        let mut consumed = ability.costs.turns.max(0);
        if !victory {
            consumed += 1;
        }
        enemy.attempts_remaining -= consumed;
        if !skipped {
            self.turns_used += 1;
            ctx.player.stats.turns_used += 1;
        }
        events.push(CombatEvent::AttemptsChanged {
            remaining: enemy.attempts_remaining,
        });

        if victory {
            let pending = if survived(ctx) {
                PendingResolution {
                    outcome: CombatOutcome::Victory,
                    multiplier,
                }
            } else {
                PendingResolution::defeat()
            };
            return Ok(Some(pending));
        }
        let defeated = !survived(ctx) || enemy.attempts_remaining <= 0;
        Ok(defeated.then(PendingResolution::defeat))
    }

    /// Run post-combat processing for the pending outcome.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::NothingToFinalize`] unless an outcome is pending;
    /// nothing changes in that case.
    pub fn finalize<R>(&mut self, ctx: &mut CombatContext<'_, R>) -> Result<EventBatch, UsageError>
    where
        R: Rng + ?Sized,
    {
        let pending = match std::mem::replace(&mut self.phase, CombatPhase::Idle) {
            CombatPhase::Resolving(pending) => pending,
            other => {
                self.phase = other;
                return Err(UsageError::NothingToFinalize);
            }
        };
        let events = match pending.outcome {
            CombatOutcome::Victory => self.finish_victory(pending.multiplier, ctx),
            CombatOutcome::Defeat => self.finish_defeat(ctx),
            CombatOutcome::Escaped => self.finish_escape(ctx),
        };
        Ok(events)
    }

    fn finish_victory<R>(&mut self, multiplier: f32, ctx: &mut CombatContext<'_, R>) -> EventBatch
    where
        R: Rng + ?Sized,
    {
        let tier = self.enemy.as_ref().map_or(EnemyTier::Tier1, EnemyInstance::tier);
        let score = encounter_score(tier, multiplier);
        ctx.player.score += score;
        ctx.player.stats.enemies_defeated += 1;
        ctx.player.stats.combats_won += 1;
        ctx.abilities.on_combat_won(ctx.player);

        let blocked = ctx.curses.has_reward_block();
        ctx.curses.on_post_combat();

        let mut events = EventBatch::new();
        let reward = if blocked {
            log::info!("victory reward blocked by a curse");
            None
        } else if self.mode == CombatMode::Passive {
            Some(ctx.player.grant_random_card(ctx.rng))
        } else if multiplier >= WEAKNESS_MULTIPLIER {
            push_unlocks(ctx, &mut events);
            self.phase = CombatPhase::AwaitingRewardChoice { score };
            events.push(CombatEvent::WaitingForCardSelection { score });
            log::info!("weakness exploited; waiting for a card choice");
            return events;
        } else {
            let draw: f32 = ctx.rng.gen_range(0.0..100.0);
            (draw < ctx.config.random_card_chance).then(|| ctx.player.grant_random_card(ctx.rng))
        };

        push_unlocks(ctx, &mut events);
        self.phase = CombatPhase::Resolved(CombatOutcome::Victory);
        log::info!("victory worth {score}; reward {reward:?}");
        events.push(CombatEvent::CombatEnded(CombatReport {
            outcome: CombatOutcome::Victory,
            score,
            reward_card: reward,
            life_lost: 0,
        }));
        events
    }

    fn finish_defeat<R>(&mut self, ctx: &mut CombatContext<'_, R>) -> EventBatch
    where
        R: Rng + ?Sized,
    {
        ctx.player.stats.combats_lost += 1;
        ctx.abilities.reset_ledger();
        let failure_damage = self
            .enemy
            .as_ref()
            .map_or(0, |enemy| enemy.profile().failure_damage);
        let life_lost = if ctx.curses.has_damage_negation() {
            log::info!("failure damage negated by a curse");
            0
        } else {
            ctx.player.damage(failure_damage)
        };
        self.phase = CombatPhase::Resolved(CombatOutcome::Defeat);

        if survived(ctx) {
            log::info!("defeat; {} life left", ctx.player.life());
            smallvec![CombatEvent::CombatEnded(CombatReport {
                outcome: CombatOutcome::Defeat,
                score: 0,
                reward_card: None,
                life_lost,
            })]
        } else {
            log::info!("player defeated; final score {}", ctx.player.score);
            smallvec![CombatEvent::GameOver(self.summary(ctx))]
        }
    }

    fn finish_escape<R>(&mut self, ctx: &mut CombatContext<'_, R>) -> EventBatch
    where
        R: Rng + ?Sized,
    {
        ctx.player.stats.combats_escaped += 1;
        ctx.abilities.reset_ledger();
        self.phase = CombatPhase::Resolved(CombatOutcome::Escaped);
        log::info!("escaped from combat");
        smallvec![CombatEvent::CombatEnded(CombatReport {
            outcome: CombatOutcome::Escaped,
            score: 0,
            reward_card: None,
            life_lost: 0,
        })]
    }

    /// Grant the chosen card after a weakness victory.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::NoRewardPending`] when no choice is waiting.
    pub fn select_reward_card<R>(
        &mut self,
        affinity: AffinityType,
        ctx: &mut CombatContext<'_, R>,
    ) -> Result<EventBatch, UsageError>
    where
        R: Rng + ?Sized,
    {
        let CombatPhase::AwaitingRewardChoice { score } = self.phase else {
            return Err(UsageError::NoRewardPending);
        };
        ctx.player.add_cards(affinity, 1);
        let mut events = EventBatch::new();
        push_unlocks(ctx, &mut events);
        self.phase = CombatPhase::Resolved(CombatOutcome::Victory);
        events.push(CombatEvent::CombatEnded(CombatReport {
            outcome: CombatOutcome::Victory,
            score,
            reward_card: Some(affinity),
            life_lost: 0,
        }));
        Ok(events)
    }

    /// Leave the encounter without damage or reward.
    ///
    /// # Errors
    ///
    /// Returns a usage error unless the encounter is in progress.
    pub fn escape<R>(&mut self, ctx: &mut CombatContext<'_, R>) -> Result<EventBatch, UsageError>
    where
        R: Rng + ?Sized,
    {
        self.ensure_in_progress()?;
        self.phase = CombatPhase::Resolving(PendingResolution {
            outcome: CombatOutcome::Escaped,
            multiplier: 1.0,
        });
        self.finalize(ctx)
    }
}
