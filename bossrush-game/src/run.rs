//! Run lifecycle: encounter sequencing, curse events and run termination.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use smallvec::smallvec;
use std::sync::Arc;

use crate::abilities::{AbilityTracker, basic_attack};
use crate::affinity::AffinityType;
use crate::combat::{CombatContext, CombatEngine, CombatPhase};
use crate::config::EngineConfig;
use crate::curses::{CurseEngine, ObtainOutcome, should_trigger_event};
use crate::data::{AbilityDefinition, CombatMode, CurseEffect, GameData};
use crate::discovery::AffinityDiscoveryTracker;
use crate::enemy::spawn_random;
use crate::error::{ConfigError, EngineError, UsageError};
use crate::events::{CombatEvent, CombatOutcome, EventBatch, RunSummary};
use crate::player::PlayerState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RunState {
    #[default]
    NoRun,
    InProgress,
    Ended(RunSummary),
}

fn reject(err: UsageError) -> EngineError {
    log::warn!("rejected: {err}");
    EngineError::Usage(err)
}

fn config_failure(err: ConfigError) -> EngineError {
    log::error!("{err}");
    EngineError::Config(err)
}

/// Owns one player's runs and everything that outlives a single encounter.
///
/// Player state and curses reset with each run. Discovered affinities and
/// ability unlocks persist for the coordinator's lifetime.
#[derive(Debug, Clone)]
pub struct RunCoordinator {
    data: Arc<GameData>,
    config: EngineConfig,
    rng: ChaCha20Rng,
    player: PlayerState,
    curses: CurseEngine,
    abilities: AbilityTracker,
    discovery: AffinityDiscoveryTracker,
    combat: CombatEngine,
    state: RunState,
    curse_roll: Option<bool>,
    curse_event_used: bool,
    pending_curses: Vec<u32>,
}

impl RunCoordinator {
    /// Build a coordinator over validated content.
    ///
    /// # Errors
    ///
    /// Returns a config error if the content or tuning values are unusable.
    pub fn new(data: GameData, config: EngineConfig, seed: u64) -> Result<Self, ConfigError> {
        data.validate().inspect_err(|err| log::error!("{err}"))?;
        config.validate().inspect_err(|err| log::error!("{err}"))?;
        Ok(Self {
            player: PlayerState::new(config.max_life),
            abilities: AbilityTracker::new(config.spending_policy),
            data: Arc::new(data),
            config,
            rng: ChaCha20Rng::seed_from_u64(seed),
            curses: CurseEngine::new(),
            discovery: AffinityDiscoveryTracker::new(),
            combat: CombatEngine::new(CombatMode::default()),
            state: RunState::NoRun,
            curse_roll: None,
            curse_event_used: false,
            pending_curses: Vec::new(),
        })
    }

    /// Coordinator over the bundled catalog and default tuning.
    ///
    /// # Errors
    ///
    /// Returns a config error if the bundled catalog is unusable.
    pub fn with_defaults(seed: u64) -> Result<Self, ConfigError> {
        Self::new(GameData::load_from_static(), EngineConfig::default(), seed)
    }

    fn split(&mut self) -> (&mut CombatEngine, CombatContext<'_, ChaCha20Rng>) {
        (
            &mut self.combat,
            CombatContext {
                data: &self.data,
                config: &self.config,
                player: &mut self.player,
                curses: &mut self.curses,
                abilities: &mut self.abilities,
                discovery: &mut self.discovery,
                rng: &mut self.rng,
            },
        )
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.state == RunState::InProgress {
            Ok(())
        } else {
            Err(reject(UsageError::NoRunInProgress))
        }
    }

    fn summary(&self) -> RunSummary {
        RunSummary::capture(
            self.combat.mode(),
            &self.player,
            &self.abilities,
            self.combat.enemy(),
        )
    }

    /// Move to `Ended` when the batch carries a game over.
    fn settle(&mut self, events: &EventBatch) {
        if let Some(CombatEvent::GameOver(summary)) = events
            .iter()
            .find(|event| matches!(event, CombatEvent::GameOver(_)))
        {
            log::info!("run over with score {}", summary.score);
            self.state = RunState::Ended(summary.clone());
        }
    }

    fn push_unlocks(&mut self, events: &mut EventBatch) {
        for ability_id in self.abilities.check_unlocks(&self.data, &self.player) {
            events.push(CombatEvent::AbilityUnlocked { ability_id });
        }
    }

    fn start_encounter(&mut self, events: &mut EventBatch) -> Result<(), EngineError> {
        let enemy = spawn_random(&self.data, &self.config.tier_weights, &mut self.rng)
            .map_err(config_failure)?;
        self.curse_roll = None;
        self.curse_event_used = false;
        self.pending_curses.clear();
        let (combat, mut ctx) = self.split();
        events.extend(combat.begin(enemy, &mut ctx));
        Ok(())
    }

    /// Reset the player, fix the mode and start the first encounter.
    ///
    /// # Errors
    ///
    /// Returns a config error if no enemy can be spawned; the previous state
    /// is kept in that case.
    pub fn start_new_run(&mut self, mode: CombatMode) -> Result<EventBatch, EngineError> {
        let enemy = spawn_random(&self.data, &self.config.tier_weights, &mut self.rng)
            .map_err(config_failure)?;
        log::info!("starting a {mode} run");
        self.player.reset(self.config.max_life);
        self.curses.clear();
        self.abilities.reset_ledger();
        self.combat = CombatEngine::new(mode);
        for _ in 0..self.config.starter_cards {
            self.player.grant_random_card(&mut self.rng);
        }
        self.state = RunState::InProgress;
        self.curse_roll = None;
        self.curse_event_used = false;
        self.pending_curses.clear();

        let mut events = EventBatch::new();
        self.push_unlocks(&mut events);
        let (combat, mut ctx) = self.split();
        events.extend(combat.begin(enemy, &mut ctx));
        Ok(events)
    }

    /// Draw the next enemy once the current encounter is resolved.
    ///
    /// # Errors
    ///
    /// Rejects the call outside a live run or while the current combat is
    /// unresolved.
    pub fn continue_to_next_combat(&mut self) -> Result<EventBatch, EngineError> {
        self.ensure_running()?;
        if !self.player.is_alive() {
            return Err(reject(UsageError::PlayerDefeated));
        }
        match self.combat.phase() {
            CombatPhase::InProgress | CombatPhase::Resolving(_) => {
                return Err(reject(UsageError::CombatInProgress));
            }
            CombatPhase::AwaitingRewardChoice { .. } => {
                return Err(reject(UsageError::RewardSelectionPending));
            }
            CombatPhase::Idle | CombatPhase::Resolved(_) => {}
        }
        if !self.pending_curses.is_empty() {
            log::debug!("discarding an unanswered curse choice");
        }
        let mut events = EventBatch::new();
        self.start_encounter(&mut events)?;
        Ok(events)
    }

    /// End the run on request.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::NoRunInProgress`] if the run already ended.
    pub fn end_run(&mut self) -> Result<EventBatch, EngineError> {
        self.ensure_running()?;
        let summary = self.summary();
        log::info!("run ended by request with score {}", summary.score);
        self.state = RunState::Ended(summary.clone());
        self.pending_curses.clear();
        Ok(smallvec![CombatEvent::RunEnded(summary)])
    }

    /// Attack with the basic ability of the selected affinity.
    ///
    /// # Errors
    ///
    /// See [`Self::player_attempt_with`].
    pub fn player_attempt(&mut self) -> Result<EventBatch, EngineError> {
        let ability = basic_attack(self.combat.selected_affinity());
        self.attempt(ability)
    }

    /// Attack with a catalog ability.
    ///
    /// # Errors
    ///
    /// Rejects unknown, locked or unaffordable abilities and attempts outside
    /// an active encounter, leaving all state untouched.
    pub fn player_attempt_with(&mut self, ability_id: u32) -> Result<EventBatch, EngineError> {
        let data = Arc::clone(&self.data);
        let ability = data
            .ability(ability_id)
            .ok_or_else(|| reject(UsageError::UnknownAbility(ability_id)))?;
        self.attempt(ability)
    }

    fn attempt(&mut self, ability: &AbilityDefinition) -> Result<EventBatch, EngineError> {
        self.ensure_running()?;
        let (combat, mut ctx) = self.split();
        let events = combat.player_attempt(ability, &mut ctx).map_err(reject)?;
        self.settle(&events);
        Ok(events)
    }

    /// Pick the affinity used by basic attacks.
    ///
    /// # Errors
    ///
    /// Rejected in Passive mode, where the enemy decides, and outside a run.
    pub fn select_attack_type(&mut self, affinity: AffinityType) -> Result<(), EngineError> {
        self.ensure_running()?;
        if self.combat.mode() == CombatMode::Passive {
            return Err(reject(UsageError::AttackTypeFixedInPassive));
        }
        self.combat.set_selected_affinity(affinity);
        Ok(())
    }

    /// Resolve a pending weakness reward.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::NoRewardPending`] when no choice is waiting.
    pub fn select_reward_card(&mut self, affinity: AffinityType) -> Result<EventBatch, EngineError> {
        self.ensure_running()?;
        let (combat, mut ctx) = self.split();
        combat.select_reward_card(affinity, &mut ctx).map_err(reject)
    }

    fn ensure_curse_window(&self) -> Result<(), EngineError> {
        self.ensure_running()?;
        if self.combat.outcome() == Some(CombatOutcome::Victory) {
            Ok(())
        } else {
            Err(reject(UsageError::CurseEventUnavailable))
        }
    }

    /// Roll, once per encounter, whether a curse event follows this victory.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::CurseEventUnavailable`] unless the current
    /// encounter ended in victory.
    pub fn should_show_curse_event(&mut self) -> Result<bool, EngineError> {
        self.ensure_curse_window()?;
        if let Some(roll) = self.curse_roll {
            return Ok(roll);
        }
        let is_spirit = self.combat.enemy().is_some_and(|enemy| enemy.is_spirit());
        let roll = should_trigger_event(
            is_spirit,
            self.combat.turns_used(),
            &self.config,
            &mut self.rng,
        );
        self.curse_roll = Some(roll);
        Ok(roll)
    }

    /// Offer a choice of curses allowed in this run's mode.
    ///
    /// # Errors
    ///
    /// Returns a usage error outside a victory or when the event already ran
    /// for this encounter, and [`ConfigError::NoCursesAvailable`] when the
    /// catalog has nothing for this mode.
    pub fn trigger_curse_choice_event(&mut self) -> Result<EventBatch, EngineError> {
        self.ensure_curse_window()?;
        if self.curse_event_used {
            return Err(reject(UsageError::CurseEventUnavailable));
        }
        let mode = self.combat.mode();
        let eligible: Vec<u32> = self
            .data
            .curses
            .iter()
            .filter(|curse| curse.allowed_in(mode))
            .map(|curse| curse.id)
            .collect();
        if eligible.is_empty() {
            return Err(config_failure(ConfigError::NoCursesAvailable));
        }
        let count = self.config.curse_choice_count.max(1);
        let options: Vec<u32> = (0..count)
            .map(|_| eligible[self.rng.gen_range(0..eligible.len())])
            .collect();
        log::info!("offering curses {options:?}");
        self.curse_event_used = true;
        self.pending_curses.clone_from(&options);
        Ok(smallvec![CombatEvent::CurseChoiceOffered { options }])
    }

    /// Take the curse at `index` of the pending choice.
    ///
    /// # Errors
    ///
    /// Returns a usage error when no choice is pending or the index is out of
    /// range.
    pub fn choose_curse(&mut self, index: usize) -> Result<EventBatch, EngineError> {
        self.ensure_running()?;
        if self.pending_curses.is_empty() {
            return Err(reject(UsageError::NoCurseChoicePending));
        }
        let Some(&curse_id) = self.pending_curses.get(index) else {
            return Err(reject(UsageError::CurseChoiceOutOfRange {
                index,
                len: self.pending_curses.len(),
            }));
        };
        let data = Arc::clone(&self.data);
        let definition = data
            .curse(curse_id)
            .ok_or_else(|| reject(UsageError::UnknownCurse(curse_id)))?;
        self.pending_curses.clear();

        let outcome = self.curses.obtain(
            definition,
            &mut self.player,
            self.config.default_dice_max,
            &mut self.rng,
        );
        self.player.stats.curses_obtained += 1;
        let mut events: EventBatch = smallvec![CombatEvent::CurseObtained {
            curse_id,
            name: definition.name.clone(),
        }];
        if let ObtainOutcome::Applied { card_delta, .. } = outcome
            && card_delta > 0
        {
            self.push_unlocks(&mut events);
        }
        if !self.player.is_alive() && !self.curses.on_player_death(&mut self.player) {
            let summary = self.summary();
            log::info!("curse {} ended the run", definition.name);
            self.state = RunState::Ended(summary.clone());
            events.push(CombatEvent::GameOver(summary));
        }
        Ok(events)
    }

    /// Whether a held curse can be activated on the current turn.
    #[must_use]
    pub fn can_activate_curse(&self, curse_id: u32) -> bool {
        self.combat.is_in_progress()
            && self
                .curses
                .can_activate(curse_id, self.combat.current_turn())
    }

    /// Activate a held curse during combat. Escape curses end the encounter.
    ///
    /// # Errors
    ///
    /// Returns a usage error outside combat or when the curse cannot be
    /// activated now.
    pub fn activate_curse(&mut self, curse_id: u32) -> Result<EventBatch, EngineError> {
        self.ensure_running()?;
        if !self.combat.is_in_progress() {
            return Err(reject(UsageError::CombatNotInProgress));
        }
        let effect = self
            .curses
            .activate(curse_id, self.combat.current_turn())
            .map_err(reject)?;
        let mut events: EventBatch = smallvec![CombatEvent::CurseActivated { curse_id }];
        if effect == CurseEffect::EscapeCombat {
            let (combat, mut ctx) = self.split();
            events.extend(combat.escape(&mut ctx).map_err(reject)?);
        }
        Ok(events)
    }

    /// Unlocked abilities of one affinity.
    #[must_use]
    pub fn available_abilities(&self, affinity: AffinityType) -> Vec<&AbilityDefinition> {
        self.abilities.available_abilities(&self.data, affinity)
    }

    #[must_use]
    pub const fn state(&self) -> &RunState {
        &self.state
    }

    #[must_use]
    pub fn is_run_active(&self) -> bool {
        self.state == RunState::InProgress
    }

    /// Summary of the last finished run.
    #[must_use]
    pub const fn last_summary(&self) -> Option<&RunSummary> {
        match &self.state {
            RunState::Ended(summary) => Some(summary),
            RunState::NoRun | RunState::InProgress => None,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> CombatMode {
        self.combat.mode()
    }

    #[must_use]
    pub const fn player(&self) -> &PlayerState {
        &self.player
    }

    #[must_use]
    pub const fn combat(&self) -> &CombatEngine {
        &self.combat
    }

    #[must_use]
    pub const fn curses(&self) -> &CurseEngine {
        &self.curses
    }

    #[must_use]
    pub const fn abilities(&self) -> &AbilityTracker {
        &self.abilities
    }

    #[must_use]
    pub const fn discovery(&self) -> &AffinityDiscoveryTracker {
        &self.discovery
    }

    #[must_use]
    pub fn data(&self) -> &GameData {
        &self.data
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn pending_curse_choices(&self) -> &[u32] {
        &self.pending_curses
    }

    /// Apply a closure to the player state.
    pub fn with_player_mut<T>(&mut self, f: impl FnOnce(&mut PlayerState) -> T) -> T {
        f(&mut self.player)
    }
}
