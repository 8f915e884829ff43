use bossrush_game::{
    CombatEvent, CombatMode, CombatOutcome, CombatPhase, EngineConfig, EngineError, GameData,
    RunCoordinator, RunState, encode_friendly, events::find_combat_end,
};
use thiserror::Error;

use crate::logic::policy::{GameplayStrategy, PlayerPolicy};

/// Configuration for a simulation session.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub seed: u64,
    pub mode: CombatMode,
    pub strategy: GameplayStrategy,
    pub max_encounters: u32,
}

impl SimulationConfig {
    #[must_use]
    pub const fn new(mode: CombatMode, strategy: GameplayStrategy, seed: u64) -> Self {
        Self {
            seed,
            mode,
            strategy,
            max_encounters: 25,
        }
    }

    #[must_use]
    pub const fn with_max_encounters(mut self, max_encounters: u32) -> Self {
        self.max_encounters = max_encounters;
        self
    }
}

/// Rule breaks the harness watches for while driving a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("life {life} outside 0..={max}")]
    LifeOutOfBounds { life: i32, max: i32 },
    #[error("score dropped from {before} to {after}")]
    ScoreDecreased { before: u32, after: u32 },
    #[error("attempts rose from {before} to {after} within one encounter")]
    AttemptsIncreased { before: i32, after: i32 },
    #[error("engine rejected a policy action: {0}")]
    Rejected(String),
    #[error("run ended without a final summary")]
    MissingSummary,
    #[error("summary score {summary} differs from player score {player}")]
    SummaryMismatch { summary: u32, player: u32 },
}

impl From<EngineError> for Violation {
    fn from(err: EngineError) -> Self {
        Self::Rejected(err.to_string())
    }
}

/// Outcome of one simulated run.
#[derive(Debug, Clone, Default)]
pub struct SimulationSummary {
    pub seed: u64,
    pub share_code: String,
    pub encounters: u32,
    pub victories: u32,
    pub defeats: u32,
    pub escapes: u32,
    pub turns: u32,
    pub score: u32,
    pub final_life: i32,
    pub curses_taken: u32,
    pub abilities_unlocked: usize,
    pub game_over: bool,
    pub events: usize,
    pub violations: Vec<String>,
}

impl SimulationSummary {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Deterministic harness driving one coordinator with a policy.
pub struct SimulationSession {
    run: RunCoordinator,
    config: SimulationConfig,
    summary: SimulationSummary,
    last_score: u32,
    last_attempts: Option<i32>,
}

impl SimulationSession {
    /// # Errors
    ///
    /// Returns an error if the content or tuning values are unusable.
    pub fn new(
        config: SimulationConfig,
        data: GameData,
        engine_config: EngineConfig,
    ) -> anyhow::Result<Self> {
        let run = RunCoordinator::new(data, engine_config, config.seed)?;
        Ok(Self {
            run,
            summary: SimulationSummary {
                seed: config.seed,
                share_code: encode_friendly(config.mode, config.seed),
                ..SimulationSummary::default()
            },
            config,
            last_score: 0,
            last_attempts: None,
        })
    }

    /// Play until the run ends or the encounter cap is reached.
    pub fn run_to_completion(mut self, policy: &mut dyn PlayerPolicy) -> SimulationSummary {
        if let Err(violation) = self.play(policy) {
            self.summary.violations.push(violation.to_string());
        }
        self.finish()
    }

    fn play(&mut self, policy: &mut dyn PlayerPolicy) -> Result<(), Violation> {
        let events = self.run.start_new_run(self.config.mode)?;
        self.record(&events)?;
        self.summary.encounters = 1;

        while self.run.is_run_active() {
            match self.run.combat().phase() {
                CombatPhase::InProgress => self.take_turn(policy)?,
                CombatPhase::AwaitingRewardChoice { .. } => {
                    let card = policy.pick_reward(&self.run);
                    let events = self.run.select_reward_card(card)?;
                    self.record(&events)?;
                }
                CombatPhase::Resolved(outcome) => {
                    if outcome == CombatOutcome::Victory {
                        self.offer_curse(policy)?;
                    }
                    if !self.run.is_run_active() {
                        break;
                    }
                    if self.summary.encounters >= self.config.max_encounters {
                        let events = self.run.end_run()?;
                        self.record(&events)?;
                        break;
                    }
                    let events = self.run.continue_to_next_combat()?;
                    self.summary.encounters += 1;
                    self.last_attempts = None;
                    self.record(&events)?;
                }
                CombatPhase::Idle | CombatPhase::Resolving(_) => {
                    let events = self.run.continue_to_next_combat()?;
                    self.record(&events)?;
                }
            }
        }
        Ok(())
    }

    fn take_turn(&mut self, policy: &mut dyn PlayerPolicy) -> Result<(), Violation> {
        if let Some(curse_id) = policy.pick_activation(&self.run) {
            log::debug!("{} activates curse {curse_id}", policy.name());
            let events = self.run.activate_curse(curse_id)?;
            self.record(&events)?;
            if !self.run.combat().is_in_progress() {
                return Ok(());
            }
        }

        let decision = policy.pick_attack(&self.run);
        if self.config.mode != CombatMode::Passive {
            self.run.select_attack_type(decision.affinity)?;
        }
        log::debug!(
            "{} attacks with {:?} ({})",
            policy.name(),
            decision.ability_id,
            decision.rationale.as_deref().unwrap_or("-")
        );
        let events = match decision.ability_id {
            Some(id) => self.run.player_attempt_with(id)?,
            None => self.run.player_attempt()?,
        };
        let lethal = events
            .iter()
            .any(|event| matches!(event, CombatEvent::GameOver(_)));
        if lethal && find_combat_end(&events).is_none() {
            self.summary.defeats += 1;
        }
        self.record(&events)
    }

    fn offer_curse(&mut self, policy: &mut dyn PlayerPolicy) -> Result<(), Violation> {
        if !self.run.should_show_curse_event()? {
            return Ok(());
        }
        let events = match self.run.trigger_curse_choice_event() {
            Ok(events) => events,
            Err(EngineError::Config(err)) => {
                log::warn!("no curse offered: {err}");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        self.record(&events)?;
        let options = self.run.pending_curse_choices().to_vec();
        if let Some(index) = policy.pick_curse(&self.run, &options) {
            let events = self.run.choose_curse(index)?;
            self.record(&events)?;
        }
        Ok(())
    }

    fn record(&mut self, events: &[CombatEvent]) -> Result<(), Violation> {
        self.summary.events += events.len();
        for event in events {
            match event {
                CombatEvent::CurseObtained { .. } => self.summary.curses_taken += 1,
                CombatEvent::AbilityUnlocked { .. } => self.summary.abilities_unlocked += 1,
                CombatEvent::GameOver(_) => self.summary.game_over = true,
                _ => {}
            }
        }
        if let Some(report) = find_combat_end(events) {
            match report.outcome {
                CombatOutcome::Victory => self.summary.victories += 1,
                CombatOutcome::Defeat => self.summary.defeats += 1,
                CombatOutcome::Escaped => self.summary.escapes += 1,
            }
        }
        self.check_invariants()
    }

    fn check_invariants(&mut self) -> Result<(), Violation> {
        let player = self.run.player();
        if player.life() < 0 || player.life() > player.max_life() {
            return Err(Violation::LifeOutOfBounds {
                life: player.life(),
                max: player.max_life(),
            });
        }
        if player.score < self.last_score {
            return Err(Violation::ScoreDecreased {
                before: self.last_score,
                after: player.score,
            });
        }
        self.last_score = player.score;

        let attempts = self
            .run
            .combat()
            .enemy()
            .map(|enemy| enemy.attempts_remaining);
        if let (Some(before), Some(after)) = (self.last_attempts, attempts)
            && after > before
        {
            return Err(Violation::AttemptsIncreased { before, after });
        }
        self.last_attempts = attempts;
        Ok(())
    }

    fn finish(mut self) -> SimulationSummary {
        let player = self.run.player();
        self.summary.score = player.score;
        self.summary.final_life = player.life();
        self.summary.turns = player.stats.turns_used;
        match self.run.state() {
            RunState::Ended(summary) if summary.score != player.score => {
                let violation = Violation::SummaryMismatch {
                    summary: summary.score,
                    player: player.score,
                };
                self.summary.violations.push(violation.to_string());
            }
            RunState::Ended(_) => {}
            RunState::InProgress | RunState::NoRun => {
                if self.summary.violations.is_empty() {
                    self.summary
                        .violations
                        .push(Violation::MissingSummary.to_string());
                }
            }
        }
        self.summary
    }
}

/// Convenience wrapper: build a session and play it with `strategy`.
///
/// # Errors
///
/// Returns an error if the coordinator cannot be built.
pub fn run_simulation(
    config: SimulationConfig,
    data: GameData,
    engine_config: EngineConfig,
) -> anyhow::Result<SimulationSummary> {
    let mut policy = config.strategy.create_policy(config.seed);
    let session = SimulationSession::new(config, data, engine_config)?;
    Ok(session.run_to_completion(policy.as_mut()))
}
