//! Notifications returned from engine calls.
//!
//! Every mutating call returns the events it produced, in order, instead of
//! invoking observers. Callers match on [`CombatEvent`].
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::abilities::AbilityTracker;
use crate::affinity::{AffinityTable, AffinityType};
use crate::data::{CombatMode, EnemyTier};
use crate::enemy::EnemyInstance;
use crate::player::{PlayerState, RunStats};

/// Events produced by a single call; most calls emit four or fewer.
pub type EventBatch = SmallVec<[CombatEvent; 4]>;

/// Lightweight view of an enemy for notifications and summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub id: u32,
    pub name: String,
    pub tier: EnemyTier,
    pub is_spirit: bool,
    pub attempts_remaining: i32,
    pub rpg_health: i32,
}

/// Breakdown of one resolved attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackReport {
    pub ability_id: u32,
    pub affinity: AffinityType,
    pub dice: u32,
    pub roll: i32,
    pub card_bonus: i32,
    pub total: i32,
    pub multiplier: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    Victory,
    Defeat,
    Escaped,
}

impl CombatOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Victory => "victory",
            Self::Defeat => "defeat",
            Self::Escaped => "escaped",
        }
    }
}

/// How an encounter finished, from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatReport {
    pub outcome: CombatOutcome,
    /// Score earned by this encounter.
    pub score: u32,
    pub reward_card: Option<AffinityType>,
    /// Failure damage taken on defeat; zero for any other outcome.
    pub life_lost: i32,
}

impl CombatReport {
    #[must_use]
    pub const fn victory(&self) -> bool {
        matches!(self.outcome, CombatOutcome::Victory)
    }
}

/// Final payload of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: CombatMode,
    pub score: u32,
    pub cards: AffinityTable<u32>,
    /// Enemy that ended the run, or the last one faced.
    pub enemy: Option<EnemySnapshot>,
    pub stats: RunStats,
}

impl RunSummary {
    #[must_use]
    pub fn capture(
        mode: CombatMode,
        player: &PlayerState,
        abilities: &AbilityTracker,
        enemy: Option<&EnemyInstance>,
    ) -> Self {
        Self {
            mode,
            score: player.score,
            cards: abilities.final_card_count(player),
            enemy: enemy.map(EnemyInstance::snapshot),
            stats: player.stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CombatEvent {
    CombatStarted {
        enemy: EnemySnapshot,
    },
    AttackResult(AttackReport),
    AttemptsChanged {
        remaining: i32,
    },
    CombatEnded(CombatReport),
    WaitingForCardSelection {
        score: u32,
    },
    GameOver(RunSummary),
    RunEnded(RunSummary),
    CurseObtained {
        curse_id: u32,
        name: String,
    },
    CurseActivated {
        curse_id: u32,
    },
    CurseChoiceOffered {
        options: Vec<u32>,
    },
    AbilityUnlocked {
        ability_id: u32,
    },
}

impl CombatEvent {
    /// Short label used in logs and reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CombatStarted { .. } => "combat-started",
            Self::AttackResult(_) => "attack-result",
            Self::AttemptsChanged { .. } => "attempts-changed",
            Self::CombatEnded(_) => "combat-ended",
            Self::WaitingForCardSelection { .. } => "waiting-for-card-selection",
            Self::GameOver(_) => "game-over",
            Self::RunEnded(_) => "run-ended",
            Self::CurseObtained { .. } => "curse-obtained",
            Self::CurseActivated { .. } => "curse-activated",
            Self::CurseChoiceOffered { .. } => "curse-choice-offered",
            Self::AbilityUnlocked { .. } => "ability-unlocked",
        }
    }
}

/// First attack report in a batch.
#[must_use]
pub fn find_attack(events: &[CombatEvent]) -> Option<&AttackReport> {
    events.iter().find_map(|event| match event {
        CombatEvent::AttackResult(report) => Some(report),
        _ => None,
    })
}

/// First combat report in a batch.
#[must_use]
pub fn find_combat_end(events: &[CombatEvent]) -> Option<&CombatReport> {
    events.iter().find_map(|event| match event {
        CombatEvent::CombatEnded(report) => Some(report),
        _ => None,
    })
}
