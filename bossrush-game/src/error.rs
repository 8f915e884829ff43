//! Error taxonomy for the engine.
//!
//! Configuration errors mean there is no usable data for the requested
//! operation. Usage errors are rejected calls: the engine state is exactly as
//! it was before the call.
use thiserror::Error;

use crate::affinity::AffinityType;

/// Errors raised when static content or tuning values are unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("enemy roster is empty")]
    NoEnemies,
    #[error("enemy {id} ({name}) has no tier profiles")]
    EnemyWithoutTiers { id: u32, name: String },
    #[error("curse catalog has no curses available for this run")]
    NoCursesAvailable,
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u32 },
    #[error("tier weights must be finite, non-negative and sum above zero (got {tier1}, {tier2}, {tier3})")]
    InvalidTierWeights { tier1: f32, tier2: f32, tier3: f32 },
    #[error("{field} must be between 0 and 100 (got {value:.2})")]
    ChanceOutOfRange { field: &'static str, value: f32 },
    #[error("max life must be positive (got {0})")]
    NonPositiveMaxLife(i32),
    #[error("die faces must be at least 1")]
    InvalidDiceMax,
    #[error("failed to parse game data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Calls that are not valid in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("no run in progress")]
    NoRunInProgress,
    #[error("no combat in progress")]
    CombatNotInProgress,
    #[error("combat already resolved")]
    CombatAlreadyResolved,
    #[error("current combat has not been resolved")]
    CombatInProgress,
    #[error("a reward card choice is pending")]
    RewardSelectionPending,
    #[error("no reward card choice is pending")]
    NoRewardPending,
    #[error("attack type can only be selected outside passive mode")]
    AttackTypeFixedInPassive,
    #[error("unknown ability {0}")]
    UnknownAbility(u32),
    #[error("ability {0} is locked")]
    AbilityLocked(u32),
    #[error("ability '{name}' cannot be used with current resources")]
    AbilityUnusable { name: String },
    #[error("unknown curse {0}")]
    UnknownCurse(u32),
    #[error("curse {0} cannot be activated now")]
    CurseNotActivatable(u32),
    #[error("no curse choice is pending")]
    NoCurseChoicePending,
    #[error("curse choice {index} out of range ({len} options)")]
    CurseChoiceOutOfRange { index: usize, len: usize },
    #[error("curse event is only available after a victory")]
    CurseEventUnavailable,
    #[error("cannot spend {requested} {affinity} cards (have {available})")]
    InsufficientCards {
        affinity: AffinityType,
        requested: u32,
        available: u32,
    },
    #[error("combat has nothing left to finalize")]
    NothingToFinalize,
    #[error("player has been defeated")]
    PlayerDefeated,
}

/// Any error surfaced by an engine entry point.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl EngineError {
    /// The usage error behind this failure, if it was a rejected call.
    #[must_use]
    pub const fn as_usage(&self) -> Option<&UsageError> {
        match self {
            Self::Usage(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}
