//! Boss Rush Game Engine
//!
//! Platform-agnostic rules for a boss-rush card-and-dice combat game.
//! This crate provides combat resolution, curses, ability unlocks and run
//! sequencing without UI or platform-specific dependencies.

pub mod abilities;
pub mod affinity;
pub mod combat;
pub mod config;
pub mod curses;
pub mod data;
pub mod discovery;
pub mod enemy;
pub mod error;
pub mod events;
pub mod numbers;
pub mod player;
pub mod run;
pub mod seed;
pub mod session;

// Re-export commonly used types
pub use abilities::{AbilityTracker, basic_attack, can_use_ability};
pub use affinity::{AffinityMultiplier, AffinityTable, AffinityType, WEAKNESS_MULTIPLIER};
pub use combat::{CombatContext, CombatEngine, CombatPhase, PendingResolution};
pub use config::{EngineConfig, SpendingPolicy, TierWeights};
pub use curses::{CurseEngine, CurseInstance, ObtainOutcome};
pub use data::{
    AbilityCosts, AbilityDefinition, CombatMode, CurseActivation, CurseCategory, CurseDefinition,
    CurseEffect, DiceModifiers, EnemyDefinition, EnemyTier, EnemyTierProfile, GameData,
    SuccessGate, TurnSkip,
};
pub use discovery::AffinityDiscoveryTracker;
pub use enemy::EnemyInstance;
pub use error::{ConfigError, EngineError, UsageError};
pub use events::{
    AttackReport, CombatEvent, CombatOutcome, CombatReport, EnemySnapshot, EventBatch, RunSummary,
};
pub use player::{PlayerState, RunStats};
pub use run::{RunCoordinator, RunState};
pub use seed::{decode_to_seed, encode_friendly, generate_code_from_entropy};
pub use session::SharedSession;

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the enemy, ability and curse catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_game_data(&self) -> Result<GameData, Self::Error>;

    /// Load engine tuning values
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config(&self) -> Result<EngineConfig, Self::Error>;
}

/// Main game engine for creating run coordinators
pub struct GameEngine<L>
where
    L: DataLoader,
{
    data_loader: L,
}

impl<L> GameEngine<L>
where
    L: DataLoader,
{
    /// Create a new game engine with the provided data loader
    pub const fn new(data_loader: L) -> Self {
        Self { data_loader }
    }

    /// Create a coordinator seeded with `seed`
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the loaded content is invalid.
    pub fn new_coordinator(&self, seed: u64) -> Result<RunCoordinator, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let data = self.data_loader.load_game_data().map_err(Into::into)?;
        let config = self.data_loader.load_config().map_err(Into::into)?;
        Ok(RunCoordinator::new(data, config, seed)?)
    }

    /// Create a coordinator from a share code such as `PC-ORANGE42`.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is malformed or coordinator creation fails.
    pub fn coordinator_from_code(
        &self,
        code: &str,
    ) -> Result<(CombatMode, RunCoordinator), anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let (mode, seed) = decode_to_seed(code)
            .ok_or_else(|| anyhow::anyhow!("invalid share code: {code}"))?;
        Ok((mode, self.new_coordinator(seed)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl DataLoader for FixtureLoader {
        type Error = Infallible;

        fn load_game_data(&self) -> Result<GameData, Self::Error> {
            Ok(GameData::load_from_static())
        }

        fn load_config(&self) -> Result<EngineConfig, Self::Error> {
            Ok(EngineConfig::default())
        }
    }

    struct EmptyLoader;

    impl DataLoader for EmptyLoader {
        type Error = Infallible;

        fn load_game_data(&self) -> Result<GameData, Self::Error> {
            Ok(GameData::empty())
        }

        fn load_config(&self) -> Result<EngineConfig, Self::Error> {
            Ok(EngineConfig::default())
        }
    }

    #[test]
    fn engine_creates_playable_coordinator() {
        let engine = GameEngine::new(FixtureLoader);
        let mut run = engine.new_coordinator(0xABCD).unwrap();
        run.start_new_run(CombatMode::PlayerChooses).unwrap();
        assert!(run.is_run_active());
        assert!(run.combat().enemy().is_some());
    }

    #[test]
    fn share_code_selects_mode() {
        let engine = GameEngine::new(FixtureLoader);
        let (mode, _) = engine.coordinator_from_code("RP-WRAITH07").unwrap();
        assert_eq!(mode, CombatMode::TraditionalRpg);
        assert!(engine.coordinator_from_code("nonsense").is_err());
    }

    #[test]
    fn empty_catalog_is_refused() {
        let engine = GameEngine::new(EmptyLoader);
        let err = engine.new_coordinator(1).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }
}
