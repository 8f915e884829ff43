//! Static game content: enemies, abilities and curses.
//!
//! Content is read-only once loaded. The bundled catalog lives in
//! `assets/data/game.json`; platforms may supply their own through
//! [`crate::DataLoader`].
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::affinity::{AffinityMultiplier, AffinityType};
use crate::error::ConfigError;

const DEFAULT_GAME_DATA: &str = include_str!("../assets/data/game.json");

/// Difficulty bracket of an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyTier {
    Tier1,
    Tier2,
    Tier3,
}

impl EnemyTier {
    pub const ALL: [Self; 3] = [Self::Tier1, Self::Tier2, Self::Tier3];

    /// Ordinal used as the base score for defeating an enemy of this tier.
    #[must_use]
    pub const fn ordinal(self) -> u32 {
        match self {
            Self::Tier1 => 1,
            Self::Tier2 => 2,
            Self::Tier3 => 3,
        }
    }
}

impl fmt::Display for EnemyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tier {}", self.ordinal())
    }
}

/// Formula family governing a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CombatMode {
    /// Dice plus cards of the enemy's default affinity, no multipliers.
    Passive,
    /// Player picks the affinity; multipliers scale the card bonus.
    #[default]
    PlayerChooses,
    /// Enemy has a health pool that the scaled total whittles down.
    TraditionalRpg,
}

impl CombatMode {
    pub const ALL: [Self; 3] = [Self::Passive, Self::PlayerChooses, Self::TraditionalRpg];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passive => "passive",
            Self::PlayerChooses => "player-chooses",
            Self::TraditionalRpg => "rpg",
        }
    }

    /// Whether attacks in this mode reveal enemy affinities.
    #[must_use]
    pub const fn tracks_discovery(self) -> bool {
        !matches!(self, Self::Passive)
    }
}

impl fmt::Display for CombatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CombatMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passive" => Ok(Self::Passive),
            "player-chooses" | "player_chooses" | "chooses" => Ok(Self::PlayerChooses),
            "rpg" | "traditional-rpg" | "traditional_rpg" => Ok(Self::TraditionalRpg),
            _ => Err(()),
        }
    }
}

/// Resistance of an enemy against one affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityRelation {
    pub affinity: AffinityType,
    pub multiplier: AffinityMultiplier,
}

/// Per-tier stat block of an enemy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyTierProfile {
    pub tier: EnemyTier,
    /// Total needed to win in Passive and PlayerChooses modes.
    pub health_threshold: i32,
    pub dice_count: u32,
    pub max_attempts: i32,
    pub failure_damage: i32,
    #[serde(default)]
    pub rpg_health: Option<i32>,
    #[serde(default)]
    pub rpg_dice_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyDefinition {
    pub id: u32,
    pub name: String,
    /// Affinity the Passive mode attacks with.
    pub default_affinity: AffinityType,
    #[serde(default)]
    pub relations: Vec<AffinityRelation>,
    #[serde(default)]
    pub is_spirit: bool,
    #[serde(default)]
    pub tiers: Vec<EnemyTierProfile>,
}

impl EnemyDefinition {
    /// Configured multiplier for an affinity; unlisted affinities are neutral.
    #[must_use]
    pub fn multiplier_for(&self, affinity: AffinityType) -> AffinityMultiplier {
        self.relations
            .iter()
            .find(|relation| relation.affinity == affinity)
            .map_or(AffinityMultiplier::Neutral, |relation| relation.multiplier)
    }

    #[must_use]
    pub fn profile_for(&self, tier: EnemyTier) -> Option<&EnemyTierProfile> {
        self.tiers.iter().find(|profile| profile.tier == tier)
    }
}

/// Resource costs paid before an ability rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AbilityCosts {
    #[serde(default)]
    pub cards: u32,
    #[serde(default)]
    pub health: i32,
    /// Attempts consumed in addition to the attempt itself.
    #[serde(default)]
    pub turns: i32,
}

/// Adjustments to the number and size of dice rolled.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiceModifiers {
    #[serde(default)]
    pub modifier: i32,
    #[serde(default)]
    pub max_face: Option<u32>,
    #[serde(default)]
    pub scale: Option<f32>,
    #[serde(default)]
    pub addition: i32,
}

/// Percent gate an ability must pass before rolling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuccessGate {
    pub chance: f32,
    #[serde(default)]
    pub health_penalty: i32,
    #[serde(default)]
    pub turn_penalty: i32,
}

/// Chance for an ability not to consume its turn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnSkip {
    pub chance: f32,
    #[serde(default)]
    pub detection_penalty: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub affinity: AffinityType,
    #[serde(default)]
    pub costs: AbilityCosts,
    #[serde(default)]
    pub dice: DiceModifiers,
    #[serde(default)]
    pub multiplier_bonus: f32,
    #[serde(default)]
    pub card_multiplier: Option<f32>,
    #[serde(default)]
    pub success_gate: Option<SuccessGate>,
    #[serde(default)]
    pub on_kill_heal: Option<i32>,
    #[serde(default)]
    pub turn_skip: Option<TurnSkip>,
    #[serde(default)]
    pub unlock_requirement: u32,
    #[serde(default)]
    pub is_basic: bool,
}

impl AbilityDefinition {
    /// Plain attack used when the caller does not pick an ability.
    #[must_use]
    pub fn basic_attack(affinity: AffinityType) -> Self {
        Self {
            id: 0,
            name: format!("Basic {affinity} attack"),
            description: String::new(),
            affinity,
            costs: AbilityCosts::default(),
            dice: DiceModifiers::default(),
            multiplier_bonus: 0.0,
            card_multiplier: None,
            success_gate: None,
            on_kill_heal: None,
            turn_skip: None,
            unlock_requirement: 0,
            is_basic: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurseCategory {
    Positive,
    Negative,
    Gambling,
}

/// Phase in which a curse acts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurseActivation {
    Instant,
    PreCombat,
    TurnStart,
    PlayerActivated,
    PostCombat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurseEffect {
    ModifyHealth,
    ModifyCards,
    InvertVictoryCondition,
    WeakenEnemy,
    NegateCards,
    BlockRewards,
    EscapeCombat,
    NegateDamage,
    GamblingDice,
}

const fn default_health_multiplier() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurseDefinition {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: CurseCategory,
    pub activation: CurseActivation,
    pub effect: CurseEffect,
    #[serde(default)]
    pub magnitude: i32,
    /// 0 = instantaneous, -1 = until consumed, N = phase invocations.
    #[serde(default)]
    pub duration: i32,
    #[serde(default)]
    pub requires_player_activation: bool,
    #[serde(default)]
    pub must_activate_on_turn_one: bool,
    #[serde(default = "default_health_multiplier")]
    pub enemy_health_multiplier: f32,
    /// Modes this curse may be offered in; empty means every mode.
    #[serde(default)]
    pub modes: Vec<CombatMode>,
}

impl CurseDefinition {
    #[must_use]
    pub fn allowed_in(&self, mode: CombatMode) -> bool {
        self.modes.is_empty() || self.modes.contains(&mode)
    }
}

/// Container for all static content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GameData {
    #[serde(default)]
    pub enemies: Vec<EnemyDefinition>,
    #[serde(default)]
    pub abilities: Vec<AbilityDefinition>,
    #[serde(default)]
    pub curses: Vec<CurseDefinition>,
}

impl GameData {
    /// Create empty content (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse content from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into game data.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The catalog bundled with the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_GAME_DATA).unwrap_or_default()
    }

    /// Check the invariants the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violation: an empty roster, an enemy without tier
    /// profiles, or a duplicated id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enemies.is_empty() {
            return Err(ConfigError::NoEnemies);
        }
        if let Some(enemy) = self.enemies.iter().find(|enemy| enemy.tiers.is_empty()) {
            return Err(ConfigError::EnemyWithoutTiers {
                id: enemy.id,
                name: enemy.name.clone(),
            });
        }
        ensure_unique("enemy", self.enemies.iter().map(|enemy| enemy.id))?;
        ensure_unique("ability", self.abilities.iter().map(|ability| ability.id))?;
        ensure_unique("curse", self.curses.iter().map(|curse| curse.id))?;
        Ok(())
    }

    #[must_use]
    pub fn enemy(&self, id: u32) -> Option<&EnemyDefinition> {
        self.enemies.iter().find(|enemy| enemy.id == id)
    }

    #[must_use]
    pub fn ability(&self, id: u32) -> Option<&AbilityDefinition> {
        self.abilities.iter().find(|ability| ability.id == id)
    }

    #[must_use]
    pub fn curse(&self, id: u32) -> Option<&CurseDefinition> {
        self.curses.iter().find(|curse| curse.id == id)
    }

    pub fn abilities_for(
        &self,
        affinity: AffinityType,
    ) -> impl Iterator<Item = &AbilityDefinition> + '_ {
        self.abilities
            .iter()
            .filter(move |ability| ability.affinity == affinity)
    }
}

fn ensure_unique(kind: &'static str, ids: impl Iterator<Item = u32>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ConfigError::DuplicateId { kind, id });
        }
    }
    Ok(())
}
