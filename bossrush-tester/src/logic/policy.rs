use std::fmt;
use std::str::FromStr;

use bossrush_game::{
    AffinityMultiplier, AffinityType, CurseCategory, RunCoordinator, can_use_ability,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const AFFINITIES: [AffinityType; 3] = [
    AffinityType::Force,
    AffinityType::Agility,
    AffinityType::Skill,
];

/// Attack chosen by a [`PlayerPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackDecision {
    pub affinity: AffinityType,
    /// Catalog ability to use; `None` means the basic attack.
    pub ability_id: Option<u32>,
    pub rationale: Option<String>,
}

impl AttackDecision {
    #[must_use]
    pub const fn basic(affinity: AffinityType) -> Self {
        Self {
            affinity,
            ability_id: None,
            rationale: None,
        }
    }

    #[must_use]
    pub fn with_ability(mut self, ability_id: Option<u32>) -> Self {
        self.ability_id = ability_id;
        self
    }

    #[must_use]
    pub fn because(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick the next attack for the encounter in progress.
    fn pick_attack(&mut self, run: &RunCoordinator) -> AttackDecision;

    /// Card to take after a weakness victory.
    fn pick_reward(&mut self, run: &RunCoordinator) -> AffinityType;

    /// Index of the curse to take from `options`, or `None` to decline.
    fn pick_curse(&mut self, run: &RunCoordinator, options: &[u32]) -> Option<usize>;

    /// Held curse to activate before attacking, if any.
    fn pick_activation(&mut self, run: &RunCoordinator) -> Option<u32> {
        let _ = run;
        None
    }
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameplayStrategy {
    Cautious,
    Greedy,
    WeaknessHunter,
    Random,
}

impl GameplayStrategy {
    pub const ALL: [Self; 4] = [
        Self::Cautious,
        Self::Greedy,
        Self::WeaknessHunter,
        Self::Random,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cautious => "Cautious",
            Self::Greedy => "Greedy",
            Self::WeaknessHunter => "Weakness Hunter",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Cautious => "cautious",
            Self::Greedy => "greedy",
            Self::WeaknessHunter => "weakness-hunter",
            Self::Random => "random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Cautious => Box::new(CautiousPolicy),
            Self::Greedy => Box::new(GreedyPolicy),
            Self::WeaknessHunter => Box::new(WeaknessHunterPolicy::default()),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GameplayStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.key() == normalized)
            .ok_or(())
    }
}

struct CautiousPolicy;
struct GreedyPolicy;

#[derive(Default)]
struct WeaknessHunterPolicy {
    probe: usize,
}

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed ^ 0x00C0_FFEE),
        }
    }
}

fn attempts_left(run: &RunCoordinator) -> i32 {
    run.combat()
        .enemy()
        .map_or(0, |enemy| enemy.attempts_remaining)
}

/// Usable unlocked abilities of `affinity`, excluding basics.
fn usable_specials(run: &RunCoordinator, affinity: AffinityType) -> Vec<u32> {
    let attempts = attempts_left(run);
    run.available_abilities(affinity)
        .into_iter()
        .filter(|ability| !ability.is_basic && can_use_ability(ability, run.player(), attempts))
        .map(|ability| ability.id)
        .collect()
}

fn most_held(run: &RunCoordinator) -> AffinityType {
    AFFINITIES
        .into_iter()
        .max_by_key(|affinity| run.player().card_count(*affinity))
        .unwrap_or(AffinityType::Force)
}

fn least_held(run: &RunCoordinator) -> AffinityType {
    AFFINITIES
        .into_iter()
        .min_by_key(|affinity| run.player().card_count(*affinity))
        .unwrap_or(AffinityType::Force)
}

fn curse_category(run: &RunCoordinator, curse_id: u32) -> Option<CurseCategory> {
    run.data().curse(curse_id).map(|curse| curse.category)
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "Cautious"
    }

    fn pick_attack(&mut self, run: &RunCoordinator) -> AttackDecision {
        AttackDecision::basic(most_held(run)).because("largest card pile")
    }

    fn pick_reward(&mut self, run: &RunCoordinator) -> AffinityType {
        most_held(run)
    }

    fn pick_curse(&mut self, run: &RunCoordinator, options: &[u32]) -> Option<usize> {
        options
            .iter()
            .position(|id| curse_category(run, *id) == Some(CurseCategory::Positive))
    }

    fn pick_activation(&mut self, run: &RunCoordinator) -> Option<u32> {
        let low = run.player().life() * 4 <= run.player().max_life();
        if !low {
            return None;
        }
        run.curses()
            .active()
            .iter()
            .map(|curse| curse.id())
            .find(|id| run.can_activate_curse(*id))
    }
}

impl PlayerPolicy for GreedyPolicy {
    fn name(&self) -> &'static str {
        "Greedy"
    }

    fn pick_attack(&mut self, run: &RunCoordinator) -> AttackDecision {
        let affinity = most_held(run);
        let special = usable_specials(run, affinity).last().copied();
        AttackDecision::basic(affinity)
            .with_ability(special)
            .because("strongest unlocked ability")
    }

    fn pick_reward(&mut self, run: &RunCoordinator) -> AffinityType {
        most_held(run)
    }

    fn pick_curse(&mut self, _run: &RunCoordinator, options: &[u32]) -> Option<usize> {
        (!options.is_empty()).then_some(0)
    }
}

impl PlayerPolicy for WeaknessHunterPolicy {
    fn name(&self) -> &'static str {
        "Weakness Hunter"
    }

    fn pick_attack(&mut self, run: &RunCoordinator) -> AttackDecision {
        let Some(enemy) = run.combat().enemy() else {
            return AttackDecision::basic(AffinityType::Force);
        };
        let known_weakness = run
            .discovery()
            .discovered_for(enemy.id())
            .into_iter()
            .find(|affinity| {
                enemy.multiplier_for(*affinity, run.mode()) == AffinityMultiplier::Weak
            });
        if let Some(affinity) = known_weakness {
            let special = usable_specials(run, affinity).first().copied();
            return AttackDecision::basic(affinity)
                .with_ability(special)
                .because("known weakness");
        }
        let undiscovered = AFFINITIES
            .into_iter()
            .filter(|affinity| !run.discovery().is_discovered(enemy.id(), *affinity))
            .collect::<Vec<_>>();
        let affinity = if undiscovered.is_empty() {
            self.probe += 1;
            AFFINITIES[self.probe % AFFINITIES.len()]
        } else {
            undiscovered[self.probe % undiscovered.len()]
        };
        AttackDecision::basic(affinity).because("probing")
    }

    fn pick_reward(&mut self, run: &RunCoordinator) -> AffinityType {
        least_held(run)
    }

    fn pick_curse(&mut self, run: &RunCoordinator, options: &[u32]) -> Option<usize> {
        options
            .iter()
            .position(|id| curse_category(run, *id) != Some(CurseCategory::Negative))
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick_attack(&mut self, run: &RunCoordinator) -> AttackDecision {
        let affinity = AFFINITIES[self.rng.gen_range(0..AFFINITIES.len())];
        let specials = usable_specials(run, affinity);
        let special = if specials.is_empty() || self.rng.gen_bool(0.5) {
            None
        } else {
            Some(specials[self.rng.gen_range(0..specials.len())])
        };
        AttackDecision::basic(affinity).with_ability(special)
    }

    fn pick_reward(&mut self, _run: &RunCoordinator) -> AffinityType {
        AFFINITIES[self.rng.gen_range(0..AFFINITIES.len())]
    }

    fn pick_curse(&mut self, _run: &RunCoordinator, options: &[u32]) -> Option<usize> {
        if options.is_empty() || self.rng.gen_bool(0.25) {
            None
        } else {
            Some(self.rng.gen_range(0..options.len()))
        }
    }

    fn pick_activation(&mut self, run: &RunCoordinator) -> Option<u32> {
        let held: Vec<u32> = run
            .curses()
            .active()
            .iter()
            .map(|curse| curse.id())
            .filter(|id| run.can_activate_curse(*id))
            .collect();
        if held.is_empty() || !self.rng.gen_bool(0.3) {
            return None;
        }
        Some(held[self.rng.gen_range(0..held.len())])
    }
}
