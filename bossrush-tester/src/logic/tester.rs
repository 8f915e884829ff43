use bossrush_game::{CombatMode, EngineConfig, GameData};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::logic::policy::GameplayStrategy;
use crate::logic::seeds::SeedInfo;
use crate::logic::simulation::{SimulationConfig, SimulationSummary, run_simulation};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub mode: CombatMode,
    pub strategy: String,
    pub seed_code: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub mean_score: f64,
    pub mean_encounters: f64,
    pub survival_rate: f64,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// Content and tuning every simulation of a session uses.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    pub data: GameData,
    pub config: EngineConfig,
}

impl TesterAssets {
    #[must_use]
    pub fn load_default() -> Self {
        Self {
            data: GameData::load_from_static(),
            config: EngineConfig::default(),
        }
    }
}

pub struct LogicTester {
    assets: TesterAssets,
    max_encounters: u32,
    verbose: bool,
}

impl LogicTester {
    #[must_use]
    pub const fn new(assets: TesterAssets, max_encounters: u32, verbose: bool) -> Self {
        Self {
            assets,
            max_encounters,
            verbose,
        }
    }

    /// Run one mode/strategy pairing for every seed that applies to `mode`.
    pub fn run_scenario(
        &self,
        mode: CombatMode,
        strategy: GameplayStrategy,
        seeds: &[SeedInfo],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for seed in seeds.iter().filter(|seed| seed.matches_mode(mode)) {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (mode: {mode} seed: {})",
                    strategy.label().bright_white(),
                    seed.share_code_for_mode(mode)
                );
            }
            results.push(self.run_single_scenario(mode, strategy, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        mode: CombatMode,
        strategy: GameplayStrategy,
        seed: &SeedInfo,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut summaries: Vec<SimulationSummary> = Vec::with_capacity(iterations);

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let config = SimulationConfig::new(mode, strategy, iteration_seed)
                .with_max_encounters(self.max_encounters);

            let summary = match run_simulation(
                config,
                self.assets.data.clone(),
                self.assets.config.clone(),
            ) {
                Ok(summary) => summary,
                Err(err) => {
                    failures.push(format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1));
                    continue;
                }
            };

            if summary.passed() {
                successes += 1;
                let duration = start_time.elapsed();
                performance_data.push(duration);
                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) encounters:{} score:{} life:{}",
                        i + 1,
                        iterations,
                        summary.encounters,
                        summary.score,
                        summary.final_life
                    );
                }
            } else {
                let detail = summary.violations.join("; ");
                failures.push(format!(
                    "Iteration {} (mode {mode}, strategy {}, code {}, encounters {}): {detail}",
                    i + 1,
                    strategy.label(),
                    summary.share_code,
                    summary.encounters
                ));
                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        detail.red()
                    );
                }
            }
            summaries.push(summary);
        }

        let avg_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: format!("{mode} / {}", strategy.label()),
            mode,
            strategy: strategy.key().to_string(),
            seed_code: seed.share_code_for_mode(mode),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            mean_score: mean(&summaries, |summary| f64::from(summary.score)),
            mean_encounters: mean(&summaries, |summary| f64::from(summary.encounters)),
            survival_rate: mean(&summaries, |summary| {
                if summary.game_over { 0.0 } else { 1.0 }
            }),
            average_duration: avg_duration,
            performance_data,
        }
    }
}

fn mean(summaries: &[SimulationSummary], value: impl Fn(&SimulationSummary) -> f64) -> f64 {
    if summaries.is_empty() {
        return 0.0;
    }
    let total: f64 = summaries.iter().map(value).sum();
    total / f64::from(u32::try_from(summaries.len()).unwrap_or(u32::MAX))
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_runs_every_iteration() {
        let tester = LogicTester::new(TesterAssets::load_default(), 6, false);
        let seeds = vec![SeedInfo::from_numeric(42)];
        let results = tester.run_scenario(
            CombatMode::PlayerChooses,
            GameplayStrategy::WeaknessHunter,
            &seeds,
            3,
        );
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!(result.passed, "{:?}", result.failures);
        assert_eq!(result.iterations_run, 3);
        assert_eq!(result.successful_iterations, 3);
        assert!(result.mean_encounters >= 1.0);
        assert!(result.seed_code.starts_with("PC-"));
    }

    #[test]
    fn share_code_seeds_skip_other_modes() {
        let tester = LogicTester::new(TesterAssets::load_default(), 3, false);
        let seeds = vec![SeedInfo::from_share_code(
            9,
            CombatMode::TraditionalRpg,
            "RP-MOON09".to_string(),
        )];
        let passive =
            tester.run_scenario(CombatMode::Passive, GameplayStrategy::Greedy, &seeds, 1);
        assert!(passive.is_empty());
        let rpg =
            tester.run_scenario(CombatMode::TraditionalRpg, GameplayStrategy::Greedy, &seeds, 1);
        assert_eq!(rpg.len(), 1);
        assert_eq!(rpg[0].seed_code, "RP-MOON09");
    }

    #[test]
    fn invalid_assets_surface_as_failures() {
        let assets = TesterAssets {
            data: GameData::empty(),
            config: EngineConfig::default(),
        };
        let tester = LogicTester::new(assets, 3, false);
        let results = tester.run_scenario(
            CombatMode::Passive,
            GameplayStrategy::Cautious,
            &[SeedInfo::from_numeric(1)],
            2,
        );
        assert!(!results[0].passed);
        assert_eq!(results[0].failures.len(), 2);
    }
}
