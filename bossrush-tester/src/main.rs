mod logic;
mod util;

use anyhow::{Context, Result, bail};
use bossrush_game::{CombatMode, DataLoader};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use logic::{GameplayStrategy, LogicTester, ScenarioResult, TesterAssets, resolve_seed_inputs};
use util::{FileLoader, split_csv};

#[derive(Debug, Parser)]
#[command(name = "bossrush-tester", version = "0.1.0")]
#[command(about = "Automated simulation and QA for the boss rush combat engine")]
struct Args {
    /// Combat modes to simulate (comma-separated: passive, player-chooses, rpg, all)
    #[arg(long, default_value = "all")]
    modes: String,

    /// Strategies to play with (comma-separated, or `all`)
    #[arg(long, default_value = "all")]
    strategies: String,

    /// List all available strategies and exit
    #[arg(long)]
    list_strategies: bool,

    /// Seeds to run (comma-separated numbers or share codes such as PC-ORANGE42)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Encounters after which a run is ended voluntarily
    #[arg(long, default_value_t = 25)]
    max_encounters: u32,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Game data JSON to use instead of the bundled catalog
    #[arg(long)]
    data: Option<PathBuf>,

    /// Engine config JSON to use instead of the default tuning
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_strategies(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let modes = expand_modes(&args.modes)?;
    let strategies = expand_strategies(&args.strategies)?;
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let assets = load_assets(&args)?;

    let results = run_scenarios(&args, assets, &modes, &strategies, &seeds);
    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_strategies(args: &Args) -> Result<bool> {
    if !args.list_strategies {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available strategies:")?;
    for strategy in GameplayStrategy::ALL {
        writeln!(output_target.writer(), "  {:20} - {}", strategy.key(), strategy.label())?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "⚔️  Boss Rush Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_modes(modes_arg: &str) -> Result<Vec<CombatMode>> {
    let mut modes = Vec::new();
    for token in split_csv(modes_arg) {
        if token.eq_ignore_ascii_case("all") {
            modes.extend(CombatMode::ALL);
            continue;
        }
        let Ok(mode) = token.parse::<CombatMode>() else {
            bail!("Unknown mode: {token}");
        };
        modes.push(mode);
    }
    modes.dedup();
    if modes.is_empty() {
        modes.extend(CombatMode::ALL);
    }
    Ok(modes)
}

fn expand_strategies(strategies_arg: &str) -> Result<Vec<GameplayStrategy>> {
    let mut strategies = Vec::new();
    for token in split_csv(strategies_arg) {
        if token.eq_ignore_ascii_case("all") {
            strategies.extend(GameplayStrategy::ALL);
            continue;
        }
        let Ok(strategy) = token.parse::<GameplayStrategy>() else {
            bail!("Unknown strategy: {token}");
        };
        strategies.push(strategy);
    }
    strategies.dedup();
    if strategies.is_empty() {
        strategies.extend(GameplayStrategy::ALL);
    }
    Ok(strategies)
}

fn load_assets(args: &Args) -> Result<TesterAssets> {
    let loader = FileLoader {
        data_path: args.data.clone(),
        config_path: args.config.clone(),
    };
    let data = loader.load_game_data().context("loading game data")?;
    let config = loader.load_config().context("loading engine config")?;
    data.validate().context("validating game data")?;
    config.validate().context("validating engine config")?;
    Ok(TesterAssets { data, config })
}

fn run_scenarios(
    args: &Args,
    assets: TesterAssets,
    modes: &[CombatMode],
    strategies: &[GameplayStrategy],
    seeds: &[logic::SeedInfo],
) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Simulations".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let tester = LogicTester::new(assets, args.max_encounters, args.verbose);
    let mut results = Vec::new();
    for &mode in modes {
        for &strategy in strategies {
            let scenario_results = tester.run_scenario(mode, strategy, seeds, args.iterations);
            if scenario_results.is_empty() {
                eprintln!(
                    "⚠️  No seeds apply to {} with {}",
                    mode.as_str().yellow(),
                    strategy.label()
                );
            }
            results.extend(scenario_results);
        }
    }
    results
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Boss Rush Simulation Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(&mut output_target, results, duration)?;
            }
        }
    }

    if args.report != "json" {
        let duration = start_time.elapsed();
        writeln!(&mut output_target)?;
        writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn base_args() -> Args {
        Args {
            modes: "all".to_string(),
            strategies: "all".to_string(),
            list_strategies: false,
            seeds: "1337".to_string(),
            iterations: 1,
            max_encounters: 5,
            report: "json".to_string(),
            verbose: false,
            output: None,
            data: None,
            config: None,
        }
    }

    fn sample_result() -> ScenarioResult {
        ScenarioResult {
            scenario_name: "passive / Cautious".to_string(),
            mode: CombatMode::Passive,
            strategy: "cautious".to_string(),
            seed_code: "PS-ORANGE42".to_string(),
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            mean_score: 2.0,
            mean_encounters: 3.0,
            survival_rate: 1.0,
            average_duration: Duration::from_millis(1),
            performance_data: vec![Duration::from_millis(1)],
        }
    }

    #[test]
    fn expands_all_modes_and_rejects_unknown() {
        assert_eq!(expand_modes("all").unwrap(), CombatMode::ALL.to_vec());
        assert_eq!(
            expand_modes("rpg,passive").unwrap(),
            vec![CombatMode::TraditionalRpg, CombatMode::Passive]
        );
        assert!(expand_modes("arcade").is_err());
    }

    #[test]
    fn expands_strategies_preserving_order() {
        assert_eq!(
            expand_strategies("random,greedy").unwrap(),
            vec![GameplayStrategy::Random, GameplayStrategy::Greedy]
        );
        assert_eq!(expand_strategies("").unwrap().len(), 4);
        assert!(expand_strategies("turtle").is_err());
    }

    #[test]
    fn maybe_list_strategies_writes_output() {
        let temp = std::env::temp_dir().join("bossrush-strategies.txt");
        let args = Args {
            list_strategies: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_strategies(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available strategies"));
        assert!(content.contains("weakness-hunter"));
    }

    #[test]
    fn maybe_list_strategies_returns_false_when_disabled() {
        assert!(!maybe_list_strategies(&base_args()).unwrap());
    }

    #[test]
    fn run_scenarios_covers_each_pairing() {
        let args = Args {
            modes: "passive".to_string(),
            strategies: "greedy,cautious".to_string(),
            ..base_args()
        };
        let seeds = resolve_seed_inputs(&split_csv(&args.seeds)).unwrap();
        let results = run_scenarios(
            &args,
            TesterAssets::load_default(),
            &[CombatMode::Passive],
            &[GameplayStrategy::Greedy, GameplayStrategy::Cautious],
            &seeds,
        );
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed), "{results:?}");
    }

    #[test]
    fn write_reports_emits_json_for_empty_results() {
        let temp = std::env::temp_dir().join("bossrush-test-report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert_eq!(content.trim(), "[]");
    }

    #[test]
    fn write_reports_emits_markdown_report() {
        let temp = std::env::temp_dir().join("bossrush-report-full.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result()], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("# Boss Rush Simulation Results"));
        assert!(content.contains("PS-ORANGE42"));
    }

    #[test]
    fn write_reports_emits_console_summary() {
        let temp = std::env::temp_dir().join("bossrush-report-console.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result()], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Total scenarios: 1"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn load_assets_rejects_invalid_config() {
        let temp = std::env::temp_dir().join("bossrush-bad-config.json");
        std::fs::write(&temp, r#"{ "max_life": 0 }"#).unwrap();
        let args = Args {
            config: Some(temp),
            ..base_args()
        };
        assert!(load_assets(&args).is_err());
        assert!(load_assets(&base_args()).is_ok());
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
