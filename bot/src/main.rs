//! `gfl-bot`: farm a Girls' Frontline map with a scripted plan.
//!
//! Reads `gfl-bot.toml`, the per-map script and the T-Doll roster, then
//! drives the game through the configured device helper until the target run
//! count is reached or the session fails.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use gfl_bot::core::error::FatalError;
use gfl_bot::core::map_name::MapName;
use gfl_bot::core::resolver::EntityResolver;
use gfl_bot::core::state::RunState;
use gfl_bot::core::types::MapScript;
use gfl_bot::exit_codes;
use gfl_bot::game::Game;
use gfl_bot::io::bridge::CommandBridge;
use gfl_bot::io::config::{BotConfig, DEFAULT_CONFIG_FILE, load_config, write_config};
use gfl_bot::io::report::{SessionReport, format_elapsed, timestamp, write_report};
use gfl_bot::io::roster::load_roster;
use gfl_bot::io::script::{load_script, script_path};
use gfl_bot::logging;
use gfl_bot::session::{SessionStop, run_session};

#[derive(Parser)]
#[command(
    name = "gfl-bot",
    version,
    about = "Automated map farming for Girls' Frontline"
)]
struct Cli {
    /// Config file; relative data paths inside it resolve against its directory.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Log probe and gesture detail.
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file if missing.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config, the map script and the roster without touching the device.
    Check,
    /// Resolve OCR text against the roster and print the match.
    Resolve { text: String },
    /// Run a farming session.
    Run {
        /// Override `game.map`.
        #[arg(long)]
        map: Option<String>,
        /// Override `game.amount`.
        #[arg(long)]
        amount: Option<u32>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli) {
        Ok(code) => exit_code(code),
        Err(err) => {
            eprintln!("{err:#}");
            exit_code(exit_codes::INVALID)
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Check => cmd_check(&cli.config),
        Command::Resolve { text } => cmd_resolve(&cli.config, &text),
        Command::Run { map, amount } => cmd_run(&cli.config, map, amount),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if !force && config_path.exists() {
        println!("{} already exists", config_path.display());
        return Ok(exit_codes::OK);
    }
    write_config(config_path, &BotConfig::default())?;
    println!("wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_check(config_path: &Path) -> Result<i32> {
    let setup = Setup::load(config_path, |config| config.validate())?;
    println!(
        "ok: map {} ({} setup steps, {} moves), {} roster entries",
        setup.map,
        setup.script.setup.len(),
        setup.script.moves.len(),
        setup.resolver.entries().len()
    );
    Ok(exit_codes::OK)
}

fn cmd_resolve(config_path: &Path, text: &str) -> Result<i32> {
    let config = load_config(config_path)?;
    let resolver = load_roster(&resolve_path(config_path, &config.paths.roster))?;
    match resolver.resolve(text) {
        Some(resolution) => {
            let verdict = if resolution.is_confident() {
                "match"
            } else {
                "weak"
            };
            println!("{} {:.3} {verdict}", resolution.name, resolution.score);
        }
        None => println!("no match"),
    }
    Ok(exit_codes::OK)
}

fn cmd_run(config_path: &Path, map: Option<String>, amount: Option<u32>) -> Result<i32> {
    let setup = Setup::load(config_path, |config: &mut BotConfig| {
        if let Some(map) = map {
            config.game.map = map;
        }
        if let Some(amount) = amount {
            config.game.amount = amount;
        }
        config.validate()
    })?;
    let report_path = resolve_path(config_path, &setup.config.paths.report);

    let device = CommandBridge::new(setup.config.bridge.clone());
    let game = Game::new(&device, &setup.config, &setup.resolver);
    let mut state = RunState::default();

    let started_at = Utc::now();
    let clock = Instant::now();
    info!(map = %setup.map, target = setup.config.game.amount, "session started");
    let outcome = run_session(&game, &setup.script, &setup.map, &mut state, |report| {
        info!(
            runs = report.runs_completed,
            target = report.target,
            budget = report.failure_budget,
            "progress {}/{}",
            report.runs_completed,
            report.target
        );
    });

    let (stop, code) = match outcome {
        Ok(SessionStop::TargetReached) => (None, exit_codes::OK),
        Ok(SessionStop::Fatal(err @ FatalError::NoProgress { .. })) => {
            (Some(err.to_string()), exit_codes::NO_PROGRESS)
        }
        Ok(SessionStop::Fatal(err)) => (Some(err.to_string()), exit_codes::FATAL),
        Err(err) => (Some(format!("{err:#}")), exit_codes::FATAL),
    };

    let report = SessionReport {
        started_at: timestamp(started_at),
        ended_at: timestamp(Utc::now()),
        elapsed_secs: clock.elapsed().as_secs(),
        map: setup.map.to_string(),
        target: setup.config.game.amount,
        runs_completed: state.runs_completed,
        failure_budget: state.failure_budget.remaining(),
        acquired: state.acquired.names().to_vec(),
        stop,
    };
    write_report(&report_path, &report)?;
    print_summary(&report);
    Ok(code)
}

fn print_summary(report: &SessionReport) {
    println!("map:      {}", report.map);
    println!(
        "runs:     {}/{}",
        report.runs_completed, report.target
    );
    println!("elapsed:  {}", format_elapsed(report.elapsed()));
    if report.acquired.is_empty() {
        println!("acquired: none");
    } else {
        println!("acquired: {}", report.acquired.join(", "));
    }
    if let Some(stop) = &report.stop {
        println!("stopped:  {stop}");
    }
}

/// Config, map and the files it points at, loaded and validated together.
struct Setup {
    config: BotConfig,
    map: MapName,
    script: MapScript,
    resolver: EntityResolver,
}

impl Setup {
    fn load<F>(config_path: &Path, adjust: F) -> Result<Self>
    where
        F: FnOnce(&mut BotConfig) -> Result<()>,
    {
        let mut config = load_config(config_path)?;
        adjust(&mut config)?;
        let map = MapName::parse(&config.game.map)?;
        let maps_dir = resolve_path(config_path, &config.paths.maps_dir);
        let script = load_script(
            &script_path(&maps_dir, &map, config.device.width),
            config.game.dummy_echelons.len(),
            config.game.dps_echelons.len(),
        )
        .with_context(|| format!("load map script for {map}"))?;
        let resolver = load_roster(&resolve_path(config_path, &config.paths.roster))?;
        Ok(Self {
            config,
            map,
            script,
            resolver,
        })
    }
}

/// Relative paths resolve against the config file's directory.
fn resolve_path(config_path: &Path, path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(base) if path.is_relative() && !base.as_os_str().is_empty() => base.join(path),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::parse_from(["gfl-bot", "init"]);
        assert!(matches!(cli.command, Command::Init { force: false }));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["gfl-bot", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }

    #[test]
    fn parse_run_overrides() {
        let cli = Cli::parse_from([
            "gfl-bot", "-v", "--config", "farm.toml", "run", "--map", "4-3e", "--amount", "20",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("farm.toml"));
        match cli.command {
            Command::Run { map, amount } => {
                assert_eq!(map.as_deref(), Some("4-3e"));
                assert_eq!(amount, Some(20));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parse_resolve_text() {
        let cli = Cli::parse_from(["gfl-bot", "resolve", "M4A 1"]);
        assert!(matches!(cli.command, Command::Resolve { text } if text == "M4A 1"));
    }

    #[test]
    fn data_paths_resolve_against_config_dir() {
        let config = Path::new("/srv/bot/gfl-bot.toml");
        assert_eq!(
            resolve_path(config, Path::new("data/maps")),
            PathBuf::from("/srv/bot/data/maps")
        );
        assert_eq!(
            resolve_path(config, Path::new("/abs/tdolls.json")),
            PathBuf::from("/abs/tdolls.json")
        );
        assert_eq!(
            resolve_path(Path::new("gfl-bot.toml"), Path::new("data/maps")),
            PathBuf::from("data/maps")
        );
    }
}
