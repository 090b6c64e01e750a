use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use pixload_config::domains::logging::LogLevel;
use pixload_config::{ConfigLoader, PixloadConfig};
use pixload_engine::{EngineError, LoadShape, ScenarioRunner, ShutdownCoordinator};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

mod cli;
mod report;
use cli::{Cli, Commands, ConfigCommands};

/// At least one threshold failed
const EXIT_THRESHOLDS_FAILED: i32 = 99;
/// Setup or configuration failure
const EXIT_FAILURE: i32 = 1;

/// Scenario name left at its default is replaced by the subcommand name
const DEFAULT_SCENARIO_NAME: &str = "unspecified";

/// Load configuration from file or environment
fn load_config(config_path: Option<&PathBuf>) -> Result<PixloadConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                info!("Loading configuration from: {:?}", path);
                loader
                    .from_file(path)
                    .context(format!("Failed to load configuration from {:?}", path))
            } else {
                warn!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => {
            debug!("No configuration file specified. Loading from environment or defaults.");
            loader
                .from_env()
                .context("Failed to load configuration from environment")
        }
    }
}

/// Command-line flags win over file and environment
fn apply_cli_overrides(config: &mut PixloadConfig, cli: &Cli) -> Result<()> {
    if let Some(base_url) = &cli.base_url {
        config.target.base_url = base_url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level
            .parse::<LogLevel>()
            .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", level, e))?;
    }

    match &cli.command {
        Some(Commands::Baseline { workers, duration }) => {
            if let Some(workers) = workers {
                config.load.baseline.workers = *workers;
            }
            if let Some(duration) = duration {
                config.load.baseline.duration = *duration;
            }
            default_scenario_name(config, "baseline");
        }
        Some(Commands::Stress { max_workers }) => {
            if let Some(max_workers) = max_workers {
                config.load.stress.max_workers = *max_workers;
                config.load.stress.pre_allocated_workers = config.load.stress.pre_allocated_workers.min(*max_workers);
            }
            default_scenario_name(config, "stress");
        }
        _ => {}
    }

    config.validate_all().context("Invalid configuration after command-line overrides")?;
    Ok(())
}

fn default_scenario_name(config: &mut PixloadConfig, name: &str) {
    if config.target.scenario_name == DEFAULT_SCENARIO_NAME {
        config.target.scenario_name = name.to_string();
    }
}

/// Handle configuration validation
fn handle_config_validate(config_file: Option<&PathBuf>) -> Result<()> {
    let Some(config_file) = config_file else {
        return Err(anyhow::anyhow!("No configuration file given; use --config-file or --config"));
    };
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow::anyhow!("Configuration file not found: {:?}", config_file));
    }

    match ConfigLoader::new().from_file(config_file) {
        Ok(_config) => {
            println!("{} Configuration file is valid", "✓".bright_green().bold());
            Ok(())
        }
        Err(e) => {
            println!("{} Configuration validation failed: {}", "✗".bright_red().bold(), e);
            Err(e.into())
        }
    }
}

/// Handle configuration generation
fn handle_config_generate(output: Option<&PathBuf>, force: bool) -> Result<()> {
    let sample = PixloadConfig::generate_sample();

    let Some(output) = output else {
        print!("{}", sample);
        return Ok(());
    };

    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {:?}. Use --force to overwrite.",
            output
        ));
    }
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("Failed to create output directory")?;
        }
    }
    fs::write(output, sample).context("Failed to write configuration file")?;

    println!("{} Configuration generated at: {:?}", "✓".bright_green().bold(), output);
    println!("Validate with: pixload config validate --config-file {:?}", output);
    Ok(())
}

/// Stop scheduling new iterations on Ctrl-C
fn spawn_signal_listener(shutdown: ShutdownCoordinator) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received");
                shutdown.shutdown();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}

async fn run_scenario(config: PixloadConfig, shape: LoadShape, cli: &Cli) -> Result<i32> {
    let shutdown = ShutdownCoordinator::new();
    spawn_signal_listener(shutdown.clone());

    let runner = ScenarioRunner::new(config).with_shutdown(shutdown);
    let report = match runner.run(&shape).await {
        Ok(report) => report,
        Err(EngineError::Setup(e)) => {
            error!("Scenario setup failed, no load generated: {}", e);
            return Err(anyhow::anyhow!("Scenario setup failed: {}", e));
        }
        Err(e) => return Err(e.into()),
    };

    print!("{}", report::render(&report));

    if let Some(path) = &cli.summary_export {
        report::export_summary(&report, path)?;
        info!("Run report written to {:?}", path);
    }

    if report.passed() {
        Ok(0)
    } else {
        for outcome in report.failed_thresholds() {
            error!("Threshold {} {} crossed (observed {})", outcome.label, outcome.condition, outcome.observed);
        }
        Ok(EXIT_THRESHOLDS_FAILED)
    }
}

async fn run(cli: Cli) -> Result<i32> {
    if let Some(Commands::Config { config_cmd }) = &cli.command {
        pixload_logging::init_simple_tracing(cli.log_level.as_deref().unwrap_or("warn"))?;
        match config_cmd {
            ConfigCommands::Validate { config_file } => {
                handle_config_validate(config_file.as_ref().or(cli.config.as_ref()))?
            }
            ConfigCommands::Generate { output, force } => handle_config_generate(output.as_ref(), *force)?,
        }
        return Ok(0);
    }

    let mut config = load_config(cli.config.as_ref())?;
    apply_cli_overrides(&mut config, &cli)?;
    pixload_logging::init_logging_from_config(&config.logging)?;

    info!("pixload {} starting", env!("CARGO_PKG_VERSION"));

    let shape = match &cli.command {
        Some(Commands::Baseline { .. }) => LoadShape::from(&config.load.baseline),
        Some(Commands::Stress { .. }) => LoadShape::from(&config.load.stress),
        _ => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            cmd.print_help().context("Failed to print help")?;
            println!();
            return Ok(0);
        }
    };

    run_scenario(config, shape, &cli).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "✗".bright_red().bold(), e);
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}
