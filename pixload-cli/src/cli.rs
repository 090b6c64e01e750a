//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about = "Load generator for PIX transfer services", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Base URL of the service under test
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Write the full run report as JSON to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub summary_export: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Constant concurrency: a fixed pool of workers iterating back-to-back
    Baseline {
        /// Number of concurrent workers
        #[arg(long, value_name = "N")]
        workers: Option<usize>,

        /// Scenario duration (example: --duration 5m)
        #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
        duration: Option<Duration>,
    },

    /// Ramping arrival rate over a bounded worker pool
    Stress {
        /// Hard ceiling on concurrently running iterations
        #[arg(long, value_name = "N")]
        max_workers: Option<usize>,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file (defaults to --config)
        #[arg(long, value_name = "PATH")]
        config_file: Option<PathBuf>,
    },

    /// Print or write a sample configuration with every default
    Generate {
        /// Output file path; stdout when omitted
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_overrides() {
        let cli = Cli::parse_from([
            "pixload",
            "--base-url",
            "http://localhost:9000",
            "baseline",
            "--workers",
            "5",
            "--duration",
            "1m 30s",
        ]);
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:9000"));
        match cli.command {
            Some(Commands::Baseline { workers, duration }) => {
                assert_eq!(workers, Some(5));
                assert_eq!(duration, Some(Duration::from_secs(90)));
            }
            _ => panic!("expected baseline"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["pixload", "stress", "--max-workers", "20", "--summary-export", "out.json"]);
        assert_eq!(cli.summary_export, Some(PathBuf::from("out.json")));
        assert!(matches!(cli.command, Some(Commands::Stress { max_workers: Some(20) })));
    }

    #[test]
    fn test_bad_duration_rejected() {
        assert!(Cli::try_parse_from(["pixload", "baseline", "--duration", "soon"]).is_err());
    }
}
