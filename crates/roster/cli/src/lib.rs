//! Roster CLI - validate configurations and replay operation scripts
//!
//! ```text
//! roster check-config roster.toml
//! roster replay --config roster.toml script.json
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use roster_service::{JournalEntry, ReplayReport, RosterConfig, RosterService, Script};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Roster CLI application
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(about = "Seasonal membership roster", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a roster configuration file
    CheckConfig {
        /// TOML configuration
        path: PathBuf,
    },

    /// Replay an operation script against an in-memory roster
    Replay {
        /// TOML configuration
        #[arg(short, long, env = "ROSTER_CONFIG")]
        config: PathBuf,

        /// JSON script of operations
        script: PathBuf,

        /// Include the audit journal in the output
        #[arg(long)]
        journal: bool,
    },
}

#[derive(Serialize)]
struct ReplayOutput<'a> {
    #[serde(flatten)]
    report: &'a ReplayReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    journal: Option<Vec<JournalEntry>>,
}

/// Run using the current process arguments.
pub fn run() -> anyhow::Result<()> {
    run_with_args(std::env::args_os())
}

/// Run using the provided argument iterator.
pub fn run_with_args<I, T>(args: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let filter = default_filter(cli.verbose);
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();

    let output = execute(cli.command)?;
    println!("{}", output);
    Ok(())
}

/// Log level used when `RUST_LOG` is unset.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Execute one command and return what it prints.
pub fn execute(command: Commands) -> anyhow::Result<String> {
    match command {
        Commands::CheckConfig { path } => check_config(&path),
        Commands::Replay {
            config,
            script,
            journal,
        } => replay(&config, &script, journal),
    }
}

fn load_config(path: &Path) -> anyhow::Result<RosterConfig> {
    RosterConfig::from_file(path)
        .with_context(|| format!("invalid roster config {}", path.display()))
}

fn check_config(path: &Path) -> anyhow::Result<String> {
    let config = load_config(path)?;
    Ok(format!(
        "{}: ok ({} authority holder(s), gate {}, initial {}, {:?} enrollment)",
        path.display(),
        config.authority.holders.len(),
        config.access.gate_address,
        config.registry.initial_season,
        config.access.enrollment,
    ))
}

fn replay(config_path: &Path, script_path: &Path, with_journal: bool) -> anyhow::Result<String> {
    let config = load_config(config_path)?;
    let content = std::fs::read_to_string(script_path)
        .with_context(|| format!("failed to read script {}", script_path.display()))?;
    let script = Script::from_json(&content)
        .with_context(|| format!("invalid script {}", script_path.display()))?;

    let service = RosterService::in_memory(&config)?;
    let report = service.replay(&script)?;
    info!(
        steps = report.steps.len(),
        failures = report.failures(),
        "Replay finished"
    );

    let journal = if with_journal {
        Some(service.journal().entries()?)
    } else {
        None
    };
    let output = ReplayOutput {
        report: &report,
        journal,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
        [authority]
        holders = ["0x1111111111111111111111111111111111111111"]

        [access]
        gate_address = "0x9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a"
    "#;

    const SCRIPT: &str = r#"{
        "steps": [
            { "caller": "0x1111111111111111111111111111111111111111", "op": "issue",
              "members": ["0x0101010101010101010101010101010101010101"], "season": 1 },
            { "caller": "0x1111111111111111111111111111111111111111", "op": "issue",
              "members": ["0x0202020202020202020202020202020202020202"], "season": 2 }
        ]
    }"#;

    fn file_with(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_replay_arguments() {
        let cli = Cli::parse_from([
            "roster",
            "replay",
            "--config",
            "roster.toml",
            "script.json",
            "--journal",
        ]);
        match cli.command {
            Commands::Replay {
                config,
                script,
                journal,
            } => {
                assert_eq!(config, PathBuf::from("roster.toml"));
                assert_eq!(script, PathBuf::from("script.json"));
                assert!(journal);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn default_log_level_is_info() {
        assert_eq!(default_filter(false), "info");
        assert_eq!(default_filter(true), "debug");
    }

    #[test]
    fn check_config_reports_summary() {
        let config = file_with(CONFIG);
        let output = execute(Commands::CheckConfig {
            path: config.path().to_path_buf(),
        })
        .unwrap();
        assert!(output.contains("ok (1 authority holder(s)"));
        assert!(output.contains("0x9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a9a"));
    }

    #[test]
    fn check_config_rejects_invalid_file() {
        let config = file_with("[authority]\nholders = []\n");
        let err = execute(Commands::CheckConfig {
            path: config.path().to_path_buf(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("invalid roster config"));
    }

    #[test]
    fn replay_prints_steps_and_membership() {
        let config = file_with(CONFIG);
        let script = file_with(SCRIPT);

        let output = execute(Commands::Replay {
            config: config.path().to_path_buf(),
            script: script.path().to_path_buf(),
            journal: true,
        })
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(json["steps"][0]["outcome"]["result"], "issued");
        assert_eq!(json["steps"][1]["failure"], "wrong_season");
        assert_eq!(
            json["seasons"]["1"][0],
            "0x0101010101010101010101010101010101010101"
        );
        assert_eq!(json["journal"].as_array().unwrap().len(), 1);
    }
}
