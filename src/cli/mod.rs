//! Command-line interface for embkit.
//!
//! The `embkit` binary inspects a configuration file the way a container
//! would see it:
//!
//! - `select <role> [hint]` prints the effective hint after selections
//! - `plan` binds the configured `[[components]]` and prints each binding
//! - `check` validates the configuration and reports what it contains
//!
//! # Global options
//!
//! - `--verbose` / `-v` enables debug logging
//! - `--quiet` / `-q` suppresses everything but results and errors
//! - `--config` / `-c` names the configuration file (see [`crate::config`] for
//!   the locations searched otherwise)
//!
//! `RUST_LOG` takes precedence over both verbosity flags.
//!
//! ```bash
//! embkit select ArtifactResolver
//! embkit --config ./embkit.toml plan
//! embkit -v check
//! ```

mod check;
mod plan;
mod select;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::EmbConfig;

/// Runtime options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
    pub quiet: bool,
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Install the global tracing subscriber. Later calls are no-ops.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Load the configuration this invocation points at.
    pub async fn load(&self) -> Result<EmbConfig> {
        Ok(EmbConfig::load_or_default(self.config_path.as_deref()).await?)
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "embkit",
    about = "Inspect component selections and binding plans",
    version,
    long_about = "embkit resolves role/hint selections and previews how declared components bind in a container."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print results and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the effective hint for a role and hint
    Select(select::SelectCommand),

    /// Bind the configured components and print the plan
    Plan(plan::PlanCommand),

    /// Validate the configuration file
    Check(check::CheckCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };
        CliConfig {
            log_level: log_level.to_string(),
            quiet: self.quiet,
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let loaded = config.load().await?;
        match self.command {
            Commands::Select(cmd) => cmd.execute(&loaded),
            Commands::Plan(cmd) => cmd.execute(&loaded, &config),
            Commands::Check(cmd) => cmd.execute(&loaded, &config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("embkit.toml");
        std::fs::write(&path, content).unwrap();
        (temp, path)
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from(["embkit", "-v", "select", "Resolver", "local"]).unwrap();
        let config = cli.build_config();
        assert_eq!(config.log_level, "debug");
        assert!(!config.quiet);
        assert!(matches!(cli.command, Commands::Select(_)));

        let cli = Cli::try_parse_from(["embkit", "plan", "--quiet", "--config", "x.toml"]).unwrap();
        let config = cli.build_config();
        assert_eq!(config.log_level, "error");
        assert_eq!(config.config_path, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["embkit", "-v", "-q", "check"]).is_err());
    }

    #[tokio::test]
    async fn test_commands_run_against_file() {
        let (_temp, path) = write_config(
            r#"
[selections]
"Resolver" = "local"

[[components]]
role = "Resolver"
hint = "local"
implementation = "LocalResolver"
"#,
        );
        for command in ["select", "plan", "check"] {
            let mut args = vec!["embkit", "-q", "--config", path.to_str().unwrap(), command];
            if command == "select" {
                args.push("Resolver");
            }
            let cli = Cli::try_parse_from(args).unwrap();
            let config = cli.build_config();
            cli.execute_with_config(config).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_missing_explicit_config_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.toml");
        let cli = Cli::try_parse_from(["embkit", "--config", path.to_str().unwrap(), "check"]).unwrap();
        let config = cli.build_config();
        assert!(cli.execute_with_config(config).await.is_err());
    }

    #[tokio::test]
    async fn test_cycle_fails_plan() {
        let (_temp, path) = write_config(
            r#"
[selections]
"Resolver#a" = "b"
"Resolver#b" = "a"
"#,
        );
        let cli = Cli::try_parse_from(["embkit", "-q", "--config", path.to_str().unwrap(), "plan"]).unwrap();
        let config = cli.build_config();
        let err = cli.execute_with_config(config).await.unwrap_err();
        assert!(err.to_string().contains("Override cycle detected"));
    }
}
