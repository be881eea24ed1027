//! `embkit check`: validate a configuration file.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliConfig;
use super::plan::build_plan;
use crate::config::EmbConfig;
use crate::constants::BLANK_ROLE_HINT_PLACEHOLDER;

#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Also list every selection
    #[arg(long)]
    pub list: bool,
}

impl CheckCommand {
    pub fn execute(self, config: &EmbConfig, cli: &CliConfig) -> Result<()> {
        // loading already validated every entry; binding catches cycles and duplicates
        let table = build_plan(config)?;
        if cli.quiet {
            return Ok(());
        }

        let selector = config.selector()?;
        let suppressed = selector.selections().filter(|(_, value)| *value == BLANK_ROLE_HINT_PLACEHOLDER).count();
        println!(
            "{} Configuration is valid: {} selection(s) ({} suppressed), {} component(s), {} binding(s)",
            "✓".green(),
            selector.len(),
            suppressed,
            config.components.len(),
            table.len()
        );

        if self.list {
            for (key, value) in selector.selections() {
                let shown = if value == BLANK_ROLE_HINT_PLACEHOLDER {
                    "(none)".yellow().to_string()
                } else {
                    value.to_string()
                };
                println!("  {key} -> {shown}");
            }
        }
        Ok(())
    }
}
