//! `embkit plan`: preview how the configured components bind.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CliConfig;
use crate::binder::{BindingState, BindingTable, SelectingBinder};
use crate::component::ImplementationCatalog;
use crate::config::EmbConfig;
use crate::selector::cycle::detect_override_cycles;

#[derive(Args, Debug)]
pub struct PlanCommand {
    /// Only show bindings of this role
    #[arg(long)]
    pub role: Option<String>,
}

impl PlanCommand {
    pub fn execute(self, config: &EmbConfig, cli: &CliConfig) -> Result<()> {
        let table = build_plan(config)?;
        if cli.quiet {
            return Ok(());
        }
        if table.is_empty() {
            println!("No components configured");
            return Ok(());
        }

        println!("{}", "Binding plan:".bold());
        for binding in table.iter().filter(|b| self.role.as_deref().is_none_or(|r| b.key.role() == r)) {
            let line = binding.to_string();
            match binding.state {
                BindingState::Unselected => println!("  {}", line.dimmed()),
                _ if binding.is_alias() => println!("  {}", line.cyan()),
                _ => println!("  {line}"),
            }
        }
        Ok(())
    }
}

/// Bind the configured declarations without any implementations available.
pub(crate) fn build_plan(config: &EmbConfig) -> crate::core::Result<BindingTable> {
    let selector = config.selector()?;
    detect_override_cycles(&selector)?;
    SelectingBinder::new(&selector).bind(&config.declarations()?, &ImplementationCatalog::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::BindingTarget;
    use crate::core::ComponentKey;

    #[test]
    fn test_plan_aliases_overridden_slot() {
        let config = EmbConfig::from_toml_str(
            r#"
[selections]
"Resolver" = "remote"

[[components]]
role = "Resolver"
implementation = "DefaultResolver"

[[components]]
role = "Resolver"
hint = "remote"
implementation = "RemoteResolver"
"#,
        )
        .unwrap();

        let table = build_plan(&config).unwrap();
        let raw = table.get(&ComponentKey::new("Resolver", Some("default_"))).unwrap();
        assert_eq!(raw.state, BindingState::Unselected);

        let alias = table.get(&ComponentKey::new("Resolver", Some("default"))).unwrap();
        assert!(matches!(&alias.target, BindingTarget::Alias(to) if to.hint() == Some("remote")));
    }
}
