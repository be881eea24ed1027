//! `embkit select`: show where a role/hint lookup is redirected.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::EmbConfig;
use crate::core::key::literal_hint;
use crate::selector::format_key;

#[derive(Args, Debug)]
pub struct SelectCommand {
    /// Role name, e.g. `ArtifactResolver`
    pub role: String,

    /// Hint to look up; omit for the default slot
    pub hint: Option<String>,
}

impl SelectCommand {
    pub fn execute(self, config: &EmbConfig) -> Result<()> {
        let selector = config.selector()?;
        let requested = format_key(&self.role, self.hint.as_deref());
        match selector.select_role_hint(&self.role, self.hint.as_deref()) {
            Some(selected) => {
                let note = match self.hint.as_deref().and_then(literal_hint) {
                    Some(_) => " (literal)".dimmed().to_string(),
                    None => String::new(),
                };
                println!("{requested} -> {}{note}", selected.green());
            }
            None => println!("{requested} -> {}", "(none)".yellow()),
        }
        Ok(())
    }
}
