//! Configuration files for embkit.
//!
//! An embkit configuration file carries the selections a deployment applies
//! on top of what its extensions contribute, and optionally a list of
//! component declarations used to preview bindings with `embkit plan`.
//!
//! # Locations
//!
//! In order of precedence:
//!
//! 1. an explicit `--config PATH`
//! 2. the `EMBKIT_CONFIG` environment variable
//! 3. `embkit.toml` in the current directory
//! 4. the user configuration: `~/.embkit/config.toml` on Unix/macOS,
//!    `%LOCALAPPDATA%\embkit\config.toml` on Windows
//!
//! An explicitly named file must exist. The implicit locations fall back to an
//! empty configuration when absent.
//!
//! # Format
//!
//! ```toml
//! [selections]
//! "ArtifactResolver" = "remote"           # default ArtifactResolver -> remote
//! "MirrorSelector#central" = "auto"
//! "ModelPreprocessor#legacy" = "#"        # select nothing
//! "ArtifactResolver#remote" = "_remote_"  # literal: no further substitution
//!
//! [[components]]
//! role = "ArtifactResolver"
//! hint = "remote"
//! implementation = "RemoteArtifactResolver"
//! strategy = "load-on-start"              # singleton | load-on-start | per-lookup
//! ```
//!
//! Keys containing `#` must be quoted. Every entry is validated on load and a
//! malformed one is reported as [`EmbError::ConfigError`] naming the key.

pub mod parser;

pub use parser::{parse_config, parse_config_str};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::component::{ComponentDeclaration, InstantiationStrategy};
use crate::constants::{CONFIG_FILE_NAME, CONFIG_PATH_ENV, USER_CONFIG_DIR};
use crate::core::{EmbError, Result};
use crate::selector::{ComponentSelector, validate_selection};

/// One `[[components]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub implementation: String,
    /// `singleton` (default), `load-on-start` or `per-lookup`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ComponentConfig {
    fn label(&self) -> String {
        match self.hint.as_deref() {
            Some(hint) if !hint.trim().is_empty() => format!("{}#{hint}", self.role),
            _ => self.role.clone(),
        }
    }

    /// Convert into a declaration, validating the entry.
    pub fn to_declaration(&self) -> Result<ComponentDeclaration> {
        if self.role.trim().is_empty() {
            return Err(EmbError::config("component with an empty role"));
        }
        if self.implementation.trim().is_empty() {
            return Err(EmbError::config(format!("component '{}' has an empty implementation", self.label())));
        }
        let strategy = match self.strategy.as_deref() {
            Some(s) => s.parse::<InstantiationStrategy>().map_err(|e| {
                EmbError::config(format!("component '{}': {}", self.label(), config_message(&e)))
            })?,
            None => InstantiationStrategy::default(),
        };

        let mut declaration =
            ComponentDeclaration::new(self.role.as_str(), self.hint.as_deref(), self.implementation.as_str())
                .with_strategy(strategy);
        if let Some(description) = &self.description {
            declaration = declaration.with_description(description.as_str());
        }
        Ok(declaration)
    }
}

fn config_message(error: &EmbError) -> String {
    match error {
        EmbError::ConfigError {
            message,
        } => message.clone(),
        other => other.to_string(),
    }
}

/// Contents of an embkit configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbConfig {
    /// Flat `role` / `role#hint` to replacement hint map.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selections: BTreeMap<String, String>,

    /// Component declarations for planning.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentConfig>,
}

impl EmbConfig {
    /// Parse and validate configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::parse(Path::new(CONFIG_FILE_NAME), content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let config: Self = parse_config_str(path, content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the configuration at `path`.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| parser::read_error(path, &e))?;
        let config = Self::parse(path, &content)?;
        debug!(
            "Loaded {} selection(s) and {} component(s) from {}",
            config.selections.len(),
            config.components.len(),
            path.display()
        );
        Ok(config)
    }

    /// Load from `path` if given (it must exist), otherwise from the first
    /// existing implicit location, otherwise return an empty configuration.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(path).await;
        }
        match Self::discover() {
            Some(found) => Self::load_from(&found).await,
            None => {
                debug!("No configuration file found; using an empty configuration");
                Ok(Self::default())
            }
        }
    }

    /// First existing implicit configuration file, if any.
    pub fn discover() -> Option<PathBuf> {
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV)
            && !explicit.trim().is_empty()
        {
            return Some(PathBuf::from(explicit));
        }
        let project = PathBuf::from(CONFIG_FILE_NAME);
        if project.is_file() {
            return Some(project);
        }
        Self::default_path().ok().filter(|p| p.is_file())
    }

    /// The user-level configuration path, or `EMBKIT_CONFIG` when set.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV)
            && !explicit.trim().is_empty()
        {
            return Ok(PathBuf::from(explicit));
        }
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| EmbError::config("unable to determine local data directory"))?
                .join("embkit")
        } else {
            dirs::home_dir()
                .ok_or_else(|| EmbError::config("unable to determine home directory"))?
                .join(USER_CONFIG_DIR)
        };
        Ok(config_dir.join("config.toml"))
    }

    /// Write the configuration as TOML, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| EmbError::Other {
            message: format!("failed to serialize configuration: {e}"),
        })?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check every selection and component entry.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.selections {
            validate_selection(key, value)?;
        }
        for component in &self.components {
            component.to_declaration()?;
        }
        Ok(())
    }

    /// The configured selections as a selector.
    pub fn selector(&self) -> Result<ComponentSelector> {
        ComponentSelector::try_from_selections(&self.selections)
    }

    /// The configured components as declarations, in file order.
    pub fn declarations(&self) -> Result<Vec<ComponentDeclaration>> {
        self.components.iter().map(ComponentConfig::to_declaration).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r##"
[selections]
"ArtifactResolver" = "remote"
"MirrorSelector#central" = "auto"
"ModelPreprocessor#legacy" = "#"

[[components]]
role = "ArtifactResolver"
hint = "remote"
implementation = "RemoteArtifactResolver"
strategy = "load-on-start"

[[components]]
role = "ArtifactResolver"
implementation = "LocalArtifactResolver"
"##;

    #[test]
    fn test_parse_sample() {
        let config = EmbConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.selections.len(), 3);
        assert_eq!(config.components.len(), 2);

        let selector = config.selector().unwrap();
        assert_eq!(selector.select_role_hint("ArtifactResolver", None).as_deref(), Some("remote"));
        assert_eq!(selector.select_role_hint("ModelPreprocessor", Some("legacy")), None);

        let declarations = config.declarations().unwrap();
        assert_eq!(declarations[0].strategy(), InstantiationStrategy::LoadOnStart);
        assert_eq!(declarations[1].strategy(), InstantiationStrategy::Singleton);
        assert_eq!(declarations[1].hint(), None);
    }

    #[test]
    fn test_empty_config() {
        let config = EmbConfig::from_toml_str("").unwrap();
        assert_eq!(config, EmbConfig::default());
        assert!(config.selector().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_selection_names_key() {
        let err = EmbConfig::from_toml_str("[selections]\n\"Resolver#\" = \"x\"\n").unwrap_err();
        assert!(matches!(err, EmbError::ConfigError { .. }));
        assert!(err.to_string().contains("Resolver#"));

        let err = EmbConfig::from_toml_str("[selections]\n\"Resolver\" = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("Resolver"));
    }

    #[test]
    fn test_unknown_strategy() {
        let content = r#"
[[components]]
role = "Resolver"
hint = "x"
implementation = "X"
strategy = "sometimes"
"#;
        let err = EmbConfig::from_toml_str(content).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Resolver#x"));
        assert!(message.contains("sometimes"));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = EmbConfig::from_toml_str("[selections\n").unwrap_err();
        assert!(matches!(err, EmbError::ConfigParseError { .. }));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("embkit.toml");

        let config = EmbConfig::from_toml_str(SAMPLE).unwrap();
        config.save_to(&path).await.unwrap();

        let loaded = EmbConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_explicit_missing_path_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.toml");
        let err = EmbConfig::load_or_default(Some(&path)).await.unwrap_err();
        assert!(matches!(err, EmbError::ConfigNotFound { .. }));
    }
}
