//! Generic configuration parsing utilities.
//!
//! [`parse_config`] reads a TOML file and deserializes it into any
//! `DeserializeOwned` type. Failures are reported as typed errors that carry
//! the file path:
//!
//! - a missing file is [`EmbError::ConfigNotFound`]
//! - unreadable content or invalid TOML is [`EmbError::ConfigParseError`]
//!
//! ```rust,no_run
//! use embkit::config::parse_config;
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Deserialize)]
//! struct Selections {
//!     selections: std::collections::BTreeMap<String, String>,
//! }
//!
//! # fn example() -> embkit::core::Result<()> {
//! let parsed: Selections = parse_config(Path::new("embkit.toml"))?;
//! println!("{} selection(s)", parsed.selections.len());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use crate::core::{EmbError, Result};

/// Parse a TOML configuration file into the specified type.
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path).map_err(|e| read_error(path, &e))?;
    parse_config_str(path, &content)
}

/// Parse TOML `content` that was read from `path`.
pub fn parse_config_str<T>(path: &Path, content: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    toml::from_str(content).map_err(|e| EmbError::ConfigParseError {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Map an I/O failure while reading `path` to a configuration error.
pub(crate) fn read_error(path: &Path, error: &std::io::Error) -> EmbError {
    if error.kind() == std::io::ErrorKind::NotFound {
        EmbError::ConfigNotFound {
            path: path.display().to_string(),
        }
    } else {
        EmbError::ConfigParseError {
            file: path.display().to_string(),
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug, serde::Deserialize)]
    struct TestConfig {
        name: String,
        value: i32,
    }

    #[test]
    fn test_parse_config() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("test.toml");

        let toml_content = r#"
            name = "test"
            value = 42
        "#;
        std::fs::write(&config_path, toml_content).unwrap();

        let config: TestConfig = parse_config(&config_path).unwrap();
        assert_eq!(config.name, "test");
        assert_eq!(config.value, 42);
    }

    #[test]
    fn test_parse_config_missing_file() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("missing.toml");

        let err = parse_config::<TestConfig>(&config_path).unwrap_err();
        match err {
            EmbError::ConfigNotFound {
                path,
            } => assert!(path.ends_with("missing.toml")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_config_invalid_toml() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("invalid.toml");
        std::fs::write(&config_path, "name = \"unterminated").unwrap();

        let err = parse_config::<TestConfig>(&config_path).unwrap_err();
        assert!(matches!(err, EmbError::ConfigParseError { .. }));
        assert!(err.to_string().contains("invalid.toml"));
    }

    #[test]
    fn test_parse_config_wrong_shape() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("shape.toml");
        std::fs::write(&config_path, "name = 42\nvalue = 1").unwrap();

        assert!(parse_config::<TestConfig>(&config_path).is_err());
    }
}
