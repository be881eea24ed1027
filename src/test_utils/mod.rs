//! Test utilities for embkit
//!
//! Shared helpers for unit and integration tests: one-time logging setup,
//! configuration files on disk, and small dependency-graph fixtures.
//!
//! # Example
//!
//! ```rust,no_run
//! use embkit::test_utils::{ConfigFixture, init_test_logging};
//!
//! init_test_logging(None);
//! let fixture = ConfigFixture::new("[selections]\n\"Resolver\" = \"local\"\n").unwrap();
//! assert!(fixture.path().exists());
//! ```

use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::constants::CONFIG_FILE_NAME;
use crate::graph::{ArtifactCoordinate, DependencyGraphBuilder, DependencyObservation};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=embkit=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// A configuration file written into its own temporary directory.
///
/// The directory is removed when the fixture is dropped.
pub struct ConfigFixture {
    temp: TempDir,
    path: PathBuf,
}

impl ConfigFixture {
    /// Write `content` to `embkit.toml` in a fresh temporary directory.
    pub fn new(content: &str) -> std::io::Result<Self> {
        Self::named(CONFIG_FILE_NAME, content)
    }

    /// Write `content` to `name` in a fresh temporary directory.
    pub fn named(name: &str, content: &str) -> std::io::Result<Self> {
        let temp = TempDir::new()?;
        let path = temp.path().join(name);
        std::fs::write(&path, content)?;
        Ok(Self {
            temp,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.temp.path()
    }

    /// A path inside the fixture directory that does not exist yet.
    pub fn missing(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }
}

/// `org.example:<artifact>:1.0`
pub fn coordinate(artifact: &str) -> ArtifactCoordinate {
    ArtifactCoordinate::new("org.example", artifact, "1.0")
}

/// An observation of `org.example:<artifact>:1.0`.
pub fn observation(artifact: &str) -> DependencyObservation {
    DependencyObservation::new(coordinate(artifact))
}

/// Build a graph from `(parent, child)` artifact pairs, with `root` added first.
pub fn graph_from_edges(root: &str, edges: &[(&str, &str)]) -> DependencyGraphBuilder {
    let mut builder = DependencyGraphBuilder::new();
    builder.add_root(observation(root), None);
    for (parent, child) in edges {
        builder.add_dependency(&observation(parent), observation(child));
    }
    builder
}
