//! Run configuration
//!
//! Settings are layered, last wins:
//! 1. Built-in defaults
//! 2. `yacls.toml` (from `--config`, or the working directory when present)
//! 3. CLI flags
//!
//! Scalars override; lists are replaced, never concatenated.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_FILE: &str = "yacls.toml";

/// One layer of run settings; unset fields defer to lower layers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Ingester kind, when not guessed from file names
    pub kind: Option<String>,

    /// GCP projects to snapshot, one run per project
    pub projects: Vec<String>,

    /// Project used for Cloud Identity group lookups
    pub gcp_identity_project: Option<String>,

    /// Directory for rendered snapshots
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("empty project identifier")]
    EmptyProject,

    #[error("duplicate project: '{0}'")]
    DuplicateProject(String),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { path, source } => Error::io_path("read", &path, source),
            other => Error::Config(other.to_string()),
        }
    }
}

impl RunConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate TOML
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// The file layer: `explicit` must exist; otherwise `DEFAULT_FILE` in
    /// `dir` is used when present.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Option<Self>, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path).map(Some);
        }
        let path = dir.join(DEFAULT_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        info!(path = %path.display(), "using run configuration");
        Self::load(&path).map(Some)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for project in &self.projects {
            if project.trim().is_empty() {
                return Err(ConfigError::EmptyProject);
            }
            if !seen.insert(project.as_str()) {
                return Err(ConfigError::DuplicateProject(project.clone()));
            }
        }
        Ok(())
    }

    /// Apply `overlay` on top of `self`
    pub fn merge(self, overlay: RunConfig) -> RunConfig {
        RunConfig {
            kind: overlay.kind.or(self.kind),
            projects: if overlay.projects.is_empty() {
                self.projects
            } else {
                overlay.projects
            },
            gcp_identity_project: overlay.gcp_identity_project.or(self.gcp_identity_project),
            out_dir: overlay.out_dir.or(self.out_dir),
        }
    }

    /// Merge layers in order, first is the base
    pub fn layered(layers: impl IntoIterator<Item = RunConfig>) -> Result<Self, ConfigError> {
        let merged = layers
            .into_iter()
            .fold(RunConfig::default(), RunConfig::merge);
        merged.validate()?;
        Ok(merged)
    }
}

/// Split a comma-separated `--project` value
pub fn split_projects(raw: &str) -> Vec<String> {
    raw.split(',').map(|p| p.trim().to_string()).collect()
}
