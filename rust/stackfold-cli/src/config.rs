//! Configuration file parsing for `stackfold.toml`.
//!
//! Searches current directory then ancestors, falling back to
//! `~/.config/stackfold/stackfold.toml` if no project-level file is found.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use stackfold_core::render::DEFAULT_MAX_NAME_PATTERNS;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "stackfold.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid toml in config '{}'", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StackfoldConfig {
    #[serde(default)]
    pub rules: RulesSection,
    #[serde(default)]
    pub report: ReportSection,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RulesSection {
    /// Load the rules shipped with the binary before any rule file.
    pub bundled: bool,
    /// Extra rule files, relative to the directory holding the config file.
    pub files: Vec<PathBuf>,
}

impl Default for RulesSection {
    fn default() -> Self {
        Self {
            bundled: true,
            files: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSection {
    pub format: ReportFormat,
    /// A trace group with at least this many name patterns prints only its
    /// thread count.
    pub max_name_patterns: usize,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            format: ReportFormat::Text,
            max_name_patterns: DEFAULT_MAX_NAME_PATTERNS,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl StackfoldConfig {
    /// Load the nearest `stackfold.toml`, returning its path alongside.
    /// `Ok(None)` when no file exists; a file that exists but does not parse
    /// is an error.
    pub fn load_with_path() -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let Ok(cwd) = std::env::current_dir() else {
            return Ok(None);
        };
        match find_config(&cwd, dirs_or_home().as_deref()) {
            Some(path) => Self::load_from(&path).map(|cfg| Some((path, cfg))),
            None => Ok(None),
        }
    }

    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a TOML string directly.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Rule files with relative entries resolved against `base`.
    pub fn rule_files(&self, base: Option<&Path>) -> Vec<PathBuf> {
        self.rules
            .files
            .iter()
            .map(|file| match base {
                Some(dir) if file.is_relative() => dir.join(file),
                _ => file.clone(),
            })
            .collect()
    }
}

/// Walk from `start` up to the filesystem root looking for
/// `stackfold.toml`, then try the per-user file under `home`.
pub fn find_config(start: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            break;
        }
    }
    let global = home?.join(".config").join("stackfold").join(CONFIG_FILE_NAME);
    global.is_file().then_some(global)
}

fn dirs_or_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
