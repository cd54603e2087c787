//! Engine configuration.
//!
//! Read from a JSON file. Every field is optional and falls back to the
//! defaults below.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::Rules;
use crate::resolve::ProcessAdjudicator;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "ARMISTICE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How to run the movement solver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Kill the solver after this long.
    pub timeout_ms: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            program: "cdippy".to_string(),
            args: Vec::new(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub min_players: usize,
    pub max_players: usize,
    /// Supply centers needed to win outright.
    pub victory_centers: usize,
    pub solver: SolverConfig,
    /// Sessions are kept as JSON files here; in memory when unset.
    pub store_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let rules = Rules::default();
        Self {
            min_players: rules.min_players,
            max_players: rules.max_players,
            victory_centers: rules.victory_centers,
            solver: SolverConfig::default(),
            store_dir: None,
        }
    }
}

impl Config {
    /// Loads `path`, or the defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("no config at {}, using defaults", path.display());
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Config::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_players < 1 || self.min_players > self.max_players {
            return Err(ConfigError::Invalid(format!(
                "min_players must be between 1 and max_players ({})",
                self.max_players
            )));
        }
        if self.max_players > 7 {
            return Err(ConfigError::Invalid("at most 7 players fit on the board".into()));
        }
        if self.victory_centers == 0 {
            return Err(ConfigError::Invalid("victory_centers must be positive".into()));
        }
        if self.solver.program.trim().is_empty() {
            return Err(ConfigError::Invalid("solver.program is empty".into()));
        }
        Ok(())
    }

    pub fn rules(&self) -> Rules {
        Rules {
            min_players: self.min_players,
            max_players: self.max_players,
            victory_centers: self.victory_centers,
        }
    }

    pub fn adjudicator(&self) -> ProcessAdjudicator {
        ProcessAdjudicator::new(
            self.solver.program.clone(),
            self.solver.args.clone(),
            Duration::from_millis(self.solver.timeout_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = Config::from_json(r#"{"victory_centers": 12, "solver": {"timeout_ms": 500}}"#).unwrap();
        assert_eq!(config.victory_centers, 12);
        assert_eq!(config.max_players, 7);
        assert_eq!(config.solver.program, "cdippy");
        assert_eq!(config.adjudicator().timeout, Duration::from_millis(500));
        assert_eq!(config.store_dir, None);
    }

    #[test]
    fn nonsense_limits_are_rejected() {
        assert!(matches!(
            Config::from_json(r#"{"min_players": 5, "max_players": 3}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(Config::from_json(r#"{"max_players": 9}"#), Err(ConfigError::Invalid(_))));
        assert!(matches!(Config::from_json("{"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn absent_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }
}
