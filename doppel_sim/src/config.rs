//! Harness configuration.

use crate::error::SimError;
use crate::scenarios::ScenarioId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a harness run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed (0 = derive from the clock)
    pub seed: u64,

    /// Number of consecutive seeds to run
    pub seeds: usize,

    /// Calls per scripted ledger
    pub calls: usize,

    /// Scenarios to run
    pub scenarios: Vec<ScenarioId>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            seeds: 1,
            calls: 32,
            scenarios: ScenarioId::all(),
        }
    }
}

impl SimConfig {
    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let json = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&json)?;
        if config.scenarios.is_empty() {
            return Err(SimError::Config("no scenarios selected".to_string()));
        }
        Ok(config)
    }

    /// The seeds this config runs, starting at `base`.
    pub fn seed_range(&self, base: u64) -> impl Iterator<Item = u64> {
        (0..self.seeds.max(1) as u64).map(move |offset| base.wrapping_add(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{"seed": 7, "scenarios": ["yield_drain"]}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.calls, 32);
        assert_eq!(config.scenarios, vec![ScenarioId::YieldDrain]);
    }

    #[test]
    fn test_seed_range_wraps() {
        let config = SimConfig {
            seeds: 3,
            ..Default::default()
        };
        let seeds: Vec<u64> = config.seed_range(u64::MAX).collect();
        assert_eq!(seeds, vec![u64::MAX, 0, 1]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SimConfig::from_json_file("/nonexistent/doppel.json").unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }
}
