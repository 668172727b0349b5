//! Simulation configuration with documented defaults
//!
//! Every knob that shapes a run lives here. Values deserialize from TOML
//! with per-field defaults, so a config file only needs the keys it changes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Top-level configuration for a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === WORLD ===
    /// Grid dimensions in cells
    pub map: MapConfig,

    /// How many civilizations are seeded and how they are named
    pub civilizations: CivilizationConfig,

    // === TIME ===
    /// Year the simulation starts at
    ///
    /// Each tick advances 10 years and the expensive recomputation runs when
    /// the year is a multiple of 20, so this must be a multiple of 10.
    pub start_year: i32,

    /// Real-time pacing used by the ticker
    pub speed: SimulationSpeed,

    // === DETERMINISM ===
    /// RNG seed; `None` draws one from entropy
    pub seed: Option<u64>,

    // === DATA ===
    /// Technology catalog source: a file path or an http(s) URL
    ///
    /// When absent or unreadable the simulation runs without research.
    pub tech_tree: Option<String>,

    /// Number of events retained in the rolling log
    pub event_log_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub cols: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CivilizationConfig {
    /// Fewest civilizations seeded at start
    pub min_count: usize,
    /// Most civilizations seeded at start
    pub max_count: usize,
    /// Names handed out in order, cycling when exhausted
    pub names: Vec<String>,
    /// Stability-driven secession stops once this many civilizations exist
    pub max_civilizations: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            map: MapConfig::default(),
            civilizations: CivilizationConfig::default(),
            start_year: -3000,
            speed: SimulationSpeed::Medium,
            seed: None,
            tech_tree: None,
            event_log_capacity: 50,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        // 800x800 canvas at 8px per cell
        Self { cols: 100, rows: 100 }
    }
}

impl Default for CivilizationConfig {
    fn default() -> Self {
        Self {
            min_count: 2,
            max_count: 5,
            names: ["Yellow River", "Aegean", "Nile", "Maya", "Inca"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_civilizations: 10,
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.map.cols == 0 || self.map.rows == 0 {
            return Err(SimError::InvalidConfig(format!(
                "map must be non-empty, got {}x{}",
                self.map.cols, self.map.rows
            )));
        }
        let civs = &self.civilizations;
        if civs.min_count == 0 || civs.min_count > civs.max_count {
            return Err(SimError::InvalidConfig(format!(
                "civilization count range {}..={} is empty",
                civs.min_count, civs.max_count
            )));
        }
        if civs.names.is_empty() {
            return Err(SimError::InvalidConfig("no civilization names".into()));
        }
        if self.event_log_capacity == 0 {
            return Err(SimError::InvalidConfig("event log capacity must be positive".into()));
        }
        if self.start_year % 10 != 0 {
            return Err(SimError::InvalidConfig(format!(
                "start year {} is not a multiple of 10",
                self.start_year
            )));
        }
        Ok(())
    }
}

/// Real-time pacing presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationSpeed {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl SimulationSpeed {
    pub fn interval(&self) -> Duration {
        match self {
            SimulationSpeed::Slow => Duration::from_millis(2000),
            SimulationSpeed::Medium => Duration::from_millis(1000),
            SimulationSpeed::Fast => Duration::from_millis(500),
        }
    }
}

impl std::str::FromStr for SimulationSpeed {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "slow" => Ok(SimulationSpeed::Slow),
            "medium" => Ok(SimulationSpeed::Medium),
            "fast" => Ok(SimulationSpeed::Fast),
            other => Err(SimError::InvalidConfig(format!("unknown speed '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.map.cols, 100);
        assert_eq!(config.start_year, -3000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            seed = 7
            speed = "fast"

            [map]
            cols = 40
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.speed, SimulationSpeed::Fast);
        assert_eq!(config.map.cols, 40);
        assert_eq!(config.map.rows, 100);
        assert_eq!(config.civilizations.max_count, 5);
    }

    #[test]
    fn test_rejects_misaligned_start_year() {
        let result = SimulationConfig::from_toml_str("start_year = -2995");
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_empty_count_range() {
        let mut config = SimulationConfig::default();
        config.civilizations.min_count = 4;
        config.civilizations.max_count = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_speed_intervals() {
        assert_eq!(SimulationSpeed::Slow.interval(), Duration::from_millis(2000));
        assert_eq!("FAST".parse::<SimulationSpeed>().unwrap(), SimulationSpeed::Fast);
        assert!("warp".parse::<SimulationSpeed>().is_err());
    }
}
