//! World-level configuration.
//!
//! A single `atmos.toml` carries the core sections (`[emotion]`, `[weather]`,
//! ...) plus a `[world]` section for the tick scheduler.

use serde::{Deserialize, Serialize};

use atmos_core::config::AtmosConfig;
use atmos_core::error::{AtmosError, Result};
use atmos_core::weather::WeatherType;

/// Core config plus the tick schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Affect engine tuning.
    #[serde(flatten)]
    pub affect: AtmosConfig,
    /// Tick scheduler settings.
    #[serde(default)]
    pub world: TickConfig,
}

impl WorldConfig {
    /// Parse a TOML document and validate the lookup tables.
    ///
    /// # Errors
    /// Returns `AtmosError::Config` on invalid TOML or inconsistent tables.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| AtmosError::Config(e.to_string()))?;
        config.affect.tables.validate()?;
        if config.world.tick_interval_ms == 0 {
            return Err(AtmosError::Config("world.tick_interval_ms must be positive".into()));
        }
        Ok(config)
    }

    /// Load from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

/// How the world ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    /// Milliseconds between ticks in `run_ticks`.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Weather at world creation.
    #[serde(default = "default_initial_weather")]
    pub initial_weather: WeatherType,
    /// Seed for weather randomness. Random when absent.
    #[serde(default)]
    pub rng_seed: Option<u64>,
    /// Proximity factor for conversation partners.
    #[serde(default = "default_conversation_proximity")]
    pub conversation_proximity: f32,
    /// Soft per-tick budget in milliseconds; overruns are logged.
    #[serde(default = "default_tick_budget")]
    pub tick_budget_ms: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            initial_weather: default_initial_weather(),
            rng_seed: None,
            conversation_proximity: default_conversation_proximity(),
            tick_budget_ms: default_tick_budget(),
        }
    }
}

fn default_tick_interval() -> u64 { 1000 }
fn default_initial_weather() -> WeatherType { WeatherType::Sunny }
fn default_conversation_proximity() -> f32 { 1.0 }
fn default_tick_budget() -> f64 { 5.0 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_section_sits_beside_core_sections() {
        let config = WorldConfig::from_toml(
            r#"
            [emotion]
            decay_base = 0.95

            [world]
            tick_interval_ms = 250
            initial_weather = "fog"
            rng_seed = 42
            "#,
        )
        .expect("parses");
        assert!((config.affect.emotion.decay_base - 0.95).abs() < f32::EPSILON);
        assert_eq!(config.world.tick_interval_ms, 250);
        assert_eq!(config.world.initial_weather, WeatherType::Fog);
        assert_eq!(config.world.rng_seed, Some(42));
        assert!((config.world.conversation_proximity - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_document_is_default() {
        let config = WorldConfig::from_toml("").expect("parses");
        assert_eq!(config.world.tick_interval_ms, 1000);
        assert_eq!(config.affect.chambers.templates.len(), 5);
    }

    #[test]
    fn zero_interval_rejected() {
        let err = WorldConfig::from_toml("[world]\ntick_interval_ms = 0").expect_err("rejected");
        assert!(matches!(err, AtmosError::Config(_)));
    }
}
