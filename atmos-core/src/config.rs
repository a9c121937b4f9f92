//! Configuration for the ATMOS affect engine.
//!
//! Maps directly to `atmos.toml`. Every section and field has a default, so an
//! empty file (or no file) yields the stock tuning.

use serde::{Deserialize, Serialize};

use crate::chamber::ChamberTemplate;
use crate::tables::AffectTables;

/// Top-level ATMOS configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtmosConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Emotional state and decay tuning.
    #[serde(default)]
    pub emotion: EmotionConfig,
    /// Contagion tuning.
    #[serde(default)]
    pub contagion: ContagionConfig,
    /// Memory resonance tuning.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Atmosphere aggregation settings.
    #[serde(default)]
    pub atmosphere: AtmosphereConfig,
    /// Weather controller settings.
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Resonance chamber settings and templates.
    #[serde(default)]
    pub chambers: ChamberConfig,
    /// Persistence / save settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Lookup tables.
    #[serde(default)]
    pub tables: AffectTables,
}

impl AtmosConfig {
    /// Load configuration from a TOML string and validate the tables.
    ///
    /// # Errors
    /// Returns `AtmosError::Config` if the TOML is invalid or the tables are inconsistent.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| crate::AtmosError::Config(e.to_string()))?;
        config.tables.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether the affect system runs. A disabled world skips its ticks.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
        }
    }
}

/// Emotional state, decay and mood settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionConfig {
    /// Per-minute decay base; the exponent is `minutes × (1 + regulation/100)`.
    #[serde(default = "default_decay_base")]
    pub decay_base: f32,
    /// Trigger intensities above this are reported as spikes.
    #[serde(default = "default_40")]
    pub spike_threshold: f32,
    /// Score given to a mood prototype that requires no emotion.
    #[serde(default = "default_10_0")]
    pub unconstrained_mood_score: f32,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            decay_base: 0.98,
            spike_threshold: 40.0,
            unconstrained_mood_score: 10.0,
        }
    }
}

/// Contagion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContagionConfig {
    /// Base transfer rate before empathy, bond and proximity.
    #[serde(default = "default_0_3")]
    pub base_rate: f32,
    /// Transfers whose largest channel change is below this are not reported.
    #[serde(default = "default_1_0")]
    pub min_logged_delta: f32,
}

impl Default for ContagionConfig {
    fn default() -> Self {
        Self {
            base_rate: 0.3,
            min_logged_delta: 1.0,
        }
    }
}

/// Memory resonance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Days over which the recency bonus falls linearly to zero.
    #[serde(default = "default_30_0")]
    pub recency_window_days: f32,
    /// Maximum recency bonus (score multiplier is `1 + bonus`).
    #[serde(default = "default_0_5")]
    pub recency_bonus: f32,
    /// Bonus per prior trigger.
    #[serde(default = "default_0_05")]
    pub reinforcement_bonus: f32,
    /// Prior triggers beyond this add nothing.
    #[serde(default = "default_10_u32")]
    pub reinforcement_cap: u32,
    /// Fraction of a memory's intensity re-applied when it resurfaces.
    #[serde(default = "default_0_25")]
    pub resurface_factor: f32,
    /// Number of memories resurfaced when the caller gives no limit.
    #[serde(default = "default_5_usize")]
    pub default_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recency_window_days: 30.0,
            recency_bonus: 0.5,
            reinforcement_bonus: 0.05,
            reinforcement_cap: 10,
            resurface_factor: 0.25,
            default_limit: 5,
        }
    }
}

/// Atmosphere aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtmosphereConfig {
    /// Mean-valence change needed to call a trend rising or falling.
    #[serde(default = "default_10_0")]
    pub trend_threshold: f32,
    /// Snapshots kept in the time series (oldest dropped first).
    #[serde(default = "default_1440")]
    pub history_limit: usize,
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self {
            trend_threshold: 10.0,
            history_limit: 1440,
        }
    }
}

/// Weather controller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Shortest hold window in minutes.
    #[serde(default = "default_10_u32")]
    pub min_duration_minutes: u32,
    /// Longest hold window in minutes.
    #[serde(default = "default_30_u32")]
    pub max_duration_minutes: u32,
    /// Starting probability weight (0–100) of the emotion-driven path.
    #[serde(default = "default_30_0")]
    pub emotional_influence: f32,
    /// Weather history length.
    #[serde(default = "default_5_usize")]
    pub history_len: usize,
    /// Minutes for `transition_progress` to reach 1.
    #[serde(default = "default_5_0")]
    pub transition_minutes: f32,
    /// Divisor applied to weather intensity when scaling effects.
    #[serde(default = "default_50_0")]
    pub effect_scale_divisor: f32,
    /// In-world minutes over which one full row of weather effects is applied.
    /// Ticks apply the share owed for the time since the previous application.
    #[serde(default = "default_10_0")]
    pub effect_period_minutes: f32,
    /// Arousal above which rain becomes storm.
    #[serde(default = "default_70_0")]
    pub storm_arousal: f32,
    /// Arousal below which rain softens to light rain.
    #[serde(default = "default_30_0")]
    pub drizzle_arousal: f32,
    /// Absolute valence beyond which cloudy shades to partly cloudy / overcast.
    #[serde(default = "default_40")]
    pub cloud_valence: f32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            min_duration_minutes: 10,
            max_duration_minutes: 30,
            emotional_influence: 30.0,
            history_len: 5,
            transition_minutes: 5.0,
            effect_scale_divisor: 50.0,
            effect_period_minutes: 10.0,
            storm_arousal: 70.0,
            drizzle_arousal: 30.0,
            cloud_valence: 40.0,
        }
    }
}

/// Resonance chamber settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChamberConfig {
    /// Share of resonance intensity turned into the amplification push.
    #[serde(default = "default_0_3")]
    pub amplification_share: f32,
    /// Share of the push a transformer moves onto the counterpart emotion.
    #[serde(default = "default_0_5")]
    pub transform_share: f32,
    /// Baseline pull per tick for stabilizers, multiplied by their stabilization.
    #[serde(default = "default_0_1")]
    pub stabilization_rate: f32,
    /// Chambers created at world initialisation.
    #[serde(default = "crate::chamber::default_templates")]
    pub templates: Vec<ChamberTemplate>,
}

impl Default for ChamberConfig {
    fn default() -> Self {
        Self {
            amplification_share: 0.3,
            transform_share: 0.5,
            stabilization_rate: 0.1,
            templates: crate::chamber::default_templates(),
        }
    }
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Seconds between saves while `run_ticks` drives the world. 0 disables.
    #[serde(default = "default_300")]
    pub auto_save_interval_seconds: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            auto_save_interval_seconds: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_decay_base() -> f32 { 0.98 }
fn default_0_05() -> f32 { 0.05 }
fn default_0_1() -> f32 { 0.1 }
fn default_0_25() -> f32 { 0.25 }
fn default_0_3() -> f32 { 0.3 }
fn default_0_5() -> f32 { 0.5 }
fn default_1_0() -> f32 { 1.0 }
fn default_5_0() -> f32 { 5.0 }
fn default_10_0() -> f32 { 10.0 }
fn default_30_0() -> f32 { 30.0 }
fn default_40() -> f32 { 40.0 }
fn default_50_0() -> f32 { 50.0 }
fn default_70_0() -> f32 { 70.0 }
fn default_5_usize() -> usize { 5 }
fn default_10_u32() -> u32 { 10 }
fn default_30_u32() -> u32 { 30 }
fn default_300() -> u32 { 300 }
fn default_1440() -> usize { 1440 }
