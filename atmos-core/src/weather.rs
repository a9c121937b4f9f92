//! Weather feedback controller.
//!
//! Weather and mood feed each other. The controller holds the current weather
//! for a random window; when the window expires it rolls a draw against
//! `emotional_influence`:
//!
//! - below it, the atmosphere's dominant emotion picks the weather through the
//!   emotion→weather table (if the atmosphere is intense enough), shaded by
//!   arousal and valence
//! - otherwise the weather follows the natural transition table
//!
//! Every tick the active weather pushes small emotion deltas into each agent,
//! scaled by weather intensity, time of day and the agent's chronotype. A full
//! row of the effect table is spread over `effect_period_minutes` of in-world
//! time, so the push per tick shrinks with the tick length and stays below
//! what decay takes back.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::atmosphere::AtmosphereSnapshot;
use crate::config::WeatherConfig;
use crate::events::{AffectEvent, EventOutbox};
use crate::metrics::AffectCounters;
use crate::store::EmotionalStateStore;
use crate::tables::AffectTables;
use crate::types::{Chronotype, Emotion, clamp_intensity, minutes_between};

/// The ten weather conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherType {
    /// Clear skies.
    Sunny,
    /// Sun with scattered clouds.
    PartlyCloudy,
    /// Mostly cloudy.
    Cloudy,
    /// Full grey cover.
    Overcast,
    /// Drizzle.
    LightRain,
    /// Steady rain.
    Rain,
    /// Thunderstorm.
    Storm,
    /// Fog.
    Fog,
    /// Snowfall.
    Snow,
    /// Strong wind.
    Windy,
}

impl WeatherType {
    /// All weather types in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Sunny,
        Self::PartlyCloudy,
        Self::Cloudy,
        Self::Overcast,
        Self::LightRain,
        Self::Rain,
        Self::Storm,
        Self::Fog,
        Self::Snow,
        Self::Windy,
    ];

    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::PartlyCloudy => "partly_cloudy",
            Self::Cloudy => "cloudy",
            Self::Overcast => "overcast",
            Self::LightRain => "light_rain",
            Self::Rain => "rain",
            Self::Storm => "storm",
            Self::Fog => "fog",
            Self::Snow => "snow",
            Self::Windy => "windy",
        }
    }
}

impl fmt::Display for WeatherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the hour counts as night (20:00–04:59).
#[must_use]
pub const fn is_night(hour: u32) -> bool {
    hour >= 20 || hour < 5
}

/// How strongly `weather` is felt at `hour`.
///
/// Bright weather is muted at night; fog and storms feel stronger.
#[must_use]
pub const fn time_of_day_factor(weather: WeatherType, hour: u32) -> f32 {
    if !is_night(hour) {
        return 1.0;
    }
    match weather {
        WeatherType::Sunny | WeatherType::PartlyCloudy => 0.3,
        WeatherType::Storm | WeatherType::Fog => 1.3,
        _ => 1.0,
    }
}

/// One window in the weather history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Weather during the window.
    pub weather: WeatherType,
    /// Intensity during the window.
    pub intensity: f32,
    /// Whether the collective mood chose it.
    pub emotionally_driven: bool,
    /// Window start.
    pub started_at: DateTime<Utc>,
}

/// The world's weather. One per world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherState {
    /// Active weather.
    pub current_weather: WeatherType,
    /// Strength of the active weather (0–100).
    pub weather_intensity: f32,
    /// Probability weight (0–100) of the emotion-driven path.
    pub emotional_influence: f32,
    /// Blend from the previous weather, 0 → 1.
    pub transition_progress: f32,
    /// Whether the active weather was chosen by the collective mood.
    pub emotionally_driven: bool,
    /// When the active window started.
    pub started_at: DateTime<Utc>,
    /// When the active window expires.
    pub next_change_at: DateTime<Utc>,
    /// Most recent windows, oldest first.
    pub recent_weather: VecDeque<WeatherRecord>,
}

/// Which branch produced a weather decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPath {
    /// The atmosphere's dominant emotion chose the weather.
    Emotional,
    /// Emotional path rolled but the atmosphere was too weak; weather held.
    Held,
    /// Natural transition table.
    Natural,
}

/// Outcome of one transition decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherDecision {
    /// Next weather.
    pub weather: WeatherType,
    /// Next intensity.
    pub intensity: f32,
    /// Branch taken.
    pub path: TransitionPath,
}

/// Drives [`WeatherState`] from the atmosphere and the transition table.
pub struct WeatherController {
    config: WeatherConfig,
    tables: Arc<AffectTables>,
    state: WeatherState,
    outbox: EventOutbox,
    counters: Arc<AffectCounters>,
    last_effects_at: Option<DateTime<Utc>>,
}

impl WeatherController {
    /// Start with `initial` weather and a fresh random window.
    pub fn new<R: Rng + ?Sized>(
        config: WeatherConfig,
        tables: Arc<AffectTables>,
        initial: WeatherType,
        now: DateTime<Utc>,
        outbox: EventOutbox,
        counters: Arc<AffectCounters>,
        rng: &mut R,
    ) -> Self {
        let window = draw_window(&config, rng);
        let state = WeatherState {
            current_weather: initial,
            weather_intensity: 50.0,
            emotional_influence: clamp_intensity(config.emotional_influence),
            transition_progress: 1.0,
            emotionally_driven: false,
            started_at: now,
            next_change_at: now + window,
            recent_weather: VecDeque::new(),
        };
        Self {
            config,
            tables,
            state,
            outbox,
            counters,
            last_effects_at: Some(now),
        }
    }

    /// Resume from a saved state. The first effect pass after resuming only
    /// starts the effect clock.
    #[must_use]
    pub fn from_state(
        config: WeatherConfig,
        tables: Arc<AffectTables>,
        state: WeatherState,
        outbox: EventOutbox,
        counters: Arc<AffectCounters>,
    ) -> Self {
        Self {
            config,
            tables,
            state,
            outbox,
            counters,
            last_effects_at: None,
        }
    }

    /// Current weather state.
    #[must_use]
    pub fn state(&self) -> &WeatherState {
        &self.state
    }

    /// Adjust how much the collective mood steers the weather (0–100).
    pub fn set_emotional_influence(&mut self, influence: f32) {
        self.state.emotional_influence = clamp_intensity(influence);
    }

    /// Advance the weather to `now`.
    ///
    /// Before the window expires only `transition_progress` moves. On expiry a
    /// new weather (possibly the same one) is chosen for a fresh window.
    /// Returns the decision when a new window started.
    pub fn update_world_weather<R: Rng + ?Sized>(
        &mut self,
        atmosphere: Option<&AtmosphereSnapshot>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Option<WeatherDecision> {
        self.advance_progress(now);
        if now < self.state.next_change_at {
            return None;
        }
        let draw: f32 = rng.gen_range(0.0..100.0);
        let decision = self.decide_transition(draw, atmosphere, rng);
        self.begin_window(decision, now, rng);
        Some(decision)
    }

    /// Choose the next weather for a given draw in [0, 100).
    ///
    /// With no atmosphere the natural path is taken regardless of the draw.
    pub fn decide_transition<R: Rng + ?Sized>(
        &self,
        draw: f32,
        atmosphere: Option<&AtmosphereSnapshot>,
        rng: &mut R,
    ) -> WeatherDecision {
        match atmosphere {
            Some(atmosphere) if draw < self.state.emotional_influence => self
                .emotional_transition(atmosphere)
                .unwrap_or(WeatherDecision {
                    weather: self.state.current_weather,
                    intensity: self.state.weather_intensity,
                    path: TransitionPath::Held,
                }),
            _ => self.natural_transition(rng),
        }
    }

    fn emotional_transition(
        &self,
        atmosphere: &AtmosphereSnapshot,
    ) -> Option<WeatherDecision> {
        let dominant = atmosphere.dominant_emotion?;
        let rule = self.tables.weather_rule(dominant)?;
        if atmosphere.intensity < rule.min_intensity {
            return None;
        }
        Some(WeatherDecision {
            weather: shade(
                rule.weather,
                atmosphere.average_arousal,
                atmosphere.average_valence,
                &self.config,
            ),
            intensity: clamp_intensity(atmosphere.intensity),
            path: TransitionPath::Emotional,
        })
    }

    fn natural_transition<R: Rng + ?Sized>(&self, rng: &mut R) -> WeatherDecision {
        let current = self.state.current_weather;
        let choices = self.tables.transitions_from(current);
        let weather = match WeightedIndex::new(choices.iter().map(|c| c.weight)) {
            Ok(index) => choices[index.sample(rng)].weather,
            Err(e) => {
                warn!(weather = %current, error = %e, "no usable natural transition, holding");
                current
            }
        };
        WeatherDecision {
            weather,
            intensity: rng.gen_range(30.0..=70.0),
            path: TransitionPath::Natural,
        }
    }

    fn begin_window<R: Rng + ?Sized>(
        &mut self,
        decision: WeatherDecision,
        now: DateTime<Utc>,
        rng: &mut R,
    ) {
        let from = self.state.current_weather;
        let driven = decision.path == TransitionPath::Emotional;
        let window = draw_window(&self.config, rng);

        self.state.recent_weather.push_back(WeatherRecord {
            weather: decision.weather,
            intensity: decision.intensity,
            emotionally_driven: driven,
            started_at: now,
        });
        while self.state.recent_weather.len() > self.config.history_len {
            self.state.recent_weather.pop_front();
        }
        self.state.current_weather = decision.weather;
        self.state.weather_intensity = decision.intensity;
        self.state.emotionally_driven = driven;
        self.state.started_at = now;
        self.state.next_change_at = now + window;
        self.state.transition_progress = if from == decision.weather { 1.0 } else { 0.0 };

        if from == decision.weather {
            debug!(
                weather = %from,
                path = ?decision.path,
                minutes = window.num_minutes(),
                "weather held"
            );
            return;
        }
        AffectCounters::bump(&self.counters.weather_changes);
        if driven {
            AffectCounters::bump(&self.counters.weather_changes_emotional);
        }
        info!(
            %from,
            to = %decision.weather,
            intensity = decision.intensity,
            emotionally_driven = driven,
            "weather changed"
        );
        self.outbox.publish(AffectEvent::WeatherChanged {
            from,
            to: decision.weather,
            emotionally_driven: driven,
            at: now,
        });
    }

    fn advance_progress(&mut self, now: DateTime<Utc>) {
        let minutes = minutes_between(self.state.started_at, now) as f32;
        self.state.transition_progress = if self.config.transition_minutes <= 0.0 {
            1.0
        } else {
            (minutes / self.config.transition_minutes).clamp(self.state.transition_progress, 1.0)
        };
    }

    /// Emotion deltas the active weather applies to one agent at `hour`.
    ///
    /// Positive valence feeds joy, negative feeds sadness; arousal moves
    /// anticipation either way.
    #[must_use]
    pub fn effect_deltas(&self, hour: u32, chronotype: Chronotype) -> Vec<(Emotion, f32)> {
        let weather = self.state.current_weather;
        let Some(effect) = self.tables.effect(weather) else {
            return Vec::new();
        };
        let divisor = if self.config.effect_scale_divisor > 0.0 {
            self.config.effect_scale_divisor
        } else {
            50.0
        };
        let scale = self.state.weather_intensity / divisor
            * time_of_day_factor(weather, hour)
            * chronotype.alignment(hour);

        let mut deltas = Vec::with_capacity(3);
        if effect.valence > 0.0 {
            deltas.push((Emotion::Joy, effect.valence * scale));
        } else if effect.valence < 0.0 {
            deltas.push((Emotion::Sadness, -effect.valence * scale));
        }
        if effect.arousal != 0.0 {
            deltas.push((Emotion::Anticipation, effect.arousal * scale));
        }
        if effect.emotion_delta != 0.0 {
            deltas.push((effect.emotion, effect.emotion_delta * scale));
        }
        deltas
    }

    /// Share of one effect row owed for the time since the previous pass, in [0, 1].
    ///
    /// Records `now` as the new reference point.
    fn take_effect_share(&mut self, now: DateTime<Utc>) -> f32 {
        let Some(last) = self.last_effects_at.replace(now) else {
            return 0.0;
        };
        if self.config.effect_period_minutes <= 0.0 {
            return 1.0;
        }
        (minutes_between(last, now) as f32 / self.config.effect_period_minutes).clamp(0.0, 1.0)
    }

    /// Push the active weather into every agent. Returns the number of agents touched.
    ///
    /// Nothing is pushed when no in-world time passed since the previous call.
    pub fn apply_weather_effects(
        &mut self,
        store: &EmotionalStateStore,
        hour: u32,
        now: DateTime<Utc>,
    ) -> usize {
        let share = self.take_effect_share(now);
        if share <= 0.0 {
            return 0;
        }
        let mut touched = 0;
        for agent in store.agent_ids() {
            let Some(chronotype) = store.profile(agent).map(|p| p.chronotype) else {
                continue;
            };
            for (emotion, delta) in self.effect_deltas(hour, chronotype) {
                store.trigger_emotion(agent, emotion, delta * share, "weather", now);
            }
            touched += 1;
        }
        touched
    }
}

/// Apply the arousal and valence shading to an emotion-chosen weather.
#[must_use]
pub fn shade(
    weather: WeatherType,
    arousal: f32,
    valence: f32,
    config: &WeatherConfig,
) -> WeatherType {
    match weather {
        WeatherType::Rain if arousal > config.storm_arousal => WeatherType::Storm,
        WeatherType::Rain if arousal < config.drizzle_arousal => WeatherType::LightRain,
        WeatherType::Cloudy if valence > config.cloud_valence => WeatherType::PartlyCloudy,
        WeatherType::Cloudy if valence < -config.cloud_valence => WeatherType::Overcast,
        other => other,
    }
}

fn draw_window<R: Rng + ?Sized>(config: &WeatherConfig, rng: &mut R) -> Duration {
    let min = config.min_duration_minutes.min(config.max_duration_minutes);
    let max = config.max_duration_minutes.max(min);
    Duration::minutes(i64::from(rng.gen_range(min..=max)))
}
