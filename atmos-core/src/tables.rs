//! Versioned lookup tables for the affect model.
//!
//! Every fixed table the engine consults lives here as plain data: per-emotion
//! valence/arousal coefficients, the ordered mood prototypes, the
//! emotion→weather mapping, the natural weather transition table and the
//! per-weather emotional effects. Tables are loaded once (built-in defaults or
//! the `[tables]` section of `atmos.toml`) and shared read-only via `Arc`.
//!
//! Entries are lists rather than maps so the TOML stays readable:
//!
//! ```toml
//! [[tables.emotion_weather]]
//! emotion = "sadness"
//! weather = "rain"
//! min_intensity = 55.0
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{AtmosError, Result};
use crate::types::{Emotion, Mood};
use crate::weather::WeatherType;

/// Current schema version of the built-in tables.
pub const TABLES_VERSION: u32 = 1;

/// The full set of lookup tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffectTables {
    /// Schema version, bumped whenever table semantics change.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Valence and arousal coefficient per emotion.
    #[serde(default = "default_coefficients")]
    pub coefficients: Vec<EmotionCoefficients>,
    /// Mood prototypes, scored in declaration order.
    #[serde(default = "default_mood_prototypes")]
    pub mood_prototypes: Vec<MoodPrototype>,
    /// Emotion-driven weather outcomes.
    #[serde(default = "default_emotion_weather")]
    pub emotion_weather: Vec<EmotionWeatherRule>,
    /// Natural (Markov-style) weather transitions.
    #[serde(default = "default_transitions")]
    pub transitions: Vec<WeatherTransitionRow>,
    /// What each weather does to the agents under it.
    #[serde(default = "default_weather_effects")]
    pub weather_effects: Vec<WeatherEffect>,
}

/// How one emotion contributes to derived valence and arousal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionCoefficients {
    /// The emotion.
    pub emotion: Emotion,
    /// Valence weight in [-1, 1].
    pub valence: f32,
    /// Arousal weight in [0, 1].
    pub arousal: f32,
}

/// Inclusive numeric window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

impl Window {
    /// Create a window.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies inside the window.
    #[must_use]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Minimum intensity of one emotion required by a mood prototype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionThreshold {
    /// Required emotion.
    pub emotion: Emotion,
    /// Minimum intensity.
    pub min: f32,
}

/// One entry of the ordered mood classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodPrototype {
    /// Mood produced when this prototype wins.
    pub mood: Mood,
    /// Emotions that must reach their minimum.
    #[serde(default)]
    pub requires: Vec<EmotionThreshold>,
    /// Allowed valence window.
    pub valence: Window,
    /// Allowed arousal window.
    pub arousal: Window,
}

/// Emotion → weather mapping entry for emotion-driven transitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionWeatherRule {
    /// Dominant atmosphere emotion.
    pub emotion: Emotion,
    /// Weather it conjures.
    pub weather: WeatherType,
    /// Atmosphere intensity needed before the emotion may drive the weather.
    pub min_intensity: f32,
}

/// A candidate next weather with its relative weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedWeather {
    /// Candidate weather.
    pub weather: WeatherType,
    /// Relative weight (> 0).
    pub weight: f32,
}

/// Natural transitions out of one weather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherTransitionRow {
    /// Current weather.
    pub from: WeatherType,
    /// Weighted successors.
    pub to: Vec<WeightedWeather>,
}

/// Per-tick emotional push of a weather at intensity 50.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherEffect {
    /// The weather.
    pub weather: WeatherType,
    /// Signed valence push (joy when positive, sadness when negative).
    pub valence: f32,
    /// Signed arousal push (applied to anticipation).
    pub arousal: f32,
    /// Emotion receiving the direct push.
    pub emotion: Emotion,
    /// Size of the direct push.
    pub emotion_delta: f32,
}

impl AffectTables {
    /// Coefficients for one emotion, zero when the table lacks an entry.
    #[must_use]
    pub fn coefficients_for(&self, emotion: Emotion) -> EmotionCoefficients {
        self.coefficients
            .iter()
            .find(|c| c.emotion == emotion)
            .copied()
            .unwrap_or(EmotionCoefficients {
                emotion,
                valence: 0.0,
                arousal: 0.0,
            })
    }

    /// Emotion-driven weather rule for `emotion`, if any.
    #[must_use]
    pub fn weather_rule(&self, emotion: Emotion) -> Option<&EmotionWeatherRule> {
        self.emotion_weather.iter().find(|r| r.emotion == emotion)
    }

    /// Weighted natural successors of `weather` (empty if unlisted).
    #[must_use]
    pub fn transitions_from(&self, weather: WeatherType) -> &[WeightedWeather] {
        self.transitions
            .iter()
            .find(|row| row.from == weather)
            .map_or(&[], |row| row.to.as_slice())
    }

    /// Emotional effect of `weather`, if any.
    #[must_use]
    pub fn effect(&self, weather: WeatherType) -> Option<&WeatherEffect> {
        self.weather_effects.iter().find(|e| e.weather == weather)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    /// Returns [`AtmosError::Config`] when an emotion has no coefficients, a
    /// window is inverted, or a transition row has no positive weight.
    pub fn validate(&self) -> Result<()> {
        for emotion in Emotion::ALL {
            if !self.coefficients.iter().any(|c| c.emotion == emotion) {
                return Err(AtmosError::Config(format!(
                    "tables v{}: missing coefficients for {emotion}",
                    self.version
                )));
            }
        }
        for proto in &self.mood_prototypes {
            if proto.valence.min > proto.valence.max || proto.arousal.min > proto.arousal.max {
                return Err(AtmosError::Config(format!(
                    "tables v{}: inverted window in mood prototype {}",
                    self.version, proto.mood
                )));
            }
        }
        for row in &self.transitions {
            if !row.to.iter().any(|w| w.weight > 0.0) || row.to.iter().any(|w| w.weight < 0.0) {
                return Err(AtmosError::Config(format!(
                    "tables v{}: transition row for {} needs non-negative weights \
                     with a positive sum",
                    self.version, row.from
                )));
            }
        }
        Ok(())
    }
}

impl Default for AffectTables {
    fn default() -> Self {
        Self {
            version: TABLES_VERSION,
            coefficients: default_coefficients(),
            mood_prototypes: default_mood_prototypes(),
            emotion_weather: default_emotion_weather(),
            transitions: default_transitions(),
            weather_effects: default_weather_effects(),
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

fn default_version() -> u32 {
    TABLES_VERSION
}

fn default_coefficients() -> Vec<EmotionCoefficients> {
    let c = |emotion, valence, arousal| EmotionCoefficients { emotion, valence, arousal };
    vec![
        c(Emotion::Joy, 1.0, 0.7),
        c(Emotion::Sadness, -0.8, 0.2),
        c(Emotion::Trust, 0.6, 0.3),
        c(Emotion::Disgust, -0.7, 0.5),
        c(Emotion::Fear, -0.7, 0.9),
        c(Emotion::Anger, -0.6, 0.9),
        c(Emotion::Surprise, 0.1, 1.0),
        c(Emotion::Anticipation, 0.3, 0.6),
    ]
}

fn default_mood_prototypes() -> Vec<MoodPrototype> {
    let req = |emotion, min| EmotionThreshold { emotion, min };
    let proto = |mood, requires, valence, arousal| MoodPrototype {
        mood,
        requires,
        valence,
        arousal,
    };
    vec![
        proto(
            Mood::Ecstatic,
            vec![req(Emotion::Joy, 65.0), req(Emotion::Anticipation, 30.0)],
            Window::new(50.0, 100.0),
            Window::new(55.0, 100.0),
        ),
        proto(
            Mood::Joyful,
            vec![req(Emotion::Joy, 45.0)],
            Window::new(25.0, 100.0),
            Window::new(0.0, 100.0),
        ),
        proto(
            Mood::Excited,
            vec![req(Emotion::Anticipation, 45.0)],
            Window::new(0.0, 100.0),
            Window::new(55.0, 100.0),
        ),
        proto(
            Mood::Hopeful,
            vec![req(Emotion::Anticipation, 30.0), req(Emotion::Trust, 25.0)],
            Window::new(10.0, 100.0),
            Window::new(0.0, 100.0),
        ),
        proto(
            Mood::Content,
            vec![req(Emotion::Joy, 20.0), req(Emotion::Trust, 20.0)],
            Window::new(10.0, 100.0),
            Window::new(0.0, 60.0),
        ),
        proto(
            Mood::Anxious,
            vec![req(Emotion::Fear, 35.0)],
            Window::new(-100.0, 10.0),
            Window::new(45.0, 100.0),
        ),
        proto(
            Mood::Angry,
            vec![req(Emotion::Anger, 40.0)],
            Window::new(-100.0, 10.0),
            Window::new(45.0, 100.0),
        ),
        proto(
            Mood::Melancholy,
            vec![req(Emotion::Sadness, 35.0)],
            Window::new(-100.0, 0.0),
            Window::new(0.0, 65.0),
        ),
        proto(
            Mood::Disgusted,
            vec![req(Emotion::Disgust, 40.0)],
            Window::new(-100.0, 10.0),
            Window::new(0.0, 100.0),
        ),
        proto(
            Mood::Surprised,
            vec![req(Emotion::Surprise, 45.0)],
            Window::new(-100.0, 100.0),
            Window::new(50.0, 100.0),
        ),
        proto(Mood::Serene, vec![], Window::new(0.0, 60.0), Window::new(0.0, 40.0)),
    ]
}

fn default_emotion_weather() -> Vec<EmotionWeatherRule> {
    let rule = |emotion, weather, min_intensity| EmotionWeatherRule {
        emotion,
        weather,
        min_intensity,
    };
    vec![
        rule(Emotion::Joy, WeatherType::Sunny, 50.0),
        rule(Emotion::Sadness, WeatherType::Rain, 55.0),
        rule(Emotion::Trust, WeatherType::PartlyCloudy, 45.0),
        rule(Emotion::Disgust, WeatherType::Overcast, 50.0),
        rule(Emotion::Fear, WeatherType::Fog, 50.0),
        rule(Emotion::Anger, WeatherType::Storm, 60.0),
        rule(Emotion::Surprise, WeatherType::Cloudy, 55.0),
        rule(Emotion::Anticipation, WeatherType::Windy, 50.0),
    ]
}

fn default_transitions() -> Vec<WeatherTransitionRow> {
    use WeatherType::{
        Cloudy, Fog, LightRain, Overcast, PartlyCloudy, Rain, Snow, Storm, Sunny, Windy,
    };
    let row = |from, to: &[(WeatherType, f32)]| WeatherTransitionRow {
        from,
        to: to
            .iter()
            .map(|&(weather, weight)| WeightedWeather { weather, weight })
            .collect(),
    };
    vec![
        row(Sunny, &[(Sunny, 3.0), (PartlyCloudy, 4.0), (Windy, 2.0), (Cloudy, 1.0)]),
        row(PartlyCloudy, &[(Sunny, 3.0), (PartlyCloudy, 2.0), (Cloudy, 3.0), (Windy, 2.0)]),
        row(
            Cloudy,
            &[(PartlyCloudy, 3.0), (Overcast, 3.0), (LightRain, 2.0), (Cloudy, 1.0), (Fog, 1.0)],
        ),
        row(Overcast, &[(Cloudy, 3.0), (LightRain, 3.0), (Rain, 2.0), (Snow, 1.0), (Fog, 1.0)]),
        row(LightRain, &[(Rain, 3.0), (Cloudy, 3.0), (Overcast, 2.0), (PartlyCloudy, 2.0)]),
        row(Rain, &[(LightRain, 3.0), (Storm, 2.0), (Overcast, 3.0), (Rain, 2.0)]),
        row(Storm, &[(Rain, 5.0), (Overcast, 3.0), (Windy, 2.0)]),
        row(Fog, &[(Cloudy, 4.0), (PartlyCloudy, 3.0), (Overcast, 3.0)]),
        row(Snow, &[(Overcast, 4.0), (Cloudy, 3.0), (Snow, 3.0)]),
        row(Windy, &[(PartlyCloudy, 4.0), (Sunny, 3.0), (Cloudy, 3.0)]),
    ]
}

fn default_weather_effects() -> Vec<WeatherEffect> {
    let fx = |weather, valence, arousal, emotion, emotion_delta| WeatherEffect {
        weather,
        valence,
        arousal,
        emotion,
        emotion_delta,
    };
    vec![
        fx(WeatherType::Sunny, 3.0, 1.0, Emotion::Joy, 2.0),
        fx(WeatherType::PartlyCloudy, 1.0, 0.0, Emotion::Trust, 1.0),
        fx(WeatherType::Cloudy, -0.5, -1.0, Emotion::Sadness, 0.5),
        fx(WeatherType::Overcast, -2.0, -1.0, Emotion::Sadness, 1.0),
        fx(WeatherType::LightRain, -1.0, -1.0, Emotion::Sadness, 1.0),
        fx(WeatherType::Rain, -2.0, 0.0, Emotion::Sadness, 2.0),
        fx(WeatherType::Storm, -3.0, 3.0, Emotion::Fear, 3.0),
        fx(WeatherType::Fog, -1.0, 0.0, Emotion::Fear, 1.5),
        fx(WeatherType::Snow, 1.0, -1.0, Emotion::Surprise, 1.5),
        fx(WeatherType::Windy, 0.0, 2.0, Emotion::Anticipation, 1.5),
    ]
}
