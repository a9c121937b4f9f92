//! Core type definitions for the ATMOS affect engine.
//!
//! Emotion, mood and personality names are closed enums shared by every
//! component, so a typo is a compile error rather than a silent miss.

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an agent (NPC, player, creature) in a world.
    AgentId
);
uuid_id!(
    /// Unique identifier for a simulated world. Persisted records are keyed by it.
    WorldId
);
uuid_id!(
    /// Unique identifier for a resonance chamber.
    ChamberId
);
uuid_id!(
    /// Unique identifier for an emotion-tagged memory or the record it tags.
    MemoryId
);

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Whole and fractional minutes from `earlier` to `later`.
///
/// Never negative: a clock that moves backwards yields zero elapsed time.
#[must_use]
pub fn minutes_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let millis = (later - earlier).num_milliseconds();
    if millis <= 0 {
        0.0
    } else {
        millis as f64 / 60_000.0
    }
}

/// World clock consumed from the host game.
///
/// The core never reads the system clock on its own; everything that needs
/// "now" takes it from the caller or from an implementation of this trait.
pub trait WorldClock: Send + Sync {
    /// Current wall-clock instant.
    fn now(&self) -> DateTime<Utc>;
    /// In-world hour of day, 0–23.
    fn hour_of_day(&self) -> u32;
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A 2D position on the world plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Emotions: Plutchik's eight primaries
// ---------------------------------------------------------------------------

/// One of the eight primary affect channels.
///
/// Declaration order is the fixed enumeration order used for every
/// tie-break in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    /// Happiness, pleasure.
    Joy,
    /// Loss, grief.
    Sadness,
    /// Acceptance, safety with others.
    Trust,
    /// Rejection, revulsion.
    Disgust,
    /// Threat, dread.
    Fear,
    /// Frustration, hostility.
    Anger,
    /// The unexpected.
    Surprise,
    /// Expectation, eagerness.
    Anticipation,
}

impl Emotion {
    /// All emotions in enumeration order.
    pub const ALL: [Self; 8] = [
        Self::Joy,
        Self::Sadness,
        Self::Trust,
        Self::Disgust,
        Self::Fear,
        Self::Anger,
        Self::Surprise,
        Self::Anticipation,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Joy => "joy",
            Self::Sadness => "sadness",
            Self::Trust => "trust",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Anger => "anger",
            Self::Surprise => "surprise",
            Self::Anticipation => "anticipation",
        }
    }

    /// Whether this emotion reads as unpleasant.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::Sadness | Self::Disgust | Self::Fear | Self::Anger)
    }

    /// The emotion a transformer chamber turns this one into.
    ///
    /// Positive emotions map to themselves.
    #[must_use]
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Sadness => Self::Joy,
            Self::Fear | Self::Disgust => Self::Trust,
            Self::Anger => Self::Anticipation,
            other => other,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intensities for all eight emotions, each kept in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmotionVector {
    /// Joy intensity.
    pub joy: f32,
    /// Sadness intensity.
    pub sadness: f32,
    /// Trust intensity.
    pub trust: f32,
    /// Disgust intensity.
    pub disgust: f32,
    /// Fear intensity.
    pub fear: f32,
    /// Anger intensity.
    pub anger: f32,
    /// Surprise intensity.
    pub surprise: f32,
    /// Anticipation intensity.
    pub anticipation: f32,
}

/// Upper bound of every intensity-like field.
pub const MAX_INTENSITY: f32 = 100.0;

impl EmotionVector {
    /// All channels at zero.
    pub const ZERO: Self = Self {
        joy: 0.0,
        sadness: 0.0,
        trust: 0.0,
        disgust: 0.0,
        fear: 0.0,
        anger: 0.0,
        surprise: 0.0,
        anticipation: 0.0,
    };

    /// A vector with a single non-zero channel.
    #[must_use]
    pub fn single(emotion: Emotion, intensity: f32) -> Self {
        let mut v = Self::ZERO;
        v.set(emotion, intensity);
        v
    }

    /// Intensity of one channel.
    #[must_use]
    pub const fn get(&self, emotion: Emotion) -> f32 {
        match emotion {
            Emotion::Joy => self.joy,
            Emotion::Sadness => self.sadness,
            Emotion::Trust => self.trust,
            Emotion::Disgust => self.disgust,
            Emotion::Fear => self.fear,
            Emotion::Anger => self.anger,
            Emotion::Surprise => self.surprise,
            Emotion::Anticipation => self.anticipation,
        }
    }

    fn slot(&mut self, emotion: Emotion) -> &mut f32 {
        match emotion {
            Emotion::Joy => &mut self.joy,
            Emotion::Sadness => &mut self.sadness,
            Emotion::Trust => &mut self.trust,
            Emotion::Disgust => &mut self.disgust,
            Emotion::Fear => &mut self.fear,
            Emotion::Anger => &mut self.anger,
            Emotion::Surprise => &mut self.surprise,
            Emotion::Anticipation => &mut self.anticipation,
        }
    }

    /// Set one channel, clamped to [0, 100]. NaN becomes 0.
    pub fn set(&mut self, emotion: Emotion, value: f32) {
        *self.slot(emotion) = clamp_intensity(value);
    }

    /// Add a signed delta to one channel, clamped. Returns the applied change.
    pub fn add(&mut self, emotion: Emotion, delta: f32) -> f32 {
        let before = self.get(emotion);
        self.set(emotion, before + delta);
        self.get(emotion) - before
    }

    /// `(emotion, intensity)` pairs in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        Emotion::ALL.iter().map(move |&e| (e, self.get(e)))
    }

    /// Sum of all intensities.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.iter().map(|(_, v)| v).sum()
    }

    /// The strongest channel. Ties go to the earlier emotion in enumeration order.
    #[must_use]
    pub fn dominant(&self) -> (Emotion, f32) {
        let mut best = (Emotion::Joy, self.joy);
        for (emotion, value) in self.iter().skip(1) {
            if value > best.1 {
                best = (emotion, value);
            }
        }
        best
    }

    /// Multiply every channel by `factor` and re-clamp.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        let mut out = *self;
        for emotion in Emotion::ALL {
            out.set(emotion, self.get(emotion) * factor);
        }
        out
    }

    /// Largest absolute per-channel difference to `other`.
    #[must_use]
    pub fn max_abs_diff(&self, other: &Self) -> f32 {
        Emotion::ALL
            .iter()
            .map(|&e| (self.get(e) - other.get(e)).abs())
            .fold(0.0, f32::max)
    }
}

/// Clamp any intensity-like value to [0, 100], mapping NaN to 0.
#[must_use]
pub fn clamp_intensity(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_INTENSITY)
    }
}

// ---------------------------------------------------------------------------
// Mood
// ---------------------------------------------------------------------------

/// Categorical mood derived from the emotion vector by prototype scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    /// Very high joy and energy.
    Ecstatic,
    /// Clearly happy.
    Joyful,
    /// Quietly satisfied and trusting.
    Content,
    /// Eager, energised expectation.
    Excited,
    /// Positive expectation with trust.
    Hopeful,
    /// Low-energy, mildly positive calm.
    Serene,
    /// Fearful and tense.
    Anxious,
    /// Hostile and agitated.
    Angry,
    /// Sad and withdrawn.
    Melancholy,
    /// Repulsed.
    Disgusted,
    /// Startled.
    Surprised,
    /// No prototype fits.
    #[default]
    Neutral,
}

impl Mood {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ecstatic => "ecstatic",
            Self::Joyful => "joyful",
            Self::Content => "content",
            Self::Excited => "excited",
            Self::Hopeful => "hopeful",
            Self::Serene => "serene",
            Self::Anxious => "anxious",
            Self::Angry => "angry",
            Self::Melancholy => "melancholy",
            Self::Disgusted => "disgusted",
            Self::Surprised => "surprised",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Personality Traits
// ---------------------------------------------------------------------------

/// Big Five (OCEAN) personality traits, each 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Curiosity and openness to experience.
    pub openness: f32,
    /// Discipline and self-control.
    pub conscientiousness: f32,
    /// Outgoing energy.
    pub extraversion: f32,
    /// Warmth and cooperativeness.
    pub agreeableness: f32,
    /// Emotional reactivity.
    pub neuroticism: f32,
}

impl Personality {
    /// Create traits, clamping each to [0, 100].
    #[must_use]
    pub fn new(
        openness: f32,
        conscientiousness: f32,
        extraversion: f32,
        agreeableness: f32,
        neuroticism: f32,
    ) -> Self {
        Self {
            openness: clamp_intensity(openness),
            conscientiousness: clamp_intensity(conscientiousness),
            extraversion: clamp_intensity(extraversion),
            agreeableness: clamp_intensity(agreeableness),
            neuroticism: clamp_intensity(neuroticism),
        }
    }

    /// How fast emotions fade back (0–100). Disciplined, calm agents regulate faster.
    #[must_use]
    pub fn emotional_regulation(&self) -> f32 {
        clamp_intensity(self.conscientiousness * 0.6 + (MAX_INTENSITY - self.neuroticism) * 0.4)
    }

    /// Susceptibility to contagion (0–100).
    #[must_use]
    pub fn empathy(&self) -> f32 {
        clamp_intensity(self.agreeableness * 0.7 + self.openness * 0.3)
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self::new(50.0, 50.0, 50.0, 50.0, 50.0)
    }
}

/// Spawn-time personality archetype. Each preset yields traits and a baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityPreset {
    /// Average on every trait.
    #[default]
    Balanced,
    /// Outgoing and upbeat.
    Cheerful,
    /// Introverted and prone to sadness.
    Melancholic,
    /// High neuroticism, easily frightened.
    Anxious,
    /// Disciplined and unflappable.
    Stoic,
    /// Quick to anger.
    Hotheaded,
    /// Warm and highly attuned to others.
    Empathic,
}

impl PersonalityPreset {
    /// OCEAN traits for this preset.
    #[must_use]
    pub fn personality(self) -> Personality {
        match self {
            Self::Balanced => Personality::default(),
            Self::Cheerful => Personality::new(65.0, 50.0, 80.0, 70.0, 25.0),
            Self::Melancholic => Personality::new(60.0, 45.0, 25.0, 55.0, 75.0),
            Self::Anxious => Personality::new(45.0, 55.0, 35.0, 50.0, 85.0),
            Self::Stoic => Personality::new(40.0, 85.0, 40.0, 45.0, 15.0),
            Self::Hotheaded => Personality::new(50.0, 30.0, 70.0, 20.0, 70.0),
            Self::Empathic => Personality::new(75.0, 55.0, 55.0, 90.0, 50.0),
        }
    }

    /// Long-term resting emotion vector for this preset.
    #[must_use]
    pub fn baseline(self) -> EmotionVector {
        let v = |joy, sadness, trust, disgust, fear, anger, surprise, anticipation| EmotionVector {
            joy,
            sadness,
            trust,
            disgust,
            fear,
            anger,
            surprise,
            anticipation,
        };
        match self {
            Self::Balanced => v(25.0, 10.0, 25.0, 5.0, 10.0, 5.0, 10.0, 20.0),
            Self::Cheerful => v(45.0, 5.0, 35.0, 5.0, 5.0, 5.0, 15.0, 30.0),
            Self::Melancholic => v(10.0, 35.0, 20.0, 10.0, 15.0, 5.0, 5.0, 10.0),
            Self::Anxious => v(10.0, 15.0, 15.0, 5.0, 35.0, 5.0, 15.0, 20.0),
            Self::Stoic => v(20.0, 5.0, 30.0, 5.0, 5.0, 5.0, 5.0, 15.0),
            Self::Hotheaded => v(20.0, 5.0, 10.0, 15.0, 5.0, 30.0, 10.0, 20.0),
            Self::Empathic => v(30.0, 15.0, 40.0, 5.0, 10.0, 5.0, 10.0, 20.0),
        }
    }
}

/// Circadian energy preference, used to shade weather effects by hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chronotype {
    /// Most responsive in the morning.
    MorningLark,
    /// Most responsive at night.
    NightOwl,
    /// No preference.
    #[default]
    Neutral,
}

impl Chronotype {
    /// Multiplier applied to environmental effects at the given hour (0–23).
    #[must_use]
    pub const fn alignment(self, hour: u32) -> f32 {
        let morning = hour >= 5 && hour < 12;
        let night = hour >= 20 || hour < 5;
        match self {
            Self::MorningLark if morning => 1.2,
            Self::MorningLark if night => 0.8,
            Self::NightOwl if night => 1.2,
            Self::NightOwl if morning => 0.8,
            _ => 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Totally ordered score used when ranking memories and chambers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(pub OrderedFloat<f32>);

impl Score {
    /// Wrap a raw score.
    #[must_use]
    pub const fn new(score: f32) -> Self {
        Self(OrderedFloat(score))
    }

    /// Raw score value.
    #[must_use]
    pub const fn value(self) -> f32 {
        self.0.0
    }
}
