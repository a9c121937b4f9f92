//! Emotional state, per-agent profile, derived metrics and mood classification.
//!
//! A state holds the eight Plutchik intensities plus the metrics derived from
//! them (valence, arousal, dominance, mood). Derived metrics are always
//! recomputed from the intensities, never edited directly.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EmotionConfig;
use crate::decay;
use crate::tables::AffectTables;
use crate::types::{
    AgentId, Chronotype, Emotion, EmotionVector, Mood, Personality, PersonalityPreset, WorldId,
    clamp_intensity, minutes_between,
};

/// Snapshot of an agent's affect at `last_updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalState {
    /// The eight intensities, 0–100.
    pub emotions: EmotionVector,
    /// Overall positivity, -100–100.
    pub valence: f32,
    /// Overall energy, 0–100.
    pub arousal: f32,
    /// Sense of control, 0–100.
    pub dominance: f32,
    /// Categorical mood.
    pub mood: Mood,
    /// Strength of the mood, 0–100.
    pub mood_intensity: f32,
    /// When the intensities were last decayed or written.
    pub last_updated: DateTime<Utc>,
}

/// Everything the engine knows about one agent's emotional life.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEmotionalProfile {
    /// World the agent lives in.
    pub world_id: WorldId,
    /// The agent.
    pub agent_id: AgentId,
    /// OCEAN traits.
    pub personality: Personality,
    /// Circadian preference.
    pub chronotype: Chronotype,
    /// Current state as of its `last_updated`.
    pub emotional_state: EmotionalState,
    /// Long-term rest state.
    pub emotional_baseline: EmotionalState,
    /// How fast emotions fade (0–100).
    pub emotional_regulation: f32,
    /// Susceptibility to contagion (0–100).
    pub empathy: f32,
    /// Bumped on every write.
    pub version: u64,
}

/// The affect model: lookup tables plus emotion tuning.
///
/// Shared by every component that needs to derive metrics from intensities.
#[derive(Debug, Clone)]
pub struct AffectModel {
    tables: Arc<AffectTables>,
    config: EmotionConfig,
}

impl AffectModel {
    /// Create a model from shared tables and emotion settings.
    #[must_use]
    pub fn new(tables: Arc<AffectTables>, config: EmotionConfig) -> Self {
        Self { tables, config }
    }

    /// The lookup tables.
    #[must_use]
    pub fn tables(&self) -> &AffectTables {
        &self.tables
    }

    /// Emotion settings.
    #[must_use]
    pub fn config(&self) -> &EmotionConfig {
        &self.config
    }

    /// Build a full state (metrics and mood included) from raw intensities.
    #[must_use]
    pub fn derive_state(&self, emotions: EmotionVector, at: DateTime<Utc>) -> EmotionalState {
        let mut state = EmotionalState {
            emotions,
            valence: 0.0,
            arousal: 0.0,
            dominance: 0.0,
            mood: Mood::Neutral,
            mood_intensity: 0.0,
            last_updated: at,
        };
        self.refresh(&mut state);
        state
    }

    /// Recompute valence, arousal, dominance and mood from the intensities.
    pub fn refresh(&self, state: &mut EmotionalState) {
        state.valence = compute_valence(&state.emotions, &self.tables);
        state.arousal = compute_arousal(&state.emotions, &self.tables);
        state.dominance = compute_dominance(&state.emotions);
        let (mood, intensity) = classify_mood(
            &state.emotions,
            state.valence,
            state.arousal,
            &self.tables,
            self.config.unconstrained_mood_score,
        );
        state.mood = mood;
        state.mood_intensity = intensity;
    }

    /// Decayed view of a profile's state at `now`, without touching the profile.
    #[must_use]
    pub fn project(&self, profile: &AgentEmotionalProfile, now: DateTime<Utc>) -> EmotionalState {
        let minutes = minutes_between(profile.emotional_state.last_updated, now);
        if minutes <= 0.0 {
            return profile.emotional_state.clone();
        }
        let emotions = decay::decay_for(
            &profile.emotional_state.emotions,
            self.config.decay_base,
            minutes,
            profile.emotional_regulation,
        );
        self.derive_state(emotions, now)
    }

    /// Write the decayed state back into the profile and stamp it with `now`.
    pub fn settle(&self, profile: &mut AgentEmotionalProfile, now: DateTime<Utc>) {
        let projected = self.project(profile, now);
        profile.emotional_state = projected;
        if profile.emotional_state.last_updated < now {
            profile.emotional_state.last_updated = now;
        }
    }

    /// Create a fresh profile from a personality preset.
    #[must_use]
    pub fn spawn_profile(
        &self,
        world_id: WorldId,
        agent_id: AgentId,
        preset: PersonalityPreset,
        chronotype: Chronotype,
        now: DateTime<Utc>,
    ) -> AgentEmotionalProfile {
        let personality = preset.personality();
        let baseline = self.derive_state(preset.baseline(), now);
        AgentEmotionalProfile {
            world_id,
            agent_id,
            personality,
            chronotype,
            emotional_state: baseline.clone(),
            emotional_baseline: baseline,
            emotional_regulation: personality.emotional_regulation(),
            empathy: personality.empathy(),
            version: 0,
        }
    }
}

/// Intensity-weighted valence in [-100, 100]. Zero for an empty vector.
#[must_use]
pub fn compute_valence(emotions: &EmotionVector, tables: &AffectTables) -> f32 {
    weighted(emotions, |e| tables.coefficients_for(e).valence).clamp(-100.0, 100.0)
}

/// Intensity-weighted arousal in [0, 100]. Zero for an empty vector.
#[must_use]
pub fn compute_arousal(emotions: &EmotionVector, tables: &AffectTables) -> f32 {
    clamp_intensity(weighted(emotions, |e| tables.coefficients_for(e).arousal))
}

/// Dominance: `100 − avg(fear, sadness)`.
#[must_use]
pub fn compute_dominance(emotions: &EmotionVector) -> f32 {
    clamp_intensity(100.0 - (emotions.fear + emotions.sadness) / 2.0)
}

fn weighted(emotions: &EmotionVector, coefficient: impl Fn(Emotion) -> f32) -> f32 {
    let total = emotions.total();
    if total <= f32::EPSILON {
        return 0.0;
    }
    let sum: f32 = emotions.iter().map(|(e, v)| coefficient(e) * v).sum();
    sum / total * 100.0
}

/// Pick the mood whose prototype scores highest.
///
/// A prototype is eligible when valence and arousal sit inside its windows and
/// every required emotion reaches its minimum. Its score is the mean of the
/// required intensities (or `unconstrained_score` when it requires none).
/// Ties keep the earlier prototype. Returns `(Neutral, 0)` when nothing fits.
#[must_use]
pub fn classify_mood(
    emotions: &EmotionVector,
    valence: f32,
    arousal: f32,
    tables: &AffectTables,
    unconstrained_score: f32,
) -> (Mood, f32) {
    let mut best: Option<(Mood, f32)> = None;
    for proto in &tables.mood_prototypes {
        if !proto.valence.contains(valence) || !proto.arousal.contains(arousal) {
            continue;
        }
        if proto.requires.iter().any(|r| emotions.get(r.emotion) < r.min) {
            continue;
        }
        let score = if proto.requires.is_empty() {
            unconstrained_score
        } else {
            proto.requires.iter().map(|r| emotions.get(r.emotion)).sum::<f32>()
                / proto.requires.len() as f32
        };
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((proto.mood, score));
        }
    }
    best.map_or((Mood::Neutral, 0.0), |(mood, score)| (mood, clamp_intensity(score)))
}

/// Personality multiplier applied to an incoming emotion, in [0.5, 1.5].
///
/// Starts at 1.0 (an all-50 personality is neutral):
/// - neuroticism amplifies fear, sadness and anger, and dampens joy and trust
/// - agreeableness amplifies trust, and dampens anger and disgust
/// - extraversion amplifies the high-arousal emotions
/// - openness amplifies surprise and anticipation
/// - conscientiousness slightly dampens anger and disgust
#[must_use]
pub fn personality_modifier(emotion: Emotion, traits: &Personality) -> f32 {
    let centred = |trait_value: f32| (trait_value - 50.0) / 50.0;
    let n = centred(traits.neuroticism);
    let a = centred(traits.agreeableness);
    let e = centred(traits.extraversion);
    let o = centred(traits.openness);
    let c = centred(traits.conscientiousness);

    let mut modifier = 1.0_f32;
    match emotion {
        Emotion::Fear | Emotion::Sadness | Emotion::Anger => modifier *= 1.0 + 0.3 * n,
        Emotion::Joy | Emotion::Trust => modifier *= 1.0 - 0.2 * n,
        Emotion::Disgust | Emotion::Surprise | Emotion::Anticipation => {}
    }
    match emotion {
        Emotion::Trust => modifier *= 1.0 + 0.3 * a,
        Emotion::Anger | Emotion::Disgust => modifier *= (1.0 - 0.3 * a) * (1.0 - 0.1 * c),
        _ => {}
    }
    if matches!(
        emotion,
        Emotion::Joy | Emotion::Fear | Emotion::Anger | Emotion::Surprise | Emotion::Anticipation
    ) {
        modifier *= 1.0 + 0.2 * e;
    }
    if matches!(emotion, Emotion::Surprise | Emotion::Anticipation) {
        modifier *= 1.0 + 0.2 * o;
    }
    modifier.clamp(0.5, 1.5)
}
