//! Lazy exponential decay of emotional intensity.
//!
//! Emotions fade toward zero as:
//!   I(t) = I₀ · B^(t · (1 + R/100))
//!
//! Where:
//!   B = per-minute decay base (`emotion.decay_base`, default 0.98)
//!   t = wall-clock minutes since the state was last written
//!   R = the agent's emotional regulation (0–100); well-regulated agents settle faster
//!
//! Decay is never run on a schedule. It is a pure function of the stored
//! state and "now", applied whenever a profile is read or written, so two
//! decays of n and m minutes compose to one decay of n + m minutes.

use crate::types::{Emotion, EmotionVector, MAX_INTENSITY};

/// Multiplicative decay factor for `minutes` of elapsed time.
///
/// Returns 1.0 for zero (or negative) elapsed time.
#[must_use]
pub fn decay_factor(decay_base: f32, minutes: f64, regulation: f32) -> f64 {
    if minutes <= 0.0 {
        return 1.0;
    }
    let base = f64::from(decay_base.clamp(0.0, 1.0));
    let regulation = f64::from(regulation.clamp(0.0, MAX_INTENSITY));
    base.powf(minutes * (1.0 + regulation / 100.0))
}

/// Apply a decay factor to every channel.
#[must_use]
pub fn decay_emotions(emotions: &EmotionVector, factor: f64) -> EmotionVector {
    let mut out = *emotions;
    for emotion in Emotion::ALL {
        let decayed = f64::from(emotions.get(emotion)) * factor;
        out.set(emotion, decayed as f32);
    }
    out
}

/// Decay an emotion vector by `minutes` for an agent with the given regulation.
#[must_use]
pub fn decay_for(
    emotions: &EmotionVector,
    decay_base: f32,
    minutes: f64,
    regulation: f32,
) -> EmotionVector {
    decay_emotions(emotions, decay_factor(decay_base, minutes, regulation))
}
