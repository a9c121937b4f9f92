//! Emotional contagion between two agents.
//!
//! Strength = base_rate · (avg empathy / 100) · (1 + bond / 100) · proximity,
//! clamped to [0, 1]. The target's channels then move toward the source's by
//! that fraction of the gap.

use serde::{Deserialize, Serialize};

use crate::types::{Emotion, EmotionVector, MAX_INTENSITY};

/// Result of one contagion application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContagionTransfer {
    /// Channel with the largest absolute change (ties by enumeration order).
    pub emotion: Emotion,
    /// Signed change on that channel.
    pub delta: f32,
    /// Strength that was applied.
    pub strength: f32,
}

/// Contagion strength between two agents, in [0, 1].
///
/// Symmetric in the two empathy arguments. `bond_strength` is 0–100;
/// `proximity` is a non-negative multiplier (1.0 = face to face).
#[must_use]
pub fn calculate_contagion_strength(
    base_rate: f32,
    empathy_a: f32,
    empathy_b: f32,
    bond_strength: f32,
    proximity: f32,
) -> f32 {
    let avg_empathy =
        (empathy_a.clamp(0.0, MAX_INTENSITY) + empathy_b.clamp(0.0, MAX_INTENSITY)) / 2.0;
    let bond = bond_strength.clamp(0.0, MAX_INTENSITY);
    let strength =
        base_rate.max(0.0) * (avg_empathy / 100.0) * (1.0 + bond / 100.0) * proximity.max(0.0);
    if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) }
}

/// Blend `target` toward `source` by `strength` and report the largest move.
pub fn apply_contagion(
    target: &mut EmotionVector,
    source: &EmotionVector,
    strength: f32,
) -> ContagionTransfer {
    let strength = if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) };
    let mut transfer = ContagionTransfer {
        emotion: Emotion::Joy,
        delta: 0.0,
        strength,
    };
    for emotion in Emotion::ALL {
        let gap = source.get(emotion) - target.get(emotion);
        let applied = target.add(emotion, gap * strength);
        if applied.abs() > transfer.delta.abs() {
            transfer.emotion = emotion;
            transfer.delta = applied;
        }
    }
    transfer
}
