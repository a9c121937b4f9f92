//! Resonance scoring for emotional memories.
//!
//! Score = Similarity × Intensity × Recency × Reinforcement
//!
//! Where:
//!   Similarity    = 1 − Σ|Δᵢ|·avgᵢ / (Σ avgᵢ · 100), clamped to [0, 1]
//!   Recency       = 1 + recency_bonus · max(0, 1 − age_days / window_days)
//!   Reinforcement = 1 + reinforcement_bonus · min(times_triggered, cap)

use chrono::{DateTime, Utc};

use crate::config::MemoryConfig;
use crate::memory::emotional::EmotionalMemory;
use crate::types::{Emotion, EmotionVector};

/// Similarity of two emotion vectors in [0, 1]. Identical vectors score 1.
///
/// Differences are weighted by how strongly each channel is felt on average,
/// so disagreement on faint channels matters little.
#[must_use]
pub fn state_similarity(a: &EmotionVector, b: &EmotionVector) -> f32 {
    let mut weighted_diff = 0.0_f32;
    let mut avg_sum = 0.0_f32;
    for emotion in Emotion::ALL {
        let (x, y) = (a.get(emotion), b.get(emotion));
        let avg = (x + y) / 2.0;
        weighted_diff += (x - y).abs() * avg;
        avg_sum += avg;
    }
    if avg_sum <= f32::EPSILON {
        return 1.0;
    }
    (1.0 - weighted_diff / (avg_sum * 100.0)).clamp(0.0, 1.0)
}

/// Recency multiplier: falls linearly from `1 + bonus` to 1 over the window.
#[must_use]
pub fn recency_factor(age_days: f32, config: &MemoryConfig) -> f32 {
    if config.recency_window_days <= 0.0 {
        return 1.0;
    }
    1.0 + config.recency_bonus * (1.0 - age_days / config.recency_window_days).max(0.0)
}

/// Reinforcement multiplier, capped at `reinforcement_cap` prior triggers.
#[must_use]
pub fn reinforcement_factor(times_triggered: u32, config: &MemoryConfig) -> f32 {
    1.0 + config.reinforcement_bonus * times_triggered.min(config.reinforcement_cap) as f32
}

/// Full resonance score of `memory` against the current emotions.
#[must_use]
pub fn resonance_score(
    memory: &EmotionalMemory,
    current: &EmotionVector,
    config: &MemoryConfig,
    now: DateTime<Utc>,
) -> f32 {
    state_similarity(current, &memory.reconstructed_state())
        * memory.intensity
        * recency_factor(memory.age_days(now), config)
        * reinforcement_factor(memory.times_triggered, config)
}
