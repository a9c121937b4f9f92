//! Emotion tags attached to an agent's memories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AgentId, Emotion, EmotionVector, MAX_INTENSITY, MemoryId, clamp_intensity};

/// A memory tagged with the emotion it was formed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalMemory {
    /// Unique tag id.
    pub id: MemoryId,
    /// Agent who remembers.
    pub agent_id: AgentId,
    /// The external memory record this tag belongs to.
    pub record_id: MemoryId,
    /// Emotion felt when the memory formed.
    pub emotion_type: Emotion,
    /// Intensity at formation (0–100).
    pub intensity: f32,
    /// Valence at formation (-100–100).
    pub valence: f32,
    /// A resonance score must exceed this (`100 − intensity`).
    pub resonance_threshold: f32,
    /// How often the memory has resurfaced.
    pub times_triggered: u32,
    /// When the memory formed.
    pub created: DateTime<Utc>,
    /// When it last resurfaced.
    pub last_triggered: Option<DateTime<Utc>>,
}

impl EmotionalMemory {
    /// Form a new emotional memory.
    #[must_use]
    pub fn new(
        agent_id: AgentId,
        record_id: MemoryId,
        emotion: Emotion,
        intensity: f32,
        valence: f32,
        now: DateTime<Utc>,
    ) -> Self {
        let intensity = clamp_intensity(intensity);
        Self {
            id: MemoryId::new(),
            agent_id,
            record_id,
            emotion_type: emotion,
            intensity,
            valence: if valence.is_nan() {
                0.0
            } else {
                valence.clamp(-MAX_INTENSITY, MAX_INTENSITY)
            },
            resonance_threshold: MAX_INTENSITY - intensity,
            times_triggered: 0,
            created: now,
            last_triggered: None,
        }
    }

    /// The emotion vector this memory stands for: its intensity on its own channel.
    #[must_use]
    pub fn reconstructed_state(&self) -> EmotionVector {
        EmotionVector::single(self.emotion_type, self.intensity)
    }

    /// Age in days at `now` (never negative).
    #[must_use]
    pub fn age_days(&self, now: DateTime<Utc>) -> f32 {
        (crate::types::minutes_between(self.created, now) / (60.0 * 24.0)) as f32
    }

    /// Record a resurfacing.
    pub fn mark_triggered(&mut self, now: DateTime<Utc>) {
        self.times_triggered = self.times_triggered.saturating_add(1);
        self.last_triggered = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inverse_intensity() {
        let m = EmotionalMemory::new(
            AgentId::new(),
            MemoryId::new(),
            Emotion::Fear,
            80.0,
            -60.0,
            Utc::now(),
        );
        assert!((m.resonance_threshold - 20.0).abs() < f32::EPSILON);
        assert_eq!(m.times_triggered, 0);
        assert!(m.last_triggered.is_none());
    }

    #[test]
    fn inputs_are_clamped() {
        let m = EmotionalMemory::new(
            AgentId::new(),
            MemoryId::new(),
            Emotion::Joy,
            140.0,
            300.0,
            Utc::now(),
        );
        assert!((m.intensity - 100.0).abs() < f32::EPSILON);
        assert!((m.valence - 100.0).abs() < f32::EPSILON);
        assert!(m.resonance_threshold.abs() < f32::EPSILON);
    }

    #[test]
    fn trigger_counts() {
        let now = Utc::now();
        let mut m = EmotionalMemory::new(
            AgentId::new(),
            MemoryId::new(),
            Emotion::Joy,
            50.0,
            40.0,
            now,
        );
        m.mark_triggered(now);
        m.mark_triggered(now);
        assert_eq!(m.times_triggered, 2);
        assert_eq!(m.last_triggered, Some(now));
    }
}
