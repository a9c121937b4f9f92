//! World atmosphere: the collective mood of every agent.
//!
//! Each sample averages valence, arousal and dominance over the population,
//! tallies per-agent dominant emotions into a majority vote and measures how
//! split the vote is. Samples form a bounded time series; the trend compares
//! mean valence against the previous sample.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AtmosphereConfig;
use crate::metrics::AffectCounters;
use crate::state::EmotionalState;
use crate::store::EmotionalStateStore;
use crate::types::Emotion;

/// Direction of the collective mood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Mean valence rose past the threshold.
    Rising,
    /// Mean valence fell past the threshold.
    Falling,
    /// Neither.
    #[default]
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::Stable => "stable",
        })
    }
}

/// One sample of the world's collective mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereSnapshot {
    /// Mean valence (-100–100).
    pub average_valence: f32,
    /// Mean arousal (0–100).
    pub average_arousal: f32,
    /// Mean dominance (0–100).
    pub average_dominance: f32,
    /// Most common per-agent dominant emotion. `None` for an empty world.
    pub dominant_emotion: Option<Emotion>,
    /// Share of agents not holding the dominant emotion (0–100).
    pub emotional_diversity: f32,
    /// Direction against the previous sample.
    pub trend: Trend,
    /// Mean strength of the dominant emotion among its holders.
    pub intensity: f32,
    /// Agents sampled.
    pub population: usize,
    /// When the sample was taken.
    pub sampled_at: DateTime<Utc>,
}

impl AtmosphereSnapshot {
    /// The snapshot of an empty world.
    #[must_use]
    pub fn neutral(at: DateTime<Utc>) -> Self {
        Self {
            average_valence: 0.0,
            average_arousal: 0.0,
            average_dominance: 0.0,
            dominant_emotion: None,
            emotional_diversity: 0.0,
            trend: Trend::Stable,
            intensity: 0.0,
            population: 0,
            sampled_at: at,
        }
    }
}

/// Aggregate a population of states into one snapshot.
///
/// Per-agent and population-level ties both resolve by enumeration order.
#[must_use]
pub fn aggregate<'a>(
    states: impl IntoIterator<Item = &'a EmotionalState>,
    previous: Option<&AtmosphereSnapshot>,
    trend_threshold: f32,
    at: DateTime<Utc>,
) -> AtmosphereSnapshot {
    let mut population = 0_usize;
    let (mut valence, mut arousal, mut dominance) = (0.0_f32, 0.0_f32, 0.0_f32);
    let mut counts = [0_usize; Emotion::ALL.len()];
    let mut strength = [0.0_f32; Emotion::ALL.len()];

    for state in states {
        population += 1;
        valence += state.valence;
        arousal += state.arousal;
        dominance += state.dominance;
        let (emotion, value) = state.emotions.dominant();
        let slot = emotion as usize;
        counts[slot] += 1;
        strength[slot] += value;
    }

    if population == 0 {
        return AtmosphereSnapshot::neutral(at);
    }

    let mut best = 0_usize;
    for slot in 1..counts.len() {
        if counts[slot] > counts[best] {
            best = slot;
        }
    }
    let n = population as f32;
    let average_valence = valence / n;
    let trend = match previous {
        Some(prev) if average_valence - prev.average_valence > trend_threshold => Trend::Rising,
        Some(prev) if average_valence - prev.average_valence < -trend_threshold => Trend::Falling,
        _ => Trend::Stable,
    };

    AtmosphereSnapshot {
        average_valence,
        average_arousal: arousal / n,
        average_dominance: dominance / n,
        dominant_emotion: Some(Emotion::ALL[best]),
        emotional_diversity: (n - counts[best] as f32) / n * 100.0,
        trend,
        intensity: strength[best] / counts[best] as f32,
        population,
        sampled_at: at,
    }
}

/// Samples the store and keeps the recent series.
pub struct AtmosphereAggregator {
    config: AtmosphereConfig,
    history: RwLock<VecDeque<AtmosphereSnapshot>>,
    counters: Arc<AffectCounters>,
}

impl AtmosphereAggregator {
    /// Create an aggregator with an empty series.
    #[must_use]
    pub fn new(config: AtmosphereConfig, counters: Arc<AffectCounters>) -> Self {
        Self {
            config,
            history: RwLock::new(VecDeque::new()),
            counters,
        }
    }

    /// Sample every agent at `now` and append the snapshot to the series.
    pub fn calculate_world_atmosphere(
        &self,
        store: &EmotionalStateStore,
        now: DateTime<Utc>,
    ) -> AtmosphereSnapshot {
        let states = store.snapshot_all(now);
        let snapshot = {
            let history = self.history.read();
            aggregate(
                states.iter().map(|(_, state)| state),
                history.back(),
                self.config.trend_threshold,
                now,
            )
        };
        self.record(snapshot.clone());
        AffectCounters::bump(&self.counters.atmosphere_samples);
        debug!(
            population = snapshot.population,
            dominant = ?snapshot.dominant_emotion,
            intensity = snapshot.intensity,
            diversity = snapshot.emotional_diversity,
            trend = %snapshot.trend,
            "atmosphere sampled"
        );
        snapshot
    }

    /// Append a snapshot, dropping the oldest past the history limit.
    pub fn record(&self, snapshot: AtmosphereSnapshot) {
        let mut history = self.history.write();
        history.push_back(snapshot);
        while history.len() > self.config.history_limit.max(1) {
            history.pop_front();
        }
    }

    /// Most recent snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<AtmosphereSnapshot> {
        self.history.read().back().cloned()
    }

    /// The retained series, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<AtmosphereSnapshot> {
        self.history.read().iter().cloned().collect()
    }

    /// Number of retained snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.read().len()
    }

    /// Whether no snapshot was taken yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.read().is_empty()
    }
}
