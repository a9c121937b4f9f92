//! Typed domain events and the outbox they are published on.
//!
//! Components never call into each other to report what happened. They push
//! an [`AffectEvent`] onto the shared [`EventOutbox`]; anything interested
//! (needs system, UI, logging sink) subscribes. Publishing never fails the
//! caller: with no subscribers the event is dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::chamber::ChamberType;
use crate::types::{AgentId, ChamberId, Emotion, MemoryId, Mood};
use crate::weather::WeatherType;

/// Default outbox buffer size.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 1024;

/// Something that happened inside the affect engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AffectEvent {
    /// A trigger exceeded the spike threshold.
    EmotionSpiked {
        /// Agent affected.
        agent: AgentId,
        /// Emotion triggered.
        emotion: Emotion,
        /// Raw trigger intensity.
        intensity: f32,
        /// Free-text cause supplied by the caller.
        cause: String,
        /// When.
        at: DateTime<Utc>,
    },
    /// An agent's categorical mood changed on write.
    MoodShifted {
        /// Agent affected.
        agent: AgentId,
        /// Mood before the write.
        from: Mood,
        /// Mood after the write.
        to: Mood,
        /// When.
        at: DateTime<Utc>,
    },
    /// Emotion spread from one agent to another.
    ContagionTransferred {
        /// Emitting agent.
        source: AgentId,
        /// Receiving agent.
        target: AgentId,
        /// Channel that moved the most.
        emotion: Emotion,
        /// Signed change on that channel.
        delta: f32,
        /// Contagion strength used.
        strength: f32,
        /// When.
        at: DateTime<Utc>,
    },
    /// A stored memory resurfaced.
    MemoryResonated {
        /// Agent remembering.
        agent: AgentId,
        /// Memory that resonated.
        memory: MemoryId,
        /// Emotion of the memory.
        emotion: Emotion,
        /// Resonance score.
        score: f32,
        /// When.
        at: DateTime<Utc>,
    },
    /// World weather changed to a different type.
    WeatherChanged {
        /// Previous weather.
        from: WeatherType,
        /// New weather.
        to: WeatherType,
        /// Whether the collective mood drove the change.
        emotionally_driven: bool,
        /// When.
        at: DateTime<Utc>,
    },
    /// A chamber gained its second occupant.
    ChamberActivated {
        /// Chamber.
        chamber: ChamberId,
        /// Kind of chamber.
        chamber_type: ChamberType,
        /// Occupant count.
        occupants: usize,
        /// When.
        at: DateTime<Utc>,
    },
    /// A chamber dropped below two occupants.
    ChamberDeactivated {
        /// Chamber.
        chamber: ChamberId,
        /// When.
        at: DateTime<Utc>,
    },
    /// An active chamber applied its effects this tick.
    ChamberResonated {
        /// Chamber.
        chamber: ChamberId,
        /// Dominant emotion among occupants.
        emotion: Emotion,
        /// Resonance intensity.
        intensity: f32,
        /// Energy modifier for an external needs system.
        energy_modifier: f32,
        /// Social modifier for an external needs system.
        social_modifier: f32,
        /// Occupants affected.
        occupants: Vec<AgentId>,
        /// When.
        at: DateTime<Utc>,
    },
}

impl AffectEvent {
    /// Timestamp of the event.
    #[must_use]
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::EmotionSpiked { at, .. }
            | Self::MoodShifted { at, .. }
            | Self::ContagionTransferred { at, .. }
            | Self::MemoryResonated { at, .. }
            | Self::WeatherChanged { at, .. }
            | Self::ChamberActivated { at, .. }
            | Self::ChamberDeactivated { at, .. }
            | Self::ChamberResonated { at, .. } => *at,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EmotionSpiked { .. } => "emotion_spiked",
            Self::MoodShifted { .. } => "mood_shifted",
            Self::ContagionTransferred { .. } => "contagion_transferred",
            Self::MemoryResonated { .. } => "memory_resonated",
            Self::WeatherChanged { .. } => "weather_changed",
            Self::ChamberActivated { .. } => "chamber_activated",
            Self::ChamberDeactivated { .. } => "chamber_deactivated",
            Self::ChamberResonated { .. } => "chamber_resonated",
        }
    }
}

/// Fire-and-forget broadcast outbox. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct EventOutbox {
    sender: broadcast::Sender<AffectEvent>,
}

impl EventOutbox {
    /// Create an outbox buffering up to `capacity` events per lagging subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AffectEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Dropped silently when nobody listens.
    pub fn publish(&self, event: AffectEvent) {
        let kind = event.kind();
        if let Err(e) = self.sender.send(event) {
            trace!(kind, error = %e, "affect event dropped (no subscribers)");
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventOutbox {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOX_CAPACITY)
    }
}
