//! Integration hooks for the host game.
//!
//! The host calls these from its dialogue, event and movement code to build
//! the signals the affect world consumes.

use chrono::{DateTime, Utc};

use atmos_core::bond::InteractionTone;
use atmos_core::types::{AgentId, Emotion, MemoryId, Position};

use crate::events::WorldSignal;

/// A conversation began.
#[must_use]
pub fn on_conversation_started(
    initiator: AgentId,
    partner: AgentId,
    at: DateTime<Utc>,
) -> WorldSignal {
    WorldSignal::ConversationStarted { initiator, partner, at }
}

/// A conversation ended with the given tone.
#[must_use]
pub fn on_conversation_ended(
    initiator: AgentId,
    partner: AgentId,
    tone: InteractionTone,
    at: DateTime<Utc>,
) -> WorldSignal {
    WorldSignal::ConversationEnded { initiator, partner, tone, at }
}

/// Something in the environment provoked an emotion in a group of witnesses.
#[must_use]
pub fn on_environment(
    witnesses: Vec<AgentId>,
    emotion: Emotion,
    intensity: f32,
    cause: impl Into<String>,
    at: DateTime<Utc>,
) -> WorldSignal {
    WorldSignal::Environment {
        witnesses,
        emotion,
        intensity,
        cause: cause.into(),
        at,
    }
}

/// An agent moved.
#[must_use]
pub fn on_moved(agent: AgentId, position: Position, at: DateTime<Utc>) -> WorldSignal {
    WorldSignal::Moved { agent, position, at }
}

/// An external memory record was formed.
#[must_use]
pub fn on_memory_formed(
    agent: AgentId,
    record: MemoryId,
    emotion: Emotion,
    intensity: f32,
    at: DateTime<Utc>,
) -> WorldSignal {
    WorldSignal::MemoryFormed {
        agent,
        record,
        emotion,
        intensity,
        at,
    }
}
