//! Signals from external collaborators.
//!
//! Dialogue, quests, combat and movement live outside the affect engine. They
//! report what happened as a [`WorldSignal`]; `systems::observe_signal` turns
//! each one into core calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atmos_core::bond::InteractionTone;
use atmos_core::types::{AgentId, Emotion, MemoryId, Position};

/// Something that happened in the world and may move emotions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum WorldSignal {
    /// Two agents started talking.
    ConversationStarted {
        /// Who opened the conversation.
        initiator: AgentId,
        /// Who was addressed.
        partner: AgentId,
        /// When.
        at: DateTime<Utc>,
    },
    /// A conversation ended with an overall tone.
    ConversationEnded {
        /// Who opened the conversation.
        initiator: AgentId,
        /// Who was addressed.
        partner: AgentId,
        /// How it went.
        tone: InteractionTone,
        /// When.
        at: DateTime<Utc>,
    },
    /// An environmental event, such as a raid or a festival, felt by a group.
    Environment {
        /// Agents who felt it.
        witnesses: Vec<AgentId>,
        /// Emotion it provokes.
        emotion: Emotion,
        /// Raw intensity (-100–100).
        intensity: f32,
        /// Free-text cause.
        cause: String,
        /// When.
        at: DateTime<Utc>,
    },
    /// An agent moved.
    Moved {
        /// Agent.
        agent: AgentId,
        /// New position.
        position: Position,
        /// When.
        at: DateTime<Utc>,
    },
    /// An external memory record was formed and should be emotion-tagged.
    MemoryFormed {
        /// Agent remembering.
        agent: AgentId,
        /// Id of the external record.
        record: MemoryId,
        /// Emotion it was formed under.
        emotion: Emotion,
        /// Intensity at formation.
        intensity: f32,
        /// When.
        at: DateTime<Utc>,
    },
}

impl WorldSignal {
    /// When the signal happened.
    #[must_use]
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::ConversationStarted { at, .. }
            | Self::ConversationEnded { at, .. }
            | Self::Environment { at, .. }
            | Self::Moved { at, .. }
            | Self::MemoryFormed { at, .. } => *at,
        }
    }

    /// Every agent the signal touches.
    #[must_use]
    pub fn agents(&self) -> Vec<AgentId> {
        match self {
            Self::ConversationStarted { initiator, partner, .. }
            | Self::ConversationEnded { initiator, partner, .. } => vec![*initiator, *partner],
            Self::Environment { witnesses, .. } => witnesses.clone(),
            Self::Moved { agent, .. } | Self::MemoryFormed { agent, .. } => vec![*agent],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agents_lists_everyone_involved() {
        let (a, b) = (AgentId::new(), AgentId::new());
        let signal = WorldSignal::ConversationEnded {
            initiator: a,
            partner: b,
            tone: InteractionTone::Warm,
            at: Utc::now(),
        };
        assert_eq!(signal.agents(), vec![a, b]);
    }

    #[test]
    fn serializes_with_signal_tag() {
        let signal = WorldSignal::Moved {
            agent: AgentId::new(),
            position: Position::new(1.0, 2.0),
            at: Utc::now(),
        };
        let json = serde_json::to_string(&signal).expect("serializes");
        assert!(json.contains("\"signal\":\"moved\""));
        let back: WorldSignal = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back, signal);
    }
}
