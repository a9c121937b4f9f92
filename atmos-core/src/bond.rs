//! Emotional bonds between pairs of agents.
//!
//! Bonds are created lazily on first interaction and only ever accumulate
//! interactions. Contagion reads them through the [`BondSource`] trait so a
//! host game can plug in its own relationship store; [`BondLedger`] is the
//! in-memory implementation used by default.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::types::{AgentId, clamp_intensity};

/// Anything that can tell how strongly two agents are bonded.
pub trait BondSource: Send + Sync {
    /// Bond strength between `a` and `b` (0–100), `None` if they never met.
    fn bond_strength(&self, a: AgentId, b: AgentId) -> Option<f32>;
}

/// Emotional tone of a finished interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionTone {
    /// Friendly, supportive.
    Warm,
    /// Unremarkable.
    #[default]
    Neutral,
    /// Argument, insult, threat.
    Hostile,
}

/// Relationship category derived from bond values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Fewer than two interactions.
    Stranger,
    /// Known, nothing more.
    Acquaintance,
    /// Warm and familiar.
    Friend,
    /// Deep affection and trust.
    CloseFriend,
    /// Competitive friction.
    Rival,
    /// Open hostility.
    Enemy,
}

/// Pairwise emotional bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalBond {
    /// Fondness (0–100).
    pub affection: f32,
    /// Reliance (0–100).
    pub trust: f32,
    /// Esteem (0–100).
    pub respect: f32,
    /// Friction (0–100).
    pub rivalry: f32,
    /// Interactions recorded. Only grows.
    pub interaction_count: u32,
    /// First interaction.
    pub first_met: DateTime<Utc>,
    /// Most recent interaction.
    pub last_interaction: DateTime<Utc>,
}

impl EmotionalBond {
    /// A fresh bond between two agents who just met.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            affection: 10.0,
            trust: 10.0,
            respect: 10.0,
            rivalry: 0.0,
            interaction_count: 0,
            first_met: now,
            last_interaction: now,
        }
    }

    /// Bond strength fed into contagion (0–100).
    #[must_use]
    pub fn contagion_strength(&self) -> f32 {
        clamp_intensity(
            self.affection * 0.5 + self.trust * 0.3 + self.respect * 0.2 - self.rivalry * 0.3,
        )
    }

    /// Relationship category.
    #[must_use]
    pub fn relationship_type(&self) -> RelationshipType {
        if self.interaction_count < 2 {
            RelationshipType::Stranger
        } else if self.rivalry >= 70.0 && self.rivalry > self.affection {
            RelationshipType::Enemy
        } else if self.rivalry >= 40.0 && self.rivalry > self.affection {
            RelationshipType::Rival
        } else if self.affection >= 70.0 && self.trust >= 60.0 && self.interaction_count >= 10 {
            RelationshipType::CloseFriend
        } else if self.affection >= 45.0 && self.interaction_count >= 5 {
            RelationshipType::Friend
        } else {
            RelationshipType::Acquaintance
        }
    }

    /// Fold one interaction into the bond.
    pub fn record(&mut self, tone: InteractionTone, now: DateTime<Utc>) {
        let (affection, trust, respect, rivalry) = match tone {
            InteractionTone::Warm => (6.0, 4.0, 2.0, -2.0),
            InteractionTone::Neutral => (0.0, 1.0, 1.0, 0.0),
            InteractionTone::Hostile => (-5.0, -6.0, 0.0, 8.0),
        };
        self.affection = clamp_intensity(self.affection + affection);
        self.trust = clamp_intensity(self.trust + trust);
        self.respect = clamp_intensity(self.respect + respect);
        self.rivalry = clamp_intensity(self.rivalry + rivalry);
        self.interaction_count = self.interaction_count.saturating_add(1);
        if now > self.last_interaction {
            self.last_interaction = now;
        }
    }
}

/// In-memory bond store keyed by unordered agent pair.
#[derive(Debug, Default)]
pub struct BondLedger {
    bonds: DashMap<(AgentId, AgentId), EmotionalBond>,
}

fn pair(a: AgentId, b: AgentId) -> (AgentId, AgentId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl BondLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an interaction, creating the bond if needed. Returns the updated bond.
    pub fn record_interaction(
        &self,
        a: AgentId,
        b: AgentId,
        tone: InteractionTone,
        now: DateTime<Utc>,
    ) -> EmotionalBond {
        let mut entry = self.bonds.entry(pair(a, b)).or_insert_with(|| EmotionalBond::new(now));
        entry.record(tone, now);
        entry.clone()
    }

    /// Current bond between two agents.
    #[must_use]
    pub fn bond(&self, a: AgentId, b: AgentId) -> Option<EmotionalBond> {
        self.bonds.get(&pair(a, b)).map(|entry| entry.clone())
    }

    /// Insert or replace a bond (persistence restore).
    pub fn import(&self, a: AgentId, b: AgentId, bond: EmotionalBond) {
        self.bonds.insert(pair(a, b), bond);
    }

    /// Number of bonds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }
}

impl BondSource for BondLedger {
    fn bond_strength(&self, a: AgentId, b: AgentId) -> Option<f32> {
        self.bonds.get(&pair(a, b)).map(|bond| bond.contagion_strength())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bonds_are_symmetric_and_lazy() {
        let ledger = BondLedger::new();
        let (a, b) = (AgentId::new(), AgentId::new());
        assert!(ledger.bond_strength(a, b).is_none());
        ledger.record_interaction(a, b, InteractionTone::Warm, Utc::now());
        assert_eq!(ledger.bond_strength(a, b), ledger.bond_strength(b, a));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn warm_interactions_build_friendship() {
        let ledger = BondLedger::new();
        let (a, b) = (AgentId::new(), AgentId::new());
        let now = Utc::now();
        let mut bond = ledger.record_interaction(a, b, InteractionTone::Warm, now);
        assert_eq!(bond.relationship_type(), RelationshipType::Stranger);
        for _ in 0..13 {
            bond = ledger.record_interaction(a, b, InteractionTone::Warm, now);
        }
        assert_eq!(bond.interaction_count, 14);
        assert_eq!(bond.relationship_type(), RelationshipType::CloseFriend);
    }

    #[test]
    fn hostility_breeds_rivalry() {
        let ledger = BondLedger::new();
        let (a, b) = (AgentId::new(), AgentId::new());
        let now = Utc::now();
        let mut bond = ledger.record_interaction(a, b, InteractionTone::Hostile, now);
        for _ in 0..5 {
            bond = ledger.record_interaction(a, b, InteractionTone::Hostile, now);
        }
        assert_eq!(bond.relationship_type(), RelationshipType::Rival);
        assert!(bond.contagion_strength() < EmotionalBond::new(now).contagion_strength());
    }
}
