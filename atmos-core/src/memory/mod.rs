//! Memory resonance index.
//!
//! Keeps every agent's emotion-tagged memories and answers "which memories
//! does this agent's current state bring back?". A memory resurfaces only when
//! its score beats its own threshold, so intense memories come back easily and
//! faint ones need a close emotional match.

pub mod emotional;
pub mod scoring;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::MemoryConfig;
use crate::metrics::AffectCounters;
use crate::state::EmotionalState;
use crate::types::{AgentId, Emotion, MemoryId, Score};

pub use emotional::EmotionalMemory;

/// A memory that resonated, with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ResonantMemory {
    /// The memory (as stored before this query).
    pub memory: EmotionalMemory,
    /// Resonance score.
    pub score: Score,
}

/// Per-agent store of emotional memories.
pub struct MemoryResonanceIndex {
    config: MemoryConfig,
    memories: RwLock<HashMap<AgentId, Vec<EmotionalMemory>>>,
    counters: Arc<AffectCounters>,
}

impl MemoryResonanceIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new(config: MemoryConfig, counters: Arc<AffectCounters>) -> Self {
        Self {
            config,
            memories: RwLock::new(HashMap::new()),
            counters,
        }
    }

    /// Memory tuning in use.
    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Tag an external memory record with the emotion it was formed under.
    pub fn tag_memory(
        &self,
        agent: AgentId,
        record_id: MemoryId,
        emotion: Emotion,
        intensity: f32,
        valence: f32,
        now: DateTime<Utc>,
    ) -> EmotionalMemory {
        let memory = EmotionalMemory::new(agent, record_id, emotion, intensity, valence, now);
        self.memories.write().entry(agent).or_default().push(memory.clone());
        AffectCounters::bump(&self.counters.memories_tagged);
        trace!(%agent, %emotion, intensity = memory.intensity, "emotional memory tagged");
        memory
    }

    /// Insert a previously saved memory.
    pub fn import(&self, memory: EmotionalMemory) {
        let mut memories = self.memories.write();
        let list = memories.entry(memory.agent_id).or_default();
        list.retain(|m| m.id != memory.id);
        list.push(memory);
    }

    /// Memories resonating with `current`, best first, at most `limit`.
    ///
    /// Ties keep the older memory first. Nothing is marked as triggered.
    #[must_use]
    pub fn find_resonant_memories(
        &self,
        agent: AgentId,
        current: &EmotionalState,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<ResonantMemory> {
        let memories = self.memories.read();
        let Some(list) = memories.get(&agent) else {
            return Vec::new();
        };
        let mut hits: Vec<ResonantMemory> = list
            .iter()
            .filter_map(|memory| {
                let score = scoring::resonance_score(memory, &current.emotions, &self.config, now);
                (score > memory.resonance_threshold).then(|| ResonantMemory {
                    memory: memory.clone(),
                    score: Score::new(score),
                })
            })
            .collect();
        drop(memories);

        hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.memory.created.cmp(&b.memory.created))
                .then(a.memory.id.cmp(&b.memory.id))
        });
        hits.truncate(limit);
        if !hits.is_empty() {
            debug!(%agent, count = hits.len(), best = hits[0].score.value(), "memories resonated");
        }
        hits
    }

    /// Mark a memory as resurfaced. Returns the updated memory.
    pub fn trigger_memory(
        &self,
        agent: AgentId,
        memory_id: MemoryId,
        now: DateTime<Utc>,
    ) -> Option<EmotionalMemory> {
        let mut memories = self.memories.write();
        let memory = memories.get_mut(&agent)?.iter_mut().find(|m| m.id == memory_id)?;
        memory.mark_triggered(now);
        AffectCounters::bump(&self.counters.memories_resonated);
        Some(memory.clone())
    }

    /// Drop every memory of an agent. Returns how many were dropped.
    pub fn forget_agent(&self, agent: AgentId) -> usize {
        let forgotten = self.memories.write().remove(&agent).as_ref().map_or(0, Vec::len);
        if forgotten > 0 {
            debug!(%agent, forgotten, "emotional memories dropped");
        }
        forgotten
    }

    /// All memories of one agent, oldest first.
    #[must_use]
    pub fn memories_for(&self, agent: AgentId) -> Vec<EmotionalMemory> {
        self.memories.read().get(&agent).cloned().unwrap_or_default()
    }

    /// Every memory in the index (for saving).
    #[must_use]
    pub fn all_memories(&self) -> Vec<EmotionalMemory> {
        self.memories.read().values().flatten().cloned().collect()
    }

    /// Total number of memories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memories.read().values().map(Vec::len).sum()
    }

    /// Whether the index holds no memories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AffectModel;
    use crate::tables::AffectTables;
    use crate::config::EmotionConfig;
    use crate::types::EmotionVector;

    fn index() -> MemoryResonanceIndex {
        MemoryResonanceIndex::new(MemoryConfig::default(), Arc::new(AffectCounters::new()))
    }

    fn state(emotions: EmotionVector) -> EmotionalState {
        AffectModel::new(Arc::new(AffectTables::default()), EmotionConfig::default())
            .derive_state(emotions, Utc::now())
    }

    #[test]
    fn matching_state_resurfaces_intense_memory() {
        let index = index();
        let agent = AgentId::new();
        let now = Utc::now();
        let fear = index.tag_memory(agent, MemoryId::new(), Emotion::Fear, 80.0, -70.0, now);
        index.tag_memory(agent, MemoryId::new(), Emotion::Joy, 20.0, 30.0, now);

        let afraid = state(EmotionVector::single(Emotion::Fear, 75.0));
        let hits = index.find_resonant_memories(agent, &afraid, 5, now);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].memory.id, fear.id);
        assert!(hits[0].score.value() > fear.resonance_threshold);
    }

    #[test]
    fn limit_and_order() {
        let index = index();
        let agent = AgentId::new();
        let now = Utc::now();
        for intensity in [60.0, 90.0, 75.0] {
            index.tag_memory(agent, MemoryId::new(), Emotion::Sadness, intensity, -50.0, now);
        }
        let current = state(EmotionVector::single(Emotion::Sadness, 80.0));
        let hits = index.find_resonant_memories(agent, &current, 2, now);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert!((hits[0].memory.intensity - 90.0).abs() < f32::EPSILON);
    }

    #[test]
    fn trigger_updates_counters() {
        let index = index();
        let agent = AgentId::new();
        let now = Utc::now();
        let m = index.tag_memory(agent, MemoryId::new(), Emotion::Trust, 50.0, 40.0, now);
        let updated = index.trigger_memory(agent, m.id, now).expect("exists");
        assert_eq!(updated.times_triggered, 1);
        assert!(index.trigger_memory(agent, MemoryId::new(), now).is_none());
        assert!(index.trigger_memory(AgentId::new(), m.id, now).is_none());
    }

    #[test]
    fn unknown_agent_has_no_memories() {
        let index = index();
        let calm = state(EmotionVector::ZERO);
        let hits = index.find_resonant_memories(AgentId::new(), &calm, 5, Utc::now());
        assert!(hits.is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn forgetting_an_agent_keeps_the_others() {
        let index = index();
        let (gone, stays) = (AgentId::new(), AgentId::new());
        let now = Utc::now();
        index.tag_memory(gone, MemoryId::new(), Emotion::Fear, 70.0, -40.0, now);
        index.tag_memory(gone, MemoryId::new(), Emotion::Joy, 50.0, 30.0, now);
        index.tag_memory(stays, MemoryId::new(), Emotion::Trust, 60.0, 40.0, now);

        assert_eq!(index.forget_agent(gone), 2);
        assert!(index.memories_for(gone).is_empty());
        assert_eq!(index.len(), 1);
        assert_eq!(index.forget_agent(gone), 0);
    }
}
