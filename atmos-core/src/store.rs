//! The emotional state store.
//!
//! Holds one [`AgentEmotionalProfile`] per agent. Each profile sits behind its
//! own mutex, so writes to one agent are serialized while different agents
//! proceed in parallel. Decay is lazy: every read projects, every write
//! settles, and nothing runs on a timer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::bond::BondSource;
use crate::config::{AtmosConfig, ContagionConfig};
use crate::contagion::{ContagionTransfer, apply_contagion, calculate_contagion_strength};
use crate::events::{AffectEvent, EventOutbox};
use crate::metrics::AffectCounters;
use crate::state::{AffectModel, AgentEmotionalProfile, EmotionalState, personality_modifier};
use crate::types::{
    AgentId, Chronotype, Emotion, MAX_INTENSITY, Mood, PersonalityPreset, WorldId,
};

type ProfileHandle = Arc<Mutex<AgentEmotionalProfile>>;

/// Outcome of a contagion pass onto one target.
#[derive(Debug, Clone, PartialEq)]
pub struct ContagionOutcome {
    /// What moved.
    pub transfer: ContagionTransfer,
    /// Target's state after the transfer.
    pub state: EmotionalState,
}

/// Concurrent per-agent profile store.
pub struct EmotionalStateStore {
    world_id: WorldId,
    model: AffectModel,
    contagion: ContagionConfig,
    profiles: DashMap<AgentId, ProfileHandle>,
    outbox: EventOutbox,
    counters: Arc<AffectCounters>,
}

impl EmotionalStateStore {
    /// Create an empty store for one world.
    #[must_use]
    pub fn new(
        world_id: WorldId,
        config: &AtmosConfig,
        outbox: EventOutbox,
        counters: Arc<AffectCounters>,
    ) -> Self {
        Self {
            world_id,
            model: AffectModel::new(Arc::new(config.tables.clone()), config.emotion.clone()),
            contagion: config.contagion.clone(),
            profiles: DashMap::new(),
            outbox,
            counters,
        }
    }

    /// World this store belongs to.
    #[must_use]
    pub fn world_id(&self) -> WorldId {
        self.world_id
    }

    /// The affect model used to derive metrics.
    #[must_use]
    pub fn model(&self) -> &AffectModel {
        &self.model
    }

    fn handle(&self, agent: AgentId) -> Option<ProfileHandle> {
        self.profiles.get(&agent).map(|entry| Arc::clone(entry.value()))
    }

    fn handles(&self) -> Vec<(AgentId, ProfileHandle)> {
        let mut handles: Vec<_> = self
            .profiles
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        handles.sort_by_key(|(id, _)| *id);
        handles
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Create an agent's profile from a personality preset.
    ///
    /// Re-initialising an existing agent changes nothing and returns the
    /// existing profile.
    pub fn initialize_agent(
        &self,
        agent: AgentId,
        preset: PersonalityPreset,
        chronotype: Chronotype,
        now: DateTime<Utc>,
    ) -> AgentEmotionalProfile {
        let handle = match self.profiles.entry(agent) {
            Entry::Occupied(existing) => Arc::clone(existing.get()),
            Entry::Vacant(slot) => {
                let profile = self.model.spawn_profile(
                    self.world_id,
                    agent,
                    preset,
                    chronotype,
                    now,
                );
                debug!(
                    %agent,
                    ?preset,
                    ?chronotype,
                    mood = %profile.emotional_state.mood,
                    "agent initialised"
                );
                Arc::clone(slot.insert(Arc::new(Mutex::new(profile))).value())
            }
        };
        handle.lock().clone()
    }

    /// Insert or replace a profile (persistence restore). Decays lazily on next access.
    pub fn import_profile(&self, profile: AgentEmotionalProfile) {
        let agent = profile.agent_id;
        self.profiles.insert(agent, Arc::new(Mutex::new(profile)));
        trace!(%agent, "profile imported");
    }

    /// Drop an agent (despawn). Returns its last stored profile.
    pub fn remove_agent(&self, agent: AgentId) -> Option<AgentEmotionalProfile> {
        self.profiles
            .remove(&agent)
            .map(|(_, handle)| handle.lock().clone())
    }

    /// Whether the agent has a profile.
    #[must_use]
    pub fn contains(&self, agent: AgentId) -> bool {
        self.profiles.contains_key(&agent)
    }

    /// Number of agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// All agent ids, sorted.
    #[must_use]
    pub fn agent_ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.profiles.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The stored profile, exactly as last written (not decayed).
    #[must_use]
    pub fn profile(&self, agent: AgentId) -> Option<AgentEmotionalProfile> {
        self.handle(agent).map(|handle| handle.lock().clone())
    }

    /// All stored profiles sorted by agent id (for saving).
    #[must_use]
    pub fn export_profiles(&self) -> Vec<AgentEmotionalProfile> {
        self.handles()
            .into_iter()
            .map(|(_, handle)| handle.lock().clone())
            .collect()
    }

    /// Decayed, recomputed state at `now`. Nothing is written back.
    #[must_use]
    pub fn emotional_state(&self, agent: AgentId, now: DateTime<Utc>) -> Option<EmotionalState> {
        let handle = self.handle(agent)?;
        let profile = handle.lock();
        Some(self.model.project(&profile, now))
    }

    /// Decayed states of every agent at `now`, sorted by agent id.
    #[must_use]
    pub fn snapshot_all(&self, now: DateTime<Utc>) -> Vec<(AgentId, EmotionalState)> {
        self.handles()
            .into_iter()
            .map(|(id, handle)| {
                let profile = handle.lock();
                (id, self.model.project(&profile, now))
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Decay the agent to `now`, then add `intensity × personality_modifier`
    /// to `emotion`.
    ///
    /// Negative intensities lower the channel. Returns the new state, or
    /// `None` for an unknown agent.
    pub fn trigger_emotion(
        &self,
        agent: AgentId,
        emotion: Emotion,
        intensity: f32,
        cause: &str,
        now: DateTime<Utc>,
    ) -> Option<EmotionalState> {
        let intensity = if intensity.is_nan() {
            0.0
        } else {
            intensity.clamp(-MAX_INTENSITY, MAX_INTENSITY)
        };
        let handle = self.handle(agent)?;
        let (state, before, applied) = {
            let mut profile = handle.lock();
            self.model.settle(&mut profile, now);
            let before = profile.emotional_state.mood;
            let modifier = personality_modifier(emotion, &profile.personality);
            let applied = profile.emotional_state.emotions.add(emotion, intensity * modifier);
            self.model.refresh(&mut profile.emotional_state);
            profile.version += 1;
            (profile.emotional_state.clone(), before, applied)
        };

        AffectCounters::bump(&self.counters.triggers);
        trace!(%agent, %emotion, intensity, applied, cause, "emotion triggered");

        if intensity > self.model.config().spike_threshold {
            AffectCounters::bump(&self.counters.spikes);
            info!(%agent, %emotion, intensity, cause, "emotion spike");
            self.outbox.publish(AffectEvent::EmotionSpiked {
                agent,
                emotion,
                intensity,
                cause: cause.to_string(),
                at: now,
            });
        }
        self.note_mood_shift(agent, before, state.mood, now);
        Some(state)
    }

    /// Spread emotion from `source` to `target`.
    ///
    /// The source is only read (projected); the target is decayed, blended
    /// and recomputed. The two agents are never locked at the same time.
    pub fn process_contagion(
        &self,
        source: AgentId,
        target: AgentId,
        bonds: &dyn BondSource,
        proximity: f32,
        now: DateTime<Utc>,
    ) -> Option<ContagionOutcome> {
        if source == target {
            return None;
        }
        let (source_emotions, source_empathy) = {
            let handle = self.handle(source)?;
            let profile = handle.lock();
            (self.model.project(&profile, now).emotions, profile.empathy)
        };
        let bond = bonds.bond_strength(source, target).unwrap_or(0.0);

        let handle = self.handle(target)?;
        let (transfer, state, before) = {
            let mut profile = handle.lock();
            self.model.settle(&mut profile, now);
            let before = profile.emotional_state.mood;
            let strength = calculate_contagion_strength(
                self.contagion.base_rate,
                source_empathy,
                profile.empathy,
                bond,
                proximity,
            );
            let transfer = apply_contagion(
                &mut profile.emotional_state.emotions,
                &source_emotions,
                strength,
            );
            self.model.refresh(&mut profile.emotional_state);
            profile.version += 1;
            (transfer, profile.emotional_state.clone(), before)
        };

        AffectCounters::bump(&self.counters.contagion_transfers);
        if transfer.delta.abs() >= self.contagion.min_logged_delta {
            debug!(
                %source,
                %target,
                emotion = %transfer.emotion,
                delta = transfer.delta,
                strength = transfer.strength,
                "emotional contagion"
            );
            self.outbox.publish(AffectEvent::ContagionTransferred {
                source,
                target,
                emotion: transfer.emotion,
                delta: transfer.delta,
                strength: transfer.strength,
                at: now,
            });
        }
        self.note_mood_shift(target, before, state.mood, now);
        Some(ContagionOutcome { transfer, state })
    }

    /// Blend every channel toward the agent's baseline by `rate` (0–1).
    pub fn regulate_toward_baseline(
        &self,
        agent: AgentId,
        rate: f32,
        now: DateTime<Utc>,
    ) -> Option<EmotionalState> {
        let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        let handle = self.handle(agent)?;
        let (state, before) = {
            let mut profile = handle.lock();
            self.model.settle(&mut profile, now);
            let before = profile.emotional_state.mood;
            let baseline = profile.emotional_baseline.emotions;
            for emotion in Emotion::ALL {
                let current = profile.emotional_state.emotions.get(emotion);
                let pull = (baseline.get(emotion) - current) * rate;
                profile.emotional_state.emotions.set(emotion, current + pull);
            }
            self.model.refresh(&mut profile.emotional_state);
            profile.version += 1;
            (profile.emotional_state.clone(), before)
        };
        self.note_mood_shift(agent, before, state.mood, now);
        Some(state)
    }

    fn note_mood_shift(&self, agent: AgentId, from: Mood, to: Mood, now: DateTime<Utc>) {
        if from == to {
            return;
        }
        AffectCounters::bump(&self.counters.mood_shifts);
        debug!(%agent, %from, %to, "mood shifted");
        self.outbox.publish(AffectEvent::MoodShifted { agent, from, to, at: now });
    }
}
