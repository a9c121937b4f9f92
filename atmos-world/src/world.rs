//! The affect world: owns every core component and runs the tick.
//!
//! ## Per-tick data flow
//!
//! | Step | Work                                              |
//! |------|---------------------------------------------------|
//! | 1    | Atmosphere sample over every agent                |
//! | 2    | Weather update from the atmosphere                |
//! | 3    | Weather effects pushed into every agent           |
//! | 4    | Chamber occupancy and resonance effects           |
//!
//! External drivers call into the store (through `systems::observe_signal`)
//! between ticks.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, debug_span, info, info_span, trace, warn};

use atmos_core::atmosphere::{AtmosphereAggregator, AtmosphereSnapshot};
use atmos_core::bond::BondLedger;
use atmos_core::chamber::{ChamberMatch, ChamberResonance, ResonanceChamber, ResonanceChamberField};
use atmos_core::error::Result;
use atmos_core::events::{AffectEvent, EventOutbox};
use atmos_core::memory::{MemoryResonanceIndex, ResonantMemory};
use atmos_core::metrics::{AffectCounters, TickBudgetMonitor, spans};
use atmos_core::persistence::PersistenceEngine;
use atmos_core::state::{AgentEmotionalProfile, EmotionalState};
use atmos_core::store::EmotionalStateStore;
use atmos_core::tables::AffectTables;
use atmos_core::types::{
    AgentId, Chronotype, Emotion, PersonalityPreset, Position, WorldClock, WorldId,
};
use atmos_core::weather::{WeatherController, WeatherDecision, WeatherState};

use crate::config::WorldConfig;

/// What one tick did.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Clock time of the tick.
    pub at: DateTime<Utc>,
    /// Atmosphere sampled this tick.
    pub atmosphere: AtmosphereSnapshot,
    /// Set when a new weather window started.
    pub weather: Option<WeatherDecision>,
    /// Agents touched by weather effects.
    pub weather_touched: usize,
    /// Chambers that resonated.
    pub resonances: Vec<ChamberResonance>,
}

/// One simulated world.
pub struct AffectWorld {
    config: WorldConfig,
    clock: Arc<dyn WorldClock>,
    tables: Arc<AffectTables>,
    outbox: EventOutbox,
    counters: Arc<AffectCounters>,
    store: EmotionalStateStore,
    bonds: BondLedger,
    memories: MemoryResonanceIndex,
    atmosphere: AtmosphereAggregator,
    weather: Mutex<WeatherController>,
    chambers: Mutex<ResonanceChamberField>,
    positions: DashMap<AgentId, Position>,
    rng: Mutex<StdRng>,
    budget: TickBudgetMonitor,
}

impl AffectWorld {
    /// Build a world with every component in its initial state.
    #[must_use]
    pub fn new(world_id: WorldId, config: WorldConfig, clock: Arc<dyn WorldClock>) -> Self {
        let outbox = EventOutbox::default();
        let counters = Arc::new(AffectCounters::new());
        let tables = Arc::new(config.affect.tables.clone());
        let mut rng = match config.world.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let now = clock.now();

        let store = EmotionalStateStore::new(
            world_id,
            &config.affect,
            outbox.clone(),
            Arc::clone(&counters),
        );
        let memories = MemoryResonanceIndex::new(
            config.affect.memory.clone(),
            Arc::clone(&counters),
        );
        let atmosphere = AtmosphereAggregator::new(
            config.affect.atmosphere.clone(),
            Arc::clone(&counters),
        );
        let weather = WeatherController::new(
            config.affect.weather.clone(),
            Arc::clone(&tables),
            config.world.initial_weather,
            now,
            outbox.clone(),
            Arc::clone(&counters),
            &mut rng,
        );
        let chambers = ResonanceChamberField::from_config(
            config.affect.chambers.clone(),
            outbox.clone(),
            Arc::clone(&counters),
        );
        let budget = TickBudgetMonitor::new(config.world.tick_budget_ms);

        info!(
            %world_id,
            weather = %config.world.initial_weather,
            chambers = chambers.chambers().len(),
            "affect world created"
        );
        Self {
            config,
            clock,
            tables,
            outbox,
            counters,
            store,
            bonds: BondLedger::new(),
            memories,
            atmosphere,
            weather: Mutex::new(weather),
            chambers: Mutex::new(chambers),
            positions: DashMap::new(),
            rng: Mutex::new(rng),
            budget,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// World id.
    #[must_use]
    pub fn world_id(&self) -> WorldId {
        self.store.world_id()
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Current clock time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The emotional state store.
    #[must_use]
    pub fn store(&self) -> &EmotionalStateStore {
        &self.store
    }

    /// Bonds between agents.
    #[must_use]
    pub fn bonds(&self) -> &BondLedger {
        &self.bonds
    }

    /// Emotional memories.
    #[must_use]
    pub fn memories(&self) -> &MemoryResonanceIndex {
        &self.memories
    }

    /// Shared counters.
    #[must_use]
    pub fn counters(&self) -> &AffectCounters {
        &self.counters
    }

    /// Tick timing.
    #[must_use]
    pub fn budget(&self) -> &TickBudgetMonitor {
        &self.budget
    }

    /// Subscribe to affect events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AffectEvent> {
        self.outbox.subscribe()
    }

    /// Latest atmosphere sample.
    #[must_use]
    pub fn atmosphere(&self) -> Option<AtmosphereSnapshot> {
        self.atmosphere.latest()
    }

    /// Atmosphere time series, oldest first.
    #[must_use]
    pub fn atmosphere_history(&self) -> Vec<AtmosphereSnapshot> {
        self.atmosphere.history()
    }

    /// Current weather.
    #[must_use]
    pub fn weather(&self) -> WeatherState {
        self.weather.lock().state().clone()
    }

    /// Adjust how strongly the collective mood steers the weather (0–100).
    pub fn set_emotional_influence(&self, influence: f32) {
        self.weather.lock().set_emotional_influence(influence);
    }

    /// Snapshot of every chamber.
    #[must_use]
    pub fn chambers(&self) -> Vec<ResonanceChamber> {
        self.chambers.lock().chambers().to_vec()
    }

    // -----------------------------------------------------------------------
    // Agents
    // -----------------------------------------------------------------------

    /// Add an agent at `position`. Re-spawning keeps the existing profile and moves it.
    pub fn spawn_agent(
        &self,
        agent: AgentId,
        preset: PersonalityPreset,
        chronotype: Chronotype,
        position: Position,
    ) -> AgentEmotionalProfile {
        let profile = self.store.initialize_agent(agent, preset, chronotype, self.clock.now());
        self.positions.insert(agent, position);
        profile
    }

    /// Remove an agent and its emotional memories. Returns whether it existed.
    pub fn despawn_agent(&self, agent: AgentId) -> bool {
        self.positions.remove(&agent);
        let forgotten = self.memories.forget_agent(agent);
        let existed = self.store.remove_agent(agent).is_some();
        if existed {
            debug!(%agent, forgotten, "agent despawned");
        }
        existed
    }

    /// Update an agent's position. Unknown agents are ignored.
    pub fn set_position(&self, agent: AgentId, position: Position) -> bool {
        if !self.store.contains(agent) {
            return false;
        }
        self.positions.insert(agent, position);
        true
    }

    /// Last known position of an agent.
    #[must_use]
    pub fn position(&self, agent: AgentId) -> Option<Position> {
        self.positions.get(&agent).map(|p| *p)
    }

    /// Every known position, sorted by agent id.
    #[must_use]
    pub fn positions(&self) -> Vec<(AgentId, Position)> {
        let mut positions: Vec<_> = self.positions.iter().map(|e| (*e.key(), *e.value())).collect();
        positions.sort_by_key(|(id, _)| *id);
        positions
    }

    /// Current (decayed) state of an agent.
    #[must_use]
    pub fn emotional_state(&self, agent: AgentId) -> Option<EmotionalState> {
        self.store.emotional_state(agent, self.clock.now())
    }

    /// Trigger an emotion at the current clock time.
    pub fn trigger_emotion(
        &self,
        agent: AgentId,
        emotion: Emotion,
        intensity: f32,
        cause: &str,
    ) -> Option<EmotionalState> {
        self.store.trigger_emotion(agent, emotion, intensity, cause, self.clock.now())
    }

    // -----------------------------------------------------------------------
    // Queries with side effects
    // -----------------------------------------------------------------------

    /// Let the agent's current state pull up matching memories.
    ///
    /// Each resurfaced memory is marked triggered and re-applies a share of
    /// its intensity to its emotion. `None` uses `memory.default_limit`.
    pub fn resurface_memories(&self, agent: AgentId, limit: Option<usize>) -> Vec<ResonantMemory> {
        let now = self.clock.now();
        let Some(state) = self.store.emotional_state(agent, now) else {
            return Vec::new();
        };
        let limit = limit.unwrap_or(self.memories.config().default_limit);
        let hits = self.memories.find_resonant_memories(agent, &state, limit, now);
        let factor = self.memories.config().resurface_factor;
        for hit in &hits {
            let memory = &hit.memory;
            self.memories.trigger_memory(agent, memory.id, now);
            let boost = memory.intensity * factor;
            self.store.trigger_emotion(agent, memory.emotion_type, boost, "memory resonance", now);
            self.outbox.publish(AffectEvent::MemoryResonated {
                agent,
                memory: memory.record_id,
                emotion: memory.emotion_type,
                score: hit.score.value(),
                at: now,
            });
        }
        hits
    }

    /// Best chamber for the agent's current state.
    #[must_use]
    pub fn find_resonant_chamber(&self, agent: AgentId) -> Option<ChamberMatch> {
        let state = self.emotional_state(agent)?;
        self.chambers.lock().find_resonant_chamber(&state)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Whether ticks do any work (`general.enabled`).
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.affect.general.enabled
    }

    /// Run one tick at the clock's current time.
    ///
    /// A disabled world returns an idle report carrying the latest atmosphere
    /// and touches nothing.
    pub fn tick(&self) -> TickReport {
        let now = self.clock.now();
        if !self.is_enabled() {
            trace!("affect disabled, tick skipped");
            let atmosphere = self
                .atmosphere
                .latest()
                .unwrap_or_else(|| AtmosphereSnapshot::neutral(now));
            return TickReport {
                at: now,
                atmosphere,
                weather: None,
                weather_touched: 0,
                resonances: Vec::new(),
            };
        }
        let _span = debug_span!(spans::TICK).entered();
        let timer = self.budget.begin_tick();
        let hour = self.clock.hour_of_day();

        let atmosphere = {
            let _span = debug_span!(spans::ATMOSPHERE).entered();
            self.atmosphere.calculate_world_atmosphere(&self.store, now)
        };

        let (weather, weather_touched) = {
            let _span = debug_span!(spans::WEATHER).entered();
            let sampled = (atmosphere.population > 0).then_some(&atmosphere);
            let mut controller = self.weather.lock();
            let decision = controller.update_world_weather(sampled, now, &mut *self.rng.lock());
            let touched = controller.apply_weather_effects(&self.store, hour, now);
            (decision, touched)
        };

        let resonances = {
            let _span = debug_span!(spans::CHAMBERS).entered();
            let positions = self.positions();
            let mut field = self.chambers.lock();
            field.update_occupancy(&positions, now);
            field.apply_resonance_effects(&self.store, &self.bonds, now)
        };

        drop(timer);
        if self.budget.is_over_budget() {
            warn!(
                budget_ms = self.budget.budget_ms(),
                mean_ms = self.budget.mean_ms(),
                agents = self.store.len(),
                "tick over budget"
            );
        }
        debug!(
            population = atmosphere.population,
            weather_changed = weather.is_some(),
            resonances = resonances.len(),
            "tick complete"
        );
        TickReport {
            at: now,
            atmosphere,
            weather,
            weather_touched,
            resonances,
        }
    }

    /// Tick interval from the configuration.
    #[must_use]
    pub fn tick_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.config.world.tick_interval_ms)
    }

    /// Run `ticks` ticks, one per `interval`. The first tick runs immediately.
    ///
    /// With a database, the world is saved every
    /// `persistence.auto_save_interval_seconds` of runtime. A failed save is
    /// logged and the loop keeps going.
    pub async fn run_ticks(
        &self,
        ticks: usize,
        interval: StdDuration,
        autosave: Option<&PersistenceEngine>,
    ) -> Vec<TickReport> {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let save_every = match self.config.affect.persistence.auto_save_interval_seconds {
            0 => None,
            secs => Some(StdDuration::from_secs(u64::from(secs))),
        };
        let mut last_save = Instant::now();
        let mut reports = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            timer.tick().await;
            reports.push(self.tick());

            let (Some(db), Some(every)) = (autosave, save_every) else {
                continue;
            };
            if last_save.elapsed() >= every {
                last_save = Instant::now();
                if let Err(e) = self.save(db) {
                    warn!(error = %e, "auto-save failed");
                }
            }
        }
        reports
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Save profiles, memories, chambers and weather.
    ///
    /// # Errors
    /// Returns a database or serialization error. Earlier record kinds may
    /// already be written when a later one fails.
    pub fn save(&self, db: &PersistenceEngine) -> Result<()> {
        let _span = info_span!(spans::PERSIST_SAVE).entered();
        let world = self.world_id();
        let profiles = self.store.export_profiles();
        db.save_profiles(&profiles)?;
        db.save_memories(world, &self.memories.all_memories())?;
        db.save_chambers(world, self.chambers.lock().chambers())?;
        db.save_weather(world, self.weather.lock().state())?;
        AffectCounters::bump(&self.counters.saves_completed);
        info!(
            %world,
            profiles = profiles.len(),
            memories = self.memories.len(),
            "affect world saved"
        );
        Ok(())
    }

    /// Restore everything saved for this world. Returns the number of profiles loaded.
    ///
    /// # Errors
    /// Returns a database or serialization error.
    pub fn load(&self, db: &PersistenceEngine) -> Result<usize> {
        let _span = info_span!(spans::PERSIST_LOAD).entered();
        let world = self.world_id();
        let profiles = db.load_profiles(world)?;
        let loaded = profiles.len();
        for profile in profiles {
            self.store.import_profile(profile);
        }
        for memory in db.load_memories(world)? {
            self.memories.import(memory);
        }
        let chambers = db.load_chambers(world)?;
        if !chambers.is_empty() {
            self.chambers.lock().restore(chambers);
        }
        if let Some(state) = db.load_weather(world)? {
            *self.weather.lock() = WeatherController::from_state(
                self.config.affect.weather.clone(),
                Arc::clone(&self.tables),
                state,
                self.outbox.clone(),
                Arc::clone(&self.counters),
            );
        }
        info!(%world, profiles = loaded, "affect world loaded");
        Ok(loaded)
    }
}
