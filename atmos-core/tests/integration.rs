//! Integration tests: end-to-end affect flows.
//!
//! Trigger → atmosphere → weather → chambers, memory resonance, and
//! save/load round-trips through SQLite.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use atmos_core::atmosphere::AtmosphereAggregator;
use atmos_core::bond::{BondLedger, BondSource, InteractionTone};
use atmos_core::chamber::ResonanceChamberField;
use atmos_core::config::{AtmosConfig, PersistenceConfig};
use atmos_core::events::{AffectEvent, EventOutbox};
use atmos_core::memory::MemoryResonanceIndex;
use atmos_core::metrics::AffectCounters;
use atmos_core::persistence::PersistenceEngine;
use atmos_core::store::EmotionalStateStore;
use atmos_core::types::{
    AgentId, Chronotype, Emotion, MemoryId, PersonalityPreset, Position, WorldId,
};
use atmos_core::weather::{TransitionPath, WeatherController, WeatherType};

struct FixedBond(f32);

impl BondSource for FixedBond {
    fn bond_strength(&self, _a: AgentId, _b: AgentId) -> Option<f32> {
        Some(self.0)
    }
}

struct Fixture {
    config: AtmosConfig,
    outbox: EventOutbox,
    counters: Arc<AffectCounters>,
    store: EmotionalStateStore,
}

fn fixture() -> Fixture {
    let config = AtmosConfig::default();
    let outbox = EventOutbox::default();
    let counters = Arc::new(AffectCounters::new());
    let store = EmotionalStateStore::new(
        WorldId::new(),
        &config,
        outbox.clone(),
        Arc::clone(&counters),
    );
    Fixture { config, outbox, counters, store }
}

// ---------------------------------------------------------------------------
// Store & contagion
// ---------------------------------------------------------------------------

#[test]
fn trigger_on_balanced_agent_reaches_85() {
    let f = fixture();
    let agent = AgentId::new();
    let now = Utc::now();
    f.store.initialize_agent(agent, PersonalityPreset::Balanced, Chronotype::Neutral, now);
    let state = f
        .store
        .trigger_emotion(agent, Emotion::Joy, 60.0, "gift", now)
        .expect("known agent");
    assert!((state.emotions.joy - 85.0).abs() < 1e-4);
}

#[test]
fn worked_contagion_between_two_agents() {
    let f = fixture();
    let now = Utc::now();
    let (source, target) = (AgentId::new(), AgentId::new());
    for (agent, joy) in [(source, 85.0), (target, 20.0)] {
        let mut profile = f.store.model().spawn_profile(
            f.store.world_id(),
            agent,
            PersonalityPreset::Balanced,
            Chronotype::Neutral,
            now,
        );
        profile.empathy = 70.0;
        profile.emotional_state.emotions.joy = joy;
        f.store.model().refresh(&mut profile.emotional_state);
        f.store.import_profile(profile);
    }

    let outcome = f
        .store
        .process_contagion(source, target, &FixedBond(50.0), 1.0, now)
        .expect("both agents exist");
    assert!((outcome.transfer.strength - 0.315).abs() < 1e-5);
    assert!((outcome.state.emotions.joy - 40.475).abs() < 1e-3);
    assert_eq!(outcome.transfer.emotion, Emotion::Joy);
}

#[test]
fn bonds_raise_contagion() {
    let f = fixture();
    let now = Utc::now();
    let ledger = BondLedger::new();
    let (a, b, c) = (AgentId::new(), AgentId::new(), AgentId::new());
    for agent in [a, b, c] {
        f.store.initialize_agent(agent, PersonalityPreset::Empathic, Chronotype::Neutral, now);
    }
    f.store.trigger_emotion(a, Emotion::Fear, 80.0, "ambush", now);
    for _ in 0..10 {
        ledger.record_interaction(a, b, InteractionTone::Warm, now);
    }

    let bonded = f.store.process_contagion(a, b, &ledger, 1.0, now).expect("exists");
    let stranger = f.store.process_contagion(a, c, &ledger, 1.0, now).expect("exists");
    assert!(bonded.transfer.strength > stranger.transfer.strength);
    assert!(bonded.state.emotions.fear > stranger.state.emotions.fear);
}

#[test]
fn decay_pulls_spike_down_over_time() {
    let f = fixture();
    let agent = AgentId::new();
    let now = Utc::now();
    f.store.initialize_agent(agent, PersonalityPreset::Balanced, Chronotype::Neutral, now);
    f.store.trigger_emotion(agent, Emotion::Anger, 90.0, "insult", now);

    let soon = f.store.emotional_state(agent, now + Duration::minutes(5)).expect("exists");
    let later = f.store.emotional_state(agent, now + Duration::minutes(60)).expect("exists");
    assert!(later.emotions.anger < soon.emotions.anger);
    assert!(soon.emotions.anger < 95.0);
}

// ---------------------------------------------------------------------------
// Atmosphere → weather
// ---------------------------------------------------------------------------

#[test]
fn sad_crowd_brings_rain() {
    let f = fixture();
    let now = Utc::now();
    for _ in 0..6 {
        let agent = AgentId::new();
        f.store.initialize_agent(agent, PersonalityPreset::Melancholic, Chronotype::Neutral, now);
        f.store.trigger_emotion(agent, Emotion::Sadness, 40.0, "funeral", now);
    }
    let aggregator = AtmosphereAggregator::new(
        f.config.atmosphere.clone(),
        Arc::clone(&f.counters),
    );
    let snapshot = aggregator.calculate_world_atmosphere(&f.store, now);
    assert_eq!(snapshot.dominant_emotion, Some(Emotion::Sadness));
    assert!(snapshot.intensity > 55.0);
    assert!(snapshot.emotional_diversity.abs() < f32::EPSILON);

    let mut rng = StdRng::seed_from_u64(7);
    let controller = WeatherController::new(
        f.config.weather.clone(),
        Arc::new(f.config.tables.clone()),
        WeatherType::Sunny,
        now,
        f.outbox.clone(),
        Arc::clone(&f.counters),
        &mut rng,
    );
    let decision = controller.decide_transition(20.0, Some(&snapshot), &mut rng);
    assert_eq!(decision.path, TransitionPath::Emotional);
    assert!(matches!(decision.weather, WeatherType::Rain | WeatherType::LightRain));
}

#[test]
fn weather_feedback_loop_publishes_change() {
    let f = fixture();
    let mut events = f.outbox.subscribe();
    let now = Utc::now();
    for _ in 0..4 {
        let agent = AgentId::new();
        f.store.initialize_agent(agent, PersonalityPreset::Anxious, Chronotype::Neutral, now);
        f.store.trigger_emotion(agent, Emotion::Fear, 70.0, "dragon", now);
    }
    let aggregator = AtmosphereAggregator::new(
        f.config.atmosphere.clone(),
        Arc::clone(&f.counters),
    );
    let snapshot = aggregator.calculate_world_atmosphere(&f.store, now);

    let mut rng = StdRng::seed_from_u64(11);
    let mut controller = WeatherController::new(
        f.config.weather.clone(),
        Arc::new(f.config.tables.clone()),
        WeatherType::Sunny,
        now,
        f.outbox.clone(),
        Arc::clone(&f.counters),
        &mut rng,
    );
    controller.set_emotional_influence(100.0);
    let later = now + Duration::minutes(31);
    let decision = controller
        .update_world_weather(Some(&snapshot), later, &mut rng)
        .expect("window expired");
    assert_eq!(decision.path, TransitionPath::Emotional);
    assert_ne!(controller.state().current_weather, WeatherType::Sunny);
    assert!(controller.state().emotionally_driven);

    let mut saw_change = false;
    while let Ok(event) = events.try_recv() {
        if let AffectEvent::WeatherChanged { from, emotionally_driven, .. } = event {
            assert_eq!(from, WeatherType::Sunny);
            assert!(emotionally_driven);
            saw_change = true;
        }
    }
    assert!(saw_change);

    let touched = controller.apply_weather_effects(&f.store, 14, later);
    assert_eq!(touched, 4);
}

// ---------------------------------------------------------------------------
// Chambers
// ---------------------------------------------------------------------------

#[test]
fn hearth_amplifies_shared_joy_and_reports() {
    let f = fixture();
    let mut events = f.outbox.subscribe();
    let now = Utc::now();
    let (a, b, loner) = (AgentId::new(), AgentId::new(), AgentId::new());
    for agent in [a, b, loner] {
        f.store.initialize_agent(agent, PersonalityPreset::Cheerful, Chronotype::Neutral, now);
        f.store.trigger_emotion(agent, Emotion::Joy, 30.0, "festival", now);
    }
    let before = f.store.emotional_state(a, now).expect("exists").emotions.joy;

    let mut field = ResonanceChamberField::from_config(
        f.config.chambers.clone(),
        f.outbox.clone(),
        Arc::clone(&f.counters),
    );
    field.update_occupancy(
        &[
            (a, Position::new(5.0, 5.0)),
            (b, Position::new(6.0, 6.0)),
            (loner, Position::new(50.0, 10.0)),
        ],
        now,
    );
    let resonances = field.apply_resonance_effects(&f.store, &BondLedger::new(), now);
    assert_eq!(resonances.len(), 1);
    assert_eq!(resonances[0].emotion, Emotion::Joy);
    assert!(f.store.emotional_state(a, now).expect("exists").emotions.joy > before);

    let kinds: Vec<&str> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|e| e.kind())
        .collect();
    assert!(kinds.contains(&"chamber_activated"));
    assert!(kinds.contains(&"chamber_resonated"));
}

// ---------------------------------------------------------------------------
// Memory resonance
// ---------------------------------------------------------------------------

#[test]
fn frightening_memory_returns_when_afraid_again() {
    let f = fixture();
    let index = MemoryResonanceIndex::new(f.config.memory.clone(), Arc::clone(&f.counters));
    let agent = AgentId::new();
    let now = Utc::now();
    f.store.initialize_agent(agent, PersonalityPreset::Anxious, Chronotype::Neutral, now);
    let memory = index.tag_memory(agent, MemoryId::new(), Emotion::Fear, 85.0, -70.0, now);
    index.tag_memory(agent, MemoryId::new(), Emotion::Joy, 30.0, 50.0, now);

    let calm = f.store.emotional_state(agent, now).expect("exists");
    let calm_hits = index.find_resonant_memories(agent, &calm, 5, now);

    let later = now + Duration::days(2);
    let afraid = f
        .store
        .trigger_emotion(agent, Emotion::Fear, 70.0, "wolves", later)
        .expect("exists");
    let hits = index.find_resonant_memories(agent, &afraid, 5, later);
    assert!(hits.iter().any(|h| h.memory.id == memory.id));
    assert!(hits.len() >= calm_hits.len());

    let triggered = index.trigger_memory(agent, memory.id, later).expect("exists");
    assert_eq!(triggered.times_triggered, 1);
    assert_eq!(f.counters.snapshot().memories_resonated, 1);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn save_and_restore_world_through_sqlite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("atmos.db");
    let f = fixture();
    let now = Utc::now();
    let world = f.store.world_id();
    let index = MemoryResonanceIndex::new(f.config.memory.clone(), Arc::clone(&f.counters));
    let mut agents = Vec::new();
    let presets = [
        PersonalityPreset::Stoic,
        PersonalityPreset::Hotheaded,
        PersonalityPreset::Cheerful,
    ];
    for preset in presets {
        let agent = AgentId::new();
        f.store.initialize_agent(agent, preset, Chronotype::MorningLark, now);
        f.store.trigger_emotion(agent, Emotion::Surprise, 50.0, "eclipse", now);
        index.tag_memory(agent, MemoryId::new(), Emotion::Surprise, 50.0, 10.0, now);
        agents.push(agent);
    }
    let mut rng = StdRng::seed_from_u64(3);
    let controller = WeatherController::new(
        f.config.weather.clone(),
        Arc::new(f.config.tables.clone()),
        WeatherType::Fog,
        now,
        f.outbox.clone(),
        Arc::clone(&f.counters),
        &mut rng,
    );
    let field = ResonanceChamberField::from_config(
        f.config.chambers.clone(),
        f.outbox.clone(),
        Arc::clone(&f.counters),
    );

    {
        let db = PersistenceEngine::open(&db_path, &PersistenceConfig::default()).expect("open");
        db.save_profiles(&f.store.export_profiles()).expect("profiles");
        db.save_memories(world, &index.all_memories()).expect("memories");
        db.save_chambers(world, field.chambers()).expect("chambers");
        db.save_weather(world, controller.state()).expect("weather");
    }

    let db = PersistenceEngine::open(&db_path, &PersistenceConfig::default()).expect("reopen");
    assert!(db.integrity_check().expect("check"));
    let restored = EmotionalStateStore::new(
        world,
        &f.config,
        EventOutbox::default(),
        Arc::new(AffectCounters::new()),
    );
    for profile in db.load_profiles(world).expect("load") {
        restored.import_profile(profile);
    }
    assert_eq!(restored.len(), 3);

    let later = now + Duration::minutes(30);
    for agent in agents {
        assert_eq!(restored.emotional_state(agent, later), f.store.emotional_state(agent, later));
    }
    assert_eq!(db.load_memories(world).expect("memories").len(), 3);
    assert_eq!(db.load_chambers(world).expect("chambers").len(), field.chambers().len());
    let weather = db.load_weather(world).expect("weather").expect("saved");
    assert_eq!(weather.current_weather, WeatherType::Fog);

    let backup = dir.path().join("atmos-backup.db");
    db.backup(&backup).expect("backup");
    let copy =
        PersistenceEngine::open(&backup, &PersistenceConfig::default()).expect("open backup");
    assert_eq!(copy.profile_count(world).expect("count"), 3);
}
