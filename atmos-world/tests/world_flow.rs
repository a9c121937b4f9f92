//! End-to-end world flows: signals → ticks → weather and chambers → save/load.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use atmos_core::bond::InteractionTone;
use atmos_core::chamber::ChamberTemplate;
use atmos_core::config::PersistenceConfig;
use atmos_core::events::AffectEvent;
use atmos_core::persistence::PersistenceEngine;
use atmos_core::types::{
    AgentId, Chronotype, Emotion, MemoryId, PersonalityPreset, Position, WorldClock, WorldId,
};
use atmos_core::weather::WeatherType;
use atmos_world::clock::ManualClock;
use atmos_world::config::WorldConfig;
use atmos_world::hooks;
use atmos_world::systems::observe_signal;
use atmos_world::world::AffectWorld;

fn example_config() -> WorldConfig {
    let mut config =
        WorldConfig::from_toml(include_str!("../../atmos.example.toml")).expect("example parses");
    config.world.rng_seed = Some(2024);
    config
}

fn afternoon_clock() -> Arc<ManualClock> {
    let start = Utc.with_ymd_and_hms(2024, 5, 10, 14, 0, 0).single().expect("valid date");
    Arc::new(ManualClock::new(start))
}

#[test]
fn example_config_matches_defaults() {
    let config = example_config();
    let defaults = WorldConfig::default();
    let drift = config.affect.emotion.decay_base - defaults.affect.emotion.decay_base;
    assert!(drift.abs() < f32::EPSILON);
    assert_eq!(config.affect.weather.history_len, defaults.affect.weather.history_len);
    assert_eq!(config.affect.chambers.templates, defaults.affect.chambers.templates);
    assert_eq!(config.world.initial_weather, WeatherType::Sunny);
}

#[test]
fn commented_template_parses_when_enabled() {
    let toml = include_str!("../../atmos.example.toml")
        .lines()
        .map(|line| {
            line.strip_prefix("# ")
                .filter(|l| l.starts_with('[') || l.contains('='))
                .unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join("\n");
    let config = WorldConfig::from_toml(&toml).expect("parses with template");
    let templates: &[ChamberTemplate] = &config.affect.chambers.templates;
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].name, "Hearth");
}

#[test]
fn frightened_town_fogs_over() {
    let clock = afternoon_clock();
    let world = AffectWorld::new(
        WorldId::new(),
        example_config(),
        Arc::clone(&clock) as Arc<dyn WorldClock>,
    );
    world.set_emotional_influence(100.0);
    let mut events = world.subscribe();

    let villagers: Vec<AgentId> = (0..8)
        .map(|i| {
            let agent = AgentId::new();
            world.spawn_agent(
                agent,
                PersonalityPreset::Anxious,
                Chronotype::Neutral,
                Position::new(300.0 + 20.0 * i as f32, 300.0),
            );
            agent
        })
        .collect();

    clock.advance(Duration::minutes(31));
    let raid = hooks::on_environment(villagers.clone(), Emotion::Fear, 80.0, "raid", world.now());
    assert_eq!(observe_signal(&world, &raid), villagers.len());

    let report = world.tick();
    assert_eq!(report.atmosphere.dominant_emotion, Some(Emotion::Fear));
    let decision = report.weather.expect("window expired");
    assert_eq!(decision.weather, WeatherType::Fog);
    assert!(world.weather().emotionally_driven);

    let changed = std::iter::from_fn(|| events.try_recv().ok()).any(|e| {
        matches!(
            e,
            AffectEvent::WeatherChanged { to: WeatherType::Fog, emotionally_driven: true, .. }
        )
    });
    assert!(changed);
}

#[test]
fn friends_in_the_hearth_lift_each_other() {
    let clock = afternoon_clock();
    let world = AffectWorld::new(
        WorldId::new(),
        example_config(),
        Arc::clone(&clock) as Arc<dyn WorldClock>,
    );
    let (a, b) = (AgentId::new(), AgentId::new());
    world.spawn_agent(
        a,
        PersonalityPreset::Cheerful,
        Chronotype::MorningLark,
        Position::new(100.0, 100.0),
    );
    world.spawn_agent(
        b,
        PersonalityPreset::Cheerful,
        Chronotype::NightOwl,
        Position::new(110.0, 100.0),
    );

    for _ in 0..5 {
        observe_signal(
            &world,
            &hooks::on_conversation_ended(a, b, InteractionTone::Warm, world.now()),
        );
    }
    observe_signal(&world, &hooks::on_moved(a, Position::new(5.0, 5.0), world.now()));
    observe_signal(&world, &hooks::on_moved(b, Position::new(10.0, 10.0), world.now()));

    let best = world.find_resonant_chamber(a).expect("some chamber fits");
    let hearth = world.chambers().into_iter().find(|c| c.name == "Hearth").expect("hearth exists");
    assert_eq!(best.chamber, hearth.id);

    let before = world.emotional_state(a).expect("exists").emotions.joy;
    clock.advance(Duration::seconds(1));
    let report = world.tick();
    assert_eq!(report.resonances.len(), 1);
    assert_eq!(report.resonances[0].chamber, hearth.id);
    assert!(world.emotional_state(a).expect("exists").emotions.joy > before - 1.0);
}

#[test]
fn memories_survive_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("world.db");
    let clock = afternoon_clock();
    let world_id = WorldId::new();
    let agent = AgentId::new();
    let record = MemoryId::new();

    {
        let world = AffectWorld::new(
            world_id,
            example_config(),
            Arc::clone(&clock) as Arc<dyn WorldClock>,
        );
        world.spawn_agent(
            agent,
            PersonalityPreset::Melancholic,
            Chronotype::Neutral,
            Position::default(),
        );
        world.trigger_emotion(agent, Emotion::Sadness, 50.0, "farewell");
        observe_signal(
            &world,
            &hooks::on_memory_formed(agent, record, Emotion::Sadness, 80.0, world.now()),
        );
        let db = PersistenceEngine::open(&path, &PersistenceConfig::default()).expect("open");
        world.save(&db).expect("save");
    }

    clock.advance(Duration::days(1));
    let world = AffectWorld::new(
        world_id,
        example_config(),
        Arc::clone(&clock) as Arc<dyn WorldClock>,
    );
    let db = PersistenceEngine::open(&path, &PersistenceConfig::default()).expect("reopen");
    assert_eq!(world.load(&db).expect("load"), 1);
    assert_eq!(world.memories().memories_for(agent)[0].record_id, record);

    world.trigger_emotion(agent, Emotion::Sadness, 70.0, "letter");
    let hits = world.resurface_memories(agent, None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory.record_id, record);
}

#[tokio::test(start_paused = true)]
async fn scheduler_runs_on_configured_interval() {
    let clock = afternoon_clock();
    let world = AffectWorld::new(
        WorldId::new(),
        example_config(),
        Arc::clone(&clock) as Arc<dyn WorldClock>,
    );
    world.spawn_agent(
        AgentId::new(),
        PersonalityPreset::Balanced,
        Chronotype::Neutral,
        Position::default(),
    );
    let interval = world.tick_interval();
    let started = tokio::time::Instant::now();
    let reports = world.run_ticks(4, interval, None).await;
    assert_eq!(reports.len(), 4);
    assert!(started.elapsed() >= interval * 3);
    assert_eq!(world.atmosphere_history().len(), 4);
}
