//! Property-based tests for the affect engine.
//!
//! Verifies the numeric guarantees of decay, triggers, contagion and memory
//! scoring under random inputs.

use std::sync::Arc;

use chrono::{Duration, Utc};
use proptest::prelude::*;

use atmos_core::config::AtmosConfig;
use atmos_core::contagion::{apply_contagion, calculate_contagion_strength};
use atmos_core::decay;
use atmos_core::events::EventOutbox;
use atmos_core::memory::scoring::state_similarity;
use atmos_core::metrics::AffectCounters;
use atmos_core::store::EmotionalStateStore;
use atmos_core::types::{
    AgentId, Chronotype, Emotion, EmotionVector, PersonalityPreset, WorldId,
};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_emotion() -> impl Strategy<Value = Emotion> {
    (0..Emotion::ALL.len()).prop_map(|i| Emotion::ALL[i])
}

fn arb_vector() -> impl Strategy<Value = EmotionVector> {
    proptest::collection::vec(0.0..=100.0f32, 8).prop_map(|values| {
        let mut v = EmotionVector::ZERO;
        for (emotion, value) in Emotion::ALL.iter().zip(values) {
            v.set(*emotion, value);
        }
        v
    })
}

fn arb_preset() -> impl Strategy<Value = PersonalityPreset> {
    prop_oneof![
        Just(PersonalityPreset::Balanced),
        Just(PersonalityPreset::Cheerful),
        Just(PersonalityPreset::Melancholic),
        Just(PersonalityPreset::Anxious),
        Just(PersonalityPreset::Stoic),
        Just(PersonalityPreset::Hotheaded),
        Just(PersonalityPreset::Empathic),
    ]
}

fn in_range(v: &EmotionVector) -> bool {
    v.iter().all(|(_, value)| (0.0..=100.0).contains(&value))
}

// ---------------------------------------------------------------------------
// Decay
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn zero_minutes_is_identity(v in arb_vector(), regulation in 0.0..=100.0f32) {
        prop_assert_eq!(decay::decay_for(&v, 0.98, 0.0, regulation), v);
    }

    #[test]
    fn decay_is_compositional(
        v in arb_vector(),
        n in 0.0..600.0f64,
        m in 0.0..600.0f64,
        regulation in 0.0..=100.0f32,
    ) {
        let stepwise = decay::decay_for(
            &decay::decay_for(&v, 0.98, n, regulation),
            0.98,
            m,
            regulation,
        );
        let direct = decay::decay_for(&v, 0.98, n + m, regulation);
        prop_assert!(stepwise.max_abs_diff(&direct) < 1e-3);
    }

    #[test]
    fn decay_never_increases(v in arb_vector(), minutes in 0.0..10_000.0f64) {
        let decayed = decay::decay_for(&v, 0.98, minutes, 50.0);
        for emotion in Emotion::ALL {
            prop_assert!(decayed.get(emotion) <= v.get(emotion));
        }
    }
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn intensities_stay_in_range_after_triggers(
        preset in arb_preset(),
        triggers in proptest::collection::vec((arb_emotion(), -500.0..500.0f32, 0i64..120), 1..20),
    ) {
        let store = EmotionalStateStore::new(
            WorldId::new(),
            &AtmosConfig::default(),
            EventOutbox::default(),
            Arc::new(AffectCounters::new()),
        );
        let agent = AgentId::new();
        let mut now = Utc::now();
        store.initialize_agent(agent, preset, Chronotype::Neutral, now);
        for (emotion, intensity, minutes) in triggers {
            now += Duration::minutes(minutes);
            let state = store
                .trigger_emotion(agent, emotion, intensity, "proptest", now)
                .expect("known agent");
            prop_assert!(in_range(&state.emotions));
            prop_assert!((-100.0..=100.0).contains(&state.valence));
            prop_assert!((0.0..=100.0).contains(&state.arousal));
        }
    }
}

// ---------------------------------------------------------------------------
// Contagion
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn strength_is_symmetric_and_bounded(
        base in 0.0..2.0f32,
        a in -50.0..150.0f32,
        b in -50.0..150.0f32,
        bond in -50.0..150.0f32,
        proximity in 0.0..5.0f32,
    ) {
        let ab = calculate_contagion_strength(base, a, b, bond, proximity);
        let ba = calculate_contagion_strength(base, b, a, bond, proximity);
        prop_assert!((ab - ba).abs() < 1e-6);
        prop_assert!((0.0..=1.0).contains(&ab));
    }

    #[test]
    fn zero_strength_leaves_target(target in arb_vector(), source in arb_vector()) {
        let mut t = target;
        let transfer = apply_contagion(&mut t, &source, 0.0);
        prop_assert_eq!(t, target);
        prop_assert!(transfer.delta.abs() < f32::EPSILON);
    }

    #[test]
    fn full_strength_copies_source(target in arb_vector(), source in arb_vector()) {
        let mut t = target;
        apply_contagion(&mut t, &source, 1.0);
        prop_assert!(t.max_abs_diff(&source) < 1e-3);
    }

    #[test]
    fn contagion_stays_in_range(
        target in arb_vector(),
        source in arb_vector(),
        strength in -1.0..2.0f32,
    ) {
        let mut t = target;
        apply_contagion(&mut t, &source, strength);
        prop_assert!(in_range(&t));
    }
}

// ---------------------------------------------------------------------------
// Memory similarity
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn self_similarity_is_one(v in arb_vector()) {
        prop_assume!(v.total() > 1e-3);
        prop_assert!((state_similarity(&v, &v) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn similarity_is_bounded(a in arb_vector(), b in arb_vector()) {
        let s = state_similarity(&a, &b);
        prop_assert!((0.0..=1.0 + 1e-5).contains(&s));
    }
}
