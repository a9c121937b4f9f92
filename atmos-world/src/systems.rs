//! Systems that route world signals into the affect engine.
//!
//! Contagion only runs where a signal asks for it (a conversation starting)
//! and inside resonating chambers. Standing next to someone is not enough.
//!
//! ## Budget (per call):
//!
//! | System               | Budget  | Frequency          |
//! |----------------------|---------|--------------------|
//! | Signal observation   | 0.05ms  | On signal          |

use tracing::{debug, trace};

use atmos_core::bond::InteractionTone;
use atmos_core::types::{AgentId, Emotion};

use crate::events::WorldSignal;
use crate::world::AffectWorld;

/// Emotions a finished conversation leaves in both partners.
#[must_use]
pub fn tone_response(tone: InteractionTone) -> &'static [(Emotion, f32)] {
    match tone {
        InteractionTone::Warm => &[(Emotion::Joy, 10.0), (Emotion::Trust, 8.0)],
        InteractionTone::Neutral => &[],
        InteractionTone::Hostile => &[(Emotion::Anger, 15.0), (Emotion::Trust, -10.0)],
    }
}

/// Apply one signal. Returns the number of agents whose state or position changed.
pub fn observe_signal(world: &AffectWorld, signal: &WorldSignal) -> usize {
    trace!(at = %signal.at(), agents = signal.agents().len(), "observing signal");
    match signal {
        WorldSignal::ConversationStarted { initiator, partner, at } => {
            let proximity = world.config().world.conversation_proximity;
            [(*initiator, *partner), (*partner, *initiator)]
                .into_iter()
                .filter(|&(source, target)| {
                    world
                        .store()
                        .process_contagion(source, target, world.bonds(), proximity, *at)
                        .is_some()
                })
                .count()
        }

        WorldSignal::ConversationEnded { initiator, partner, tone, at } => {
            if initiator == partner
                || !world.store().contains(*initiator)
                || !world.store().contains(*partner)
            {
                return 0;
            }
            let bond = world.bonds().record_interaction(*initiator, *partner, *tone, *at);
            debug!(
                %initiator,
                %partner,
                ?tone,
                relationship = ?bond.relationship_type(),
                "conversation ended"
            );
            for agent in [*initiator, *partner] {
                for &(emotion, intensity) in tone_response(*tone) {
                    world.store().trigger_emotion(agent, emotion, intensity, "conversation", *at);
                }
            }
            2
        }

        WorldSignal::Environment { witnesses, emotion, intensity, cause, at } => witnesses
            .iter()
            .filter(|agent| {
                world
                    .store()
                    .trigger_emotion(**agent, *emotion, *intensity, cause, *at)
                    .is_some()
            })
            .count(),

        WorldSignal::Moved { agent, position, .. } => {
            usize::from(world.set_position(*agent, *position))
        }

        WorldSignal::MemoryFormed { agent, record, emotion, intensity, at } => {
            let Some(state) = world.store().emotional_state(*agent, *at) else {
                return 0;
            };
            world.memories().tag_memory(*agent, *record, *emotion, *intensity, state.valence, *at);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::WorldConfig;
    use crate::hooks;
    use atmos_core::bond::RelationshipType;
    use atmos_core::types::{Chronotype, MemoryId, PersonalityPreset, Position, WorldClock, WorldId};
    use chrono::Utc;
    use std::sync::Arc;

    fn world() -> AffectWorld {
        let mut config = WorldConfig::default();
        config.world.rng_seed = Some(1);
        let clock = Arc::new(ManualClock::new(Utc::now()));
        AffectWorld::new(WorldId::new(), config, clock as Arc<dyn WorldClock>)
    }

    fn spawn(world: &AffectWorld, preset: PersonalityPreset, position: Position) -> AgentId {
        let agent = AgentId::new();
        world.spawn_agent(agent, preset, Chronotype::Neutral, position);
        agent
    }

    #[test]
    fn conversation_start_spreads_both_ways() {
        let world = world();
        let a = spawn(&world, PersonalityPreset::Empathic, Position::default());
        let b = spawn(&world, PersonalityPreset::Empathic, Position::default());
        world.trigger_emotion(a, Emotion::Joy, 60.0, "news");
        let before = world.emotional_state(b).expect("exists").emotions.joy;

        let changed = observe_signal(&world, &hooks::on_conversation_started(a, b, world.now()));
        assert_eq!(changed, 2);
        assert!(world.emotional_state(b).expect("exists").emotions.joy > before);
    }

    #[test]
    fn warm_conversations_build_friendship() {
        let world = world();
        let a = spawn(&world, PersonalityPreset::Balanced, Position::default());
        let b = spawn(&world, PersonalityPreset::Balanced, Position::default());
        for _ in 0..6 {
            observe_signal(
                &world,
                &hooks::on_conversation_ended(a, b, InteractionTone::Warm, world.now()),
            );
        }
        let bond = world.bonds().bond(b, a).expect("recorded");
        assert_eq!(bond.relationship_type(), RelationshipType::Friend);
        assert!(world.emotional_state(a).expect("exists").emotions.trust > 25.0);
    }

    #[test]
    fn hostile_conversation_angers_both() {
        let world = world();
        let a = spawn(&world, PersonalityPreset::Balanced, Position::default());
        let b = spawn(&world, PersonalityPreset::Balanced, Position::default());
        observe_signal(
            &world,
            &hooks::on_conversation_ended(a, b, InteractionTone::Hostile, world.now()),
        );
        for agent in [a, b] {
            assert!(world.emotional_state(agent).expect("exists").emotions.anger > 5.0);
        }
    }

    #[test]
    fn environment_skips_unknown_witnesses() {
        let world = world();
        let a = spawn(&world, PersonalityPreset::Anxious, Position::default());
        let signal = hooks::on_environment(
            vec![a, AgentId::new()],
            Emotion::Fear,
            50.0,
            "explosion",
            world.now(),
        );
        assert_eq!(observe_signal(&world, &signal), 1);
        assert!(world.emotional_state(a).expect("exists").emotions.fear > 35.0);
    }

    #[test]
    fn movement_updates_positions() {
        let world = world();
        let a = spawn(&world, PersonalityPreset::Stoic, Position::default());
        let moved = observe_signal(
            &world,
            &hooks::on_moved(a, Position::new(3.0, 4.0), world.now()),
        );
        assert_eq!(moved, 1);
        assert_eq!(world.position(a), Some(Position::new(3.0, 4.0)));
        assert_eq!(
            observe_signal(
                &world,
                &hooks::on_moved(AgentId::new(), Position::default(), world.now()),
            ),
            0
        );
    }

    #[test]
    fn memory_formed_is_tagged_with_current_valence() {
        let world = world();
        let a = spawn(&world, PersonalityPreset::Cheerful, Position::default());
        let record = MemoryId::new();
        observe_signal(
            &world,
            &hooks::on_memory_formed(a, record, Emotion::Joy, 70.0, world.now()),
        );
        let memories = world.memories().memories_for(a);
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].record_id, record);
        assert!(memories[0].valence > 0.0);
    }

    #[test]
    fn neighbours_outside_chambers_do_not_share_feelings() {
        let world = world();
        let a = spawn(&world, PersonalityPreset::Empathic, Position::new(500.0, 500.0));
        let b = spawn(&world, PersonalityPreset::Empathic, Position::new(502.0, 502.0));
        world.trigger_emotion(a, Emotion::Sadness, 60.0, "loss");
        let before = world.emotional_state(b).expect("exists").emotions;

        let report = world.tick();
        assert!(report.resonances.is_empty());
        let after = world.emotional_state(b).expect("exists").emotions;
        // Sunny weather only feeds joy and anticipation; the clock did not move.
        assert!((after.sadness - before.sadness).abs() < 1e-4);
        assert!((after.fear - before.fear).abs() < 1e-4);
        assert!((after.anger - before.anger).abs() < 1e-4);
    }
}
