//! Resonance chambers: places that shape the feelings of those inside.
//!
//! A chamber is a fixed rectangle. Each tick its occupants are recomputed from
//! positions; with two or more occupants it resonates:
//!
//! - the occupants' majority dominant emotion becomes the chamber's emotion,
//!   and `resonance_intensity = alignment × mean intensity among holders`
//! - amplifiers push that emotion up by `(amplification − 1) · RI · share`,
//!   stabilizers (amplification < 1) push it down and pull occupants toward
//!   their baselines, transformers move part of a negative push onto its
//!   positive counterpart
//! - adjacent occupants (ordered by id) exchange contagion both ways with the
//!   chamber's contagion multiplier as proximity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::bond::BondSource;
use crate::config::ChamberConfig;
use crate::events::{AffectEvent, EventOutbox};
use crate::metrics::AffectCounters;
use crate::state::EmotionalState;
use crate::store::EmotionalStateStore;
use crate::types::{AgentId, ChamberId, Emotion, Position, Score};

/// What a chamber does to its occupants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChamberType {
    /// Strengthens the shared emotion.
    Amplifier,
    /// Calms occupants toward their baselines.
    Stabilizer,
    /// Turns negative emotions into their positive counterparts.
    Transformer,
}

impl fmt::Display for ChamberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Amplifier => "amplifier",
            Self::Stabilizer => "stabilizer",
            Self::Transformer => "transformer",
        })
    }
}

/// Which emotions a chamber resonates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResonanceTarget {
    /// Any emotion.
    All,
    /// Only this one.
    Emotion(Emotion),
}

impl ResonanceTarget {
    /// Whether the chamber resonates with `emotion`.
    #[must_use]
    pub fn matches(self, emotion: Emotion) -> bool {
        match self {
            Self::All => true,
            Self::Emotion(target) => target == emotion,
        }
    }
}

/// Axis-aligned rectangle, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower-left corner.
    pub min: Position,
    /// Upper-right corner.
    pub max: Position,
}

impl Bounds {
    /// Create bounds from two corners in any order.
    #[must_use]
    pub fn new(a: Position, b: Position) -> Self {
        Self {
            min: Position::new(a.x.min(b.x), a.y.min(b.y)),
            max: Position::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Whether `p` lies inside.
    #[must_use]
    pub fn contains(&self, p: Position) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Numeric effects of a chamber.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChamberEffects {
    /// Multiplier on the shared emotion; below 1 dampens.
    pub amplification: f32,
    /// Strength of the pull toward baseline (0–1).
    pub stabilization: f32,
    /// Energy change reported to a needs system per resonant tick.
    pub energy_modifier: f32,
    /// Social change reported to a needs system per resonant tick.
    pub social_modifier: f32,
}

/// Blueprint a chamber is created from at world start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChamberTemplate {
    /// Display name.
    pub name: String,
    /// Behaviour.
    pub chamber_type: ChamberType,
    /// Emotions it resonates with.
    pub resonance: ResonanceTarget,
    /// Region.
    pub bounds: Bounds,
    /// Extra proximity factor for contagion inside.
    pub contagion_multiplier: f32,
    /// Comfortable occupant count.
    pub capacity: usize,
    /// Numeric effects.
    pub effects: ChamberEffects,
}

/// A chamber placed in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceChamber {
    /// Identifier.
    pub id: ChamberId,
    /// Display name.
    pub name: String,
    /// Behaviour.
    pub chamber_type: ChamberType,
    /// Emotions it resonates with.
    pub resonance: ResonanceTarget,
    /// Region.
    pub bounds: Bounds,
    /// Extra proximity factor for contagion inside.
    pub contagion_multiplier: f32,
    /// Comfortable occupant count.
    pub capacity: usize,
    /// Occupants sorted by id, recomputed every tick.
    pub current_occupants: Vec<AgentId>,
    /// True iff at least two occupants.
    pub active_resonance: bool,
    /// Majority dominant emotion of the occupants.
    pub dominant_emotion: Option<Emotion>,
    /// Alignment × mean intensity among holders.
    pub resonance_intensity: f32,
    /// Numeric effects.
    pub effects: ChamberEffects,
}

impl ResonanceChamber {
    /// Place a chamber from a template.
    #[must_use]
    pub fn from_template(template: &ChamberTemplate) -> Self {
        Self {
            id: ChamberId::new(),
            name: template.name.clone(),
            chamber_type: template.chamber_type,
            resonance: template.resonance,
            bounds: template.bounds,
            contagion_multiplier: template.contagion_multiplier,
            capacity: template.capacity,
            current_occupants: Vec::new(),
            active_resonance: false,
            dominant_emotion: None,
            resonance_intensity: 0.0,
            effects: template.effects,
        }
    }

    /// Whether the chamber is at or above capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current_occupants.len() >= self.capacity
    }
}

/// Majority dominant emotion of a group and the resulting resonance intensity.
///
/// Returns `None` for an empty group. Ties resolve by enumeration order.
#[must_use]
pub fn group_resonance(states: &[EmotionalState]) -> Option<(Emotion, f32)> {
    if states.is_empty() {
        return None;
    }
    let mut counts = [0_usize; Emotion::ALL.len()];
    let mut strength = [0.0_f32; Emotion::ALL.len()];
    for state in states {
        let (emotion, value) = state.emotions.dominant();
        counts[emotion as usize] += 1;
        strength[emotion as usize] += value;
    }
    let mut best = 0;
    for slot in 1..counts.len() {
        if counts[slot] > counts[best] {
            best = slot;
        }
    }
    let alignment = counts[best] as f32 / states.len() as f32;
    let mean = strength[best] / counts[best] as f32;
    Some((Emotion::ALL[best], alignment * mean))
}

/// Summary of one chamber's resonant tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ChamberResonance {
    /// Chamber.
    pub chamber: ChamberId,
    /// Shared emotion.
    pub emotion: Emotion,
    /// Resonance intensity.
    pub intensity: f32,
    /// Occupants affected.
    pub occupants: Vec<AgentId>,
}

/// Best chamber for an agent, with its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChamberMatch {
    /// Chamber.
    pub chamber: ChamberId,
    /// Suitability score.
    pub score: Score,
}

/// All chambers of a world.
pub struct ResonanceChamberField {
    config: ChamberConfig,
    chambers: Vec<ResonanceChamber>,
    outbox: EventOutbox,
    counters: Arc<AffectCounters>,
}

impl ResonanceChamberField {
    /// Place one chamber per configured template.
    #[must_use]
    pub fn from_config(
        config: ChamberConfig,
        outbox: EventOutbox,
        counters: Arc<AffectCounters>,
    ) -> Self {
        let chambers = config.templates.iter().map(ResonanceChamber::from_template).collect();
        Self { config, chambers, outbox, counters }
    }

    /// Replace the chambers with saved ones.
    pub fn restore(&mut self, chambers: Vec<ResonanceChamber>) {
        self.chambers = chambers;
    }

    /// All chambers.
    #[must_use]
    pub fn chambers(&self) -> &[ResonanceChamber] {
        &self.chambers
    }

    /// One chamber by id.
    #[must_use]
    pub fn chamber(&self, id: ChamberId) -> Option<&ResonanceChamber> {
        self.chambers.iter().find(|c| c.id == id)
    }

    /// Recompute occupants from positions and flip activation.
    pub fn update_occupancy(&mut self, positions: &[(AgentId, Position)], now: DateTime<Utc>) {
        for chamber in &mut self.chambers {
            let mut occupants: Vec<AgentId> = positions
                .iter()
                .filter(|(_, p)| chamber.bounds.contains(*p))
                .map(|(id, _)| *id)
                .collect();
            occupants.sort();
            occupants.dedup();
            chamber.current_occupants = occupants;

            let was_active = chamber.active_resonance;
            chamber.active_resonance = chamber.current_occupants.len() >= 2;
            match (was_active, chamber.active_resonance) {
                (false, true) => {
                    debug!(
                        chamber = %chamber.name,
                        occupants = chamber.current_occupants.len(),
                        "chamber activated"
                    );
                    self.outbox.publish(AffectEvent::ChamberActivated {
                        chamber: chamber.id,
                        chamber_type: chamber.chamber_type,
                        occupants: chamber.current_occupants.len(),
                        at: now,
                    });
                }
                (true, false) => {
                    debug!(chamber = %chamber.name, "chamber deactivated");
                    chamber.dominant_emotion = None;
                    chamber.resonance_intensity = 0.0;
                    self.outbox.publish(AffectEvent::ChamberDeactivated {
                        chamber: chamber.id,
                        at: now,
                    });
                }
                _ => {}
            }
        }
    }

    /// Apply every active chamber's effects to its occupants.
    pub fn apply_resonance_effects(
        &mut self,
        store: &EmotionalStateStore,
        bonds: &dyn BondSource,
        now: DateTime<Utc>,
    ) -> Vec<ChamberResonance> {
        let mut resonances = Vec::new();
        for chamber in &mut self.chambers {
            if !chamber.active_resonance {
                continue;
            }
            let occupants: Vec<AgentId> = chamber
                .current_occupants
                .iter()
                .copied()
                .filter(|id| store.contains(*id))
                .collect();
            let states: Vec<EmotionalState> = occupants
                .iter()
                .filter_map(|id| store.emotional_state(*id, now))
                .collect();
            let resonance = if states.len() < 2 { None } else { group_resonance(&states) };
            let Some((emotion, intensity)) = resonance else {
                chamber.dominant_emotion = None;
                chamber.resonance_intensity = 0.0;
                continue;
            };
            chamber.dominant_emotion = Some(emotion);
            chamber.resonance_intensity = intensity;

            if chamber.resonance.matches(emotion) {
                let push = (chamber.effects.amplification - 1.0)
                    * intensity
                    * self.config.amplification_share;
                for &agent in &occupants {
                    apply_push(chamber, &self.config, store, agent, emotion, push, now);
                }
            }
            for pair in occupants.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                store.process_contagion(a, b, bonds, chamber.contagion_multiplier, now);
                store.process_contagion(b, a, bonds, chamber.contagion_multiplier, now);
            }

            AffectCounters::bump(&self.counters.chamber_resonances);
            trace!(
                chamber = %chamber.name,
                %emotion,
                intensity,
                occupants = occupants.len(),
                "chamber resonated"
            );
            self.outbox.publish(AffectEvent::ChamberResonated {
                chamber: chamber.id,
                emotion,
                intensity,
                energy_modifier: chamber.effects.energy_modifier,
                social_modifier: chamber.effects.social_modifier,
                occupants: occupants.clone(),
                at: now,
            });
            resonances.push(ChamberResonance {
                chamber: chamber.id,
                emotion,
                intensity,
                occupants,
            });
        }
        resonances
    }

    /// Rank chambers for an agent in `state`; returns the best positive match.
    ///
    /// Ties keep the earlier chamber.
    #[must_use]
    pub fn find_resonant_chamber(&self, state: &EmotionalState) -> Option<ChamberMatch> {
        let (dominant, _) = state.emotions.dominant();
        let mut best: Option<ChamberMatch> = None;
        for chamber in &self.chambers {
            let score = Score::new(chamber_score(chamber, state, dominant));
            if score.value() > 0.0 && best.is_none_or(|b| score > b.score) {
                best = Some(ChamberMatch { chamber: chamber.id, score });
            }
        }
        best
    }
}

fn apply_push(
    chamber: &ResonanceChamber,
    config: &ChamberConfig,
    store: &EmotionalStateStore,
    agent: AgentId,
    emotion: Emotion,
    push: f32,
    now: DateTime<Utc>,
) {
    match chamber.chamber_type {
        ChamberType::Amplifier => {
            store.trigger_emotion(agent, emotion, push, "chamber resonance", now);
        }
        ChamberType::Stabilizer => {
            store.trigger_emotion(agent, emotion, push, "chamber resonance", now);
            store.regulate_toward_baseline(
                agent,
                chamber.effects.stabilization * config.stabilization_rate,
                now,
            );
        }
        ChamberType::Transformer if emotion.is_negative() => {
            let moved = push.abs() * config.transform_share;
            store.trigger_emotion(agent, emotion, -moved, "chamber transformation", now);
            let counterpart = emotion.counterpart();
            store.trigger_emotion(agent, counterpart, moved, "chamber transformation", now);
        }
        ChamberType::Transformer => {
            store.trigger_emotion(agent, emotion, push, "chamber resonance", now);
        }
    }
}

fn chamber_score(chamber: &ResonanceChamber, state: &EmotionalState, dominant: Emotion) -> f32 {
    let mut score = 0.0;
    if chamber.resonance == ResonanceTarget::Emotion(dominant) {
        score += 50.0;
    }
    match chamber.chamber_type {
        ChamberType::Amplifier if state.arousal > 60.0 => score += 20.0,
        ChamberType::Stabilizer if state.arousal < 40.0 => score += 20.0,
        ChamberType::Transformer if state.valence.abs() < 20.0 => score += 15.0,
        _ => {}
    }
    if chamber.is_full() {
        score -= 30.0;
    }
    if chamber.active_resonance && chamber.dominant_emotion == Some(dominant) {
        score += 25.0;
    }
    score
}

/// The built-in chamber set.
#[must_use]
pub fn default_templates() -> Vec<ChamberTemplate> {
    let rect = |x0, y0, x1, y1| Bounds::new(Position::new(x0, y0), Position::new(x1, y1));
    let fx = |amplification, stabilization, energy_modifier, social_modifier| ChamberEffects {
        amplification,
        stabilization,
        energy_modifier,
        social_modifier,
    };
    vec![
        ChamberTemplate {
            name: "Hearth".to_string(),
            chamber_type: ChamberType::Amplifier,
            resonance: ResonanceTarget::Emotion(Emotion::Joy),
            bounds: rect(0.0, 0.0, 20.0, 20.0),
            contagion_multiplier: 1.5,
            capacity: 8,
            effects: fx(1.5, 0.0, 10.0, 15.0),
        },
        ChamberTemplate {
            name: "Quiet Garden".to_string(),
            chamber_type: ChamberType::Stabilizer,
            resonance: ResonanceTarget::All,
            bounds: rect(40.0, 0.0, 70.0, 30.0),
            contagion_multiplier: 0.5,
            capacity: 6,
            effects: fx(0.7, 0.8, 5.0, 0.0),
        },
        ChamberTemplate {
            name: "Arena".to_string(),
            chamber_type: ChamberType::Amplifier,
            resonance: ResonanceTarget::Emotion(Emotion::Anger),
            bounds: rect(100.0, 0.0, 130.0, 30.0),
            contagion_multiplier: 1.8,
            capacity: 12,
            effects: fx(1.6, 0.0, -10.0, 5.0),
        },
        ChamberTemplate {
            name: "Reflecting Pool".to_string(),
            chamber_type: ChamberType::Transformer,
            resonance: ResonanceTarget::All,
            bounds: rect(0.0, 50.0, 20.0, 70.0),
            contagion_multiplier: 1.0,
            capacity: 4,
            effects: fx(1.3, 0.3, 0.0, 5.0),
        },
        ChamberTemplate {
            name: "Chapel".to_string(),
            chamber_type: ChamberType::Stabilizer,
            resonance: ResonanceTarget::Emotion(Emotion::Trust),
            bounds: rect(40.0, 50.0, 60.0, 70.0),
            contagion_multiplier: 1.2,
            capacity: 10,
            effects: fx(0.8, 0.6, 5.0, 10.0),
        },
    ]
}
