//! # ATMOS Core Library
//!
//! Game-agnostic affect engine: every character carries an emotional state,
//! and every crowd ends up with a mood.
//!
//! - **Emotional state**: eight Plutchik intensities with derived valence,
//!   arousal, dominance and a categorical mood, decaying lazily toward zero
//! - **Contagion**: emotions spread between bonded agents in proximity
//! - **Memory resonance**: emotion-tagged memories resurface under a matching state
//! - **Atmosphere**: the collective mood of a world as a time series
//! - **Weather**: a controller that lets the atmosphere steer the sky, and
//!   the sky nudge everyone back
//! - **Resonance chambers**: regions that amplify, dampen or transform the
//!   group emotion of their occupants
//!
//! ## Performance Contract
//!
//! - Trigger / contagion on one agent: < 10μs
//! - Atmosphere sample (500 agents): < 1ms
//! - Full world tick (500 agents, 5 chambers): < 5ms

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod atmosphere;
pub mod bond;
pub mod chamber;
pub mod config;
pub mod contagion;
pub mod decay;
pub mod error;
pub mod events;
pub mod memory;
pub mod metrics;
pub mod persistence;
pub mod state;
pub mod store;
pub mod tables;
pub mod types;
pub mod weather;

pub use atmosphere::{AtmosphereAggregator, AtmosphereSnapshot, Trend};
pub use bond::{BondLedger, BondSource, InteractionTone};
pub use chamber::{ResonanceChamber, ResonanceChamberField};
pub use config::AtmosConfig;
pub use error::{AtmosError, Result};
pub use events::{AffectEvent, EventOutbox};
pub use memory::{EmotionalMemory, MemoryResonanceIndex};
pub use persistence::PersistenceEngine;
pub use state::{AffectModel, AgentEmotionalProfile, EmotionalState};
pub use store::EmotionalStateStore;
pub use types::*;
pub use weather::{WeatherController, WeatherState, WeatherType};
