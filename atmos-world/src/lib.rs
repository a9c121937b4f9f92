//! # atmos-world: World Integration for ATMOS
//!
//! This crate wires the game-agnostic `atmos-core` engine into a running
//! world: a clock, the signals a host game emits, and the tick scheduler that
//! runs the per-tick data flow.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                Host game                 │
//! │  ┌────────────────────────────────────┐  │
//! │  │          atmos-world               │  │
//! │  │  ┌──────────┐  ┌───────────────┐   │  │
//! │  │  │  Hooks   │─▶│    Systems    │   │  │
//! │  │  └──────────┘  └───────┬───────┘   │  │
//! │  │                        ▼           │  │
//! │  │  ┌──────────────────────────────┐  │  │
//! │  │  │   AffectWorld (tick loop)    │  │  │
//! │  │  └──────────────┬───────────────┘  │  │
//! │  │                 ▼                  │  │
//! │  │  ┌──────────────────────────────┐  │  │
//! │  │  │          atmos-core          │  │  │
//! │  │  └──────────────────────────────┘  │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `clock`: system and manual world clocks
//! - `config`: world-level config wrapping the core `AtmosConfig`
//! - `events`: signals emitted by external collaborators
//! - `hooks`: constructors the host calls to build signals
//! - `systems`: routing of signals into the core, proximity contagion
//! - `telemetry`: tracing subscriber setup
//! - `world`: `AffectWorld`, the tick scheduler

pub mod clock;
pub mod config;
pub mod events;
pub mod hooks;
pub mod systems;
pub mod telemetry;
pub mod world;

pub use clock::{ManualClock, SystemClock};
pub use config::WorldConfig;
pub use events::WorldSignal;
pub use world::{AffectWorld, TickReport};
