//! Heterogeneous agent-based flocking simulation: Morse pair forces,
//! Cucker-Smale alignment, Rayleigh active-speed forcing, Vicsek rotational
//! noise, foraging, predation, and label-propagation group detection.
//!
//! [`engine::Engine`] owns the agent arena and is the single entry point —
//! construct one with [`Engine::new`]/[`Engine::try_new`], seed it with
//! [`Engine::initialize`], and advance it with [`Engine::step`].

pub mod agent;
pub mod command;
pub mod engine;
pub mod foraging;
pub mod forces;
pub mod grid;
pub mod groups;
pub mod integrator;
pub mod obstacle;
pub mod params;
pub mod perception;
pub mod predation;
pub mod resource;
pub mod rng;
pub mod snapshot;

pub use agent::{Agent, AgentProfile, AgentType};
pub use command::EngineCommand;
pub use engine::{Diagnostics, Engine, EngineError, MutationError, StepTimings};
pub use grid::SpatialGrid;
pub use groups::GroupStats;
pub use obstacle::Obstacle;
pub use params::{Capacities, ConfigError, SimParams};
pub use resource::Resource;
pub use snapshot::{EngineStats, GroupSnapshot, ResourceSnapshot, SnapshotSummary, SnapshotView};
