//! Command channel: control messages applied strictly between steps.

use crate::params::SimParams;

/// A control message from the command channel. Never applied mid-step —
/// the orchestrator drains pending commands before each `step()`.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Start,
    Pause,
    Reset,
    UpdateParams(Box<SimParams>),
}
