//! Engine orchestrator: owns the agent arena and exposes the single
//! `step(dt)` entry point.
//!
//! Split into `mod.rs` (construction, lifecycle, mutators, queries),
//! `pipeline.rs` (the per-step phase sequence), and `metrics.rs`
//! (diagnostics/timing) — a three-way split separating what the arena is
//! from how it advances from how it's measured.

pub mod metrics;
pub mod pipeline;

pub use metrics::StepTimings;

use crate::agent::{Agent, AgentProfile, AgentType};
use crate::command::EngineCommand;
use crate::grid::SpatialGrid;
use crate::groups::{self, GroupStats};
use crate::obstacle::Obstacle;
use crate::params::{Capacities, ConfigError, SimParams};
use crate::resource::Resource;
use crate::rng;
use crate::snapshot::{self, SnapshotView};
use log::debug;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Config(ConfigError),
    ZeroAgents,
    AgentTypesLengthMismatch { expected: usize, actual: usize },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Config(e) => write!(f, "{e}"),
            EngineError::ZeroAgents => write!(f, "agent_types must contain at least one entry"),
            EngineError::AgentTypesLengthMismatch { expected, actual } => write!(
                f,
                "agent_types length ({actual}) does not match declared agent count ({expected})"
            ),
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::Config(err)
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EngineError::Config(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MutationError {
    ResourceCapacityExceeded { max: usize },
    ObstacleCapacityExceeded { max: usize },
    UnknownResourceId { id: usize },
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationError::ResourceCapacityExceeded { max } => {
                write!(f, "resource arena is full (capacity {max})")
            }
            MutationError::ObstacleCapacityExceeded { max } => {
                write!(f, "obstacle arena is full (capacity {max})")
            }
            MutationError::UnknownResourceId { id } => {
                write!(f, "no resource with id {id}")
            }
        }
    }
}

impl Error for MutationError {}

#[derive(Debug, Clone, Copy)]
pub struct Diagnostics {
    pub mean_speed: f32,
    pub std_speed: f32,
    pub rg: f32,
    pub polarization: f32,
}

#[derive(Debug)]
pub struct Engine {
    /// Exposed directly so a scenario test or an embedding renderer can
    /// script exact agent state without a dedicated setter per field.
    pub agents: Vec<Agent>,
    pub(crate) profiles: [AgentProfile; 4],
    pub(crate) agent_types: Vec<AgentType>,
    pub resources: Vec<Resource>,
    pub(crate) obstacles: Vec<Obstacle>,
    pub(crate) grid: SpatialGrid,
    pub(crate) params: SimParams,
    pub(crate) capacities: Capacities,
    pub(crate) master_seed: u64,
    pub(crate) init_box_size: f32,
    pub(crate) step_counter: u64,
    pub(crate) running: bool,
    pub(crate) groups: Vec<GroupStats>,
    pub(crate) pending: Vec<EngineCommand>,
}

impl Engine {
    /// Construct an arena sized by `agent_types.len()`, validated but not
    /// yet populated — call [`Engine::initialize`] to seed positions.
    pub fn new(
        params: SimParams,
        agent_types: &[AgentType],
        capacities: Capacities,
    ) -> Self {
        Self::try_new(params, agent_types, capacities).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(
        params: SimParams,
        agent_types: &[AgentType],
        capacities: Capacities,
    ) -> Result<Self, EngineError> {
        params.validate()?;
        if agent_types.is_empty() {
            return Err(EngineError::ZeroAgents);
        }
        if agent_types.len() > capacities.max_agents {
            return Err(EngineError::AgentTypesLengthMismatch {
                expected: capacities.max_agents,
                actual: agent_types.len(),
            });
        }

        let profiles = AgentProfile::default_table();
        let grid = SpatialGrid::new(
            params.cell_size(),
            params.boundary.box_size,
            params.boundary.mode,
            params.boundary.two_d,
        );

        let agents = agent_types
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                Agent::new(t, [0.0; 3], [0.0; 3], profiles[t.index()].mass, 0.0, rng::derive_seed(0, i as u32))
            })
            .collect();

        Ok(Self {
            agents,
            profiles,
            agent_types: agent_types.to_vec(),
            resources: Vec::with_capacity(capacities.max_resources),
            obstacles: Vec::with_capacity(capacities.max_obstacles),
            grid,
            params,
            capacities,
            master_seed: 0,
            init_box_size: params.boundary.box_size,
            step_counter: 0,
            running: false,
            groups: Vec::new(),
            pending: Vec::new(),
        })
    }

    /// Re-seed the RNGs and randomize every agent's position/velocity
    /// within `init_box_size`. Energy resets to `energy_max`.
    pub fn initialize(&mut self, init_box_size: f32, seed: u64) {
        self.master_seed = seed;
        self.init_box_size = init_box_size;
        self.step_counter = 0;
        self.groups.clear();

        let mut init_rng = ChaCha12Rng::seed_from_u64(seed);
        let v0 = self.params.rayleigh.v0;
        let energy_max = self.params.foraging.energy_max;
        let half = init_box_size * 0.5;

        for (i, agent) in self.agents.iter_mut().enumerate() {
            let mut rng_state = rng::derive_seed(seed, i as u32);
            agent.position = [
                init_rng.random_range(-half..half),
                init_rng.random_range(-half..half),
                if self.params.boundary.two_d {
                    0.0
                } else {
                    init_rng.random_range(-half..half)
                },
            ];
            let direction = rng::uniform_unit_sphere(&mut rng_state);
            agent.velocity = [direction[0] * v0, direction[1] * v0, direction[2] * v0];
            agent.acceleration = [0.0; 3];
            agent.energy = energy_max;
            agent.alive = true;
            agent.has_target = false;
            agent.target_resource_id = -1;
            agent.target_prey_id = -1;
            agent.group_id = -1;
            agent.last_attack_step = -1;
            agent.rng_state = rng_state;
        }
        groups::initialize_labels(&mut self.agents, self.params.groups.max_groups);
    }

    /// Re-seed and re-randomize with the engine's last-used seed and box.
    pub fn reset(&mut self) {
        self.initialize(self.init_box_size, self.master_seed);
    }

    /// Swap the parameter block wholesale; applies starting with the next
    /// `step()`. If the grid cell size changes, the grid is rebuilt lazily
    /// on the next step's rebuild phase. Agent count is fixed at
    /// construction and is not affected by this call — build a new `Engine`
    /// to change `N`.
    pub fn update_params(&mut self, new_params: SimParams) -> Result<(), EngineError> {
        new_params.validate()?;
        if new_params.cell_size() != self.params.cell_size()
            || new_params.boundary.box_size != self.params.boundary.box_size
            || new_params.boundary.mode != self.params.boundary.mode
            || new_params.boundary.two_d != self.params.boundary.two_d
        {
            self.grid = SpatialGrid::new(
                new_params.cell_size(),
                new_params.boundary.box_size,
                new_params.boundary.mode,
                new_params.boundary.two_d,
            );
        }
        self.params = new_params;
        Ok(())
    }

    /// Queue a command; drained before the next `step()`.
    pub fn enqueue_command(&mut self, command: EngineCommand) {
        self.pending.push(command);
    }

    pub(crate) fn drain_commands(&mut self) {
        let commands = std::mem::take(&mut self.pending);
        for command in commands {
            match command {
                EngineCommand::Start => self.running = true,
                EngineCommand::Pause => self.running = false,
                EngineCommand::Reset => self.reset(),
                EngineCommand::UpdateParams(p) => {
                    let _ = self.update_params(*p);
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn add_resource(&mut self, resource: Resource) -> Result<usize, MutationError> {
        if self.resources.len() >= self.capacities.max_resources {
            debug!(
                "resource arena full (capacity {}), rejecting add_resource",
                self.capacities.max_resources
            );
            return Err(MutationError::ResourceCapacityExceeded {
                max: self.capacities.max_resources,
            });
        }
        self.resources.push(resource);
        Ok(self.resources.len() - 1)
    }

    pub fn remove_resource(&mut self, id: usize) -> Result<(), MutationError> {
        let resource = self
            .resources
            .get_mut(id)
            .ok_or(MutationError::UnknownResourceId { id })?;
        resource.active = false;
        Ok(())
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> Result<usize, MutationError> {
        if self.obstacles.len() >= self.capacities.max_obstacles {
            debug!(
                "obstacle arena full (capacity {}), rejecting add_obstacle",
                self.capacities.max_obstacles
            );
            return Err(MutationError::ObstacleCapacityExceeded {
                max: self.capacities.max_obstacles,
            });
        }
        self.obstacles.push(obstacle);
        Ok(self.obstacles.len() - 1)
    }

    pub fn alive_count(&self) -> usize {
        self.agents.iter().filter(|a| a.alive).count()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn get_groups(&self) -> &[GroupStats] {
        &self.groups
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let stats = snapshot::compute_stats(&self.agents, self.groups.len() as u32);
        Diagnostics {
            mean_speed: stats.mean_speed,
            std_speed: stats.std_speed,
            rg: stats.rg,
            polarization: stats.polarization,
        }
    }

    pub fn snapshot(&self) -> SnapshotView {
        let stats = snapshot::compute_stats(&self.agents, self.groups.len() as u32);
        SnapshotView::capture(&self.agents, &self.resources, &self.groups, self.step_counter, stats)
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn step_counter(&self) -> u64 {
        self.step_counter
    }
}
