//! Agent arena entry, role types, and per-role behavior profiles.

use serde::{Deserialize, Serialize};

/// Position/velocity sentinel magnitude for dead agents: far enough outside
/// any reasonable `box_size` that it never lands in a live grid cell.
pub const DEAD_SENTINEL: f32 = 1.0e6;

/// Agent role. `agent_type` lives exclusively here, as a single copy on the
/// agent itself rather than duplicated across a mixin and the agent struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AgentType {
    Follower = 0,
    Explorer = 1,
    Leader = 2,
    Predator = 3,
}

impl AgentType {
    pub const ALL: [AgentType; 4] = [
        AgentType::Follower,
        AgentType::Explorer,
        AgentType::Leader,
        AgentType::Predator,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn is_predator(self) -> bool {
        matches!(self, AgentType::Predator)
    }
}

/// Read-only, shared per-role parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AgentProfile {
    pub beta_alignment_scale: f32,
    pub eta_noise: f32,
    pub v0_preferred_speed: f32,
    pub fov_angle: f32,
    pub fov_enabled: bool,
    pub seeks_goal: bool,
    pub is_predator: bool,
    pub color: [u8; 3],
    pub mass: f32,
}

impl AgentProfile {
    fn follower() -> Self {
        Self {
            beta_alignment_scale: 1.0,
            eta_noise: 0.3,
            v0_preferred_speed: 1.0,
            fov_angle: std::f32::consts::PI * (270.0 / 180.0),
            fov_enabled: true,
            seeks_goal: false,
            is_predator: false,
            color: [80, 160, 220],
            mass: 1.0,
        }
    }

    fn explorer() -> Self {
        Self {
            beta_alignment_scale: 0.4,
            eta_noise: 0.6,
            v0_preferred_speed: 1.3,
            fov_angle: std::f32::consts::PI * (200.0 / 180.0),
            fov_enabled: true,
            seeks_goal: false,
            is_predator: false,
            color: [220, 200, 80],
            mass: 0.9,
        }
    }

    fn leader() -> Self {
        Self {
            beta_alignment_scale: 0.8,
            eta_noise: 0.15,
            v0_preferred_speed: 1.1,
            fov_angle: std::f32::consts::TAU,
            fov_enabled: false,
            seeks_goal: true,
            is_predator: false,
            color: [80, 220, 120],
            mass: 1.1,
        }
    }

    fn predator() -> Self {
        Self {
            beta_alignment_scale: 0.0,
            eta_noise: 0.2,
            v0_preferred_speed: 1.6,
            fov_angle: std::f32::consts::PI * (150.0 / 180.0),
            fov_enabled: true,
            seeks_goal: false,
            is_predator: true,
            color: [220, 60, 60],
            mass: 1.4,
        }
    }

    /// Default profile table, indexed by `AgentType::index()`.
    pub fn default_table() -> [AgentProfile; 4] {
        [
            Self::follower(),
            Self::explorer(),
            Self::leader(),
            Self::predator(),
        ]
    }
}

/// A single arena slot. Dead slots are never reused and are moved to
/// `DEAD_SENTINEL` so they fall out of every live grid cell.
#[derive(Debug, Clone, Copy)]
pub struct Agent {
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub acceleration: [f32; 3],
    pub mass: f32,
    pub agent_type: AgentType,
    pub energy: f32,
    pub alive: bool,
    pub target_resource_id: i32,
    pub target_prey_id: i32,
    pub has_target: bool,
    pub group_id: i32,
    pub rng_state: u32,
    pub last_attack_step: i32,
    pub cell_id: i32,
}

impl Agent {
    pub fn new(
        agent_type: AgentType,
        position: [f32; 3],
        velocity: [f32; 3],
        mass: f32,
        energy: f32,
        rng_state: u32,
    ) -> Self {
        Self {
            position,
            velocity,
            acceleration: [0.0; 3],
            mass,
            agent_type,
            energy,
            alive: true,
            target_resource_id: -1,
            target_prey_id: -1,
            has_target: false,
            group_id: -1,
            rng_state,
            last_attack_step: -1,
            cell_id: -1,
        }
    }

    /// Kill this agent in place.
    pub fn kill(&mut self) {
        self.alive = false;
        self.position = [DEAD_SENTINEL; 3];
        self.velocity = [0.0; 3];
        self.acceleration = [0.0; 3];
        self.energy = 0.0;
        self.has_target = false;
        self.target_resource_id = -1;
        self.target_prey_id = -1;
        self.group_id = -1;
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        (self.velocity[0] * self.velocity[0]
            + self.velocity[1] * self.velocity[1]
            + self.velocity[2] * self.velocity[2])
            .sqrt()
    }
}
