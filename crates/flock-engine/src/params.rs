//! Simulation parameter blocks and their validation.
//!
//! `SimParams` is replaced wholesale on `Engine::update_params`, never
//! mutated field-by-field while a step is in flight.

use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryMode {
    Periodic,
    Reflective,
    Absorbing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MorseParams {
    pub ca: f32,
    pub cr: f32,
    pub la: f32,
    pub lr: f32,
    pub rc: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RayleighParams {
    pub alpha: f32,
    pub v0: f32,
    /// `v_cap = v0_preferred_speed * health_multiplier * speed_cap_multiplier`.
    pub speed_cap_multiplier: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlignmentParams {
    pub beta: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NoiseParams {
    pub eta: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RepulsionParams {
    pub min_dist: f32,
    pub repulsion_k: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundaryParams {
    pub mode: BoundaryMode,
    pub box_size: f32,
    pub wall_stiffness: f32,
    /// When true the z axis is pinned to 0 and Vicsek noise rotates in-plane
    /// instead of sampling a 3D rotation axis.
    pub two_d: bool,
}

/// Health-band thresholds and the speed multiplier each band applies to
/// `v0_preferred_speed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HealthBandParams {
    pub healthy_min: f32,
    pub tired_min: f32,
    pub weak_min: f32,
    pub healthy_multiplier: f32,
    pub tired_multiplier: f32,
    pub weak_multiplier: f32,
    pub dying_multiplier: f32,
}

impl Default for HealthBandParams {
    fn default() -> Self {
        Self {
            healthy_min: 50.0,
            tired_min: 30.0,
            weak_min: 15.0,
            healthy_multiplier: 1.00,
            tired_multiplier: 0.85,
            weak_multiplier: 0.60,
            dying_multiplier: 0.30,
        }
    }
}

impl HealthBandParams {
    /// Speed multiplier for a given energy level.
    pub fn multiplier_for(&self, energy: f32) -> f32 {
        if energy > self.healthy_min {
            self.healthy_multiplier
        } else if energy > self.tired_min {
            self.tired_multiplier
        } else if energy > self.weak_min {
            self.weak_multiplier
        } else {
            self.dying_multiplier
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForagingParams {
    pub energy_max: f32,
    pub energy_threshold: f32,
    pub consumption_per_step: f32,
    pub passive_energy_loss: f32,
    pub foraging_strength: f32,
    pub health_bands: HealthBandParams,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PredationParams {
    pub attack_radius: f32,
    pub cooldown: i32,
    pub search_horizon: f32,
    pub energy_reward: f32,
    pub base_success: f32,
    pub speed_diff_coeff: f32,
    pub weak_prey_coeff: f32,
    pub predator_energy_coeff: f32,
    pub protector_coeff: f32,
    pub min_success: f32,
    pub max_success: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GroupParams {
    pub r_cluster: f32,
    pub theta_cluster: f32,
    pub n_iterations: u32,
    pub interval_k: u32,
    pub max_groups: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GoalParams {
    pub enabled: bool,
    pub position: [f32; 3],
    pub strength: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObstacleParams {
    pub influence_radius: f32,
    pub strength: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Capacities {
    pub max_agents: usize,
    pub max_resources: usize,
    pub max_obstacles: usize,
    pub max_groups: usize,
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            max_agents: 10_000,
            max_resources: 256,
            max_obstacles: 64,
            max_groups: 128,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimParams {
    pub morse: MorseParams,
    pub rayleigh: RayleighParams,
    pub alignment: AlignmentParams,
    pub noise: NoiseParams,
    pub repulsion: RepulsionParams,
    pub boundary: BoundaryParams,
    pub foraging: ForagingParams,
    pub predation: PredationParams,
    pub groups: GroupParams,
    pub goal: GoalParams,
    pub obstacle: ObstacleParams,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            morse: MorseParams {
                ca: 1.5,
                cr: 2.0,
                la: 2.5,
                lr: 0.5,
                rc: 15.0,
            },
            rayleigh: RayleighParams {
                alpha: 1.0,
                v0: 1.0,
                speed_cap_multiplier: 2.0,
            },
            alignment: AlignmentParams { beta: 1.0 },
            noise: NoiseParams { eta: 0.1 },
            repulsion: RepulsionParams {
                min_dist: 0.3,
                repulsion_k: 5.0,
            },
            boundary: BoundaryParams {
                mode: BoundaryMode::Periodic,
                box_size: 100.0,
                wall_stiffness: 10.0,
                two_d: false,
            },
            foraging: ForagingParams {
                energy_max: 100.0,
                energy_threshold: 60.0,
                consumption_per_step: 0.5,
                passive_energy_loss: 0.05,
                foraging_strength: 1.0,
                health_bands: HealthBandParams::default(),
            },
            predation: PredationParams {
                attack_radius: 1.0,
                cooldown: 20,
                search_horizon: 20.0,
                energy_reward: 30.0,
                base_success: 0.5,
                speed_diff_coeff: 0.20,
                weak_prey_coeff: 0.15,
                predator_energy_coeff: 0.06,
                protector_coeff: 0.30,
                min_success: 0.05,
                max_success: 0.95,
            },
            groups: GroupParams {
                r_cluster: 5.0,
                theta_cluster: std::f32::consts::PI / 3.0,
                n_iterations: 5,
                interval_k: 10,
                max_groups: 64,
            },
            goal: GoalParams {
                enabled: false,
                position: [0.0; 3],
                strength: 1.0,
            },
            obstacle: ObstacleParams {
                influence_radius: 3.0,
                strength: 5.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NonFinite { field: &'static str },
    NotPositive { field: &'static str, value: f32 },
    Negative { field: &'static str, value: f32 },
    InvalidBounds { field: &'static str },
    ZeroCapacity { field: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonFinite { field } => write!(f, "parameter '{field}' must be finite"),
            ConfigError::NotPositive { field, value } => {
                write!(f, "parameter '{field}' must be positive, got {value}")
            }
            ConfigError::Negative { field, value } => {
                write!(f, "parameter '{field}' must be non-negative, got {value}")
            }
            ConfigError::InvalidBounds { field } => {
                write!(f, "parameter '{field}' has inconsistent bounds")
            }
            ConfigError::ZeroCapacity { field } => {
                write!(f, "capacity '{field}' must be greater than zero")
            }
        }
    }
}

impl Error for ConfigError {}

fn require_finite(value: f32, field: &'static str) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

fn require_positive(value: f32, field: &'static str) -> Result<(), ConfigError> {
    require_finite(value, field)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn require_non_negative(value: f32, field: &'static str) -> Result<(), ConfigError> {
    require_finite(value, field)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

impl SimParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive(self.morse.rc, "morse.rc")?;
        require_finite(self.morse.ca, "morse.ca")?;
        require_finite(self.morse.cr, "morse.cr")?;
        require_positive(self.morse.la, "morse.la")?;
        require_positive(self.morse.lr, "morse.lr")?;

        require_non_negative(self.rayleigh.alpha, "rayleigh.alpha")?;
        require_positive(self.rayleigh.v0, "rayleigh.v0")?;
        require_positive(
            self.rayleigh.speed_cap_multiplier,
            "rayleigh.speed_cap_multiplier",
        )?;

        require_non_negative(self.alignment.beta, "alignment.beta")?;
        require_non_negative(self.noise.eta, "noise.eta")?;

        require_non_negative(self.repulsion.min_dist, "repulsion.min_dist")?;
        require_non_negative(self.repulsion.repulsion_k, "repulsion.repulsion_k")?;

        require_positive(self.boundary.box_size, "boundary.box_size")?;
        require_non_negative(self.boundary.wall_stiffness, "boundary.wall_stiffness")?;

        require_positive(self.foraging.energy_max, "foraging.energy_max")?;
        require_non_negative(self.foraging.energy_threshold, "foraging.energy_threshold")?;
        require_non_negative(
            self.foraging.consumption_per_step,
            "foraging.consumption_per_step",
        )?;
        require_non_negative(
            self.foraging.passive_energy_loss,
            "foraging.passive_energy_loss",
        )?;
        require_non_negative(self.foraging.foraging_strength, "foraging.foraging_strength")?;
        let bands = &self.foraging.health_bands;
        if !(bands.weak_min < bands.tired_min && bands.tired_min < bands.healthy_min) {
            return Err(ConfigError::InvalidBounds {
                field: "foraging.health_bands",
            });
        }

        require_non_negative(self.predation.attack_radius, "predation.attack_radius")?;
        require_non_negative(self.predation.search_horizon, "predation.search_horizon")?;
        require_non_negative(self.predation.energy_reward, "predation.energy_reward")?;
        if !(0.0..=1.0).contains(&self.predation.min_success)
            || !(0.0..=1.0).contains(&self.predation.max_success)
            || self.predation.min_success > self.predation.max_success
        {
            return Err(ConfigError::InvalidBounds {
                field: "predation.success_bounds",
            });
        }

        require_non_negative(self.groups.r_cluster, "groups.r_cluster")?;
        require_non_negative(self.groups.theta_cluster, "groups.theta_cluster")?;
        if self.groups.max_groups <= 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "groups.max_groups",
            });
        }

        require_non_negative(self.obstacle.influence_radius, "obstacle.influence_radius")?;

        if self.morse.rc > self.boundary.box_size / 2.0 {
            return Err(ConfigError::InvalidBounds { field: "morse.rc" });
        }

        Ok(())
    }

    /// Grid cell size is always `2 * r_cutoff`.
    pub fn cell_size(&self) -> f32 {
        2.0 * self.morse.rc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        assert!(SimParams::default().validate().is_ok());
    }

    #[test]
    fn negative_rc_is_rejected() {
        let mut p = SimParams::default();
        p.morse.rc = -1.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn non_finite_is_rejected() {
        let mut p = SimParams::default();
        p.rayleigh.alpha = f32::NAN;
        assert!(matches!(p.validate(), Err(ConfigError::NonFinite { .. })));
    }

    #[test]
    fn inverted_health_bands_rejected() {
        let mut p = SimParams::default();
        p.foraging.health_bands.tired_min = 5.0;
        p.foraging.health_bands.weak_min = 10.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn zero_max_groups_rejected() {
        let mut p = SimParams::default();
        p.groups.max_groups = 0;
        assert!(matches!(
            p.validate(),
            Err(ConfigError::ZeroCapacity { .. })
        ));
    }

    #[test]
    fn cell_size_is_twice_cutoff() {
        let p = SimParams::default();
        assert_eq!(p.cell_size(), 2.0 * p.morse.rc);
    }
}
