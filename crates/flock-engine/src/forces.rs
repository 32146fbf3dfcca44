//! Physics kernel: per-agent force accumulation.
//!
//! Splits each phase into independent per-agent work, matching
//! `other_examples/vicseksim-rs`'s `rayon::par_iter_mut` double-buffered
//! step: forces are computed into a scratch acceleration buffer by an
//! immutable read of `agents`, then written back, so the parallel pass never
//! aliases a mutable and immutable borrow of the same slice.

use crate::agent::{Agent, AgentProfile};
use crate::grid::{pbc_delta, SpatialGrid};
use crate::obstacle::Obstacle;
use crate::params::SimParams;
use crate::perception::collect_visible_neighbors;
use crate::resource::Resource;
use rayon::prelude::*;

const EPS: f32 = 1e-8;

#[inline]
fn norm(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[inline]
fn add_scaled(acc: &mut [f32; 3], v: [f32; 3], s: f32) {
    acc[0] += v[0] * s;
    acc[1] += v[1] * s;
    acc[2] += v[2] * s;
}

#[inline]
fn normalize_or_zero(v: [f32; 3]) -> [f32; 3] {
    let n = norm(v);
    if n < EPS {
        [0.0; 3]
    } else {
        [v[0] / n, v[1] / n, v[2] / n]
    }
}

/// Recompute every live agent's `acceleration` from the current positions,
/// velocities, and targets. Does not move anyone; `integrator` owns that.
#[allow(clippy::too_many_arguments)]
pub fn accumulate(
    agents: &mut [Agent],
    profiles: &[AgentProfile; 4],
    resources: &[Resource],
    obstacles: &[Obstacle],
    grid: &SpatialGrid,
    params: &SimParams,
) {
    let n = agents.len();
    let box_size = params.boundary.box_size;
    let mode = params.boundary.mode;

    let new_accel: Vec<[f32; 3]> = (0..n)
        .into_par_iter()
        .map(|i| {
            let me = &agents[i];
            if !me.alive {
                return [0.0; 3];
            }
            let profile = &profiles[me.agent_type.index()];
            let mut force = [0.0f32; 3];
            let mut neighbors = Vec::new();
            collect_visible_neighbors(
                grid,
                agents,
                i,
                params.morse.rc,
                mode,
                box_size,
                profiles,
                &mut neighbors,
            );

            let mut velocity_sum = [0.0f32; 3];
            let mut velocity_count = 0usize;

            for &j in &neighbors {
                let other = &agents[j as usize];
                let raw_delta = [
                    other.position[0] - me.position[0],
                    other.position[1] - me.position[1],
                    other.position[2] - me.position[2],
                ];
                let delta = pbc_delta(raw_delta, mode, box_size);
                let r = norm(delta);
                if r < EPS {
                    continue;
                }

                // Morse pair force: coeff<0 repels, coeff>0 attracts.
                let coeff = (params.morse.ca / params.morse.la) * (-r / params.morse.la).exp()
                    - (params.morse.cr / params.morse.lr) * (-r / params.morse.lr).exp();
                add_scaled(&mut force, delta, coeff / r);

                // Soft-sphere repulsion at very short range.
                if r < params.repulsion.min_dist {
                    let mag = params.repulsion.repulsion_k * (params.repulsion.min_dist - r) / r;
                    add_scaled(&mut force, delta, -mag);
                }

                velocity_sum[0] += other.velocity[0];
                velocity_sum[1] += other.velocity[1];
                velocity_sum[2] += other.velocity[2];
                velocity_count += 1;
            }

            // Cucker-Smale alignment: mean-based, no contribution if no neighbors.
            if velocity_count > 0 {
                let inv = 1.0 / velocity_count as f32;
                let mean_v = [
                    velocity_sum[0] * inv,
                    velocity_sum[1] * inv,
                    velocity_sum[2] * inv,
                ];
                let diff = [
                    mean_v[0] - me.velocity[0],
                    mean_v[1] - me.velocity[1],
                    mean_v[2] - me.velocity[2],
                ];
                add_scaled(
                    &mut force,
                    diff,
                    params.alignment.beta * profile.beta_alignment_scale,
                );
            }

            // Rayleigh active force, health-band-scaled preferred speed.
            let health_mult = params.foraging.health_bands.multiplier_for(me.energy);
            let v0 = profile.v0_preferred_speed * health_mult;
            if v0 > EPS {
                let speed_sq = me.velocity[0] * me.velocity[0]
                    + me.velocity[1] * me.velocity[1]
                    + me.velocity[2] * me.velocity[2];
                let rayleigh_coeff = params.rayleigh.alpha * (1.0 - speed_sq / (v0 * v0));
                add_scaled(&mut force, me.velocity, rayleigh_coeff);
            }

            // Obstacle gradient.
            for obstacle in obstacles {
                let phi = obstacle.sdf(me.position);
                if phi < params.obstacle.influence_radius {
                    let grad = obstacle.gradient(me.position);
                    add_scaled(&mut force, grad, params.obstacle.strength);
                }
            }

            // Goal-seeking, per-type toggle.
            if params.goal.enabled && profile.seeks_goal {
                let raw = [
                    params.goal.position[0] - me.position[0],
                    params.goal.position[1] - me.position[1],
                    params.goal.position[2] - me.position[2],
                ];
                let delta = pbc_delta(raw, mode, box_size);
                let dir = normalize_or_zero(delta);
                add_scaled(&mut force, dir, params.goal.strength);
            }

            // Foraging attraction toward the selected resource.
            if !profile.is_predator && me.has_target && me.target_resource_id >= 0 {
                if let Some(resource) = resources.get(me.target_resource_id as usize) {
                    if resource.active {
                        let raw = [
                            resource.position[0] - me.position[0],
                            resource.position[1] - me.position[1],
                            resource.position[2] - me.position[2],
                        ];
                        let delta = pbc_delta(raw, mode, box_size);
                        let dir = normalize_or_zero(delta);
                        add_scaled(&mut force, dir, params.foraging.foraging_strength);
                    }
                }
            }

            // Predation attraction toward the current prey target.
            if profile.is_predator && me.target_prey_id >= 0 {
                if let Some(prey) = agents.get(me.target_prey_id as usize) {
                    if prey.alive {
                        let raw = [
                            prey.position[0] - me.position[0],
                            prey.position[1] - me.position[1],
                            prey.position[2] - me.position[2],
                        ];
                        let delta = pbc_delta(raw, mode, box_size);
                        let dir = normalize_or_zero(delta);
                        add_scaled(&mut force, dir, params.foraging.foraging_strength);
                    }
                }
            }

            let mass = me.mass.max(EPS);
            [force[0] / mass, force[1] / mass, force[2] / mass]
        })
        .collect();

    for (agent, accel) in agents.iter_mut().zip(new_accel.into_iter()) {
        agent.acceleration = accel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentType;
    use crate::params::BoundaryMode;

    fn grid_for(params: &SimParams) -> SpatialGrid {
        SpatialGrid::new(params.cell_size(), params.boundary.box_size, params.boundary.mode, false)
    }

    /// Two agents well inside the repulsive core should push apart.
    #[test]
    fn morse_force_is_repulsive_at_short_range() {
        let mut params = SimParams::default();
        params.morse = crate::params::MorseParams {
            ca: 1.5,
            cr: 2.0,
            la: 2.5,
            lr: 0.5,
            rc: 15.0,
        };
        params.alignment.beta = 0.0;
        params.rayleigh.alpha = 0.0;
        params.boundary.mode = BoundaryMode::Periodic;
        params.boundary.box_size = 100.0;

        let mut agents = vec![
            Agent::new(AgentType::Follower, [0.15, 0.0, 0.0], [0.0; 3], 1.0, 100.0, 1),
            Agent::new(AgentType::Follower, [-0.15, 0.0, 0.0], [0.0; 3], 1.0, 100.0, 2),
        ];
        let profiles = AgentProfile::default_table();
        let mut grid = grid_for(&params);
        grid.rebuild(&mut agents);
        accumulate(&mut agents, &profiles, &[], &[], &grid, &params);

        // Force on agent 0 should push it further from agent 1 (+x direction).
        assert!(agents[0].acceleration[0] > 0.0, "accel={:?}", agents[0].acceleration);
        assert!(agents[1].acceleration[0] < 0.0);
    }

    /// Two agents in the attractive shell should pull together.
    #[test]
    fn morse_force_is_attractive_at_medium_range() {
        let mut params = SimParams::default();
        params.alignment.beta = 0.0;
        params.rayleigh.alpha = 0.0;
        params.boundary.mode = BoundaryMode::Periodic;
        params.boundary.box_size = 100.0;

        let mut agents = vec![
            Agent::new(AgentType::Follower, [2.5, 0.0, 0.0], [0.0; 3], 1.0, 100.0, 1),
            Agent::new(AgentType::Follower, [-2.5, 0.0, 0.0], [0.0; 3], 1.0, 100.0, 2),
        ];
        let profiles = AgentProfile::default_table();
        let mut grid = grid_for(&params);
        grid.rebuild(&mut agents);
        accumulate(&mut agents, &profiles, &[], &[], &grid, &params);

        assert!(agents[0].acceleration[0] < 0.0, "accel={:?}", agents[0].acceleration);
        assert!(agents[1].acceleration[0] > 0.0);
    }

    #[test]
    fn no_neighbors_means_no_alignment_contribution() {
        let mut params = SimParams::default();
        params.alignment.beta = 5.0;
        params.rayleigh.alpha = 0.0;
        params.morse.rc = 1.0;

        let mut agents = vec![Agent::new(
            AgentType::Follower,
            [0.0; 3],
            [1.0, 0.0, 0.0],
            1.0,
            100.0,
            1,
        )];
        let profiles = AgentProfile::default_table();
        let mut grid = grid_for(&params);
        grid.rebuild(&mut agents);
        accumulate(&mut agents, &profiles, &[], &[], &grid, &params);
        assert_eq!(agents[0].acceleration, [0.0; 3]);
    }

    #[test]
    fn obstacle_pushes_agent_away() {
        let mut params = SimParams::default();
        params.alignment.beta = 0.0;
        params.rayleigh.alpha = 0.0;
        params.morse.ca = 0.0;
        params.morse.cr = 0.0;
        params.obstacle.influence_radius = 5.0;
        params.obstacle.strength = 2.0;

        let mut agents = vec![Agent::new(
            AgentType::Follower,
            [1.5, 0.0, 0.0],
            [0.0; 3],
            1.0,
            100.0,
            1,
        )];
        let profiles = AgentProfile::default_table();
        let obstacles = vec![Obstacle::Sphere {
            center: [0.0; 3],
            radius: 1.0,
        }];
        let mut grid = grid_for(&params);
        grid.rebuild(&mut agents);
        accumulate(&mut agents, &profiles, &[], &obstacles, &grid, &params);
        assert!(agents[0].acceleration[0] > 0.0);
    }
}
