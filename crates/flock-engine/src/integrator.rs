//! Velocity Verlet integration with boundary resolution and Vicsek noise.
//!
//! Structured as two half-steps around a force recomputation, splitting the
//! velocity update itself in half around the boundary resolution, the way
//! `other_examples/vicseksim-rs` keeps its Vicsek update and its wall
//! handling as separate, sequential loops rather than fused into one.

use crate::agent::{Agent, AgentProfile};
use crate::params::{BoundaryMode, SimParams};
use crate::rng::{uniform, uniform_range, uniform_unit_sphere};
use rayon::prelude::*;

/// `v_half = v + 0.5*a*dt`, `x_new = x + v_half*dt`, boundary-resolved.
/// Leaves `agent.velocity` holding `v_half` so the caller can recompute
/// forces at the new position before calling [`half_step2`].
pub fn half_step1(agents: &mut [Agent], dt: f32, params: &SimParams) {
    let box_size = params.boundary.box_size;
    let mode = params.boundary.mode;
    let stiffness = params.boundary.wall_stiffness;

    agents.par_iter_mut().for_each(|agent| {
        if !agent.alive {
            return;
        }
        for d in 0..3 {
            agent.velocity[d] += 0.5 * agent.acceleration[d] * dt;
        }
        let mut x_new = [0.0f32; 3];
        for d in 0..3 {
            x_new[d] = agent.position[d] + agent.velocity[d] * dt;
        }
        resolve_boundary(&mut x_new, &mut agent.velocity, mode, box_size, stiffness);
        agent.position = x_new;
    });
}

/// `v_new = v_half + 0.5*a_new*dt`, then Vicsek noise and the speed cap.
/// `agent.acceleration` must already hold the force recomputed at the new
/// position.
pub fn half_step2(agents: &mut [Agent], profiles: &[AgentProfile; 4], dt: f32, params: &SimParams) {
    let two_d = params.boundary.two_d;
    let eta_scale = params.noise.eta;

    agents.par_iter_mut().for_each(|agent| {
        if !agent.alive {
            return;
        }
        for d in 0..3 {
            agent.velocity[d] += 0.5 * agent.acceleration[d] * dt;
        }

        let profile = &profiles[agent.agent_type.index()];
        let eta = eta_scale * profile.eta_noise;
        apply_vicsek_noise(agent, eta, two_d);

        let health_mult = params.foraging.health_bands.multiplier_for(agent.energy);
        let v_cap = profile.v0_preferred_speed * health_mult * params.rayleigh.speed_cap_multiplier;
        cap_speed(agent, v_cap);
    });
}

fn resolve_boundary(
    x_new: &mut [f32; 3],
    v_half: &mut [f32; 3],
    mode: BoundaryMode,
    box_size: f32,
    wall_stiffness: f32,
) {
    let half = box_size * 0.5;
    match mode {
        BoundaryMode::Periodic => {
            for d in 0..3 {
                x_new[d] = ((x_new[d] + half).rem_euclid(box_size)) - half;
            }
        }
        BoundaryMode::Reflective => {
            for d in 0..3 {
                if x_new[d] > half {
                    let overshoot = x_new[d] - half;
                    x_new[d] = half;
                    v_half[d] = -v_half[d] - wall_stiffness * overshoot;
                } else if x_new[d] < -half {
                    let overshoot = -half - x_new[d];
                    x_new[d] = -half;
                    v_half[d] = -v_half[d] + wall_stiffness * overshoot;
                }
            }
        }
        BoundaryMode::Absorbing => {
            for d in 0..3 {
                if x_new[d] > half {
                    x_new[d] = half;
                    v_half[d] = 0.0;
                } else if x_new[d] < -half {
                    x_new[d] = -half;
                    v_half[d] = 0.0;
                }
            }
        }
    }
}

fn apply_vicsek_noise(agent: &mut Agent, eta: f32, two_d: bool) {
    if eta <= 0.0 {
        return;
    }
    let speed = agent.speed();
    if speed <= 0.0 {
        return;
    }

    if two_d {
        let u = uniform(&mut agent.rng_state);
        let angle = u * 2.0 * eta - eta;
        let (s, c) = angle.sin_cos();
        let vx = agent.velocity[0];
        let vy = agent.velocity[1];
        agent.velocity[0] = vx * c - vy * s;
        agent.velocity[1] = vx * s + vy * c;
    } else {
        let angle = uniform_range(&mut agent.rng_state, -eta, eta);
        let axis = uniform_unit_sphere(&mut agent.rng_state);
        agent.velocity = rodrigues_rotate(agent.velocity, axis, angle);
    }
}

/// Rotate `v` around unit axis `k` by `angle` radians (Rodrigues' formula).
fn rodrigues_rotate(v: [f32; 3], k: [f32; 3], angle: f32) -> [f32; 3] {
    let (s, c) = angle.sin_cos();
    let k_dot_v = k[0] * v[0] + k[1] * v[1] + k[2] * v[2];
    let k_cross_v = [
        k[1] * v[2] - k[2] * v[1],
        k[2] * v[0] - k[0] * v[2],
        k[0] * v[1] - k[1] * v[0],
    ];
    [
        v[0] * c + k_cross_v[0] * s + k[0] * k_dot_v * (1.0 - c),
        v[1] * c + k_cross_v[1] * s + k[1] * k_dot_v * (1.0 - c),
        v[2] * c + k_cross_v[2] * s + k[2] * k_dot_v * (1.0 - c),
    ]
}

fn cap_speed(agent: &mut Agent, v_cap: f32) {
    let speed = agent.speed();
    if speed > v_cap && speed > 0.0 {
        let scale = v_cap / speed;
        for d in 0..3 {
            agent.velocity[d] *= scale;
        }
    }
}
