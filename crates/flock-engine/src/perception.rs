//! FOV-filtered neighborhood queries on top of the spatial grid.

use crate::agent::{Agent, AgentProfile};
use crate::grid::{pbc_delta, SpatialGrid};
use crate::params::BoundaryMode;

const DEGENERATE_VELOCITY_EPS: f32 = 1e-6;

/// True iff `j` falls within `i`'s field-of-view cone, or `i`'s velocity is
/// too small to define a facing direction (omnidirectional fallback).
#[inline]
pub fn in_fov(viewer: &Agent, delta_to_target: [f32; 3], profile: &AgentProfile) -> bool {
    if !profile.fov_enabled {
        return true;
    }
    let v = viewer.velocity;
    let v_norm_sq = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
    if v_norm_sq < DEGENERATE_VELOCITY_EPS * DEGENERATE_VELOCITY_EPS {
        return true;
    }
    let d = delta_to_target;
    let d_norm_sq = d[0] * d[0] + d[1] * d[1] + d[2] * d[2];
    if d_norm_sq < DEGENERATE_VELOCITY_EPS * DEGENERATE_VELOCITY_EPS {
        return true;
    }
    let dot = v[0] * d[0] + v[1] * d[1] + v[2] * d[2];
    let cos_angle = dot / (v_norm_sq.sqrt() * d_norm_sq.sqrt());
    let cos_angle = cos_angle.clamp(-1.0, 1.0);
    cos_angle.acos() <= profile.fov_angle * 0.5
}

/// Collect visible, alive, in-range neighbor indices of agent `i` into `out`
/// (cleared first). `r_cut` is the query radius.
#[allow(clippy::too_many_arguments)]
pub fn collect_visible_neighbors(
    grid: &SpatialGrid,
    agents: &[Agent],
    i: usize,
    r_cut: f32,
    mode: BoundaryMode,
    box_size: f32,
    profiles: &[AgentProfile; 4],
    out: &mut Vec<u32>,
) {
    out.clear();
    let me = &agents[i];
    if !me.alive {
        return;
    }
    let profile = &profiles[me.agent_type.index()];
    let r_cut_sq = r_cut * r_cut;

    grid.for_each_in_neighboring_cells(me.cell_id, |j| {
        let j = j as usize;
        if j == i {
            return;
        }
        let other = &agents[j];
        if !other.alive {
            return;
        }
        let raw_delta = [
            other.position[0] - me.position[0],
            other.position[1] - me.position[1],
            other.position[2] - me.position[2],
        ];
        let delta = pbc_delta(raw_delta, mode, box_size);
        let dist_sq = delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2];
        if dist_sq > r_cut_sq {
            return;
        }
        if !in_fov(me, delta, profile) {
            return;
        }
        out.push(j as u32);
    });
}
