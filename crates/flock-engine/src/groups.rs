//! Label-propagation group clustering and per-group aggregate stats.
//!
//! Runs every `interval_k` steps. Propagation alternates read/write label
//! buffers across iterations so a pass's outcome never depends on agent
//! iteration order, the same double-buffering discipline
//! `other_examples/vicseksim-rs` uses for its Vicsek velocity update.

use crate::agent::Agent;
use crate::grid::pbc_delta;
use crate::params::{BoundaryMode, SimParams};
use rayon::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct GroupStats {
    pub id: i32,
    pub size: u32,
    pub centroid: [f32; 3],
    pub mean_velocity: [f32; 3],
    pub radius: f32,
}

/// Assign initial group labels on first run: `i % max_groups` for live
/// non-predators, `-1` for predators and the dead.
pub fn initialize_labels(agents: &mut [Agent], max_groups: i32) {
    for (i, agent) in agents.iter_mut().enumerate() {
        agent.group_id = if agent.alive && !agent.agent_type.is_predator() {
            (i as i32).rem_euclid(max_groups.max(1))
        } else {
            -1
        };
    }
}

fn angle_between(a: [f32; 3], b: [f32; 3]) -> f32 {
    let na = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
    let nb = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
    if na < 1e-8 || nb < 1e-8 {
        return 0.0;
    }
    let dot = (a[0] * b[0] + a[1] * b[1] + a[2] * b[2]) / (na * nb);
    dot.clamp(-1.0, 1.0).acos()
}

/// Run `n_iterations` passes of label propagation among live, visible,
/// velocity-aligned neighbors within `r_cluster`.
pub fn propagate(agents: &mut [Agent], params: &SimParams) {
    let n = agents.len();
    let r_cluster_sq = params.groups.r_cluster * params.groups.r_cluster;
    let theta = params.groups.theta_cluster;
    let mode = params.boundary.mode;
    let box_size = params.boundary.box_size;

    let mut labels: Vec<i32> = agents.iter().map(|a| a.group_id).collect();

    for _ in 0..params.groups.n_iterations {
        let snapshot_positions: Vec<[f32; 3]> = agents.iter().map(|a| a.position).collect();
        let snapshot_velocities: Vec<[f32; 3]> = agents.iter().map(|a| a.velocity).collect();
        let snapshot_alive: Vec<bool> = agents.iter().map(|a| a.alive).collect();
        let snapshot_predator: Vec<bool> = agents.iter().map(|a| a.agent_type.is_predator()).collect();
        let read_labels = labels.clone();

        let new_labels: Vec<i32> = (0..n)
            .into_par_iter()
            .map(|i| {
                if !snapshot_alive[i] || snapshot_predator[i] {
                    return -1;
                }
                let mut counts: HashMap<i32, u32> = HashMap::new();
                *counts.entry(read_labels[i]).or_insert(0) += 1;

                for j in 0..n {
                    if j == i || !snapshot_alive[j] || snapshot_predator[j] {
                        continue;
                    }
                    let delta = pbc_delta(
                        [
                            snapshot_positions[j][0] - snapshot_positions[i][0],
                            snapshot_positions[j][1] - snapshot_positions[i][1],
                            snapshot_positions[j][2] - snapshot_positions[i][2],
                        ],
                        mode,
                        box_size,
                    );
                    let dist_sq = delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2];
                    if dist_sq > r_cluster_sq {
                        continue;
                    }
                    if angle_between(snapshot_velocities[i], snapshot_velocities[j]) > theta {
                        continue;
                    }
                    if read_labels[j] >= 0 {
                        *counts.entry(read_labels[j]).or_insert(0) += 1;
                    }
                }

                // Mode of neighbor labels, ties broken by lowest label.
                counts
                    .into_iter()
                    .max_by(|(label_a, count_a), (label_b, count_b)| {
                        count_a.cmp(count_b).then(label_b.cmp(label_a))
                    })
                    .map(|(label, _)| label)
                    .unwrap_or(read_labels[i])
            })
            .collect();

        labels = new_labels;
    }

    for (agent, label) in agents.iter_mut().zip(labels.into_iter()) {
        if agent.alive && !agent.agent_type.is_predator() {
            agent.group_id = label;
        }
    }
}

/// Compute per-group aggregates (size, PBC-aware centroid, mean velocity,
/// radius) over the current labels. Groups are returned sorted by id.
pub fn aggregate(agents: &[Agent], mode: BoundaryMode, box_size: f32) -> Vec<GroupStats> {
    let mut members: HashMap<i32, Vec<usize>> = HashMap::new();
    for (i, agent) in agents.iter().enumerate() {
        if agent.alive && agent.group_id >= 0 {
            members.entry(agent.group_id).or_default().push(i);
        }
    }

    let mut groups: Vec<GroupStats> = members
        .into_iter()
        .map(|(id, indices)| {
            let n = indices.len() as f32;
            let reference = agents[indices[0]].position;
            let mut centroid = [0.0f32; 3];
            let mut mean_velocity = [0.0f32; 3];
            for &i in &indices {
                let delta = pbc_delta(
                    [
                        agents[i].position[0] - reference[0],
                        agents[i].position[1] - reference[1],
                        agents[i].position[2] - reference[2],
                    ],
                    mode,
                    box_size,
                );
                for d in 0..3 {
                    centroid[d] += delta[d];
                    mean_velocity[d] += agents[i].velocity[d];
                }
            }
            for d in 0..3 {
                centroid[d] = centroid[d] / n + reference[d];
                mean_velocity[d] /= n;
            }

            let mut radius = 0.0f32;
            for &i in &indices {
                let delta = pbc_delta(
                    [
                        agents[i].position[0] - centroid[0],
                        agents[i].position[1] - centroid[1],
                        agents[i].position[2] - centroid[2],
                    ],
                    mode,
                    box_size,
                );
                let dist = (delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2]).sqrt();
                radius = radius.max(dist);
            }

            GroupStats {
                id,
                size: indices.len() as u32,
                centroid,
                mean_velocity,
                radius,
            }
        })
        .collect();

    groups.sort_by_key(|g| g.id);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentType;

    #[test]
    fn initialize_labels_skips_predators_and_dead() {
        let mut agents = vec![
            Agent::new(AgentType::Follower, [0.0; 3], [0.0; 3], 1.0, 100.0, 1),
            Agent::new(AgentType::Predator, [0.0; 3], [0.0; 3], 1.0, 100.0, 2),
        ];
        agents[0].kill();
        initialize_labels(&mut agents, 4);
        assert_eq!(agents[0].group_id, -1);
        assert_eq!(agents[1].group_id, -1);
    }

    #[test]
    fn clustered_aligned_agents_converge_to_one_label() {
        let mut params = SimParams::default();
        params.groups.r_cluster = 5.0;
        params.groups.theta_cluster = std::f32::consts::PI;
        params.groups.n_iterations = 5;
        params.groups.max_groups = 8;

        let mut agents = vec![
            Agent::new(AgentType::Follower, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], 1.0, 100.0, 1),
            Agent::new(AgentType::Follower, [1.0, 0.0, 0.0], [1.0, 0.0, 0.0], 1.0, 100.0, 2),
            Agent::new(AgentType::Follower, [2.0, 0.0, 0.0], [1.0, 0.0, 0.0], 1.0, 100.0, 3),
        ];
        initialize_labels(&mut agents, params.groups.max_groups);
        propagate(&mut agents, &params);

        let labels: Vec<i32> = agents.iter().map(|a| a.group_id).collect();
        assert!(labels.iter().all(|&l| l == labels[0]));
    }

    #[test]
    fn aggregate_computes_centroid_and_radius() {
        let mut agents = vec![
            Agent::new(AgentType::Follower, [-1.0, 0.0, 0.0], [0.0; 3], 1.0, 100.0, 1),
            Agent::new(AgentType::Follower, [1.0, 0.0, 0.0], [0.0; 3], 1.0, 100.0, 2),
        ];
        agents[0].group_id = 0;
        agents[1].group_id = 0;
        let groups = aggregate(&agents, BoundaryMode::Periodic, 100.0);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].size, 2);
        assert!(groups[0].centroid[0].abs() < 1e-4);
        assert!((groups[0].radius - 1.0).abs() < 1e-4);
    }
}
