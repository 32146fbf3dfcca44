//! Read-only point-in-time views of engine state, plus the binary wire
//! frame the streaming collaborator consumes.
//!
//! The frame is hand-packed rather than derived through `serde` because its
//! layout is a fixed byte contract (header sizes, padding, reserved
//! regions) owned by an external consumer, not a Rust type shape. `serde`
//! stays in play for JSON-shaped config/summary types; anything with an
//! externally fixed byte layout is written by hand instead.

use crate::agent::Agent;
use crate::groups::GroupStats;
use crate::resource::Resource;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EngineStats {
    pub mean_speed: f32,
    pub std_speed: f32,
    pub rg: f32,
    pub polarization: f32,
    pub n_groups: u32,
}

/// Mean/std speed, radius of gyration, and polarization over live agents.
/// Returns all-zero stats when no agent is alive.
pub fn compute_stats(agents: &[Agent], n_groups: u32) -> EngineStats {
    let live: Vec<&Agent> = agents.iter().filter(|a| a.alive).collect();
    let n = live.len();
    if n == 0 {
        return EngineStats {
            n_groups,
            ..Default::default()
        };
    }

    let speeds: Vec<f32> = live.iter().map(|a| a.speed()).collect();
    let mean_speed = speeds.iter().sum::<f32>() / n as f32;
    let variance = speeds.iter().map(|s| (s - mean_speed).powi(2)).sum::<f32>() / n as f32;
    let std_speed = variance.sqrt();

    let mut centroid = [0.0f32; 3];
    for a in &live {
        for d in 0..3 {
            centroid[d] += a.position[d];
        }
    }
    for d in 0..3 {
        centroid[d] /= n as f32;
    }
    let rg_sq_mean = live
        .iter()
        .map(|a| {
            let dx = a.position[0] - centroid[0];
            let dy = a.position[1] - centroid[1];
            let dz = a.position[2] - centroid[2];
            dx * dx + dy * dy + dz * dz
        })
        .sum::<f32>()
        / n as f32;
    let rg = rg_sq_mean.sqrt();

    let mut sum_v = [0.0f32; 3];
    let mut sum_speed = 0.0f32;
    for a in &live {
        for d in 0..3 {
            sum_v[d] += a.velocity[d];
        }
        sum_speed += a.speed();
    }
    let sum_v_norm = (sum_v[0] * sum_v[0] + sum_v[1] * sum_v[1] + sum_v[2] * sum_v[2]).sqrt();
    let polarization = if sum_speed > 0.0 {
        sum_v_norm / sum_speed
    } else {
        0.0
    };

    EngineStats {
        mean_speed,
        std_speed,
        rg,
        polarization,
        n_groups,
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResourceSnapshot {
    pub position: [f32; 3],
    pub amount: f32,
    pub radius: f32,
    pub renewable: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GroupSnapshot {
    pub id: i32,
    pub size: i32,
    pub centroid: [f32; 3],
    pub velocity: [f32; 3],
    pub radius: f32,
}

impl From<GroupStats> for GroupSnapshot {
    fn from(g: GroupStats) -> Self {
        Self {
            id: g.id,
            size: g.size as i32,
            centroid: g.centroid,
            velocity: g.mean_velocity,
            radius: g.radius,
        }
    }
}

/// JSON-friendly projection of a [`SnapshotView`]: aggregate stats plus
/// resources/groups, without the per-agent arrays (those are large and
/// consumed through the binary wire frame instead).
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub n: u32,
    pub step: u64,
    pub stats: EngineStats,
    pub resources: Vec<ResourceSnapshot>,
    pub groups: Vec<GroupSnapshot>,
}

/// A point-in-time copy of everything a downstream renderer or streaming
/// consumer needs. Never mutates the engine.
#[derive(Debug, Clone)]
pub struct SnapshotView {
    pub n: u32,
    pub step: u64,
    pub positions: Vec<[f32; 3]>,
    pub velocities: Vec<[f32; 3]>,
    pub types: Vec<u8>,
    pub energies: Vec<f32>,
    /// The resource a forager is chasing, or the prey a predator is chasing;
    /// `-1` when untargeted.
    pub targets: Vec<i32>,
    pub group_labels: Vec<i32>,
    pub alive: Vec<bool>,
    pub stats: EngineStats,
    pub resources: Vec<ResourceSnapshot>,
    pub groups: Vec<GroupSnapshot>,
}

impl SnapshotView {
    pub fn capture(
        agents: &[Agent],
        resources: &[Resource],
        groups: &[GroupStats],
        step: u64,
        stats: EngineStats,
    ) -> Self {
        let n = agents.len();
        let mut positions = Vec::with_capacity(n);
        let mut velocities = Vec::with_capacity(n);
        let mut types = Vec::with_capacity(n);
        let mut energies = Vec::with_capacity(n);
        let mut targets = Vec::with_capacity(n);
        let mut group_labels = Vec::with_capacity(n);
        let mut alive = Vec::with_capacity(n);

        for agent in agents {
            positions.push(agent.position);
            velocities.push(agent.velocity);
            types.push(agent.agent_type as u8);
            energies.push(agent.energy);
            targets.push(if agent.agent_type.is_predator() {
                agent.target_prey_id
            } else {
                agent.target_resource_id
            });
            group_labels.push(agent.group_id);
            alive.push(agent.alive);
        }

        let resources = resources
            .iter()
            .map(|r| ResourceSnapshot {
                position: r.position,
                amount: r.amount,
                radius: r.radius,
                renewable: r.is_renewable(),
            })
            .collect();

        Self {
            n: n as u32,
            step,
            positions,
            velocities,
            types,
            energies,
            targets,
            group_labels,
            alive,
            stats,
            resources,
            groups: groups.iter().copied().map(GroupSnapshot::from).collect(),
        }
    }

    /// Serialize the aggregate-stats/resources/groups projection as a JSON
    /// string. Falls back to an empty-object literal on a serialization
    /// failure, which should not happen for this plain-data shape.
    pub fn to_json_summary(&self) -> String {
        let summary = SnapshotSummary {
            n: self.n,
            step: self.step,
            stats: self.stats,
            resources: self.resources.clone(),
            groups: self.groups.clone(),
        };
        serde_json::to_string(&summary).unwrap_or_else(|_| "{}".to_string())
    }

    /// Encode the little-endian binary wire frame consumed by the streaming
    /// collaborator.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let n = self.n as usize;
        let types_padded = n.div_ceil(4) * 4;
        let mut out = Vec::with_capacity(
            20 + n * (12 + 12 + 4 + 4 + 4) + types_padded + 64 + 4 + self.resources.len() * 24 + 4 + self.groups.len() * 36,
        );

        out.extend_from_slice(&self.n.to_le_bytes());
        out.extend_from_slice(&(self.step as u32).to_le_bytes());
        out.push(if self.resources.is_empty() { 0 } else { 1 });
        // has_obstacles: obstacles are never streamed, so this is always 0.
        // Groups-block presence is conveyed by its own length-prefixed count
        // further down, the same way the resources block is.
        out.push(0);
        out.extend_from_slice(&[0u8; 10]);

        for p in &self.positions {
            for c in p {
                out.extend_from_slice(&c.to_le_bytes());
            }
        }
        for v in &self.velocities {
            for c in v {
                out.extend_from_slice(&c.to_le_bytes());
            }
        }
        out.extend_from_slice(&self.types);
        out.extend(std::iter::repeat(0u8).take(types_padded - n));
        for e in &self.energies {
            out.extend_from_slice(&e.to_le_bytes());
        }
        for t in &self.targets {
            out.extend_from_slice(&t.to_le_bytes());
        }
        for g in &self.group_labels {
            out.extend_from_slice(&g.to_le_bytes());
        }

        out.extend_from_slice(&self.stats.mean_speed.to_le_bytes());
        out.extend_from_slice(&self.stats.std_speed.to_le_bytes());
        out.extend_from_slice(&self.stats.rg.to_le_bytes());
        out.extend_from_slice(&self.stats.polarization.to_le_bytes());
        out.extend_from_slice(&self.stats.n_groups.to_le_bytes());
        out.extend_from_slice(&[0u8; 44]);

        out.extend_from_slice(&(self.resources.len() as u32).to_le_bytes());
        for r in &self.resources {
            for c in &r.position {
                out.extend_from_slice(&c.to_le_bytes());
            }
            out.extend_from_slice(&r.amount.to_le_bytes());
            out.extend_from_slice(&r.radius.to_le_bytes());
            out.push(if r.renewable { 1 } else { 0 });
            out.extend_from_slice(&[0u8; 3]);
        }

        out.extend_from_slice(&(self.groups.len() as u32).to_le_bytes());
        for g in &self.groups {
            out.extend_from_slice(&g.id.to_le_bytes());
            out.extend_from_slice(&g.size.to_le_bytes());
            for c in &g.centroid {
                out.extend_from_slice(&c.to_le_bytes());
            }
            for c in &g.velocity {
                out.extend_from_slice(&c.to_le_bytes());
            }
            out.extend_from_slice(&g.radius.to_le_bytes());
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentType;

    fn sample_agents() -> Vec<Agent> {
        vec![
            Agent::new(AgentType::Follower, [1.0, 2.0, 3.0], [0.1, 0.0, 0.0], 1.0, 80.0, 1),
            Agent::new(AgentType::Predator, [-1.0, 0.0, 0.0], [0.0, 0.1, 0.0], 1.4, 90.0, 2),
        ]
    }

    #[test]
    fn stats_are_zero_with_no_live_agents() {
        let mut agents = sample_agents();
        for a in &mut agents {
            a.kill();
        }
        let stats = compute_stats(&agents, 0);
        assert_eq!(stats.mean_speed, 0.0);
        assert_eq!(stats.polarization, 0.0);
    }

    #[test]
    fn header_and_stats_block_round_trip_expected_sizes() {
        let agents = sample_agents();
        let stats = compute_stats(&agents, 0);
        let snapshot = SnapshotView::capture(&agents, &[], &[], 42, stats);
        let bytes = snapshot.to_wire_bytes();

        let n = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let step = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(n, 2);
        assert_eq!(step, 42);
        assert_eq!(bytes[8], 0); // has_resources
        assert_eq!(bytes[9], 0); // has_obstacles: obstacles are never streamed

        let types_padded = (2usize).div_ceil(4) * 4;
        let body_len = 2 * (12 + 12) + types_padded + 2 * 4 + 2 * 4 + 2 * 4;
        let stats_offset = 20 + body_len;
        let n_groups = u32::from_le_bytes(
            bytes[stats_offset + 16..stats_offset + 20]
                .try_into()
                .unwrap(),
        );
        assert_eq!(n_groups, 0);
    }

    #[test]
    fn predator_target_field_reflects_prey_id() {
        let mut agents = sample_agents();
        agents[1].target_prey_id = 0;
        agents[1].has_target = true;
        let stats = compute_stats(&agents, 0);
        let snapshot = SnapshotView::capture(&agents, &[], &[], 1, stats);
        assert_eq!(snapshot.targets[1], 0);
    }

    #[test]
    fn json_summary_round_trips_through_serde_json() {
        let agents = sample_agents();
        let stats = compute_stats(&agents, 2);
        let resources = vec![Resource::new([0.0; 3], 1.0, 1.0, 0.0)];
        let snapshot = SnapshotView::capture(&agents, &resources, &[], 7, stats);

        let json = snapshot.to_json_summary();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["n"], 2);
        assert_eq!(parsed["step"], 7);
        assert_eq!(parsed["resources"].as_array().unwrap().len(), 1);
    }
}
