//! Point resources with FIFO-by-proximity consumption.
//!
//! Resources are discrete, capacity-bounded points with per-resource
//! `amount`/`radius`/`replenish_rate`. Consumption is arbitrated
//! nearest-first rather than split evenly among claimants.

use crate::agent::Agent;
use crate::grid::pbc_delta;
use crate::params::BoundaryMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Resource {
    pub position: [f32; 3],
    pub amount: f32,
    pub max_amount: f32,
    pub radius: f32,
    pub replenish_rate: f32,
    pub active: bool,
}

impl Resource {
    pub fn new(position: [f32; 3], amount: f32, radius: f32, replenish_rate: f32) -> Self {
        Self {
            position,
            amount,
            max_amount: amount,
            radius,
            replenish_rate,
            active: true,
        }
    }

    pub fn is_renewable(&self) -> bool {
        self.replenish_rate > 0.0
    }
}

/// One resource-consumption arbitration pass over all active resources.
/// Each claimant takes
/// `min(consumption_per_step, amount_remaining, energy_max - energy[i])`.
pub fn consume_step(
    resources: &mut [Resource],
    agents: &mut [Agent],
    consumption_per_step: f32,
    energy_max: f32,
    mode: BoundaryMode,
    box_size: f32,
) {
    let mut claimants: Vec<(f32, usize)> = Vec::new();
    for resource in resources.iter_mut() {
        if !resource.active {
            continue;
        }
        claimants.clear();
        let r_sq = resource.radius * resource.radius;
        for (i, agent) in agents.iter().enumerate() {
            if !agent.alive {
                continue;
            }
            let delta = pbc_delta(
                [
                    agent.position[0] - resource.position[0],
                    agent.position[1] - resource.position[1],
                    agent.position[2] - resource.position[2],
                ],
                mode,
                box_size,
            );
            let dist_sq = delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2];
            if dist_sq <= r_sq {
                claimants.push((dist_sq, i));
            }
        }
        // FIFO-by-proximity: nearest served first, ties by agent index.
        claimants.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        for &(_, i) in &claimants {
            if resource.amount <= 0.0 {
                break;
            }
            let agent = &mut agents[i];
            let take = consumption_per_step
                .min(resource.amount)
                .min(energy_max - agent.energy)
                .max(0.0);
            resource.amount -= take;
            agent.energy += take;
        }

        if !resource.is_renewable() && resource.amount <= 0.0 {
            resource.active = false;
        }
    }
}

/// Regenerate every active renewable resource by one step.
pub fn regenerate_step(resources: &mut [Resource]) {
    for resource in resources.iter_mut() {
        if resource.active && resource.is_renewable() {
            resource.amount = (resource.amount + resource.replenish_rate).min(resource.max_amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentType;

    fn agent_with_energy(pos: [f32; 3], energy: f32) -> Agent {
        Agent::new(AgentType::Follower, pos, [0.0; 3], 1.0, energy, 5)
    }

    /// Nearer claimant is served first; farther one takes the remainder.
    #[test]
    fn fifo_arbitration_serves_nearest_first() {
        let mut resources = vec![Resource::new([0.0, 0.0, 0.0], 1.0, 2.0, 0.0)];
        resources[0].amount = 1.0;
        let mut agents = vec![
            agent_with_energy([-1.0, 0.0, 0.0], 0.0),
            agent_with_energy([0.5, 0.0, 0.0], 0.0),
        ];
        // consumption_per_step is modeled via per-step energy_max headroom in
        // this helper by giving each agent exactly 0.6 headroom via energy_max.
        for r in resources.iter_mut() {
            r.amount = 1.0;
        }

        consume_step(&mut resources, &mut agents, 0.6, 100.0, BoundaryMode::Periodic, 100.0);

        assert!((agents[1].energy - 0.6).abs() < 1e-5, "nearer agent takes 0.6, got {}", agents[1].energy);
        assert!((agents[0].energy - 0.4).abs() < 1e-5, "farther agent takes remainder 0.4, got {}", agents[0].energy);
        assert!(resources[0].amount <= 1e-5);
        assert!(!resources[0].active, "non-renewable resource depletes to inactive");
    }

    #[test]
    fn renewable_resource_regenerates_and_caps() {
        let mut resources = vec![Resource::new([0.0; 3], 1.0, 1.0, 0.3)];
        resources[0].amount = 0.5;
        resources[0].max_amount = 1.0;
        regenerate_step(&mut resources);
        assert!((resources[0].amount - 0.8).abs() < 1e-5);
        regenerate_step(&mut resources);
        regenerate_step(&mut resources);
        assert!(resources[0].amount <= 1.0 + 1e-6);
    }

    #[test]
    fn inactive_resource_is_skipped() {
        let mut resources = vec![Resource::new([0.0; 3], 1.0, 1.0, 0.0)];
        resources[0].active = false;
        let mut agents = vec![agent_with_energy([0.0; 3], 0.0)];
        consume_step(&mut resources, &mut agents, 1.0, 100.0, BoundaryMode::Periodic, 50.0);
        assert_eq!(agents[0].energy, 0.0);
    }
}
