//! Foraging target selection and passive energy accounting.

use crate::agent::Agent;
use crate::grid::pbc_delta;
use crate::params::SimParams;
use crate::resource::Resource;
use log::debug;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// For every live non-predator agent that is hungry or already tracking a
/// target, (re-)pick the nearest active resource. Releases the target if the
/// resource it was pointed at went inactive.
pub fn pick_targets(agents: &mut [Agent], resources: &[Resource], params: &SimParams) {
    let threshold = params.foraging.energy_threshold;
    let mode = params.boundary.mode;
    let box_size = params.boundary.box_size;

    agents.par_iter_mut().for_each(|agent| {
        if !agent.alive || agent.agent_type.is_predator() {
            return;
        }
        if agent.has_target {
            let still_active = resources
                .get(agent.target_resource_id as usize)
                .map(|r| r.active)
                .unwrap_or(false);
            if !still_active {
                agent.has_target = false;
                agent.target_resource_id = -1;
            }
        }

        // Only scan when hungry or already chasing a target to release.
        if agent.energy >= threshold && !agent.has_target {
            return;
        }

        let mut best: Option<(f32, usize)> = None;
        for (ri, resource) in resources.iter().enumerate() {
            if !resource.active {
                continue;
            }
            let delta = pbc_delta(
                [
                    resource.position[0] - agent.position[0],
                    resource.position[1] - agent.position[1],
                    resource.position[2] - agent.position[2],
                ],
                mode,
                box_size,
            );
            let dist_sq = delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2];
            if best.map(|(d, _)| dist_sq < d).unwrap_or(true) {
                best = Some((dist_sq, ri));
            }
        }

        match best {
            Some((_, ri)) => {
                agent.target_resource_id = ri as i32;
                agent.has_target = true;
            }
            None => {
                agent.has_target = false;
                agent.target_resource_id = -1;
            }
        }
    });
}

/// Subtract passive per-step upkeep from every live agent, killing any that
/// drop to or below zero energy.
pub fn apply_passive_drain(agents: &mut [Agent], params: &SimParams) {
    let drain = params.foraging.passive_energy_loss;
    let starved = AtomicUsize::new(0);
    agents.par_iter_mut().for_each(|agent| {
        if !agent.alive {
            return;
        }
        agent.energy -= drain;
        if agent.energy <= 0.0 {
            agent.kill();
            starved.fetch_add(1, Ordering::Relaxed);
        }
    });
    let starved = starved.load(Ordering::Relaxed);
    if starved > 0 {
        debug!("{starved} agent(s) starved from passive energy drain");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentType;

    fn hungry_agent(pos: [f32; 3]) -> Agent {
        Agent::new(AgentType::Follower, pos, [0.0; 3], 1.0, 10.0, 1)
    }

    #[test]
    fn picks_nearest_active_resource() {
        let mut params = SimParams::default();
        params.foraging.energy_threshold = 60.0;
        let resources = vec![
            Resource::new([5.0, 0.0, 0.0], 1.0, 1.0, 0.0),
            Resource::new([1.0, 0.0, 0.0], 1.0, 1.0, 0.0),
        ];
        let mut agents = vec![hungry_agent([0.0; 3])];
        pick_targets(&mut agents, &resources, &params);
        assert!(agents[0].has_target);
        assert_eq!(agents[0].target_resource_id, 1);
    }

    #[test]
    fn predators_never_pick_resource_targets() {
        let mut params = SimParams::default();
        params.foraging.energy_threshold = 60.0;
        let resources = vec![Resource::new([0.0; 3], 1.0, 5.0, 0.0)];
        let mut agents = vec![Agent::new(
            AgentType::Predator,
            [0.0; 3],
            [0.0; 3],
            1.0,
            10.0,
            1,
        )];
        pick_targets(&mut agents, &resources, &params);
        assert!(!agents[0].has_target);
    }

    #[test]
    fn releasing_target_when_resource_goes_inactive() {
        let mut params = SimParams::default();
        params.foraging.energy_threshold = 60.0;
        let mut resources = vec![Resource::new([0.0; 3], 1.0, 5.0, 0.0)];
        let mut agents = vec![hungry_agent([0.0; 3])];
        pick_targets(&mut agents, &resources, &params);
        assert!(agents[0].has_target);

        resources[0].active = false;
        pick_targets(&mut agents, &resources, &params);
        assert!(!agents[0].has_target);
        assert_eq!(agents[0].target_resource_id, -1);
    }

    #[test]
    fn passive_drain_kills_on_zero_energy() {
        let mut params = SimParams::default();
        params.foraging.passive_energy_loss = 5.0;
        let mut agents = vec![Agent::new(
            AgentType::Follower,
            [0.0; 3],
            [0.0; 3],
            1.0,
            3.0,
            1,
        )];
        apply_passive_drain(&mut agents, &params);
        assert!(!agents[0].alive);
    }

    #[test]
    fn passive_drain_survives_above_zero() {
        let mut params = SimParams::default();
        params.foraging.passive_energy_loss = 5.0;
        let mut agents = vec![Agent::new(
            AgentType::Follower,
            [0.0; 3],
            [0.0; 3],
            1.0,
            50.0,
            1,
        )];
        apply_passive_drain(&mut agents, &params);
        assert!(agents[0].alive);
        assert!((agents[0].energy - 45.0).abs() < 1e-5);
    }
}
