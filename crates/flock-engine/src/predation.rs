//! Predator target acquisition and probabilistic attack resolution.

use crate::agent::Agent;
use crate::grid::pbc_delta;
use crate::params::SimParams;
use crate::rng::uniform;
use log::debug;
use rayon::prelude::*;

/// Each live predator (re-)picks the nearest live non-predator within its
/// search horizon, or releases its target if none remain in range.
pub fn pick_targets(agents: &mut [Agent], params: &SimParams) {
    let horizon_sq = params.predation.search_horizon * params.predation.search_horizon;
    let mode = params.boundary.mode;
    let box_size = params.boundary.box_size;

    let snapshot: Vec<(usize, [f32; 3], bool)> = agents
        .iter()
        .enumerate()
        .map(|(i, a)| (i, a.position, a.alive && !a.agent_type.is_predator()))
        .collect();

    agents.par_iter_mut().enumerate().for_each(|(i, predator)| {
        if !predator.alive || !predator.agent_type.is_predator() {
            return;
        }
        let mut best: Option<(f32, usize)> = None;
        for &(j, pos, is_prey) in &snapshot {
            if j == i || !is_prey {
                continue;
            }
            let delta = pbc_delta(
                [
                    pos[0] - predator.position[0],
                    pos[1] - predator.position[1],
                    pos[2] - predator.position[2],
                ],
                mode,
                box_size,
            );
            let dist_sq = delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2];
            if dist_sq > horizon_sq {
                continue;
            }
            if best.map(|(d, _)| dist_sq < d).unwrap_or(true) {
                best = Some((dist_sq, j));
            }
        }

        match best {
            Some((_, j)) => {
                predator.target_prey_id = j as i32;
                predator.has_target = true;
            }
            None => {
                predator.target_prey_id = -1;
                predator.has_target = false;
            }
        }
    });
}

/// Number of live non-predator neighbors of `prey` sharing its group label,
/// within `radius` (group-defense discount for the attack roll).
fn count_protectors(
    agents: &[Agent],
    prey_index: usize,
    radius: f32,
    mode: crate::params::BoundaryMode,
    box_size: f32,
) -> usize {
    let prey = &agents[prey_index];
    if prey.group_id < 0 {
        return 0;
    }
    let radius_sq = radius * radius;
    agents
        .iter()
        .enumerate()
        .filter(|(j, a)| {
            *j != prey_index
                && a.alive
                && !a.agent_type.is_predator()
                && a.group_id == prey.group_id
                && {
                    let delta = pbc_delta(
                        [
                            a.position[0] - prey.position[0],
                            a.position[1] - prey.position[1],
                            a.position[2] - prey.position[2],
                        ],
                        mode,
                        box_size,
                    );
                    delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2] <= radius_sq
                }
        })
        .count()
}

/// Resolve every predator's attack for this step. Must be called after
/// target acquisition and with the current `step_counter`. Sequential: each
/// attack can kill prey another predator might also be targeting, and the
/// RNG draw must consume `rng_state[p]` exactly once per eligible attempt.
pub fn resolve_attacks(agents: &mut [Agent], params: &SimParams, step: u64) {
    let n = agents.len();
    let mode = params.boundary.mode;
    let box_size = params.boundary.box_size;
    let p = &params.predation;

    for predator_idx in 0..n {
        if !agents[predator_idx].alive || !agents[predator_idx].agent_type.is_predator() {
            continue;
        }
        if !agents[predator_idx].has_target || agents[predator_idx].target_prey_id < 0 {
            continue;
        }
        let prey_idx = agents[predator_idx].target_prey_id as usize;
        if prey_idx >= n || !agents[prey_idx].alive {
            continue;
        }
        let steps_since = step as i64 - agents[predator_idx].last_attack_step as i64;
        if agents[predator_idx].last_attack_step >= 0 && steps_since < p.cooldown as i64 {
            continue;
        }

        let delta = pbc_delta(
            [
                agents[prey_idx].position[0] - agents[predator_idx].position[0],
                agents[prey_idx].position[1] - agents[predator_idx].position[1],
                agents[prey_idx].position[2] - agents[predator_idx].position[2],
            ],
            mode,
            box_size,
        );
        let dist = (delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2]).sqrt();
        if dist > p.attack_radius {
            continue;
        }

        let v0 = params.rayleigh.v0.max(1e-6);
        let speed_diff = (agents[predator_idx].speed() - agents[prey_idx].speed()) / v0;
        let energy_max = params.foraging.energy_max.max(1e-6);
        let n_protectors = count_protectors(agents, prey_idx, p.attack_radius * 2.0, mode, box_size);

        let mut success = p.base_success;
        success += p.speed_diff_coeff * speed_diff.tanh();
        success += p.weak_prey_coeff * (1.0 - agents[prey_idx].energy / energy_max);
        success += p.predator_energy_coeff * (agents[predator_idx].energy / energy_max);
        success -= p.protector_coeff * (1.0 - 1.0 / (1.0 + n_protectors as f32));
        success = success.clamp(p.min_success, p.max_success);

        let roll = uniform(&mut agents[predator_idx].rng_state);
        agents[predator_idx].last_attack_step = step as i32;
        if roll < success {
            let reward = p.energy_reward;
            agents[prey_idx].kill();
            agents[predator_idx].energy = (agents[predator_idx].energy + reward).min(energy_max);
            agents[predator_idx].target_prey_id = -1;
            agents[predator_idx].has_target = false;
            debug!(
                "predator {predator_idx} killed prey {prey_idx} at step {step} (success={success:.3})"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentType;
    use crate::params::BoundaryMode;

    fn predator_at(pos: [f32; 3]) -> Agent {
        Agent::new(AgentType::Predator, pos, [0.0; 3], 1.0, 50.0, 1)
    }

    fn prey_at(pos: [f32; 3]) -> Agent {
        Agent::new(AgentType::Follower, pos, [0.0; 3], 1.0, 50.0, 2)
    }

    #[test]
    fn predator_targets_nearest_prey() {
        let params = SimParams::default();
        let mut agents = vec![predator_at([0.0; 3]), prey_at([5.0, 0.0, 0.0]), prey_at([1.0, 0.0, 0.0])];
        pick_targets(&mut agents, &params);
        assert_eq!(agents[0].target_prey_id, 2);
    }

    #[test]
    fn prey_out_of_horizon_is_ignored() {
        let mut params = SimParams::default();
        params.predation.search_horizon = 2.0;
        let mut agents = vec![predator_at([0.0; 3]), prey_at([50.0, 0.0, 0.0])];
        pick_targets(&mut agents, &params);
        assert!(!agents[0].has_target);
    }

    /// Attack always succeeds when forced to `max_success = 1.0` and the
    /// prey is within range with cooldown already elapsed.
    #[test]
    fn guaranteed_attack_kills_prey_and_rewards_predator() {
        let mut params = SimParams::default();
        params.predation.min_success = 1.0;
        params.predation.max_success = 1.0;
        params.predation.base_success = 1.0;
        params.predation.attack_radius = 5.0;
        params.predation.cooldown = 0;
        params.boundary.mode = BoundaryMode::Periodic;
        params.boundary.box_size = 100.0;

        let mut agents = vec![predator_at([0.0; 3]), prey_at([1.0, 0.0, 0.0])];
        agents[0].target_prey_id = 1;
        agents[0].has_target = true;

        resolve_attacks(&mut agents, &params, 100);
        assert!(!agents[1].alive);
        assert!(agents[0].energy > 50.0);
        assert_eq!(agents[0].last_attack_step, 100);
    }

    #[test]
    fn cooldown_blocks_repeated_attacks() {
        let mut params = SimParams::default();
        params.predation.min_success = 1.0;
        params.predation.max_success = 1.0;
        params.predation.base_success = 1.0;
        params.predation.attack_radius = 5.0;
        params.predation.cooldown = 10;

        let mut agents = vec![predator_at([0.0; 3]), prey_at([1.0, 0.0, 0.0])];
        agents[0].target_prey_id = 1;
        agents[0].has_target = true;
        agents[0].last_attack_step = 95;

        resolve_attacks(&mut agents, &params, 100);
        assert!(agents[1].alive, "cooldown not yet elapsed, attack should be skipped");
    }

    #[test]
    fn group_defense_lowers_success_below_max() {
        let mut params = SimParams::default();
        params.predation.base_success = 0.9;
        params.predation.speed_diff_coeff = 0.0;
        params.predation.weak_prey_coeff = 0.0;
        params.predation.predator_energy_coeff = 0.0;
        params.predation.protector_coeff = 0.8;
        params.predation.min_success = 0.0;
        params.predation.max_success = 1.0;
        params.predation.attack_radius = 5.0;
        params.predation.cooldown = 0;

        let mut predator = predator_at([0.0; 3]);
        predator.target_prey_id = 1;
        predator.has_target = true;
        let mut prey = prey_at([1.0, 0.0, 0.0]);
        prey.group_id = 7;
        let mut protector = prey_at([1.5, 0.0, 0.0]);
        protector.group_id = 7;

        let n_protectors = count_protectors(&[predator.clone(), prey.clone(), protector.clone()], 1, 10.0, BoundaryMode::Periodic, 100.0);
        assert_eq!(n_protectors, 1);
    }
}
