//! The per-step phase sequence: grid rebuild, target selection, two force
//! passes around the Velocity Verlet half-steps, ecological interactions,
//! and the periodic group-detection pass.

use super::metrics::StepTimings;
use super::Engine;
use crate::{foraging, forces, groups, integrator, predation, resource};
use log::trace;
use std::time::Instant;

impl Engine {
    /// Advance the simulation by one step of size `dt`. Always produces a
    /// valid successor state, even with zero live agents.
    pub fn step(&mut self, dt: f32) -> StepTimings {
        self.drain_commands();

        let total_start = Instant::now();

        let t0 = Instant::now();
        self.grid.rebuild(&mut self.agents);
        let grid_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        foraging::pick_targets(&mut self.agents, &self.resources, &self.params);
        predation::pick_targets(&mut self.agents, &self.params);
        let targeting_us = t1.elapsed().as_micros() as u64;

        let t2 = Instant::now();
        forces::accumulate(
            &mut self.agents,
            &self.profiles,
            &self.resources,
            &self.obstacles,
            &self.grid,
            &self.params,
        );
        integrator::half_step1(&mut self.agents, dt, &self.params);
        forces::accumulate(
            &mut self.agents,
            &self.profiles,
            &self.resources,
            &self.obstacles,
            &self.grid,
            &self.params,
        );
        integrator::half_step2(&mut self.agents, &self.profiles, dt, &self.params);
        let integration_us = t2.elapsed().as_micros() as u64;

        let t3 = Instant::now();
        resource::consume_step(
            &mut self.resources,
            &mut self.agents,
            self.params.foraging.consumption_per_step,
            self.params.foraging.energy_max,
            self.params.boundary.mode,
            self.params.boundary.box_size,
        );
        predation::resolve_attacks(&mut self.agents, &self.params, self.step_counter);
        resource::regenerate_step(&mut self.resources);
        foraging::apply_passive_drain(&mut self.agents, &self.params);
        let ecology_us = t3.elapsed().as_micros() as u64;

        let t4 = Instant::now();
        let interval = self.params.groups.interval_k.max(1);
        if self.step_counter % interval as u64 == 0 {
            groups::propagate(&mut self.agents, &self.params);
            self.groups = groups::aggregate(&self.agents, self.params.boundary.mode, self.params.boundary.box_size);
        }
        let groups_us = t4.elapsed().as_micros() as u64;

        self.step_counter += 1;

        let timings = StepTimings {
            grid_us,
            targeting_us,
            integration_us,
            ecology_us,
            groups_us,
            total_us: total_start.elapsed().as_micros() as u64,
        };
        trace!(
            "step {}: grid={}us targeting={}us integration={}us ecology={}us groups={}us total={}us",
            self.step_counter,
            timings.grid_us,
            timings.targeting_us,
            timings.integration_us,
            timings.ecology_us,
            timings.groups_us,
            timings.total_us,
        );
        timings
    }

    /// Convenience loop: `n_steps` calls to `step(dt)`, returning the last
    /// step's timings.
    pub fn run(&mut self, n_steps: u32, dt: f32) -> StepTimings {
        let mut last = StepTimings::default();
        for _ in 0..n_steps {
            last = self.step(dt);
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentType;
    use crate::params::{Capacities, SimParams};

    #[test]
    fn step_never_panics_with_all_agents_dead() {
        let types = vec![AgentType::Follower; 5];
        let mut engine = Engine::new(SimParams::default(), &types, Capacities::default());
        engine.initialize(20.0, 1);
        for agent in &mut engine.agents {
            agent.kill();
        }
        engine.step(0.01);
        assert_eq!(engine.alive_count(), 0);
    }

    #[test]
    fn alive_count_never_exceeds_agent_count() {
        let types = vec![AgentType::Follower, AgentType::Predator, AgentType::Explorer];
        let mut engine = Engine::new(SimParams::default(), &types, Capacities::default());
        engine.initialize(20.0, 3);
        for _ in 0..20 {
            engine.step(0.01);
            assert!(engine.alive_count() <= types.len());
        }
    }

    #[test]
    fn run_advances_step_counter_by_n() {
        let types = vec![AgentType::Follower; 4];
        let mut engine = Engine::new(SimParams::default(), &types, Capacities::default());
        engine.initialize(20.0, 9);
        engine.run(7, 0.01);
        assert_eq!(engine.step_counter(), 7);
    }
}
