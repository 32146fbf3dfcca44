use clap::Parser;
use flock_engine::{AgentType, Capacities, Engine, SimParams, StepTimings};
use log::info;

/// Run the flocking engine headless for a fixed number of steps and report
/// per-phase timings and swarm diagnostics.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of agents to populate.
    #[arg(short = 'n', long, default_value_t = 2_000)]
    agents: usize,

    /// Fraction of agents that are predators, in [0, 1].
    #[arg(long, default_value_t = 0.05)]
    predator_fraction: f64,

    /// Number of steps to run.
    #[arg(short, long, default_value_t = 1_000)]
    steps: u32,

    /// Integration step size.
    #[arg(long, default_value_t = 0.01)]
    dt: f32,

    /// Side length of the initial placement box.
    #[arg(long, default_value_t = 100.0)]
    box_size: f32,

    /// RNG seed.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Print the final snapshot's summary stats as JSON.
    #[arg(long)]
    json: bool,
}

fn build_agent_types(n: usize, predator_fraction: f64) -> Vec<AgentType> {
    let n_predators = ((n as f64) * predator_fraction).round() as usize;
    let mut types = Vec::with_capacity(n);
    for i in 0..n {
        types.push(if i < n_predators {
            AgentType::Predator
        } else if i % 5 == 0 {
            AgentType::Leader
        } else if i % 3 == 0 {
            AgentType::Explorer
        } else {
            AgentType::Follower
        });
    }
    types
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut params = SimParams::default();
    params.boundary.box_size = cli.box_size;
    params.validate()?;

    let agent_types = build_agent_types(cli.agents, cli.predator_fraction);
    let mut engine = Engine::try_new(params, &agent_types, Capacities::default())
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    engine.initialize(cli.box_size, cli.seed);

    info!("running {} agents for {} steps", cli.agents, cli.steps);
    let mut last_timings = StepTimings::default();
    for step in 0..cli.steps {
        last_timings = engine.step(cli.dt);
        if step % 100 == 0 {
            let d = engine.diagnostics();
            info!(
                "step {step}: alive={} mean_speed={:.3} polarization={:.3} groups={}",
                engine.alive_count(),
                d.mean_speed,
                d.polarization,
                engine.group_count(),
            );
        }
    }

    let diagnostics = engine.diagnostics();
    if cli.json {
        let summary = serde_json::json!({
            "steps": cli.steps,
            "alive": engine.alive_count(),
            "mean_speed": diagnostics.mean_speed,
            "std_speed": diagnostics.std_speed,
            "rg": diagnostics.rg,
            "polarization": diagnostics.polarization,
            "groups": engine.group_count(),
            "last_step_total_us": last_timings.total_us,
        });
        println!("{summary}");
    } else {
        println!(
            "final: alive={} mean_speed={:.3} rg={:.3} polarization={:.3} groups={} last_step_us={}",
            engine.alive_count(),
            diagnostics.mean_speed,
            diagnostics.rg,
            diagnostics.polarization,
            engine.group_count(),
            last_timings.total_us,
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_type_mix_includes_requested_predator_fraction() {
        let types = build_agent_types(100, 0.1);
        let predators = types.iter().filter(|t| t.is_predator()).count();
        assert_eq!(predators, 10);
    }

    #[test]
    fn zero_predator_fraction_yields_no_predators() {
        let types = build_agent_types(50, 0.0);
        assert!(types.iter().all(|t| !t.is_predator()));
    }
}
