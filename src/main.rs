use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use signal_sim::{
    config::ScenarioConfig,
    control::Policy,
    experiment::{compare, run_single},
};

#[derive(Parser)]
#[command(name = "signal-sim")]
#[command(about = "Compare fixed-timer and adaptive signal control at a single intersection")]
struct Args {
    /// Scenario configuration file
    #[arg(short, long, default_value = "scenario.toml")]
    config: PathBuf,

    /// Which controller(s) to run
    #[arg(short, long, value_enum, default_value_t = PolicyArg::Both)]
    policy: PolicyArg,

    /// Random seed for reproducible arrivals (overrides the scenario)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of consecutive seeds to average over when comparing
    #[arg(short = 'n', long, default_value_t = 1)]
    seeds: u64,

    /// Simulated duration in seconds (overrides the scenario)
    #[arg(short, long)]
    duration: Option<f64>,

    /// Enable verbose logging, including every signal transition
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum PolicyArg {
    /// Fixed green/yellow cycle
    Fixed,
    /// Queue-driven control with fairness bounds
    Adaptive,
    /// Run both on identical arrivals and compare
    Both,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();
    info!("Starting signal simulator");

    let mut scenario = if args.config.exists() {
        info!("Loading scenario from: {}", args.config.display());
        ScenarioConfig::load_from_file(&args.config)?
    } else {
        info!("{} not found, using built-in scenario", args.config.display());
        ScenarioConfig::default()
    };
    if let Some(duration) = args.duration {
        scenario.simulation.duration = duration;
    }
    let seed = args.seed.or(scenario.simulation.seed);

    info!("=== Scenario ===");
    for (direction, rate) in scenario.arrivals.iter() {
        info!("Arrival rate {}: {} veh/s", direction, rate);
    }
    info!(
        "Duration: {:.1} min, dt: {}s, saturation flow: {} veh/s",
        scenario.simulation.duration / 60.0,
        scenario.simulation.dt,
        scenario.simulation.saturation_flow
    );
    match seed {
        Some(seed) => info!("Random Seed: {}", seed),
        None => info!("Random Seed: none (non-deterministic)"),
    }

    let start = Instant::now();
    match args.policy {
        PolicyArg::Fixed => println!("{}", run_single(&scenario, Policy::FixedTimer, seed)?),
        PolicyArg::Adaptive => println!("{}", run_single(&scenario, Policy::AdaptiveFair, seed)?),
        PolicyArg::Both => {
            let first = seed.unwrap_or(0);
            let comparison = compare(&scenario, first..first.saturating_add(args.seeds.max(1)))?;
            if let (Some(fixed), Some(adaptive)) = (comparison.fixed.first(), comparison.adaptive.first()) {
                println!("{fixed}");
                println!("{adaptive}");
            }
            println!("{comparison}");
        }
    }
    info!("Completed in {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
