use rs_edmd::simulation::ScenarioConfig;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(about = "Runs an event-driven molecular dynamics scenario")]
struct Args {
    /// YAML scenario file
    #[arg(short, long)]
    scenario: PathBuf,
    /// Stop after this many events unless a halt event fires first
    #[arg(short, long, default_value_t = 10_000)]
    events: u64,
    /// Overrides the seed of the scenario
    #[arg(long)]
    seed: Option<u64>,
}

fn run(args: &Args) -> Result<()> {
    let mut scenario = ScenarioConfig::from_path(&args.scenario)
        .with_context(|| format!("failed to load {}", args.scenario.display()))?;
    if let Some(seed) = args.seed {
        scenario.config = scenario.config.with_seed(seed);
    }

    let mut simulation = scenario.build()?;
    simulation.initialise()?;
    let ran = simulation.run(args.events)?;
    info!("{} events, final time {}, status {:?}", ran, simulation.system_time(), simulation.status());

    let snapshot = simulation.snapshot();
    print!("{}", serde_yaml::to_string(&snapshot)?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
