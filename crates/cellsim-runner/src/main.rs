//! Headless runner: load a configuration, advance the world, report.

mod telemetry;

use anyhow::{anyhow, Context, Result};
use cellsim_core::SimConfig;
use cellsim_world::{RunSummary, SimEvent, Simulation, TickReport};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(author, version, about = "Run the cell simulation without a display", long_about = None)]
struct Args {
    /// JSON configuration file; absent sections fall back to defaults
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 5_000)]
    ticks: u64,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the initial number of cells
    #[arg(long)]
    population: Option<usize>,

    /// Override the initial number of food items
    #[arg(long)]
    food: Option<usize>,

    /// Runtime parameter overrides, e.g. `--set food_respawn_rate=0.5`
    #[arg(long = "set", value_name = "NAME=VALUE")]
    overrides: Vec<String>,

    /// Run on an open arena
    #[arg(long)]
    no_obstacles: bool,

    /// Log a progress line every N ticks (0 disables)
    #[arg(long, default_value_t = 1_000)]
    report_every: u64,

    /// Write the final world snapshot to this file
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Serialize)]
struct Output<'a> {
    seed: u64,
    summary: &'a RunSummary,
    history_samples: usize,
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            SimConfig::from_json(&raw).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SimConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.population.seed = seed;
    }
    if let Some(population) = args.population {
        config.population.initial_cells = population;
    }
    if let Some(food) = args.food {
        config.population.initial_food = food;
    }
    if args.no_obstacles {
        config.obstacles.count = 0;
    }
    config.validate()?;
    Ok(config)
}

fn parse_override(raw: &str) -> Result<(&str, f64)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got `{raw}`"))?;
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("invalid value in `{raw}`"))?;
    Ok((name.trim(), value))
}

fn log_report(report: &TickReport, report_every: u64, population: usize) {
    for event in &report.events {
        if matches!(event, SimEvent::FoodSpawned { .. } | SimEvent::FoodEaten { .. }) {
            continue;
        }
        match serde_json::to_string(event) {
            Ok(json) => debug!(tick = report.tick, event = %json, "sim event"),
            Err(e) => debug!(tick = report.tick, error = %e, "unserializable event"),
        }
    }
    if report_every > 0 && report.tick % report_every == 0 {
        info!(
            tick = report.tick,
            population = population,
            births = report.births,
            deaths = report.deaths,
            "progress"
        );
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_telemetry(args.json_logs)?;

    let config = load_config(&args)?;
    let seed = config.population.seed;
    info!(
        seed = seed,
        ticks = args.ticks,
        cells = config.population.initial_cells,
        food = config.population.initial_food,
        "Starting cellsim runner"
    );

    let mut sim = Simulation::with_random_obstacles(config)?;
    for raw in &args.overrides {
        let (name, value) = parse_override(raw)?;
        let applied = sim.set_parameter_by_name(name, value)?;
        if applied != value {
            info!(parameter = name, requested = value, applied = applied, "Parameter clamped");
        }
    }

    let mut population = sim.population();
    let summary = sim.run_with(args.ticks, |report| {
        population = (population + report.births).saturating_sub(report.deaths);
        log_report(report, args.report_every, population);
    });

    if let Some(path) = &args.snapshot {
        let json = serde_json::to_string_pretty(&sim.snapshot())?;
        std::fs::write(path, json).with_context(|| format!("writing snapshot {}", path.display()))?;
        info!(path = %path.display(), "Snapshot written");
    }

    let output = Output {
        seed,
        summary: &summary,
        history_samples: sim.history().len(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
