//! Civ Evolution - Entry Point
//!
//! Runs the simulation headless for a fixed number of ticks, or live on a
//! real-time interval until `--ticks` reports arrive or Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::{mpsc, Mutex};

use civ_evolution::core::config::{SimulationConfig, SimulationSpeed};
use civ_evolution::core::error::Result;
use civ_evolution::evolution::ticker::TickObserver;
use civ_evolution::evolution::{format_year, SimulationSnapshot, Simulator, TechTree, TickReport, Ticker};

#[derive(Parser, Debug)]
#[command(name = "civ-evolution")]
#[command(about = "Simulate the rise and fall of civilizations on a grid world")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Ticks to run (10 years each)
    #[arg(long, default_value_t = 100)]
    ticks: usize,

    /// Real-time pace: slow, medium or fast
    #[arg(long)]
    speed: Option<SimulationSpeed>,

    /// Run on a real-time interval until `--ticks` reports or Ctrl-C
    #[arg(long, default_value_t = false)]
    live: bool,

    /// Technology catalog path or URL; overrides the config file
    #[arg(long)]
    tech_tree: Option<String>,

    /// Write the final snapshot as JSON
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("civ_evolution=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(speed) = args.speed {
        config.speed = speed;
    }
    let tech_source = args.tech_tree.clone().or_else(|| config.tech_tree.clone());
    let speed = config.speed;

    let mut sim = Simulator::new(config)?;
    if let Some(source) = tech_source {
        sim = sim.with_tech_tree(TechTree::load_or_empty(&source).await);
    }

    let snapshot = if args.live {
        run_live(sim, speed, args.ticks).await?
    } else {
        SimulationSnapshot::capture(&run_headless(sim, args.ticks))
    };

    println!("{}", snapshot.summary());
    if let Some(path) = &args.output {
        tokio::fs::write(path, snapshot.to_json()).await?;
        tracing::info!("Snapshot written to {}", path.display());
    }
    Ok(())
}

fn run_headless(mut sim: Simulator, ticks: usize) -> Simulator {
    tracing::info!("Running {} ticks from {}", ticks, format_year(sim.year));
    for _ in 0..ticks {
        let report = sim.evolve();
        if report.full_update {
            tracing::info!(
                "{}: {} civilizations, {} fallen, {} new events",
                format_year(report.year),
                report.civilizations,
                sim.dead_civilizations.len(),
                report.events_logged
            );
        }
    }
    sim
}

async fn run_live(sim: Simulator, speed: SimulationSpeed, ticks: usize) -> Result<SimulationSnapshot> {
    let shared = Arc::new(Mutex::new(sim));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let observer: TickObserver = Arc::new(move |report: &TickReport| {
        let _ = tx.send(report.clone());
    });

    let mut ticker = Ticker::start(Arc::clone(&shared), speed, observer);
    tracing::info!("Live simulation started, press Ctrl-C to stop");

    let mut seen = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted after {} ticks", seen);
                break;
            }
            report = rx.recv() => {
                let Some(report) = report else { break };
                seen += 1;
                if report.full_update {
                    tracing::info!(
                        "{}: {} civilizations, {} new events",
                        format_year(report.year),
                        report.civilizations,
                        report.events_logged
                    );
                }
                if seen >= ticks {
                    break;
                }
            }
        }
    }
    ticker.stop();

    let sim = shared.lock().await;
    Ok(SimulationSnapshot::capture(&sim))
}
