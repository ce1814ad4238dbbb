//! capplan CLI
//!
//! Builds the multi-region capacity model for a scenario, solves it once and
//! prints the allocation.
//!
//! ```bash
//! # Built-in four-region reference scenario
//! capplan
//!
//! # Custom scenario with a tighter budget, plan written as JSON
//! capplan --scenario regions.json --budget 9000 --output plan.json
//! ```

use anyhow::Context;
use clap::Parser;
use std::fs;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use capplan_core::{Scenario, SolverBackend};
use capplan_optimizer::plan;

#[derive(Parser, Debug)]
#[command(name = "capplan")]
#[command(about = "Plan multi-region instance capacity at minimum monthly cost", long_about = None)]
struct Args {
    /// Scenario JSON file (defaults to the built-in reference scenario)
    #[arg(short, long, env = "CAPPLAN_SCENARIO")]
    scenario: Option<String>,

    /// Override the monthly budget ceiling
    #[arg(short, long)]
    budget: Option<f64>,

    /// Override the minimum CU per region
    #[arg(long)]
    min_capacity: Option<f64>,

    /// Solver backend (microlp, highs)
    #[arg(long)]
    solver: Option<SolverBackend>,

    /// Output JSON file path (optional)
    #[arg(short, long)]
    output: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "capplan=info,capplan_optimizer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::from_file(path).with_context(|| format!("Failed to load scenario {}", path))?,
        None => Scenario::reference(),
    };
    if let Some(budget) = args.budget {
        scenario.planner.monthly_budget = budget;
    }
    if let Some(min_capacity) = args.min_capacity {
        scenario.planner.min_capacity_per_region = min_capacity;
    }
    if let Some(solver) = args.solver {
        scenario.planner.solver = solver;
    }

    info!(
        regions = scenario.regions.len(),
        budget = scenario.planner.monthly_budget,
        solver = %scenario.planner.solver,
        "Planning capacity"
    );

    let outcome = plan(&scenario).context("Capacity planning failed")?;
    println!("{}", outcome);

    if outcome.plan().is_none() {
        info!("No plan produced for this scenario");
    }

    if let Some(output_path) = args.output {
        let json = serde_json::to_string_pretty(&outcome)?;
        fs::write(&output_path, json).with_context(|| format!("Failed to write {}", output_path))?;
        info!(path = %output_path, "Results saved");
    }

    Ok(())
}
