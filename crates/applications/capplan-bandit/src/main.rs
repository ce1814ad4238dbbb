//! capplan-bandit CLI
//!
//! Runs the sampled-rating exploration toy and prints the distribution of
//! every option at the start of each round.

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use capplan_bandit::{BanditConfig, BanditSimulator, RoundRecord};

#[derive(Parser, Debug)]
#[command(name = "capplan-bandit")]
#[command(about = "Simulate sampled-rating exploration over a set of options", long_about = None)]
struct Args {
    /// Number of rounds to play
    #[arg(short, long, default_value_t = 4)]
    rounds: usize,

    /// Options to explore (comma-separated)
    #[arg(long, default_value = "A,B,C,D")]
    options: String,

    /// Number of outcome categories per option
    #[arg(short, long, default_value_t = 5)]
    categories: usize,

    /// Seed for the random source (random when omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output JSON file path (optional)
    #[arg(short, long)]
    output: Option<String>,
}

fn print_round(record: &RoundRecord) {
    println!("Iteration {}: Probability Distributions", record.round);
    for snapshot in &record.snapshot {
        let probabilities: Vec<String> = snapshot
            .distribution
            .probabilities()
            .iter()
            .map(|p| format!("{:.2}", p))
            .collect();
        println!("{}: {}", snapshot.option, probabilities.join(", "));
    }
    println!();
    println!(
        "Selected option: {} with sample {}, Feedback: {}",
        record.selected, record.selected_sample, record.feedback
    );
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "capplan_bandit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = BanditConfig {
        options: args.options.split(',').map(|s| s.trim().to_string()).collect(),
        categories: args.categories,
        rounds: args.rounds,
        ..BanditConfig::default()
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, rounds = config.rounds, options = config.options.len(), "Starting bandit simulation");

    let mut simulator =
        BanditSimulator::new(config, StdRng::seed_from_u64(seed)).context("Invalid bandit configuration")?;
    let records = simulator.run()?;
    for record in &records {
        print_round(record);
    }

    if let Some(output_path) = args.output {
        let json = serde_json::to_string_pretty(&records)?;
        fs::write(&output_path, json).with_context(|| format!("Failed to write {}", output_path))?;
        info!(path = %output_path, "Results saved");
    }

    Ok(())
}
