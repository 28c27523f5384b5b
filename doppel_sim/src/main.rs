//! Doppel scenario harness CLI
//!
//! Run seeded scenarios against test doubles and report which seeds fail.

use clap::Parser;
use doppel_sim::{ScenarioId, ScenarioRunner, SimConfig, SimExport};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Doppel deterministic scenario CLI
#[derive(Parser, Debug)]
#[command(name = "doppel-sim")]
#[command(about = "Run deterministic scenarios against Doppel test doubles", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of consecutive seeds to run
    #[arg(long)]
    seeds: Option<usize>,

    /// Calls per scripted ledger
    #[arg(short, long)]
    calls: Option<usize>,

    /// Scenario to run (ledger_order, attribute_memo, side_effect_drain,
    /// has_calls_window, identity_spoof, yield_drain, all)
    #[arg(short = 'S', long)]
    scenario: Option<String>,

    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Write the full report, with a sample ledger per seed, to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn load_config(args: &Args) -> Result<SimConfig, String> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => SimConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(seeds) = args.seeds {
        config.seeds = seeds;
    }
    if let Some(calls) = args.calls {
        config.calls = calls;
    }
    match args.scenario.as_deref() {
        None | Some("all") => {}
        Some(name) => config.scenarios = vec![name.parse::<ScenarioId>()?],
    }
    Ok(config)
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
        eprintln!("Available scenarios: {}, all", names.join(", "));
        std::process::exit(1);
    });

    if !args.json {
        info!("Doppel scenario harness v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Determine base seed
    let base_seed = if config.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        config.seed
    };

    let mut export = SimExport::new(base_seed);

    for seed in config.seed_range(base_seed) {
        let runner = ScenarioRunner::new(seed).with_calls(config.calls);

        for result in runner.run_all(&config.scenarios) {
            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", result.scenario, seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        result.scenario,
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
            export.add_result(result);
        }

        if args.export.is_some() {
            match runner.sample_ledger() {
                Ok(sample) => export.add_sample(&sample),
                Err(e) => error!("Failed to sample ledger for seed {}: {}", seed, e),
            }
        }
    }

    if let Some(path) = &args.export {
        if let Err(e) = export.write_to_file(path) {
            error!("Failed to write export: {:?}", e);
        } else {
            info!("Exported {} results to {}", export.results.len(), path);
        }
    }

    // Summary
    let total = export.results.len();
    let failed_count = export.failed_count();

    if args.json {
        match export.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize report: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            for result in export.results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario,
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
