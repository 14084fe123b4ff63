//! Design-by-contract demonstration CLI.
//!
//! Provides the `dbc` binary. `demo` runs the bundled operations with
//! contract checking on and prints each outcome; `probe` searches one
//! bundled operation for counterexamples and prints the report as JSON.

mod ops;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use dbc_check::{
    disable_contracts, enable_contracts, Counterexample, Driver, DriverConfig, GenerationError,
    GenerationReport, GuardedOperation,
};
use dbc_core::{Args, Value};

/// Environment variable supplying the default seed for `probe`.
const SEED_ENV_VAR: &str = "DBC_SEED";

/// Contract enforcement and counterexample search.
#[derive(Parser)]
#[command(name = "dbc", about = "Contract enforcement and counterexample search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Call each bundled operation with contracts enabled, then disabled.
    Demo,

    /// Search a bundled operation for counterexamples.
    Probe {
        /// Operation to probe: div, clamp, sqrt, fact.
        operation: String,

        /// RNG seed (default: $DBC_SEED, else 0x5EED).
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum number of probes.
        #[arg(long)]
        budget: Option<usize>,

        /// Stop after this many failures (0 = no cap).
        #[arg(long)]
        max_counterexamples: Option<usize>,

        /// Random samples after the boundary phase.
        #[arg(long)]
        random: Option<usize>,

        /// Probe the deliberately broken variant.
        #[arg(long)]
        buggy: bool,

        /// Probe on all cores.
        #[arg(long)]
        parallel: bool,

        /// JSON file of saved counterexamples to replay first.
        #[arg(long)]
        regressions: Option<PathBuf>,

        /// Write discovered counterexamples to this JSON file.
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let ops = match ops::register(dbc_check::ContractRegistry::global()) {
        Ok(ops) => ops,
        Err(e) => {
            eprintln!("Error: failed to register bundled operations: {}", e);
            process::exit(2);
        }
    };

    let exit_code = match cli.command {
        Commands::Demo => run_demo(&ops),
        Commands::Probe {
            operation,
            seed,
            budget,
            max_counterexamples,
            random,
            buggy,
            parallel,
            regressions,
            save,
        } => {
            let mut config = DriverConfig {
                seed: seed.unwrap_or_else(default_seed),
                parallel,
                ..DriverConfig::default()
            };
            if let Some(budget) = budget {
                config.probe_budget = budget;
            }
            if let Some(cap) = max_counterexamples {
                config.max_counterexamples = cap;
            }
            if let Some(random) = random {
                config.random_samples = random;
            }
            run_probe(&ops, &operation, buggy, config, regressions, save)
        }
    };
    process::exit(exit_code);
}

fn default_seed() -> u64 {
    match std::env::var(SEED_ENV_VAR) {
        Ok(raw) => parse_seed(&raw).unwrap_or_else(|| {
            tracing::warn!("ignoring unparsable {}={:?}", SEED_ENV_VAR, raw);
            dbc_check::generate::DEFAULT_SEED
        }),
        Err(_) => dbc_check::generate::DEFAULT_SEED,
    }
}

/// Accepts decimal or `0x`-prefixed hexadecimal.
fn parse_seed(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

/// Execute the demo subcommand. Always returns 0.
fn run_demo(ops: &[ops::Bundled]) -> i32 {
    let calls: &[(&str, Vec<Value>)] = &[
        ("div", vec![7.into(), 2.into()]),
        ("div", vec![(-7).into(), 2.into()]),
        ("div", vec![1.into(), 0.into()]),
        ("clamp", vec![10.into(), 0.into(), 5.into()]),
        ("clamp_buggy", vec![10.into(), 0.into(), 5.into()]),
        ("sqrt", vec![4.0.into()]),
        ("sqrt", vec![(-1.0).into()]),
        ("fact", vec![5.into()]),
        ("fact", vec![(-1).into()]),
    ];

    println!("-- bundled contracts");
    for bundled in ops {
        let summary = bundled.operation.record().summary();
        println!(
            "{}: {} [pre: {}] [post: {}] [inv: {}]",
            summary.operation,
            summary
                .descriptions
                .specification
                .as_deref()
                .unwrap_or("no specification"),
            summary.preconditions.join("; "),
            summary.postconditions.join("; "),
            summary.invariants.join("; "),
        );
    }

    println!("-- contracts enabled");
    enable_contracts();
    for (name, values) in calls {
        demo_call(ops, name, values.clone());
    }

    println!("-- contracts disabled");
    disable_contracts();
    for (name, values) in calls {
        demo_call(ops, name, values.clone());
    }
    0
}

fn demo_call(ops: &[ops::Bundled], name: &str, values: Vec<Value>) {
    let Some(bundled) = ops::find(ops, name, false) else {
        return;
    };
    let shown = match Args::bind(bundled.operation.operation(), values.clone()) {
        Ok(args) => args.to_string(),
        Err(_) => format!("{:?}", values),
    };
    match bundled.operation.call(values) {
        Ok(result) => println!("{}({}) -> {}", name, shown, result),
        Err(e) => println!("{}({}) !! {}", name, shown, e),
    }
}

/// Execute the probe subcommand.
///
/// Returns exit code: 0 = no counterexamples, 1 = counterexamples found,
/// 2 = contract defect, 3 = I/O or input error.
fn run_probe(
    ops: &[ops::Bundled],
    name: &str,
    buggy: bool,
    mut config: DriverConfig,
    regressions: Option<PathBuf>,
    save: Option<PathBuf>,
) -> i32 {
    let Some(bundled) = ops::find(ops, name, buggy) else {
        eprintln!(
            "Error: no bundled operation '{}'{}",
            name,
            if buggy { " with a buggy variant" } else { "" }
        );
        return 3;
    };

    if let Some(path) = &regressions {
        match load_regressions(path) {
            Ok(saved) => config.regressions = saved,
            Err(msg) => {
                eprintln!("Error: {}", msg);
                return 3;
            }
        }
    }

    let report = match probe(&bundled.operation, bundled.domains.clone(), config) {
        Ok(report) => report,
        Err(e @ GenerationError::ContractDefect { .. }) => {
            eprintln!("Contract defect: {}", e);
            return 2;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 3;
        }
    };

    let json = serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
        format!("{{\"error\": \"failed to serialize report: {}\"}}", e)
    });
    println!("{}", json);

    if let Some(path) = &save {
        if let Err(msg) = save_counterexamples(path, &report) {
            eprintln!("Error: {}", msg);
            return 3;
        }
    }

    if report.is_clean() {
        0
    } else {
        1
    }
}

fn probe(
    operation: &GuardedOperation,
    domains: Option<Vec<dbc_core::Domain>>,
    config: DriverConfig,
) -> Result<GenerationReport, GenerationError> {
    match domains {
        Some(domains) => Driver::with_domains(operation, domains, config)?.run(),
        None => Driver::new(operation, config).run(),
    }
}

fn load_regressions(path: &Path) -> Result<Vec<Vec<Value>>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let saved: Vec<Counterexample> = serde_json::from_str(&text)
        .map_err(|e| format!("failed to parse '{}': {}", path.display(), e))?;
    Ok(saved.iter().map(Counterexample::replay_values).collect())
}

fn save_counterexamples(path: &Path, report: &GenerationReport) -> Result<(), String> {
    let failures: Vec<&Counterexample> = report
        .counterexamples
        .iter()
        .chain(&report.anomalies)
        .collect();
    let json = serde_json::to_string_pretty(&failures)
        .map_err(|e| format!("failed to serialize counterexamples: {}", e))?;
    std::fs::write(path, json).map_err(|e| format!("failed to write '{}': {}", path.display(), e))
}
