//! CLI tool for computing fixed-notional slippage over a snapshot file.
//!
//! Reads JSON-lines book levels (`{"timestamp":..,"side":"bid","price":..,"quantity":..}`),
//! walks every ladder for the given notional, and writes one combined record
//! per instant where both sides could be filled.
//!
//! # Usage
//!
//! ```bash
//! # Records to stdout, progress to stderr
//! cargo run --release --bin slippage_report -- \
//!     --input data/BINANCE_ETH-USDT_2021-05-19.jsonl \
//!     --order-amount 1000000
//!
//! # Records and warnings to files, four workers
//! cargo run --release --bin slippage_report -- \
//!     --input data/BINANCE_ETH-USDT_2021-05-19.jsonl \
//!     --order-amount 1000000 \
//!     --output data/slippage.jsonl \
//!     --warnings data/warnings.json \
//!     --threads 4
//! ```

use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use lob_slippage::{
    ClearingPolicy, EngineConfig, JsonLinesSink, JsonLinesSource, MetricsSink, Parallelism,
    SlippageEngine, SlippageReport, SlippageSummary, WarningTracker,
};

/// Command-line arguments
struct Args {
    /// JSON-lines level file
    input: PathBuf,
    /// Notional in quote currency (overrides the config file)
    order_amount: Option<f64>,
    /// Records destination, stdout when absent
    output: Option<PathBuf>,
    /// Engine config JSON
    config: Option<PathBuf>,
    /// Parallelism override
    parallelism: Option<Parallelism>,
    /// Take the first crossing row instead of failing the partition
    first_wins: bool,
    /// Warning log destination
    warnings: Option<PathBuf>,
}

fn parse_args() -> std::result::Result<Args, String> {
    let args: Vec<String> = env::args().collect();

    let mut input: Option<PathBuf> = None;
    let mut order_amount: Option<f64> = None;
    let mut output: Option<PathBuf> = None;
    let mut config: Option<PathBuf> = None;
    let mut parallelism: Option<Parallelism> = None;
    let mut first_wins = false;
    let mut warnings: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" | "-i" => {
                i += 1;
                let value = args.get(i).ok_or("--input requires a path")?;
                input = Some(PathBuf::from(value));
            }
            "--order-amount" | "-n" => {
                i += 1;
                let value = args.get(i).ok_or("--order-amount requires a number")?;
                let amount = value
                    .parse::<f64>()
                    .map_err(|e| format!("Invalid --order-amount '{}': {}", value, e))?;
                order_amount = Some(amount);
            }
            "--output" | "-o" => {
                i += 1;
                let value = args.get(i).ok_or("--output requires a path")?;
                output = Some(PathBuf::from(value));
            }
            "--config" | "-c" => {
                i += 1;
                let value = args.get(i).ok_or("--config requires a path")?;
                config = Some(PathBuf::from(value));
            }
            "--threads" | "-t" => {
                i += 1;
                let value = args.get(i).ok_or("--threads requires a count")?;
                let n = value
                    .parse::<usize>()
                    .map_err(|e| format!("Invalid --threads '{}': {}", value, e))?;
                parallelism = Some(Parallelism::Threads(n));
            }
            "--sequential" => {
                parallelism = Some(Parallelism::Sequential);
            }
            "--first-wins" => {
                first_wins = true;
            }
            "--warnings" | "-w" => {
                i += 1;
                let value = args.get(i).ok_or("--warnings requires a path")?;
                warnings = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            arg => {
                if input.is_none() && !arg.starts_with('-') {
                    input = Some(PathBuf::from(arg));
                } else {
                    return Err(format!("Unknown argument: {}", arg));
                }
            }
        }
        i += 1;
    }

    let input = input.ok_or("Input path is required")?;
    if order_amount.is_none() && config.is_none() {
        return Err("--order-amount or --config is required".to_string());
    }

    Ok(Args {
        input,
        order_amount,
        output,
        config,
        parallelism,
        first_wins,
        warnings,
    })
}

fn print_help() {
    eprintln!(
        r#"
Slippage Report

Walks every (timestamp, side) ladder in a snapshot file for a fixed
quote-currency notional and emits buy/sell slippage per instant.

USAGE:
    slippage_report [OPTIONS] --input <PATH> --order-amount <N>

OPTIONS:
    -i, --input <PATH>          JSON-lines file of book levels
    -n, --order-amount <N>      Notional in quote currency
    -o, --output <PATH>         Write records here instead of stdout
    -c, --config <PATH>         Engine config JSON (flags override it)
    -t, --threads <N>           Dedicated worker pool of N threads
        --sequential            Evaluate partitions on the calling thread
        --first-wins            Take the first crossing row on ambiguity
    -w, --warnings <PATH>       Export the warning log as JSON
    -h, --help                  Print this help message

EXAMPLES:
    slippage_report -i data/BINANCE_ETH-USDT_2021-05-19.jsonl -n 1000000
    slippage_report -i levels.jsonl -c engine.json -o out.jsonl --threads 8

NOTES:
    - Instants where only one side can absorb the notional are dropped
    - Failed partitions are reported on stderr and do not stop the run
    - Set RUST_LOG=debug for per-partition detail
"#
    );
}

fn build_config(args: &Args) -> lob_slippage::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load_json(path)?,
        None => EngineConfig::default(),
    };

    if let Some(amount) = args.order_amount {
        config.order_amount = amount;
    }
    if let Some(parallelism) = args.parallelism {
        config = config.with_parallelism(parallelism);
    }
    if args.first_wins {
        config = config.with_clearing_policy(ClearingPolicy::FirstInWalkOrder);
    }

    config.validate()?;
    Ok(config)
}

fn write_records(args: &Args, report: &SlippageReport) -> lob_slippage::Result<usize> {
    match &args.output {
        Some(path) => {
            let file = File::create(path)?;
            JsonLinesSink::new(file).write_all(&report.records)
        }
        None => {
            let stdout = io::stdout();
            JsonLinesSink::new(stdout.lock()).write_all(&report.records)
        }
    }
}

fn print_summary(report: &SlippageReport, elapsed: f64) {
    let stats = &report.stats;
    let summary = SlippageSummary::from_records(&report.records);

    eprintln!("\n{}", "=".repeat(60));
    eprintln!("Slippage Report");
    eprintln!("  Levels accepted: {}", stats.levels_accepted);
    eprintln!("  Levels rejected: {}", stats.levels_rejected);
    eprintln!("  Parse errors: {}", stats.parse_errors);
    eprintln!("  Partitions: {}", stats.partitions);
    eprintln!("  Cleared: {}", stats.cleared);
    eprintln!("  Insufficient depth: {}", stats.insufficient_depth);
    eprintln!("  Empty ladders: {}", stats.empty);
    eprintln!("  Failed: {}", stats.failed);
    eprintln!(
        "  One-sided instants dropped: {} buy-only, {} sell-only",
        stats.buy_only, stats.sell_only
    );
    eprintln!("  Combined records: {}", stats.combined);

    if !summary.is_empty() {
        eprintln!(
            "  Buy  % slippage: mean {:.6e}, max {:.6e}",
            summary.buy.percent_slippage.mean, summary.buy.percent_slippage.max
        );
        eprintln!(
            "  Sell % slippage: mean {:.6e}, max {:.6e}",
            summary.sell.percent_slippage.mean, summary.sell.percent_slippage.max
        );
    }
    eprintln!("  Warnings: {}", report.warnings.total);
    eprintln!("  Total time: {:.2}s", elapsed);

    for failure in &report.failures {
        eprintln!("  FAILED {}: {}", failure.key, failure.error);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let engine = match SlippageEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let source = match JsonLinesSource::open(&args.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error opening {}: {}", args.input.display(), e);
            std::process::exit(1);
        }
    };

    let start_time = Instant::now();
    let mut tracker = WarningTracker::new();
    let report = match engine.run_source_tracked(source, &mut tracker) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = write_records(&args, &report) {
        eprintln!("Error writing records: {}", e);
        std::process::exit(1);
    }

    if let Some(path) = &args.warnings {
        if let Err(e) = tracker.export_to_file(path) {
            eprintln!("Error writing warnings to {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }

    print_summary(&report, start_time.elapsed().as_secs_f64());
    let _ = io::stderr().flush();
}
