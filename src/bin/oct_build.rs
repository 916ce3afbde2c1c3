//! Category Tree Builder Binary
//!
//! Builds overlapping category trees for a dataset and prints a JSON sweep
//! report on stdout:
//! - Structured JSON logging (or pretty logs for development)
//! - One pipeline run per requested δ
//! - Optional tree dump on stderr
//!
//! ## Configuration
//!
//! Environment variables:
//! - `OCT_DATA_FILE`: dataset path (or pass it as the first argument)
//! - `OCT_SIMILARITY`: `jaccard` | `f1` | `perfect_recall` | `exact` (default: jaccard)
//! - `OCT_DELTAS`: comma-separated δ values (default: `OCT_DELTA` or 0.95)
//! - `OCT_MERGE_THRESHOLD`: sibling merge threshold (default: 0.01)
//! - `OCT_PARALLEL`: process components in parallel (default: true)
//! - `OCT_VERIFY`: verify tree invariants (default: true)
//! - `OCT_PRINT_TREE`: print every tree to stderr (default: false)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! OCT_DELTAS=0.8,0.9,0.95 cargo run --bin oct_build -- data/bestbuy.json
//! ```

use std::time::Instant;

use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use oct_kernel::policy::{parse_bool, parse_deltas};
use oct_kernel::{sweep_with, Dataset, PipelineConfig};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "oct_kernel=info,oct_build=info".into());

    if log_format == "pretty" {
        // Pretty format for local development
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
    } else {
        // JSON format for log collectors; stdout is reserved for the report
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    let build_sha = option_env!("BUILD_SHA").unwrap_or("dev");
    info!(version = version, build_sha = build_sha, "Starting category tree builder");

    // Load configuration from environment
    let data_file = std::env::var("OCT_DATA_FILE")
        .ok()
        .or_else(|| std::env::args().nth(1))
        .ok_or("no dataset: set OCT_DATA_FILE or pass a path")?;

    let config = PipelineConfig::from_env()?;
    let deltas = match std::env::var("OCT_DELTAS") {
        Ok(raw) => parse_deltas(&raw)?,
        Err(_) => vec![config.delta],
    };
    if deltas.is_empty() {
        return Err("OCT_DELTAS holds no values".into());
    }
    let print_tree = match std::env::var("OCT_PRINT_TREE") {
        Ok(raw) => parse_bool("OCT_PRINT_TREE", &raw)?,
        Err(_) => false,
    };

    info!(
        similarity = %config.similarity,
        deltas = ?deltas,
        merge_threshold = config.merge_threshold,
        params_hash = %config.params_hash(),
        "Configuration loaded"
    );
    if !config.verify {
        warn!("Tree verification disabled");
    }

    let load_start = Instant::now();
    let dataset = Dataset::from_path(&data_file)?;
    info!(
        file = %data_file,
        queries = dataset.stats.queries,
        components = dataset.stats.components,
        trivial_weight = dataset.stats.trivial_weight(),
        total_weight = dataset.stats.total_weight,
        latency_ms = load_start.elapsed().as_millis() as u64,
        "Dataset loaded"
    );

    let report = sweep_with(&dataset, &config, &deltas, |run| {
        if print_tree {
            for result in &run.components {
                eprintln!("component {} (delta = {})", result.component, run.report.config.delta);
                eprint!("{}", result.tree);
            }
        }
    })?;

    for (delta, score) in report.scores() {
        info!(delta = delta, final_score = score, "Run complete");
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
