//! Coalesce CLI - batched font lookups.
//!
//! Every id passed to `lookup` is requested on its own, the way independent
//! callers would, and the batch scheduler folds the uncached ones into
//! shared resolver round-trips.
//!
//! ## Quick Start
//!
//! ```bash
//! # Look up three fonts; the misses share one simulated round-trip
//! coalesce lookup 1 2 3
//!
//! # Tune batching through flags or the environment
//! COALESCE_DEBOUNCE_MS=25 coalesce lookup 1 2 3 --stagger-ms 5 --json
//! ```

mod fonts;
mod lookup;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use coalesce_core::{BatchScheduler, MetricsSnapshot, SchedulerConfig, SchedulerOptions};
use coalesce_store::{JsonFileStore, KeyValueStore, DEFAULT_STORE_NAME};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fonts::{FontItem, FontResolver};
use lookup::{CachedFont, FontLookup, LookupResult, Source};

#[derive(Parser)]
#[command(name = "coalesce")]
#[command(version)]
#[command(about = "Coalesce - batched, cached font lookups", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up fonts by id, batching cache misses into shared requests
    Lookup {
        /// Font ids to look up
        #[arg(required = true)]
        ids: Vec<String>,

        /// Directory holding the result cache
        #[arg(long, env = "COALESCE_STORE_DIR", default_value = ".coalesce")]
        store: PathBuf,

        /// Skip the result cache entirely
        #[arg(long)]
        no_cache: bool,

        /// Simulated latency of each resolver round-trip
        #[arg(long, default_value_t = 1000)]
        latency_ms: u64,

        /// Delay between issuing consecutive lookups
        #[arg(long, default_value_t = 0)]
        stagger_ms: u64,

        /// Queue length that triggers an eager flush
        #[arg(long)]
        max_size: Option<usize>,

        /// Maximum age of a batching window
        #[arg(long)]
        max_interval_ms: Option<u64>,

        /// Quiet period before a timer flush
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// How long cached results stay fresh
        #[arg(long, default_value_t = 3600)]
        revalidate_secs: u64,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the effective scheduler configuration
    Config,
}

/// Scheduler configuration in plain milliseconds
#[derive(Serialize)]
struct ConfigView {
    batch_max_interval_ms: u128,
    batch_max_size: usize,
    debounce_interval_ms: u128,
}

impl From<&SchedulerConfig> for ConfigView {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            batch_max_interval_ms: config.batch_max_interval.as_millis(),
            batch_max_size: config.batch_max_size,
            debounce_interval_ms: config.debounce_interval.as_millis(),
        }
    }
}

#[derive(Serialize)]
struct LookupReport {
    results: Vec<LookupResult>,
    resolver_calls: usize,
    config: ConfigView,
    stats: MetricsSnapshot,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("coalesce=info,coalesce_core=info,coalesce_store=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Lookup {
            ids,
            store,
            no_cache,
            latency_ms,
            stagger_ms,
            max_size,
            max_interval_ms,
            debounce_ms,
            revalidate_secs,
            json,
        } => {
            let config = SchedulerConfig::from_env().with_options(SchedulerOptions {
                batch_max_interval: max_interval_ms.map(Duration::from_millis),
                batch_max_size: max_size,
                debounce_interval: debounce_ms.map(Duration::from_millis),
            });

            let scheduler: BatchScheduler<String, FontItem> = BatchScheduler::new(config.clone());
            let resolver = Arc::new(FontResolver::new(Duration::from_millis(latency_ms)));
            scheduler.attach_resolver(Arc::clone(&resolver));

            let cache: Option<Arc<dyn KeyValueStore<CachedFont>>> = if no_cache {
                None
            } else {
                let store: JsonFileStore<CachedFont> =
                    JsonFileStore::open(&store, DEFAULT_STORE_NAME)
                        .await
                        .with_context(|| format!("Failed to open cache in {}", store.display()))?;
                Some(Arc::new(store))
            };

            let lookup = FontLookup::new(scheduler, cache, Duration::from_secs(revalidate_secs));

            info!(ids = ids.len(), ?config, "Starting lookups");

            let mut pending = Vec::with_capacity(ids.len());
            for (i, id) in ids.into_iter().enumerate() {
                if i > 0 && stagger_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(stagger_ms)).await;
                }
                let lookup = lookup.clone();
                pending.push(tokio::spawn(async move { lookup.lookup(id).await }));
            }

            let mut results = Vec::with_capacity(pending.len());
            for handle in pending {
                results.push(handle.await.context("Lookup task panicked")??);
            }

            let report = LookupReport {
                results,
                resolver_calls: resolver.calls(),
                config: ConfigView::from(&config),
                stats: lookup.scheduler().metrics().snapshot(),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Commands::Config => {
            let config = SchedulerConfig::from_env();
            println!("{}", serde_json::to_string_pretty(&ConfigView::from(&config))?);
        }
    }

    Ok(())
}

fn print_report(report: &LookupReport) {
    println!("=== Results ===");
    for result in &report.results {
        let source = match result.source {
            Source::Cache => "cache",
            Source::Resolver => "resolver",
        };
        println!("{:<12} {:<20} ({})", result.id, result.font.font_name, source);
    }

    println!();
    println!("=== Batching ===");
    println!("Resolver calls:   {}", report.resolver_calls);
    println!("Batches flushed:  {}", report.stats.batches_flushed);
    println!("Avg batch size:   {:.1}", report.stats.avg_batch_size);
    println!(
        "Flush reasons:    size={} staleness={} timer={}",
        report.stats.size_flushes, report.stats.staleness_flushes, report.stats.timer_flushes
    );
}
