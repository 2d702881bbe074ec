//! KVPulse CLI entry point
//!
//! Smoke run of the metrics stack: loads an in-memory store, drives a
//! YCSB-style operation mix through `OperationTracker<TrackedDb<MemoryDb>>`
//! from several threads, then prints every report.

use anyhow::{Context, Result};
use kvpulse::config::{cli::Cli, toml::load_config, MetricsConfig};
use kvpulse::db::memory::MemoryDb;
use kvpulse::db::{Db, FieldMap};
use kvpulse::output::{json, report};
use kvpulse::stats::progress::ProgressReporter;
use kvpulse::stats::{Collector, OperationTracker, TrackedDb};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Zipf};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

const TABLE: &str = "usertable";
const FIELD_COUNT: usize = 10;
const FIELD_LENGTH: usize = 100;

type BenchDb = OperationTracker<TrackedDb<MemoryDb>>;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli.validate()?;
    cli.init_logging()?;

    let config = load_config(&cli)?;

    println!("KVPulse v{}", env!("CARGO_PKG_VERSION"));
    println!("Key-value benchmark metrics");
    println!();
    print_configuration(&cli, &config);

    let collector = Arc::new(
        Collector::with_config(&config.histogram).context("Invalid histogram configuration")?,
    );

    let load_start = Instant::now();
    let store = load_store(&cli)?;
    info!(
        "Loaded {} records in {:.3}s",
        cli.record_count,
        load_start.elapsed().as_secs_f64()
    );

    let db: BenchDb = OperationTracker::with_bootstrap(
        TrackedDb::new(store, Arc::clone(&collector)),
        config.bootstrap.clone(),
    );

    println!();
    println!("Starting run...");
    println!();

    let mut reporter = config
        .output
        .progress_interval()
        .map(|interval| ProgressReporter::spawn(Arc::clone(&collector), interval));

    let errors = run_workload(&cli, &db)?;

    if let Some(reporter) = reporter.as_mut() {
        reporter.stop();
    }

    let backend_metrics = db.textual_metrics();
    collector.print_summary(backend_metrics.as_deref());
    if errors > 0 {
        println!("  Errors: {}", errors);
    }

    let rows = report::measurement_rows(&collector);
    print!("{}", report::format_measurements(&rows, &db.timings()));

    let reports = db.report_statistics();
    print!("{}", kvpulse::output::text::render_statistics(&reports));

    let written = db.generate_plots(&config.output.plot_dir)?;
    println!();
    println!(
        "Wrote {} sample series to {}",
        written.len(),
        config.output.plot_dir.display()
    );

    if let Some(path) = &config.output.json {
        json::write_statistics_json(path, &reports)?;
        println!("Wrote statistics to {}", path.display());
    }

    Ok(())
}

fn print_configuration(cli: &Cli, config: &MetricsConfig) {
    println!("Configuration:");
    println!("  Threads:      {}", cli.threads);
    println!("  Operations:   {}", cli.operations);
    println!("  Records:      {}", cli.record_count);
    println!(
        "  Mix:          read {}% / update {}% / insert {}% / scan {}% / delete {}%",
        cli.read_percent,
        cli.update_percent,
        cli.insert_percent,
        cli.scan_percent,
        cli.delete_percent()
    );
    println!("  Zipf:         {}", cli.zipf_exponent);
    println!(
        "  Bootstrap:    {} resamples, {:.0}% confidence",
        config.bootstrap.resamples,
        config.bootstrap.confidence * 100.0
    );
    if let Some(seed) = config.bootstrap.seed {
        println!("  Seed:         {}", seed);
    }
}

fn record_key(index: u64) -> String {
    format!("user{:010}", index)
}

fn record_values<R: Rng>(rng: &mut R) -> FieldMap {
    (0..FIELD_COUNT)
        .map(|i| {
            let mut value = vec![0u8; FIELD_LENGTH];
            rng.fill(&mut value[..]);
            (format!("field{}", i), value)
        })
        .collect()
}

fn worker_rng(seed: Option<u64>, thread_id: usize) -> Xoshiro256PlusPlus {
    match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(thread_id as u64)),
        None => Xoshiro256PlusPlus::from_entropy(),
    }
}

/// Populate the store directly, bypassing the metrics decorators
fn load_store(cli: &Cli) -> Result<MemoryDb> {
    let store = MemoryDb::new();
    let mut rng = worker_rng(cli.seed, usize::MAX);
    for index in 0..cli.record_count {
        store
            .insert(TABLE, &record_key(index), &record_values(&mut rng))
            .with_context(|| format!("Failed to load record {}", index))?;
    }
    Ok(store)
}

/// Run the operation mix on scoped threads; returns the number of failed calls
fn run_workload(cli: &Cli, db: &BenchDb) -> Result<u64> {
    let zipf = Zipf::new(cli.record_count, cli.zipf_exponent)
        .map_err(|e| anyhow::anyhow!("Invalid Zipf parameters: {}", e))?;
    let next_insert = AtomicU64::new(cli.record_count);
    let errors = AtomicU64::new(0);

    // Cumulative thresholds over a roll in 0..100
    let read_below = cli.read_percent;
    let update_below = read_below + cli.update_percent;
    let insert_below = update_below + cli.insert_percent;
    let scan_below = insert_below + cli.scan_percent;

    let per_thread = cli.operations / cli.threads as u64;
    let remainder = cli.operations % cli.threads as u64;

    thread::scope(|scope| {
        for thread_id in 0..cli.threads {
            let operations = per_thread + u64::from((thread_id as u64) < remainder);
            let zipf = &zipf;
            let next_insert = &next_insert;
            let errors = &errors;

            scope.spawn(move || {
                let mut rng = worker_rng(cli.seed, thread_id);
                let mut failed = 0u64;

                for _ in 0..operations {
                    // Zipf samples lie in [1, record_count]
                    let key = record_key(zipf.sample(&mut rng) as u64 - 1);
                    let roll: u8 = rng.gen_range(0..100);

                    let result = if roll < read_below {
                        db.read(TABLE, &key, &[]).map(|_| ())
                    } else if roll < update_below {
                        db.update(TABLE, &key, &record_values(&mut rng))
                    } else if roll < insert_below {
                        let index = next_insert.fetch_add(1, Ordering::Relaxed);
                        db.insert(TABLE, &record_key(index), &record_values(&mut rng))
                    } else if roll < scan_below {
                        db.scan(TABLE, &key, cli.scan_length, &[]).map(|_| ())
                    } else {
                        db.delete(TABLE, &key)
                    };

                    if let Err(e) = result {
                        debug!("Thread {}: {}", thread_id, e);
                        failed += 1;
                    }
                }

                errors.fetch_add(failed, Ordering::Relaxed);
                debug!("Thread {} finished {} operations", thread_id, operations);
            });
        }
    });

    Ok(errors.load(Ordering::Relaxed))
}
