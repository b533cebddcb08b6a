// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `parsebench run` command - Benchmark every parser over the corpus.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parsebench_benchmark::{render_summary, BenchmarkRunner, Corpus, JsonReporter};
use parsebench_core::{ConfigLoader, HardValidationError, ParserName, ParserRegistry};

pub struct RunOptions {
    pub output: PathBuf,
    pub file_name: String,
    pub timestamped: bool,
    pub iterations: Option<u64>,
    pub parsers: Vec<String>,
}

pub async fn execute(
    config_path: &str,
    options: RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(config = %config_path, "Starting benchmark run");

    // Load and validate configuration - fail fast on invalid config
    let mut config = ConfigLoader::load_file(config_path)?;
    if let Some(iterations) = options.iterations {
        if iterations == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "iterations",
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            }
            .into());
        }
        config.benchmark.iterations = iterations;
    }

    let mut registry = ParserRegistry::from_config(&config)?;
    if !options.parsers.is_empty() {
        let names = options
            .parsers
            .iter()
            .map(ParserName::new)
            .collect::<Result<Vec<_>, _>>()?;
        registry.retain(&names)?;
    }

    let corpus = Corpus::load(&config.benchmark.corpus_dir, &config.benchmark.extension)?;
    if corpus.is_empty() {
        tracing::warn!(
            dir = %config.benchmark.corpus_dir.display(),
            extension = %config.benchmark.extension,
            "Corpus is empty"
        );
    }

    let registry = registry.into_shared();
    let cancelled = Arc::new(AtomicBool::new(false));

    let mut task = tokio::task::spawn_blocking({
        let registry = Arc::clone(&registry);
        let cancelled = Arc::clone(&cancelled);
        let benchmark = config.benchmark.clone();
        move || {
            BenchmarkRunner::new(&registry, &benchmark)
                .with_cancel_flag(cancelled)
                .run_report(&corpus)
        }
    });

    let outcome = tokio::select! {
        result = &mut task => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let Some(result) = outcome else {
        println!();
        println!("Interrupted, shutting down parsers...");
        tracing::warn!("Interrupted, stopping benchmark run");

        cancelled.store(true, Ordering::SeqCst);
        shutdown(&registry).await;
        // The pair in flight may have restarted a worker
        let _ = task.await;
        shutdown(&registry).await;
        std::process::exit(130);
    };

    shutdown(&registry).await;
    let report = result?;

    let reporter = JsonReporter::new(&options.output)?;
    let path = if options.timestamped {
        reporter.save_timestamped(&report)?
    } else {
        reporter.save(&report, &options.file_name)?
    };

    print!("{}", render_summary(&report));
    println!();
    println!("Report saved to: {}", path.display());

    Ok(())
}

async fn shutdown(registry: &Arc<ParserRegistry>) {
    let registry = Arc::clone(registry);
    if let Err(e) = tokio::task::spawn_blocking(move || registry.shutdown_all()).await {
        tracing::error!(error = %e, "Parser shutdown task failed");
    }
}
