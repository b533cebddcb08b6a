// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `parsebench validate` command - Validate configuration file.

use parsebench_core::{ConfigLoader, ParserKind};

pub async fn execute(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating configuration");

    match ConfigLoader::load_file(file) {
        Ok(config) => {
            let benchmark = &config.benchmark;
            println!("✓ Configuration is valid");
            println!();
            println!("Benchmark Settings:");
            println!("  Corpus Directory:   {}", benchmark.corpus_dir.display());
            println!("  File Extension:     .{}", benchmark.extension);
            println!("  Iterations:         {}", benchmark.iterations);
            println!("  Warmup Runs:        {}", benchmark.warmup);
            println!(
                "  Startup Cut-off:    {}",
                match benchmark.abort_after_startup_failures {
                    0 => "disabled".to_string(),
                    n => format!("{} consecutive failures", n),
                }
            );
            println!();
            println!("Parsers ({}):", config.parsers.len());
            for parser in &config.parsers {
                match &parser.kind {
                    ParserKind::Worker(worker) => println!(
                        "  - {} (worker: {}, framing: {:?}, ready: {}ms, response: {}ms)",
                        parser.name,
                        worker.program,
                        worker.framing,
                        worker.ready_timeout.as_millis(),
                        worker.response_timeout.as_millis()
                    ),
                    ParserKind::Command(command) => println!(
                        "  - {} (command: {}, input: {:?}, timeout: {}ms)",
                        parser.name,
                        command.program,
                        command.input,
                        command.timeout.as_millis()
                    ),
                }
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
