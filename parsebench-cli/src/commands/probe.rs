// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `parsebench probe` command - Send one input to one parser.

use std::io::Read;

use parsebench_benchmark::harness::measure;
use parsebench_core::{parser, BenchError, ConfigLoader, FailureKind, ParserName};

pub async fn execute(
    config_path: &str,
    name: &str,
    input: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_file(config_path)?;
    let name = ParserName::new(name)?;
    let parser_config = config
        .parser(&name)
        .ok_or_else(|| BenchError::ParserNotFound(name.clone()))?;

    let source = match input {
        Some(text) => text,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    let parser = parser::from_config(parser_config);
    let (result, elapsed) = tokio::task::spawn_blocking(move || {
        let outcome = measure(|| parser.parse(&source));
        parser.shutdown();
        outcome
    })
    .await?;

    let millis = elapsed.as_secs_f64() * 1000.0;
    match result {
        Ok(()) => {
            println!("✓ {} accepted the input ({:.2}ms)", name, millis);
            Ok(())
        }
        Err(e) => {
            let label = match e.kind() {
                FailureKind::Application => "rejected the input",
                FailureKind::Startup => "failed to start",
                FailureKind::Protocol => "broke the protocol",
                FailureKind::InvalidRequest => "cannot carry the input",
            };
            println!("✗ {} {} ({:.2}ms)", name, label, millis);
            println!("  [{}] {}", e.kind(), e);
            std::process::exit(1);
        }
    }
}
