// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `parsebench show` command - Print a saved report.

use std::path::Path;

use parsebench_benchmark::{render_summary, JsonReporter};

pub async fn execute(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let report = JsonReporter::load(path)?;

    println!(
        "Report: {} v{} ({})",
        report.benchmark_suite,
        report.version,
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Host:   {} ({} cores, {} {})",
        report.system_info.hostname,
        report.system_info.cpu_cores,
        report.system_info.os,
        report.system_info.os_version
    );
    print!("{}", render_summary(&report));

    if !report.file_stats.is_empty() {
        println!();
        println!("Files:");
        for (file, stats) in &report.file_stats {
            println!(
                "  {:<32} success {:>5.1}%  fastest: {}",
                file,
                stats.success_rate * 100.0,
                stats.fastest_parser.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}
