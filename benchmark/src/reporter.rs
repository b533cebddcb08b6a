// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! JSON report files and the console summary.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

use crate::metrics::BenchmarkReport;

/// File name used when no other is given.
pub const DEFAULT_REPORT_FILE: &str = "benchmark_results.json";

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("Report I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Writes reports as pretty-printed JSON into one directory.
#[derive(Debug)]
pub struct JsonReporter {
    output_dir: PathBuf,
}

impl JsonReporter {
    /// Create a reporter, creating `output_dir` if needed.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, ReporterError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save a report under `file_name`, replacing any existing file.
    ///
    /// Returns the path to the written file.
    pub fn save(&self, report: &BenchmarkReport, file_name: &str) -> Result<PathBuf, ReporterError> {
        let path = self.output_dir.join(file_name);

        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer.flush()?;

        tracing::info!(path = %path.display(), "Saved benchmark report");
        Ok(path)
    }

    /// Save a report under a name derived from the current time.
    pub fn save_timestamped(&self, report: &BenchmarkReport) -> Result<PathBuf, ReporterError> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ");
        self.save(report, &format!("benchmark_results_{}.json", timestamp))
    }

    /// Load an existing benchmark report from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<BenchmarkReport, ReporterError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Render the human-readable summary printed after a run.
pub fn render_summary(report: &BenchmarkReport) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    let _ = writeln!(out, "\nBenchmark Summary:");
    let _ = writeln!(out, "-----------------");
    let _ = writeln!(out, "Total files tested: {}", summary.total_files);
    let _ = writeln!(out, "Iterations per test: {}\n", summary.iterations_per_test);

    let _ = writeln!(out, "Parser Performance:");
    for (parser, stats) in &report.parser_stats {
        let _ = writeln!(out, "\n{}:", parser);
        let _ = writeln!(
            out,
            "  Success rate: {:.1}% ({}/{} files)",
            stats.success_rate * 100.0,
            stats.successful_runs,
            stats.total_runs
        );
        match (stats.avg_time, stats.min_time, stats.max_time) {
            (Some(avg), Some(min), Some(max)) => {
                let _ = writeln!(
                    out,
                    "  Average time: {:.2}ms (successful runs only)",
                    avg * 1000.0
                );
                let _ = writeln!(out, "  Min time: {:.2}ms", min * 1000.0);
                let _ = writeln!(out, "  Max time: {:.2}ms", max * 1000.0);
            }
            _ => {
                let _ = writeln!(out, "  No successful runs to measure timing");
            }
        }
    }

    out
}
