// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Result and report types.
//!
//! One [`RunRecord`] is produced per (file, parser) pair. The report
//! aggregates them per parser and per file.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parsebench_core::FailureKind;
use serde::{Deserialize, Serialize};
use sysinfo::System;

/// Latency distribution of the measured runs of one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyMetrics {
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: f64,
    /// Median (p50)
    pub median_ns: u64,
    pub p95_ns: u64,
    pub p99_ns: u64,
    pub std_dev_ns: f64,
}

impl LatencyMetrics {
    /// Calculate metrics from latency samples in nanoseconds.
    ///
    /// Returns `None` for an empty sample set.
    pub fn from_samples(mut samples: Vec<u64>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        samples.sort_unstable();
        let len = samples.len();

        let sum: u64 = samples.iter().sum();
        let mean_ns = sum as f64 / len as f64;
        let variance: f64 = samples
            .iter()
            .map(|&x| {
                let diff = x as f64 - mean_ns;
                diff * diff
            })
            .sum::<f64>()
            / len as f64;

        Some(Self {
            min_ns: samples[0],
            max_ns: samples[len - 1],
            mean_ns,
            median_ns: samples[len / 2],
            p95_ns: samples[(len as f64 * 0.95) as usize],
            p99_ns: samples[(len as f64 * 0.99) as usize],
            std_dev_ns: variance.sqrt(),
        })
    }

    /// Mean latency in seconds.
    pub fn mean_secs(&self) -> f64 {
        self.mean_ns / 1_000_000_000.0
    }

    /// Format latency in human-readable form (auto-selects ns/μs/ms).
    pub fn format_latency(ns: u64) -> String {
        if ns < 1_000 {
            format!("{}ns", ns)
        } else if ns < 1_000_000 {
            format!("{:.2}μs", ns as f64 / 1_000.0)
        } else if ns < 1_000_000_000 {
            format!("{:.2}ms", ns as f64 / 1_000_000.0)
        } else {
            format!("{:.2}s", ns as f64 / 1_000_000_000.0)
        }
    }
}

/// Host the benchmark ran on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub kernel_version: Option<String>,
    pub cpu_model: String,
    pub cpu_cores: usize,
    pub memory_bytes: u64,
    pub hostname: String,
}

impl SystemInfo {
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        let unknown = || "Unknown".to_string();
        Self {
            os: System::name().unwrap_or_else(unknown),
            os_version: System::os_version().unwrap_or_else(unknown),
            kernel_version: System::kernel_version(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|cpu| cpu.brand().to_string())
                .unwrap_or_else(unknown),
            cpu_cores: sys.cpus().len(),
            memory_bytes: sys.total_memory(),
            hostname: System::host_name().unwrap_or_else(unknown),
        }
    }
}

/// Outcome of benchmarking one parser on one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub parser_name: String,
    pub file_name: String,
    /// Mean of the measured runs in seconds. `None` when the pair failed.
    pub execution_time: Option<f64>,
    pub success: bool,
    pub error_message: Option<String>,
    pub error_kind: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyMetrics>,
}

impl RunRecord {
    pub fn success(
        parser_name: impl Into<String>,
        file_name: impl Into<String>,
        samples: Vec<u64>,
    ) -> Self {
        let latency = LatencyMetrics::from_samples(samples);
        Self {
            parser_name: parser_name.into(),
            file_name: file_name.into(),
            execution_time: Some(latency.as_ref().map_or(0.0, LatencyMetrics::mean_secs)),
            success: true,
            error_message: None,
            error_kind: None,
            latency,
        }
    }

    pub fn failure(
        parser_name: impl Into<String>,
        file_name: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            parser_name: parser_name.into(),
            file_name: file_name.into(),
            execution_time: None,
            success: false,
            error_message: Some(message.into()),
            error_kind: Some(kind),
            latency: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_files: usize,
    pub total_parsers: usize,
    pub iterations_per_test: u64,
}

/// Aggregate over every file for one parser. Times are in seconds and only
/// cover successful pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserStats {
    pub success_rate: f64,
    pub avg_time: Option<f64>,
    pub min_time: Option<f64>,
    pub max_time: Option<f64>,
    pub total_runs: usize,
    pub successful_runs: usize,
}

/// One parser's result on one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserFileResult {
    pub time: Option<f64>,
    pub success: bool,
    pub error: Option<String>,
    pub error_kind: Option<FailureKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStats {
    pub parser_results: BTreeMap<String, ParserFileResult>,
    pub fastest_parser: Option<String>,
    /// Successful parsers divided by the number of parsers in the run.
    pub success_rate: f64,
}

/// Complete benchmark report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub benchmark_suite: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub system_info: SystemInfo,
    pub summary: Summary,
    pub parser_stats: BTreeMap<String, ParserStats>,
    pub file_stats: BTreeMap<String, FileStats>,
    pub detailed_results: Vec<RunRecord>,
}

impl BenchmarkReport {
    /// Aggregate `records` for the parsers named in `parsers`.
    pub fn from_records(parsers: &[String], iterations: u64, records: Vec<RunRecord>) -> Self {
        let mut files: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
        files.sort_unstable();
        files.dedup();

        let summary = Summary {
            total_files: files.len(),
            total_parsers: parsers.len(),
            iterations_per_test: iterations,
        };

        let parser_stats = parsers
            .iter()
            .map(|name| (name.clone(), parser_stats(name, &records)))
            .collect();

        let mut file_stats: BTreeMap<String, FileStats> = BTreeMap::new();
        for record in &records {
            let stats = file_stats
                .entry(record.file_name.clone())
                .or_insert_with(|| FileStats {
                    parser_results: BTreeMap::new(),
                    fastest_parser: None,
                    success_rate: 0.0,
                });
            stats.parser_results.insert(
                record.parser_name.clone(),
                ParserFileResult {
                    time: record.execution_time.filter(|_| record.success),
                    success: record.success,
                    error: record.error_message.clone(),
                    error_kind: record.error_kind,
                },
            );
        }

        for stats in file_stats.values_mut() {
            let successes = stats.parser_results.values().filter(|r| r.success).count();
            stats.success_rate = ratio(successes, parsers.len());
            stats.fastest_parser = stats
                .parser_results
                .iter()
                .filter_map(|(name, r)| r.time.map(|t| (name, t)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(name, _)| name.clone());
        }

        Self {
            benchmark_suite: "parsebench".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            system_info: SystemInfo::collect(),
            summary,
            parser_stats,
            file_stats,
            detailed_results: records,
        }
    }
}

fn parser_stats(name: &str, records: &[RunRecord]) -> ParserStats {
    let runs: Vec<&RunRecord> = records.iter().filter(|r| r.parser_name == name).collect();
    let times: Vec<f64> = runs
        .iter()
        .filter(|r| r.success)
        .filter_map(|r| r.execution_time)
        .collect();

    let avg_time = if times.is_empty() {
        None
    } else {
        Some(times.iter().sum::<f64>() / times.len() as f64)
    };

    ParserStats {
        success_rate: ratio(times.len(), runs.len()),
        avg_time,
        min_time: times.iter().copied().min_by(f64::total_cmp),
        max_time: times.iter().copied().max_by(f64::total_cmp),
        total_runs: runs.len(),
        successful_runs: times.len(),
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(parser: &str, file: &str, secs: f64) -> RunRecord {
        RunRecord {
            parser_name: parser.to_string(),
            file_name: file.to_string(),
            execution_time: Some(secs),
            success: true,
            error_message: None,
            error_kind: None,
            latency: None,
        }
    }

    fn parsers() -> Vec<String> {
        vec!["qasm_ts".to_string(), "rust".to_string()]
    }

    #[test]
    fn test_latency_metrics_from_samples() {
        let samples = vec![100, 200, 300, 400, 500, 600, 700, 800, 900, 1000];
        let metrics = LatencyMetrics::from_samples(samples).unwrap();

        assert_eq!(metrics.min_ns, 100);
        assert_eq!(metrics.max_ns, 1000);
        assert_eq!(metrics.median_ns, 600);
        assert!((metrics.mean_ns - 550.0).abs() < 0.01);
        assert!(LatencyMetrics::from_samples(Vec::new()).is_none());
    }

    #[test]
    fn test_latency_format() {
        assert_eq!(LatencyMetrics::format_latency(500), "500ns");
        assert_eq!(LatencyMetrics::format_latency(1500), "1.50μs");
        assert_eq!(LatencyMetrics::format_latency(1_500_000), "1.50ms");
        assert_eq!(LatencyMetrics::format_latency(1_500_000_000), "1.50s");
    }

    #[test]
    fn test_success_record_uses_mean_seconds() {
        let record = RunRecord::success("rust", "a.qasm", vec![1_000_000, 3_000_000]);
        assert!((record.execution_time.unwrap() - 0.002).abs() < 1e-9);
        assert!(record.latency.is_some());
    }

    #[test]
    fn test_parser_stats() {
        let records = vec![
            ok("qasm_ts", "a.qasm", 0.002),
            ok("qasm_ts", "b.qasm", 0.004),
            RunRecord::failure("rust", "a.qasm", FailureKind::Application, "Parsing failed: x"),
            ok("rust", "b.qasm", 0.001),
        ];
        let report = BenchmarkReport::from_records(&parsers(), 10, records);

        let ts = &report.parser_stats["qasm_ts"];
        assert_eq!(ts.success_rate, 1.0);
        assert!((ts.avg_time.unwrap() - 0.003).abs() < 1e-9);
        assert_eq!(ts.min_time, Some(0.002));
        assert_eq!(ts.max_time, Some(0.004));

        let rust = &report.parser_stats["rust"];
        assert_eq!(rust.success_rate, 0.5);
        assert_eq!(rust.total_runs, 2);
        assert_eq!(rust.successful_runs, 1);

        assert_eq!(report.summary.total_files, 2);
        assert_eq!(report.summary.total_parsers, 2);
        assert_eq!(report.summary.iterations_per_test, 10);
    }

    #[test]
    fn test_file_stats() {
        let records = vec![
            ok("qasm_ts", "a.qasm", 0.002),
            RunRecord::failure("rust", "a.qasm", FailureKind::Protocol, "no response"),
            ok("qasm_ts", "b.qasm", 0.004),
            ok("rust", "b.qasm", 0.001),
        ];
        let report = BenchmarkReport::from_records(&parsers(), 10, records);

        let a = &report.file_stats["a.qasm"];
        assert_eq!(a.success_rate, 0.5);
        assert_eq!(a.fastest_parser.as_deref(), Some("qasm_ts"));
        assert_eq!(a.parser_results["rust"].time, None);
        assert_eq!(a.parser_results["rust"].error_kind, Some(FailureKind::Protocol));

        let b = &report.file_stats["b.qasm"];
        assert_eq!(b.success_rate, 1.0);
        assert_eq!(b.fastest_parser.as_deref(), Some("rust"));
    }

    #[test]
    fn test_parser_without_successes() {
        let records = vec![RunRecord::failure(
            "rust",
            "a.qasm",
            FailureKind::Startup,
            "failed to spawn",
        )];
        let report = BenchmarkReport::from_records(&parsers(), 1, records);

        let rust = &report.parser_stats["rust"];
        assert_eq!(rust.avg_time, None);
        assert_eq!(rust.min_time, None);
        assert_eq!(rust.success_rate, 0.0);

        // Configured but never run
        assert_eq!(report.parser_stats["qasm_ts"].total_runs, 0);
        assert_eq!(report.file_stats["a.qasm"].fastest_parser, None);
    }

    #[test]
    fn test_report_serialization() {
        let report = BenchmarkReport::from_records(&parsers(), 3, vec![ok("rust", "a.qasm", 0.5)]);
        let json = serde_json::to_string_pretty(&report).unwrap();
        assert!(json.contains("\"iterations_per_test\": 3"));
        assert!(json.contains("\"fastest_parser\": \"rust\""));
        assert!(json.contains("detailed_results"));
        assert!(json.contains("system_info"));
    }
}
