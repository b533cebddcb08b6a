// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Runs every registered parser over every corpus file.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parsebench_core::{BenchmarkConfig, FailureKind, Parser, ParserName, ParserRegistry};

use crate::corpus::{Corpus, CorpusFile};
use crate::harness::BenchmarkHarness;
use crate::metrics::{BenchmarkReport, RunRecord};

/// Benchmark driver over a parser registry.
///
/// A failing pair is recorded and the run moves on. The only failure that
/// changes the run is a parser failing to start too many times in a row:
/// it is disabled and its remaining pairs are recorded as startup failures
/// without being attempted.
pub struct BenchmarkRunner<'a> {
    registry: &'a ParserRegistry,
    harness: BenchmarkHarness,
    abort_after_startup_failures: u32,
    cancelled: Arc<AtomicBool>,
}

/// Per-parser count of startup failures in a row.
#[derive(Debug, Default)]
struct StartupTracker {
    consecutive: HashMap<ParserName, u32>,
}

impl StartupTracker {
    fn record(&mut self, parser: &ParserName, kind: Option<FailureKind>) -> u32 {
        let count = self.consecutive.entry(parser.clone()).or_insert(0);
        if kind == Some(FailureKind::Startup) {
            *count += 1;
        } else {
            *count = 0;
        }
        *count
    }

    fn count(&self, parser: &ParserName) -> u32 {
        self.consecutive.get(parser).copied().unwrap_or(0)
    }
}

impl<'a> BenchmarkRunner<'a> {
    pub fn new(registry: &'a ParserRegistry, config: &BenchmarkConfig) -> Self {
        Self {
            registry,
            harness: BenchmarkHarness::new()
                .warmup(config.warmup)
                .iterations(config.iterations),
            abort_after_startup_failures: config.abort_after_startup_failures,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a flag that stops the run before the next pair once set.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn iterations(&self) -> u64 {
        self.harness.measurement_iterations()
    }

    /// Benchmark every (file, parser) pair, files outermost.
    pub fn run(&self, corpus: &Corpus) -> Vec<RunRecord> {
        let mut records = Vec::with_capacity(corpus.len() * self.registry.len());
        let mut startups = StartupTracker::default();

        tracing::info!(
            files = corpus.len(),
            parsers = self.registry.len(),
            iterations = self.iterations(),
            "Starting benchmark run"
        );

        for file in corpus.files() {
            tracing::info!(file = %file.name, "Benchmarking file");
            for parser in self.registry.iter() {
                if self.cancelled.load(Ordering::SeqCst) {
                    tracing::warn!("Benchmark run cancelled");
                    return records;
                }

                let failures = startups.count(parser.name());
                let record = if self.is_disabled(failures) {
                    RunRecord::failure(
                        parser.name().as_str(),
                        &file.name,
                        FailureKind::Startup,
                        format!(
                            "parser disabled after {} consecutive startup failures",
                            failures
                        ),
                    )
                } else {
                    let record = self.run_pair(parser, file);
                    let failures = startups.record(parser.name(), record.error_kind);
                    if self.is_disabled(failures) {
                        tracing::error!(
                            parser = %parser.name(),
                            failures,
                            "Parser failed to start repeatedly, skipping it for the rest of the run"
                        );
                    }
                    record
                };
                records.push(record);
            }
        }

        records
    }

    /// Run and aggregate into a report.
    pub fn run_report(&self, corpus: &Corpus) -> BenchmarkReport {
        let names: Vec<String> = self.registry.names().iter().map(|n| n.to_string()).collect();
        let records = self.run(corpus);
        BenchmarkReport::from_records(&names, self.iterations(), records)
    }

    /// Benchmark one parser on one file.
    pub fn run_pair(&self, parser: &dyn Parser, file: &CorpusFile) -> RunRecord {
        tracing::info!(parser = %parser.name(), file = %file.name, "Running parser");

        match self.harness.try_run(|| parser.parse(&file.contents)) {
            Ok(samples) => {
                let record = RunRecord::success(parser.name().as_str(), &file.name, samples);
                tracing::debug!(
                    parser = %parser.name(),
                    file = %file.name,
                    mean_secs = record.execution_time,
                    "Parser succeeded"
                );
                record
            }
            Err(e) => {
                tracing::error!(
                    parser = %parser.name(),
                    file = %file.name,
                    kind = %e.kind(),
                    error = %e,
                    "Parser failed"
                );
                RunRecord::failure(parser.name().as_str(), &file.name, e.kind(), e.to_string())
            }
        }
    }

    fn is_disabled(&self, consecutive_failures: u32) -> bool {
        self.abort_after_startup_failures > 0
            && consecutive_failures >= self.abort_after_startup_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parsebench_core::{ParseError, ParseResult, StartupFailure};
    use std::sync::atomic::AtomicUsize;

    /// Fails to start on every call and counts its calls.
    struct NeverStarts {
        name: ParserName,
        calls: Arc<AtomicUsize>,
    }

    impl Parser for NeverStarts {
        fn name(&self) -> &ParserName {
            &self.name
        }

        fn kind(&self) -> &'static str {
            "fake"
        }

        fn parse(&self, _source: &str) -> ParseResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StartupFailure::ExitedBeforeReady.into())
        }
    }

    /// Accepts sources containing "qubit".
    struct Keyword {
        name: ParserName,
    }

    impl Parser for Keyword {
        fn name(&self) -> &ParserName {
            &self.name
        }

        fn kind(&self) -> &'static str {
            "fake"
        }

        fn parse(&self, source: &str) -> ParseResult<()> {
            if source.contains("qubit") {
                Ok(())
            } else {
                Err(ParseError::application("missing qubit"))
            }
        }
    }

    fn config(abort_after: u32) -> BenchmarkConfig {
        BenchmarkConfig {
            corpus_dir: "qasm".into(),
            extension: "qasm".to_string(),
            iterations: 3,
            warmup: 1,
            abort_after_startup_failures: abort_after,
        }
    }

    fn corpus(n: usize) -> Corpus {
        Corpus::from_files(
            (0..n)
                .map(|i| CorpusFile {
                    name: format!("{:02}.qasm", i),
                    contents: if i % 2 == 0 { "qubit q;" } else { "h q;" }.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_records_every_pair() {
        let mut registry = ParserRegistry::new();
        registry
            .register(Box::new(Keyword {
                name: ParserName::new("keyword").unwrap(),
            }))
            .unwrap();

        let runner = BenchmarkRunner::new(&registry, &config(3));
        let records = runner.run(&corpus(4));

        assert_eq!(records.len(), 4);
        assert!(records[0].success);
        assert!(records[0].latency.is_some());
        assert!(!records[1].success);
        assert_eq!(records[1].error_kind, Some(FailureKind::Application));
        assert_eq!(records[1].error_message.as_deref(), Some("missing qubit"));
    }

    #[test]
    fn test_repeated_startup_failures_disable_parser() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ParserRegistry::new();
        registry
            .register(Box::new(NeverStarts {
                name: ParserName::new("broken").unwrap(),
                calls: Arc::clone(&calls),
            }))
            .unwrap();
        registry
            .register(Box::new(Keyword {
                name: ParserName::new("keyword").unwrap(),
            }))
            .unwrap();

        let runner = BenchmarkRunner::new(&registry, &config(2));
        let records = runner.run(&corpus(5));

        // Two attempts, then skipped
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let broken: Vec<_> = records.iter().filter(|r| r.parser_name == "broken").collect();
        assert_eq!(broken.len(), 5);
        assert!(broken.iter().all(|r| r.error_kind == Some(FailureKind::Startup)));
        assert_eq!(
            broken[4].error_message.as_deref(),
            Some("parser disabled after 2 consecutive startup failures")
        );

        // Other parsers are unaffected
        let keyword = records.iter().filter(|r| r.parser_name == "keyword").count();
        assert_eq!(keyword, 5);
    }

    #[test]
    fn test_zero_disables_cutoff() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ParserRegistry::new();
        registry
            .register(Box::new(NeverStarts {
                name: ParserName::new("broken").unwrap(),
                calls: Arc::clone(&calls),
            }))
            .unwrap();

        let runner = BenchmarkRunner::new(&registry, &config(0));
        runner.run(&corpus(4));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_cancelled_run_stops_early() {
        let mut registry = ParserRegistry::new();
        registry
            .register(Box::new(Keyword {
                name: ParserName::new("keyword").unwrap(),
            }))
            .unwrap();

        let cancelled = Arc::new(AtomicBool::new(true));
        let runner = BenchmarkRunner::new(&registry, &config(3)).with_cancel_flag(cancelled);
        assert!(runner.run(&corpus(3)).is_empty());
    }

    #[test]
    fn test_run_report() {
        let mut registry = ParserRegistry::new();
        registry
            .register(Box::new(Keyword {
                name: ParserName::new("keyword").unwrap(),
            }))
            .unwrap();

        let runner = BenchmarkRunner::new(&registry, &config(3));
        let report = runner.run_report(&corpus(2));

        assert_eq!(report.summary.total_files, 2);
        assert_eq!(report.summary.iterations_per_test, 3);
        assert_eq!(report.parser_stats["keyword"].success_rate, 0.5);
    }
}
