// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Parsebench Benchmarking Framework
//!
//! Times every configured parser on every file of a corpus and aggregates
//! the outcomes into a JSON report.
//!
//! # Report Layout
//!
//! - **summary**: file count, parser count, iterations per pair
//! - **parser_stats**: success rate and min/avg/max time per parser
//! - **file_stats**: per-file results and the fastest parser
//! - **detailed_results**: one record per (file, parser) pair

pub mod corpus;
pub mod harness;
pub mod metrics;
pub mod reporter;
pub mod runner;

pub use corpus::{Corpus, CorpusError, CorpusFile};
pub use harness::BenchmarkHarness;
pub use metrics::{
    BenchmarkReport, FileStats, LatencyMetrics, ParserFileResult, ParserStats, RunRecord,
    Summary, SystemInfo,
};
pub use reporter::{render_summary, JsonReporter, ReporterError, DEFAULT_REPORT_FILE};
pub use runner::BenchmarkRunner;
