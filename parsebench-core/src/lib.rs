// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Parsebench Core Library
//!
//! Drives the parsers taking part in a benchmark. Provides configuration
//! parsing, supervised long-lived worker processes speaking a line protocol,
//! one-shot command parsers, and the registry holding them.

pub mod config;
pub mod error;
pub mod parser;
pub mod registry;
pub mod state;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use config::{
    BenchmarkConfig, CommandConfig, CommandInput, Config, ConfigLoader, Framing, ParserConfig,
    ParserKind, WorkerConfig,
};
pub use error::{
    BenchError, BenchResult, FailureKind, HardValidationError, ParseError, ParseResult,
    StartupFailure,
};
pub use parser::{CommandParser, Parser, WorkerParser};
pub use registry::ParserRegistry;
pub use state::{SessionState, SessionStateMachine};
pub use types::{ParserName, ProcessId, Program};
pub use worker::{ProcessSupervisor, ProtocolClient};
