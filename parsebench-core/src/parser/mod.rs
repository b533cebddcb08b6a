// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Parsers under benchmark.
//!
//! Every configured parser implements [`Parser`], whether it keeps a worker
//! alive between calls or spawns a fresh process per call.

mod command;
mod worker;

pub use command::CommandParser;
pub use worker::WorkerParser;

use crate::config::{ParserConfig, ParserKind};
use crate::error::ParseResult;
use crate::types::ParserName;

/// A parser that accepts or rejects source text.
pub trait Parser: Send + Sync {
    fn name(&self) -> &ParserName;

    /// Short description of how the parser runs, for listings and logs.
    fn kind(&self) -> &'static str;

    /// Parse `source`. `Ok(())` means the parser accepted it.
    fn parse(&self, source: &str) -> ParseResult<()>;

    /// Release any process held between calls. Idempotent.
    fn shutdown(&self) {}
}

/// Build the parser described by `config`.
pub fn from_config(config: &ParserConfig) -> Box<dyn Parser> {
    match &config.kind {
        ParserKind::Worker(worker) => {
            Box::new(WorkerParser::new(config.name.clone(), worker.clone()))
        }
        ParserKind::Command(command) => {
            Box::new(CommandParser::new(config.name.clone(), command.clone()))
        }
    }
}
