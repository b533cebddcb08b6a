// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod list;
pub mod probe;
pub mod run;
pub mod show;
pub mod validate;

use parsebench_core::{ParserConfig, ParserKind, Program};

/// Program a parser definition runs.
pub(crate) fn program_of(parser: &ParserConfig) -> &Program {
    match &parser.kind {
        ParserKind::Worker(worker) => &worker.program,
        ParserKind::Command(command) => &command.program,
    }
}
