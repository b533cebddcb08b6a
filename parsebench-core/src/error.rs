// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for parsebench.
//!
//! Explicit enum error types only. No `Box<dyn Error>`, no `anyhow::Result`
//! in the library: every failure a caller may need to branch on is a variant.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ParserName;

/// Top-level error type for configuration, registry and I/O failures.
#[derive(Debug, Error)]
pub enum BenchError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Parser Errors
    // =========================================================================
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Parser not found: {0}")]
    ParserNotFound(ParserName),

    #[error("Parser already registered: {0}")]
    DuplicateParser(ParserName),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors stop the benchmark before any worker is spawned.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Duplicate parser name: {name}")]
    DuplicateParserName { name: String },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },
}

/// Session state transition errors.
#[derive(Debug, Error)]
pub enum StateTransitionError {
    #[error("Cannot transition worker session from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

/// The worker could not be brought to the ready state.
#[derive(Debug, Error)]
pub enum StartupFailure {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {stream} was not captured")]
    StreamUnavailable { stream: &'static str },

    #[error("worker failed readiness handshake, first line was {line:?}")]
    HandshakeMismatch { line: String },

    #[error("worker did not send READY within {timeout_ms}ms")]
    HandshakeTimeout { timeout_ms: u64 },

    #[error("worker exited before sending READY")]
    ExitedBeforeReady,

    #[error("failed to read readiness line: {0}")]
    ReadFailed(#[source] std::io::Error),
}

/// Outcome of a failed `parse` call.
///
/// `Startup` and `Protocol` are fatal to the session: the worker has already
/// been stopped when the caller sees them, and the next call starts a fresh
/// one. `Application` is an ordinary negative result and leaves the worker
/// running.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("startup failure: {0}")]
    Startup(#[from] StartupFailure),

    #[error("{message}")]
    Application { message: String },

    #[error("protocol error: {message}")]
    Protocol { message: String },

    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("invalid session state: {0}")]
    State(#[from] StateTransitionError),
}

/// Coarse classification of a [`ParseError`], recorded in benchmark results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Startup,
    Application,
    Protocol,
    InvalidRequest,
}

impl FailureKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Application => "application",
            Self::Protocol => "protocol",
            Self::InvalidRequest => "invalid_request",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl ParseError {
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Startup(_) => FailureKind::Startup,
            Self::Application { .. } => FailureKind::Application,
            // State errors tear the session down like a bad line does
            Self::Protocol { .. } | Self::State(_) => FailureKind::Protocol,
            Self::InvalidRequest { .. } => FailureKind::InvalidRequest,
        }
    }

    /// Whether this failure tears the worker down.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::Startup | FailureKind::Protocol
        )
    }
}

/// Result type alias using BenchError.
pub type BenchResult<T> = Result<T, BenchError>;

/// Result type alias for parser calls.
pub type ParseResult<T> = Result<T, ParseError>;
