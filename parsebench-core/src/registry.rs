// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Ordered registry of the parsers taking part in a benchmark run.
//!
//! Parsers keep the order they were configured in, which is also the order
//! they are benchmarked and reported in.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{BenchError, BenchResult};
use crate::parser::{self, Parser};
use crate::types::ParserName;

/// Registry owning every parser.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn Parser>>,
}

impl ParserRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Build a parser for every definition in `config`.
    ///
    /// No process is started here; workers start on their first call.
    pub fn from_config(config: &Config) -> BenchResult<Self> {
        let mut registry = Self::new();
        for parser_config in &config.parsers {
            registry.register(parser::from_config(parser_config))?;
        }
        Ok(registry)
    }

    /// Create a registry wrapped in an Arc for sharing across threads.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Register a parser. Names must be unique.
    pub fn register(&mut self, parser: Box<dyn Parser>) -> BenchResult<()> {
        if self.contains(parser.name()) {
            return Err(BenchError::DuplicateParser(parser.name().clone()));
        }
        tracing::debug!(parser = %parser.name(), kind = parser.kind(), "Registered parser");
        self.parsers.push(parser);
        Ok(())
    }

    pub fn get(&self, name: &ParserName) -> BenchResult<&dyn Parser> {
        self.parsers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
            .ok_or_else(|| BenchError::ParserNotFound(name.clone()))
    }

    pub fn contains(&self, name: &ParserName) -> bool {
        self.parsers.iter().any(|p| p.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Parser> {
        self.parsers.iter().map(|p| p.as_ref())
    }

    /// Parser names in registration order.
    pub fn names(&self) -> Vec<ParserName> {
        self.parsers.iter().map(|p| p.name().clone()).collect()
    }

    /// Keep only the named parsers, in their registered order.
    pub fn retain(&mut self, names: &[ParserName]) -> BenchResult<()> {
        if let Some(missing) = names.iter().find(|n| !self.contains(n)) {
            return Err(BenchError::ParserNotFound(missing.clone()));
        }
        self.parsers.retain(|p| names.contains(p.name()));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Shut down every parser. Safe to call more than once.
    pub fn shutdown_all(&self) {
        tracing::info!(parsers = self.parsers.len(), "Shutting down all parsers");
        for parser in &self.parsers {
            parser.shutdown();
        }
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("parsers", &self.names())
            .finish()
    }
}
