// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

use super::Parser;
use crate::config::WorkerConfig;
use crate::error::ParseResult;
use crate::types::ParserName;
use crate::worker::ProtocolClient;

/// Parser backed by a long-lived worker process.
///
/// The worker starts on the first call and is reused for every later one.
#[derive(Debug)]
pub struct WorkerParser {
    name: ParserName,
    client: ProtocolClient,
}

impl WorkerParser {
    pub fn new(name: ParserName, config: WorkerConfig) -> Self {
        let client = ProtocolClient::new(name.as_str(), config);
        Self { name, client }
    }
}

impl Parser for WorkerParser {
    fn name(&self) -> &ParserName {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "worker"
    }

    fn parse(&self, source: &str) -> ParseResult<()> {
        self.client.parse(source)
    }

    fn shutdown(&self) {
        self.client.shutdown();
    }
}
