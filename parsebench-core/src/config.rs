// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Validates the benchmark settings and every parser definition before any
//! process is spawned. Any invalid field results in a HardValidationError.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult, HardValidationError};
use crate::types::{ParserName, Program};

/// Upper bound for every configurable timeout: 15 minutes.
const MAX_TIMEOUT_MS: u64 = 900_000;

/// Upper bound for the graceful stop window.
const MAX_STOP_GRACE_MS: u64 = 60_000;

const DEFAULT_READY_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_STOP_GRACE_MS: u64 = 1_000;
const DEFAULT_DIAGNOSTIC_LINES: usize = 64;

/// How a request is put on the worker's single input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Backslash-escape `\`, LF and CR so any text fits on one line.
    #[default]
    Escaped,
    /// Send text verbatim; payloads containing a line break are rejected.
    Raw,
}

/// How a one-shot command receives its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandInput {
    /// Source text is passed as the final command-line argument.
    #[default]
    Argument,
    /// Source text is written to the command's stdin.
    Stdin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawParserKind {
    Worker,
    Command,
}

/// Raw parser definition as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
struct RawParserConfig {
    name: String,
    kind: RawParserKind,
    program: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    working_dir: Option<String>,
    #[serde(default)]
    environment: HashMap<String, String>,
    #[serde(default)]
    framing: Framing,
    #[serde(default = "default_ready_timeout")]
    ready_timeout_ms: u64,
    #[serde(default = "default_response_timeout")]
    response_timeout_ms: u64,
    #[serde(default = "default_stop_grace")]
    stop_grace_ms: u64,
    #[serde(default = "default_diagnostic_lines")]
    diagnostic_lines: usize,
    #[serde(default)]
    input: CommandInput,
    #[serde(default = "default_command_timeout")]
    timeout_ms: u64,
}

fn default_ready_timeout() -> u64 {
    DEFAULT_READY_TIMEOUT_MS
}

fn default_response_timeout() -> u64 {
    DEFAULT_RESPONSE_TIMEOUT_MS
}

fn default_stop_grace() -> u64 {
    DEFAULT_STOP_GRACE_MS
}

fn default_diagnostic_lines() -> usize {
    DEFAULT_DIAGNOSTIC_LINES
}

fn default_command_timeout() -> u64 {
    30_000
}

/// Raw benchmark section.
#[derive(Debug, Deserialize)]
struct RawBenchmarkConfig {
    #[serde(default = "default_corpus_dir")]
    corpus_dir: String,
    #[serde(default = "default_extension")]
    extension: String,
    #[serde(default = "default_iterations")]
    iterations: u64,
    #[serde(default = "default_warmup")]
    warmup: u64,
    #[serde(default = "default_abort_after")]
    abort_after_startup_failures: u32,
}

fn default_corpus_dir() -> String {
    "qasm".to_string()
}

fn default_extension() -> String {
    "qasm".to_string()
}

fn default_iterations() -> u64 {
    10
}

fn default_warmup() -> u64 {
    1
}

fn default_abort_after() -> u32 {
    3
}

impl Default for RawBenchmarkConfig {
    fn default() -> Self {
        Self {
            corpus_dir: default_corpus_dir(),
            extension: default_extension(),
            iterations: default_iterations(),
            warmup: default_warmup(),
            abort_after_startup_failures: default_abort_after(),
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    benchmark: RawBenchmarkConfig,
    parsers: Vec<RawParserConfig>,
}

/// Validated settings for one long-lived worker process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub program: Program,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub environment: HashMap<String, String>,
    pub framing: Framing,
    /// Bound on the readiness read during start.
    pub ready_timeout: Duration,
    /// Bound on each response read.
    pub response_timeout: Duration,
    /// How long a terminated worker may take to exit before it is killed.
    pub stop_grace: Duration,
    /// Number of trailing stderr lines retained for diagnostics.
    pub diagnostic_lines: usize,
}

impl WorkerConfig {
    /// Settings for `program` with all defaults applied.
    pub fn new(program: Program) -> Self {
        Self {
            program,
            args: Vec::new(),
            working_dir: None,
            environment: HashMap::new(),
            framing: Framing::default(),
            ready_timeout: Duration::from_millis(DEFAULT_READY_TIMEOUT_MS),
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            stop_grace: Duration::from_millis(DEFAULT_STOP_GRACE_MS),
            diagnostic_lines: DEFAULT_DIAGNOSTIC_LINES,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn diagnostic_lines(mut self, lines: usize) -> Self {
        self.diagnostic_lines = lines;
        self
    }
}

/// Validated settings for a parser that runs one process per call.
#[derive(Debug, Clone)]
pub struct CommandConfig {
    pub program: Program,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub environment: HashMap<String, String>,
    pub input: CommandInput,
    pub timeout: Duration,
}

impl CommandConfig {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            args: Vec::new(),
            working_dir: None,
            environment: HashMap::new(),
            input: CommandInput::default(),
            timeout: Duration::from_millis(default_command_timeout()),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn input(mut self, input: CommandInput) -> Self {
        self.input = input;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The two parser shapes that can be configured.
#[derive(Debug, Clone)]
pub enum ParserKind {
    Worker(WorkerConfig),
    Command(CommandConfig),
}

impl ParserKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Worker(_) => "worker",
            Self::Command(_) => "command",
        }
    }
}

/// Validated parser definition.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub name: ParserName,
    pub kind: ParserKind,
}

/// Validated benchmark settings.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub corpus_dir: PathBuf,
    pub extension: String,
    pub iterations: u64,
    pub warmup: u64,
    /// Consecutive startup failures after which a parser is skipped for the
    /// rest of the run. Zero disables the cut-off.
    pub abort_after_startup_failures: u32,
}

/// Complete validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub benchmark: BenchmarkConfig,
    pub parsers: Vec<ParserConfig>,
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    ///
    /// A relative `corpus_dir` or `working_dir` is resolved against the
    /// directory containing the file.
    pub fn load_file(path: impl AsRef<Path>) -> BenchResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BenchError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BenchError::Io {
            context: "reading config file",
            source: e,
        })?;

        let mut config = Self::load_string(&content)?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> BenchResult<Config> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| BenchError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> BenchResult<Config> {
        let benchmark = Self::validate_benchmark(raw.benchmark)?;

        let mut parsers = Vec::with_capacity(raw.parsers.len());
        let mut seen_names = HashSet::new();

        for (index, raw_parser) in raw.parsers.into_iter().enumerate() {
            let parser = Self::validate_parser(raw_parser, index)?;

            if !seen_names.insert(parser.name.clone()) {
                return Err(HardValidationError::DuplicateParserName {
                    name: parser.name.to_string(),
                }
                .into());
            }

            parsers.push(parser);
        }

        if parsers.is_empty() {
            return Err(HardValidationError::SchemaValidation {
                message: "At least one parser must be defined".to_string(),
            }
            .into());
        }

        Ok(Config { benchmark, parsers })
    }

    fn validate_benchmark(raw: RawBenchmarkConfig) -> BenchResult<BenchmarkConfig> {
        if raw.iterations == 0 || raw.iterations > 100_000 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "iterations",
                value: raw.iterations.to_string(),
                reason: "Must be between 1 and 100000".to_string(),
            }
            .into());
        }

        if raw.warmup > 10_000 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "warmup",
                value: raw.warmup.to_string(),
                reason: "Must not exceed 10000".to_string(),
            }
            .into());
        }

        let extension = raw.extension.trim_start_matches('.').to_string();
        if extension.is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "extension",
                value: raw.extension,
                reason: "File extension cannot be empty".to_string(),
            }
            .into());
        }

        if raw.corpus_dir.trim().is_empty() {
            return Err(HardValidationError::MissingRequiredField {
                field: "corpus_dir",
                context: "benchmark".to_string(),
            }
            .into());
        }

        Ok(BenchmarkConfig {
            corpus_dir: PathBuf::from(raw.corpus_dir),
            extension,
            iterations: raw.iterations,
            warmup: raw.warmup,
            abort_after_startup_failures: raw.abort_after_startup_failures,
        })
    }

    fn validate_parser(raw: RawParserConfig, index: usize) -> BenchResult<ParserConfig> {
        let context = format!("parser at index {}", index);

        let name = ParserName::new(&raw.name).map_err(|mut e| {
            if let HardValidationError::InvalidFieldValue { ref mut field, .. } = e {
                *field = "name";
            }
            e
        })?;

        let program = match raw.program {
            Some(program) => Program::new(program)?,
            None => {
                return Err(HardValidationError::MissingRequiredField {
                    field: "program",
                    context,
                }
                .into())
            }
        };

        for key in raw.environment.keys() {
            if key.is_empty() || key.contains('=') {
                return Err(HardValidationError::InvalidFieldValue {
                    field: "environment",
                    value: format!("{:?} in {}", key, context),
                    reason: "Environment variable names must be non-empty and contain no '='"
                        .to_string(),
                }
                .into());
            }
        }

        let working_dir = raw.working_dir.map(PathBuf::from);

        let kind = match raw.kind {
            RawParserKind::Worker => {
                let ready_timeout = Self::validate_timeout("ready_timeout_ms", raw.ready_timeout_ms)?;
                let response_timeout =
                    Self::validate_timeout("response_timeout_ms", raw.response_timeout_ms)?;

                if raw.stop_grace_ms > MAX_STOP_GRACE_MS {
                    return Err(HardValidationError::InvalidFieldValue {
                        field: "stop_grace_ms",
                        value: raw.stop_grace_ms.to_string(),
                        reason: format!("Must not exceed {}ms", MAX_STOP_GRACE_MS),
                    }
                    .into());
                }

                if raw.diagnostic_lines > 10_000 {
                    return Err(HardValidationError::InvalidFieldValue {
                        field: "diagnostic_lines",
                        value: raw.diagnostic_lines.to_string(),
                        reason: "Must not exceed 10000".to_string(),
                    }
                    .into());
                }

                ParserKind::Worker(WorkerConfig {
                    program,
                    args: raw.args,
                    working_dir,
                    environment: raw.environment,
                    framing: raw.framing,
                    ready_timeout,
                    response_timeout,
                    stop_grace: Duration::from_millis(raw.stop_grace_ms),
                    diagnostic_lines: raw.diagnostic_lines,
                })
            }
            RawParserKind::Command => ParserKind::Command(CommandConfig {
                program,
                args: raw.args,
                working_dir,
                environment: raw.environment,
                input: raw.input,
                timeout: Self::validate_timeout("timeout_ms", raw.timeout_ms)?,
            }),
        };

        Ok(ParserConfig { name, kind })
    }

    fn validate_timeout(field: &'static str, value_ms: u64) -> BenchResult<Duration> {
        if value_ms == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field,
                value: "0".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            }
            .into());
        }

        if value_ms > MAX_TIMEOUT_MS {
            return Err(HardValidationError::InvalidFieldValue {
                field,
                value: value_ms.to_string(),
                reason: format!("Timeout must not exceed 15 minutes ({}ms)", MAX_TIMEOUT_MS),
            }
            .into());
        }

        Ok(Duration::from_millis(value_ms))
    }
}

impl Config {
    /// Look up a parser definition by name.
    pub fn parser(&self, name: &ParserName) -> Option<&ParserConfig> {
        self.parsers.iter().find(|p| &p.name == name)
    }

    fn rebase(&mut self, base: &Path) {
        if self.benchmark.corpus_dir.is_relative() {
            self.benchmark.corpus_dir = base.join(&self.benchmark.corpus_dir);
        }
        for parser in &mut self.parsers {
            let working_dir = match &mut parser.kind {
                ParserKind::Worker(worker) => &mut worker.working_dir,
                ParserKind::Command(command) => &mut command.working_dir,
            };
            if let Some(dir) = working_dir {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CONFIG: &str = r#"
benchmark:
  corpus_dir: qasm
  extension: .qasm
  iterations: 5
  warmup: 2

parsers:
  - name: qasm_ts
    kind: worker
    program: node
    args: [qasm_ts_server.js]
    working_dir: parsers
    stop_grace_ms: 250
    environment:
      NODE_ENV: "production"
  - name: rust
    kind: command
    program: ./rust_parser
    input: stdin
"#;

    #[test]
    fn test_valid_config() {
        let config = ConfigLoader::load_string(VALID_CONFIG).unwrap();
        assert_eq!(config.parsers.len(), 2);
        assert_eq!(config.benchmark.iterations, 5);
        assert_eq!(config.benchmark.extension, "qasm");

        match &config.parsers[0].kind {
            ParserKind::Worker(worker) => {
                assert_eq!(worker.program.as_str(), "node");
                assert_eq!(worker.stop_grace, Duration::from_millis(250));
                assert_eq!(worker.framing, Framing::Escaped);
            }
            other => panic!("expected worker, got {}", other.name()),
        }

        match &config.parsers[1].kind {
            ParserKind::Command(command) => assert_eq!(command.input, CommandInput::Stdin),
            other => panic!("expected command, got {}", other.name()),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let yaml = r#"
parsers:
  - name: qasm_ts
    kind: worker
    program: node
"#;
        let config = ConfigLoader::load_string(yaml).unwrap();
        assert_eq!(config.benchmark.iterations, 10);
        assert_eq!(config.benchmark.warmup, 1);
        assert_eq!(config.benchmark.abort_after_startup_failures, 3);

        let ParserKind::Worker(worker) = &config.parsers[0].kind else {
            panic!("expected worker parser");
        };
        assert_eq!(worker.stop_grace, Duration::from_secs(1));
        assert_eq!(worker.ready_timeout, Duration::from_secs(30));
        assert_eq!(worker.response_timeout, Duration::from_secs(30));
        assert_eq!(worker.diagnostic_lines, 64);
    }

    #[test]
    fn test_missing_parsers() {
        let yaml = r#"
benchmark:
  iterations: 10
parsers: []
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_missing_program() {
        let yaml = r#"
parsers:
  - name: qasm_ts
    kind: worker
"#;
        let err = ConfigLoader::load_string(yaml).unwrap_err();
        assert!(err.to_string().contains("program"));
    }

    #[test]
    fn test_duplicate_names() {
        let yaml = r#"
parsers:
  - name: same
    kind: worker
    program: node
  - name: same
    kind: command
    program: ./parser
"#;
        assert!(matches!(
            ConfigLoader::load_string(yaml),
            Err(BenchError::HardValidation(
                HardValidationError::DuplicateParserName { .. }
            ))
        ));
    }

    #[test]
    fn test_invalid_parser_name() {
        let yaml = r#"
parsers:
  - name: "qasm ts"
    kind: worker
    program: node
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let yaml = r#"
parsers:
  - name: qasm_ts
    kind: worker
    program: node
    response_timeout_ms: 0
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_stop_grace_too_high() {
        let yaml = r#"
parsers:
  - name: qasm_ts
    kind: worker
    program: node
    stop_grace_ms: 120000
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let yaml = r#"
benchmark:
  iterations: 0
parsers:
  - name: rust
    kind: command
    program: ./parser
"#;
        assert!(ConfigLoader::load_string(yaml).is_err());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let yaml = r#"
parsers:
  - name: rust
    kind: daemon
    program: ./parser
"#;
        assert!(matches!(
            ConfigLoader::load_string(yaml),
            Err(BenchError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_worker_config_builder() {
        let config = WorkerConfig::new(Program::new("sh").unwrap())
            .arg("-c")
            .arg("echo READY")
            .framing(Framing::Raw)
            .stop_grace(Duration::from_millis(50))
            .env("LANG", "C");

        assert_eq!(config.args, vec!["-c", "echo READY"]);
        assert_eq!(config.framing, Framing::Raw);
        assert_eq!(config.stop_grace, Duration::from_millis(50));
        assert_eq!(config.environment.get("LANG").map(String::as_str), Some("C"));
    }
}
