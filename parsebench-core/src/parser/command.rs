// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! One process per parse call.

use std::io::{self, Write};
use std::process::{Command, Output, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};

use super::Parser;
use crate::config::{CommandConfig, CommandInput};
use crate::error::{ParseError, ParseResult, StartupFailure};
use crate::types::{ParserName, ProcessId};

/// Parser that runs a command for every call.
///
/// Exit status zero accepts the input. Any other status rejects it, with the
/// command's stderr as the message. A command still running after the
/// configured timeout is killed.
#[derive(Debug)]
pub struct CommandParser {
    name: ParserName,
    config: CommandConfig,
}

impl CommandParser {
    pub fn new(name: ParserName, config: CommandConfig) -> Self {
        Self { name, config }
    }

    fn command(&self, source: &str) -> Command {
        let config = &self.config;
        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .envs(&config.environment)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        match config.input {
            CommandInput::Argument => {
                command.arg(source).stdin(Stdio::null());
            }
            CommandInput::Stdin => {
                command.stdin(Stdio::piped());
            }
        }
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }
        command
    }

    fn run(&self, source: &str) -> ParseResult<Output> {
        let mut child = self
            .command(source)
            .spawn()
            .map_err(|e| StartupFailure::Spawn {
                program: self.config.program.to_string(),
                source: e,
            })?;
        let pid = match ProcessId::new(child.id()) {
            Ok(pid) => pid,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ParseError::protocol(e.to_string()));
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            let input = source.to_owned();
            thread::Builder::new()
                .name(format!("{}-stdin", self.name))
                .spawn(move || {
                    // The command may exit without reading all of it
                    let _ = stdin.write_all(input.as_bytes());
                })
                .map_err(|e| ParseError::protocol(format!("failed to feed command: {}", e)))?;
        }

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name(format!("{}-wait", self.name))
            .spawn(move || {
                let _ = tx.send(child.wait_with_output());
            })
            .map_err(|e| ParseError::protocol(format!("failed to wait for command: {}", e)))?;

        let timeout = self.config.timeout;
        let output = match rx.recv_timeout(timeout) {
            Ok(output) => output,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    parser = %self.name,
                    pid = pid.value(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Command timed out, killing"
                );
                match signal::kill(pid.as_nix(), Signal::SIGKILL) {
                    Ok(()) | Err(Errno::ESRCH) => {}
                    Err(e) => tracing::warn!(parser = %self.name, error = %e, "Failed to kill command"),
                }
                // Wait for the reaper so no zombie is left behind
                let _ = rx.recv();
                return Err(ParseError::protocol(format!(
                    "command did not finish within {}ms",
                    timeout.as_millis()
                )));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ParseError::protocol("command waiter exited unexpectedly"));
            }
        };

        output.map_err(|e: io::Error| ParseError::protocol(format!("failed to collect command output: {}", e)))
    }
}

impl Parser for CommandParser {
    fn name(&self) -> &ParserName {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "command"
    }

    fn parse(&self, source: &str) -> ParseResult<()> {
        if self.config.input == CommandInput::Argument && source.contains('\0') {
            return Err(ParseError::InvalidRequest {
                reason: "source contains a NUL byte and cannot be passed as an argument"
                    .to_string(),
            });
        }

        let output = self.run(source)?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(parser = %self.name, status = %output.status, "Command rejected input");
        Err(ParseError::application(format!(
            "Parsing failed: {}",
            stderr.trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::types::Program;
    use std::time::{Duration, Instant};

    fn sh(script: &str, input: CommandInput) -> CommandParser {
        // `sh -c script name arg`: the source lands in $1
        let config = CommandConfig::new(Program::new("sh").unwrap())
            .args(["-c", script, "parser"])
            .input(input)
            .timeout(Duration::from_secs(5));
        CommandParser::new(ParserName::new("cmd").unwrap(), config)
    }

    #[test]
    fn test_argument_input() {
        let parser = sh(r#"[ "$1" = "qubit q;" ]"#, CommandInput::Argument);
        assert!(parser.parse("qubit q;").is_ok());
        assert!(parser.parse("other").is_err());
    }

    #[test]
    fn test_stdin_input() {
        let parser = sh(r#"grep -q OPENQASM"#, CommandInput::Stdin);
        assert!(parser.parse("OPENQASM 3.0;\nqubit q;\n").is_ok());
        assert_eq!(
            parser.parse("qubit q;\n").unwrap_err().kind(),
            FailureKind::Application
        );
    }

    #[test]
    fn test_nonzero_exit_reports_stderr() {
        let parser = sh("echo 'line 1: unexpected token' >&2; exit 1", CommandInput::Argument);
        let err = parser.parse("x").unwrap_err();
        assert_eq!(err.to_string(), "Parsing failed: line 1: unexpected token");
    }

    #[test]
    fn test_timeout_kills_command() {
        let config = CommandConfig::new(Program::new("sleep").unwrap())
            .input(CommandInput::Argument)
            .timeout(Duration::from_millis(100));
        let parser = CommandParser::new(ParserName::new("slow").unwrap(), config);

        let started = Instant::now();
        let err = parser.parse("30").unwrap_err();
        assert_eq!(err.kind(), FailureKind::Protocol);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_missing_program_is_startup_failure() {
        let config = CommandConfig::new(Program::new("/nonexistent/parsebench-parser").unwrap());
        let parser = CommandParser::new(ParserName::new("missing").unwrap(), config);
        assert_eq!(parser.parse("x").unwrap_err().kind(), FailureKind::Startup);
    }

    #[test]
    fn test_nul_in_argument_is_invalid_request() {
        let parser = sh("exit 0", CommandInput::Argument);
        assert_eq!(
            parser.parse("a\0b").unwrap_err().kind(),
            FailureKind::InvalidRequest
        );
    }
}
