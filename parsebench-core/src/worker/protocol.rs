// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Line protocol spoken with a worker process.
//!
//! ```text
//! worker → client   READY            once, after startup
//! client → worker   <payload>        one line per request
//! worker → client   SUCCESS          request parsed
//! worker → client   ERROR:<message>  request rejected by the parser
//! ```
//!
//! Anything else, including an empty line or end of stream, is a protocol
//! violation.

use crate::config::Framing;
use crate::error::{ParseError, ParseResult};

/// Readiness line sent once by the worker.
pub const READY_TOKEN: &str = "READY";

/// Response line for a successful request.
pub const SUCCESS_TOKEN: &str = "SUCCESS";

/// Prefix of an application error response.
pub const ERROR_PREFIX: &str = "ERROR:";

/// A classified worker response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Success,
    ApplicationError(String),
    ProtocolError(String),
}

impl Response {
    /// Classify one response line. `None` means the stream ended.
    pub fn classify(line: Option<&str>) -> Self {
        let line = match line.map(str::trim) {
            Some(line) if !line.is_empty() => line,
            _ => return Self::ProtocolError("no response from worker".to_string()),
        };

        if let Some(message) = line.strip_prefix(ERROR_PREFIX) {
            Self::ApplicationError(message.to_string())
        } else if line == SUCCESS_TOKEN {
            Self::Success
        } else {
            Self::ProtocolError(format!("unexpected response: {}", line))
        }
    }
}

/// Whether a startup line completes the readiness handshake.
pub fn is_ready(line: &str) -> bool {
    line.trim() == READY_TOKEN
}

/// Frame a request as exactly one newline-terminated line.
pub fn encode_request(text: &str, framing: Framing) -> ParseResult<String> {
    let mut line = match framing {
        Framing::Escaped => escape(text),
        Framing::Raw => {
            if text.contains(['\n', '\r']) {
                return Err(ParseError::InvalidRequest {
                    reason: "payload contains a line break and framing is raw".to_string(),
                });
            }
            text.to_string()
        }
    };
    line.push('\n');
    Ok(line)
}

/// Escape `\`, LF and CR so the text occupies a single line.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 16);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape`], for worker implementations.
///
/// Unknown escape sequences are kept verbatim.
pub fn unescape(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
