// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Background readers for the worker's output streams.
//!
//! stdout is pumped line by line into a channel so the client can wait for a
//! response with a deadline. stderr is drained continuously into a bounded
//! ring of recent lines, which keeps the worker from stalling on a full pipe
//! and leaves the tail available for diagnostics after a failure.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Result of waiting for one line.
#[derive(Debug)]
pub enum LineRead {
    Line(String),
    /// The stream reached end of file.
    Closed,
    TimedOut,
    Failed(io::Error),
}

/// Receiving end of a stdout pump.
#[derive(Debug)]
pub struct LineReceiver {
    rx: Receiver<io::Result<String>>,
}

impl LineReceiver {
    /// Wait at most `timeout` for the next line.
    pub fn recv(&self, timeout: Duration) -> LineRead {
        match self.rx.recv_timeout(timeout) {
            Ok(Ok(line)) => LineRead::Line(line),
            Ok(Err(e)) => LineRead::Failed(e),
            Err(RecvTimeoutError::Timeout) => LineRead::TimedOut,
            Err(RecvTimeoutError::Disconnected) => LineRead::Closed,
        }
    }
}

/// Read one line, replacing invalid UTF-8. Returns `None` at end of file.
///
/// The trailing line terminator is removed.
pub fn read_line_lossy<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Start a thread forwarding every line of `stream` to the returned receiver.
///
/// The thread exits at end of file, after the first read error, or once the
/// receiver has been dropped and another line arrives.
pub fn spawn_line_pump<R>(label: &str, stream: R) -> io::Result<(LineReceiver, JoinHandle<()>)>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = thread::Builder::new()
        .name(format!("{}-stdout", label))
        .spawn(move || {
            let mut reader = BufReader::new(stream);
            loop {
                match read_line_lossy(&mut reader) {
                    Ok(Some(line)) => {
                        if tx.send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
        })?;

    Ok((LineReceiver { rx }, handle))
}

/// Bounded ring of the most recent diagnostic lines.
#[derive(Debug, Clone)]
pub struct DiagnosticBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl DiagnosticBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
        }
    }

    /// Append a line, evicting the oldest one when full.
    pub fn push(&self, line: String) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Take every retained line, oldest first.
    pub fn drain(&self) -> Vec<String> {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        lines.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Start a thread copying every line of `stream` into `buffer`.
pub fn spawn_diagnostic_collector<R>(
    label: &str,
    stream: R,
    buffer: DiagnosticBuffer,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("{}-stderr", label))
        .spawn(move || {
            let mut reader = BufReader::new(stream);
            while let Ok(Some(line)) = read_line_lossy(&mut reader) {
                buffer.push(line);
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_line_lossy_strips_terminators() {
        let mut reader = Cursor::new(b"READY\r\nSUCCESS\nlast".to_vec());
        assert_eq!(read_line_lossy(&mut reader).unwrap().as_deref(), Some("READY"));
        assert_eq!(read_line_lossy(&mut reader).unwrap().as_deref(), Some("SUCCESS"));
        assert_eq!(read_line_lossy(&mut reader).unwrap().as_deref(), Some("last"));
        assert_eq!(read_line_lossy(&mut reader).unwrap(), None);
    }

    #[test]
    fn test_read_line_lossy_replaces_invalid_utf8() {
        let mut reader = Cursor::new(vec![b'E', 0xFF, b'\n']);
        let line = read_line_lossy(&mut reader).unwrap().unwrap();
        assert!(line.starts_with('E'));
        assert!(line.contains('\u{FFFD}'));
    }

    #[test]
    fn test_line_pump_reports_closed_after_eof() {
        let (rx, handle) = spawn_line_pump("test", Cursor::new(b"one\ntwo\n".to_vec())).unwrap();

        assert!(matches!(rx.recv(Duration::from_secs(1)), LineRead::Line(l) if l == "one"));
        assert!(matches!(rx.recv(Duration::from_secs(1)), LineRead::Line(l) if l == "two"));
        assert!(matches!(rx.recv(Duration::from_secs(1)), LineRead::Closed));
        handle.join().unwrap();
    }

    #[test]
    fn test_diagnostic_buffer_keeps_tail() {
        let buffer = DiagnosticBuffer::new(2);
        buffer.push("a".to_string());
        buffer.push("b".to_string());
        buffer.push("c".to_string());

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.drain(), vec!["b", "c"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_diagnostic_buffer_zero_capacity() {
        let buffer = DiagnosticBuffer::new(0);
        buffer.push("ignored".to_string());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_diagnostic_collector() {
        let buffer = DiagnosticBuffer::new(8);
        let handle = spawn_diagnostic_collector(
            "test",
            Cursor::new(b"warning: x\nerror: y\n".to_vec()),
            buffer.clone(),
        )
        .unwrap();
        handle.join().unwrap();

        assert_eq!(buffer.drain(), vec!["warning: x", "error: y"]);
    }
}
