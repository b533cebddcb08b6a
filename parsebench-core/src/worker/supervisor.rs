// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Worker process lifecycle: spawn, readiness handshake, liveness, teardown.

use std::io::{self, BufWriter, Write};
use std::os::unix::process::CommandExt;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};

use super::pipes::{self, DiagnosticBuffer, LineRead, LineReceiver};
use super::protocol;
use crate::config::WorkerConfig;
use crate::error::StartupFailure;
use crate::types::ProcessId;

/// Interval between exit checks while waiting out the stop grace period.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A spawned worker and its three pipes.
///
/// The supervisor only keeps a handle whose worker answered `READY`.
#[derive(Debug)]
pub struct WorkerHandle {
    child: Child,
    pid: ProcessId,
    /// `None` once closed during teardown.
    stdin: Option<BufWriter<ChildStdin>>,
    lines: LineReceiver,
    diagnostics: DiagnosticBuffer,
    collector: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Write one already framed line and flush it.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "worker stdin is closed"))?;
        stdin.write_all(line.as_bytes())?;
        stdin.flush()
    }

    /// Wait at most `timeout` for the next stdout line.
    pub fn read_line(&self, timeout: Duration) -> LineRead {
        self.lines.recv(timeout)
    }

    /// Non-blocking exit check.
    pub fn has_exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }

}

/// Owns at most one worker process.
#[derive(Debug)]
pub struct ProcessSupervisor {
    label: String,
    config: WorkerConfig,
    handle: Option<WorkerHandle>,
    handshakes: u64,
    last_pid: Option<ProcessId>,
}

impl ProcessSupervisor {
    pub fn new(label: impl Into<String>, config: WorkerConfig) -> Self {
        Self {
            label: label.into(),
            config,
            handle: None,
            handshakes: 0,
            last_pid: None,
        }
    }

    /// Ensure a ready worker exists.
    ///
    /// A no-op when the current worker is alive. A dead one is reaped first.
    /// On failure everything spawned by this call has been torn down.
    pub fn start(&mut self) -> Result<(), StartupFailure> {
        if self.is_alive() {
            return Ok(());
        }
        self.stop();

        let started = Instant::now();
        tracing::info!(
            worker = %self.label,
            program = %self.config.program,
            "Starting worker process"
        );

        let handle = self.spawn()?;
        self.last_pid = Some(handle.pid);

        if let Err(failure) = self.handshake(&handle) {
            let diagnostics = terminate(&self.label, handle, self.config.stop_grace);
            log_diagnostics(&self.label, &diagnostics);
            return Err(failure);
        }

        self.handshakes += 1;
        tracing::info!(
            worker = %self.label,
            pid = handle.pid.value(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Worker sent READY signal"
        );
        self.handle = Some(handle);

        Ok(())
    }

    fn spawn(&self) -> Result<WorkerHandle, StartupFailure> {
        let config = &self.config;
        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .envs(&config.environment)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let spawn_failed = |source: io::Error| StartupFailure::Spawn {
            program: config.program.to_string(),
            source,
        };

        let mut child = command.spawn().map_err(spawn_failed)?;

        let pid = match ProcessId::new(child.id()) {
            Ok(pid) => pid,
            Err(e) => {
                reap(&mut child);
                return Err(spawn_failed(io::Error::new(io::ErrorKind::Other, e.to_string())));
            }
        };

        tracing::debug!(worker = %self.label, pid = pid.value(), "Spawned worker process");

        let streams = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (stdin, stdout, stderr) = match streams {
            (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
            (stdin, stdout, _) => {
                let stream = if stdin.is_none() {
                    "stdin"
                } else if stdout.is_none() {
                    "stdout"
                } else {
                    "stderr"
                };
                reap(&mut child);
                return Err(StartupFailure::StreamUnavailable { stream });
            }
        };

        let diagnostics = DiagnosticBuffer::new(config.diagnostic_lines);
        let readers = pipes::spawn_line_pump(&self.label, stdout).and_then(|(lines, _)| {
            pipes::spawn_diagnostic_collector(&self.label, stderr, diagnostics.clone())
                .map(|collector| (lines, collector))
        });

        let (lines, collector) = match readers {
            Ok(readers) => readers,
            Err(e) => {
                reap(&mut child);
                return Err(spawn_failed(e));
            }
        };

        Ok(WorkerHandle {
            child,
            pid,
            stdin: Some(BufWriter::new(stdin)),
            lines,
            diagnostics,
            collector,
        })
    }

    fn handshake(&self, handle: &WorkerHandle) -> Result<(), StartupFailure> {
        let timeout = self.config.ready_timeout;
        match handle.read_line(timeout) {
            LineRead::Line(line) if protocol::is_ready(&line) => Ok(()),
            LineRead::Line(line) => {
                tracing::error!(worker = %self.label, line = %line, "Unexpected readiness line");
                Err(StartupFailure::HandshakeMismatch { line })
            }
            LineRead::Closed => Err(StartupFailure::ExitedBeforeReady),
            LineRead::TimedOut => Err(StartupFailure::HandshakeTimeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            LineRead::Failed(e) => Err(StartupFailure::ReadFailed(e)),
        }
    }

    /// Stop the worker if there is one.
    ///
    /// Idempotent. The handle is released whatever happens during termination.
    pub fn stop(&mut self) {
        self.stop_with_diagnostics();
    }

    /// Stop the worker and return the stderr lines it left behind.
    ///
    /// The lines are collected after the worker has been reaped, so output
    /// written just before exiting is included.
    pub fn stop_with_diagnostics(&mut self) -> Vec<String> {
        match self.handle.take() {
            Some(handle) => terminate(&self.label, handle, self.config.stop_grace),
            None => Vec::new(),
        }
    }

    /// Non-blocking liveness probe.
    pub fn is_alive(&mut self) -> bool {
        match self.handle.as_mut() {
            Some(handle) => !handle.has_exited(),
            None => false,
        }
    }

    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle_mut(&mut self) -> Option<&mut WorkerHandle> {
        self.handle.as_mut()
    }

    /// Number of completed readiness handshakes over the supervisor's lifetime.
    pub fn handshake_count(&self) -> u64 {
        self.handshakes
    }

    /// PID of the most recently spawned worker.
    pub fn last_pid(&self) -> Option<ProcessId> {
        self.last_pid
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Close stdin, send SIGTERM, wait up to `grace`, then SIGKILL. Always reaps.
///
/// Signals go to the worker's whole process group. Returns the stderr tail
/// once the collector has seen end of file or `grace` has run out.
fn terminate(label: &str, mut handle: WorkerHandle, grace: Duration) -> Vec<String> {
    let pid = handle.pid;
    tracing::info!(worker = %label, pid = pid.value(), "Stopping worker");

    drop(handle.stdin.take());

    if !wait_for_exit(label, &mut handle.child, pid, Duration::ZERO) {
        signal_group(label, pid, Signal::SIGTERM);
        if !wait_for_exit(label, &mut handle.child, pid, grace) {
            tracing::warn!(
                worker = %label,
                pid = pid.value(),
                grace_ms = grace.as_millis() as u64,
                "Worker did not terminate gracefully, killing"
            );
            signal_group(label, pid, Signal::SIGKILL);
            reap(&mut handle.child);
            tracing::info!(worker = %label, pid = pid.value(), "Worker stopped");
        }
    }

    // Descendants left in the group still hold the pipes open
    signal_group(label, pid, Signal::SIGKILL);

    let deadline = Instant::now() + grace;
    while !handle.collector.is_finished() && Instant::now() < deadline {
        std::thread::sleep(EXIT_POLL_INTERVAL);
    }
    if handle.collector.is_finished() {
        let _ = handle.collector.join();
    } else {
        tracing::debug!(worker = %label, pid = pid.value(), "stderr still open after stop");
    }

    handle.diagnostics.drain()
}

/// Poll for exit until `timeout` runs out. Returns true once the child is reaped.
fn wait_for_exit(label: &str, child: &mut Child, pid: ProcessId, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!(worker = %label, pid = pid.value(), status = %status, "Worker stopped");
                return true;
            }
            Ok(None) if Instant::now() < deadline => std::thread::sleep(EXIT_POLL_INTERVAL),
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(worker = %label, pid = pid.value(), error = %e, "Failed to poll worker exit");
                return false;
            }
        }
    }
}

/// Send `signal` to the process group led by `pid`.
pub(crate) fn signal_group(label: &str, pid: ProcessId, signal: Signal) {
    match signal::killpg(pid.as_nix(), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(
            worker = %label,
            pid = pid.value(),
            signal = %signal,
            error = %e,
            "Failed to signal worker process group"
        ),
    }
}

/// Log the stderr tail of a failed worker.
pub(crate) fn log_diagnostics(label: &str, diagnostics: &[String]) {
    if !diagnostics.is_empty() {
        tracing::warn!(
            worker = %label,
            stderr = %diagnostics.join("\n"),
            "Worker diagnostics"
        );
    }
}

/// SIGKILL and wait, ignoring errors from an already exited child.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Program;

    fn sh(script: &str) -> WorkerConfig {
        WorkerConfig::new(Program::new("sh").unwrap())
            .arg("-c")
            .arg(script)
            .ready_timeout(Duration::from_secs(5))
            .stop_grace(Duration::from_millis(500))
    }

    #[test]
    fn test_start_and_stop() {
        let mut supervisor = ProcessSupervisor::new("test", sh("echo READY; exec cat >/dev/null"));
        assert!(!supervisor.is_alive());

        supervisor.start().unwrap();
        assert!(supervisor.is_alive());
        assert_eq!(supervisor.handshake_count(), 1);

        // Starting a live worker does not respawn it
        supervisor.start().unwrap();
        assert_eq!(supervisor.handshake_count(), 1);

        supervisor.stop();
        assert!(!supervisor.is_alive());
        assert!(!supervisor.has_handle());
    }

    #[test]
    fn test_stop_without_worker_is_noop() {
        let mut supervisor = ProcessSupervisor::new("test", sh("echo READY"));
        supervisor.stop();
        supervisor.stop();
        assert!(!supervisor.has_handle());
        assert_eq!(supervisor.last_pid(), None);
    }

    #[test]
    fn test_exit_before_ready() {
        let mut supervisor = ProcessSupervisor::new("test", sh("exit 0"));
        assert!(matches!(
            supervisor.start(),
            Err(StartupFailure::ExitedBeforeReady)
        ));
        assert!(!supervisor.has_handle());
    }

    #[test]
    fn test_handshake_timeout() {
        let config = sh("exec sleep 30").ready_timeout(Duration::from_millis(100));
        let mut supervisor = ProcessSupervisor::new("test", config);

        let started = Instant::now();
        assert!(matches!(
            supervisor.start(),
            Err(StartupFailure::HandshakeTimeout { timeout_ms: 100 })
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!supervisor.has_handle());
    }

    #[test]
    fn test_dead_worker_is_not_alive() {
        let mut supervisor = ProcessSupervisor::new("test", sh("echo READY; exit 0"));
        supervisor.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while supervisor.is_alive() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!supervisor.is_alive());

        // A dead worker is replaced on the next start
        supervisor.start().unwrap();
        assert_eq!(supervisor.handshake_count(), 2);
    }

    #[test]
    fn test_crash_stderr_is_kept() {
        let mut supervisor = ProcessSupervisor::new(
            "test",
            sh("echo READY; read -r line; echo boom >&2; exit 1"),
        );

        for _ in 0..20 {
            supervisor.start().unwrap();
            let handle = supervisor.handle_mut().unwrap();
            handle.write_line("x\n").unwrap();
            assert!(matches!(
                handle.read_line(Duration::from_secs(5)),
                LineRead::Closed
            ));

            let diagnostics = supervisor.stop_with_diagnostics();
            assert_eq!(diagnostics, vec!["boom"]);
        }
    }

    /// True while `pid` exists and is not a zombie.
    #[cfg(target_os = "linux")]
    fn is_running(pid: &str) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => !stat
                .rsplit_once(") ")
                .is_some_and(|(_, rest)| rest.starts_with('Z')),
            Err(_) => false,
        }
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_stop_kills_process_group() {
        let script = r#"trap '' TERM; sleep 30 & echo "$!" >&2; echo READY; wait"#;
        let mut supervisor = ProcessSupervisor::new("test", sh(script));
        supervisor.start().unwrap();

        let started = Instant::now();
        let diagnostics = supervisor.stop_with_diagnostics();
        assert!(started.elapsed() < Duration::from_secs(5));

        let grandchild = diagnostics[0].as_str();
        let deadline = Instant::now() + Duration::from_secs(5);
        while is_running(grandchild) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!is_running(grandchild));
    }
}
