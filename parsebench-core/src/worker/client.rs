// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Synchronous request/response client for a supervised worker.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use nix::sys::signal::Signal;

use super::pipes::LineRead;
use super::protocol::{self, Response};
use super::supervisor::{self, ProcessSupervisor};
use crate::config::{Framing, WorkerConfig};
use crate::error::{ParseError, ParseResult};
use crate::state::{SessionState, SessionStateMachine};
use crate::types::ProcessId;

/// Session data reachable only while the client lock is held.
#[derive(Debug)]
struct Session {
    supervisor: ProcessSupervisor,
    state: SessionStateMachine,
}

/// Client for one long-lived worker process.
///
/// All operations run under a single mutex, so at most one request is in
/// flight and a restart can never interleave with a write/read pair. The
/// worker is started lazily on the first call (or eagerly with
/// [`ProtocolClient::connect`]) and restarted after any startup or protocol
/// failure. Dropping the client stops the worker.
///
/// ```ignore
/// let client = ProtocolClient::connect("qasm_ts", config)?;
/// match client.parse(source) {
///     Ok(()) => {}
///     Err(ParseError::Application { message }) => eprintln!("rejected: {message}"),
///     Err(e) => eprintln!("worker failure: {e}"),
/// }
/// client.shutdown();
/// ```
#[derive(Debug)]
pub struct ProtocolClient {
    label: String,
    framing: Framing,
    response_timeout: Duration,
    /// PID of the worker while a request is being exchanged, otherwise 0.
    in_flight: AtomicU32,
    session: Mutex<Session>,
}

impl ProtocolClient {
    /// Create a client without starting the worker.
    pub fn new(label: impl Into<String>, config: WorkerConfig) -> Self {
        let label = label.into();
        Self {
            framing: config.framing,
            response_timeout: config.response_timeout,
            in_flight: AtomicU32::new(0),
            session: Mutex::new(Session {
                supervisor: ProcessSupervisor::new(label.clone(), config),
                state: SessionStateMachine::new(),
            }),
            label,
        }
    }

    /// Create a client and start its worker.
    pub fn connect(label: impl Into<String>, config: WorkerConfig) -> ParseResult<Self> {
        let client = Self::new(label, config);
        client.start()?;
        Ok(client)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Start the worker unless it is already running.
    pub fn start(&self) -> ParseResult<()> {
        let mut session = self.lock();
        session.ensure_started()
    }

    /// Stop the worker. Idempotent.
    pub fn stop(&self) {
        let mut session = self.lock();
        session.teardown();
    }

    /// End-of-program shutdown.
    ///
    /// Unlike [`ProtocolClient::stop`] this does not wait behind a request in
    /// flight: the worker is killed first so the blocked read returns at once
    /// and the request fails with a protocol error.
    pub fn shutdown(&self) {
        tracing::info!(worker = %self.label, "Shutting down worker client");
        if let Ok(pid) = ProcessId::new(self.in_flight.load(Ordering::SeqCst)) {
            tracing::warn!(worker = %self.label, pid = pid.value(), "Killing worker with a request in flight");
            supervisor::signal_group(&self.label, pid, Signal::SIGKILL);
        }
        self.stop();
    }

    /// Send `text` to the worker and classify its answer.
    ///
    /// `Ok(())` is a `SUCCESS` response. An `ERROR:` response is returned as
    /// [`ParseError::Application`] and leaves the worker running. Startup
    /// failures, malformed or missing responses and pipe errors stop the
    /// worker before they are returned.
    pub fn parse(&self, text: &str) -> ParseResult<()> {
        let request = protocol::encode_request(text, self.framing)?;

        let mut session = self.lock();
        session.ensure_started()?;

        if let Err(e) = session.state.transition_to(SessionState::Busy) {
            session.recover(&self.label, &e.to_string());
            return Err(e.into());
        }

        if let Some(pid) = session.supervisor.last_pid() {
            self.in_flight.store(pid.value(), Ordering::SeqCst);
        }
        let response = session.exchange(&request, self.response_timeout);
        self.in_flight.store(0, Ordering::SeqCst);

        match response {
            Response::Success => {
                session.finish_request()?;
                Ok(())
            }
            Response::ApplicationError(message) => {
                tracing::debug!(worker = %self.label, message = %message, "Worker rejected input");
                session.finish_request()?;
                Err(ParseError::Application { message })
            }
            Response::ProtocolError(message) => {
                session.recover(&self.label, &message);
                Err(ParseError::Protocol { message })
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.state()
    }

    /// Non-blocking liveness probe.
    pub fn is_alive(&self) -> bool {
        self.lock().supervisor.is_alive()
    }

    /// Number of readiness handshakes completed so far.
    pub fn handshake_count(&self) -> u64 {
        self.lock().supervisor.handshake_count()
    }

    /// PID of the most recently spawned worker, if any was spawned.
    pub fn last_pid(&self) -> Option<ProcessId> {
        self.lock().supervisor.last_pid()
    }

    /// Acquire the session.
    ///
    /// A poisoned lock is taken over rather than propagated. A caller that
    /// panicked mid-request leaves the session `Starting` or `Busy`, so the
    /// worker is torn down before the session is handed out again.
    fn lock(&self) -> MutexGuard<'_, Session> {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(
            session.state.state(),
            SessionState::Starting | SessionState::Busy
        ) {
            tracing::warn!(worker = %self.label, state = %session.state.state(), "Recovering interrupted session");
            session.teardown();
        }
        session
    }
}

impl Drop for ProtocolClient {
    fn drop(&mut self) {
        let session = self.session.get_mut().unwrap_or_else(PoisonError::into_inner);
        session.teardown();
    }
}

impl Session {
    fn ensure_started(&mut self) -> ParseResult<()> {
        if self.state.state() == SessionState::Ready {
            if self.supervisor.is_alive() {
                return Ok(());
            }
            tracing::warn!(
                pid = self.supervisor.last_pid().map(|p| p.value()),
                "Worker exited while idle, restarting"
            );
            self.teardown();
        }

        self.state.transition_to(SessionState::Starting)?;
        match self.supervisor.start() {
            Ok(()) => {
                self.state.transition_to(SessionState::Ready)?;
                Ok(())
            }
            Err(failure) => {
                tracing::error!(error = %failure, "Worker failed to start");
                self.teardown();
                Err(failure.into())
            }
        }
    }

    /// Write one request line and read one response line.
    fn exchange(&mut self, request: &str, timeout: Duration) -> Response {
        let Some(handle) = self.supervisor.handle_mut() else {
            return Response::ProtocolError("worker is not running".to_string());
        };

        tracing::debug!(pid = handle.pid().value(), bytes = request.len(), "Sending request");
        if let Err(e) = handle.write_line(request) {
            return Response::ProtocolError(format!("failed to write request: {}", e));
        }

        match handle.read_line(timeout) {
            LineRead::Line(line) => {
                tracing::debug!(pid = handle.pid().value(), response = %line, "Received response");
                Response::classify(Some(&line))
            }
            LineRead::Closed => Response::classify(None),
            LineRead::TimedOut => Response::ProtocolError(format!(
                "no response from worker within {}ms",
                timeout.as_millis()
            )),
            LineRead::Failed(e) => {
                Response::ProtocolError(format!("failed to read response: {}", e))
            }
        }
    }

    fn finish_request(&mut self) -> ParseResult<()> {
        self.state.transition_to(SessionState::Ready)?;
        Ok(())
    }

    /// Stop the worker, then log whatever it wrote to stderr.
    fn recover(&mut self, label: &str, message: &str) {
        tracing::error!(worker = %label, error = %message, "Worker protocol failure, restarting on next call");
        let diagnostics = self.supervisor.stop_with_diagnostics();
        supervisor::log_diagnostics(label, &diagnostics);
        self.state.force_stopped();
    }

    fn teardown(&mut self) {
        self.supervisor.stop();
        self.state.force_stopped();
    }
}
