// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Managed external worker processes.
//!
//! A worker is a long-lived child that announces `READY` on stdout, then
//! answers one line per request line. [`ProcessSupervisor`] owns the process
//! and [`ProtocolClient`] serializes requests over it, restarting the worker
//! after startup or protocol failures.

mod client;
mod pipes;
pub mod protocol;
mod supervisor;

pub use client::ProtocolClient;
pub use pipes::{DiagnosticBuffer, LineRead};
pub use protocol::Response;
pub use supervisor::{ProcessSupervisor, WorkerHandle};
