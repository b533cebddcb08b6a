// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Request round-trip cost of a long-lived worker versus one process per call.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use parsebench_core::{
    CommandConfig, CommandInput, CommandParser, Parser, ParserName, Program, ProtocolClient,
    WorkerConfig,
};

const WORKER_SCRIPT: &str = r#"
echo READY
while IFS= read -r line; do
  echo SUCCESS
done
"#;

const PAYLOAD_SIZES: &[usize] = &[64, 1024, 16384];

fn payload(size: usize) -> String {
    "qubit q;\n".repeat(size / 9 + 1)[..size].to_string()
}

/// Benchmark one request on an already started worker.
fn bench_worker_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("worker_roundtrip");
    group.measurement_time(Duration::from_secs(5));

    let config = WorkerConfig::new(Program::new("sh").expect("valid program"))
        .arg("-c")
        .arg(WORKER_SCRIPT);
    let client = ProtocolClient::connect("bench", config).expect("Failed to start worker");

    for &size in PAYLOAD_SIZES {
        let source = payload(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, source| {
            b.iter(|| client.parse(source).expect("parse failed"));
        });
    }

    client.shutdown();
    group.finish();
}

/// Benchmark the same request through a fresh process per call.
fn bench_command_spawn(c: &mut Criterion) {
    let mut group = c.benchmark_group("command_per_call");
    group.sample_size(20);

    let config = CommandConfig::new(Program::new("sh").expect("valid program"))
        .args(["-c", "cat >/dev/null"])
        .input(CommandInput::Stdin);
    let parser = CommandParser::new(ParserName::new("oneshot").expect("valid name"), config);

    let source = payload(1024);
    group.bench_function("1024", |b| {
        b.iter(|| parser.parse(&source).expect("parse failed"));
    });

    group.finish();
}

/// Benchmark worker startup including the readiness handshake.
fn bench_worker_startup(c: &mut Criterion) {
    let mut group = c.benchmark_group("worker_startup");
    group.sample_size(20);

    let config = WorkerConfig::new(Program::new("sh").expect("valid program"))
        .arg("-c")
        .arg(WORKER_SCRIPT);
    let client = ProtocolClient::new("startup", config);

    group.bench_function("ready_handshake", |b| {
        b.iter(|| {
            client.start().expect("start failed");
            client.stop();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_worker_roundtrip,
    bench_command_spawn,
    bench_worker_startup
);
criterion_main!(benches);
