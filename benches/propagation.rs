//! Benchmarks for trigger propagation
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use simflow::graph::steps::{CounterStep, GainStep};
use simflow::graph::{DataObject, DataType, DataValue, Matrix, Network, NullFaultSink};
use std::sync::Arc;
use std::time::Duration;

const DT: Duration = Duration::from_millis(1);

/// counter -> gain -> gain -> ... all on one trigger
fn chain(len: usize) -> (Network, simflow::graph::TriggerId) {
    let mut net = Network::new(Arc::new(NullFaultSink));
    let t = net.create_trigger("bench");
    let mut prev = net.add_step(CounterStep::new()).unwrap();
    net.attach(prev, t).unwrap();
    let mut out = "count";
    for _ in 1..len {
        let next = net.add_step(GainStep::new(1.0001)).unwrap();
        net.attach(next, t).unwrap();
        net.add_connection(prev, out, next, "input").unwrap();
        prev = next;
        out = "output";
    }
    (net, t)
}

/// One step per trigger, each trigger downstream of the previous one
fn trigger_chain(len: usize) -> (Network, simflow::graph::TriggerId) {
    let mut net = Network::new(Arc::new(NullFaultSink));
    let root = net.create_trigger("t0");
    let mut prev = net.add_step(CounterStep::new()).unwrap();
    net.attach(prev, root).unwrap();
    let mut out = "count";
    for i in 1..len {
        let t = net.create_trigger(format!("t{}", i));
        let next = net.add_step(GainStep::new(1.0)).unwrap();
        net.attach(next, t).unwrap();
        net.add_connection(prev, out, next, "input").unwrap();
        prev = next;
        out = "output";
    }
    (net, root)
}

fn bench_listener_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("listener_chain");

    for size in [1, 10, 100].iter() {
        let (net, t) = chain(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("fire", size), size, |b, _| {
            b.iter(|| black_box(net.fire(t, DT).unwrap()))
        });
    }

    group.finish();
}

fn bench_trigger_wave(c: &mut Criterion) {
    let mut group = c.benchmark_group("trigger_wave");

    for size in [2, 10, 50].iter() {
        let (net, t) = trigger_chain(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("fire", size), size, |b, _| {
            b.iter(|| black_box(net.fire(t, DT).unwrap()))
        });
    }

    group.finish();
}

fn bench_data_object(c: &mut Criterion) {
    let mut group = c.benchmark_group("data_object");

    let scalar = DataObject::new("x", DataType::Scalar, DataValue::Scalar(0.0), None);
    group.bench_function("scalar_write_read", |b| {
        b.iter(|| {
            scalar.write(DataValue::Scalar(black_box(1.5)));
            black_box(scalar.read())
        })
    });

    let matrix = DataObject::new(
        "m",
        DataType::Matrix,
        DataValue::Matrix(Matrix::zeros(16, 16)),
        None,
    );
    group.bench_function("matrix_16x16_read", |b| b.iter(|| black_box(matrix.read())));

    group.finish();
}

criterion_group!(
    benches,
    bench_listener_chain,
    bench_trigger_wave,
    bench_data_object
);
criterion_main!(benches);
