//! Line codec benchmark suite.
//!
//! Measures frame decoding throughput:
//! - Frames per chunk: 1, 16, 256
//! - Whole chunks vs. chunks cut at a fixed stride
//!
//! Run with: cargo bench --bench line_codec
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use socket_reconnect::{Envelope, LineCodec};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const FRAME_COUNTS: &[usize] = &[1, 16, 256];
const SPLIT_STRIDE: usize = 37;

// ============================================================================
// Fixtures
// ============================================================================

fn wire(frames: usize) -> String {
    (0..frames)
        .map(|i| {
            let envelope = Envelope::message(vec![json!({"seq": i, "price": 101.25, "sym": "ABC"})]);
            LineCodec::encode(&envelope).expect("encode")
        })
        .collect()
}

fn chunks(wire: &str, stride: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    while start < wire.len() {
        let mut end = (start + stride).min(wire.len());
        while !wire.is_char_boundary(end) {
            end += 1;
        }
        out.push(&wire[start..end]);
        start = end;
    }
    out
}

// ============================================================================
// Benchmark: Decode
// ============================================================================

fn bench_decode_whole(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_whole");

    for &count in FRAME_COUNTS {
        let data = wire(count);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("envelope", count), &data, |b, data| {
            let mut codec = LineCodec::<Envelope>::new();
            b.iter(|| black_box(codec.decode(black_box(data))));
        });
    }

    group.finish();
}

fn bench_decode_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_split");

    for &count in FRAME_COUNTS {
        let data = wire(count);
        let parts = chunks(&data, SPLIT_STRIDE);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("value", count), &parts, |b, parts| {
            let mut codec = LineCodec::<Value>::new();
            b.iter(|| {
                for part in parts {
                    black_box(codec.decode(black_box(part)));
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Encode
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let envelope = Envelope::subscribe((0..32).map(|i| format!("topic-{i}")).collect());

    c.bench_function("encode_subscribe", |b| {
        b.iter(|| LineCodec::encode(black_box(&envelope)));
    });
}

criterion_group!(benches, bench_decode_whole, bench_decode_split, bench_encode);
criterion_main!(benches);
