//! Sync file read and write benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use usync_bench::utils::{content_type, wide_node};
use usync_core::entity::ContentTypeKind;
use usync_core::serialization::mappers::ContentTypeMapper;
use usync_core::serialization::EntityMapper;
use usync_xml::{parse, same_xml, to_compact_string, to_xml_string};

/// Benchmark writing nodes of increasing width.
fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");

    for width in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), width, |b, &width| {
            let node = wide_node(width);
            b.iter(|| {
                let text = to_xml_string(black_box(&node)).unwrap();
                black_box(text);
            });
        });
    }
    group.finish();
}

/// Benchmark parsing nodes of increasing width.
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for width in [10, 100, 1000].iter() {
        let text = to_xml_string(&wide_node(*width)).unwrap();
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), &text, |b, text| {
            b.iter(|| {
                let node = parse(black_box(text)).unwrap();
                black_box(node);
            });
        });
    }
    group.finish();
}

/// Benchmark the unchanged check used before every write.
fn bench_same_xml(c: &mut Criterion) {
    let node = wide_node(100);
    let reparsed = parse(&to_xml_string(&node).unwrap()).unwrap();

    c.bench_function("same_xml_100", |b| {
        b.iter(|| black_box(same_xml(black_box(&node), black_box(&reparsed))));
    });
    c.bench_function("compact_100", |b| {
        b.iter(|| black_box(to_compact_string(black_box(&node)).unwrap()));
    });
}

/// Benchmark mapping a content type to a file and back.
fn bench_content_type_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_type_roundtrip");
    let mapper = ContentTypeMapper::new(ContentTypeKind::Document);

    for properties in [5, 50, 200].iter() {
        group.throughput(Throughput::Elements(*properties as u64));
        group.bench_with_input(BenchmarkId::from_parameter(properties), properties, |b, &properties| {
            let item = content_type(properties);
            b.iter(|| {
                let node = mapper.to_xml(black_box(&item)).unwrap();
                let text = to_xml_string(&node).unwrap();
                black_box(parse(&text).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_write,
    bench_parse,
    bench_same_xml,
    bench_content_type_roundtrip,
);

criterion_main!(benches);
