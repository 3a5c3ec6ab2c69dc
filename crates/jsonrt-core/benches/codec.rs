use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jsonrt_core::{parse, stringify, Value};
use std::hint::black_box;

/// Array of `rows` records with repeated keys, the common shape of API payloads.
fn records(rows: usize) -> String {
    let items: Vec<String> = (0..rows)
        .map(|i| {
            format!(
                r#"{{"id":{i},"name":"user {i}","email":"user{i}@example.com","score":{}.5,"active":{},"tags":["a","b\n"]}}"#,
                i * 7,
                i % 2 == 0
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}

fn nested(depth: usize) -> String {
    format!("{}0{}", r#"{"k":["#.repeat(depth), "]}".repeat(depth))
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for rows in [10, 1_000] {
        let text = records(rows);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("records", rows), &text, |b, text| {
            b.iter(|| parse(black_box(text), None).unwrap())
        });
    }
    let deep = nested(10_000);
    group.bench_function("nested_10000", |b| b.iter(|| parse(black_box(&deep), None).unwrap()));
    group.finish();
}

fn bench_stringify(c: &mut Criterion) {
    let mut group = c.benchmark_group("stringify");
    for rows in [10, 1_000] {
        let value = parse(&records(rows), None).unwrap();
        group.bench_with_input(BenchmarkId::new("compact", rows), &value, |b, value| {
            b.iter(|| stringify(black_box(value), &Value::Null, &Value::Null).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("pretty", rows), &value, |b, value| {
            b.iter(|| stringify(black_box(value), &Value::Null, &Value::from(2)).unwrap())
        });
    }
    let deep = parse(&nested(10_000), None).unwrap();
    group.bench_function("nested_10000", |b| {
        b.iter(|| stringify(black_box(&deep), &Value::Null, &Value::Null).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_parse, bench_stringify);
criterion_main!(benches);
