use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use tiled::array::Generator;
use tiled::catalog::{ArrayNode, ArrayStructure, Catalog, DType, DataSource, DataSourceKind, Entry};
use tiled::pagination::paginate;
use tiled::query::{apply_filters, bind_filters, QueryRegistry};

const COLORS: &[&str] = &["red", "green", "blue", "amber", "violet"];

fn wide_catalog(n: usize, seed: u64) -> Catalog {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cat = Catalog::new(Map::new());
    for i in 0..n {
        let meta = match json!({
            "color": COLORS[rng.gen_range(0..COLORS.len())],
            "count": rng.gen_range(0..10_000),
            "note": format!("entry number {i}"),
        }) {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        let array = ArrayNode {
            structure: ArrayStructure::single_chunk(vec![4], DType::Float64),
            generator: Arc::new(Generator::Zeros),
        };
        cat.insert(format!("e{i:06}"), Entry::DataSource(DataSource::new(meta, DataSourceKind::Array(array))));
    }
    cat
}

fn params(v: &[(&str, &str)]) -> Vec<(String, String)> { v.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect() }

fn bench_search(c: &mut Criterion) {
    let registry = QueryRegistry::builtins();
    let query = params(&[
        ("filter[fulltext][condition][text]", "blue"),
        ("filter[comparison][condition][key]", "count"),
        ("filter[comparison][condition][operator]", "lt"),
        ("filter[comparison][condition][value]", "5000"),
    ]);
    let mut group = c.benchmark_group("search");
    group.sample_size(20);
    for &n in &[1_000usize, 20_000] {
        let cat = wide_catalog(n, 0xC0FFEE);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("fulltext_and_comparison", n), &n, |b, _| {
            b.iter(|| {
                let bound = bind_filters(&registry, &query).expect("bind");
                let hits = apply_filters(&registry, &cat, &bound).expect("apply");
                criterion::black_box(hits.len());
            });
        });
    }
    group.finish();
}

fn bench_paginate(c: &mut Criterion) {
    let cat = wide_catalog(50_000, 7);
    c.bench_function("paginate_deep_window", |b| {
        b.iter(|| {
            let page = paginate(cat.iter(), 49_000, 300);
            criterion::black_box(page.items.len());
        });
    });
}

criterion_group!(benches, bench_search, bench_paginate);
criterion_main!(benches);
