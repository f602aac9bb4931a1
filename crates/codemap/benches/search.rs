//! Benchmarks for ranked lookup and store persistence.
//!
//! These benchmarks measure:
//! - `find_symbol` in strict and fuzzy mode as the index grows
//! - `save` of a store with many directory maps

// Benchmark code - performance of the benchmark setup is not critical
#![allow(missing_docs)]

use codemap::{MapStore, SearchOptions, Symbol, SymbolType};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tempfile::TempDir;

/// Builds a store with `num_files` files spread over ten directories, each
/// holding one class with three methods and a free function.
fn populated_store(num_files: usize) -> (TempDir, MapStore) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let mut store = MapStore::new(dir.path()).expect("failed to open store");

    for i in 0..num_files {
        let class = Symbol::new(format!("Service{i}"), SymbolType::CLASS, 1, 40)
            .with_docstring(format!("Handles request batch {i}"))
            .with_children(vec![
                Symbol::new(format!("get_item_{i}"), SymbolType::METHOD, 3, 10),
                Symbol::new(format!("create_item_{i}"), SymbolType::METHOD, 12, 20),
                Symbol::new(format!("delete_item_{i}"), SymbolType::METHOD, 22, 30),
            ]);
        let function = Symbol::new(format!("helper_{i}"), SymbolType::FUNCTION, 42, 50);
        store
            .update_file(
                &format!("pkg{}/module_{i}.py", i % 10),
                format!("{i:064x}"),
                "python",
                50,
                vec![class, function],
            )
            .expect("update failed");
    }

    (dir, store)
}

fn bench_find_symbol(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_symbol");

    for num_files in [100, 1_000] {
        let (_dir, store) = populated_store(num_files);
        group.throughput(Throughput::Elements(num_files as u64));

        group.bench_with_input(BenchmarkId::new("strict", num_files), &store, |b, store| {
            b.iter(|| store.find_symbol(black_box("item"), &SearchOptions::default()));
        });

        let fuzzy = SearchOptions::default().fuzzy();
        group.bench_with_input(BenchmarkId::new("fuzzy", num_files), &store, |b, store| {
            b.iter(|| store.find_symbol(black_box("servce"), &fuzzy));
        });
    }

    group.finish();
}

fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");
    group.sample_size(20);

    group.bench_function("1000_files", |b| {
        b.iter_batched(
            || populated_store(1_000),
            |(_dir, mut store)| store.save().expect("save failed"),
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_find_symbol, bench_save);
criterion_main!(benches);
