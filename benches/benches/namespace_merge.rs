// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_namespace::{Namespace, Value, flatten, get_path};

/// `columns__c{i}__{attr}` for `n` columns with four settings each.
fn gen_columns(n: usize, tag: &str) -> Namespace {
    let mut pairs = Vec::with_capacity(n * 4);
    for i in 0..n {
        pairs.push((format!("columns__c{i}__title"), Value::from(format!("{tag} {i}"))));
        pairs.push((format!("columns__c{i}__after"), Value::from(i as i64)));
        pairs.push((format!("columns__c{i}__attrs__class__{tag}"), Value::Bool(true)));
        pairs.push((format!("columns__c{i}__cell__attrs__style__width"), Value::from("1em")));
    }
    Namespace::from_paths(pairs)
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for &n in &[16usize, 128, 1024] {
        group.throughput(Throughput::Elements((n * 4) as u64));
        group.bench_function(format!("from_paths_n{n}"), |b| {
            b.iter(|| black_box(gen_columns(n, "x")));
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    for &n in &[16usize, 128, 1024] {
        let defaults = gen_columns(n, "base");
        let overrides = gen_columns(n / 2, "user");
        group.throughput(Throughput::Elements((n * 4) as u64));
        group.bench_function(format!("merged_n{n}"), |b| {
            b.iter(|| black_box(defaults.merged(&overrides)));
        });
        group.bench_function(format!("setdefaults_n{n}"), |b| {
            b.iter_batched(
                || overrides.clone(),
                |mut ns| {
                    ns.setdefaults(&defaults);
                    black_box(ns);
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    for &n in &[16usize, 128, 1024] {
        let ns = gen_columns(n, "x");
        let last = format!("columns__c{}__cell__attrs__style__width", n - 1);
        group.bench_function(format!("flatten_n{n}"), |b| {
            b.iter(|| black_box(flatten(&ns).len()));
        });
        group.bench_function(format!("get_path_n{n}"), |b| {
            b.iter(|| black_box(get_path(&ns, &last).is_ok()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_merge, bench_read);
criterion_main!(benches);
