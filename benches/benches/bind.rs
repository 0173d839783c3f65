// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_declarative::{BoundTree, Declared, PathIndex, StyleRegistry};
use understory_endpoint::{Request, Settings, form, page, render_to_response};
use understory_namespace::{Callable, Namespace, Signature};

/// A page of `forms` forms with `fields` fields each and one endpoint.
fn gen_page(forms: usize, fields: usize) -> Declared {
    let echo = Callable::new("echo", Signature::new().required(["value"]), |args| {
        Ok(args.get("value").cloned().unwrap_or_default())
    });
    let mut config = Namespace::new();
    for f in 0..forms {
        let mut form_config = Namespace::new();
        for i in 0..fields {
            form_config.set_path(&format!("fields__field{i}__initial"), i as i64);
        }
        form_config.set_path("endpoints__echo__func", echo.clone());
        match form().declare(&form_config) {
            Ok(declared) => config.set_path(&format!("parts__form{f}"), declared),
            Err(err) => panic!("form declaration failed: {err}"),
        }
    }
    match page().declare(&config) {
        Ok(declared) => declared,
        Err(err) => panic!("page declaration failed: {err}"),
    }
}

fn bench_declare(c: &mut Criterion) {
    let mut group = c.benchmark_group("declare");
    let registry = StyleRegistry::new();
    for &(forms, fields) in &[(1usize, 8usize), (4, 32), (16, 64)] {
        let declared = gen_page(forms, fields);
        group.throughput(Throughput::Elements((forms * fields) as u64));
        group.bench_function(format!("declare_{forms}x{fields}"), |b| {
            b.iter(|| black_box(gen_page(forms, fields)));
        });
        group.bench_function(format!("refine_done_{forms}x{fields}"), |b| {
            b.iter(|| black_box(declared.refine_done(None, &registry).is_ok()));
        });
        if let Ok(done) = declared.refine_done(None, &registry) {
            group.bench_function(format!("path_index_{forms}x{fields}"), |b| {
                b.iter(|| black_box(PathIndex::build(&done).map(|index| index.len())));
            });
        }
    }
    group.finish();
}

fn bench_bind(c: &mut Criterion) {
    let mut group = c.benchmark_group("bind");
    let registry = StyleRegistry::new();
    let get = Request::get(Vec::<(String, String)>::new());
    let ajax = Request::get([("/echo", "hi")]);
    let settings = Settings::default();
    for &(forms, fields) in &[(1usize, 8usize), (4, 32), (16, 64)] {
        let declared = gen_page(forms, fields);
        group.throughput(Throughput::Elements((forms * fields) as u64));
        group.bench_function(format!("bind_{forms}x{fields}"), |b| {
            b.iter(|| {
                let tree = BoundTree::bind_with_styles(&declared, &get, &registry);
                black_box(tree.map(|t| t.map(|t| t.node_count())).is_ok());
            });
        });
        group.bench_function(format!("render_{forms}x{fields}"), |b| {
            b.iter(|| black_box(render_to_response(&declared, &get, &settings).is_ok()));
        });
        group.bench_function(format!("ajax_{forms}x{fields}"), |b| {
            b.iter(|| {
                let response = render_to_response(&declared, &ajax, &settings);
                black_box(response.map(|r| r.body() == "\"hi\"").unwrap_or(false));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_declare, bench_bind);
criterion_main!(benches);
