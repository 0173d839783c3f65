// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Namespace basics.
//!
//! Builds configuration from `__` paths, merges layers, shows callable
//! promotion and the empty marker, then flattens and evaluates.
//!
//! Run:
//! - `cargo run -p understory_demos --example namespace_basics`

use understory_namespace::{
    Callable, EMPTY, Namespace, Signature, Value, evaluate, flatten, get_path, get_path_or,
    namespace,
};

fn main() {
    let cell = Callable::new("cell", Signature::new().required(["row"]), |args| {
        let row = args.get("row").and_then(Value::as_i64).unwrap_or(0);
        Ok(Value::from(format!("<td>{row}</td>")))
    });

    // Defaults, then a caller's overrides.
    let defaults = namespace! {
        columns__name__title = "Name",
        columns__name__cell = cell.clone(),
        columns__year = EMPTY,
    };
    let overrides = namespace! {
        columns__name__cell__attrs__class__wide = true,
        columns__year__after = 0,
    };
    let config = defaults.merged(&overrides);
    println!("merged: {config}");

    // `cell` was promoted to a namespace carrying the callable as `call_target`.
    let promoted = get_path(&config, "columns__name__cell__call_target").unwrap_or_default();
    println!("promoted call_target is callable: {}", promoted.is_callable());

    // The empty marker became a namespace that accepted `after`.
    println!(
        "columns__year__after = {:?}",
        get_path_or(&config, "columns__year__after", Value::Null)
    );
    println!(
        "missing path with default = {:?}",
        get_path_or(&config, "columns__nope__title", Value::from(42))
    );

    println!("flattened:");
    for (path, value) in flatten(&config) {
        println!("  {path} = {value:?}");
    }

    let context = namespace! { row = 7 };
    match evaluate(&Value::Callable(cell), &context) {
        Ok(value) => println!("evaluated cell: {value:?}"),
        Err(err) => println!("evaluation failed: {err}"),
    }
    match evaluate(&promoted, &Namespace::new()) {
        Ok(value) => println!("unexpected: {value:?}"),
        Err(err) => println!("without `row`:\n{err}"),
    }
}
