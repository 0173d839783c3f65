// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A form driven through render, AJAX, and POST dispatch.
//!
//! Set `RUST_LOG=debug` (or `trace`) to see the bind and dispatch events, and
//! `UNDERSTORY_DEBUG=1` to get full path errors instead of the generic one.
//!
//! Run:
//! - `cargo run -p understory_demos --example form_dispatch`

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use understory_declarative::NodeId;
use understory_endpoint::{Request, Settings, form, render_to_response, tree_of};
use understory_namespace::{Callable, Namespace, Signature, Value, namespace};

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(%err, "bad settings, using defaults");
            Settings::default()
        }
    };

    let save = Callable::new("save", Signature::new().required(["tree", "form"]), |args| {
        let tree = tree_of(args).ok_or("handler called without a tree")?;
        let form = args
            .get("form")
            .and_then(|f| f.downcast_ref::<NodeId>())
            .ok_or("handler called without a form")?;
        let mut saved = Namespace::new();
        for name in tree.member_names(*form, "fields") {
            if let Some(field) = tree.member(*form, "fields", name) {
                saved.insert(name, tree.attribute(field, "value").cloned().unwrap_or_default());
            }
        }
        Ok(Value::Namespace(saved))
    });
    let suggest = Callable::new("suggest", Signature::new().required(["value"]), |args| {
        let prefix = args.get("value").and_then(Value::as_str).unwrap_or_default().to_owned();
        let names = ["Ada", "Alan", "Grace"]
            .into_iter()
            .filter(|n| n.starts_with(&prefix))
            .map(Value::from)
            .collect::<Vec<_>>();
        Ok(Value::List(names))
    });

    let view = form()
        .declare(&namespace! {
            title = "Artist",
            fields__name__title = "Name",
            fields__year__call_target__attribute = "integer",
            fields__year__initial = 1815,
            fields__year__after = 0,
            actions__submit__display_name = "Save",
            actions__submit__post_handler = save,
            endpoints__suggest__func = suggest,
        })
        .expect("the artist form is well formed");

    let requests = [
        Request::get(Vec::<(String, String)>::new()),
        Request::get([("/suggest", "A")]),
        Request::post([("name", "Ada"), ("year", "1815"), ("-submit", "")]),
        Request::get([("/nowhere", "")]),
    ];
    for request in &requests {
        println!("{} {:?}", request.method(), request.data());
        match render_to_response(&view, request, &settings) {
            Ok(response) => println!("  {} {}\n{}\n", response.status(), response.content_type(), response.body()),
            Err(err) => println!("  error: {err}\n"),
        }
    }
}
