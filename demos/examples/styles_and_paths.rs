// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Styles and short paths.
//!
//! Registers a style that decorates fields, binds a page with two forms, and
//! prints the short and long path of every component.
//!
//! Run:
//! - `cargo run -p understory_demos --example styles_and_paths`

use understory_declarative::{BoundTree, Style, StyleRegistry, init_styles};
use understory_endpoint::{Request, form, page, render_root};
use understory_namespace::{Namespace, namespace};

fn main() {
    let mut registry = StyleRegistry::new();
    registry
        .register(
            Style::new("bulma")
                .class("Field", namespace! { attrs__class__input = true })
                .class("Action", namespace! { attrs__class__button = true }),
        )
        .expect("base style is registered");
    registry.set_default_style("bulma").expect("bulma was just registered");
    init_styles(registry).expect("styles are initialised once");

    let login = form()
        .declare(&namespace! {
            fields__username = Namespace::new(),
            fields__password__attrs__type = "password",
            actions__submit__display_name = "Log in",
        })
        .expect("login form");
    let search = form()
        .declare(&namespace! { fields__username = Namespace::new() })
        .expect("search form");
    let view = page()
        .declare(&namespace! { title = "Paths", parts__login = login, parts__search = search })
        .expect("page");

    let request = Request::get(Vec::<(String, String)>::new());
    let tree = match BoundTree::bind(&view, &request) {
        Ok(Some(tree)) => tree,
        Ok(None) => return,
        Err(err) => {
            eprintln!("bind failed: {err}");
            return;
        }
    };

    match tree.path_index() {
        Ok(index) => {
            println!("{:<24} long path", "short path");
            for long in index.long_paths() {
                let short = index.short_path(long).unwrap_or_default();
                println!("{:<24} {long}", if short.is_empty() { "''" } else { short });
            }
        }
        Err(err) => eprintln!("{err}"),
    }

    match render_root(&tree) {
        Ok(document) => println!("\n{document}"),
        Err(err) => eprintln!("render failed: {err}"),
    }
}
