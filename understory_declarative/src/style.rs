// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Styles: named configuration overlays applied per class.
//!
//! A [`Style`] maps class names to namespaces of defaults and may extend a
//! base style. At `refine_done`, the overlay for every class in a
//! component's lineage (root class first) is layered beneath its own
//! configuration.
//!
//! The process-wide registry is initialised once with [`init`] before
//! components are bound and is read-only afterwards.

use std::sync::OnceLock;

use indexmap::IndexMap;
use understory_namespace::Namespace;

use crate::error::{Error, Result};

/// Name of the style every registry starts with.
pub const BASE_STYLE: &str = "base";

/// A named set of per-class configuration overlays.
#[derive(Clone, Debug, Default)]
pub struct Style {
    name: String,
    base: Option<String>,
    config: IndexMap<String, Namespace>,
}

impl Style {
    /// Create an empty style.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            config: IndexMap::new(),
        }
    }

    /// Inherit the overlays of `base`; this style's overlays win.
    #[must_use]
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Add an overlay for instances of `class` (and its subclasses).
    #[must_use]
    pub fn class(mut self, class: impl Into<String>, config: Namespace) -> Self {
        let entry = self.config.entry(class.into()).or_default();
        *entry = entry.merged(&config);
        self
    }

    /// Style name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A set of styles and the default style name.
#[derive(Clone, Debug)]
pub struct StyleRegistry {
    styles: IndexMap<String, Style>,
    default_style: String,
}

impl Default for StyleRegistry {
    fn default() -> Self {
        let mut styles = IndexMap::new();
        styles.insert(BASE_STYLE.to_owned(), Style::new(BASE_STYLE));
        Self {
            styles,
            default_style: BASE_STYLE.to_owned(),
        }
    }
}

impl StyleRegistry {
    /// A registry holding only the empty base style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a style. Its base, if any, must already be registered.
    pub fn register(&mut self, style: Style) -> Result<()> {
        if let Some(base) = &style.base {
            self.style(base)?;
        }
        self.styles.insert(style.name.clone(), style);
        Ok(())
    }

    /// Choose the style used when no component names one.
    pub fn set_default_style(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.style(&name)?;
        self.default_style = name;
        Ok(())
    }

    /// The default style name.
    pub fn default_style(&self) -> &str {
        &self.default_style
    }

    /// Look up a style by name.
    pub fn style(&self, name: &str) -> Result<&Style> {
        self.styles.get(name).ok_or_else(|| {
            let mut available: Vec<String> = self.styles.keys().cloned().collect();
            available.sort();
            Error::UnknownStyle {
                name: name.to_owned(),
                available,
            }
        })
    }

    /// The overlay a style contributes to a class with the given lineage.
    ///
    /// Base styles come first; within a style, overlays for base classes
    /// come before overlays for subclasses.
    pub fn overlay(&self, style: &str, lineage: &[String]) -> Result<Namespace> {
        let mut chain = Vec::new();
        let mut next = Some(style);
        while let Some(name) = next {
            let style = self.style(name)?;
            if chain.iter().any(|s: &&Style| s.name == style.name) {
                break;
            }
            chain.push(style);
            next = style.base.as_deref();
        }
        let mut out = Namespace::new();
        for style in chain.iter().rev() {
            for class in lineage {
                if let Some(config) = style.config.get(class) {
                    out = out.merged(config);
                }
            }
        }
        Ok(out)
    }
}

static REGISTRY: OnceLock<StyleRegistry> = OnceLock::new();

/// Install the process-wide style registry. May be called once.
pub fn init(registry: StyleRegistry) -> Result<()> {
    REGISTRY
        .set(registry)
        .map_err(|_| Error::StylesAlreadyInitialized)
}

/// The process-wide style registry, or an empty one if [`init`] was never called.
pub fn registry() -> &'static StyleRegistry {
    REGISTRY.get_or_init(StyleRegistry::default)
}
