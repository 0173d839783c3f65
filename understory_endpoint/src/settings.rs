// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process settings for dispatch and styling.

use serde::Deserialize;
use understory_declarative::{BASE_STYLE, StyleRegistry};

use crate::error::{DispatchError, Result};

/// Environment variable enabling debug mode.
pub const DEBUG_VAR: &str = "UNDERSTORY_DEBUG";

/// Environment variable naming the default style.
pub const STYLE_VAR: &str = "UNDERSTORY_STYLE";

/// Dispatch and styling settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Return dispatch path errors to the caller instead of a generic JSON
    /// error.
    pub debug: bool,
    /// Style applied where no component names one.
    pub default_style: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            default_style: BASE_STYLE.to_owned(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from `UNDERSTORY_DEBUG` and `UNDERSTORY_STYLE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(value) = lookup(DEBUG_VAR) {
            settings.debug = parse_flag(DEBUG_VAR, &value)?;
        }
        if let Some(style) = lookup(STYLE_VAR).filter(|s| !s.is_empty()) {
            settings.default_style = style;
        }
        Ok(settings)
    }

    /// Make `default_style` the default of `registry`.
    pub fn apply(&self, registry: &mut StyleRegistry) -> Result<()> {
        Ok(registry.set_default_style(self.default_style.as_str())?)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DispatchError::InvalidSetting {
            name: name.to_owned(),
            value: value.to_owned(),
        }),
    }
}
