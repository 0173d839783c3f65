// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Responses produced by dispatch and page rendering.

use serde::Serialize;

use crate::error::Result;

/// Content type of rendered documents.
pub const HTML: &str = "text/html; charset=utf-8";

/// Content type of JSON responses.
pub const JSON: &str = "application/json";

/// A transport-neutral response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    status: u16,
    content_type: String,
    body: String,
}

impl Response {
    /// A response with explicit status and content type.
    pub fn new(status: u16, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// A `200` markup response.
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(200, HTML, body)
    }

    /// A `200` JSON response.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::new(200, JSON, serde_json::to_string(value)?))
    }

    /// Status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parse a JSON body.
    pub fn json_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}
