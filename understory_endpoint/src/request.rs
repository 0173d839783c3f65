// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Inbound requests.

use core::fmt;
use core::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use understory_declarative::RequestParameters;
use understory_namespace::{Namespace, Value};

use crate::error::DispatchError;

/// Prefix of AJAX dispatch keys, and the separator of dispatch paths.
pub const DISPATCH_PREFIX: char = '/';

/// Prefix of POST dispatch keys.
pub const POST_PREFIX: char = '-';

/// Supported request methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Reads and AJAX dispatch.
    Get,
    /// Form submission and POST dispatch.
    Post,
}

impl Method {
    /// The prefix marking dispatch keys for this method.
    pub fn dispatch_prefix(self) -> char {
        match self {
            Self::Get => DISPATCH_PREFIX,
            Self::Post => POST_PREFIX,
        }
    }
}

impl FromStr for Method {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            _ => Err(DispatchError::UnsupportedMethod {
                method: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// A request as seen by the component layer.
///
/// `data` holds the query parameters of a GET or the form data of a POST.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    data: IndexMap<String, String>,
    user: Value,
    view_params: Namespace,
}

impl Request {
    /// A request with the given method and data.
    pub fn new<I, K, V>(method: Method, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method,
            data: data.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            user: Value::Null,
            view_params: Namespace::new(),
        }
    }

    /// A GET request with the given query parameters.
    pub fn get<I, K, V>(data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(Method::Get, data)
    }

    /// A POST request with the given form data.
    pub fn post<I, K, V>(data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(Method::Post, data)
    }

    /// Set the current user.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<Value>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the parameters the view was routed with.
    #[must_use]
    pub fn with_view_params(mut self, params: Namespace) -> Self {
        self.view_params = params;
        self
    }

    /// Request method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Query or form data.
    pub fn data(&self) -> &IndexMap<String, String> {
        &self.data
    }

    /// One data value.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Current user, `Null` if anonymous.
    pub fn user(&self) -> &Value {
        &self.user
    }

    /// Dispatch keys and their values, in data order.
    pub fn dispatch_commands(&self) -> Vec<(&str, &str)> {
        let prefix = self.method.dispatch_prefix();
        self.data
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }
}

impl RequestParameters for Request {
    fn evaluate_parameters(&self) -> Namespace {
        let mut params = Namespace::new();
        params.insert("request", Value::object(self.clone()));
        if !self.user.is_null() {
            params.insert("user", self.user.clone());
        }
        params.insert("params", self.view_params.clone());
        params
    }
}

/// The request a bound tree was bound for, if it was bound from a [`Request`].
pub fn request_of(parameters: &Namespace) -> Option<&Request> {
    parameters.get("request")?.downcast_ref::<Request>()
}
