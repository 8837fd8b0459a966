//! The request capability used by routes.
//!
//! The store never performs I/O itself. Hosts hand it a [`RequestClient`]
//! and routes build requests against it; what comes back is a future the
//! caller drives on whatever executor it likes.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use pulse_core::{Result, Value};
use serde::{Deserialize, Serialize};

/// Request and response headers.
pub type Headers = BTreeMap<String, String>;

/// Future returned by a request client.
pub type ResponseFuture = Pin<Box<dyn Future<Output = Result<Response>>>>;

/// HTTP method of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// An outgoing request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub headers: Headers,
}

impl Request {
    /// Creates a request with no body and no headers.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            headers: Headers::new(),
        }
    }

    /// Sets the body.
    pub fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    /// Merges headers into the request.
    pub fn with_headers(mut self, headers: Option<Headers>) -> Self {
        if let Some(headers) = headers {
            self.headers.extend(headers);
        }
        self
    }
}

/// A completed response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub body: Value,
    pub headers: Headers,
}

impl Response {
    /// Creates a response with no headers.
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            headers: Headers::new(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability for issuing requests.
///
/// Only [`RequestClient::send`] must be implemented; the verb helpers build
/// a [`Request`] and forward it.
pub trait RequestClient {
    /// Sends a request.
    fn send(&self, request: Request) -> ResponseFuture;

    fn get(&self, url: &str, headers: Option<Headers>) -> ResponseFuture {
        self.send(Request::new(Method::Get, url).with_headers(headers))
    }

    fn post(&self, url: &str, body: Option<Value>, headers: Option<Headers>) -> ResponseFuture {
        self.send(
            Request::new(Method::Post, url)
                .with_body(body)
                .with_headers(headers),
        )
    }

    fn put(&self, url: &str, body: Option<Value>, headers: Option<Headers>) -> ResponseFuture {
        self.send(
            Request::new(Method::Put, url)
                .with_body(body)
                .with_headers(headers),
        )
    }

    fn patch(&self, url: &str, body: Option<Value>, headers: Option<Headers>) -> ResponseFuture {
        self.send(
            Request::new(Method::Patch, url)
                .with_body(body)
                .with_headers(headers),
        )
    }

    fn delete(&self, url: &str, body: Option<Value>, headers: Option<Headers>) -> ResponseFuture {
        self.send(
            Request::new(Method::Delete, url)
                .with_body(body)
                .with_headers(headers),
        )
    }
}
