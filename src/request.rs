//! Incoming HTTP request handle.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::method::Method;

/// An incoming HTTP request, fully buffered by the connection layer.
///
/// Cloning is cheap: every middleware and the handler receive a clone
/// pointing at the same data.
#[derive(Clone, Debug)]
pub struct Request {
    inner: Arc<Inner>,
}

#[derive(Clone, Debug)]
struct Inner {
    method: Method,
    target: String,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// A request for `target` (path plus optional query), no headers, no body.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                method,
                target: target.into(),
                headers: HeaderMap::new(),
                body: Bytes::new(),
            }),
        }
    }

    pub(crate) fn from_parts(method: Method, parts: http::request::Parts, body: Bytes) -> Self {
        let target = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_owned(), |pq| pq.as_str().to_owned());
        Self { inner: Arc::new(Inner { method, target, headers: parts.headers, body }) }
    }

    /// Adds a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            Arc::make_mut(&mut self.inner).headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        Arc::make_mut(&mut self.inner).body = body.into();
        self
    }

    pub fn method(&self) -> Method { self.inner.method }
    pub fn headers(&self) -> &HeaderMap { &self.inner.headers }
    pub fn body(&self) -> &Bytes { &self.inner.body }

    /// The request target as received, query string included.
    pub fn target(&self) -> &str { &self.inner.target }

    /// The path component, without query or fragment.
    pub fn path(&self) -> &str {
        let target = &self.inner.target;
        target.find(['?', '#']).map_or(target.as_str(), |i| &target[..i])
    }

    /// The raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        let (_, rest) = self.inner.target.split_once('?')?;
        Some(rest.split_once('#').map_or(rest, |(q, _)| q))
    }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
