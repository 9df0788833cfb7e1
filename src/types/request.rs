//! Request types flowing through the handler.

use super::Headers;
use bytes::Bytes;
use std::collections::HashMap;
use url::Url;

/// Per-request metadata set by the crawler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Send the request over HTTPS.
    pub is_secure: bool,
    /// Free-form metadata the handler passes through untouched.
    pub extra: HashMap<String, String>,
}

/// Inbound request addressed to an object-store URL.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: String,
    /// Object-store URL (`s3://bucket/key?query`).
    pub url: Url,
    /// Request headers.
    pub headers: Headers,
    /// Request body.
    pub body: Bytes,
    /// Request metadata.
    pub meta: RequestMeta,
}

impl Request {
    /// Create a new request with no headers, no body and insecure transport.
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self {
            method: method.into(),
            url,
            headers: Headers::new(),
            body: Bytes::new(),
            meta: RequestMeta::default(),
        }
    }

    /// Parse `url` and create a GET request.
    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new("GET", Url::parse(url)?))
    }

    /// Append a header value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace all headers.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Mark the request as secure (HTTPS) or not.
    pub fn with_secure(mut self, is_secure: bool) -> Self {
        self.meta.is_secure = is_secure;
        self
    }
}

/// A request in the middle of being signed.
///
/// Owned by the request signer for the duration of one signing step. The
/// target URLs travel separately, as translated URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// HTTP method.
    pub method: String,
    /// Request headers.
    pub headers: Headers,
    /// Request body.
    pub body: Bytes,
}

impl PendingRequest {
    /// Take the parts of an inbound request that signing needs.
    pub fn from_request(request: &Request) -> Self {
        Self {
            method: request.method.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
        }
    }
}
