//! HTTP transport layer.
//!
//! The handler never performs network I/O itself. It builds an
//! [`HttpRequest`] and hands it to an [`HttpTransport`], exactly once per
//! incoming request, and returns whatever the transport produced.

use crate::error::{ConfigurationError, NetworkError, S3Error};
use crate::types::Headers;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

/// Final HTTP request handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: Headers,
    /// Request body.
    pub body: Bytes,
}

impl HttpRequest {
    /// Create a new HTTP request.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }
}

/// HTTP response received.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response indicates a client error (4xx status).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Get a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Get the AWS request ID from response headers.
    pub fn request_id(&self) -> Option<&str> {
        self.get_header("x-amz-request-id")
    }
}

/// Caller context forwarded to the transport with each request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadContext {
    /// Name of the crawl that issued the request.
    pub crawler: String,
    /// Timeout for this download, overriding the transport default.
    pub timeout: Option<Duration>,
    /// Free-form values for the transport.
    pub extra: HashMap<String, String>,
}

impl DownloadContext {
    /// Create a context for a named crawl.
    pub fn new(crawler: impl Into<String>) -> Self {
        Self {
            crawler: crawler.into(),
            timeout: None,
            extra: HashMap::new(),
        }
    }

    /// Set a per-download timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP transport trait for making requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request and return the response.
    ///
    /// Any status code is a response; only failures to exchange a request
    /// are errors.
    async fn send(
        &self,
        request: HttpRequest,
        context: &DownloadContext,
    ) -> Result<HttpResponse, S3Error>;
}

/// Default HTTP transport using reqwest.
///
/// Redirects are returned to the caller as responses unless the builder
/// enables following them.
pub struct ReqwestTransport {
    client: reqwest::Client,
    download_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a new transport with default settings.
    pub fn new() -> Result<Self, S3Error> {
        Self::builder().build()
    }

    /// Create a transport builder.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: HttpRequest,
        context: &DownloadContext,
    ) -> Result<HttpResponse, S3Error> {
        let method = request.method.parse::<reqwest::Method>().map_err(|e| {
            S3Error::Network(NetworkError::InvalidRequest {
                message: format!("Invalid HTTP method: {}", e),
            })
        })?;
        let timeout = context.timeout.unwrap_or(self.download_timeout);

        let mut req_builder = self.client.request(method, &request.url).timeout(timeout);

        for (name, value) in request.headers.pairs() {
            req_builder = req_builder.header(name, value);
        }

        if !request.body.is_empty() {
            req_builder = req_builder.body(request.body);
        }

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                S3Error::Network(NetworkError::Timeout { duration: timeout })
            } else if e.is_builder() {
                S3Error::Network(NetworkError::InvalidRequest {
                    message: e.to_string(),
                })
            } else {
                S3Error::Network(NetworkError::ConnectionFailed {
                    message: e.to_string(),
                })
            }
        })?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_str().unwrap_or("")))
            .collect();

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                S3Error::Network(NetworkError::Timeout { duration: timeout })
            } else {
                S3Error::Network(NetworkError::ConnectionFailed {
                    message: format!("Failed to read response body: {}", e),
                })
            }
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("download_timeout", &self.download_timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for reqwest transport.
pub struct ReqwestTransportBuilder {
    connect_timeout: Duration,
    download_timeout: Duration,
    follow_redirects: bool,
    verify_ssl: bool,
    user_agent: String,
}

impl ReqwestTransportBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            download_timeout: Duration::from_secs(180),
            follow_redirects: false,
            verify_ssl: true,
            user_agent: format!("s3-download-handler/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the default time allowed for a whole download.
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Follow redirects inside the transport instead of returning them.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Set whether to verify SSL certificates.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<ReqwestTransport, S3Error> {
        if self.download_timeout.is_zero() {
            return Err(S3Error::Configuration(
                ConfigurationError::InvalidConfiguration {
                    field: "download_timeout".to_string(),
                    message: "must be greater than zero".to_string(),
                },
            ));
        }

        let redirect = if self.follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .redirect(redirect)
            .danger_accept_invalid_certs(!self.verify_ssl)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| {
                S3Error::Configuration(ConfigurationError::InvalidConfiguration {
                    field: "transport".to_string(),
                    message: e.to_string(),
                })
            })?;

        Ok(ReqwestTransport {
            client,
            download_timeout: self.download_timeout,
        })
    }
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
