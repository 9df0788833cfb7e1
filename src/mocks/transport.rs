//! Mock HTTP transport for testing.

use crate::error::{NetworkError, S3Error};
use crate::transport::{DownloadContext, HttpRequest, HttpResponse, HttpTransport};
use crate::types::Headers;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Response body.
    pub body: Bytes,
}

impl MockResponse {
    /// Create a successful response with empty body.
    pub fn ok() -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Create a successful response with body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Create an error response.
    pub fn error(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Add a header to the response.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }
}

/// Mock HTTP transport for testing.
pub struct MockTransport {
    /// Queue of responses to return.
    responses: Mutex<Vec<MockResponse>>,
    /// Recorded requests with their contexts.
    requests: Mutex<Vec<(HttpRequest, DownloadContext)>>,
    /// Default response if no responses are queued.
    default_response: Option<MockResponse>,
    /// Error to return on the next call.
    error: Mutex<Option<S3Error>>,
}

impl MockTransport {
    /// Create a new mock transport with no responses.
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Create a mock transport with queued responses.
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            default_response: None,
            error: Mutex::new(None),
        }
    }

    /// Create a mock transport with a default response.
    pub fn with_default(response: MockResponse) -> Self {
        Self {
            default_response: Some(response),
            ..Self::new()
        }
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: S3Error) {
        *self.error.lock().unwrap() = Some(error);
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Get the last request made.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|(request, _)| request.clone())
    }

    /// Get the context of the last request made.
    pub fn last_context(&self) -> Option<DownloadContext> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|(_, context)| context.clone())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(
        &self,
        request: HttpRequest,
        context: &DownloadContext,
    ) -> Result<HttpResponse, S3Error> {
        self.requests
            .lock()
            .unwrap()
            .push((request, context.clone()));

        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }

        let response = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                self.default_response.clone()
            } else {
                Some(responses.remove(0))
            }
        };

        match response {
            Some(mock) => Ok(HttpResponse {
                status: mock.status,
                headers: mock.headers,
                body: mock.body,
            }),
            None => Err(S3Error::Network(NetworkError::ConnectionFailed {
                message: "No mock response available".to_string(),
            })),
        }
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued_responses", &self.responses.lock().unwrap().len())
            .field("recorded_requests", &self.requests.lock().unwrap().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_basic() {
        let transport = MockTransport::with_responses(vec![MockResponse::ok_with_body("first")]);

        let response = transport
            .send(HttpRequest::new("GET", "https://example.com"), &DownloadContext::default())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, Bytes::from("first"));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_transport_no_response() {
        let transport = MockTransport::new();

        let result = transport
            .send(HttpRequest::new("GET", "https://example.com"), &DownloadContext::default())
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_mock_transport_fail_next() {
        let transport = MockTransport::with_default(MockResponse::ok());
        transport.fail_next(S3Error::Network(NetworkError::Timeout {
            duration: std::time::Duration::from_secs(1),
        }));
        let context = DownloadContext::new("spider");

        let first = tokio_test::block_on(
            transport.send(HttpRequest::new("GET", "https://example.com"), &context),
        );
        let second = tokio_test::block_on(
            transport.send(HttpRequest::new("GET", "https://example.com"), &context),
        );

        assert!(first.is_err());
        assert!(second.is_ok());
        assert_eq!(transport.last_context().unwrap().crawler, "spider");
    }
}
