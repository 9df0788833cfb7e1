//! Mock signers and signing libraries for testing.

use crate::credentials::Credentials;
use crate::error::{S3Error, SigningError};
use crate::signing::{
    AuthorizationRequest, LegacySigner, LegacySignerLibrary, LegacySigningRequest, ModernSigner,
    ModernSignerLibrary, SignerOptions,
};
use crate::types::Headers;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock modern signer.
///
/// Records the request it was asked to authorize (before mutation) and adds
/// fixed authentication headers.
pub struct MockModernSigner {
    error: Mutex<Option<SigningError>>,
    sign_count: AtomicUsize,
    requests: Mutex<Vec<AuthorizationRequest>>,
}

impl MockModernSigner {
    /// Authorization header value added on every successful call.
    pub const AUTHORIZATION: &'static str = "AWS mock:modern-signature";

    /// Create a new mock signer.
    pub fn new() -> Self {
        Self {
            error: Mutex::new(None),
            sign_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock signer whose next call fails.
    pub fn failing(error: SigningError) -> Self {
        let signer = Self::new();
        *signer.error.lock().unwrap() = Some(error);
        signer
    }

    /// Get the number of authorize calls.
    pub fn sign_count(&self) -> usize {
        self.sign_count.load(Ordering::Relaxed)
    }

    /// Get the last request seen.
    pub fn last_request(&self) -> Option<AuthorizationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockModernSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl ModernSigner for MockModernSigner {
    fn authorize(&self, request: &mut AuthorizationRequest) -> Result<(), S3Error> {
        self.sign_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error.into());
        }

        request.headers.insert("Authorization", Self::AUTHORIZATION);
        request.headers.insert("Date", "Mon, 15 Jan 2024 10:00:00 GMT");
        Ok(())
    }
}

/// A legacy signer call, with owned copies of its arguments.
#[derive(Debug, Clone)]
pub struct LegacyCall {
    /// HTTP method.
    pub method: String,
    /// Bucket name.
    pub bucket: String,
    /// Unescaped key.
    pub key: String,
    /// Unescaped query.
    pub query: Option<String>,
    /// Headers passed in.
    pub headers: Headers,
    /// Body passed in.
    pub body: Bytes,
}

/// Mock legacy signer returning a fixed header set.
pub struct MockLegacySigner {
    headers: Headers,
    calls: Mutex<Vec<LegacyCall>>,
}

impl MockLegacySigner {
    /// Create a mock signer returning a single Authorization header.
    pub fn new() -> Self {
        let mut headers = Headers::new();
        headers.insert("Authorization", "AWS mock:legacy-signature");
        headers.insert("Date", "Mon, 15 Jan 2024 10:00:00 GMT");
        Self::with_headers(headers)
    }

    /// Create a mock signer returning `headers`.
    pub fn with_headers(headers: Headers) -> Self {
        Self {
            headers,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The headers every call returns.
    pub fn returned_headers(&self) -> Headers {
        self.headers.clone()
    }

    /// Get the number of calls.
    pub fn sign_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Get the last call.
    pub fn last_request(&self) -> Option<LegacyCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl Default for MockLegacySigner {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacySigner for MockLegacySigner {
    fn signed_headers(&self, request: &LegacySigningRequest<'_>) -> Result<Headers, S3Error> {
        self.calls.lock().unwrap().push(LegacyCall {
            method: request.method.to_string(),
            bucket: request.bucket.to_string(),
            key: request.key.to_string(),
            query: request.query.map(str::to_string),
            headers: request.headers.clone(),
            body: Bytes::copy_from_slice(request.body),
        });
        Ok(self.headers.clone())
    }
}

/// Mock modern library handing out one shared signer.
pub struct MockModernLibrary {
    signer: Result<Arc<MockModernSigner>, String>,
}

impl MockModernLibrary {
    /// Library that hands out `signer`.
    pub fn new(signer: MockModernSigner) -> Self {
        Self::shared(Arc::new(signer))
    }

    /// Library that hands out an existing shared signer.
    pub fn shared(signer: Arc<MockModernSigner>) -> Self {
        Self { signer: Ok(signer) }
    }

    /// Library whose setup fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            signer: Err(message.into()),
        }
    }
}

impl ModernSignerLibrary for MockModernLibrary {
    fn signer(&self, _credentials: &Credentials) -> Result<Arc<dyn ModernSigner>, S3Error> {
        match &self.signer {
            Ok(signer) => Ok(signer.clone()),
            Err(message) => Err(SigningError::Rejected {
                message: message.clone(),
            }
            .into()),
        }
    }

    fn name(&self) -> &'static str {
        "mock-modern"
    }
}

/// Mock legacy library handing out one shared signer.
pub struct MockLegacyLibrary {
    signer: Result<Arc<MockLegacySigner>, String>,
    options: Mutex<Option<SignerOptions>>,
}

impl MockLegacyLibrary {
    /// Library that hands out `signer`.
    pub fn new(signer: MockLegacySigner) -> Self {
        Self::shared(Arc::new(signer))
    }

    /// Library that hands out an existing shared signer.
    pub fn shared(signer: Arc<MockLegacySigner>) -> Self {
        Self {
            signer: Ok(signer),
            options: Mutex::new(None),
        }
    }

    /// Library whose setup fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            signer: Err(message.into()),
            options: Mutex::new(None),
        }
    }

    /// Options passed to the last `connect` call.
    pub fn last_options(&self) -> Option<SignerOptions> {
        self.options.lock().unwrap().clone()
    }
}

impl LegacySignerLibrary for MockLegacyLibrary {
    fn connect(
        &self,
        _credentials: &Credentials,
        options: &SignerOptions,
    ) -> Result<Arc<dyn LegacySigner>, S3Error> {
        *self.options.lock().unwrap() = Some(options.clone());
        match &self.signer {
            Ok(signer) => Ok(signer.clone()),
            Err(message) => Err(SigningError::Rejected {
                message: message.clone(),
            }
            .into()),
        }
    }

    fn name(&self) -> &'static str {
        "mock-legacy"
    }
}
