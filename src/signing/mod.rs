//! Signer capabilities.
//!
//! Two generations of signing library exist and they are driven
//! differently:
//!
//! - a [`LegacySigner`] is handed the bucket, the unescaped key and query,
//!   the headers and the body, and returns the complete header set it would
//!   have sent;
//! - a [`ModernSigner`] authorizes an [`AuthorizationRequest`] addressed at
//!   the path-style URL, mutating its headers in place.
//!
//! Which one a handler uses is decided once, from the libraries injected
//! through [`SignerLibraries`], and captured as a [`SignerCapability`].

mod hmac_v1;
mod request_signer;

pub use hmac_v1::{canonical_amz_headers, canonical_resource, string_to_sign, HmacV1Library, HmacV1Signer};
pub use request_signer::{S3RequestSigner, SignerState};

use crate::credentials::Credentials;
use crate::error::{ConfigurationError, S3Error};
use crate::translate::TranslatedUrls;
use crate::types::{Headers, PendingRequest};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Request handed to a modern signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// HTTP method.
    pub method: String,
    /// Path-style URL the signature is computed for.
    pub url: Url,
    /// Single-valued, case-insensitive headers. The signer adds to these.
    pub headers: Headers,
    /// Request body.
    pub body: Bytes,
}

/// Request handed to a legacy signer.
#[derive(Debug, Clone, Copy)]
pub struct LegacySigningRequest<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// Bucket name.
    pub bucket: &'a str,
    /// Unescaped object key, empty for the bucket root.
    pub key: &'a str,
    /// Unescaped query string.
    pub query: Option<&'a str>,
    /// Original request headers.
    pub headers: &'a Headers,
    /// Request body.
    pub body: &'a [u8],
}

/// A signer that authorizes an assembled request in place.
pub trait ModernSigner: Send + Sync {
    /// Add authentication headers to `request`.
    fn authorize(&self, request: &mut AuthorizationRequest) -> Result<(), S3Error>;
}

/// A signer that computes the full header set for a bucket/key request.
pub trait LegacySigner: Send + Sync {
    /// Return the headers the request should be sent with.
    ///
    /// The result replaces the original headers entirely.
    fn signed_headers(&self, request: &LegacySigningRequest<'_>) -> Result<Headers, S3Error>;
}

/// A modern signing library able to build signers.
pub trait ModernSignerLibrary: Send + Sync {
    /// Build a signer for the given credentials.
    fn signer(&self, credentials: &Credentials) -> Result<Arc<dyn ModernSigner>, S3Error>;

    /// Library name for logging.
    fn name(&self) -> &'static str;
}

/// A legacy signing library able to build signers.
pub trait LegacySignerLibrary: Send + Sync {
    /// Build a signer for the given credentials and options.
    fn connect(
        &self,
        credentials: &Credentials,
        options: &SignerOptions,
    ) -> Result<Arc<dyn LegacySigner>, S3Error>;

    /// Library name for logging.
    fn name(&self) -> &'static str;
}

/// Options forwarded to a legacy signing library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerOptions {
    /// Storage host the handler targets.
    pub storage_host: String,
    /// Library-specific options.
    pub extra: BTreeMap<String, String>,
}

impl SignerOptions {
    /// Create options for a storage host.
    pub fn new(storage_host: impl Into<String>) -> Self {
        Self {
            storage_host: storage_host.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Add a library-specific option.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// The signing libraries present in this process.
#[derive(Clone, Default)]
pub struct SignerLibraries {
    modern: Option<Arc<dyn ModernSignerLibrary>>,
    legacy: Option<Arc<dyn LegacySignerLibrary>>,
}

impl SignerLibraries {
    /// No signing library at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// The built-in HMAC-V1 signer, registered as both generations.
    pub fn builtin() -> Self {
        let library = Arc::new(HmacV1Library);
        Self {
            modern: Some(library.clone()),
            legacy: Some(library),
        }
    }

    /// Register a modern library.
    pub fn with_modern(mut self, library: Arc<dyn ModernSignerLibrary>) -> Self {
        self.modern = Some(library);
        self
    }

    /// Register a legacy library.
    pub fn with_legacy(mut self, library: Arc<dyn LegacySignerLibrary>) -> Self {
        self.legacy = Some(library);
        self
    }

    /// Whether a modern library is registered.
    pub fn has_modern(&self) -> bool {
        self.modern.is_some()
    }

    /// Whether a legacy library is registered.
    pub fn has_legacy(&self) -> bool {
        self.legacy.is_some()
    }
}

impl fmt::Debug for SignerLibraries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerLibraries")
            .field("modern", &self.modern.as_ref().map(|l| l.name()))
            .field("legacy", &self.legacy.as_ref().map(|l| l.name()))
            .finish()
    }
}

/// The signing capability a handler ended up with.
#[derive(Clone)]
pub enum SignerCapability {
    /// Signs through an explicit authorize step.
    Modern(Arc<dyn ModernSigner>),
    /// Signs through the headers-only bucket/key call.
    Legacy(Arc<dyn LegacySigner>),
    /// No signing library is present.
    Unavailable,
}

impl SignerCapability {
    /// Pick a capability from the available libraries.
    ///
    /// A modern library is preferred over a legacy one. Library failures
    /// while building a signer become [`ConfigurationError::SignerSetup`].
    /// Having no library at all is not an error here; it yields
    /// [`SignerCapability::Unavailable`].
    pub fn detect(
        libraries: &SignerLibraries,
        credentials: &Credentials,
        options: &SignerOptions,
    ) -> Result<Self, S3Error> {
        if let Some(library) = &libraries.modern {
            let signer = library.signer(credentials).map_err(setup_error)?;
            info!(library = library.name(), "Selected modern S3 signer");
            return Ok(SignerCapability::Modern(signer));
        }

        if let Some(library) = &libraries.legacy {
            let signer = library
                .connect(credentials, options)
                .map_err(setup_error)?;
            info!(library = library.name(), "Selected legacy S3 signer");
            return Ok(SignerCapability::Legacy(signer));
        }

        debug!("No S3 signing library available");
        Ok(SignerCapability::Unavailable)
    }

    /// Short name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            SignerCapability::Modern(_) => "modern",
            SignerCapability::Legacy(_) => "legacy",
            SignerCapability::Unavailable => "unavailable",
        }
    }

    /// Compute the headers `pending` should be sent with.
    pub fn compute_auth_headers(
        &self,
        pending: &PendingRequest,
        urls: &TranslatedUrls,
    ) -> Result<Headers, S3Error> {
        match self {
            SignerCapability::Modern(signer) => {
                let mut request = AuthorizationRequest {
                    method: pending.method.clone(),
                    url: urls.path_style.clone(),
                    headers: pending.headers.joined(),
                    body: pending.body.clone(),
                };
                signer.authorize(&mut request)?;
                Ok(request.headers)
            }
            SignerCapability::Legacy(signer) => signer.signed_headers(&LegacySigningRequest {
                method: &pending.method,
                bucket: &urls.address.bucket,
                key: &urls.address.key,
                query: urls.address.query.as_deref(),
                headers: &pending.headers,
                body: &pending.body,
            }),
            SignerCapability::Unavailable => {
                Err(ConfigurationError::NoSigningCapability.into())
            }
        }
    }
}

impl fmt::Debug for SignerCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignerCapability").field(&self.kind()).finish()
    }
}

fn setup_error(err: S3Error) -> S3Error {
    match err {
        S3Error::Configuration(setup @ ConfigurationError::SignerSetup { .. }) => {
            S3Error::Configuration(setup)
        }
        other => S3Error::Configuration(ConfigurationError::SignerSetup {
            message: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SigningError;
    use crate::mocks::{MockLegacyLibrary, MockLegacySigner, MockModernLibrary, MockModernSigner};
    use crate::translate::UrlTranslator;

    fn urls(url: &str) -> TranslatedUrls {
        UrlTranslator::default()
            .translate(&Url::parse(url).unwrap(), true)
            .unwrap()
    }

    fn pending() -> PendingRequest {
        PendingRequest {
            method: "GET".to_string(),
            headers: [("X-Foo", "a"), ("X-Foo", "b")].into_iter().collect(),
            body: Bytes::from_static(b"body"),
        }
    }

    #[test]
    fn test_detect_prefers_modern() {
        let libraries = SignerLibraries::none()
            .with_legacy(Arc::new(MockLegacyLibrary::new(MockLegacySigner::new())))
            .with_modern(Arc::new(MockModernLibrary::new(MockModernSigner::new())));

        let capability = SignerCapability::detect(
            &libraries,
            &Credentials::new("AK", "SECRET"),
            &SignerOptions::default(),
        )
        .unwrap();
        assert_eq!(capability.kind(), "modern");
    }

    #[test]
    fn test_detect_falls_back_to_legacy() {
        let libraries = SignerLibraries::none()
            .with_legacy(Arc::new(MockLegacyLibrary::new(MockLegacySigner::new())));

        let capability = SignerCapability::detect(
            &libraries,
            &Credentials::new("AK", "SECRET"),
            &SignerOptions::default(),
        )
        .unwrap();
        assert_eq!(capability.kind(), "legacy");
    }

    #[test]
    fn test_detect_nothing_available() {
        let capability = SignerCapability::detect(
            &SignerLibraries::none(),
            &Credentials::anonymous(),
            &SignerOptions::default(),
        )
        .unwrap();
        assert_eq!(capability.kind(), "unavailable");

        let u = urls("s3://bucket/key");
        let err = capability.compute_auth_headers(&pending(), &u).unwrap_err();
        assert!(matches!(
            err,
            S3Error::Configuration(ConfigurationError::NoSigningCapability)
        ));
    }

    #[test]
    fn test_detect_setup_failure_is_configuration_error() {
        let libraries = SignerLibraries::none().with_legacy(Arc::new(MockLegacyLibrary::failing(
            "unknown option 'port'",
        )));

        let err = SignerCapability::detect(
            &libraries,
            &Credentials::new("AK", "SECRET"),
            &SignerOptions::default(),
        )
        .unwrap_err();
        match err {
            S3Error::Configuration(ConfigurationError::SignerSetup { message }) => {
                assert!(message.contains("unknown option 'port'"));
            }
            other => panic!("expected SignerSetup, got {:?}", other),
        }
    }

    #[test]
    fn test_modern_receives_joined_headers_and_path_style_url() {
        let signer = Arc::new(MockModernSigner::new());
        let capability = SignerCapability::Modern(signer.clone());
        let u = urls("s3://mybucket/data/file.json?v=2");

        let headers = capability.compute_auth_headers(&pending(), &u).unwrap();

        let seen = signer.last_request().unwrap();
        assert_eq!(seen.url.as_str(), "https://s3.amazonaws.com/mybucket/data/file.json?v=2");
        assert_eq!(seen.headers.get_all("x-foo"), ["a,b"]);
        assert_eq!(seen.body, Bytes::from_static(b"body"));
        assert!(headers.contains("Authorization"));
        assert_eq!(headers.get("X-Foo"), Some("a,b"));
    }

    #[test]
    fn test_legacy_receives_unescaped_parts() {
        let signer = Arc::new(MockLegacySigner::new());
        let capability = SignerCapability::Legacy(signer.clone());
        let u = urls("s3://mybucket/my%20file.txt?versionId=a%2Bb");

        let headers = capability.compute_auth_headers(&pending(), &u).unwrap();

        let seen = signer.last_request().unwrap();
        assert_eq!(seen.bucket, "mybucket");
        assert_eq!(seen.key, "my file.txt");
        assert_eq!(seen.query.as_deref(), Some("versionId=a+b"));
        assert_eq!(seen.headers.get_all("X-Foo"), ["a", "b"]);
        assert_eq!(seen.body, Bytes::from_static(b"body"));
        assert_eq!(headers, signer.returned_headers());
    }

    #[test]
    fn test_signing_error_propagates() {
        let signer = Arc::new(MockModernSigner::failing(SigningError::Rejected {
            message: "clock skew".to_string(),
        }));
        let capability = SignerCapability::Modern(signer);
        let u = urls("s3://bucket/key");

        let err = capability.compute_auth_headers(&pending(), &u).unwrap_err();
        assert!(matches!(err, S3Error::Signing(SigningError::Rejected { .. })));
    }

    #[test]
    fn test_libraries_debug() {
        let debug = format!("{:?}", SignerLibraries::builtin());
        assert!(debug.contains("hmac-v1"));
        assert!(SignerLibraries::builtin().has_modern());
        assert!(!SignerLibraries::none().has_legacy());
    }
}
