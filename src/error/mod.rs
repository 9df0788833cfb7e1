//! Error types for the S3 download handler.
//!
//! Errors are grouped by the stage that raises them. Configuration errors
//! happen while the handler is being built and make it unusable; the other
//! categories fail a single request.

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the download handler.
#[derive(Debug, Error)]
pub enum S3Error {
    /// Handler construction errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Object-store URL translation errors.
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Request signing errors.
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// Transport errors, passed through from the HTTP layer.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl S3Error {
    /// Returns true if the error is retryable.
    ///
    /// Only transport failures qualify. A request that failed to translate
    /// or sign will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            S3Error::Network(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if the error means the handler itself cannot be used.
    pub fn is_configuration(&self) -> bool {
        matches!(self, S3Error::Configuration(_))
    }
}

/// Errors raised while building a handler.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Neither a modern nor a legacy signing library was supplied.
    #[error("no signing capability available")]
    NoSigningCapability,

    /// A signing library refused the supplied credentials or options.
    #[error("Signer setup failed: {message}")]
    SignerSetup {
        /// Message reported by the signing library.
        message: String,
    },

    /// A settings source could not be read.
    #[error("Setting '{name}' unavailable: {message}")]
    SettingsUnavailable {
        /// The setting name.
        name: String,
        /// Details about the failure.
        message: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfiguration {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },
}

/// Errors raised while translating an object-store URL.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// The URL has no host, so there is no bucket to address.
    #[error("Missing bucket: '{url}' has no hostname")]
    MissingBucket {
        /// The offending URL.
        url: String,
    },

    /// The URL does not use the object-store scheme.
    #[error("Unsupported scheme '{scheme}': expected 's3'")]
    UnsupportedScheme {
        /// The scheme that was found.
        scheme: String,
    },

    /// A translated URL could not be parsed.
    #[error("Invalid URL '{url}': {details}")]
    InvalidUrl {
        /// The URL that failed to parse.
        url: String,
        /// Parser error details.
        details: String,
    },
}

/// Errors raised by a signer capability while computing headers.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The signer has no usable credentials.
    #[error("Missing credentials: access key id and secret are required for signing")]
    MissingCredentials,

    /// The signer rejected the request.
    #[error("Request rejected by signer: {message}")]
    Rejected {
        /// Reason given by the signer.
        message: String,
    },
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection failed.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message.
        message: String,
    },

    /// Request timed out.
    #[error("Request timed out after {duration:?}")]
    Timeout {
        /// The timeout duration.
        duration: Duration,
    },

    /// The request could not be built by the transport.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message.
        message: String,
    },
}

impl NetworkError {
    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::ConnectionFailed { .. } | NetworkError::Timeout { .. }
        )
    }
}
