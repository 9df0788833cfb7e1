//! S3 Download Handler
//!
//! Fetches `s3://bucket/key` resources by rewriting them to HTTP(S) requests
//! against an S3-compatible storage host, optionally signing them, and
//! handing them to an HTTP transport.
//!
//! # Features
//!
//! - **Credential resolution**: explicit values, settings, or anonymous access
//! - **Two signer generations**: a modern signer that authorizes a
//!   path-style request, or a legacy signer that returns signed headers
//! - **Built-in HMAC-V1 signing**: no external signing library needed
//! - **Pluggable transport**: reqwest by default, mockable in tests
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use s3_download::{DownloadContext, Request, S3DownloadHandler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), s3_download::S3Error> {
//!     // Credentials and storage host come from the environment
//!     let handler = S3DownloadHandler::from_env()?;
//!
//!     let request = Request::get("s3://my-bucket/reports/2024.csv")
//!         .expect("valid URL")
//!         .with_secure(true);
//!     let response = handler
//!         .download_request(request, &DownloadContext::new("reports"))
//!         .await?;
//!
//!     println!("Fetched {} bytes", response.body.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod handler;
pub mod mocks;
pub mod signing;
pub mod translate;
pub mod transport;
pub mod types;

// Re-export main types at crate root
pub use config::{EnvSettings, S3Settings, S3SettingsBuilder, SettingsSource};
pub use credentials::{CredentialResolver, Credentials};
pub use error::{ConfigurationError, NetworkError, S3Error, SigningError, TranslationError};
pub use handler::{S3DownloadHandler, S3DownloadHandlerBuilder};
pub use signing::{
    HmacV1Library, HmacV1Signer, LegacySigner, LegacySignerLibrary, ModernSigner,
    ModernSignerLibrary, S3RequestSigner, SignerCapability, SignerLibraries, SignerOptions,
    SignerState,
};
pub use translate::{ObjectAddress, TranslatedUrls, UrlTranslator};
pub use transport::{
    DownloadContext, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport,
    ReqwestTransportBuilder,
};
pub use types::{Headers, PendingRequest, Request, RequestMeta};

/// Result type alias for S3 operations.
pub type Result<T> = std::result::Result<T, S3Error>;
