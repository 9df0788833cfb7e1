//! The S3 download handler.
//!
//! Entry point for `s3://` requests: translate the URL, sign (or not), and
//! delegate to the HTTP transport.

use crate::config::{
    validate_storage_host, S3Settings, SettingsSource, DEFAULT_STORAGE_HOST, S3_STORAGE_HOST,
};
use crate::credentials::CredentialResolver;
use crate::error::S3Error;
use crate::signing::{S3RequestSigner, SignerCapability, SignerLibraries, SignerOptions, SignerState};
use crate::translate::UrlTranslator;
use crate::transport::{DownloadContext, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::types::{PendingRequest, Request};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Download handler for `s3://` requests.
///
/// Credentials and the signer are fixed when the handler is built and shared
/// read-only by every request, so one handler can serve any number of
/// concurrent downloads.
pub struct S3DownloadHandler {
    translator: UrlTranslator,
    signer: S3RequestSigner,
    transport: Arc<dyn HttpTransport>,
}

impl S3DownloadHandler {
    /// Create a handler builder.
    pub fn builder() -> S3DownloadHandlerBuilder {
        S3DownloadHandlerBuilder::new()
    }

    /// Build a handler from environment settings, the built-in signer and
    /// the reqwest transport.
    pub fn from_env() -> Result<Self, S3Error> {
        Self::builder().settings(Arc::new(S3Settings::from_env()?)).build()
    }

    /// How this handler signs requests.
    pub fn state(&self) -> SignerState {
        self.signer.state()
    }

    /// The storage host requests are sent to.
    pub fn storage_host(&self) -> &str {
        self.translator.storage_host()
    }

    /// Translate and sign `request` without sending it.
    pub fn prepare_request(&self, request: &Request) -> Result<HttpRequest, S3Error> {
        let secure = request.meta.is_secure;
        let urls = self.translator.translate(&request.url, secure)?;
        self.signer.sign(PendingRequest::from_request(request), &urls)
    }

    /// Download `request` through the transport.
    ///
    /// The transport is called exactly once and its result is returned as-is.
    pub async fn download_request(
        &self,
        request: Request,
        context: &DownloadContext,
    ) -> Result<HttpResponse, S3Error> {
        let final_request = self.prepare_request(&request)?;
        debug!(
            method = %final_request.method,
            url = %final_request.url,
            secure = request.meta.is_secure,
            crawler = %context.crawler,
            "Delegating S3 request to transport"
        );
        self.transport.send(final_request, context).await
    }
}

impl fmt::Debug for S3DownloadHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3DownloadHandler")
            .field("storage_host", &self.translator.storage_host())
            .field("state", &self.signer.state())
            .finish_non_exhaustive()
    }
}

/// Builder for [`S3DownloadHandler`].
pub struct S3DownloadHandlerBuilder {
    settings: Option<Arc<dyn SettingsSource>>,
    resolver: CredentialResolver,
    libraries: SignerLibraries,
    signer_options: BTreeMap<String, String>,
    storage_host: Option<String>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl S3DownloadHandlerBuilder {
    /// Create a builder using the built-in signer libraries.
    pub fn new() -> Self {
        Self {
            settings: None,
            resolver: CredentialResolver::new(),
            libraries: SignerLibraries::builtin(),
            signer_options: BTreeMap::new(),
            storage_host: None,
            transport: None,
        }
    }

    /// Set the settings source used for defaults.
    pub fn settings(mut self, settings: Arc<dyn SettingsSource>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Set an explicit access key id.
    pub fn access_key_id(mut self, value: impl Into<String>) -> Self {
        self.resolver = self.resolver.access_key_id(value);
        self
    }

    /// Set an explicit secret access key.
    pub fn secret_access_key(mut self, value: impl Into<String>) -> Self {
        self.resolver = self.resolver.secret_access_key(value);
        self
    }

    /// Set an explicit session token.
    pub fn session_token(mut self, value: impl Into<String>) -> Self {
        self.resolver = self.resolver.session_token(value);
        self
    }

    /// Force anonymous (`true`) or signed (`false`) mode.
    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.resolver = self.resolver.anonymous(anonymous);
        self
    }

    /// Set the signing libraries available to the handler.
    pub fn signer_libraries(mut self, libraries: SignerLibraries) -> Self {
        self.libraries = libraries;
        self
    }

    /// Pass a library-specific option to a legacy signer.
    pub fn signer_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.signer_options.insert(name.into(), value.into());
        self
    }

    /// Override the storage host.
    pub fn storage_host(mut self, host: impl Into<String>) -> Self {
        self.storage_host = Some(host.into());
        self
    }

    /// Set the HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the handler.
    ///
    /// Fails with a configuration error when the storage host is not a bare
    /// host name, when no signing library is available, or when the selected
    /// library rejects the credentials.
    pub fn build(self) -> Result<S3DownloadHandler, S3Error> {
        let settings: Arc<dyn SettingsSource> = match self.settings {
            Some(settings) => settings,
            None => Arc::new(S3Settings::default()),
        };

        let credentials = self.resolver.resolve(settings.as_ref())?;

        let storage_host = match self.storage_host.filter(|h| !h.is_empty()) {
            Some(host) => host,
            None => settings
                .setting(S3_STORAGE_HOST)?
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| DEFAULT_STORAGE_HOST.to_string()),
        };
        validate_storage_host(&storage_host)?;

        let options = SignerOptions {
            storage_host: storage_host.clone(),
            extra: self.signer_options,
        };
        let capability = SignerCapability::detect(&self.libraries, &credentials, &options)?;
        let signer = S3RequestSigner::new(&credentials, capability)?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        Ok(S3DownloadHandler {
            translator: UrlTranslator::new(storage_host),
            signer,
            transport,
        })
    }
}

impl Default for S3DownloadHandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
