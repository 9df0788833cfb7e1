//! Per-handler signing state machine.

use super::SignerCapability;
use crate::credentials::Credentials;
use crate::error::{ConfigurationError, S3Error};
use crate::translate::TranslatedUrls;
use crate::transport::HttpRequest;
use crate::types::PendingRequest;
use tracing::{debug, info};

/// How a handler treats every request it sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerState {
    /// Requests go out unsigned.
    Anonymous,
    /// Requests are signed through a legacy signer.
    SignedLegacy,
    /// Requests are signed through a modern signer.
    SignedModern,
}

/// Turns pending requests into final requests.
///
/// The state is fixed at construction and never re-evaluated.
#[derive(Debug, Clone)]
pub struct S3RequestSigner {
    state: SignerState,
    capability: SignerCapability,
}

impl S3RequestSigner {
    /// Create a signer from resolved credentials and a detected capability.
    ///
    /// Fails with [`ConfigurationError::NoSigningCapability`] when the
    /// capability is unavailable, even for anonymous credentials.
    pub fn new(credentials: &Credentials, capability: SignerCapability) -> Result<Self, S3Error> {
        let state = match (&capability, credentials.is_anonymous()) {
            (SignerCapability::Unavailable, _) => {
                return Err(ConfigurationError::NoSigningCapability.into())
            }
            (_, true) => SignerState::Anonymous,
            (SignerCapability::Legacy(_), false) => SignerState::SignedLegacy,
            (SignerCapability::Modern(_), false) => SignerState::SignedModern,
        };

        info!(
            state = ?state,
            capability = capability.kind(),
            access_key_id = credentials.access_key_id().unwrap_or(""),
            "S3 request signer ready"
        );

        Ok(Self { state, capability })
    }

    /// The state chosen at construction.
    pub fn state(&self) -> SignerState {
        self.state
    }

    /// The capability chosen at construction.
    pub fn capability(&self) -> &SignerCapability {
        &self.capability
    }

    /// Build the final request for `pending`.
    ///
    /// The final URL is always the virtual-hosted one and the body is passed
    /// through untouched. Anonymous requests keep their headers; signed
    /// requests carry whatever the capability returned.
    pub fn sign(&self, pending: PendingRequest, urls: &TranslatedUrls) -> Result<HttpRequest, S3Error> {
        let headers = match self.state {
            SignerState::Anonymous => pending.headers,
            SignerState::SignedLegacy | SignerState::SignedModern => {
                self.capability.compute_auth_headers(&pending, urls)?
            }
        };

        debug!(
            state = ?self.state,
            bucket = %urls.address.bucket,
            url = %urls.virtual_hosted,
            "Signed S3 request"
        );

        Ok(HttpRequest {
            method: pending.method,
            url: urls.virtual_hosted.to_string(),
            headers,
            body: pending.body,
        })
    }
}
