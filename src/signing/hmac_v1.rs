//! Built-in S3 HMAC-V1 signer.
//!
//! Produces `Authorization: AWS {access_key_id}:{signature}` headers, where
//! the signature is the base64 HMAC-SHA1 of:
//!
//! ```text
//! METHOD \n Content-MD5 \n Content-Type \n Date \n
//! CanonicalizedAmzHeaders CanonicalizedResource
//! ```
//!
//! The canonical resource is path-style (`/bucket/key`) and neither host nor
//! scheme is signed, so a signature computed for the path-style URL is valid
//! on the virtual-hosted request.

use super::{
    AuthorizationRequest, LegacySigner, LegacySignerLibrary, LegacySigningRequest, ModernSigner,
    ModernSignerLibrary, SignerOptions,
};
use crate::credentials::Credentials;
use crate::error::{ConfigurationError, S3Error, SigningError};
use crate::types::Headers;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use ring::hmac;
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Characters that should NOT be percent-encoded in key paths.
const KEY_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Query parameters that are part of the canonical resource.
const SUBRESOURCES: &[&str] = &[
    "acl",
    "cors",
    "delete",
    "lifecycle",
    "location",
    "logging",
    "notification",
    "partNumber",
    "policy",
    "requestPayment",
    "response-cache-control",
    "response-content-disposition",
    "response-content-encoding",
    "response-content-language",
    "response-content-type",
    "response-expires",
    "restore",
    "tagging",
    "torrent",
    "uploadId",
    "uploads",
    "versionId",
    "versioning",
    "versions",
    "website",
];

/// Extra option accepted by the legacy library: a session token that
/// overrides the resolved one.
pub const SECURITY_TOKEN_OPTION: &str = "security_token";

/// Build the canonicalized amz headers block.
///
/// `x-amz-*` names are lowercased and sorted; values are trimmed and joined
/// with `,`. Each header ends with a newline.
pub fn canonical_amz_headers(headers: &Headers) -> String {
    let mut amz: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers.pairs() {
        let name_lower = name.to_lowercase();
        if name_lower.starts_with("x-amz-") {
            amz.entry(name_lower)
                .or_default()
                .push(value.trim().to_string());
        }
    }

    amz.iter()
        .map(|(name, values)| format!("{}:{}\n", name, values.join(",")))
        .collect()
}

/// Build the canonicalized resource from a path-style path and query.
///
/// Only sub-resource parameters are kept. `decode` controls whether query
/// values are still percent-encoded.
pub fn canonical_resource(path: &str, query: Option<&str>, decode: bool) -> String {
    let path = if path.is_empty() { "/" } else { path };

    let mut params: Vec<(&str, Option<String>)> = query
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let name = parts.next().unwrap_or("");
            if !SUBRESOURCES.contains(&name) {
                return None;
            }
            let value = parts.next().map(|v| {
                if decode {
                    percent_decode_str(v).decode_utf8_lossy().into_owned()
                } else {
                    v.to_string()
                }
            });
            Some((name, value))
        })
        .collect();

    if params.is_empty() {
        return path.to_string();
    }

    params.sort_by(|a, b| a.0.cmp(b.0));
    let query = params
        .iter()
        .map(|(name, value)| match value {
            Some(v) => format!("{}={}", name, v),
            None => name.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", path, query)
}

/// Build the string to sign.
pub fn string_to_sign(method: &str, headers: &Headers, resource: &str) -> String {
    let content_md5 = headers.get("content-md5").unwrap_or("");
    let content_type = headers.get("content-type").unwrap_or("");
    let date = if headers.contains("x-amz-date") {
        ""
    } else {
        headers.get("date").unwrap_or("")
    };

    format!(
        "{}\n{}\n{}\n{}\n{}{}",
        method,
        content_md5,
        content_type,
        date,
        canonical_amz_headers(headers),
        resource
    )
}

fn http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// HMAC-V1 signer holding a key pair.
#[derive(Clone)]
pub struct HmacV1Signer {
    access_key_id: Option<String>,
    secret_access_key: Option<SecretString>,
    session_token: Option<SecretString>,
}

impl HmacV1Signer {
    /// Create a signer from resolved credentials.
    ///
    /// Missing keys are accepted here and reported when signing.
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            access_key_id: credentials.access_key_id().map(str::to_string),
            secret_access_key: credentials
                .secret_access_key()
                .map(|s| SecretString::new(s.to_string())),
            session_token: credentials
                .session_token()
                .map(|s| SecretString::new(s.to_string())),
        }
    }

    /// Override the session token.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(SecretString::new(token.into()));
        self
    }

    fn has_key_pair(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }

    /// Sign `headers` in place for `method` and `resource`.
    pub fn sign(&self, method: &str, headers: &mut Headers, resource: &str) -> Result<(), S3Error> {
        let (access_key_id, secret) = match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => (id, secret),
            _ => return Err(SigningError::MissingCredentials.into()),
        };

        if let Some(token) = &self.session_token {
            headers.insert("x-amz-security-token", token.expose_secret().as_str());
        }
        if !headers.contains("date") && !headers.contains("x-amz-date") {
            headers.insert("Date", http_date(&Utc::now()));
        }

        let string_to_sign = string_to_sign(method, headers, resource);
        trace!(%resource, "Computed HMAC-V1 string to sign");

        let key = hmac::Key::new(
            hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            secret.expose_secret().as_bytes(),
        );
        let signature = BASE64.encode(hmac::sign(&key, string_to_sign.as_bytes()).as_ref());

        headers.insert(
            "Authorization",
            format!("AWS {}:{}", access_key_id, signature),
        );
        Ok(())
    }
}

impl ModernSigner for HmacV1Signer {
    fn authorize(&self, request: &mut AuthorizationRequest) -> Result<(), S3Error> {
        let resource = canonical_resource(request.url.path(), request.url.query(), true);
        self.sign(&request.method, &mut request.headers, &resource)
    }
}

impl LegacySigner for HmacV1Signer {
    fn signed_headers(&self, request: &LegacySigningRequest<'_>) -> Result<Headers, S3Error> {
        let path = format!(
            "/{}/{}",
            request.bucket,
            utf8_percent_encode(request.key, KEY_PATH_SET)
        );
        let resource = canonical_resource(&path, request.query, false);

        let mut headers = request.headers.clone();
        self.sign(request.method, &mut headers, &resource)?;
        Ok(headers)
    }
}

impl fmt::Debug for HmacV1Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacV1Signer")
            .field("access_key_id", &self.access_key_id)
            .field("has_session_token", &self.session_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Library handle for [`HmacV1Signer`], usable as either generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacV1Library;

impl ModernSignerLibrary for HmacV1Library {
    fn signer(&self, credentials: &Credentials) -> Result<Arc<dyn ModernSigner>, S3Error> {
        Ok(Arc::new(HmacV1Signer::new(credentials)))
    }

    fn name(&self) -> &'static str {
        "hmac-v1"
    }
}

impl LegacySignerLibrary for HmacV1Library {
    fn connect(
        &self,
        credentials: &Credentials,
        options: &SignerOptions,
    ) -> Result<Arc<dyn LegacySigner>, S3Error> {
        let mut signer = HmacV1Signer::new(credentials);

        for (name, value) in &options.extra {
            match name.as_str() {
                SECURITY_TOKEN_OPTION => signer = signer.with_session_token(value.as_str()),
                other => {
                    return Err(ConfigurationError::SignerSetup {
                        message: format!("unknown signer option '{}'", other),
                    }
                    .into())
                }
            }
        }

        if !credentials.is_anonymous() && !signer.has_key_pair() {
            return Err(ConfigurationError::SignerSetup {
                message: "access key id and secret are required for signed requests".to_string(),
            }
            .into());
        }

        Ok(Arc::new(signer))
    }

    fn name(&self) -> &'static str {
        "hmac-v1"
    }
}
