//! Credential resolution.
//!
//! A handler decides once, at construction, which credentials it signs with
//! and whether it signs at all. Explicit values win over settings, and a
//! handler with no credentials anywhere runs anonymously unless told
//! otherwise.

use crate::config::{SettingsSource, AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN};
use crate::error::S3Error;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tracing::debug;

/// Resolved credentials for a handler.
#[derive(Clone)]
pub struct Credentials {
    access_key_id: Option<String>,
    secret_access_key: Option<SecretString>,
    session_token: Option<SecretString>,
    anonymous: bool,
}

impl Credentials {
    /// Create signing credentials from a key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        let access_key_id = non_empty(Some(access_key_id.into()));
        let secret_access_key = non_empty(Some(secret_access_key.into()));
        Self {
            anonymous: is_anonymous(None, access_key_id.as_deref(), secret_access_key.as_deref()),
            access_key_id,
            secret_access_key: secret_access_key.map(SecretString::new),
            session_token: None,
        }
    }

    /// Credentials for an anonymous handler.
    pub fn anonymous() -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            anonymous: true,
        }
    }

    /// Attach a session token.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = non_empty(Some(token.into())).map(SecretString::new);
        self
    }

    /// Get the access key ID, if any.
    pub fn access_key_id(&self) -> Option<&str> {
        self.access_key_id.as_deref()
    }

    /// Get the secret access key, if any.
    ///
    /// Note: This exposes the secret. Use carefully and avoid logging.
    pub fn secret_access_key(&self) -> Option<&str> {
        self.secret_access_key
            .as_ref()
            .map(|s| s.expose_secret().as_str())
    }

    /// Get the session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Whether requests go out without authentication.
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("anonymous", &self.anonymous)
            .finish()
    }
}

/// Decide whether a handler runs anonymously.
///
/// An explicit flag always wins. Without one, the handler is anonymous only
/// when both the access key id and the secret are missing or empty; a single
/// present field is enough to attempt signing.
pub fn is_anonymous(
    explicit: Option<bool>,
    access_key_id: Option<&str>,
    secret_access_key: Option<&str>,
) -> bool {
    match explicit {
        Some(flag) => flag,
        None => {
            access_key_id.map_or(true, str::is_empty)
                && secret_access_key.map_or(true, str::is_empty)
        }
    }
}

/// Resolves [`Credentials`] from explicit arguments and a settings source.
#[derive(Default)]
pub struct CredentialResolver {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
    anonymous: Option<bool>,
}

impl CredentialResolver {
    /// Create a resolver with no explicit values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit access key id.
    pub fn access_key_id(mut self, value: impl Into<String>) -> Self {
        self.access_key_id = Some(value.into());
        self
    }

    /// Set an explicit secret access key.
    pub fn secret_access_key(mut self, value: impl Into<String>) -> Self {
        self.secret_access_key = Some(value.into());
        self
    }

    /// Set an explicit session token.
    pub fn session_token(mut self, value: impl Into<String>) -> Self {
        self.session_token = Some(value.into());
        self
    }

    /// Force anonymous (`true`) or signed (`false`) mode.
    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = Some(anonymous);
        self
    }

    /// Resolve credentials, falling back to `settings` for missing values.
    ///
    /// Settings are only consulted for values not supplied explicitly. The
    /// session token is read from settings only when the access key id or
    /// secret also came from there.
    pub fn resolve(&self, settings: &dyn SettingsSource) -> Result<Credentials, S3Error> {
        let access_key_id = explicit_or_setting(&self.access_key_id, settings, AWS_ACCESS_KEY_ID)?;
        let secret_access_key =
            explicit_or_setting(&self.secret_access_key, settings, AWS_SECRET_ACCESS_KEY)?;

        let session_token = match non_empty(self.session_token.clone()) {
            Some(token) => Some(token),
            None if access_key_id.from_settings || secret_access_key.from_settings => {
                non_empty(settings.setting(AWS_SESSION_TOKEN)?)
            }
            None => None,
        };
        let access_key_id = access_key_id.value;
        let secret_access_key = secret_access_key.value;

        let anonymous = is_anonymous(
            self.anonymous,
            access_key_id.as_deref(),
            secret_access_key.as_deref(),
        );

        debug!(
            anonymous,
            has_access_key_id = access_key_id.is_some(),
            has_secret = secret_access_key.is_some(),
            explicit_anonymous = ?self.anonymous,
            "Resolved S3 credentials"
        );

        Ok(Credentials {
            access_key_id,
            secret_access_key: secret_access_key.map(SecretString::new),
            session_token: session_token.map(SecretString::new),
            anonymous,
        })
    }
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("access_key_id", &self.access_key_id)
            .field("anonymous", &self.anonymous)
            .finish_non_exhaustive()
    }
}

struct Resolved {
    value: Option<String>,
    from_settings: bool,
}

fn explicit_or_setting(
    explicit: &Option<String>,
    settings: &dyn SettingsSource,
    name: &str,
) -> Result<Resolved, S3Error> {
    if let Some(value) = non_empty(explicit.clone()) {
        return Ok(Resolved {
            value: Some(value),
            from_settings: false,
        });
    }

    let value = non_empty(settings.setting(name)?);
    Ok(Resolved {
        from_settings: value.is_some(),
        value,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
