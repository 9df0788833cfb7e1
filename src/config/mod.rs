//! Settings for the download handler.
//!
//! Handlers read their defaults through the [`SettingsSource`] trait so the
//! surrounding system can plug in whatever settings store it already has.
//! Two sources ship with the crate: [`S3Settings`], an in-memory value that
//! can be deserialized or built by hand, and [`EnvSettings`], which reads the
//! process environment.

use crate::error::{ConfigurationError, S3Error};
use serde::Deserialize;
use std::env;
use std::fmt;

/// Setting holding the default access key id.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Setting holding the default secret access key.
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Setting holding an optional session token.
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
/// Setting overriding the storage host.
pub const S3_STORAGE_HOST: &str = "S3_STORAGE_HOST";

/// Storage host used when none is configured.
pub const DEFAULT_STORAGE_HOST: &str = "s3.amazonaws.com";

/// Check that `host` is a bare `host[:port]` with nothing URL-like around it.
///
/// The bucket is prepended to the host with a `.`, so a scheme, path, query,
/// user info or whitespace in the host would redirect requests elsewhere.
pub fn validate_storage_host(host: &str) -> Result<(), S3Error> {
    let invalid = host.is_empty()
        || host.starts_with('.')
        || host
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "/\\?#@".contains(c));

    if invalid {
        return Err(S3Error::Configuration(
            ConfigurationError::InvalidConfiguration {
                field: "storage_host".to_string(),
                message: format!("'{}' is not a bare host name", host),
            },
        ));
    }
    Ok(())
}

/// A source of string-valued settings.
pub trait SettingsSource: Send + Sync {
    /// Look up a setting.
    ///
    /// Returns `Ok(None)` when the setting is absent and an error only when
    /// the source itself cannot be read.
    fn setting(&self, name: &str) -> Result<Option<String>, S3Error>;
}

/// In-memory settings.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct S3Settings {
    /// Default access key id.
    #[serde(default)]
    pub aws_access_key_id: Option<String>,

    /// Default secret access key.
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,

    /// Optional session token for temporary credentials.
    #[serde(default)]
    pub aws_session_token: Option<String>,

    /// Storage host (e.g. "s3.amazonaws.com").
    #[serde(default)]
    pub s3_storage_host: Option<String>,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field(
                "aws_secret_access_key",
                &self.aws_secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "aws_session_token",
                &self.aws_session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("s3_storage_host", &self.s3_storage_host)
            .finish()
    }
}

impl S3Settings {
    /// Create a new settings builder.
    pub fn builder() -> S3SettingsBuilder {
        S3SettingsBuilder::default()
    }

    /// Snapshot the current process environment.
    pub fn from_env() -> Result<Self, S3Error> {
        let source = EnvSettings;
        Ok(Self {
            aws_access_key_id: source.setting(AWS_ACCESS_KEY_ID)?,
            aws_secret_access_key: source.setting(AWS_SECRET_ACCESS_KEY)?,
            aws_session_token: source.setting(AWS_SESSION_TOKEN)?,
            s3_storage_host: source.setting(S3_STORAGE_HOST)?,
        })
    }

    /// The configured storage host, or the AWS default.
    pub fn storage_host(&self) -> &str {
        self.s3_storage_host
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_STORAGE_HOST)
    }
}

impl SettingsSource for S3Settings {
    fn setting(&self, name: &str) -> Result<Option<String>, S3Error> {
        let value = match name {
            AWS_ACCESS_KEY_ID => &self.aws_access_key_id,
            AWS_SECRET_ACCESS_KEY => &self.aws_secret_access_key,
            AWS_SESSION_TOKEN => &self.aws_session_token,
            S3_STORAGE_HOST => &self.s3_storage_host,
            _ => return Ok(None),
        };
        Ok(value.clone())
    }
}

/// Builder for [`S3Settings`].
#[derive(Default)]
pub struct S3SettingsBuilder {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
    storage_host: Option<String>,
}

impl S3SettingsBuilder {
    /// Create a new builder with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default access key id.
    pub fn access_key_id(mut self, value: impl Into<String>) -> Self {
        self.access_key_id = Some(value.into());
        self
    }

    /// Set the default secret access key.
    pub fn secret_access_key(mut self, value: impl Into<String>) -> Self {
        self.secret_access_key = Some(value.into());
        self
    }

    /// Set the session token.
    pub fn session_token(mut self, value: impl Into<String>) -> Self {
        self.session_token = Some(value.into());
        self
    }

    /// Set the storage host.
    pub fn storage_host(mut self, value: impl Into<String>) -> Self {
        self.storage_host = Some(value.into());
        self
    }

    /// Build the settings.
    pub fn build(self) -> Result<S3Settings, S3Error> {
        if let Some(host) = &self.storage_host {
            validate_storage_host(host)?;
        }

        Ok(S3Settings {
            aws_access_key_id: self.access_key_id,
            aws_secret_access_key: self.secret_access_key,
            aws_session_token: self.session_token,
            s3_storage_host: self.storage_host,
        })
    }
}

/// Settings read from the process environment on every lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSettings;

impl SettingsSource for EnvSettings {
    fn setting(&self, name: &str) -> Result<Option<String>, S3Error> {
        match env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(S3Error::Configuration(
                ConfigurationError::SettingsUnavailable {
                    name: name.to_string(),
                    message: "value is not valid unicode".to_string(),
                },
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = S3Settings::default();
        assert!(settings.aws_access_key_id.is_none());
        assert_eq!(settings.storage_host(), DEFAULT_STORAGE_HOST);
        assert_eq!(settings.setting(AWS_ACCESS_KEY_ID).unwrap(), None);
    }

    #[test]
    fn test_builder() {
        let settings = S3Settings::builder()
            .access_key_id("AKID")
            .secret_access_key("SECRET")
            .storage_host("storage.example.com")
            .build()
            .unwrap();

        assert_eq!(
            settings.setting(AWS_ACCESS_KEY_ID).unwrap().as_deref(),
            Some("AKID")
        );
        assert_eq!(
            settings.setting(AWS_SECRET_ACCESS_KEY).unwrap().as_deref(),
            Some("SECRET")
        );
        assert_eq!(settings.storage_host(), "storage.example.com");
        assert_eq!(settings.setting("UNKNOWN").unwrap(), None);
    }

    #[test]
    fn test_invalid_storage_host() {
        let result = S3Settings::builder()
            .storage_host("https://s3.amazonaws.com")
            .build();
        assert!(matches!(
            result,
            Err(S3Error::Configuration(ConfigurationError::InvalidConfiguration { .. }))
        ));
    }

    #[test]
    fn test_validate_storage_host() {
        for host in ["s3.amazonaws.com", "minio.internal:9000", "127.0.0.1:9000"] {
            assert!(validate_storage_host(host).is_ok(), "{}", host);
        }
        for host in [
            "",
            "a/b",
            "https://evil.example",
            "evil.example?x=1",
            "user@evil.example",
            "evil.example#frag",
            ".evil.example",
            "evil example",
        ] {
            assert!(
                matches!(
                    validate_storage_host(host),
                    Err(S3Error::Configuration(ConfigurationError::InvalidConfiguration { .. }))
                ),
                "{}",
                host
            );
        }
    }

    #[test]
    fn test_deserialize_settings() {
        let settings: S3Settings = serde_json::from_str(
            r#"{"AWS_ACCESS_KEY_ID": "AKID", "S3_STORAGE_HOST": "minio.local"}"#,
        )
        .unwrap();

        assert_eq!(settings.aws_access_key_id.as_deref(), Some("AKID"));
        assert!(settings.aws_secret_access_key.is_none());
        assert_eq!(settings.storage_host(), "minio.local");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = S3Settings::builder()
            .access_key_id("AKID")
            .secret_access_key("SECRET")
            .session_token("TOKEN")
            .build()
            .unwrap();
        let debug = format!("{:?}", settings);

        assert!(debug.contains("AKID"));
        assert!(!debug.contains("SECRET"));
        assert!(!debug.contains("TOKEN"));
    }

    #[test]
    fn test_env_settings_absent() {
        let value = EnvSettings
            .setting("S3_DOWNLOAD_TEST_SETTING_THAT_IS_NEVER_SET")
            .unwrap();
        assert!(value.is_none());
    }
}
