//! Object-store URL translation.
//!
//! An object-store URL keeps the bucket in the host position
//! (`s3://bucket/key?query`). On the wire the request goes to the
//! virtual-hosted endpoint (`https://bucket.host/key?query`), while signers
//! canonicalize against the path-style form (`https://host/bucket/key?query`).
//! Both forms are computed together and kept separate.

use crate::config::DEFAULT_STORAGE_HOST;
use crate::error::{S3Error, TranslationError};
use percent_encoding::percent_decode_str;
use url::Url;

/// URL scheme handled by the translator.
pub const OBJECT_STORE_SCHEME: &str = "s3";

/// Bucket, key and query of an object-store URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectAddress {
    /// Bucket name, never empty.
    pub bucket: String,
    /// Percent-decoded key without its leading slash; empty for the bucket root.
    pub key: String,
    /// Percent-decoded query string, if any.
    pub query: Option<String>,
}

/// Result of translating one request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedUrls {
    /// Decoded address.
    pub address: ObjectAddress,
    /// URL the request is sent to.
    pub virtual_hosted: Url,
    /// URL the modern signer canonicalizes against.
    pub path_style: Url,
}

/// Maps object-store URLs onto a storage host.
#[derive(Debug, Clone)]
pub struct UrlTranslator {
    storage_host: String,
}

impl Default for UrlTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_HOST)
    }
}

impl UrlTranslator {
    /// Create a translator for the given storage host.
    pub fn new(storage_host: impl Into<String>) -> Self {
        Self {
            storage_host: storage_host.into(),
        }
    }

    /// The storage host URLs are built against.
    pub fn storage_host(&self) -> &str {
        &self.storage_host
    }

    /// Translate an object-store URL.
    pub fn translate(&self, url: &Url, secure: bool) -> Result<TranslatedUrls, S3Error> {
        if url.scheme() != OBJECT_STORE_SCHEME {
            return Err(TranslationError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
            }
            .into());
        }

        let bucket = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| TranslationError::MissingBucket {
                url: url.to_string(),
            })?;

        let scheme = if secure { "https" } else { "http" };
        let path = match url.path() {
            "" => "/",
            path => path,
        };
        let path_and_query = match url.query() {
            Some(query) => format!("{}?{}", path, query),
            None => path.to_string(),
        };

        let virtual_hosted = parse(format!(
            "{}://{}.{}{}",
            scheme, bucket, self.storage_host, path_and_query
        ))?;
        let path_style = parse(format!(
            "{}://{}/{}{}",
            scheme, self.storage_host, bucket, path_and_query
        ))?;

        let key = path.strip_prefix('/').unwrap_or(path);
        let address = ObjectAddress {
            bucket: bucket.to_string(),
            key: percent_decode_str(key).decode_utf8_lossy().into_owned(),
            query: url
                .query()
                .map(|q| percent_decode_str(q).decode_utf8_lossy().into_owned()),
        };

        Ok(TranslatedUrls {
            address,
            virtual_hosted,
            path_style,
        })
    }
}

fn parse(url: String) -> Result<Url, S3Error> {
    Url::parse(&url).map_err(|e| {
        S3Error::Translation(TranslationError::InvalidUrl {
            url,
            details: e.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(url: &str, secure: bool) -> Result<TranslatedUrls, S3Error> {
        UrlTranslator::default().translate(&Url::parse(url).unwrap(), secure)
    }

    #[test]
    fn test_secure_with_query() {
        let urls = translate("s3://mybucket/data/file.json?v=2", true).unwrap();

        assert_eq!(
            urls.virtual_hosted.as_str(),
            "https://mybucket.s3.amazonaws.com/data/file.json?v=2"
        );
        assert_eq!(
            urls.path_style.as_str(),
            "https://s3.amazonaws.com/mybucket/data/file.json?v=2"
        );
        assert_eq!(urls.address.bucket, "mybucket");
        assert_eq!(urls.address.key, "data/file.json");
        assert_eq!(urls.address.query.as_deref(), Some("v=2"));
    }

    #[test]
    fn test_insecure_without_query() {
        let urls = translate("s3://mybucket/file.txt", false).unwrap();

        assert_eq!(
            urls.virtual_hosted.as_str(),
            "http://mybucket.s3.amazonaws.com/file.txt"
        );
        assert_eq!(
            urls.path_style.as_str(),
            "http://s3.amazonaws.com/mybucket/file.txt"
        );
        assert!(urls.address.query.is_none());
    }

    #[test]
    fn test_empty_path_is_root() {
        let urls = translate("s3://mybucket", true).unwrap();

        assert_eq!(urls.virtual_hosted.as_str(), "https://mybucket.s3.amazonaws.com/");
        assert_eq!(urls.path_style.as_str(), "https://s3.amazonaws.com/mybucket/");
        assert_eq!(urls.address.key, "");

        let with_slash = translate("s3://mybucket/", true).unwrap();
        assert_eq!(with_slash, urls);
    }

    #[test]
    fn test_root_with_query() {
        let urls = translate("s3://mybucket?prefix=logs/", true).unwrap();

        assert_eq!(
            urls.virtual_hosted.as_str(),
            "https://mybucket.s3.amazonaws.com/?prefix=logs/"
        );
        assert_eq!(
            urls.path_style.as_str(),
            "https://s3.amazonaws.com/mybucket/?prefix=logs/"
        );
    }

    #[test]
    fn test_escaped_key_and_query_are_decoded() {
        let urls = translate("s3://mybucket/my%20file.txt?response-content-type=text%2Fplain", true)
            .unwrap();

        assert_eq!(urls.address.key, "my file.txt");
        assert_eq!(
            urls.address.query.as_deref(),
            Some("response-content-type=text/plain")
        );
        // Wire URLs keep the original escaping.
        assert_eq!(
            urls.virtual_hosted.as_str(),
            "https://mybucket.s3.amazonaws.com/my%20file.txt?response-content-type=text%2Fplain"
        );
    }

    #[test]
    fn test_custom_storage_host() {
        let translator = UrlTranslator::new("objects.example.com");
        let url = Url::parse("s3://archive/2024/report.csv").unwrap();
        let urls = translator.translate(&url, true).unwrap();

        assert_eq!(
            urls.virtual_hosted.as_str(),
            "https://archive.objects.example.com/2024/report.csv"
        );
        assert_eq!(
            urls.path_style.as_str(),
            "https://objects.example.com/archive/2024/report.csv"
        );
    }

    #[test]
    fn test_deterministic() {
        let first = translate("s3://mybucket/a/b?c=d", true).unwrap();
        let second = translate("s3://mybucket/a/b?c=d", true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_bucket() {
        let result = translate("s3:///key.txt", true);
        assert!(matches!(
            result,
            Err(S3Error::Translation(TranslationError::MissingBucket { .. }))
        ));

        let result = translate("s3:key.txt", true);
        assert!(matches!(
            result,
            Err(S3Error::Translation(TranslationError::MissingBucket { .. }))
        ));
    }

    #[test]
    fn test_wrong_scheme() {
        let result = translate("https://mybucket/key.txt", true);
        assert!(matches!(
            result,
            Err(S3Error::Translation(TranslationError::UnsupportedScheme { .. }))
        ));
    }
}
