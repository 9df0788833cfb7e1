//! Mock implementations for testing.
//!
//! Stand-ins for the transport and both signer generations, so handlers can
//! be exercised without network access or a real signing library.

mod signer;
mod transport;

pub use signer::{
    LegacyCall, MockLegacyLibrary, MockLegacySigner, MockModernLibrary, MockModernSigner,
};
pub use transport::{MockResponse, MockTransport};

use crate::types::Request;

/// Test fixtures for handler requests.
pub struct TestFixtures;

impl TestFixtures {
    /// A secure GET for `s3://mybucket/data/file.json?v=2`.
    pub fn sample_request() -> Request {
        Request::get("s3://mybucket/data/file.json?v=2")
            .expect("fixture URL is valid")
            .with_secure(true)
    }

    /// A request carrying a multi-valued header and a body.
    pub fn multi_header_request() -> Request {
        Request::get("s3://mybucket/data/file.json")
            .expect("fixture URL is valid")
            .with_header("X-Foo", "a")
            .with_header("X-Foo", "b")
            .with_body("payload")
            .with_secure(true)
    }
}
