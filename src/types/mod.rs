//! Types shared across the handler.

mod headers;
mod request;

pub use headers::Headers;
pub use request::{PendingRequest, Request, RequestMeta};
