//! # Server Module
//!
//! The transport boundary: adapts `tiny_http`'s native request into the
//! abstract [`crate::spec::StubRequest`], builds native responses out of
//! [`crate::spec::StubResponse`] data, and owns the [`StubServer`] lifecycle
//! (bind, worker loop, stop).

pub mod http_server;
pub mod request;
pub mod response;

pub use http_server::StubServer;
pub use request::adapt_request;
pub use response::{build_response, status_reason};
