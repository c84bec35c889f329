//! # httpstub
//!
//! An embeddable stub HTTP server for test suites: declare the requests you
//! expect and the responses to serve, start the server on a port, point the
//! code under test at its URL, then inspect what was actually received.
//!
//! ## Overview
//!
//! Routes are declared once, before serving, as pairs of a request spec and a
//! response spec. Both sides are polymorphic:
//!
//! - a request spec is a bare path string, a structured
//!   [`RequestCriteria`] (`path` / `method` / `query_params`, unset fields
//!   are wildcards), or an arbitrary predicate function;
//! - a response spec is a bare body string (a 200 OK `text/plain` sugar), a
//!   full [`StubResponse`], or an arbitrary producer function of the request.
//!
//! Declarations are normalized at registration into uniform matcher/producer
//! closures. Every incoming request is evaluated against every route: no
//! match and ambiguous matches are hard per-request errors surfaced to the
//! client as a 500; the stub never guesses which fixture should win, so
//! missing or overlapping stubs show up immediately in test output.
//!
//! Every successfully dispatched `{request, response}` pair is recorded on
//! its route and observable afterward through
//! [`StubServer::recorded_requests`] and [`StubServer::recorded_responses`].
//!
//! ## Architecture
//!
//! - **[`spec`]**: abstract request/response model, declared spec variants,
//!   normalization into matcher/producer functions
//! - **[`router`]**: the ordered route table and its recording logs
//! - **[`dispatcher`]**: match collection, zero/one/many policy, producer
//!   invocation, recording
//! - **[`server`]**: `tiny_http` transport boundary: request adapter,
//!   response builder, and the [`StubServer`] lifecycle
//! - **[`runtime_config`]**: environment-variable runtime tuning
//!
//! ## Example
//!
//! ```rust,no_run
//! use httpstub::{RequestCriteria, RequestSpec, ResponseSpec, StubResponse, StubServer};
//!
//! # fn main() -> anyhow::Result<()> {
//! let server = StubServer::start(vec![
//!     // Bare strings: match on path, answer 200 text/plain.
//!     ("/ping".into(), "pong".into()),
//!     // Structured matcher and full response data.
//!     (
//!         RequestSpec::Criteria(RequestCriteria {
//!             path: Some("/pets".to_string()),
//!             method: Some("POST".to_string()),
//!             ..Default::default()
//!         }),
//!         ResponseSpec::Full(StubResponse::text(201, "created")),
//!     ),
//!     // A producer computes the response from the request.
//!     (
//!         RequestSpec::path("/echo"),
//!         ResponseSpec::producer(|req| StubResponse::text(200, req.path.clone())),
//!     ),
//! ])?;
//!
//! let url = format!("{}/ping", server.base_url());
//! // ... drive the code under test against `url` ...
//!
//! assert_eq!(server.recorded_requests().len(), 0);
//! server.stop();
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod spec;

pub use dispatcher::{AmbiguousRoute, DispatchError, Dispatcher};
pub use router::{Recording, RouteEntry, RouteTable};
pub use runtime_config::RuntimeConfig;
pub use server::StubServer;
pub use spec::{
    HeaderVec, Matcher, Producer, RequestCriteria, RequestSpec, ResponseSpec, SpecError,
    StubRequest, StubResponse,
};
