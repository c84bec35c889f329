//! # Dispatcher Module
//!
//! The dispatch engine: given an abstract request and the route table, find
//! the matching route, apply the ambiguity policy, invoke the producer, and
//! record the interaction.
//!
//! ## Policy
//!
//! Every route's matcher is evaluated against every request:
//!
//! - **zero matches** fail with [`DispatchError::NoRouteMatched`], carrying
//!   the request and the declared route table. The request is answered with a
//!   server error, never a silent default.
//! - **more than one match** fails with
//!   [`DispatchError::AmbiguousRouteMatch`], carrying the declared matcher and
//!   response of every matching entry. The policy is strict by design: the
//!   dispatcher refuses to guess which stub should win, so overlapping test
//!   fixtures are caught early instead of masked by pick-first behavior.
//! - **exactly one match** invokes that entry's producer synchronously. A
//!   producer failure becomes [`DispatchError::Producer`] and propagates.
//!
//! On success the `{request, response}` pair is appended to the matched
//! entry's recording log before the response is returned, for every
//! successfully dispatched request, in request order.

mod core;

pub use self::core::{AmbiguousRoute, DispatchError, Dispatcher};
