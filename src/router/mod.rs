//! # Router Module
//!
//! The ordered route table a stub server dispatches against.
//!
//! ## Overview
//!
//! A [`RouteTable`] is built once, before the server starts serving, from a
//! list of declared `(RequestSpec, ResponseSpec)` pairs. Construction
//! normalizes every declaration into its matcher/producer form and captures a
//! diagnostic rendering of the original declaration for error messages.
//!
//! The set of entries is fixed for the life of the table; only each entry's
//! recording log grows. Entry order has no effect on matching semantics,
//! since the dispatcher always evaluates every matcher, but declaration order
//! is preserved for diagnostics and for the flattened recording accessors.
//!
//! ## Concurrency
//!
//! Matching is read-only and needs no locking. Each entry owns its own
//! mutex-protected recording log, so concurrent requests matching different
//! routes never contend, and requests racing on the same route contend only
//! on that route's append.

mod core;

pub use self::core::{Recording, RouteEntry, RouteTable};
