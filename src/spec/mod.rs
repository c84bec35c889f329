//! # Spec Module
//!
//! Declaration layer for stub routes: the abstract request/response model and
//! the polymorphic forms callers use to declare what a route matches and what
//! it returns.
//!
//! ## Overview
//!
//! A route is declared as a pair of specs:
//!
//! - a [`RequestSpec`]: a bare path string, a structured
//!   [`RequestCriteria`], or an arbitrary predicate function, and
//! - a [`ResponseSpec`]: a bare body string, a full [`StubResponse`], or an
//!   arbitrary producer function.
//!
//! Both are normalized exactly once, at registration time, into uniform
//! function-typed forms ([`Matcher`] and [`Producer`]). Request handling never
//! inspects the declared shape again; the dispatcher only ever calls the
//! normalized closures.
//!
//! ## Matching semantics
//!
//! Unset criteria fields are wildcards. A criteria spec matches when all of
//! its present constraints hold:
//!
//! - `path` must equal the actual path exactly, after any `?...` query suffix
//!   is stripped from the actual path (no globs, no regex),
//! - `method` is compared case-insensitively; absent means any method,
//! - `query_params` compares only the keys it names; the actual request may
//!   carry extra, unmentioned parameters and still match.
//!
//! ## JSON declaration forms
//!
//! [`RequestSpec::from_json`] and [`ResponseSpec::from_json`] accept the same
//! shapes as `serde_json` values, for data-driven fixtures. Any other JSON
//! type fails with [`SpecError::UnsupportedSpecType`] at registration time,
//! never during request handling.

mod core;

pub use self::core::{
    parse_query_params, HeaderVec, Matcher, Producer, RequestCriteria, RequestSpec, ResponseSpec,
    SpecError, StubRequest, StubResponse, MAX_INLINE_HEADERS,
};
