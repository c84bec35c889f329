use http::Method;
use serde::Deserialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maximum inline response headers before heap allocation.
/// Stub responses rarely declare more than a handful of headers.
pub const MAX_INLINE_HEADERS: usize = 8;

/// Stack-allocated header storage preserving declaration order.
///
/// Headers are kept as a plain ordered list, not a map: duplicate names are
/// legal and are written to the wire as separate entries, in the order they
/// were declared.
pub type HeaderVec = SmallVec<[(String, String); MAX_INLINE_HEADERS]>;

/// Uniform request matcher produced by normalizing a [`RequestSpec`].
pub type Matcher = Arc<dyn Fn(&StubRequest) -> bool + Send + Sync>;

/// Uniform response producer produced by normalizing a [`ResponseSpec`].
///
/// Producers are caller-supplied and may fail; a failure propagates to the
/// dispatcher as a per-request error, never a default response.
pub type Producer = Arc<dyn Fn(&StubRequest) -> anyhow::Result<StubResponse> + Send + Sync>;

/// Abstract HTTP request, adapted from the transport's native representation.
///
/// Immutable once constructed. Header names are lowercased; the query string
/// is split off the path and parsed into `query_params`, where a key with no
/// `=` (or nothing after it) carries `None` rather than an empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct StubRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path with any query-string suffix stripped
    pub path: String,
    /// HTTP headers (lowercase names)
    pub headers: HashMap<String, String>,
    /// Parsed query string parameters; value-less keys map to `None`
    pub query_params: HashMap<String, Option<String>>,
    /// Request body materialized as a mapping (form fields or JSON object)
    pub body: Option<Value>,
    /// Value of the `Content-Type` header, if present
    pub content_type: Option<String>,
}

impl StubRequest {
    /// Build an abstract request from a method and a path that may carry a
    /// query string. Headers and body start empty; tests and predicates can
    /// fill the public fields directly.
    #[must_use]
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let query_params = parse_query_params(path_and_query);
        let path = path_and_query
            .split('?')
            .next()
            .unwrap_or(path_and_query)
            .to_string();
        Self {
            method,
            path,
            headers: HashMap::new(),
            query_params,
            body: None,
            content_type: None,
        }
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter value by name.
    ///
    /// Returns `Some(None)` for a key that is present but value-less.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<Option<&str>> {
        self.query_params
            .get(name)
            .map(|v| v.as_deref())
    }
}

/// Parse query string parameters from a URL path.
///
/// Extracts everything after the `?` character and URL-decodes parameter
/// names and values. A parameter with no `=`, or with nothing after the `=`,
/// is represented with a `None` value.
#[must_use]
pub fn parse_query_params(path_and_query: &str) -> HashMap<String, Option<String>> {
    let mut params = HashMap::new();
    let query_str = match path_and_query.find('?') {
        Some(pos) => &path_and_query[pos + 1..],
        None => return params,
    };
    for pair in query_str.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (raw_key, raw_value) = match pair.split_once('=') {
            Some((k, v)) if !v.is_empty() => (k, Some(v)),
            Some((k, _)) => (k, None),
            None => (pair, None),
        };
        params.insert(decode_component(raw_key), raw_value.map(decode_component));
    }
    params
}

/// URL-decode a single query-string component (`+` and percent escapes).
fn decode_component(raw: &str) -> String {
    // The component is decoded as a lone key, so a literal `=` (legal in
    // values after the first one) must be escaped to survive the parse.
    let escaped = raw.replace('=', "%3D");
    url::form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(k, _)| k.into_owned())
        .unwrap_or_default()
}

/// Structured request matcher: unset fields are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RequestCriteria {
    /// Exact path to match, compared after stripping the actual path's query string
    #[serde(default)]
    pub path: Option<String>,
    /// HTTP method, compared case-insensitively; absent matches any method
    #[serde(default)]
    pub method: Option<String>,
    /// Query parameters to match; keys not named here are ignored
    #[serde(default)]
    pub query_params: Option<HashMap<String, Option<String>>>,
}

impl RequestCriteria {
    /// Evaluate all present constraints against an actual request (logical AND).
    #[must_use]
    pub fn matches(&self, req: &StubRequest) -> bool {
        if let Some(path) = &self.path {
            let actual = req.path.split('?').next().unwrap_or(&req.path);
            if actual != path {
                return false;
            }
        }
        if let Some(method) = &self.method {
            if !req.method.as_str().eq_ignore_ascii_case(method) {
                return false;
            }
        }
        if let Some(expected) = &self.query_params {
            // Filtering the actual params down to the expected key set and
            // comparing for equality collapses to: every expected key is
            // present with an equal value. Unmentioned keys never participate.
            if !expected
                .iter()
                .all(|(k, v)| req.query_params.get(k) == Some(v))
            {
                return false;
            }
        }
        true
    }
}

/// Declared form of a route's request matcher.
///
/// Either a bare path string (sugar for a path-only [`RequestCriteria`]), a
/// structured criteria map, or an arbitrary predicate over the abstract
/// request.
#[derive(Clone)]
pub enum RequestSpec {
    /// Match on exact path only
    Path(String),
    /// Match on structured criteria
    Criteria(RequestCriteria),
    /// Arbitrary caller-supplied predicate, passed through unchanged
    Predicate(Matcher),
}

impl RequestSpec {
    /// Path-only matcher sugar.
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Wrap a caller-supplied predicate function.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&StubRequest) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Build a request spec from a JSON value: a string is path sugar, an
    /// object is structured criteria.
    ///
    /// # Errors
    ///
    /// Any other JSON type fails with [`SpecError::UnsupportedSpecType`]
    /// naming the observed type. This is a registration-time error.
    pub fn from_json(value: &Value) -> Result<Self, SpecError> {
        match value {
            Value::String(path) => Ok(Self::Path(path.clone())),
            Value::Object(_) => serde_json::from_value::<RequestCriteria>(value.clone())
                .map(Self::Criteria)
                .map_err(|e| SpecError::UnsupportedSpecType {
                    context: "request spec",
                    found: format!("object ({e})"),
                }),
            other => Err(SpecError::UnsupportedSpecType {
                context: "request spec",
                found: json_type_name(other).to_string(),
            }),
        }
    }

    /// Normalize the declared form into a uniform matcher function.
    ///
    /// Raw predicates are returned unchanged; the other forms wrap
    /// [`RequestCriteria::matches`].
    #[must_use]
    pub fn normalize(self) -> Matcher {
        match self {
            Self::Path(path) => {
                let criteria = RequestCriteria {
                    path: Some(path),
                    ..Default::default()
                };
                Arc::new(move |req| criteria.matches(req))
            }
            Self::Criteria(criteria) => Arc::new(move |req| criteria.matches(req)),
            Self::Predicate(f) => f,
        }
    }
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Self::Criteria(c) => f.debug_tuple("Criteria").field(c).finish(),
            Self::Predicate(_) => f.write_str("Predicate(<fn>)"),
        }
    }
}

impl From<&str> for RequestSpec {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for RequestSpec {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<RequestCriteria> for RequestSpec {
    fn from(criteria: RequestCriteria) -> Self {
        Self::Criteria(criteria)
    }
}

/// Concrete response data returned by a matched route.
#[derive(Debug, Clone, PartialEq)]
pub struct StubResponse {
    /// HTTP status code; arbitrary numeric codes are allowed
    pub status: u16,
    /// Response headers in declaration order, duplicates preserved
    pub headers: HeaderVec,
    /// Fixed-length response body
    pub body: Option<String>,
    /// Content type applied to the response entity
    pub content_type: Option<String>,
}

impl StubResponse {
    /// Create an empty response with the given status.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: None,
            content_type: None,
        }
    }

    /// Create a `text/plain` response with the given status and body.
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: Some(body.into()),
            content_type: Some("text/plain".to_string()),
        }
    }
}

/// Declared form of a route's response.
///
/// Either a bare body string (sugar for a 200 OK `text/plain` response), full
/// response data, or an arbitrary producer function of the request.
#[derive(Clone)]
pub enum ResponseSpec {
    /// 200 OK `text/plain` sugar
    Body(String),
    /// Full response data, returned as-is on every match
    Full(StubResponse),
    /// Arbitrary caller-supplied producer, passed through unchanged
    Producer(Producer),
}

impl ResponseSpec {
    /// Body-string sugar for a 200 OK `text/plain` response.
    pub fn body(body: impl Into<String>) -> Self {
        Self::Body(body.into())
    }

    /// Wrap an infallible caller-supplied producer function.
    pub fn producer<F>(f: F) -> Self
    where
        F: Fn(&StubRequest) -> StubResponse + Send + Sync + 'static,
    {
        Self::Producer(Arc::new(move |req| Ok(f(req))))
    }

    /// Wrap a fallible caller-supplied producer function. A returned error
    /// fails the dispatch of the matching request.
    pub fn try_producer<F>(f: F) -> Self
    where
        F: Fn(&StubRequest) -> anyhow::Result<StubResponse> + Send + Sync + 'static,
    {
        Self::Producer(Arc::new(f))
    }

    /// Build a response spec from a JSON value: a string is body sugar, an
    /// object is full response data (`status` required, `headers`, `body` and
    /// `content_type` optional).
    ///
    /// # Errors
    ///
    /// Any other JSON type, or an object without a numeric `status`, fails
    /// with [`SpecError::UnsupportedSpecType`] at registration time.
    pub fn from_json(value: &Value) -> Result<Self, SpecError> {
        match value {
            Value::String(body) => Ok(Self::Body(body.clone())),
            Value::Object(map) => {
                let status = map
                    .get("status")
                    .and_then(Value::as_u64)
                    .and_then(|s| u16::try_from(s).ok())
                    .ok_or(SpecError::UnsupportedSpecType {
                        context: "response spec",
                        found: "object without a numeric \"status\"".to_string(),
                    })?;
                let mut headers = HeaderVec::new();
                if let Some(declared) = map.get("headers") {
                    let fields = declared.as_object().ok_or_else(|| {
                        SpecError::UnsupportedSpecType {
                            context: "response spec",
                            found: format!("\"headers\" of type {}", json_type_name(declared)),
                        }
                    })?;
                    for (name, v) in fields {
                        let value = v.as_str().ok_or_else(|| SpecError::UnsupportedSpecType {
                            context: "response spec",
                            found: format!("header value of type {}", json_type_name(v)),
                        })?;
                        headers.push((name.clone(), value.to_string()));
                    }
                }
                let body = match map.get("body") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => {
                        return Err(SpecError::UnsupportedSpecType {
                            context: "response spec",
                            found: format!("\"body\" of type {}", json_type_name(other)),
                        })
                    }
                };
                let content_type = map
                    .get("content_type")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(Self::Full(StubResponse {
                    status,
                    headers,
                    body,
                    content_type,
                }))
            }
            other => Err(SpecError::UnsupportedSpecType {
                context: "response spec",
                found: json_type_name(other).to_string(),
            }),
        }
    }

    /// Normalize the declared form into a uniform producer function.
    #[must_use]
    pub fn normalize(self) -> Producer {
        match self {
            Self::Body(body) => {
                let response = StubResponse::text(200, body);
                Arc::new(move |_req| Ok(response.clone()))
            }
            Self::Full(response) => Arc::new(move |_req| Ok(response.clone())),
            Self::Producer(f) => f,
        }
    }
}

impl fmt::Debug for ResponseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body(b) => f.debug_tuple("Body").field(b).finish(),
            Self::Full(r) => f.debug_tuple("Full").field(r).finish(),
            Self::Producer(_) => f.write_str("Producer(<fn>)"),
        }
    }
}

impl From<&str> for ResponseSpec {
    fn from(body: &str) -> Self {
        Self::Body(body.to_string())
    }
}

impl From<String> for ResponseSpec {
    fn from(body: String) -> Self {
        Self::Body(body)
    }
}

impl From<StubResponse> for ResponseSpec {
    fn from(response: StubResponse) -> Self {
        Self::Full(response)
    }
}

/// Configuration-time declaration error.
///
/// Raised while registering routes, never during request handling; fatal to
/// server startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// The declared request or response value is not one of the supported shapes.
    UnsupportedSpecType {
        /// Which declaration side was malformed (`request spec` / `response spec`)
        context: &'static str,
        /// Observed type (or shape detail) of the offending value
        found: String,
    },
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::UnsupportedSpecType { context, found } => write!(
                f,
                "unsupported {context} type: expected a string, an object, or a function, found {found}"
            ),
        }
    }
}

impl std::error::Error for SpecError {}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
