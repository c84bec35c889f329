use crate::spec::{
    Matcher, Producer, RequestSpec, ResponseSpec, SpecError, StubRequest, StubResponse,
};
use serde_json::Value;
use std::sync::Mutex;
use tracing::{debug, info};

/// A recorded `{request, response}` pair, the observable side effect of a
/// successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    /// The abstract request that matched the route
    pub request: StubRequest,
    /// The response data the route produced for it
    pub response: StubResponse,
}

/// One declared route: a normalized matcher and producer, the declared forms
/// kept for diagnostics, and an append-only recording log.
pub struct RouteEntry {
    matcher: Matcher,
    producer: Producer,
    declared_matcher: String,
    declared_response: String,
    recordings: Mutex<Vec<Recording>>,
}

impl RouteEntry {
    /// Normalize a declared request/response pair into a route entry.
    ///
    /// The declared forms are rendered to strings first so that miss and
    /// ambiguity errors can show what was registered, not just an opaque
    /// closure.
    #[must_use]
    pub fn new(request: RequestSpec, response: ResponseSpec) -> Self {
        let declared_matcher = format!("{request:?}");
        let declared_response = format!("{response:?}");
        Self {
            matcher: request.normalize(),
            producer: response.normalize(),
            declared_matcher,
            declared_response,
            recordings: Mutex::new(Vec::new()),
        }
    }

    /// Evaluate this entry's matcher against a request.
    #[must_use]
    pub fn matches(&self, request: &StubRequest) -> bool {
        (self.matcher)(request)
    }

    /// Invoke this entry's producer for a matched request.
    ///
    /// Runs synchronously on the handling path; the producer is
    /// caller-supplied and is not sandboxed.
    ///
    /// # Errors
    ///
    /// Propagates whatever error the caller-supplied producer returned.
    pub fn produce(&self, request: &StubRequest) -> anyhow::Result<StubResponse> {
        (self.producer)(request)
    }

    /// Diagnostic rendering of the declared matcher.
    #[must_use]
    pub fn declared_matcher(&self) -> &str {
        &self.declared_matcher
    }

    /// Diagnostic rendering of the declared response.
    #[must_use]
    pub fn declared_response(&self) -> &str {
        &self.declared_response
    }

    /// Append a recording to this entry's log.
    ///
    /// Appends happen under the entry's own mutex: concurrent requests racing
    /// on the same route serialize only here, never across the table.
    pub fn record(&self, request: StubRequest, response: StubResponse) {
        let mut recordings = self
            .recordings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        recordings.push(Recording { request, response });
    }

    /// Snapshot of this entry's recordings, in recording order.
    #[must_use]
    pub fn recordings(&self) -> Vec<Recording> {
        self.recordings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("matcher", &self.declared_matcher)
            .field("response", &self.declared_response)
            .finish()
    }
}

/// Ordered registry of route entries, fixed after construction.
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Build a table from declared route pairs, normalizing each declaration.
    #[must_use]
    pub fn new(routes: Vec<(RequestSpec, ResponseSpec)>) -> Self {
        let entries: Vec<RouteEntry> = routes
            .into_iter()
            .map(|(request, response)| RouteEntry::new(request, response))
            .collect();
        info!(route_count = entries.len(), "Route table built");
        Self { entries }
    }

    /// Build a table from JSON-valued declarations.
    ///
    /// # Errors
    ///
    /// Fails with [`SpecError::UnsupportedSpecType`] if any declared value is
    /// not one of the supported shapes. This is the configuration-time error
    /// path; it fires here, during registration, and is fatal to startup.
    pub fn from_json(routes: &[(Value, Value)]) -> Result<Self, SpecError> {
        let mut pairs = Vec::with_capacity(routes.len());
        for (request, response) in routes {
            pairs.push((
                RequestSpec::from_json(request)?,
                ResponseSpec::from_json(response)?,
            ));
        }
        Ok(Self::new(pairs))
    }

    /// Number of declared routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The route entries, in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Indices of every entry whose matcher accepts the request, in
    /// declaration order. The dispatcher's zero/one/many policy is decided on
    /// top of this.
    #[must_use]
    pub fn matching_indices(&self, request: &StubRequest) -> Vec<usize> {
        let matched: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.matches(request))
            .map(|(idx, _)| idx)
            .collect();
        debug!(
            method = %request.method,
            path = %request.path,
            matched = ?matched,
            route_count = self.entries.len(),
            "Route match evaluated"
        );
        matched
    }

    /// Diagnostic renderings of every declared route, in declaration order.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| {
                format!(
                    "{} => {}",
                    entry.declared_matcher(),
                    entry.declared_response()
                )
            })
            .collect()
    }

    /// All recorded requests across all routes, flattened in
    /// route-declaration order, then within-route recording order.
    #[must_use]
    pub fn recorded_requests(&self) -> Vec<StubRequest> {
        self.entries
            .iter()
            .flat_map(|entry| entry.recordings().into_iter().map(|r| r.request))
            .collect()
    }

    /// All recorded responses across all routes, in the same flattened order
    /// as [`RouteTable::recorded_requests`].
    #[must_use]
    pub fn recorded_responses(&self) -> Vec<StubResponse> {
        self.entries
            .iter()
            .flat_map(|entry| entry.recordings().into_iter().map(|r| r.response))
            .collect()
    }
}
