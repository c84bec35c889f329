use crate::router::RouteTable;
use crate::spec::{StubRequest, StubResponse};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Diagnostic view of one entry involved in an ambiguous match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousRoute {
    /// Index of the entry in declaration order
    pub index: usize,
    /// Declared matcher of the entry
    pub declared_matcher: String,
    /// Declared response of the entry
    pub declared_response: String,
}

/// Per-request dispatch failure.
///
/// None of these are retried or mapped to a default response; they propagate
/// to the transport layer, which surfaces them as a server error to the
/// connecting client.
#[derive(Debug)]
pub enum DispatchError {
    /// No declared route's matcher accepted the request.
    NoRouteMatched {
        /// The unmatched request
        request: StubRequest,
        /// Declared rendering of the full route table, for diagnostics
        routes: Vec<String>,
    },
    /// Two or more declared routes' matchers accepted the request.
    AmbiguousRouteMatch {
        /// The offending request
        request: StubRequest,
        /// Declared matcher and response of every matching entry
        matches: Vec<AmbiguousRoute>,
    },
    /// The caller-supplied producer function for the matched route failed.
    Producer {
        /// Index of the matched entry
        route_index: usize,
        /// The producer's error
        source: anyhow::Error,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NoRouteMatched { request, routes } => write!(
                f,
                "no route matched {} {}; declared routes: [{}]",
                request.method,
                request.path,
                routes.join("; ")
            ),
            DispatchError::AmbiguousRouteMatch { request, matches } => {
                let listed: Vec<String> = matches
                    .iter()
                    .map(|m| {
                        format!(
                            "#{} {} => {}",
                            m.index, m.declared_matcher, m.declared_response
                        )
                    })
                    .collect();
                write!(
                    f,
                    "request {} {} matched more than one route: [{}]",
                    request.method,
                    request.path,
                    listed.join("; ")
                )
            }
            DispatchError::Producer {
                route_index,
                source,
            } => write!(f, "producer for route #{route_index} failed: {source}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Producer { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Dispatches abstract requests against a fixed route table.
///
/// Cheap to clone and share: matching and producer invocation are read-only
/// over the table, and recording appends go through each entry's own lock.
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
}

impl Dispatcher {
    /// Create a dispatcher over a finished route table.
    #[must_use]
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self { table }
    }

    /// The route table this dispatcher consults.
    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Dispatch a request: find the single matching route, produce its
    /// response, and record the interaction.
    ///
    /// Returns the matched entry's index alongside the response data.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::NoRouteMatched`] if no matcher accepts the request
    /// - [`DispatchError::AmbiguousRouteMatch`] if more than one does
    /// - [`DispatchError::Producer`] if the matched producer fails
    pub fn dispatch(
        &self,
        request: &StubRequest,
    ) -> Result<(usize, StubResponse), DispatchError> {
        let matched = self.table.matching_indices(request);
        let index = match matched.as_slice() {
            [] => {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    route_count = self.table.len(),
                    "No route matched"
                );
                return Err(DispatchError::NoRouteMatched {
                    request: request.clone(),
                    routes: self.table.describe(),
                });
            }
            [index] => *index,
            many => {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    matched = ?many,
                    "Ambiguous route match"
                );
                let matches = many
                    .iter()
                    .map(|&index| {
                        let entry = &self.table.entries()[index];
                        AmbiguousRoute {
                            index,
                            declared_matcher: entry.declared_matcher().to_string(),
                            declared_response: entry.declared_response().to_string(),
                        }
                    })
                    .collect();
                return Err(DispatchError::AmbiguousRouteMatch {
                    request: request.clone(),
                    matches,
                });
            }
        };

        let entry = &self.table.entries()[index];
        let response = entry.produce(request).map_err(|source| {
            error!(
                method = %request.method,
                path = %request.path,
                route_index = index,
                error = %source,
                "Producer failed"
            );
            DispatchError::Producer {
                route_index: index,
                source,
            }
        })?;

        // Record before handing the response back to the transport.
        entry.record(request.clone(), response.clone());
        info!(
            method = %request.method,
            path = %request.path,
            route_index = index,
            status = response.status,
            "Request dispatched"
        );
        Ok((index, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{RequestSpec, ResponseSpec};
    use http::Method;

    #[test]
    fn test_single_match_dispatches_and_records() {
        let table = Arc::new(RouteTable::new(vec![
            (RequestSpec::path("/a"), ResponseSpec::body("one")),
            (RequestSpec::path("/b"), ResponseSpec::body("two")),
        ]));
        let dispatcher = Dispatcher::new(table.clone());
        let (index, response) = dispatcher
            .dispatch(&StubRequest::new(Method::GET, "/b"))
            .expect("dispatch");
        assert_eq!(index, 1);
        assert_eq!(response.body.as_deref(), Some("two"));
        assert_eq!(table.recorded_requests().len(), 1);
    }

    #[test]
    fn test_producer_error_propagates() {
        let table = Arc::new(RouteTable::new(vec![(
            RequestSpec::path("/boom"),
            ResponseSpec::try_producer(|_req| anyhow::bail!("fixture exploded")),
        )]));
        let dispatcher = Dispatcher::new(table.clone());
        let err = dispatcher
            .dispatch(&StubRequest::new(Method::GET, "/boom"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Producer { route_index: 0, .. }));
        // Failed dispatches are never recorded.
        assert!(table.recorded_requests().is_empty());
    }
}
