use crate::dispatcher::Dispatcher;
use crate::router::RouteTable;
use crate::runtime_config::RuntimeConfig;
use crate::server::request::adapt_request;
use crate::server::response::{build_response, status_reason};
use crate::spec::{RequestSpec, ResponseSpec, StubRequest, StubResponse};
use anyhow::Context;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// A running stub HTTP server.
///
/// Created by [`StubServer::start`] (or one of its variants), which binds the
/// port, normalizes the declared routes, and launches the worker loop. The
/// route set is fixed for the life of the server; every successfully
/// dispatched request appends to the matched route's recordings, observable
/// through [`StubServer::recorded_requests`] and
/// [`StubServer::recorded_responses`].
///
/// [`StubServer::stop`] consumes the handle and releases the socket; there is
/// no way back to listening. Dropping the handle performs the same shutdown.
pub struct StubServer {
    table: Arc<RouteTable>,
    server: Arc<tiny_http::Server>,
    addr: SocketAddr,
    workers: Vec<JoinHandle<()>>,
}

impl StubServer {
    /// Start a stub server on an OS-assigned free port.
    ///
    /// # Errors
    ///
    /// Fails if no port can be bound or a worker thread cannot be spawned.
    pub fn start(routes: Vec<(RequestSpec, ResponseSpec)>) -> anyhow::Result<Self> {
        Self::start_on(0, routes)
    }

    /// Start a stub server on a caller-specified port (`0` for OS-assigned).
    ///
    /// # Errors
    ///
    /// Fails if the port cannot be bound or a worker thread cannot be spawned.
    pub fn start_on(port: u16, routes: Vec<(RequestSpec, ResponseSpec)>) -> anyhow::Result<Self> {
        Self::start_with(port, move |_base_url| routes)
    }

    /// Start a stub server whose routes are declared by a function of the
    /// server's own base URL. The socket is bound first, so fixtures can
    /// reference the resolved URL (e.g. for `Location` headers or bodies that
    /// link back to the server).
    ///
    /// # Errors
    ///
    /// Fails if the port cannot be bound or a worker thread cannot be spawned.
    pub fn start_with<F>(port: u16, declare: F) -> anyhow::Result<Self>
    where
        F: FnOnce(&str) -> Vec<(RequestSpec, ResponseSpec)>,
    {
        let server = tiny_http::Server::http(("127.0.0.1", port))
            .map_err(|e| anyhow::anyhow!("failed to bind stub server on port {port}: {e}"))?;
        let server = Arc::new(server);
        let addr = server
            .server_addr()
            .to_ip()
            .context("stub server bound to a non-IP address")?;
        let base_url = format!("http://{addr}");
        let table = Arc::new(RouteTable::new(declare(&base_url)));
        Self::serve(server, addr, table)
    }

    /// Start a stub server from JSON-valued route declarations on an
    /// OS-assigned free port.
    ///
    /// # Errors
    ///
    /// An unsupported declaration shape fails here, at registration, with
    /// [`crate::spec::SpecError::UnsupportedSpecType`]; startup is aborted
    /// and nothing is ever served.
    pub fn start_json(routes: &[(Value, Value)]) -> anyhow::Result<Self> {
        let server = tiny_http::Server::http(("127.0.0.1", 0))
            .map_err(|e| anyhow::anyhow!("failed to bind stub server: {e}"))?;
        let server = Arc::new(server);
        let addr = server
            .server_addr()
            .to_ip()
            .context("stub server bound to a non-IP address")?;
        let table = Arc::new(RouteTable::from_json(routes)?);
        Self::serve(server, addr, table)
    }

    fn serve(
        server: Arc<tiny_http::Server>,
        addr: SocketAddr,
        table: Arc<RouteTable>,
    ) -> anyhow::Result<Self> {
        let config = RuntimeConfig::from_env();
        let workers = (0..config.workers)
            .map(|worker_id| {
                let server = Arc::clone(&server);
                let dispatcher = Dispatcher::new(Arc::clone(&table));
                thread::Builder::new()
                    .name(format!("httpstub-worker-{worker_id}"))
                    .spawn(move || {
                        for request in server.incoming_requests() {
                            handle_connection(&dispatcher, request);
                        }
                    })
                    .context("failed to spawn stub server worker")
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        info!(
            %addr,
            routes = table.len(),
            workers = config.workers,
            "Stub server listening"
        );
        Ok(Self {
            table,
            server,
            addr,
            workers,
        })
    }

    /// The externally visible base URL, e.g. `http://127.0.0.1:49152`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The resolved socket address the server is listening on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The resolved port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// The route table the server dispatches against.
    #[must_use]
    pub fn route_table(&self) -> &RouteTable {
        &self.table
    }

    /// All recorded requests across all routes, flattened in
    /// route-declaration order, then within-route recording order.
    #[must_use]
    pub fn recorded_requests(&self) -> Vec<StubRequest> {
        self.table.recorded_requests()
    }

    /// All recorded responses, in the same flattened order as
    /// [`StubServer::recorded_requests`].
    #[must_use]
    pub fn recorded_responses(&self) -> Vec<StubResponse> {
        self.table.recorded_responses()
    }

    /// Stop the server: stop accepting connections, join the workers, and
    /// release the socket. Consumes the handle, so a second stop cannot be
    /// expressed. In-flight requests are not drained.
    pub fn stop(self) {}
}

impl Drop for StubServer {
    fn drop(&mut self) {
        for _ in &self.workers {
            self.server.unblock();
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        info!(addr = %self.addr, "Stub server stopped");
    }
}

/// Serve one connection: adapt, dispatch, write back.
///
/// Dispatch errors are surfaced to the client as a 500 whose body is the
/// error text, so misses and ambiguity stay visible instead of being
/// defaulted away.
fn handle_connection(dispatcher: &Dispatcher, mut raw: tiny_http::Request) {
    let request = match adapt_request(&mut raw) {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Failed to adapt transport request");
            respond_error(raw, 400, &e.to_string());
            return;
        }
    };
    match dispatcher.dispatch(&request) {
        Ok((_index, response)) => match build_response(&response) {
            Ok(native) => {
                debug!(
                    status = response.status,
                    reason = status_reason(response.status),
                    "Writing response"
                );
                if let Err(e) = raw.respond(native) {
                    error!(error = %e, "Failed to write response");
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to build response");
                respond_error(raw, 500, &e.to_string());
            }
        },
        // Already logged by the dispatcher with full context.
        Err(e) => respond_error(raw, 500, &e.to_string()),
    }
}

fn respond_error(raw: tiny_http::Request, status: u16, message: &str) {
    let response = tiny_http::Response::from_string(message).with_status_code(status);
    if let Err(e) = raw.respond(response) {
        error!(error = %e, "Failed to write error response");
    }
}
