//! HTTP server, lifecycle and graceful shutdown.
//!
//! [`Server::start`] assembles the route table, binds the listener, spawns
//! the accept loop and returns a [`ServerHandle`] straight away. Any startup
//! error (bad path, duplicate route, broken selector) surfaces here, before a
//! single connection is accepted.
//!
//! [`ServerHandle::stop`] is the other half:
//! 1. the listener is dropped, so no new connections are made;
//! 2. every open connection is asked to finish its in-flight request and
//!    close (hyper-util's graceful shutdown);
//! 3. if that takes longer than `shutdown-timeout`, `stop` reports
//!    [`Error::DrainTimeout`].
//!
//! [`Server::serve`] ties both to SIGTERM / Ctrl-C for a plain `main`.
//!
//! Request bodies are buffered up to `body-limit` bytes; a bigger body is
//! answered with `413 Payload Too Large` without reaching the router.
//!
//! Each request is dispatched on its own task. A panicking handler kills only
//! that task; the client gets a `500` and the panic payload is logged.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::Error;
use crate::registry::Registry;
use crate::request::Request;
use crate::response::Response;
use crate::router::{default_error_handler, ErrorHandler, Router};

/// The HTTP server.
pub struct Server {
    config: ServerConfig,
    error_handler: ErrorHandler,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config, error_handler: default_error_handler }
    }

    /// Replaces the translation of request errors into responses.
    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = handler;
        self
    }

    /// Builds the routes from `registry`, binds, and starts accepting
    /// connections in the background.
    pub async fn start(self, registry: Registry) -> Result<ServerHandle, Error> {
        let mut router = registry
            .assemble(&self.config.context_path)
            .inspect_err(|e| error!(error = %e, "route assembly failed"))?;
        router.set_error_handler(self.error_handler);

        let addr = self.config.bind_address();
        let addr: SocketAddr = addr.parse().map_err(|_| Error::Address(addr.clone()))?;
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        info!(
            addr = %local_addr,
            context_path = %self.config.context_path,
            swagger = %self.config.swagger,
            "photon listening"
        );

        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(accept_loop(
            listener,
            Arc::new(router),
            stopped,
            self.config.shutdown_timeout(),
            self.config.body_limit,
        ));

        Ok(ServerHandle { local_addr, stop, task })
    }

    /// Starts, waits for SIGTERM or Ctrl-C, then stops gracefully.
    pub async fn serve(self, registry: Registry) -> Result<(), Error> {
        let handle = self.start(registry).await?;
        shutdown_signal().await;
        handle.stop().await
    }
}

/// A running server.
///
/// Dropping the handle stops the server: the listener closes and open
/// connections drain in the background, with nobody waiting on the result.
/// Keep it alive for as long as the server should run.
#[must_use = "dropping the handle stops the server"]
pub struct ServerHandle {
    local_addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), Error>>,
}

impl ServerHandle {
    /// The bound address; useful with port `0`.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting, drains open connections and waits for the accept
    /// loop to finish.
    pub async fn stop(self) -> Result<(), Error> {
        info!("server is shutting down");
        // A closed channel means the loop already ended; the join reports why.
        let _ = self.stop.send(());
        self.task.await?
    }
}

async fn accept_loop(
    listener: TcpListener,
    router: Arc<Router>,
    mut stop: oneshot::Receiver<()>,
    drain_timeout: Duration,
    body_limit: usize,
) -> Result<(), Error> {
    let builder = ConnBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            // Check shutdown first so a stop request wins over queued accepts.
            biased;

            // Fires on `stop()` and when the handle is dropped.
            _ = &mut stop => {
                info!("shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let router = Arc::clone(&router);
                // Called once per request on the connection.
                let svc = service_fn(move |req| {
                    let router = Arc::clone(&router);
                    async move { Ok::<_, Infallible>(handle(router, req, body_limit).await) }
                });

                let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        debug!(%peer, "connection error: {e}");
                    }
                });
            }
        }
    }

    drop(listener);
    if tokio::time::timeout(drain_timeout, graceful.shutdown()).await.is_err() {
        warn!(timeout = ?drain_timeout, "connections still open after shutdown timeout");
        return Err(Error::DrainTimeout(drain_timeout));
    }

    info!("photon stopped");
    Ok(())
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Buffers the body, dispatches on a fresh task and converts the result.
async fn handle(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
    body_limit: usize,
) -> http::Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, body_limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            warn!(method = %parts.method, path = parts.uri.path(), limit = body_limit, "request body too large");
            return Response::status(StatusCode::PAYLOAD_TOO_LARGE).into_inner();
        }
        Err(e) => {
            warn!("failed to read request body: {e}");
            return Response::status(StatusCode::BAD_REQUEST).into_inner();
        }
    };

    let req = Request::from_parts(parts, body);
    let method = req.method().clone();
    let path = req.path().to_owned();

    let res = match tokio::spawn(async move { router.dispatch(req).await }).await {
        Ok(res) => res,
        Err(e) => recover(e),
    };

    debug!(%method, path, status = res.code().as_u16(), "request");
    res.into_inner()
}

fn recover(err: JoinError) -> Response {
    if err.is_panic() {
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        error!(panic = %message, "handler panicked");
    } else {
        error!("request task cancelled: {err}");
    }
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .text("Internal Server Error")
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM (Kubernetes) or SIGINT (Ctrl-C).
///
/// A signal that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // No SIGTERM outside Unix.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
