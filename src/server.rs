//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()`, so no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.
//!
//! # Handlers run on the blocking pool
//!
//! [`Handler`](crate::Handler)s are synchronous and write into a
//! [`BufferedWriter`]. Each request is handed to `spawn_blocking`, and the
//! buffered response goes back to hyper when the handler returns. A handler
//! that panics yields a `500`.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::request::Request;
use crate::router::Router;
use crate::writer::BufferedWriter;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tsu_log::Server;
    /// let server = Server::bind("0.0.0.0:3000").unwrap();
    /// assert!(Server::bind("not an address").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr: SocketAddr = addr.parse()?;
        Ok(Self { addr })
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops accepting when `signal`
    /// resolves instead of waiting for SIGTERM / Ctrl-C.
    pub async fn serve_with_shutdown<F>(self, router: Router, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.addr).await?;
        run(listener, router, signal).await;
        Ok(())
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

async fn run<F>(listener: TcpListener, router: Router, signal: F)
where
    F: Future<Output = ()>,
{
    let router = Arc::new(router);
    let mut connections = tokio::task::JoinSet::new();

    match listener.local_addr() {
        Ok(addr) => info!(%addr, "tsu listening"),
        Err(e) => warn!("listening on an unknown address: {e}"),
    }

    tokio::pin!(signal);

    loop {
        tokio::select! {
            // Stop accepting as soon as the signal fires, even with a backlog.
            biased;

            () = &mut signal => {
                info!(in_flight = connections.len(), "shutdown signal received, draining connections");
                break;
            }

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(serve_connection(stream, peer, Arc::clone(&router)));
                }
                Err(e) => error!("accept error: {e}"),
            },

            // Reap finished connections so the set stays bounded.
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    while connections.join_next().await.is_some() {}

    info!("tsu stopped");
}

/// Serves every request on one connection, HTTP/1.1 or HTTP/2.
async fn serve_connection(stream: tokio::net::TcpStream, peer: SocketAddr, router: Arc<Router>) {
    let svc = service_fn(move |req| dispatch(Arc::clone(&router), req, peer));

    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), svc)
        .await
    {
        error!(%peer, "connection error: {e}");
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Reads the body, then routes one request and produces one response.
///
/// The error type is [`Infallible`]: failures become 400/404/500 responses so
/// hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(empty(StatusCode::BAD_REQUEST));
        }
    };

    Ok(respond(&router, Request::from_parts(parts, body, remote_addr)).await)
}

async fn respond(router: &Router, mut req: Request) -> http::Response<Full<Bytes>> {
    let Some((handler, params)) = router.lookup(req.method(), req.path()) else {
        return empty(StatusCode::NOT_FOUND);
    };
    req.set_params(params);

    let served = tokio::task::spawn_blocking(move || {
        let mut w = BufferedWriter::new();
        handler.serve(&mut w, &req);
        w
    })
    .await;

    match served {
        Ok(w) => w.into_response(),
        Err(e) => {
            error!("handler failed: {e}");
            empty(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn empty(status: StatusCode) -> http::Response<Full<Bytes>> {
    let mut response = http::Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** (sent by `kubectl` and the
/// Kubernetes control plane) and **SIGINT** (Ctrl-C, for local dev).
/// On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // `pending()` is a future that never resolves; on non-Unix platforms
    // the SIGTERM arm is effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use http::header::CONTENT_TYPE;
    use http::{HeaderValue, Method, Uri};

    use super::*;
    use crate::middleware::Logging;
    use crate::writer::ResponseWriter;

    fn hello(w: &mut dyn ResponseWriter, req: &Request) {
        w.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let _ = write!(w, "hello {}", req.param("name").unwrap_or("nobody"));
    }

    fn boom(_w: &mut dyn ResponseWriter, _req: &Request) {
        panic!("boom");
    }

    async fn body_of(response: http::Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn routes_to_the_handler_with_params() {
        let router = Router::new().get("/hello/{name}", hello);

        let res = respond(&router, Request::new(Method::GET, Uri::from_static("/hello/ada"))).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(body_of(res).await, "hello ada");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let router = Router::new().get("/hello/{name}", hello);

        let res = respond(&router, Request::new(Method::GET, Uri::from_static("/bye"))).await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn panicking_handler_is_500() {
        let router = Router::new().get("/boom", boom);

        let res = respond(&router, Request::new(Method::GET, Uri::from_static("/boom"))).await;

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn logged_route_passes_the_response_through() {
        let logging = Logging::with_logger(tracing::Dispatch::new(
            tracing_subscriber::fmt().with_writer(std::io::sink).finish(),
        ));
        let router = Router::new().get("/hello/{name}", logging.wrap(hello, "hello"));

        let res = respond(&router, Request::new(Method::GET, Uri::from_static("/hello/bob"))).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_of(res).await, "hello bob");
    }

    #[tokio::test]
    async fn serves_until_the_shutdown_signal() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let router = Router::new().get("/hello/{name}", hello);

        let client = async move {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /hello/ada HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            let mut raw = Vec::new();
            stream.read_to_end(&mut raw).await.unwrap();
            let _ = stop.send(());
            String::from_utf8(raw).unwrap()
        };

        let ((), raw) = tokio::join!(
            run(listener, router, async {
                let _ = stopped.await;
            }),
            client,
        );

        assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
        assert!(raw.ends_with("hello ada"), "{raw}");
    }

    #[test]
    fn bind_rejects_bad_addresses() {
        assert!(matches!(Server::bind("localhost"), Err(Error::Addr(_))));
        assert!(Server::bind("127.0.0.1:0").is_ok());
    }
}
