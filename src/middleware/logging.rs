//! Per-request access logging.
//!
//! ```rust
//! use std::io::Write;
//! use tsu_log::middleware::Logging;
//! use tsu_log::{Request, ResponseWriter, Router};
//!
//! fn home(w: &mut dyn ResponseWriter, _req: &Request) {
//!     let _ = w.write_all(b"hello world\n");
//! }
//!
//! let logging = Logging::new().name("example");
//! let app = Router::new().get("/", logging.wrap(home, "homepage"));
//! ```
//!
//! Every request through a wrapped handler produces exactly one INFO event,
//! message `completed handling request`, with these fields:
//!
//! | Field | Value |
//! |---|---|
//! | `status` | status code the handler set, `200` if it only wrote a body or wrote nothing, `500` if it panicked before either |
//! | `method` | request method |
//! | `request` | request target (path and query), scheme and authority stripped |
//! | `remote` | peer address reported by the transport, `""` if none |
//! | `duration` | latency in microseconds as a float (`nanos / 1000`) |
//! | `size` | body bytes the real writer accepted |
//! | `referer` | `Referer` header, `""` if absent |
//! | `user-agent` | `User-Agent` header, `""` if absent |
//! | `name` | service name, only when set |
//! | `component` | route label given to [`Logging::wrap`], only when non-empty |

use std::borrow::Cow;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use http::{HeaderMap, StatusCode};
use tracing::{Dispatch, info};

use crate::clock::{Clock, SystemClock};
use crate::handler::Handler;
use crate::request::Request;
use crate::writer::ResponseWriter;

// ── Factory ───────────────────────────────────────────────────────────────────

/// Access-log decorator factory.
///
/// Build it once at startup, then [`wrap`](Logging::wrap) as many handlers as
/// you like. All wrapped handlers share one read-only configuration.
#[derive(Clone)]
pub struct Logging {
    config: Arc<Config>,
}

#[derive(Clone)]
struct Config {
    logger: Dispatch,
    name: String,
    clock: Arc<dyn Clock>,
}

impl Logging {
    /// Logs through the dispatcher that is the default *right now*.
    ///
    /// Install your subscriber (e.g. `tracing_subscriber::fmt().init()`)
    /// before calling this. If none is installed the events go nowhere.
    pub fn new() -> Self {
        Self::with_logger(Dispatch::default())
    }

    /// Logs through `logger`, regardless of the thread or global default.
    pub fn with_logger(logger: Dispatch) -> Self {
        Self {
            config: Arc::new(Config {
                logger,
                name: String::new(),
                clock: Arc::new(SystemClock),
            }),
        }
    }

    /// Service name attached to every record as `name`. Empty means omitted.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).name = name.into();
        self
    }

    /// Replaces the time source used to measure latency.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        Arc::make_mut(&mut self.config).clock = Arc::new(clock);
        self
    }

    /// Wraps `handler`, tagging its records with `component`.
    ///
    /// Nothing is validated and nothing is logged at wrap time.
    pub fn wrap<H: Handler>(&self, handler: H, component: impl Into<String>) -> Logged<H> {
        Logged {
            handler,
            component: component.into(),
            config: Arc::clone(&self.config),
        }
    }
}

impl Default for Logging {
    fn default() -> Self { Self::new() }
}

// ── Wrapped handler ───────────────────────────────────────────────────────────

/// A handler wrapped by [`Logging::wrap`].
pub struct Logged<H> {
    handler: H,
    component: String,
    config: Arc<Config>,
}

impl<H: Handler> Handler for Logged<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        let mut writer = LoggingWriter::new(w, req, &self.config, &self.component);
        self.handler.serve(&mut writer, req);
        // `writer` is dropped here and emits the record.
    }
}

// ── Intercepting writer ───────────────────────────────────────────────────────

/// Stands in for the real writer during one request.
///
/// Emits its record on drop, so a handler that unwinds still gets logged
/// with whatever status and size it produced before the panic.
struct LoggingWriter<'a> {
    inner: &'a mut dyn ResponseWriter,
    request: &'a Request,
    config: &'a Config,
    component: &'a str,
    start: Instant,
    status: Option<StatusCode>,
    size: u64,
}

impl<'a> LoggingWriter<'a> {
    fn new(
        inner: &'a mut dyn ResponseWriter,
        request: &'a Request,
        config: &'a Config,
        component: &'a str,
    ) -> Self {
        Self {
            start: config.clock.now(),
            inner,
            request,
            config,
            component,
            status: None,
            size: 0,
        }
    }

    fn emit(&self) {
        let elapsed = self.config.clock.now().saturating_duration_since(self.start);
        let req = self.request;
        let status = match self.status {
            Some(status) => status,
            // Unwinding before anything was sent: the transport answers 500.
            None if std::thread::panicking() => StatusCode::INTERNAL_SERVER_ERROR,
            // A handler that never wrote still produced a 200 on the wire.
            None => StatusCode::OK,
        };
        // HTTP/2 and absolute-form requests carry scheme and authority in the
        // URI; only the origin-form target is logged.
        let target = match req.uri().path_and_query() {
            Some(pq) => Cow::Borrowed(pq.as_str()),
            None => Cow::Owned(req.uri().to_string()),
        };
        let remote = req.remote_addr().map(|addr| addr.to_string()).unwrap_or_default();

        tracing::dispatcher::with_default(&self.config.logger, || {
            info!(
                status = status.as_u16(),
                method = req.method().as_str(),
                request = &*target,
                remote = remote.as_str(),
                duration = elapsed.as_nanos() as f64 / 1000.0,
                size = self.size,
                referer = req.referer(),
                "user-agent" = req.user_agent(),
                name = non_empty(&self.config.name),
                component = non_empty(self.component),
                "completed handling request"
            );
        });
    }
}

impl io::Write for LoggingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The transport commits 200 on a bare write; mirror it before forwarding.
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        let n = self.inner.write(buf)?;
        self.size += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl ResponseWriter for LoggingWriter<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn set_status(&mut self, status: StatusCode) {
        self.inner.set_status(status);
        self.status = Some(status);
    }
}

impl Drop for LoggingWriter<'_> {
    fn drop(&mut self) {
        self.emit();
    }
}

/// `None` records nothing, which drops the field from the event.
fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}
