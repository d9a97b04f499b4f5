//! # tsu-log
//!
//! Structured access logs for HTTP handlers. One request in, one `tracing`
//! event out.
//!
//! ## The contract
//!
//! Wrap a handler with [`middleware::Logging`] and every request it serves
//! emits exactly one INFO event, `completed handling request`, carrying the
//! status, size, latency and the usual request metadata. The handler's
//! response is untouched: the logging layer sits between the handler and the
//! real [`ResponseWriter`], forwarding every call and only *watching* the
//! status and byte count go by.
//!
//! What the logging layer does not do:
//!
//! - **Sampling or batching**: every request is logged, synchronously
//! - **Metrics**: aggregate the events downstream if you need them
//! - **Formatting**: that is the subscriber's job (`tracing-subscriber`'s
//!   JSON formatter works well)
//!
//! A small hyper-based [`Server`] and [`Router`] are included so wrapped
//! handlers can be served directly.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::io::Write;
//! use tsu_log::middleware::Logging;
//! use tsu_log::{Request, ResponseWriter, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt().json().init();
//!
//!     // After the subscriber: `Logging::new()` binds the current default.
//!     let logging = Logging::new().name("example");
//!
//!     let app = Router::new()
//!         .get("/", logging.wrap(home, "homepage"));
//!
//!     Server::bind("0.0.0.0:8080").unwrap().serve(app).await.unwrap();
//! }
//!
//! fn home(w: &mut dyn ResponseWriter, _req: &Request) {
//!     let _ = w.write_all(b"hello world\n");
//! }
//! ```

mod clock;
mod error;
mod handler;
mod request;
mod router;
mod server;
mod writer;

pub mod middleware;

pub use clock::{Clock, SystemClock};
pub use error::Error;
pub use handler::{BoxedHandler, Handler};
pub use request::Request;
pub use router::Router;
pub use server::Server;
pub use writer::{BufferedWriter, ResponseWriter};
