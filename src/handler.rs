//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! The router needs to hold handlers of *different* types in a single
//! `HashMap<Method, Tree>`. Rust collections can only hold one concrete type,
//! so handlers are stored as **trait objects** (`Arc<dyn Handler>`).
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! fn hello(w: &mut dyn ResponseWriter, req: &Request) { … }  ← user writes this
//!        ↓ router.get("/", hello)
//! Arc::new(hello)                                  ← Handler blanket impl
//!        ↓  stored as BoxedHandler = Arc<dyn Handler>
//! handler.serve(&mut writer, &req)  at request time ← one vtable dispatch
//! ```
//!
//! Decorators such as [`Logged`](crate::middleware::Logged) implement
//! [`Handler`] themselves, so a wrapped handler registers exactly like a bare
//! one.

use std::sync::Arc;

use crate::request::Request;
use crate::writer::ResponseWriter;

/// A heap-allocated, type-erased handler shared across concurrent requests.
///
/// `Arc` gives cheap, thread-safe shared ownership (one atomic reference
/// count increment per request) without copying the handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Request-processing logic.
///
/// Automatically implemented for any function or closure with the signature:
///
/// ```text
/// fn name(w: &mut dyn ResponseWriter, req: &Request)
/// ```
///
/// Implement it by hand for handlers that carry state.
///
/// Handlers are synchronous. The server runs them on tokio's blocking pool,
/// so blocking I/O inside a handler does not stall the accept loop.
pub trait Handler: Send + Sync + 'static {
    /// Handles one request, writing the response into `w`.
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request);
}

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseWriter, &Request) + Send + Sync + 'static,
{
    fn serve(&self, w: &mut dyn ResponseWriter, req: &Request) {
        self(w, req)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use http::{Method, StatusCode, Uri};

    use super::*;
    use crate::writer::BufferedWriter;

    fn teapot(w: &mut dyn ResponseWriter, _req: &Request) {
        w.set_status(StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn named_functions_are_handlers() {
        let handler: BoxedHandler = Arc::new(teapot);
        let mut w = BufferedWriter::new();

        handler.serve(&mut w, &Request::new(Method::GET, Uri::from_static("/")));

        assert_eq!(w.status(), Some(StatusCode::IM_A_TEAPOT));
    }

    #[test]
    fn closures_are_handlers() {
        let greeting = String::from("hi");
        let handler: BoxedHandler = Arc::new(move |w: &mut dyn ResponseWriter, req: &Request| {
            let _ = write!(w, "{greeting} {}", req.path());
        });
        let mut w = BufferedWriter::new();

        handler.serve(&mut w, &Request::new(Method::GET, Uri::from_static("/there")));

        assert_eq!(w.body(), b"hi /there");
    }
}
