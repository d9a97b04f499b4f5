//! The response-writer capability and the server's buffering implementation.
//!
//! A handler does not return a response value. It is handed a
//! [`ResponseWriter`] and streams into it: headers first, then an optional
//! status, then body bytes. Anything that implements the trait can sit
//! between the handler and the transport, which is how
//! [`middleware::Logging`](crate::middleware::Logging) observes a response
//! without buffering or copying it.

use std::io;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use tracing::warn;

/// Sink for an outgoing HTTP response.
///
/// The body is written through the [`io::Write`] supertrait, so `write!`,
/// `write_all` and friends work as expected.
///
/// Transport semantics, which implementations are expected to follow:
///
/// - Header changes only take effect until the response is *committed*.
/// - The first [`set_status`](ResponseWriter::set_status) call, or the first
///   body write, commits the response.
/// - A body write on an uncommitted response commits it with `200 OK`.
pub trait ResponseWriter: io::Write {
    /// The header map that will be sent with the response.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sets the response status and commits the headers.
    fn set_status(&mut self, status: StatusCode);
}

/// The server's [`ResponseWriter`]: collects the whole response in memory
/// and hands it to hyper once the handler returns.
#[derive(Debug, Default)]
pub struct BufferedWriter {
    headers: HeaderMap,
    committed: Option<(StatusCode, HeaderMap)>,
    body: Vec<u8>,
}

impl BufferedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The committed status, or `None` if the handler has neither set a
    /// status nor written anything yet.
    pub fn status(&self) -> Option<StatusCode> {
        self.committed.as_ref().map(|(status, _)| *status)
    }

    /// The headers as they will be sent.
    pub fn headers(&self) -> &HeaderMap {
        match &self.committed {
            Some((_, headers)) => headers,
            None => &self.headers,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Converts the buffered response into a hyper response.
    ///
    /// A handler that never committed gets an empty `200 OK`.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let (status, headers) = self.committed.unwrap_or((StatusCode::OK, self.headers));
        let mut response = http::Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }

    fn commit(&mut self, status: StatusCode) {
        let headers = std::mem::take(&mut self.headers);
        self.committed = Some((status, headers));
    }
}

impl io::Write for BufferedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.committed.is_none() {
            self.commit(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseWriter for BufferedWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        // After commit the handler gets the (now detached) scratch map, so
        // late changes are silently dropped like on a real wire.
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        if let Some((current, _)) = &self.committed {
            warn!(current = current.as_u16(), ignored = status.as_u16(), "superfluous set_status call");
            return;
        }
        self.commit(status);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use http::HeaderValue;
    use http::header::{CONTENT_TYPE, LOCATION};

    use super::*;

    #[test]
    fn first_write_commits_200() {
        let mut w = BufferedWriter::new();
        assert_eq!(w.status(), None);

        w.write_all(b"hello").unwrap();

        assert_eq!(w.status(), Some(StatusCode::OK));
        assert_eq!(w.body(), b"hello");
    }

    #[test]
    fn second_status_is_ignored() {
        let mut w = BufferedWriter::new();
        w.set_status(StatusCode::CREATED);
        w.set_status(StatusCode::NOT_FOUND);

        assert_eq!(w.status(), Some(StatusCode::CREATED));
    }

    #[test]
    fn headers_after_commit_are_dropped() {
        let mut w = BufferedWriter::new();
        w.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        w.set_status(StatusCode::FOUND);
        w.headers_mut().insert(LOCATION, HeaderValue::from_static("/elsewhere"));

        let res = w.into_response();
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(res.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
        assert!(res.headers().get(LOCATION).is_none());
    }

    #[test]
    fn uncommitted_response_is_empty_ok() {
        let mut w = BufferedWriter::new();
        w.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        let res = w.into_response();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
    }
}
