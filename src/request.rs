//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, Uri};

/// An incoming HTTP request, as handed to a [`Handler`](crate::Handler).
///
/// The server builds one per request. Other transports (and tests) can build
/// their own with [`Request::new`] and the `with_*` methods:
///
/// ```rust
/// use tsu_log::Request;
/// use http::Method;
///
/// let req = Request::new(Method::GET, "/search?q=rust".parse().unwrap())
///     .with_header(http::header::USER_AGENT, "curl/8.0".parse().unwrap())
///     .with_remote_addr("10.0.0.7:51234".parse().unwrap());
///
/// assert_eq!(req.user_agent(), "curl/8.0");
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) remote_addr: Option<SocketAddr>,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            remote_addr: None,
            body: Bytes::new(),
            params: HashMap::new(),
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes, remote_addr: SocketAddr) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            remote_addr: Some(remote_addr),
            body,
            params: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The peer address reported by the transport, if it reported one.
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Header lookup. Values that are not visible ASCII are treated as absent.
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Referer` header, or `""` when absent.
    pub fn referer(&self) -> &str {
        self.header(http::header::REFERER).unwrap_or("")
    }

    /// The `User-Agent` header, or `""` when absent.
    pub fn user_agent(&self) -> &str {
        self.header(http::header::USER_AGENT).unwrap_or("")
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{REFERER, USER_AGENT};

    #[test]
    fn missing_referer_and_user_agent_are_empty() {
        let req = Request::new(Method::GET, Uri::from_static("/"));
        assert_eq!(req.referer(), "");
        assert_eq!(req.user_agent(), "");
        assert_eq!(req.remote_addr(), None);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = Request::new(Method::GET, Uri::from_static("/"))
            .with_header(REFERER, HeaderValue::from_static("https://example.com/"))
            .with_header(USER_AGENT, HeaderValue::from_static("test-agent/1.0"));

        assert_eq!(req.header("referer"), Some("https://example.com/"));
        assert_eq!(req.header("User-Agent"), Some("test-agent/1.0"));
        assert_eq!(req.referer(), "https://example.com/");
        assert_eq!(req.user_agent(), "test-agent/1.0");
    }

    #[test]
    fn uri_keeps_the_query() {
        let req = Request::new(Method::GET, Uri::from_static("/search?q=a%20b"));
        assert_eq!(req.path(), "/search");
        assert_eq!(req.uri().to_string(), "/search?q=a%20b");
    }
}
