use crate::params::Params;
use std::any::Any;
use std::sync::Arc;

/// Preprocessed request description handed to the router by the host server.
///
/// `path` is the decoded path; `raw_path` carries the still-encoded form
/// when the host has one (used only in `UseRawPath` mode). The router never
/// reads headers or bodies.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// HTTP method token, e.g. `GET`.
    pub method: &'a str,
    /// Decoded request path.
    pub path: &'a str,
    /// Encoded (escaped) request path, if the wire form differed.
    pub raw_path: Option<&'a str>,
    /// Host header value, if host-based routing should apply.
    pub host: Option<&'a str>,
    /// Client address, used by logging middleware.
    pub remote_addr: Option<&'a str>,
}

impl<'a> Request<'a> {
    /// Creates a request with just a method and decoded path.
    pub fn new(method: &'a str, path: &'a str) -> Self {
        Self {
            method,
            path,
            raw_path: None,
            host: None,
            remote_addr: None,
        }
    }

    /// Attach the encoded wire form of the path.
    pub fn with_raw_path(mut self, raw: &'a str) -> Self {
        self.raw_path = Some(raw);
        self
    }

    /// Attach the Host header value.
    pub fn with_host(mut self, host: &'a str) -> Self {
        self.host = Some(host);
        self
    }

    /// Attach the client address.
    pub fn with_remote_addr(mut self, addr: &'a str) -> Self {
        self.remote_addr = Some(addr);
        self
    }
}

/// Response capability the host server passes into dispatch.
///
/// Middleware may wrap a writer freely; the read-back accessors are part of
/// the trait, so wrappers forward them instead of implementing an unwrap
/// protocol.
pub trait ResponseWriter {
    /// Set the response status code.
    fn set_status(&mut self, status: u16);
    /// Set a response header, replacing any previous value.
    fn insert_header(&mut self, name: &str, value: &str);
    /// Append a body chunk.
    fn write_body(&mut self, chunk: &[u8]);
    /// Last status set via [`set_status`](Self::set_status), 0 when unset.
    fn status(&self) -> u16;
    /// Total body bytes written so far.
    fn bytes_written(&self) -> u64;
}

/// A request handler.
///
/// Captured parameters arrive as a typed argument; for static routes the
/// router passes a shared empty view without allocating.
pub trait Handler: Send + Sync {
    /// Handle the request, writing the response through `w`.
    fn call(&self, w: &mut dyn ResponseWriter, req: &Request<'_>, params: &Params<'_>);
}

impl<F> Handler for F
where
    F: Fn(&mut dyn ResponseWriter, &Request<'_>, &Params<'_>) + Send + Sync,
{
    fn call(&self, w: &mut dyn ResponseWriter, req: &Request<'_>, params: &Params<'_>) {
        self(w, req, params);
    }
}

/// Shared handler reference as stored in the route tables.
pub type HandlerRef = Arc<dyn Handler>;

/// Handler-wrapping middleware, composed once at registration time.
pub type Middleware = Arc<dyn Fn(HandlerRef) -> HandlerRef + Send + Sync>;

/// Receives the payload of a handler panic caught by dispatch.
pub type PanicHandler =
    Arc<dyn Fn(&mut dyn ResponseWriter, &Request<'_>, Box<dyn Any + Send>) + Send + Sync>;

/// Request-id generation hook, configured once at router construction.
pub type RequestIdFn = Arc<dyn Fn() -> u64 + Send + Sync>;
