//! Route table mapping CGI paths to handlers.
//!
//! Routes are added to a [`RouterBuilder`] during startup and frozen into a
//! [`Router`], which is read-only for the rest of the process lifetime.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use mars_proto::Endpoint;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{HandlerError, RegisterError};

/// Untyped handler: raw request body in, raw response body out.
pub trait Handler: Send + Sync + 'static {
    /// Handles one request body.
    fn call(&self, request: &[u8]) -> Result<Vec<u8>, HandlerError>;
}

/// Typed handler bound to one request and response message type.
///
/// Business failures belong in the response value (a non-zero result code),
/// not in a Rust error.
pub trait Cgi: Send + Sync + 'static {
    /// Decoded request message.
    type Request: DeserializeOwned;
    /// Response message to encode.
    type Response: Serialize;

    /// Produces the response for one decoded request.
    fn handle(&self, request: Self::Request) -> Self::Response;
}

/// Adapts a [`Cgi`] into a [`Handler`] by running the codec around it.
#[derive(Debug)]
pub struct Typed<C>(C);

impl<C: Cgi> Typed<C> {
    /// Wraps `cgi`.
    pub const fn new(cgi: C) -> Self {
        Self(cgi)
    }
}

impl<C: Cgi> Handler for Typed<C> {
    fn call(&self, request: &[u8]) -> Result<Vec<u8>, HandlerError> {
        // Decode failure returns before the handler runs.
        let req: C::Request = mars_proto::decode(request)?;
        let resp = self.0.handle(req);
        Ok(mars_proto::encode(&resp)?)
    }
}

/// A [`Cgi`] backed by a closure. Built with [`cgi_fn`].
pub struct CgiFn<F, Req, Resp> {
    /// The wrapped closure.
    f: F,
    /// Binds the message types.
    _marker: PhantomData<fn(Req) -> Resp>,
}

/// Turns `f` into a [`Cgi`] whose message types are its argument and return types.
pub const fn cgi_fn<F, Req, Resp>(f: F) -> CgiFn<F, Req, Resp>
where
    F: Fn(Req) -> Resp + Send + Sync + 'static,
{
    CgiFn {
        f,
        _marker: PhantomData,
    }
}

impl<F, Req, Resp> Cgi for CgiFn<F, Req, Resp>
where
    F: Fn(Req) -> Resp + Send + Sync + 'static,
    Req: DeserializeOwned + 'static,
    Resp: Serialize + 'static,
{
    type Request = Req;
    type Response = Resp;

    fn handle(&self, request: Req) -> Resp {
        (self.f)(request)
    }
}

impl<F, Req, Resp> fmt::Debug for CgiFn<F, Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CgiFn")
            .field("request", &std::any::type_name::<Req>())
            .field("response", &std::any::type_name::<Resp>())
            .finish()
    }
}

/// Collects routes before serving starts.
#[derive(Default)]
pub struct RouterBuilder {
    /// Handlers by exact path.
    routes: HashMap<String, Box<dyn Handler>>,
}

impl RouterBuilder {
    /// Binds `path` to a raw [`Handler`].
    ///
    /// Fails if the path is already taken or is not a valid route path.
    pub fn register(
        &mut self,
        path: impl Into<String>,
        handler: impl Handler,
    ) -> Result<&mut Self, RegisterError> {
        let path = path.into();
        if !is_valid_path(&path) {
            return Err(RegisterError::InvalidPath(path));
        }
        if self.routes.contains_key(&path) {
            return Err(RegisterError::Duplicate(path));
        }
        tracing::debug!(path = %path, "route registered");
        self.routes.insert(path, Box::new(handler));
        Ok(self)
    }

    /// Binds `path` to a typed [`Cgi`].
    pub fn route<C: Cgi>(
        &mut self,
        path: impl Into<String>,
        cgi: C,
    ) -> Result<&mut Self, RegisterError> {
        self.register(path, Typed::new(cgi))
    }

    /// Binds [`Endpoint::PATH`] to a [`Cgi`] with matching message types.
    pub fn endpoint<E, C>(&mut self, cgi: C) -> Result<&mut Self, RegisterError>
    where
        E: Endpoint,
        C: Cgi<Request = E::Request, Response = E::Response>,
    {
        self.route(E::PATH, cgi)
    }

    /// Freezes the table.
    pub fn build(self) -> Router {
        Router {
            routes: self.routes,
        }
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("paths", &sorted_paths(&self.routes))
            .finish()
    }
}

/// Immutable route table.
///
/// Lookups are exact and case-sensitive; there is no prefix or wildcard matching.
pub struct Router {
    /// Handlers by exact path.
    routes: HashMap<String, Box<dyn Handler>>,
}

impl Router {
    /// Starts an empty [`RouterBuilder`].
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Returns the handler bound to `path`.
    pub fn lookup(&self, path: &str) -> Option<&dyn Handler> {
        self.routes.get(path).map(AsRef::as_ref)
    }

    /// Registered paths in lexical order.
    pub fn paths(&self) -> Vec<&str> {
        sorted_paths(&self.routes)
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("paths", &self.paths())
            .finish()
    }
}

/// Route paths are non-empty, carry no surrounding `/`, and use only
/// characters that appear verbatim in a URI path (RFC 3986 `pchar` and `/`,
/// minus percent-encoding). Anything else could never match a request line.
fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.ends_with('/')
        && path.bytes().all(is_path_byte)
}

/// Unreserved, sub-delims, `:`, `@` and `/`.
const fn is_path_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'.' | b'_' | b'~' | b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+'
                | b',' | b';' | b'=' | b':' | b'@' | b'/'
        )
}

/// Keys of `routes`, sorted.
fn sorted_paths(routes: &HashMap<String, Box<dyn Handler>>) -> Vec<&str> {
    let mut paths: Vec<&str> = routes.keys().map(String::as_str).collect();
    paths.sort_unstable();
    paths
}
