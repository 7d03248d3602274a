//! HTTP/1.1 front end: turns `POST /<path>` into a dispatch call.

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Bytes, Incoming};
use hyper::header::{self, HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use mars_proto::{DEFAULT_PORT, MAX_MESSAGE};
use tokio::net::TcpListener;

use crate::dispatch::Dispatcher;
use crate::envelope::{ERROR_HEADER, ERROR_MESSAGE_HEADER, ErrorEnvelope, ErrorKind};

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub listen: SocketAddr,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            max_body_bytes: MAX_MESSAGE,
        }
    }
}

/// A bound CGI server.
#[derive(Debug)]
pub struct Server {
    /// Accepting socket.
    listener: TcpListener,
    /// Shared dispatcher.
    dispatcher: Dispatcher,
    /// Request body limit.
    max_body_bytes: usize,
}

impl Server {
    /// Binds the listening socket. Serving starts with [`Self::run`].
    pub async fn bind(config: &ServerConfig, dispatcher: Dispatcher) -> io::Result<Self> {
        let listener = TcpListener::bind(config.listen).await?;
        Ok(Self {
            listener,
            dispatcher,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until an accept error.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` completes. Connections already accepted keep
    /// running on their own tasks.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> io::Result<()> {
        tracing::info!(
            addr = %self.local_addr()?,
            routes = ?self.dispatcher.router().paths(),
            "listening"
        );
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted?,
            };

            let io = TokioIo::new(stream);
            let dispatcher = self.dispatcher.clone();
            let limit = self.max_body_bytes;

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let dispatcher = dispatcher.clone();
                    async move { Ok::<_, Infallible>(handle(&dispatcher, limit, req).await) }
                });
                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::debug!(%peer, error = %e, "connection error");
                }
            });
        }
    }
}

/// Serves one HTTP request.
async fn handle(
    dispatcher: &Dispatcher,
    limit: usize,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    if req.method() != Method::POST {
        let mut resp = status_only(StatusCode::METHOD_NOT_ALLOWED);
        resp.headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("POST"));
        return resp;
    }

    let uri_path = req.uri().path();
    let path = uri_path.strip_prefix('/').unwrap_or(uri_path).to_owned();

    let body = match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::warn!(path = %path, limit, "request body too large");
            return status_only(StatusCode::PAYLOAD_TOO_LARGE);
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "failed to read request body");
            return status_only(StatusCode::BAD_REQUEST);
        }
    };

    // Handlers are synchronous; keep them off the connection workers.
    let dispatcher = dispatcher.clone();
    let outcome = tokio::task::spawn_blocking(move || dispatcher.dispatch(&path, &body)).await;

    match outcome {
        Ok(Ok(out)) => {
            let mut resp = Response::new(Full::new(Bytes::from(out)));
            resp.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
            resp
        }
        Ok(Err(e)) => error_response(&ErrorEnvelope::from(&e)),
        Err(e) => {
            tracing::error!(error = %e, "dispatch task failed");
            error_response(&ErrorEnvelope {
                kind: ErrorKind::Internal,
                message: e.to_string(),
            })
        }
    }
}

/// Empty-bodied response with the envelope in its headers.
fn error_response(envelope: &ErrorEnvelope) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(envelope.kind.status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut resp = status_only(status);
    let headers = resp.headers_mut();
    headers.insert(
        HeaderName::from_static(ERROR_HEADER),
        HeaderValue::from_static(envelope.kind.as_str()),
    );
    if let Ok(v) = HeaderValue::from_str(&envelope.header_message()) {
        headers.insert(HeaderName::from_static(ERROR_MESSAGE_HEADER), v);
    }
    resp
}

/// Response with `status` and no body.
fn status_only(status: StatusCode) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::new()));
    *resp.status_mut() = status;
    resp
}
