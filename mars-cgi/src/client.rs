//! Blocking HTTP client for mars CGI servers.
//!
//! [`Client::post`] hands back the server's bytes untouched so callers can
//! decode them themselves; [`Client::call`] is the typed path on top of it.

use std::time::Duration;

use mars_proto::{DEFAULT_PORT, DecodeError, EncodeError, Endpoint, MAX_MESSAGE};

use crate::envelope::{ERROR_HEADER, ERROR_MESSAGE_HEADER, ErrorEnvelope};

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    /// Whole-call timeout. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: format!("http://127.0.0.1:{DEFAULT_PORT}"),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Errors from [`Client`] calls.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The call did not complete: connect, timeout, or I/O failure.
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    /// The server answered with an error envelope.
    #[error("call rejected: {0}")]
    Remote(ErrorEnvelope),

    /// The server answered with a non-success status and no envelope.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The request message could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The response body is not a valid response message.
    #[error("malformed response: {0}")]
    Decode(#[from] DecodeError),
}

/// Raw outcome of [`Client::post`].
#[derive(Debug, Clone)]
pub struct Reply {
    /// HTTP status code.
    pub status: u16,
    /// Error envelope, if the server sent one.
    pub envelope: Option<ErrorEnvelope>,
    /// Response body, exactly as received.
    pub body: Vec<u8>,
}

impl Reply {
    /// Whether the status is 2xx.
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Connection to one mars CGI server.
#[derive(Debug, Clone)]
pub struct Client {
    /// HTTP agent with status-as-error disabled.
    agent: ureq::Agent,
    /// Server root without trailing `/`.
    base_url: String,
}

impl Client {
    /// Creates a client. No connection is made until the first call.
    pub fn new(config: &ClientConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .build()
            .into();
        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Full URL of `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Posts `body` to `path` and returns whatever the server sent.
    ///
    /// Only transport failures are errors; HTTP error statuses come back as
    /// a [`Reply`].
    pub fn post(&self, path: &str, body: &[u8]) -> Result<Reply, ClientError> {
        let url = self.url(path);
        let mut resp = self
            .agent
            .post(url.as_str())
            .header("content-type", "application/octet-stream")
            .send(body)?;

        let status = resp.status().as_u16();
        let headers = resp.headers();
        let envelope = ErrorEnvelope::from_headers(
            headers.get(ERROR_HEADER).and_then(|v| v.to_str().ok()),
            headers.get(ERROR_MESSAGE_HEADER).and_then(|v| v.to_str().ok()),
        );
        let body = resp
            .body_mut()
            .with_config()
            .limit(MAX_MESSAGE as u64)
            .read_to_vec()?;

        tracing::debug!(url = %url, status, body_len = body.len(), "posted");
        Ok(Reply {
            status,
            envelope,
            body,
        })
    }

    /// Sends a typed request to [`Endpoint::PATH`] and decodes the response.
    ///
    /// A response with a non-zero result code is still `Ok`.
    pub fn call<E: Endpoint>(&self, request: &E::Request) -> Result<E::Response, ClientError> {
        let body = mars_proto::encode(request)?;
        let reply = self.post(E::PATH, &body)?;
        if let Some(envelope) = reply.envelope {
            return Err(ClientError::Remote(envelope));
        }
        if !reply.is_success() {
            return Err(ClientError::Status(reply.status));
        }
        Ok(mars_proto::decode(&reply.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let client = Client::new(&ClientConfig {
            base_url: "http://localhost:9000/".into(),
            timeout: None,
        });
        assert_eq!(client.url("mars/hello"), "http://localhost:9000/mars/hello");
    }

    #[test]
    fn default_targets_local_server() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn connection_refused_is_transport_error() {
        // Bind then drop to obtain a port with no listener.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = Client::new(&ClientConfig {
            base_url: format!("http://127.0.0.1:{port}"),
            timeout: Some(Duration::from_secs(5)),
        });
        let err = client.post("mars/hello", b"").unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[test]
    fn success_range() {
        let reply = |status| Reply {
            status,
            envelope: None,
            body: Vec::new(),
        };
        assert!(reply(200).is_success());
        assert!(reply(204).is_success());
        assert!(!reply(199).is_success());
        assert!(!reply(404).is_success());
    }
}
