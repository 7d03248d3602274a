//! Error types for route registration and dispatch.

use mars_proto::{DecodeError, EncodeError};

use crate::envelope::ErrorKind;

/// A route could not be added to a [`RouterBuilder`](crate::RouterBuilder).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RegisterError {
    /// The path is already bound to a handler.
    #[error("route {0:?} is already registered")]
    Duplicate(String),

    /// The path is empty, has a leading or trailing `/`, or contains a
    /// character that cannot appear verbatim in a URI path.
    #[error("invalid route path {0:?}")]
    InvalidPath(String),
}

/// Failure inside a [`Handler`](crate::Handler) before or after the business logic ran.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HandlerError {
    /// The request body is not a valid request message.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The response message could not be serialized.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// A request that did not produce a response message.
///
/// Business failures are not represented here: those are ordinary
/// responses carrying a non-zero result code.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DispatchError {
    /// No handler is registered for the path.
    #[error("no route for {path:?}")]
    RouteNotFound {
        /// Requested path.
        path: String,
    },

    /// The body does not decode as the route's request type.
    #[error("malformed request for {path:?}: {source}")]
    MalformedRequest {
        /// Requested path.
        path: String,
        /// Codec failure.
        source: DecodeError,
    },

    /// The handler's response could not be encoded.
    #[error("failed to encode response for {path:?}: {source}")]
    Encode {
        /// Requested path.
        path: String,
        /// Codec failure.
        source: EncodeError,
    },

    /// The handler panicked.
    #[error("handler for {path:?} panicked: {message}")]
    HandlerPanicked {
        /// Requested path.
        path: String,
        /// Panic payload, if it was a string.
        message: String,
    },
}

impl DispatchError {
    /// Envelope category reported to the caller.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RouteNotFound { .. } => ErrorKind::RouteNotFound,
            Self::MalformedRequest { .. } => ErrorKind::MalformedRequest,
            Self::Encode { .. } | Self::HandlerPanicked { .. } => ErrorKind::Internal,
        }
    }

    /// Route path the failed request was sent to.
    pub fn path(&self) -> &str {
        match self {
            Self::RouteNotFound { path }
            | Self::MalformedRequest { path, .. }
            | Self::Encode { path, .. }
            | Self::HandlerPanicked { path, .. } => path,
        }
    }
}
