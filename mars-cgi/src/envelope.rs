//! Error envelope carried by failed CGI calls.
//!
//! A failed call has an empty body, so decoding it as a response message
//! fails. The failure itself travels in two response headers.

use std::fmt;

use crate::error::DispatchError;

/// Header naming the [`ErrorKind`] of a failed call.
pub const ERROR_HEADER: &str = "x-mars-error";

/// Header carrying a human-readable description of a failed call.
pub const ERROR_MESSAGE_HEADER: &str = "x-mars-error-message";

/// Category of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No handler for the path. Permanent.
    RouteNotFound,
    /// The body is not a valid request message. Retrying the same bytes fails again.
    MalformedRequest,
    /// The handler panicked or its response could not be encoded.
    Internal,
}

impl ErrorKind {
    /// Stable wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RouteNotFound => "route-not-found",
            Self::MalformedRequest => "malformed-request",
            Self::Internal => "internal",
        }
    }

    /// Parses a wire name produced by [`Self::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "route-not-found" => Some(Self::RouteNotFound),
            "malformed-request" => Some(Self::MalformedRequest),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }

    /// HTTP status code used for this kind.
    pub const fn status(self) -> u16 {
        match self {
            Self::RouteNotFound => 404,
            Self::MalformedRequest => 400,
            Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of a call that produced no response message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ErrorEnvelope {
    /// Failure category.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl ErrorEnvelope {
    /// Rebuilds an envelope from the values of [`ERROR_HEADER`] and
    /// [`ERROR_MESSAGE_HEADER`]. Returns `None` when the kind is absent or unknown.
    pub fn from_headers(kind: Option<&str>, message: Option<&str>) -> Option<Self> {
        let kind = ErrorKind::parse(kind?)?;
        Some(Self {
            kind,
            message: message.unwrap_or_default().to_owned(),
        })
    }

    /// [`Self::message`] restricted to visible ASCII so it fits in a header value.
    pub fn header_message(&self) -> String {
        self.message
            .chars()
            .map(|c| if c == ' ' || c.is_ascii_graphic() { c } else { '?' })
            .collect()
    }
}

impl From<&DispatchError> for ErrorEnvelope {
    fn from(err: &DispatchError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
