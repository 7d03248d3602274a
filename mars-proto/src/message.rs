//! CGI message types and the endpoints that carry them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Default TCP port of the mars CGI server.
pub const DEFAULT_PORT: u16 = 8080;

/// Result code of a successful call.
pub const RETCODE_OK: i32 = 0;

/// Binds a route path to its request and response message types.
pub trait Endpoint {
    /// Route path, e.g. `mars/hello`.
    const PATH: &'static str;
    /// Message posted to [`Self::PATH`].
    type Request: Serialize + DeserializeOwned;
    /// Message returned by [`Self::PATH`].
    type Response: Serialize + DeserializeOwned;
}

/// The `mars/hello` endpoint.
#[derive(Debug, Clone, Copy)]
pub struct Hello;

impl Endpoint for Hello {
    const PATH: &'static str = "mars/hello";
    type Request = HelloRequest;
    type Response = HelloResponse;
}

/// The `mars/getconvlist` endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ConversationList;

impl Endpoint for ConversationList {
    const PATH: &'static str = "mars/getconvlist";
    type Request = ConversationListRequest;
    type Response = ConversationListResponse;
}

/// Greeting sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloRequest {
    /// Sender identifier.
    pub user: String,
    /// Free-text content.
    pub text: String,
    /// Opaque payload echoed back by the server.
    pub dump_content: Vec<u8>,
}

/// Reply to [`HelloRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloResponse {
    /// [`RETCODE_OK`] on success.
    pub retcode: i32,
    /// Human-readable result message.
    pub errmsg: String,
    /// Echo of [`HelloRequest::dump_content`].
    pub dump_content: Vec<u8>,
}

impl HelloResponse {
    /// Whether the call succeeded at the business level.
    pub const fn is_ok(&self) -> bool {
        self.retcode == RETCODE_OK
    }
}

/// Asks for the conversations visible to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationListRequest {
    /// Session token issued at login.
    pub access_token: String,
    /// Conversation category filter.
    pub kind: i32,
}

/// A chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Display name.
    pub name: String,
    /// Topic identifier used to address messages.
    pub topic: String,
    /// Pinned notice text.
    pub notice: String,
}

/// Reply to [`ConversationListRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationListResponse {
    /// [`RETCODE_OK`] on success.
    pub retcode: i32,
    /// Human-readable result message.
    pub errmsg: String,
    /// Conversations matching the request.
    pub list: Vec<Conversation>,
}

impl ConversationListResponse {
    /// Whether the call succeeded at the business level.
    pub const fn is_ok(&self) -> bool {
        self.retcode == RETCODE_OK
    }
}
