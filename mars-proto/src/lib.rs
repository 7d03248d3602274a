//! Wire messages for mars CGI calls.
//!
//! Every request and response body is a single [`postcard`] message with no
//! framing of its own: the transport already delimits the body. Decoding is
//! strict, so bytes that are not exactly one valid message are rejected
//! instead of being read as a defaulted value.

mod codec;
mod message;

pub use codec::{DecodeError, EncodeError, MAX_MESSAGE, decode, encode};
pub use message::{
    Conversation, ConversationList, ConversationListRequest, ConversationListResponse,
    DEFAULT_PORT, Endpoint, Hello, HelloRequest, HelloResponse, RETCODE_OK,
};
