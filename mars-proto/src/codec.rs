//! Single-message codec over contiguous byte buffers.
//!
//! A body is exactly one postcard payload: no length prefix, no header.

use serde::{Deserialize, Serialize};

/// Maximum accepted message size (16 MiB).
pub const MAX_MESSAGE: usize = 16 * 1024 * 1024;

/// A value could not be serialized.
///
/// The derived message types in this crate always serialize; this only
/// surfaces for hand-written `Serialize` impls outside postcard's data model.
#[derive(Debug, thiserror::Error)]
#[error("failed to encode message: {0}")]
pub struct EncodeError(postcard::Error);

/// Bytes are not a valid encoding of the expected message type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// Input is larger than [`MAX_MESSAGE`].
    #[error("message of {len} bytes exceeds the {MAX_MESSAGE} byte limit")]
    TooLarge {
        /// Length of the rejected input.
        len: usize,
    },

    /// Input does not parse as the expected type.
    #[error("malformed message: {0}")]
    Malformed(postcard::Error),

    /// A message parsed but did not consume the whole input.
    #[error("{remaining} trailing bytes after message")]
    TrailingBytes {
        /// Unconsumed byte count.
        remaining: usize,
    },
}

/// Encodes `msg` into a freshly allocated buffer.
///
/// Output is deterministic: the same value always yields the same bytes.
pub fn encode(msg: &impl Serialize) -> Result<Vec<u8>, EncodeError> {
    postcard::to_allocvec(msg).map_err(EncodeError)
}

/// Decodes exactly one `T` from `bytes`.
///
/// Never falls back to a default value: the input must parse and must be
/// consumed completely.
pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, DecodeError> {
    if bytes.len() > MAX_MESSAGE {
        return Err(DecodeError::TooLarge { len: bytes.len() });
    }
    let (msg, rest) = postcard::take_from_bytes(bytes).map_err(DecodeError::Malformed)?;
    if !rest.is_empty() {
        return Err(DecodeError::TrailingBytes {
            remaining: rest.len(),
        });
    }
    Ok(msg)
}
