//! Request dispatch: route lookup, decode, invoke, encode.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{DispatchError, HandlerError};
use crate::registry::Router;

/// Routes raw request bodies to their handlers.
///
/// Holds no per-call state; clones share the same frozen [`Router`] and may
/// dispatch concurrently from any number of threads.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    /// Frozen route table.
    router: Arc<Router>,
}

impl Dispatcher {
    /// Creates a dispatcher serving `router`.
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    /// The route table being served.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handles one call and returns the encoded response message.
    ///
    /// Routing and decode failures short-circuit before the handler runs and
    /// never yield response bytes. A handler panic is caught here and
    /// reported as [`DispatchError::HandlerPanicked`].
    ///
    /// Runs the handler on the calling thread. Async callers should move the
    /// call to a blocking pool, as [`Server`](crate::Server) does.
    pub fn dispatch(&self, path: &str, request: &[u8]) -> Result<Vec<u8>, DispatchError> {
        let Some(handler) = self.router.lookup(path) else {
            tracing::warn!(path, "no route");
            return Err(DispatchError::RouteNotFound {
                path: path.to_owned(),
            });
        };

        let t0 = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.call(request)));

        match outcome {
            Ok(Ok(response)) => {
                tracing::debug!(
                    path,
                    request_len = request.len(),
                    response_len = response.len(),
                    elapsed = ?t0.elapsed(),
                    "dispatched"
                );
                Ok(response)
            }
            Ok(Err(HandlerError::Decode(source))) => {
                tracing::warn!(path, request_len = request.len(), error = %source, "malformed request");
                Err(DispatchError::MalformedRequest {
                    path: path.to_owned(),
                    source,
                })
            }
            Ok(Err(HandlerError::Encode(source))) => {
                tracing::error!(path, error = %source, "response encoding failed");
                Err(DispatchError::Encode {
                    path: path.to_owned(),
                    source,
                })
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(path, panic = %message, "handler panicked");
                Err(DispatchError::HandlerPanicked {
                    path: path.to_owned(),
                    message,
                })
            }
        }
    }
}

/// Extracts the text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
