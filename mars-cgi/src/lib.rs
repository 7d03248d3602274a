//! CGI-style dispatch for mars.
//!
//! A [`Router`] maps route paths such as `mars/hello` to handlers and is
//! frozen before serving starts. The [`Dispatcher`] decodes each posted body
//! with [`mars_proto`], invokes the handler and encodes its reply. Requests
//! that fail routing or decoding never produce a response message: they are
//! reported as an [`ErrorEnvelope`] with an empty body.
//!
//! # Quick start
//!
//! ```no_run
//! use mars_cgi::{Dispatcher, Router, Server, ServerConfig, cgi_fn};
//! use mars_proto::{Hello, HelloRequest, HelloResponse};
//!
//! # async fn serve() -> Result<(), Box<dyn std::error::Error>> {
//! let mut routes = Router::builder();
//! routes.endpoint::<Hello, _>(cgi_fn(|req: HelloRequest| HelloResponse {
//!     retcode: 0,
//!     errmsg: format!("hello {}", req.user),
//!     dump_content: req.dump_content,
//! }))?;
//!
//! let server = Server::bind(&ServerConfig::default(), Dispatcher::new(routes.build())).await?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod dispatch;
mod envelope;
mod error;
mod registry;
mod server;

pub use client::{Client, ClientConfig, ClientError, Reply};
pub use dispatch::Dispatcher;
pub use envelope::{ERROR_HEADER, ERROR_MESSAGE_HEADER, ErrorEnvelope, ErrorKind};
pub use error::{DispatchError, HandlerError, RegisterError};
pub use registry::{Cgi, CgiFn, Handler, Router, RouterBuilder, Typed, cgi_fn};
pub use server::{Server, ServerConfig};
