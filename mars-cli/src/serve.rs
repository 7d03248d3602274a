//! `mars serve`: built-in CGI routes behind the HTTP server.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use mars_cgi::{Cgi, Dispatcher, Router, Server, ServerConfig};
use mars_proto::{
    Conversation, ConversationList, ConversationListRequest, ConversationListResponse, Hello,
    HelloRequest, HelloResponse, MAX_MESSAGE, RETCODE_OK,
};

/// Arguments for `mars serve`.
#[derive(clap::Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(short = 'l', long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Largest accepted request body in bytes.
    #[arg(long, default_value_t = MAX_MESSAGE)]
    pub max_body: usize,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let config = ServerConfig {
        listen: args.listen,
        max_body_bytes: args.max_body,
    };
    let server = Server::bind(&config, Dispatcher::new(routes()?))
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

/// Builds the route table served by `mars serve`.
pub fn routes() -> Result<Router> {
    let mut routes = Router::builder();
    routes
        .endpoint::<Hello, _>(HelloCgi)?
        .endpoint::<ConversationList, _>(ConversationListCgi)?;
    Ok(routes.build())
}

/// Business error: the request lacks a required field.
const RETCODE_MISSING_FIELD: i32 = -1;

/// Business error: the conversation kind is unknown.
const RETCODE_UNKNOWN_KIND: i32 = -2;

/// Greets the sender and echoes its dump payload.
struct HelloCgi;

impl Cgi for HelloCgi {
    type Request = HelloRequest;
    type Response = HelloResponse;

    fn handle(&self, req: HelloRequest) -> HelloResponse {
        if req.user.is_empty() {
            return HelloResponse {
                retcode: RETCODE_MISSING_FIELD,
                errmsg: "user required".into(),
                dump_content: Vec::new(),
            };
        }
        tracing::info!(user = %req.user, text = %req.text, "hello");
        HelloResponse {
            retcode: RETCODE_OK,
            errmsg: format!("congratulations, {}", req.user),
            dump_content: req.dump_content,
        }
    }
}

/// Lists the fixed set of chat rooms, optionally filtered by kind.
struct ConversationListCgi;

/// `(kind, name, topic, notice)` of every room.
const ROOMS: &[(i32, &str, &str, &str)] = &[
    (1, "Mars", "0", "Mars Open Source"),
    (1, "Mars Chat", "1", "Say hello to everyone"),
    (2, "Mars Dev", "2", "Protocol and transport discussion"),
];

impl Cgi for ConversationListCgi {
    type Request = ConversationListRequest;
    type Response = ConversationListResponse;

    fn handle(&self, req: ConversationListRequest) -> ConversationListResponse {
        if req.access_token.is_empty() {
            return list_error(RETCODE_MISSING_FIELD, "access token required".into());
        }
        if !(0..=2).contains(&req.kind) {
            return list_error(
                RETCODE_UNKNOWN_KIND,
                format!("unknown conversation kind {}", req.kind),
            );
        }
        let list = ROOMS
            .iter()
            .filter(|(kind, ..)| req.kind == 0 || *kind == req.kind)
            .map(|&(_, name, topic, notice)| Conversation {
                name: name.into(),
                topic: topic.into(),
                notice: notice.into(),
            })
            .collect();
        ConversationListResponse {
            retcode: RETCODE_OK,
            errmsg: String::new(),
            list,
        }
    }
}

fn list_error(retcode: i32, errmsg: String) -> ConversationListResponse {
    ConversationListResponse {
        retcode,
        errmsg,
        list: Vec::new(),
    }
}
