//! Client commands: hello, conv-list, post.

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{Context, Result};
use mars_cgi::{Client, ClientConfig};
use mars_proto::{ConversationList, ConversationListRequest, Hello, HelloRequest};

/// Connection options shared by client commands.
#[derive(clap::Args)]
pub struct ServerArgs {
    /// Server root URL.
    #[arg(short = 's', long, default_value = "http://127.0.0.1:8080")]
    pub server: String,

    /// Call timeout in seconds (0 waits forever).
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}

impl ServerArgs {
    fn client(&self) -> Client {
        Client::new(&ClientConfig {
            base_url: self.server.clone(),
            timeout: (self.timeout > 0).then_some(Duration::from_secs(self.timeout)),
        })
    }
}

/// Arguments for `mars hello`.
#[derive(clap::Args)]
pub struct HelloArgs {
    /// Sender identifier.
    #[arg(short = 'u', long)]
    pub user: String,

    /// Message text.
    #[arg(short = 't', long, default_value = "hello")]
    pub text: String,

    #[command(flatten)]
    pub server: ServerArgs,
}

/// Arguments for `mars conv-list`.
#[derive(clap::Args)]
pub struct ConvListArgs {
    /// Session token.
    #[arg(long, default_value = "anonymous")]
    pub token: String,

    /// Conversation kind (0 lists all).
    #[arg(short = 'k', long, default_value_t = 0)]
    pub kind: i32,

    #[command(flatten)]
    pub server: ServerArgs,
}

/// Arguments for `mars post`.
#[derive(clap::Args)]
pub struct PostArgs {
    /// Route path, e.g. `mars/hello`.
    pub path: String,

    /// File holding the request body (empty body if omitted).
    #[arg(short = 'f', long)]
    pub file: Option<String>,

    #[command(flatten)]
    pub server: ServerArgs,
}

pub async fn hello(args: HelloArgs) -> Result<()> {
    let client = args.server.client();
    let req = HelloRequest {
        user: args.user,
        text: args.text,
        dump_content: Vec::new(),
    };
    let resp = tokio::task::spawn_blocking(move || client.call::<Hello>(&req))
        .await?
        .context("mars/hello failed")?;
    println!("retcode: {}", resp.retcode);
    println!("errmsg:  {}", resp.errmsg);
    Ok(())
}

pub async fn conv_list(args: ConvListArgs) -> Result<()> {
    let client = args.server.client();
    let req = ConversationListRequest {
        access_token: args.token,
        kind: args.kind,
    };
    let resp = tokio::task::spawn_blocking(move || client.call::<ConversationList>(&req))
        .await?
        .context("mars/getconvlist failed")?;

    if !resp.is_ok() {
        anyhow::bail!("server returned {}: {}", resp.retcode, resp.errmsg);
    }
    println!("{:<8} {:<16} NOTICE", "TOPIC", "NAME");
    for conv in &resp.list {
        println!("{:<8} {:<16} {}", conv.topic, conv.name, conv.notice);
    }
    Ok(())
}

pub async fn post(args: PostArgs) -> Result<()> {
    let body = match &args.file {
        Some(f) => std::fs::read(f).with_context(|| format!("failed to read {f}"))?,
        None => Vec::new(),
    };
    let client = args.server.client();
    let path = args.path;
    let reply = tokio::task::spawn_blocking(move || client.post(&path, &body)).await??;

    println!("status: {}", reply.status);
    if let Some(envelope) = &reply.envelope {
        println!("error:  {envelope}");
    }
    println!("body:   {} bytes", reply.body.len());
    if !reply.body.is_empty() {
        println!("{}", hex(&reply.body));
    }
    Ok(())
}

/// Lowercase hex, 32 bytes per line.
fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, chunk) in bytes.chunks(32).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for b in chunk {
            let _ = write!(out, "{b:02x}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_wraps_lines() {
        assert_eq!(hex(&[0x00, 0xab, 0x10]), "00ab10");
        let long = hex(&[0xffu8; 33]);
        let lines: Vec<&str> = long.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 64);
        assert_eq!(lines[1], "ff");
    }
}
