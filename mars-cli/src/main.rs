//! CLI for serving and calling mars CGI endpoints.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

mod call;
mod serve;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mars", version, about = "CGI dispatch server and client for mars messages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the built-in CGI routes over HTTP.
    Serve(serve::ServeArgs),

    /// Call `mars/hello`.
    Hello(call::HelloArgs),

    /// Call `mars/getconvlist`.
    ConvList(call::ConvListArgs),

    /// Post a raw body to any path and print the reply.
    Post(call::PostArgs),

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = Cli::parse().dispatch().await {
        eprintln!("mars: {e:#}");
        std::process::exit(1);
    }
}

impl Cli {
    async fn dispatch(self) -> Result<()> {
        match self.command {
            Command::Serve(args) => serve::run(args).await,
            Command::Hello(args) => call::hello(args).await,
            Command::ConvList(args) => call::conv_list(args).await,
            Command::Post(args) => call::post(args).await,
            Command::Completion { shell } => {
                clap_complete::generate(shell, &mut Self::command(), "mars", &mut std::io::stdout());
                Ok(())
            }
        }
    }
}
