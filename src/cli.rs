use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

use crate::config::{ServerConfig, DEFAULT_WELCOME};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the chat server, accepting TCP connections.
    Serve(ServeArgs),
    /// Connect to a running server and chat from the terminal.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Host or IP to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on. Omit to let the server pick an ephemeral port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Greeting sent to every client before its username is read.
    #[arg(long, default_value = DEFAULT_WELCOME)]
    pub welcome: String,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            welcome: args.welcome,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Username announced when joining the chat.
    #[arg(long)]
    pub username: String,

    /// Address of the server to connect to.
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub server: SocketAddr,
}
