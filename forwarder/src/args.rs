use std::path::PathBuf;

use clap::Parser;

/// OpenAI-compatible protocol gateway
#[derive(Debug, Parser)]
#[command(name = "forwarder", about = "OpenAI-compatible gateway for chat, responses and image backends")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "forwarder.toml", env = "FORWARDER_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "FORWARDER_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, default_value = "info", env = "FORWARDER_LOG")]
    pub log: String,
}
