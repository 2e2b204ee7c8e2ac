use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "dreambridge")]
#[command(about = "Dreamina image generation over HTTP via a headless browser")]
#[command(version)]
pub struct Cli {
    /// Port to listen on; falls back to the PORT environment variable, then 3000
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Netscape-format cookie export used for authentication
    #[arg(long, value_name = "FILE")]
    pub cookies: Option<PathBuf>,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn resolved_port(&self) -> u16 {
        if let Some(port) = self.port {
            return port;
        }
        std::env::var("PORT")
            .ok()
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(3000)
    }
}
