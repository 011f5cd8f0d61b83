//! Server configuration from the command line and environment.

use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;

/// Server configuration.
///
/// Every option can also come from the environment; command-line flags win.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "tsmetrics", author, version, about, long_about = None)]
pub struct Config {
    /// Host to bind to
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "SERVER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
