use std::fmt;

use clap::{Parser, ValueEnum};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportMode {
    Stdio,
    Http,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// Lightweight Model Context Protocol server for testing and development.
#[derive(Debug, Clone, Parser)]
#[command(name = "mcp-hello-world", version, about)]
pub struct CliArgs {
    /// Communication mode.
    #[arg(short, long, value_enum, env = "MCP_MODE", default_value_t = TransportMode::Stdio)]
    pub mode: TransportMode,

    /// HTTP server port.
    #[arg(short, long, env = "MCP_PORT", default_value_t = 3000)]
    pub port: u16,

    /// HTTP server host.
    #[arg(short = 'H', long, env = "MCP_HOST", default_value = "localhost")]
    pub host: String,

    /// Enable verbose logging.
    #[arg(short, long, env = "MCP_VERBOSE")]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: TransportMode,
    pub host: String,
    pub port: u16,
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("port must be a valid number between 1 and 65535")]
    InvalidPort,
    #[error("host must not be empty")]
    EmptyHost,
}

impl Config {
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let host = args.host.trim().to_string();
        if host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        Ok(Self {
            mode: args.mode,
            host,
            port: args.port,
            verbose: args.verbose,
        })
    }

    /// `host:port` for the listener; hostnames are resolved at bind time.
    pub fn bind_target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
