use std::time::Duration;

use clap::Parser;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 11434;
pub const DEFAULT_CHUNK_DELAY_MS: u64 = 100;

/// Startup configuration for the mock server. Built once and never mutated
/// while the server runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Accepted for compatibility. CORS headers are sent regardless.
    pub allow_cors: bool,
    pub allow_iframe: bool,
    pub chunk_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            allow_cors: false,
            allow_iframe: false,
            chunk_delay: Duration::from_millis(DEFAULT_CHUNK_DELAY_MS),
        }
    }
}

impl ServerConfig {
    /// Loopback config on an ephemeral port.
    pub fn local() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Self::default()
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_iframe(mut self, allow_iframe: bool) -> Self {
        self.allow_iframe = allow_iframe;
        self
    }

    pub fn with_chunk_delay(mut self, chunk_delay: Duration) -> Self {
        self.chunk_delay = chunk_delay;
        self
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "mock-ollama",
    about = "Start a mock Ollama server with CORS support",
    version
)]
pub struct Cli {
    /// Port to run the server on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Host to run the server on
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// Allow CORS
    #[arg(long)]
    pub allow_cors: bool,
    /// Allow iframes
    #[arg(long)]
    pub allow_iframe: bool,
    /// Delay between streamed chunks, in milliseconds
    #[arg(long, default_value_t = DEFAULT_CHUNK_DELAY_MS)]
    pub chunk_delay_ms: u64,
}

impl Cli {
    pub fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            allow_cors: self.allow_cors,
            allow_iframe: self.allow_iframe,
            chunk_delay: Duration::from_millis(self.chunk_delay_ms),
        }
    }
}
