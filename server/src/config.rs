use clap::Parser;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_CLIENTS: usize = 32;
pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 5;

/// Runtime settings for the session server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct ServerConfig {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// UDP port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Maximum number of concurrent sessions
    #[arg(short, long, default_value_t = DEFAULT_MAX_CLIENTS)]
    pub max_clients: usize,

    /// Seconds of silence before a session is dropped
    #[arg(short = 't', long, default_value_t = DEFAULT_CLIENT_TIMEOUT_SECS)]
    pub client_timeout_secs: u64,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_clients: DEFAULT_MAX_CLIENTS,
            client_timeout_secs: DEFAULT_CLIENT_TIMEOUT_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_arguments() {
        let config = ServerConfig::parse_from([
            "server", "--host", "127.0.0.1", "--port", "4000", "-m", "8", "-t", "10",
        ]);

        assert_eq!(config.bind_addr(), "127.0.0.1:4000");
        assert_eq!(config.max_clients, 8);
        assert_eq!(config.client_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.client_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_default_matches_parsed_defaults() {
        let parsed = ServerConfig::parse_from(["server", "--port", "3000"]);
        let default = ServerConfig::default();

        assert_eq!(parsed.host, default.host);
        assert_eq!(parsed.port, default.port);
        assert_eq!(parsed.max_clients, default.max_clients);
        assert_eq!(parsed.client_timeout_secs, default.client_timeout_secs);
    }
}
