//! Server configuration.

use std::time::Duration;

use rally_match::MatchConfig;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 12345;

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `host:port` to listen on.
    pub bind_addr: String,
    pub match_config: MatchConfig,
    /// How long to let writers flush their final notices once the match
    /// has ended.
    pub flush_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            match_config: MatchConfig::default(),
            flush_timeout: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_listens_on_all_interfaces() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:12345");
        assert_eq!(config.match_config.win_score, 5);
    }
}
