use clap::Parser;

use std::time::Duration;

/// Node configuration, from command-line flags or the environment
#[derive(Debug, Clone, Parser)]
#[command(name = "ledger_node")]
#[command(about = "A single-ledger proof-of-work blockchain node", long_about = None)]
pub struct Config {
    /// Interface the HTTP server binds to
    #[arg(long, env = "LEDGER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port the HTTP server listens on
    #[arg(long, env = "LEDGER_PORT", default_value_t = 5001)]
    pub port: u16,

    /// Seconds to wait for a peer's chain before skipping it
    #[arg(long, env = "LEDGER_PEER_TIMEOUT_SECS", default_value_t = 5)]
    pub peer_timeout_secs: u64,

    /// Peer endpoints registered at startup (repeatable)
    #[arg(long = "peer", env = "LEDGER_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,
}

impl Config {
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["ledger_node"]).unwrap();
        assert_eq!(config.port, 5001);
        assert_eq!(config.peer_timeout(), Duration::from_secs(5));
        assert!(config.peers.is_empty());
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "ledger_node",
            "--port",
            "5002",
            "--peer",
            "http://127.0.0.1:5001",
            "--peer",
            "http://127.0.0.1:5003",
            "--peer-timeout-secs",
            "2",
        ])
        .unwrap();

        assert_eq!(config.bind_address(), ("127.0.0.1".to_string(), 5002));
        assert_eq!(config.peers.len(), 2);
        assert_eq!(config.peer_timeout_secs, 2);
    }
}
