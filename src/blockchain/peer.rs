use async_trait::async_trait;
use thiserror::Error;

use std::time::Duration;

use super::block::Block;

/// Errors that can occur while talking to a peer
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },

    #[error("Peer {peer} answered with status {status}")]
    BadStatus { peer: String, status: u16 },

    #[error("Peer {peer} sent an undecodable chain: {reason}")]
    Malformed { peer: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    ClientError(String),
}

/// Source of remote chains used during conflict resolution
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Fetches the full chain currently held by `peer`
    async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, PeerError>;
}

/// Fetches chains over HTTP from a peer's `/chain` endpoint
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    /// Creates a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::ClientError(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, PeerError> {
        let response = self
            .client
            .get(chain_url(peer))
            .send()
            .await
            .map_err(|e| PeerError::Unreachable {
                peer: peer.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::BadStatus {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<Block>>()
            .await
            .map_err(|e| PeerError::Malformed {
                peer: peer.to_string(),
                reason: e.to_string(),
            })
    }
}

/// URL of a peer's chain endpoint. Bare `host:port` peers are assumed to speak plain HTTP.
pub fn chain_url(peer: &str) -> String {
    let base = peer.trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{}/chain", base)
    } else {
        format!("http://{}/chain", base)
    }
}
