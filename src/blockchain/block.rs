use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use std::fmt;

use super::hash::digest;
use super::transaction::Transaction;

/// Anything with a block header that can be hashed under a candidate nonce
pub trait BlockHeader {
    /// Identity hash of the header with `nonce` substituted
    fn header_hash(&self, nonce: u64) -> String;
}

/// Header digest over every block field except the transaction list
fn header_digest(
    index: u64,
    timestamp: i64,
    merkle_root: &str,
    nonce: u64,
    previous_hash: &str,
) -> String {
    digest(json!({
        "index": index,
        "timestamp": timestamp,
        "merkleRoot": merkle_root,
        "nonce": nonce,
        "previousHash": previous_hash,
    }))
}

/// A block assembled from the pending pool that has not been sealed yet
#[derive(Debug, Clone, PartialEq)]
pub struct DraftBlock {
    pub index: u64,
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub merkle_root: String,
    pub previous_hash: String,
}

impl DraftBlock {
    /// Fixes the nonce and turns the draft into an immutable block
    pub fn into_sealed(self, nonce: u64) -> Block {
        Block {
            index: self.index,
            timestamp: self.timestamp,
            transactions: self.transactions,
            merkle_root: self.merkle_root,
            nonce,
            previous_hash: self.previous_hash,
        }
    }
}

impl BlockHeader for DraftBlock {
    fn header_hash(&self, nonce: u64) -> String {
        header_digest(
            self.index,
            self.timestamp,
            &self.merkle_root,
            nonce,
            &self.previous_hash,
        )
    }
}

/// Represents a sealed block in the blockchain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Position of the block in the chain
    pub index: u64,

    /// Unix timestamp (seconds) when the block was built
    pub timestamp: i64,

    /// Transactions included in this block
    pub transactions: Vec<Transaction>,

    /// Merkle root committing to `transactions`
    pub merkle_root: String,

    /// Proof-of-work nonce
    pub nonce: u64,

    /// Identity hash of the previous block
    pub previous_hash: String,
}

impl Block {
    /// The block ID: header hash under the block's own nonce
    pub fn id(&self) -> String {
        self.header_hash(self.nonce)
    }

    /// Sum of all transaction amounts in the block
    pub fn value(&self) -> f64 {
        self.transactions.iter().map(|tx| tx.amount).sum()
    }
}

impl BlockHeader for Block {
    fn header_hash(&self, nonce: u64) -> String {
        header_digest(
            self.index,
            self.timestamp,
            &self.merkle_root,
            nonce,
            &self.previous_hash,
        )
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} id={} ts={} nonce={} txs={} merkle={} prev={}",
            self.index,
            self.id(),
            self.timestamp,
            self.nonce,
            self.transactions.len(),
            self.merkle_root,
            self.previous_hash
        )
    }
}
