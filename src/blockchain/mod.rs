// Blockchain module
//
// This module contains the ledger core:
// - Signature capability and Ed25519 wallets
// - Transaction structure, signing and validation
// - Merkle commitment over a block's transactions
// - Block structure and the draft/sealed lifecycle
// - Proof of work
// - Chain state, validation and conflict resolution
// - Peer chain fetching

pub mod block;
pub mod chain;
pub mod crypto;
pub mod hash;
pub mod merkle;
pub mod peer;
pub mod pow;
pub mod transaction;

// Re-export main components for easier access
pub use block::{Block, DraftBlock};
pub use chain::{Blockchain, BlockchainError};
pub use crypto::{Address, DigitalSignature, Wallet};
pub use peer::{HttpPeerClient, PeerClient};
pub use transaction::{Transaction, TransactionError};
