use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::block::BlockHeader;

/// Number of leading hex zeros a block ID must have
pub const DIFFICULTY: usize = 4;

/// How many nonces are tried between cancellation checks
const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Cooperative stop signal for a running nonce search
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Whether a hex digest satisfies the difficulty target
pub fn meets_difficulty(hash: &str) -> bool {
    hash.len() >= DIFFICULTY && hash.bytes().take(DIFFICULTY).all(|b| b == b'0')
}

/// Whether `nonce` seals `block`
pub fn is_valid_proof<B: BlockHeader + ?Sized>(block: &B, nonce: u64) -> bool {
    meets_difficulty(&block.header_hash(nonce))
}

/// Searches nonces from zero upward until one seals the block
pub fn seal<B: BlockHeader + ?Sized>(block: &B) -> u64 {
    let mut nonce = 0;
    while !is_valid_proof(block, nonce) {
        nonce += 1;
    }
    nonce
}

/// Same search as [`seal`], giving up with `None` once `cancel` fires.
///
/// A nonce found before cancellation is observed is still returned, so the
/// result is always the smallest sealing nonce when the search completes.
pub fn seal_cancellable<B: BlockHeader + ?Sized>(block: &B, cancel: &CancelToken) -> Option<u64> {
    let mut nonce = 0;
    loop {
        if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return None;
        }
        if is_valid_proof(block, nonce) {
            return Some(nonce);
        }
        nonce += 1;
    }
}
