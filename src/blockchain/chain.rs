use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use log::{debug, info, warn};
use thiserror::Error;

use super::block::{Block, DraftBlock};
use super::crypto::{Address, Ed25519Scheme, SignatureScheme};
use super::hash::zero_hash;
use super::merkle;
use super::peer::PeerClient;
use super::pow::{self, CancelToken};
use super::transaction::{Transaction, TransactionError};

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Mining cancelled")]
    MiningCancelled,
}

/// Everything a node mutates, guarded as one unit
#[derive(Debug, Default)]
struct LedgerState {
    chain: Vec<Block>,
    mempool: Vec<Transaction>,
    nodes: BTreeSet<String>,
}

impl LedgerState {
    /// Drains the pool into a draft that extends the current tip
    fn build_draft(&mut self) -> DraftBlock {
        let transactions = std::mem::take(&mut self.mempool);

        DraftBlock {
            index: self.chain.len() as u64,
            timestamp: Utc::now().timestamp(),
            merkle_root: merkle::compute_root(&transactions),
            transactions,
            previous_hash: self.tip_id(),
        }
    }

    fn tip_id(&self) -> String {
        self.chain.last().map(Block::id).unwrap_or_else(zero_hash)
    }

    /// Appends a sealed block, provided it still extends the tip
    fn commit(&mut self, block: Block) -> Result<(), BlockchainError> {
        let expected_index = self.chain.len() as u64;
        let problem = if block.index != expected_index {
            Some(format!("expected index {}, got {}", expected_index, block.index))
        } else if block.previous_hash != self.tip_id() {
            Some(format!("block {} does not extend the current tip", block.index))
        } else if !pow::is_valid_proof(&block, block.nonce) {
            Some(format!("block {} is not sealed", block.index))
        } else {
            None
        };

        if let Some(problem) = problem {
            self.restore(block.transactions);
            return Err(BlockchainError::InvalidBlock(problem));
        }

        info!("Block {} committed with {} transactions", block.index, block.transactions.len());
        self.chain.push(block);
        Ok(())
    }

    /// Puts transactions from an abandoned block back at the head of the pool
    fn restore(&mut self, transactions: Vec<Transaction>) {
        if !transactions.is_empty() {
            debug!("Returning {} transactions to the mempool", transactions.len());
            self.mempool.splice(0..0, transactions);
        }
    }
}

/// Handle to a node's ledger.
///
/// Clones share the same state. Every mutation goes through a single lock, so
/// building a block always drains exactly the pool it was built from. The lock
/// is never held during the nonce search.
#[derive(Clone)]
pub struct Blockchain {
    state: Arc<Mutex<LedgerState>>,

    /// Signature capability used for signing and validation
    scheme: Arc<dyn SignatureScheme>,

    /// Cancellation handle of the search currently running in `mine`
    mining: Arc<Mutex<Option<CancelToken>>>,

    /// Held for the whole of `mine` so only one search runs at a time
    miner: Arc<Mutex<()>>,
}

impl fmt::Debug for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Blockchain")
            .field("height", &state.chain.len())
            .field("mempool", &state.mempool.len())
            .field("nodes", &state.nodes)
            .finish()
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Creates a new blockchain with a sealed genesis block, signing with Ed25519
    pub fn new() -> Self {
        Self::with_scheme(Arc::new(Ed25519Scheme))
    }

    /// Creates a new blockchain using the given signature scheme
    pub fn with_scheme(scheme: Arc<dyn SignatureScheme>) -> Self {
        let blockchain = Blockchain {
            state: Arc::new(Mutex::new(LedgerState::default())),
            scheme,
            mining: Arc::new(Mutex::new(None)),
            miner: Arc::new(Mutex::new(())),
        };

        blockchain.create_genesis_block();
        blockchain
    }

    /// Genesis is an ordinary block built from the empty chain and pool
    fn create_genesis_block(&self) {
        let mut state = self.state();
        let draft = state.build_draft();
        let nonce = pow::seal(&draft);
        let genesis = draft.into_sealed(nonce);

        info!("Genesis block sealed with nonce {}: {}", nonce, genesis.id());
        state.chain.push(genesis);
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mining_slot(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.mining.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Signs a transaction and adds it to the mempool if its signature verifies
    ///
    /// # Returns
    ///
    /// The accepted transaction. On rejection the mempool is left untouched.
    pub fn create_transaction(
        &self,
        sender: Address,
        recipient: Address,
        amount: f64,
        timestamp: i64,
        credential: &str,
    ) -> Result<Transaction, BlockchainError> {
        let transaction = Transaction::sign(
            self.scheme.as_ref(),
            sender,
            recipient,
            amount,
            timestamp,
            credential,
        )?;

        if !transaction.is_valid(self.scheme.as_ref()) {
            info!("Transaction from {} is invalid", transaction.sender);
            return Err(TransactionError::InvalidSignature.into());
        }

        let mut state = self.state();
        state.mempool.push(transaction.clone());
        info!("Transaction index {} is valid", state.mempool.len());

        Ok(transaction)
    }

    /// Builds an unsealed block from the whole mempool, which is left empty
    pub fn create_block(&self) -> DraftBlock {
        self.state().build_draft()
    }

    /// Seals a draft, returning its transactions to the mempool if cancelled
    pub fn seal_block(&self, draft: DraftBlock, cancel: &CancelToken) -> Result<Block, BlockchainError> {
        match pow::seal_cancellable(&draft, cancel) {
            Some(nonce) => Ok(draft.into_sealed(nonce)),
            None => {
                self.state().restore(draft.transactions);
                Err(BlockchainError::MiningCancelled)
            }
        }
    }

    /// Appends a sealed block to the chain.
    ///
    /// Fails if the chain moved on since the block was drafted; its
    /// transactions then go back to the mempool.
    pub fn commit_block(&self, block: Block) -> Result<(), BlockchainError> {
        self.state().commit(block)
    }

    /// Builds, seals and commits a block.
    ///
    /// The pool is drained atomically when the draft is built; the search runs
    /// without the ledger lock so reads and new transactions are not stalled.
    /// Transactions that arrive meanwhile wait for the next block. If the chain
    /// is replaced during the search, mining is cancelled and the drafted
    /// transactions return to the mempool.
    pub fn mine(&self) -> Result<Block, BlockchainError> {
        let _miner = self.miner.lock().unwrap_or_else(PoisonError::into_inner);

        let draft = self.create_block();
        let index = draft.index;

        let cancel = CancelToken::new();
        *self.mining_slot() = Some(cancel.clone());
        info!("Mining block {} with {} transactions", index, draft.transactions.len());

        let result = self
            .seal_block(draft, &cancel)
            .and_then(|block| self.commit_block(block.clone()).map(|_| block));

        if let Err(BlockchainError::MiningCancelled) = result {
            warn!("Mining of block {} cancelled", index);
        }

        self.mining_slot().take();
        result
    }

    /// Whether a search started by [`Blockchain::mine`] is in progress
    pub fn is_mining(&self) -> bool {
        self.mining_slot().is_some()
    }

    /// Stops the search running in [`Blockchain::mine`], if any
    pub fn cancel_mining(&self) -> bool {
        match self.mining_slot().as_ref() {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Registers a peer endpoint and returns the number of known peers
    pub fn register_node(&self, address: &str) -> usize {
        let address = address.trim().trim_end_matches('/');
        let mut state = self.state();

        if !address.is_empty() && state.nodes.insert(address.to_string()) {
            info!("Registered node {}", address);
        }

        state.nodes.len()
    }

    /// Gets the registered peer endpoints
    pub fn get_nodes(&self) -> Vec<String> {
        self.state().nodes.iter().cloned().collect()
    }

    /// Gets the entire blockchain
    pub fn get_chain(&self) -> Vec<Block> {
        self.state().chain.clone()
    }

    /// Gets all pending transactions
    pub fn get_pending_transactions(&self) -> Vec<Transaction> {
        self.state().mempool.clone()
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> Option<Block> {
        self.state().chain.last().cloned()
    }

    /// Validates the local chain
    pub fn is_valid(&self) -> bool {
        let chain = self.get_chain();
        is_valid_chain(&chain, self.scheme.as_ref())
    }

    /// Adopts `candidate` if it is valid and carries strictly more value than
    /// the local chain.
    ///
    /// # Returns
    ///
    /// true if the local chain was replaced
    pub fn replace_chain_if_better(&self, candidate: Vec<Block>) -> bool {
        // Validation is pure, so it runs before taking the lock
        if !is_valid_chain(&candidate, self.scheme.as_ref()) {
            return false;
        }

        let candidate_value = chain_value(&candidate);
        let mut state = self.state();
        let local_value = chain_value(&state.chain);

        if candidate_value > local_value {
            info!(
                "Replacing local chain (value {}, height {}) with chain of value {}, height {}",
                local_value,
                state.chain.len(),
                candidate_value,
                candidate.len()
            );
            state.chain = candidate;
            drop(state);

            // A block being mined now extends a tip that no longer exists
            self.cancel_mining();
            true
        } else {
            debug!(
                "Candidate chain value {} does not exceed local value {}",
                candidate_value, local_value
            );
            false
        }
    }

    /// Asks every registered peer for its chain and adopts the first valid one
    /// worth strictly more than ours. Unreachable peers are skipped.
    ///
    /// # Returns
    ///
    /// true if the local chain was replaced
    pub async fn resolve_conflicts(&self, client: &dyn PeerClient) -> bool {
        for peer in self.get_nodes() {
            match client.fetch_chain(&peer).await {
                Ok(chain) => {
                    if self.replace_chain_if_better(chain) {
                        info!("Adopted chain from {}", peer);
                        return true;
                    }
                }
                Err(err) => {
                    warn!("Skipping peer {}: {}", peer, err);
                }
            }
        }

        false
    }
}

/// Total transacted value of a chain, the metric used to compare chains
pub fn chain_value(chain: &[Block]) -> f64 {
    chain.iter().map(Block::value).sum()
}

/// Verifies proof of work, signatures, Merkle roots and linkage of every block.
///
/// The genesis block is exempt from the linkage check. An empty chain has no
/// genesis block and is rejected. The first block's `index` and
/// `previousHash` are deliberately not checked, so an adopted peer chain may
/// start from a genesis other than index 0 with a zero parent.
pub fn is_valid_chain(chain: &[Block], scheme: &dyn SignatureScheme) -> bool {
    if chain.is_empty() {
        warn!("Chain has no genesis block.");
        return false;
    }

    for (i, block) in chain.iter().enumerate() {
        if !pow::is_valid_proof(block, block.nonce) {
            warn!("Block {} has invalid nonce.", i);
            return false;
        }

        for transaction in &block.transactions {
            debug!("Verifying transaction {:?}.", transaction);
            if !transaction.is_valid(scheme) {
                warn!("Block {} has invalid signature.", i);
                return false;
            }
        }

        if block.merkle_root != merkle::compute_root(&block.transactions) {
            warn!("Block {} has invalid merkleRoot.", i);
            return false;
        }

        if i > 0 && block.previous_hash != chain[i - 1].id() {
            warn!("Block {} has invalid previousHash.", i);
            return false;
        }
    }

    true
}
