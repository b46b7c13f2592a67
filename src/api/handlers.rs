use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Address, Block, Blockchain, BlockchainError, PeerClient, Transaction, Wallet};

/// Data structure for the blockchain state
pub type BlockchainData = web::Data<Blockchain>;

/// Peer client used by conflict resolution
pub type PeerClientData = web::Data<dyn PeerClient>;

/// Request for the create transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// The sender's address
    pub sender: Option<String>,

    /// The recipient's address
    pub recipient: Option<String>,

    /// The amount to transfer
    pub amount: Option<f64>,

    /// Unix timestamp (seconds); the server time is used when absent
    pub timestamp: Option<i64>,

    /// The sender's signing key in wallet-interchange format
    #[serde(alias = "privWifKey")]
    pub signing_key: Option<String>,
}

/// Response for the create transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// The message
    pub message: String,

    /// The accepted transaction
    pub transaction: Transaction,
}

/// Request for the register nodes endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesRequest {
    /// Peer endpoints, e.g. `http://127.0.0.1:5002`
    pub nodes: Option<Vec<String>>,
}

/// Response for the register nodes endpoint
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNodesResponse {
    /// The message
    pub message: String,

    /// Number of distinct peers now registered
    pub total_nodes: usize,
}

/// Response for the resolve endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ResolveResponse {
    /// The message
    pub message: String,

    /// Whether the local chain was replaced
    pub replaced: bool,

    /// The chain after resolution
    pub chain: Vec<Block>,
}

/// Response for the create wallet endpoint
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    /// The wallet's address
    pub address: String,

    /// The wallet's signing key in wallet-interchange format
    pub signing_key: String,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.trim().is_empty())
}

/// Create a new transaction
///
/// Signs the transaction with the supplied key and adds it to the mempool
#[utoipa::path(
    post,
    path = "/transactions/create",
    request_body = TransactionRequest,
    responses(
        (status = 200, description = "Transaction accepted", body = TransactionResponse),
        (status = 406, description = "Missing data or invalid transaction")
    )
)]
pub async fn create_transaction(
    blockchain: BlockchainData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    let (sender, recipient, amount, signing_key) = match (
        non_empty(&transaction_req.sender),
        non_empty(&transaction_req.recipient),
        transaction_req.amount,
        non_empty(&transaction_req.signing_key),
    ) {
        (Some(sender), Some(recipient), Some(amount), Some(key)) => (sender, recipient, amount, key),
        _ => return HttpResponse::NotAcceptable().body("Missing data information."),
    };

    let timestamp = transaction_req
        .timestamp
        .unwrap_or_else(|| Utc::now().timestamp());

    match blockchain.create_transaction(
        Address::from(sender),
        Address::from(recipient),
        amount,
        timestamp,
        signing_key,
    ) {
        Ok(transaction) => HttpResponse::Ok().json(TransactionResponse {
            message: "Transaction is processing.".to_string(),
            transaction,
        }),
        Err(err) => {
            info!("Rejected transaction: {}", err);
            HttpResponse::NotAcceptable().body("Transaction is invalid.")
        }
    }
}

/// Get the full blockchain
///
/// Returns every block in the chain, oldest first
#[utoipa::path(
    get,
    path = "/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = Vec<Block>)
    )
)]
pub async fn get_chain(blockchain: BlockchainData) -> impl Responder {
    let chain = blockchain.get_chain();

    for block in chain.iter().rev() {
        debug!("{}", block);
    }

    HttpResponse::Ok().json(chain)
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/transactions/mempool",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_mempool(blockchain: BlockchainData) -> impl Responder {
    HttpResponse::Ok().json(blockchain.get_pending_transactions())
}

/// Mine a new block
///
/// Builds a block from the whole mempool, seals it and appends it to the chain
#[utoipa::path(
    get,
    path = "/mine",
    responses(
        (status = 200, description = "Block mined successfully", body = Block),
        (status = 503, description = "Mining was cancelled"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine(blockchain: BlockchainData) -> impl Responder {
    let chain = blockchain.get_ref().clone();

    // Proof of work is CPU bound; keep it off the async workers
    match web::block(move || chain.mine()).await {
        Ok(Ok(block)) => HttpResponse::Ok().json(block),
        Ok(Err(BlockchainError::MiningCancelled)) => {
            HttpResponse::ServiceUnavailable().body("Mining was cancelled.")
        }
        Ok(Err(err)) => {
            error!("Failed to mine block: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to mine block: {}", err)
            }))
        }
        Err(err) => {
            error!("Mining task failed: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Mining task failed: {}", err)
            }))
        }
    }
}

/// Register peer nodes
#[utoipa::path(
    post,
    path = "/nodes/register",
    request_body = RegisterNodesRequest,
    responses(
        (status = 200, description = "Nodes registered", body = RegisterNodesResponse),
        (status = 400, description = "Node list is missing or empty")
    )
)]
pub async fn register_nodes(
    blockchain: BlockchainData,
    nodes_req: web::Json<RegisterNodesRequest>,
) -> impl Responder {
    let nodes = match nodes_req.nodes.as_deref() {
        Some(nodes) if !nodes.is_empty() => nodes,
        _ => return HttpResponse::BadRequest().body("Error: Node list are empty."),
    };

    let mut total_nodes = 0;
    for node in nodes {
        total_nodes = blockchain.register_node(node);
    }

    HttpResponse::Ok().json(RegisterNodesResponse {
        message: "Nodes registered".to_string(),
        total_nodes,
    })
}

/// Resolve conflicts with peers
///
/// Adopts the first valid peer chain whose total transacted value exceeds ours
#[utoipa::path(
    get,
    path = "/nodes/resolve",
    responses(
        (status = 200, description = "Resolution finished", body = ResolveResponse)
    )
)]
pub async fn resolve_nodes(blockchain: BlockchainData, peers: PeerClientData) -> impl Responder {
    let replaced = blockchain.resolve_conflicts(peers.get_ref()).await;

    let message = if replaced {
        "Blockchain updated."
    } else {
        "Blockchains larger and valid not found"
    };

    HttpResponse::Ok().json(ResolveResponse {
        message: message.to_string(),
        replaced,
        chain: blockchain.get_chain(),
    })
}

/// Check if the blockchain is valid
///
/// Validates the entire local chain
#[utoipa::path(
    get,
    path = "/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = bool)
    )
)]
pub async fn validate_chain(blockchain: BlockchainData) -> impl Responder {
    HttpResponse::Ok().json(blockchain.is_valid())
}

/// Create a new wallet
///
/// Creates a new wallet with a random keypair
///
/// The signing key must be stored by your own
#[utoipa::path(
    post,
    path = "/wallet/new",
    responses(
        (status = 201, description = "Wallet created successfully", body = WalletResponse)
    )
)]
pub async fn create_wallet() -> impl Responder {
    let wallet = Wallet::generate();

    HttpResponse::Created().json(WalletResponse {
        address: wallet.address().0.clone(),
        signing_key: wallet.export_credential(),
    })
}
