//! Two nodes running real HTTP servers resolve their chains against each other.

use actix_web::{web, App, HttpServer};
use serde_json::{json, Value};

use std::sync::Arc;
use std::time::{Duration, Instant};

use ledger_node::api::configure_routes;
use ledger_node::blockchain::{Block, Blockchain, HttpPeerClient, PeerClient, Wallet};

/// Starts a node on an ephemeral port and returns its base URL
fn spawn_node(blockchain: Blockchain) -> String {
    spawn_node_with_timeout(blockchain, Duration::from_secs(5))
}

fn spawn_node_with_timeout(blockchain: Blockchain, peer_timeout: Duration) -> String {
    let peer_client: Arc<dyn PeerClient> =
        Arc::new(HttpPeerClient::new(peer_timeout).expect("client"));

    let blockchain = web::Data::new(blockchain);
    let peers = web::Data::from(peer_client);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(blockchain.clone())
            .app_data(peers.clone())
            .configure(configure_routes)
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("bind");

    let address = server.addrs()[0];
    actix_web::rt::spawn(server.run());

    format!("http://{}", address)
}

#[actix_web::test]
async fn test_nodes_converge_on_more_valuable_chain() {
    let node_a = spawn_node(Blockchain::new());
    let node_b = spawn_node(Blockchain::new());
    let http = reqwest::Client::new();

    let sender = Wallet::generate();
    let recipient = Wallet::generate();

    let resp = http
        .post(format!("{}/transactions/create", node_a))
        .json(&json!({
            "sender": sender.address().0,
            "recipient": recipient.address().0,
            "amount": 10,
            "signingKey": sender.export_credential(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let mined: Block = http
        .get(format!("{}/mine", node_a))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mined.transactions.len(), 1);

    // Node B learns about A and also about a peer that is offline
    let resp = http
        .post(format!("{}/nodes/register", node_b))
        .json(&json!({ "nodes": ["http://127.0.0.1:9", node_a] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resolved: Value = http
        .get(format!("{}/nodes/resolve", node_b))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resolved["replaced"], true);

    let chain_a: Vec<Block> = http
        .get(format!("{}/chain", node_a))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let chain_b: Vec<Block> = http
        .get(format!("{}/chain", node_b))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(chain_a, chain_b);

    // A now has nothing more valuable to learn from B
    let resp = http
        .post(format!("{}/nodes/register", node_a))
        .json(&json!({ "nodes": [node_b] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resolved: Value = http
        .get(format!("{}/nodes/resolve", node_a))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resolved["replaced"], false);
}

/// Listens on an ephemeral port, accepts connections and never replies
async fn spawn_silent_peer() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("address");

    actix_web::rt::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    format!("http://{}", address)
}

#[actix_web::test]
async fn test_resolve_skips_silent_peer_after_timeout() {
    let source = Blockchain::new();
    let sender = Wallet::generate();
    let recipient = Wallet::generate();
    source
        .create_transaction(
            sender.address().clone(),
            recipient.address().clone(),
            10.0,
            chrono::Utc::now().timestamp(),
            &sender.export_credential(),
        )
        .unwrap();
    source.mine().unwrap();

    let node_a = spawn_node(source.clone());
    let node_b = spawn_node_with_timeout(Blockchain::new(), Duration::from_millis(500));
    let silent = spawn_silent_peer().await;

    // "http://127.0.0.1" sorts before "http://localhost", so the silent peer is asked first
    let node_a = node_a.replace("127.0.0.1", "localhost");
    assert!(silent < node_a);

    let http = reqwest::Client::new();
    let resp = http
        .post(format!("{}/nodes/register", node_b))
        .json(&json!({ "nodes": [silent, node_a] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let started = Instant::now();
    let resolved: Value = http
        .get(format!("{}/nodes/resolve", node_b))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(resolved["replaced"], true);
    assert!(started.elapsed() >= Duration::from_millis(400));
    assert!(started.elapsed() < Duration::from_secs(10));

    let chain_b: Vec<Block> = http
        .get(format!("{}/chain", node_b))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(chain_b, source.get_chain());
}
