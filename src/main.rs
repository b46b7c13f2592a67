use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;

use ledger_node::api;
use ledger_node::blockchain::{self, Blockchain, HttpPeerClient, PeerClient};
use ledger_node::config::Config;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::create_transaction,
        api::handlers::get_chain,
        api::handlers::get_mempool,
        api::handlers::mine,
        api::handlers::register_nodes,
        api::handlers::resolve_nodes,
        api::handlers::validate_chain,
        api::handlers::create_wallet
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::Address,
            blockchain::DigitalSignature,
            api::handlers::TransactionRequest,
            api::handlers::TransactionResponse,
            api::handlers::RegisterNodesRequest,
            api::handlers::RegisterNodesResponse,
            api::handlers::ResolveResponse,
            api::handlers::WalletResponse
        )
    ),
    tags(
        (name = "ledger", description = "Ledger node API endpoints")
    ),
    info(
        title = "Ledger Node API",
        version = "0.1.0",
        description = "A single-ledger proof-of-work blockchain node",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::parse();

    // Genesis is mined here, before the server accepts requests
    let ledger = Blockchain::new();
    for peer in &config.peers {
        ledger.register_node(peer);
    }

    let peer_client: Arc<dyn PeerClient> = Arc::new(HttpPeerClient::new(config.peer_timeout())?);

    let blockchain = web::Data::new(ledger.clone());
    let peers = web::Data::from(peer_client);

    let (host, port) = config.bind_address();
    info!("Starting HTTP server at http://{}:{}", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Configure OpenAPI documentation
        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(blockchain.clone())
            .app_data(peers.clone())
            // API routes
            .configure(api::configure_routes)
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
    })
    .bind((host, port))?
    .run()
    .await?;

    // A block still being mined when the server stops is abandoned
    if ledger.cancel_mining() {
        info!("Cancelled in-flight mining on shutdown");
    }

    Ok(())
}
