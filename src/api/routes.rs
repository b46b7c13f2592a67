use actix_web::web;

use super::handlers;

/// Configures the API routes
///
/// Paths are unprefixed because peers fetch each other's `/chain` directly.
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/transactions/create", web::post().to(handlers::create_transaction))
        .route("/transactions/mempool", web::get().to(handlers::get_mempool))
        .route("/chain", web::get().to(handlers::get_chain))
        .route("/mine", web::get().to(handlers::mine))
        .route("/nodes/register", web::post().to(handlers::register_nodes))
        .route("/nodes/resolve", web::get().to(handlers::resolve_nodes))
        .route("/validate", web::get().to(handlers::validate_chain))
        .route("/wallet/new", web::post().to(handlers::create_wallet));
}
