// API module
//
// Thin HTTP layer over the ledger core

pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;
