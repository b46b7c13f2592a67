//! Single-ledger proof-of-work blockchain node.
//!
//! The ledger core lives in [`blockchain`]; [`api`] is the HTTP layer that
//! nodes use to talk to clients and to each other.

pub mod api;
pub mod blockchain;
pub mod config;
