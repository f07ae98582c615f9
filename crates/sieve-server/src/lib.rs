//! # sieve-server
//!
//! HTTP bindings for the invoice anomaly sieve. Wraps
//! `sieve-orchestrator::score_invoice` and `sieve-store`'s read paths in
//! an axum router, fronted by bearer-token verification.
//!
//! ```text
//! auth     -- HS256 bearer-token verification middleware
//! routes   -- AppState, router construction, request/response DTOs
//! ```

pub mod auth;
pub mod routes;

pub use auth::AuthConfig;
pub use routes::{create_router, AppState};
