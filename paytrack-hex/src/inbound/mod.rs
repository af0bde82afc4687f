//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod extract;
mod handlers;
pub mod rate_limit;
mod response;
mod server;
pub mod session;

pub use handlers::AppState;
pub use response::ApiError;
pub use server::{HttpServer, ServerConfig};
