//! richdoc Gateway HTTP API Server
//!
//! Exposes registered client APIs, serves stored documents, and reports health.

pub mod client_api;
pub mod documents;
pub mod health_api;
pub mod server;

pub use server::{build_router, start_server, GatewayState, DEFAULT_MAX_BODY_BYTES};
