//! A small users service and a client for it.
//!
//! The server is a plain axum router. The client is built on hyper and
//! exposes every call twice: a classic method returning the payload, and a
//! `*_with_response` method returning the full envelope.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

pub mod client;
pub mod server;

pub use client::{ClientError, UserServiceClient};
pub use server::{AppState, router};

/// A user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

/// Error body returned by the service for non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Returns the server address from PORT env var, defaulting to 3000.
pub fn server_addr() -> anyhow::Result<SocketAddr> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    Ok(format!("0.0.0.0:{port}").parse()?)
}

/// Install a `tracing` subscriber honoring `RUST_LOG`.
///
/// Defaults to debug output for the envelope crate so payload
/// materialization is visible when running the demos.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,response_envelope=debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
