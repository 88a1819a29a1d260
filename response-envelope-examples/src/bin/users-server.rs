//! Users service.
//!
//! Run with: cargo run --bin users-server
//! Then: cargo run --bin users-client

use response_envelope_examples::{AppState, init_tracing, router, server_addr};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let addr = server_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("=== Users Service ===");
    println!("Server listening on http://{}", addr);
    println!();
    println!("  GET    /users?page=N");
    println!("  GET    /users/delta?since=R");
    println!("  GET    /users/{{id}}");
    println!("  DELETE /users/{{id}}");
    println!("  GET    /health");
    println!();
    println!("Test with:");
    println!("  curl -i http://localhost:{}/users/1", addr.port());

    axum::serve(listener, router(AppState::seeded())).await?;
    Ok(())
}
