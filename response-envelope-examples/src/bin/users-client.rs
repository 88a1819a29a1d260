//! Users client demo.
//!
//! Shows both call styles against a running `users-server`:
//! ```ignore
//! let user = client.get_user(1).await?;                   // classic
//! let envelope = client.get_user_with_response(1).await?; // envelope
//! ```
//!
//! Usage:
//!   cargo run --bin users-server
//!   cargo run --bin users-client
//!   cargo run --bin users-client -- http://localhost:8080

use response_envelope_examples::{ApiError, UserServiceClient, init_tracing};
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let base_url = env::args()
        .nth(1)
        .or_else(|| env::var("SERVER_URL").ok())
        .unwrap_or_else(|| "http://localhost:3000".to_string());
    let client = UserServiceClient::new(&base_url);

    println!("=== Users Client ===");
    println!("Server URL: {}", base_url);
    println!();

    println!("Classic call:");
    let user = client.get_user(1).await?;
    println!("  {:?}", user);

    println!("Envelope call:");
    let envelope = client.get_user_with_response(1).await?;
    println!("  status = {}", envelope.status());
    println!("  etag = {:?}", envelope.headers().get("etag"));
    println!("  raw body = {}", String::from_utf8_lossy(envelope.raw_body()));
    println!("  state before payload = {:?}", envelope.state());
    println!("  payload = {:?}", envelope.payload()?);
    println!("  state after payload = {:?}", envelope.state());

    println!("Missing user:");
    let envelope = client.get_user_with_response(404).await?;
    println!("  status = {}", envelope.status());
    let error: ApiError = envelope.deserialize()?;
    println!("  error = {:?}", error);
    match client.get_user(404).await {
        Ok(user) => println!("  unexpected user {:?}", user),
        Err(err) => println!("  classic call failed: {}", err),
    }

    println!("Paging:");
    let mut page = client.list_users_with_response(None).await?;
    loop {
        let names: Vec<&str> = page.items().iter().map(|u| u.name.as_str()).collect();
        println!("  {:?} -> {:?}", names, page.continuation());
        match page.next_link().map(str::to_string) {
            Some(link) => page = client.list_users_with_response(Some(link.as_str())).await?,
            None => break,
        }
    }

    println!("Health: {}", client.health().await?);
    Ok(())
}
