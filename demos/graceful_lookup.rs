//! Example demonstrating graceful lookups and service error codes.
//!
//! This example shows how to:
//! - Build a client from a JSON configuration document
//! - Treat "not found" as an empty result instead of an error
//! - Branch on the numeric service error code
//!
//! Run with: `cargo run --example graceful_lookup`

use c8_client::{codes, ClientConfig, Error, GracefulExt};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("c8_client=debug,graceful_lookup=info")
        .init();

    let config: ClientConfig = serde_json::from_str(
        r#"{
            "url": "http://localhost:8529",
            "fabric": "_system",
            "c8_version": 30400,
            "timeout_ms": 5000
        }"#,
    )
    .map_err(|e| Error::ConfigurationError(e.to_string()))?;
    let client = config.into_builder()?.build()?;

    println!("=== Graph vertex lookup ===");
    let people = client.graph("social").vertex_collection("people");
    match people.vertex_opt("alice").await {
        Ok(Some(alice)) => println!("Found alice: {}", alice),
        Ok(None) => println!("No vertex named alice"),
        Err(e) => println!("Lookup failed: {}", e),
    }
    println!();

    println!("=== Collection document lookup ===");
    let lookup = client
        .collection("people")
        .document("bob")
        .await
        .absent_on(codes::DOCUMENT_NOT_FOUND);
    match lookup {
        Ok(Some(bob)) => println!("Found bob: {}", bob),
        Ok(None) => println!("No document named bob"),
        Err(e) if e.error_num() == Some(codes::COLLECTION_NOT_FOUND) => {
            println!("Collection 'people' does not exist");
        }
        Err(e) => println!("Lookup failed: {}", e),
    }
    println!();

    println!("=== Graph existence ===");
    match client.graph("social").exists().await {
        Ok(exists) => println!("Graph 'social' exists: {}", exists),
        Err(e) => println!("Check failed: {}", e),
    }

    client.close();
    Ok(())
}
