//! Example demonstrating failover across several hosts.
//!
//! This example shows how to:
//! - Configure an ordered list of endpoints
//! - Pace failover hops with a backoff strategy
//! - See which host answered and how many were contacted
//! - Handle the case where every host is down
//!
//! Run with: `cargo run --example failover`
//!
//! Point `C8_URLS` at a comma-separated list of endpoints to try it against a real deployment.

use c8_client::{Client, Error, FailoverStrategy, Request};
use http::Method;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("c8_client=debug,failover=info")
        .init();

    let urls = std::env::var("C8_URLS")
        .unwrap_or_else(|_| "http://127.0.0.1:1,http://localhost:8529".to_string());

    let client = Client::builder()
        .urls(urls.split(','))?
        .timeout(Duration::from_secs(5))
        .failover_strategy(FailoverStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            jitter: true,
        })
        .build()?;

    println!("=== Candidate hosts ===");
    for host in client.hosts().hosts() {
        println!("  {}", host);
    }
    println!();

    println!("=== Version lookup ===");
    match client
        .send(Request::absolute(Method::GET, "/_api/version"))
        .await
    {
        Ok(response) => {
            println!("Answered by: {}", response.host);
            println!("Hosts contacted: {}", response.attempts);
            println!("Latency: {:?}", response.latency);
            println!("Body: {}", response.data);
        }
        Err(Error::HostsExhausted {
            attempts,
            last_error,
        }) => {
            println!("All {} hosts failed; last error: {}", attempts, last_error);
        }
        Err(e) => println!("Unexpected error: {}", e),
    }
    println!();

    println!("Active host for the next call: {}", client.hosts().active());

    client.close();
    Ok(())
}
