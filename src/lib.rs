//! # c8-client - a failover-aware client for geo-distributed C8 fabrics
//!
//! `c8-client` talks to the REST interface of a multi-tenant, geo-distributed document and
//! graph database. Every call goes through one dispatcher that picks a host, composes the
//! headers, runs the exchange on a pooled transport agent and turns the outcome into a typed
//! result.
//!
//! ## Quick Start
//!
//! ```no_run
//! use c8_client::{Client, GracefulExt, codes};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), c8_client::Error> {
//!     let client = Client::builder()
//!         .urls(["https://eu.gdn.example.com", "https://us.gdn.example.com"])?
//!         .api_key("demo.key")
//!         .c8_version(30400)
//!         .fabric("shop")
//!         .build()?;
//!
//!     // A graceful lookup: "document not found" becomes `None`
//!     let people = client.graph("social").vertex_collection("people");
//!     match people.vertex_opt("alice").await? {
//!         Some(alice) => println!("Found {}", alice),
//!         None => println!("No such person"),
//!     }
//!
//!     // The same thing by hand
//!     let bob = client
//!         .collection("people")
//!         .document("bob")
//!         .await
//!         .absent_on(codes::DOCUMENT_NOT_FOUND)?;
//!     println!("Bob: {:?}", bob);
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Sequential failover** - hosts are tried in configuration order, each at most once per
//!   request; the host that answered is preferred afterwards
//! - **Typed service errors** - every error response carries the service's numeric code
//! - **Deterministic headers** - call headers override client defaults, which override the
//!   body-implied content type
//! - **Managed agents** - one keep-alive agent per scheme, destroyed exactly once on close
//! - **Structured logging** - attempts, failovers and errors are reported through `tracing`
//!
//! ## Failure Handling
//!
//! ```no_run
//! use c8_client::{Client, Error, Request};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().url("https://gdn.example.com")?.build()?;
//! match client.send(Request::get("/_api/collection/orders")).await {
//!     Ok(response) => println!("Served by {}", response.host),
//!     Err(Error::Service(envelope)) => {
//!         eprintln!("Service said no: {} ({})", envelope.message, envelope.error_num);
//!     }
//!     Err(Error::HostsExhausted { attempts, last_error }) => {
//!         eprintln!("{} hosts tried, last failure: {}", attempts, last_error);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
mod client;
pub mod collection;
mod config;
mod error;
mod fabric;
mod failover;
pub mod graph;
pub mod headers;
pub mod hosts;
mod request;
mod response;
mod translate;
pub mod util;

pub use agent::{Agent, AgentOptions, Connector};
pub use client::{Client, ClientBuilder, DEFAULT_FABRIC};
pub use collection::{DocumentCollection, IndexSpec, ReadOptions, WriteOptions};
pub use config::{ClientConfig, UrlSetting};
pub use error::{codes, Error, ErrorEnvelope, GracefulExt, Result};
pub use failover::FailoverStrategy;
pub use graph::Graph;
pub use hosts::{DataCenter, HostDescriptor, Scheme};
pub use request::{Body, Request};
pub use response::Response;
