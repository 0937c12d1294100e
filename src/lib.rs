//! # chain-quorum-client
//!
//! A client for replicated blockchain networks that decides, from several
//! possibly divergent replica answers, what the outcome of an operation was.
//!
//! ## Features
//!
//! - **Replica Discovery**: Miners and sharders from the network's discovery endpoint,
//!   storage providers from a paginated sharder listing
//! - **Health Probing**: Each candidate is probed once; only replicas answering 2xx are kept,
//!   and a class with no healthy replica is a fatal error
//! - **Quorum Fan-Out**: One request is sent to every healthy replica of a class and a single
//!   representative response is chosen (ties between matches and mismatches favor the match)
//! - **Dominant Errors**: When every replica fails, the most frequent failure is reported
//! - **Confirmation Polling**: Bounded waiting for submitted transactions to become visible
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chain_quorum_client::{ClientConfig, NetworkClient, Transaction, TransactionStatus};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("https://network.example.com")
//!         .with_confirmation_timeout(Duration::from_secs(120))
//!         .with_require_storage_providers(false);
//!
//!     // Discovers and probes every replica class; fails fast if miners or
//!     // sharders have no healthy member.
//!     let client = NetworkClient::connect(config).await?;
//!
//!     let transaction: Transaction = serde_json::from_str(r#"{"hash":"...","nonce":1}"#)?;
//!     match client.execute_transaction(&transaction, TransactionStatus::Success).await? {
//!         Some(confirmation) => println!("confirmed in round {}", confirmation.round),
//!         None => println!("not confirmed in time"),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod client;
pub mod config;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod health;
pub mod poller;
pub mod replica;
pub mod request;
pub mod transaction;

// Re-export main types at crate root
pub use aggregate::dominant;
pub use client::NetworkClient;
pub use config::{BasicAuth, ClientConfig};
pub use discovery::{NetworkDiscovery, NetworkNodes, StorageProviderNode};
pub use endpoint::{Endpoint, UrlBuilder};
pub use error::{ClientError, EndpointError, Result};
pub use executor::{mismatch_dominates, QuorumExecutor, QuorumResponse, Tally};
pub use health::{HealthProber, ProbeReport, ProbeResult, ReplicaHealth};
pub use poller::ConfirmationPoller;
pub use replica::{ProbeStrategy, ReplicaClass, ReplicaDirectory};
pub use request::{ExecutionOutcome, ExecutionRequest, ReplicaResponse, RequestBody, RequiredOutcome};
pub use transaction::{
    Balance, Confirmation, ConfirmedTransaction, Transaction, TransactionStatus, Wallet,
};

// Re-export HTTP types that appear in the public API
pub use reqwest::{Method, StatusCode};
