//! Shared mockito fixtures for the integration tests.

#![allow(dead_code)]

use chain_quorum_client::{ClientConfig, Endpoint};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

/// A local address nothing listens on.
pub const UNREACHABLE: &str = "http://127.0.0.1:1";

pub fn unreachable() -> Endpoint {
    Endpoint::parse(UNREACHABLE).unwrap()
}

/// A replica that accepts connections, reads the request and closes the
/// socket without answering.
pub async fn hang_up() -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
        }
    });
    Endpoint::parse(&format!("http://{addr}")).unwrap()
}

pub fn endpoint_of(server: &ServerGuard) -> Endpoint {
    Endpoint::parse(&server.url()).unwrap()
}

/// A mock replica and the mocks registered on it. Mocks are removed from the
/// server when dropped, so they live as long as the replica.
pub struct MockReplica {
    pub server: ServerGuard,
    pub mocks: Vec<Mock>,
}

impl MockReplica {
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
            mocks: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        endpoint_of(&self.server)
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    pub async fn respond(&mut self, method: &str, path: &str, status: usize, body: &str) -> &mut Self {
        let mock = self
            .server
            .mock(method, path)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    pub async fn healthy_stats(&mut self) -> &mut Self {
        self.respond("GET", "/v1/chain/get/stats", 200, "{}").await
    }
}

/// A replica that only answers the chain stats probe, with `status`.
pub async fn stats_replica(status: usize) -> MockReplica {
    let mut replica = MockReplica::new().await;
    replica
        .respond("GET", "/v1/chain/get/stats", status, "{}")
        .await;
    replica
}

pub fn test_config(network_url: &str) -> ClientConfig {
    ClientConfig::new(network_url)
        .with_request_timeout(Duration::from_secs(5))
        .with_probe_timeout(Duration::from_secs(5))
        .with_poll_interval(Duration::from_millis(50))
        .with_confirmation_timeout(Duration::from_secs(5))
}
