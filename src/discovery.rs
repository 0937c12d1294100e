//! Candidate replica discovery.
//!
//! Miners and sharders come from the network's discovery endpoint. Storage
//! providers are listed page by page by a sharder, so the sharder class has to
//! be healthy before storage-provider candidates can be known.

use crate::endpoint::{parse_endpoints, Endpoint, UrlBuilder};
use crate::error::{ClientError, EndpointError, Result};
use crate::replica::ReplicaClass;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

pub const DISCOVERY_PATH: &str = "/dns/network";
pub const STORAGE_LIST_PATH: &str = "/v1/screst/:sc_address/getblobbers";

/// Upper bound on listing pages fetched from one sharder.
const MAX_STORAGE_PAGES: usize = 1000;

/// Candidate miners and sharders announced by the network.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkNodes {
    #[serde(default)]
    pub miners: Vec<String>,
    #[serde(default)]
    pub sharders: Vec<String>,
}

impl NetworkNodes {
    pub fn miner_endpoints(&self) -> Result<Vec<Endpoint>> {
        parse_endpoints(&self.miners)
    }

    pub fn sharder_endpoints(&self) -> Result<Vec<Endpoint>> {
        parse_endpoints(&self.sharders)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageProviderNode {
    pub id: String,
    pub url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StorageProviderPage {
    #[serde(rename = "Nodes", default)]
    nodes: Vec<StorageProviderNode>,
}

pub fn storage_endpoints(nodes: &[StorageProviderNode]) -> Result<Vec<Endpoint>> {
    parse_endpoints(nodes.iter().map(|n| n.url.as_str()))
}

#[derive(Debug, Clone)]
pub struct NetworkDiscovery {
    client: Client,
    storage_sc_address: String,
    page_size: usize,
}

impl NetworkDiscovery {
    pub fn new(client: Client, storage_sc_address: impl Into<String>, page_size: usize) -> Self {
        Self {
            client,
            storage_sc_address: storage_sc_address.into(),
            page_size: page_size.max(1),
        }
    }

    pub async fn fetch_nodes(&self, network: &Endpoint) -> Result<NetworkNodes> {
        let url = UrlBuilder::for_endpoint(network)
            .set_path(DISCOVERY_PATH)
            .build_url()?;

        info!("Discovering network nodes from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Discovery(EndpointError::from(e).to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Discovery(format!(
                "discovery endpoint {network} returned {status}"
            )));
        }

        let nodes: NetworkNodes = response
            .json()
            .await
            .map_err(|e| ClientError::Discovery(EndpointError::from(e).to_string()))?;

        info!(
            "Discovered {} miners and {} sharders",
            nodes.miners.len(),
            nodes.sharders.len()
        );
        Ok(nodes)
    }

    /// Lists every storage provider, asking sharders in order until one
    /// serves the complete listing.
    pub async fn list_storage_providers(&self, sharders: &[Endpoint]) -> Result<Vec<StorageProviderNode>> {
        if sharders.is_empty() {
            return Err(ClientError::NoEndpoints {
                class: ReplicaClass::Sharder,
            });
        }

        let mut last_error: Option<EndpointError> = None;

        for sharder in sharders {
            match self.list_from_sharder(sharder).await {
                Ok(nodes) => {
                    info!(
                        "Sharder {} listed {} storage providers",
                        sharder,
                        nodes.len()
                    );
                    return Ok(nodes);
                }
                Err(e) => {
                    warn!("Storage provider listing from {} failed: {}", sharder, e);
                    last_error = Some(e);
                }
            }
        }

        Err(ClientError::Discovery(format!(
            "no sharder served the storage provider listing (last error: {})",
            last_error.map_or_else(|| "none".to_string(), |e| e.to_string())
        )))
    }

    async fn list_from_sharder(&self, sharder: &Endpoint) -> std::result::Result<Vec<StorageProviderNode>, EndpointError> {
        let mut nodes = Vec::new();
        let mut offset = 0usize;

        for _ in 0..MAX_STORAGE_PAGES {
            let url = UrlBuilder::for_endpoint(sharder)
                .set_path(STORAGE_LIST_PATH)
                .set_path_variable("sc_address", &self.storage_sc_address)
                .add_param("offset", offset.to_string())
                .add_param("limit", self.page_size.to_string())
                .build_url()
                .map_err(|e| EndpointError::Transport(e.to_string()))?;

            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(EndpointError::Transport(format!("unexpected status {status}")));
            }

            let body = response.bytes().await?;
            let page: StorageProviderPage = serde_json::from_slice(&body)?;
            let page_len = page.nodes.len();
            debug!(
                "Sharder {} returned {} storage providers at offset {}",
                sharder, page_len, offset
            );

            nodes.extend(page.nodes);
            if page_len < self.page_size {
                return Ok(nodes);
            }
            offset += self.page_size;
        }

        warn!(
            "Stopped listing storage providers from {} after {} pages",
            sharder, MAX_STORAGE_PAGES
        );
        Ok(nodes)
    }
}
