//! The network client: a discovery context threaded through every call.
//!
//! A [`NetworkClient`] owns the HTTP client, the per-class
//! [`ReplicaDirectory`] and the components built on top of them. Clones share
//! the same directory, so a refresh performed through one clone is visible to
//! all of them.

use crate::config::ClientConfig;
use crate::discovery::{storage_endpoints, NetworkDiscovery};
use crate::endpoint::Endpoint;
use crate::error::{ClientError, Result};
use crate::executor::{QuorumExecutor, QuorumResponse};
use crate::health::{HealthProber, ProbeReport};
use crate::poller::ConfirmationPoller;
use crate::replica::{ProbeStrategy, ReplicaClass, ReplicaDirectory};
use crate::request::ExecutionRequest;

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct NetworkClient {
    config: ClientConfig,
    executor: QuorumExecutor,
    prober: HealthProber,
    discovery: NetworkDiscovery,
    directory: Arc<ReplicaDirectory>,
}

impl NetworkClient {
    /// Creates a client with an empty replica directory. Nothing is probed
    /// until [`NetworkClient::bootstrap`] or [`NetworkClient::refresh`] runs.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_directory(config, Arc::new(ReplicaDirectory::new()))
    }

    /// Creates a client over an existing, possibly shared, directory.
    pub fn with_directory(config: ClientConfig, directory: Arc<ReplicaDirectory>) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::HttpClient(e.to_string()))?;

        Ok(Self {
            executor: QuorumExecutor::new(client.clone()),
            prober: HealthProber::new(client.clone(), config.probe_timeout),
            discovery: NetworkDiscovery::new(
                client,
                config.storage_sc_address.clone(),
                config.storage_page_size,
            ),
            directory,
            config,
        })
    }

    /// Creates a client and populates every replica class from the network's
    /// discovery endpoint.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.bootstrap().await?;
        Ok(client)
    }

    pub async fn bootstrap(&self) -> Result<()> {
        let network = self.config.network_endpoint()?;
        let nodes = self.discovery.fetch_nodes(&network).await?;
        self.bootstrap_with(nodes.miner_endpoints()?, nodes.sharder_endpoints()?)
            .await
    }

    /// Probes the given miners and sharders, then discovers and probes
    /// storage providers through the healthy sharders.
    ///
    /// Miners and sharders without a healthy member are fatal. Storage
    /// providers are fatal only when the config requires them.
    pub async fn bootstrap_with(&self, miners: Vec<Endpoint>, sharders: Vec<Endpoint>) -> Result<()> {
        let (miners, sharders) = futures::join!(
            self.refresh(ReplicaClass::Miner, &miners),
            self.refresh(ReplicaClass::Sharder, &sharders)
        );
        miners?;
        let sharders = sharders?;

        match self.discover_storage_providers(&sharders).await {
            Ok(storage) => {
                info!(
                    "Bootstrapped {} miners, {} sharders, {} storage providers",
                    self.directory.len(ReplicaClass::Miner),
                    sharders.len(),
                    storage.len()
                );
                Ok(())
            }
            Err(e) if self.config.require_storage_providers => Err(e),
            Err(e) => {
                warn!("Continuing without storage providers: {}", e);
                self.directory.replace(ReplicaClass::StorageProvider, Vec::new());
                Ok(())
            }
        }
    }

    async fn discover_storage_providers(&self, sharders: &[Endpoint]) -> Result<Arc<[Endpoint]>> {
        let nodes = self.discovery.list_storage_providers(sharders).await?;
        let candidates = storage_endpoints(&nodes)?;
        self.refresh(ReplicaClass::StorageProvider, &candidates).await
    }

    /// Re-probes `candidates` and atomically replaces the class's list with
    /// the healthy subset. On failure the previous list is left in place.
    pub async fn refresh(&self, class: ReplicaClass, candidates: &[Endpoint]) -> Result<Arc<[Endpoint]>> {
        let healthy = self.prober.probe(candidates, &self.probe_strategy(class)).await?;
        self.directory.replace(class, healthy);
        Ok(self.directory.snapshot(class))
    }

    /// Probe results for diagnostics; the directory is not touched.
    pub async fn probe_report(&self, class: ReplicaClass, candidates: &[Endpoint]) -> Result<ProbeReport> {
        self.prober
            .probe_report(candidates, &self.probe_strategy(class))
            .await
    }

    pub fn probe_strategy(&self, class: ReplicaClass) -> ProbeStrategy {
        ProbeStrategy::for_class(class, self.config.storage_credentials.as_ref())
    }

    /// Fans `request` out to the current healthy replicas of `class`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        class: ReplicaClass,
        request: &ExecutionRequest<T>,
    ) -> Result<QuorumResponse<T>> {
        let endpoints = self.directory.snapshot(class);
        self.executor.execute(class, request, &endpoints).await
    }

    pub fn replicas(&self, class: ReplicaClass) -> Arc<[Endpoint]> {
        self.directory.snapshot(class)
    }

    pub fn directory(&self) -> &Arc<ReplicaDirectory> {
        &self.directory
    }

    pub fn executor(&self) -> &QuorumExecutor {
        &self.executor
    }

    pub fn poller(&self) -> ConfirmationPoller {
        ConfirmationPoller::new(self.config.confirmation_timeout).with_interval(self.config.poll_interval)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
