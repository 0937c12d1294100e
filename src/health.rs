//! Replica health probing.
//!
//! Each candidate gets exactly one probe request per round. A candidate is
//! healthy iff the probe returns a 2xx status before the probe timeout;
//! anything else is logged and the candidate is left out, without retries.

use crate::endpoint::{Endpoint, UrlBuilder};
use crate::error::{ClientError, EndpointError, Result};
use crate::replica::{ProbeStrategy, ReplicaClass};

use futures::future::join_all;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaHealth {
    Healthy,
    /// Responded, but with a non-2xx status.
    Unhealthy(StatusCode),
    /// No response was obtained.
    Unreachable(EndpointError),
}

impl ReplicaHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ReplicaHealth::Healthy)
    }
}

impl fmt::Display for ReplicaHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicaHealth::Healthy => write!(f, "healthy"),
            ReplicaHealth::Unhealthy(status) => write!(f, "unhealthy ({status})"),
            ReplicaHealth::Unreachable(error) => write!(f, "unreachable ({error})"),
        }
    }
}

/// Result of probing a single candidate.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub endpoint: Endpoint,
    pub health: ReplicaHealth,
    pub latency: Duration,
}

/// Per-candidate results of one probe round, in candidate order.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub class: ReplicaClass,
    pub results: Vec<ProbeResult>,
}

impl ProbeReport {
    pub fn healthy(&self) -> Vec<Endpoint> {
        self.results
            .iter()
            .filter(|r| r.health.is_healthy())
            .map(|r| r.endpoint.clone())
            .collect()
    }

    pub fn healthy_count(&self) -> usize {
        self.results.iter().filter(|r| r.health.is_healthy()).count()
    }

    /// Healthy subset, or a fatal error when nothing survived.
    pub fn into_healthy(self) -> Result<Vec<Endpoint>> {
        let healthy = self.healthy();
        if healthy.is_empty() {
            return Err(ClientError::NoHealthyReplicas {
                class: self.class,
                probed: self.results.len(),
            });
        }
        Ok(healthy)
    }
}

#[derive(Debug, Clone)]
pub struct HealthProber {
    client: Client,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Probes every candidate concurrently and returns the healthy subset in
    /// candidate order.
    ///
    /// An empty healthy subset is a [`ClientError::NoHealthyReplicas`]: callers
    /// must not continue with zero replicas for a class.
    pub async fn probe(&self, candidates: &[Endpoint], strategy: &ProbeStrategy) -> Result<Vec<Endpoint>> {
        let report = self.probe_report(candidates, strategy).await?;
        let healthy = report.into_healthy()?;
        info!(
            "{} of {} {} candidates healthy",
            healthy.len(),
            candidates.len(),
            strategy.class
        );
        Ok(healthy)
    }

    pub async fn probe_report(&self, candidates: &[Endpoint], strategy: &ProbeStrategy) -> Result<ProbeReport> {
        let targets = candidates
            .iter()
            .map(|endpoint| {
                UrlBuilder::for_endpoint(endpoint)
                    .set_path(strategy.path.clone())
                    .build_url()
                    .map(|url| (endpoint, url))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Probing {} {} candidates at {}",
            targets.len(),
            strategy.class,
            strategy.path
        );

        let futures = targets.into_iter().map(|(endpoint, url)| async move {
            let start = Instant::now();

            let mut request = self.client.get(url);
            if let Some(auth) = &strategy.auth {
                request = request.basic_auth(&auth.username, Some(&auth.password));
            }

            let health = match tokio::time::timeout(self.timeout, request.send()).await {
                Ok(Ok(response)) if response.status().is_success() => ReplicaHealth::Healthy,
                Ok(Ok(response)) => ReplicaHealth::Unhealthy(response.status()),
                Ok(Err(e)) => ReplicaHealth::Unreachable(e.into()),
                Err(_) => ReplicaHealth::Unreachable(EndpointError::Timeout),
            };
            let latency = start.elapsed();

            if health.is_healthy() {
                debug!("{} {} is healthy (latency: {:?})", strategy.class, endpoint, latency);
            } else {
                warn!("{} {} failed health probe: {}", strategy.class, endpoint, health);
            }

            ProbeResult {
                endpoint: endpoint.clone(),
                health,
                latency,
            }
        });

        let results = join_all(futures).await;

        Ok(ProbeReport {
            class: strategy.class,
            results,
        })
    }
}
