//! Quorum fan-out execution.
//!
//! A request is sent to every endpoint of one replica class, each answer is
//! classified against the request's [`RequiredOutcome`], and a single
//! representative response is chosen from the tally.
//!
//! Requests are issued concurrently, but outcomes are collected in issue order
//! (`join_all` preserves input order), so "first match wins" and the error
//! tie-break depend only on the endpoint order, never on completion order.
//!
//! [`RequiredOutcome`]: crate::request::RequiredOutcome

use crate::aggregate::dominant;
use crate::endpoint::Endpoint;
use crate::error::{ClientError, EndpointError, Result};
use crate::replica::ReplicaClass;
use crate::request::{ExecutionOutcome, ExecutionRequest, ReplicaResponse, RequestBody};

use futures::future::join_all;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

/// Match/mismatch/error counts of one fan-out call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub matched: usize,
    pub mismatched: usize,
    pub errors: usize,
}

/// Whether disagreeing replicas outvote agreeing ones.
///
/// Only a strict majority of mismatches fails the call: a tie between matches
/// and mismatches resolves in favor of the matched response. Existing test
/// expectations depend on this asymmetry; do not change it to `>=`.
pub fn mismatch_dominates(matched: usize, mismatched: usize) -> bool {
    mismatched > matched
}

/// Result of a fan-out call that reached quorum.
#[derive(Debug, Clone)]
pub struct QuorumResponse<T> {
    /// First response, in endpoint order, that satisfied the required outcome.
    pub response: ReplicaResponse<T>,
    /// Most frequent transport/decode error among the other endpoints, if
    /// any failed. Informational only.
    pub dominant_error: Option<EndpointError>,
    pub tally: Tally,
}

impl<T> QuorumResponse<T> {
    pub fn value(&self) -> Option<&T> {
        self.response.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.response.value
    }
}

/// Reduces per-endpoint outcomes, given in issue order, to one result.
pub fn resolve<T>(class: ReplicaClass, outcomes: Vec<ExecutionOutcome<T>>) -> Result<QuorumResponse<T>> {
    let mut tally = Tally::default();
    let mut representative: Option<ReplicaResponse<T>> = None;
    let mut errors: Vec<EndpointError> = Vec::new();

    for outcome in outcomes {
        match outcome {
            ExecutionOutcome::Response { response, satisfied } => {
                if satisfied {
                    tally.matched += 1;
                    if representative.is_none() {
                        representative = Some(response);
                    }
                } else {
                    tally.mismatched += 1;
                }
            }
            ExecutionOutcome::Failed { error, .. } => {
                tally.errors += 1;
                errors.push(error);
            }
        }
    }

    let dominant_error = dominant(&errors).cloned();

    if mismatch_dominates(tally.matched, tally.mismatched) {
        warn!(
            "No quorum among {} replicas: {} matched, {} mismatched, {} failed",
            class, tally.matched, tally.mismatched, tally.errors
        );
        return Err(ClientError::NoQuorum {
            class,
            matched: tally.matched,
            mismatched: tally.mismatched,
            errors: tally.errors,
        });
    }

    match (representative, dominant_error) {
        (Some(response), dominant_error) => {
            debug!(
                "Quorum reached among {} replicas via {}: {:?}",
                class, response.endpoint, tally
            );
            Ok(QuorumResponse {
                response,
                dominant_error,
                tally,
            })
        }
        (None, Some(error)) => {
            warn!("Every {} replica failed, dominant error: {}", class, error);
            Err(ClientError::AllEndpointsFailed { class, error })
        }
        (None, None) => Err(ClientError::NoEndpoints { class }),
    }
}

/// Sends one logical request to a set of replicas and aggregates the answers.
#[derive(Debug, Clone)]
pub struct QuorumExecutor {
    client: Client,
}

impl QuorumExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fans `request` out to every endpoint and resolves the outcome.
    ///
    /// Per-endpoint transport and decode failures never abort the call. Hard
    /// errors are limited to an empty endpoint list and endpoints the request
    /// cannot be resolved against; both are reported before anything is sent.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        class: ReplicaClass,
        request: &ExecutionRequest<T>,
        endpoints: &[Endpoint],
    ) -> Result<QuorumResponse<T>> {
        if endpoints.is_empty() {
            return Err(ClientError::NoEndpoints { class });
        }

        let targets: Vec<(&Endpoint, Url)> = endpoints
            .iter()
            .map(|endpoint| request.url_for(endpoint).map(|url| (endpoint, url)))
            .collect::<Result<_>>()?;

        debug!(
            "Fanning out {} {} to {} {} replicas",
            request.method(),
            request.path(),
            targets.len(),
            class
        );

        let futures = targets
            .into_iter()
            .map(|(endpoint, url)| self.send_one(request, endpoint, url));

        let outcomes = join_all(futures).await;

        resolve(class, outcomes)
    }

    async fn send_one<T: DeserializeOwned>(
        &self,
        request: &ExecutionRequest<T>,
        endpoint: &Endpoint,
        url: Url,
    ) -> ExecutionOutcome<T> {
        let mut builder = self.client.request(request.method().clone(), url);

        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(auth) = request.auth() {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }
        builder = match request.body() {
            Some(RequestBody::Json(body)) => builder.json(body),
            Some(RequestBody::Form(pairs)) => builder.form(pairs),
            None => builder,
        };

        let failed = |error: EndpointError| {
            debug!("Request to {} failed: {}", endpoint, error);
            ExecutionOutcome::Failed {
                endpoint: endpoint.clone(),
                error,
            }
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return failed(e.into()),
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return failed(e.into()),
        };

        let value = match request.decode(status, &body) {
            Ok(value) => value,
            Err(e) => return failed(e),
        };

        let satisfied = request.required().is_satisfied_by(status, value.as_ref());
        debug!(
            "Response from {}: status={}, satisfied={}",
            endpoint, status, satisfied
        );

        ExecutionOutcome::Response {
            response: ReplicaResponse {
                endpoint: endpoint.clone(),
                status,
                body,
                value,
            },
            satisfied,
        }
    }
}
