use crate::replica::ReplicaClass;
use thiserror::Error;

/// Failure observed against a single replica during a fan-out or probe.
///
/// Values compare by kind and message so that the error aggregator can count
/// repeated occurrences of "the same" failure across endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum EndpointError {
    #[error("connection refused or unreachable")]
    Connect,

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for EndpointError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() {
            EndpointError::Connect
        } else if error.is_timeout() {
            EndpointError::Timeout
        } else if error.is_decode() {
            EndpointError::Decode(error.without_url().to_string())
        } else if error.is_request() {
            EndpointError::Transport("request failed".to_string())
        } else if error.is_body() {
            EndpointError::Transport("response body error".to_string())
        } else if error.is_redirect() {
            EndpointError::Transport("too many redirects".to_string())
        } else {
            // The URL differs per replica and would keep equal failures apart.
            EndpointError::Transport(error.without_url().to_string())
        }
    }
}

impl From<serde_json::Error> for EndpointError {
    fn from(error: serde_json::Error) -> Self {
        EndpointError::Decode(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("malformed endpoint {input:?}: {reason}")]
    MalformedEndpoint { input: String, reason: String },

    #[error("no {class} endpoints to fan out to")]
    NoEndpoints { class: ReplicaClass },

    #[error("no quorum among {class} replicas: {matched} matched, {mismatched} mismatched, {errors} failed")]
    NoQuorum {
        class: ReplicaClass,
        matched: usize,
        mismatched: usize,
        errors: usize,
    },

    #[error("every {class} replica failed: {error}")]
    AllEndpointsFailed {
        class: ReplicaClass,
        error: EndpointError,
    },

    #[error("{class} replica matched without a decodable body")]
    EmptyBody { class: ReplicaClass },

    #[error("no healthy {class} replicas out of {probed} probed")]
    NoHealthyReplicas { class: ReplicaClass, probed: usize },

    #[error("discovery failed: {0}")]
    Discovery(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build http client: {0}")]
    HttpClient(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    pub(crate) fn malformed(input: impl Into<String>, reason: impl ToString) -> Self {
        ClientError::MalformedEndpoint {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    /// Replicas answered but actively disagreed with the expected outcome.
    pub fn is_no_quorum(&self) -> bool {
        matches!(self, ClientError::NoQuorum { .. })
    }

    /// The target network itself is unusable; retrying without operator
    /// intervention is pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::NoHealthyReplicas { .. }
                | ClientError::Discovery(_)
                | ClientError::InvalidConfig(_)
                | ClientError::HttpClient(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
