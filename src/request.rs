//! Request descriptors for fan-out calls.
//!
//! An [`ExecutionRequest`] describes one logical operation independently of
//! the replica it is sent to, together with the [`RequiredOutcome`] that
//! decides whether a replica's answer counts as a match.

use crate::config::BasicAuth;
use crate::endpoint::{Endpoint, UrlBuilder};
use crate::error::{EndpointError, Result};
use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// Predicate a single replica response must satisfy to count as a match.
pub enum RequiredOutcome<T> {
    /// Status code equals the given one. The decoded body is not consulted.
    Status(StatusCode),
    /// A 2xx response whose decoded body satisfies the predicate.
    Satisfies(Arc<dyn Fn(&T) -> bool + Send + Sync>),
}

impl<T> RequiredOutcome<T> {
    pub fn success() -> Self {
        RequiredOutcome::Status(StatusCode::OK)
    }

    pub fn status(code: StatusCode) -> Self {
        RequiredOutcome::Status(code)
    }

    pub fn satisfies<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        RequiredOutcome::Satisfies(Arc::new(predicate))
    }

    pub fn is_satisfied_by(&self, status: StatusCode, value: Option<&T>) -> bool {
        match self {
            RequiredOutcome::Status(expected) => status == *expected,
            RequiredOutcome::Satisfies(predicate) => {
                status.is_success() && value.is_some_and(|v| predicate(v))
            }
        }
    }
}

impl<T> Clone for RequiredOutcome<T> {
    fn clone(&self) -> Self {
        match self {
            RequiredOutcome::Status(code) => RequiredOutcome::Status(*code),
            RequiredOutcome::Satisfies(predicate) => RequiredOutcome::Satisfies(Arc::clone(predicate)),
        }
    }
}

impl<T> fmt::Debug for RequiredOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequiredOutcome::Status(code) => f.debug_tuple("Status").field(code).finish(),
            RequiredOutcome::Satisfies(_) => f.write_str("Satisfies(..)"),
        }
    }
}

/// One logical operation, sent unchanged to every endpoint of a fan-out.
///
/// `T` is the type 2xx bodies are decoded into. Use `serde_json::Value` with
/// [`ExecutionRequest::skip_decode`] when only the status matters.
pub struct ExecutionRequest<T = serde_json::Value> {
    method: Method,
    path: String,
    path_vars: Vec<(String, String)>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<RequestBody>,
    basic_auth: Option<BasicAuth>,
    required: RequiredOutcome<T>,
    decode: bool,
}

impl<T> ExecutionRequest<T> {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            path_vars: Vec::new(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            basic_auth: None,
            required: RequiredOutcome::success(),
            decode: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn path_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_vars.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    pub fn form_body(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(pairs));
        self
    }

    pub fn basic_auth(mut self, auth: BasicAuth) -> Self {
        self.basic_auth = Some(auth);
        self
    }

    pub fn expect(mut self, required: RequiredOutcome<T>) -> Self {
        self.required = required;
        self
    }

    pub fn expect_status(self, status: StatusCode) -> Self {
        self.expect(RequiredOutcome::Status(status))
    }

    pub fn skip_decode(mut self) -> Self {
        self.decode = false;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn required(&self) -> &RequiredOutcome<T> {
        &self.required
    }

    pub(crate) fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub(crate) fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub(crate) fn auth(&self) -> Option<&BasicAuth> {
        self.basic_auth.as_ref()
    }

    /// Resolves the request against one endpoint.
    pub fn url_for(&self, endpoint: &Endpoint) -> Result<Url> {
        let mut builder = UrlBuilder::for_endpoint(endpoint).set_path(self.path.clone());
        for (name, value) in &self.path_vars {
            builder = builder.set_path_variable(name, value);
        }
        for (name, value) in &self.query {
            builder = builder.add_param(name.clone(), value.clone());
        }
        builder.build_url()
    }
}

impl<T: DeserializeOwned> ExecutionRequest<T> {
    /// Decodes a body the way this request expects: only 2xx, non-empty
    /// bodies are decoded, and only when decoding is enabled.
    pub(crate) fn decode(&self, status: StatusCode, body: &Bytes) -> std::result::Result<Option<T>, EndpointError> {
        if !self.decode || !status.is_success() || body.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(body).map(Some).map_err(EndpointError::from)
    }
}

impl<T> Clone for ExecutionRequest<T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            path: self.path.clone(),
            path_vars: self.path_vars.clone(),
            query: self.query.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            basic_auth: self.basic_auth.clone(),
            required: self.required.clone(),
            decode: self.decode,
        }
    }
}

impl<T> fmt::Debug for ExecutionRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("path_vars", &self.path_vars)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("required", &self.required)
            .finish()
    }
}

/// A response obtained from one replica.
#[derive(Debug, Clone)]
pub struct ReplicaResponse<T> {
    pub endpoint: Endpoint,
    pub status: StatusCode,
    pub body: Bytes,
    /// Decoded body, present for decoded 2xx responses.
    pub value: Option<T>,
}

impl<T> ReplicaResponse<T> {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<U: DeserializeOwned>(&self) -> std::result::Result<U, EndpointError> {
        serde_json::from_slice(&self.body).map_err(EndpointError::from)
    }
}

/// Per-endpoint result of one fan-out call.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome<T> {
    Response {
        response: ReplicaResponse<T>,
        satisfied: bool,
    },
    Failed {
        endpoint: Endpoint,
        error: EndpointError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Status {
        status: u8,
    }

    #[test]
    fn test_status_outcome_ignores_body() {
        let required: RequiredOutcome<Status> = RequiredOutcome::status(StatusCode::ACCEPTED);
        assert!(required.is_satisfied_by(StatusCode::ACCEPTED, None));
        assert!(!required.is_satisfied_by(StatusCode::OK, Some(&Status { status: 1 })));
    }

    #[test]
    fn test_predicate_outcome_needs_decoded_success() {
        let required = RequiredOutcome::satisfies(|s: &Status| s.status == 1);
        assert!(required.is_satisfied_by(StatusCode::OK, Some(&Status { status: 1 })));
        assert!(!required.is_satisfied_by(StatusCode::OK, Some(&Status { status: 2 })));
        assert!(!required.is_satisfied_by(StatusCode::OK, None));
        assert!(!required.is_satisfied_by(StatusCode::BAD_REQUEST, Some(&Status { status: 1 })));
    }

    #[test]
    fn test_url_for_endpoint() {
        let endpoint = Endpoint::parse("http://127.0.0.1:7171/sharder01").unwrap();
        let request: ExecutionRequest = ExecutionRequest::get("/v1/transaction/get/:kind")
            .path_variable("kind", "confirmation")
            .query("hash", "abc");

        let url = request.url_for(&endpoint).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:7171/sharder01/v1/transaction/get/confirmation?hash=abc"
        );
    }

    #[test]
    fn test_decode_only_success_bodies() {
        let request: ExecutionRequest<Status> = ExecutionRequest::get("/");

        let ok = request
            .decode(StatusCode::OK, &Bytes::from_static(br#"{"status":1}"#))
            .unwrap();
        assert_eq!(ok, Some(Status { status: 1 }));

        let not_found = request
            .decode(StatusCode::NOT_FOUND, &Bytes::from_static(b"not json"))
            .unwrap();
        assert_eq!(not_found, None);

        let empty = request.decode(StatusCode::OK, &Bytes::new()).unwrap();
        assert_eq!(empty, None);

        assert!(matches!(
            request.decode(StatusCode::OK, &Bytes::from_static(b"<html>")),
            Err(EndpointError::Decode(_))
        ));
    }

    #[test]
    fn test_skip_decode() {
        let request: ExecutionRequest<Status> = ExecutionRequest::get("/").skip_decode();
        let decoded = request
            .decode(StatusCode::OK, &Bytes::from_static(b"<html>"))
            .unwrap();
        assert_eq!(decoded, None);
    }
}
