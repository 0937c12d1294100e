mod common;

use chain_quorum_client::{
    ClientError, EndpointError, ExecutionRequest, QuorumExecutor, ReplicaClass, RequiredOutcome,
};
use common::{hang_up, unreachable, MockReplica};
use mockito::Matcher;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize, PartialEq)]
struct Round {
    round: u64,
}

async fn replica(status: usize, body: &str) -> MockReplica {
    let mut replica = MockReplica::new().await;
    replica.respond("GET", "/v1/current-round", status, body).await;
    replica
}

fn executor() -> QuorumExecutor {
    QuorumExecutor::new(Client::new())
}

#[tokio::test]
async fn test_all_replicas_agree() {
    let replicas = vec![
        replica(200, r#"{"round":7}"#).await,
        replica(200, r#"{"round":7}"#).await,
        replica(200, r#"{"round":7}"#).await,
    ];
    let endpoints: Vec<_> = replicas.iter().map(MockReplica::endpoint).collect();

    let request: ExecutionRequest<Round> = ExecutionRequest::get("/v1/current-round");
    let result = executor()
        .execute(ReplicaClass::Sharder, &request, &endpoints)
        .await
        .unwrap();

    assert_eq!(result.tally.matched, 3);
    assert_eq!(result.response.endpoint, endpoints[0]);
    assert_eq!(result.value(), Some(&Round { round: 7 }));
    assert!(result.dominant_error.is_none());
    assert_eq!(result.response.text(), r#"{"round":7}"#);
    assert_eq!(result.response.json::<serde_json::Value>().unwrap(), json!({"round": 7}));
}

#[tokio::test]
async fn test_two_against_two_returns_first_match() {
    let replicas = vec![
        replica(400, r#"{"error":"not found"}"#).await,
        replica(200, r#"{"round":3}"#).await,
        replica(400, r#"{"error":"not found"}"#).await,
        replica(200, r#"{"round":4}"#).await,
    ];
    let endpoints: Vec<_> = replicas.iter().map(MockReplica::endpoint).collect();

    let request: ExecutionRequest<Round> = ExecutionRequest::get("/v1/current-round");
    let result = executor()
        .execute(ReplicaClass::Sharder, &request, &endpoints)
        .await
        .unwrap();

    assert_eq!(result.response.endpoint, endpoints[1]);
    assert_eq!(result.value(), Some(&Round { round: 3 }));
    assert_eq!(result.tally.matched, 2);
    assert_eq!(result.tally.mismatched, 2);
}

#[tokio::test]
async fn test_mismatch_majority_is_no_quorum() {
    let replicas = vec![
        replica(200, r#"{"round":3}"#).await,
        replica(400, "{}").await,
        replica(400, "{}").await,
    ];
    let endpoints: Vec<_> = replicas.iter().map(MockReplica::endpoint).collect();

    let request: ExecutionRequest<Round> = ExecutionRequest::get("/v1/current-round");
    let err = executor()
        .execute(ReplicaClass::Miner, &request, &endpoints)
        .await
        .unwrap_err();

    assert!(err.is_no_quorum());
    assert!(matches!(
        err,
        ClientError::NoQuorum {
            matched: 1,
            mismatched: 2,
            errors: 0,
            ..
        }
    ));
}

#[tokio::test]
async fn test_every_replica_unreachable() {
    let endpoints = vec![unreachable(), unreachable(), unreachable()];

    let request: ExecutionRequest<Round> = ExecutionRequest::get("/v1/current-round");
    let err = executor()
        .execute(ReplicaClass::Miner, &request, &endpoints)
        .await
        .unwrap_err();

    assert!(!err.is_no_quorum());
    assert!(matches!(
        err,
        ClientError::AllEndpointsFailed {
            class: ReplicaClass::Miner,
            error: EndpointError::Connect
        }
    ));
}

#[tokio::test]
async fn test_same_failure_on_different_replicas_is_counted_together() {
    let endpoints = vec![unreachable(), hang_up().await, hang_up().await];

    let request: ExecutionRequest<Round> = ExecutionRequest::get("/v1/current-round");
    let err = executor()
        .execute(ReplicaClass::Sharder, &request, &endpoints)
        .await
        .unwrap_err();

    match err {
        ClientError::AllEndpointsFailed { error, .. } => {
            assert_ne!(error, EndpointError::Connect);
            assert!(matches!(error, EndpointError::Transport(_)), "{error:?}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_raw_body_of_mismatching_replica() {
    let rejecting = replica(400, r#"{"error":"round not found"}"#).await;
    let accepting = replica(200, r#"{"round":2}"#).await;
    let endpoints = vec![rejecting.endpoint(), accepting.endpoint()];

    let request: ExecutionRequest<Round> = ExecutionRequest::get("/v1/current-round");
    let result = executor()
        .execute(ReplicaClass::Sharder, &request, &endpoints)
        .await
        .unwrap();
    assert_eq!(result.response.endpoint, endpoints[1]);
    assert_eq!(result.tally.mismatched, 1);

    let reject_only: ExecutionRequest<Round> =
        ExecutionRequest::get("/v1/current-round").expect_status(StatusCode::BAD_REQUEST);
    let result = executor()
        .execute(ReplicaClass::Sharder, &reject_only, &endpoints)
        .await
        .unwrap();

    assert_eq!(result.response.endpoint, endpoints[0]);
    assert!(result.value().is_none());
    assert!(result.response.text().contains("round not found"));
    let body: serde_json::Value = result.response.json().unwrap();
    assert_eq!(body["error"], "round not found");
}

#[tokio::test]
async fn test_decode_failure_joins_error_set() {
    let replicas = vec![
        replica(200, "<html>maintenance</html>").await,
        replica(200, r#"{"round":9}"#).await,
    ];
    let endpoints: Vec<_> = replicas.iter().map(MockReplica::endpoint).collect();

    let request: ExecutionRequest<Round> = ExecutionRequest::get("/v1/current-round");
    let result = executor()
        .execute(ReplicaClass::Sharder, &request, &endpoints)
        .await
        .unwrap();

    assert_eq!(result.response.endpoint, endpoints[1]);
    assert_eq!(result.tally.errors, 1);
    assert!(matches!(result.dominant_error, Some(EndpointError::Decode(_))));
}

#[tokio::test]
async fn test_unreachable_minority_does_not_block_quorum() {
    let up = replica(200, r#"{"round":1}"#).await;
    let endpoints = vec![unreachable(), up.endpoint()];

    let request: ExecutionRequest<Round> = ExecutionRequest::get("/v1/current-round");
    let result = executor()
        .execute(ReplicaClass::Sharder, &request, &endpoints)
        .await
        .unwrap();

    assert_eq!(result.tally.matched, 1);
    assert_eq!(result.dominant_error, Some(EndpointError::Connect));
}

#[tokio::test]
async fn test_predicate_outcome_on_decoded_body() {
    let replicas = vec![
        replica(200, r#"{"round":5}"#).await,
        replica(200, r#"{"round":6}"#).await,
        replica(200, r#"{"round":6}"#).await,
    ];
    let endpoints: Vec<_> = replicas.iter().map(MockReplica::endpoint).collect();

    let request: ExecutionRequest<Round> = ExecutionRequest::get("/v1/current-round")
        .expect(RequiredOutcome::satisfies(|r: &Round| r.round >= 6));
    let result = executor()
        .execute(ReplicaClass::Sharder, &request, &endpoints)
        .await
        .unwrap();

    assert_eq!(result.response.endpoint, endpoints[1]);
    assert_eq!(result.tally.matched, 2);
    assert_eq!(result.tally.mismatched, 1);
}

#[tokio::test]
async fn test_post_sends_json_body_and_query() {
    let mut miner = MockReplica::new().await;
    let mock = miner
        .server
        .mock("POST", "/v1/transaction/put")
        .match_query(Matcher::UrlEncoded("mode".into(), "async".into()))
        .match_header("x-test", "1")
        .match_body(Matcher::Json(json!({"hash": "abc", "nonce": 2})))
        .with_status(201)
        .expect(1)
        .create_async()
        .await;

    let request: ExecutionRequest = ExecutionRequest::post("/v1/transaction/put")
        .query("mode", "async")
        .header("x-test", "1")
        .json_body(&json!({"hash": "abc", "nonce": 2}))
        .unwrap()
        .expect_status(StatusCode::CREATED)
        .skip_decode();

    let result = executor()
        .execute(ReplicaClass::Miner, &request, &[miner.endpoint()])
        .await
        .unwrap();

    assert_eq!(result.response.status, StatusCode::CREATED);
    mock.assert_async().await;
}
