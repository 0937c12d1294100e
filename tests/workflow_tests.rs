mod common;

use chain_quorum_client::{
    ClientError, NetworkClient, ReplicaClass, Transaction, TransactionStatus, Wallet,
};
use common::{test_config, unreachable, MockReplica};
use serde_json::json;
use std::time::{Duration, Instant};

fn confirmation_body(hash: &str, status: i64) -> String {
    json!({
        "confirmation": {
            "hash": hash,
            "block_hash": "b10c",
            "round": 1200,
            "transaction": {
                "hash": hash,
                "transaction_status": status,
                "transaction_output": "ok"
            }
        }
    })
    .to_string()
}

async fn miner_accepting(hash: &str) -> MockReplica {
    let mut miner = MockReplica::new().await;
    let body = json!({"async": true, "entity": {"hash": hash}}).to_string();
    miner.respond("POST", "/v1/transaction/put", 200, &body).await;
    miner
}

async fn sharder_reporting(hash: &str, status: i64) -> MockReplica {
    let mut sharder = MockReplica::new().await;
    sharder
        .respond(
            "GET",
            "/v1/transaction/get/confirmation",
            200,
            &confirmation_body(hash, status),
        )
        .await;
    sharder
}

fn transaction(hash: &str) -> Transaction {
    serde_json::from_value(json!({"hash": hash, "nonce": 1, "transaction_value": 0})).unwrap()
}

fn client_with(miners: &[&MockReplica], sharders: Vec<chain_quorum_client::Endpoint>) -> NetworkClient {
    let client = NetworkClient::new(test_config(common::UNREACHABLE)).unwrap();
    client.directory().replace(
        ReplicaClass::Miner,
        miners.iter().map(|m| m.endpoint()).collect(),
    );
    client.directory().replace(ReplicaClass::Sharder, sharders);
    client
}

#[tokio::test]
async fn test_submit_and_confirm_with_one_sharder_down() {
    let hash = "f00d";
    let m1 = miner_accepting(hash).await;
    let m2 = miner_accepting(hash).await;
    let m3 = miner_accepting(hash).await;
    let s1 = sharder_reporting(hash, 1).await;
    let s2 = sharder_reporting(hash, 1).await;

    let client = client_with(
        &[&m1, &m2, &m3],
        vec![s1.endpoint(), unreachable(), s2.endpoint()],
    );

    let submitted = client.submit_transaction(&transaction(hash)).await.unwrap();
    assert_eq!(submitted.tally.matched, 3);
    assert_eq!(submitted.value().unwrap().entity.hash, hash);

    let confirmation = client
        .execute_transaction(&transaction(hash), TransactionStatus::Success)
        .await
        .unwrap()
        .expect("confirmed");

    assert_eq!(confirmation.round, 1200);
    assert_eq!(
        confirmation.transaction.status(),
        Some(TransactionStatus::Success)
    );
}

#[tokio::test]
async fn test_check_confirmation_tallies_sharders() {
    let hash = "beef";
    let s1 = sharder_reporting(hash, 1).await;
    let s2 = sharder_reporting(hash, 1).await;
    let client = client_with(&[], vec![s1.endpoint(), unreachable(), s2.endpoint()]);

    let confirmation = client
        .check_confirmation(hash, TransactionStatus::Success)
        .await
        .unwrap();
    assert_eq!(confirmation.hash, hash);
}

#[tokio::test]
async fn test_sharders_disagreeing_on_status() {
    let hash = "cafe";
    let s1 = sharder_reporting(hash, 1).await;
    let s2 = sharder_reporting(hash, 2).await;
    let s3 = sharder_reporting(hash, 2).await;
    let client = client_with(&[], vec![s1.endpoint(), s2.endpoint(), s3.endpoint()]);

    let err = client
        .check_confirmation(hash, TransactionStatus::Success)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::NoQuorum {
            class: ReplicaClass::Sharder,
            matched: 1,
            mismatched: 2,
            ..
        }
    ));

    let failed = client
        .check_confirmation(hash, TransactionStatus::Failure)
        .await
        .unwrap();
    assert_eq!(failed.transaction.status(), Some(TransactionStatus::Failure));
}

#[tokio::test]
async fn test_confirmation_timeout_is_not_an_error() {
    let hash = "dead";
    let mut pending = MockReplica::new().await;
    pending
        .respond(
            "GET",
            "/v1/transaction/get/confirmation",
            400,
            r#"{"error":"entity not found"}"#,
        )
        .await;

    let client = NetworkClient::new(
        test_config(common::UNREACHABLE).with_confirmation_timeout(Duration::from_millis(400)),
    )
    .unwrap();
    client
        .directory()
        .replace(ReplicaClass::Sharder, vec![pending.endpoint()]);

    let start = Instant::now();
    let confirmation = client
        .confirm_transaction(hash, TransactionStatus::Success)
        .await;

    assert!(confirmation.is_none());
    assert!(start.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_submit_rejected_by_miner_majority() {
    let hash = "0bad";
    let accepting = miner_accepting(hash).await;
    let mut r1 = MockReplica::new().await;
    r1.respond("POST", "/v1/transaction/put", 400, r#"{"error":"nonce"}"#)
        .await;
    let mut r2 = MockReplica::new().await;
    r2.respond("POST", "/v1/transaction/put", 400, r#"{"error":"nonce"}"#)
        .await;

    let client = client_with(&[&accepting, &r1, &r2], Vec::new());
    let err = client
        .submit_transaction(&transaction(hash))
        .await
        .unwrap_err();

    assert!(err.is_no_quorum());
}

#[tokio::test]
async fn test_register_wallet() {
    let mut m1 = MockReplica::new().await;
    m1.respond("POST", "/v1/client/put", 200, "").await;
    let mut m2 = MockReplica::new().await;
    m2.respond("POST", "/v1/client/put", 200, "").await;

    let client = client_with(&[&m1, &m2], Vec::new());
    let wallet: Wallet =
        serde_json::from_value(json!({"id": "w1", "public_key": "pk", "version": "1.0"})).unwrap();

    let response = client.register_wallet(&wallet).await.unwrap();
    assert_eq!(response.tally.matched, 2);
}

#[tokio::test]
async fn test_get_balance() {
    let mut s1 = MockReplica::new().await;
    s1.respond(
        "GET",
        "/v1/client/get/balance",
        200,
        r#"{"txn":"t","round":10,"balance":5000,"nonce":2}"#,
    )
    .await;

    let client = client_with(&[], vec![s1.endpoint()]);
    let balance = client.get_balance("w1").await.unwrap();

    assert_eq!(balance.balance, 5000);
    assert_eq!(balance.nonce, 2);
}
