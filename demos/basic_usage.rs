use chain_quorum_client::{
    BasicAuth, ClientConfig, NetworkClient, ReplicaClass, ReplicaHealth, Transaction,
    TransactionStatus,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let network_url =
        std::env::var("NETWORK_URL").unwrap_or_else(|_| "https://network.example.com".to_string());

    let config = ClientConfig::new(network_url)
        .with_request_timeout(Duration::from_secs(30))
        .with_confirmation_timeout(Duration::from_secs(120))
        .with_poll_interval(Duration::from_secs(1))
        .with_storage_credentials(BasicAuth::new("admin", "admin"))
        .with_require_storage_providers(false);

    println!("Connecting to {}...", config.network_url);

    let client = NetworkClient::connect(config).await?;

    println!("\nHealthy replicas:");
    println!("{:-<60}", "");
    for class in ReplicaClass::ALL {
        let replicas = client.replicas(class);
        println!("  {:<18} {}", class, replicas.len());
        for endpoint in replicas.iter() {
            println!("    {}", endpoint);
        }
    }
    println!("{:-<60}", "");

    let miners: Vec<_> = client.replicas(ReplicaClass::Miner).to_vec();
    let report = client.probe_report(ReplicaClass::Miner, &miners).await?;
    for result in &report.results {
        let status_str = match &result.health {
            ReplicaHealth::Healthy => "✓ Healthy".to_string(),
            ReplicaHealth::Unhealthy(status) => format!("⚠ {status}"),
            ReplicaHealth::Unreachable(error) => format!("✗ {error}"),
        };
        println!("  {} - {} ({:?})", status_str, result.endpoint, result.latency);
    }

    let Ok(raw) = std::env::var("SIGNED_TRANSACTION") else {
        println!("\nSet SIGNED_TRANSACTION to a signed transaction JSON to submit it.");
        return Ok(());
    };

    let transaction: Transaction = serde_json::from_str(&raw)?;
    match client
        .execute_transaction(&transaction, TransactionStatus::Success)
        .await
    {
        Ok(Some(confirmation)) => println!(
            "Transaction {} confirmed in round {}",
            confirmation.transaction.hash, confirmation.round
        ),
        Ok(None) => println!("Transaction {} not confirmed in time", transaction.hash),
        Err(e) if e.is_no_quorum() => println!("Miners disagreed: {e}"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
