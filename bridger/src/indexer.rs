use std::time::Duration;

use alloy::primitives::TxHash;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const PACKET_HASH_QUERY: &str = r#"
query ($submission_tx_hash: String!) {
  v2_transfers(args: {p_transaction_hash: $submission_tx_hash}) {
    packet_hash
  }
}"#;

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<TransfersData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct TransfersData {
    #[serde(default)]
    v2_transfers: Vec<Transfer>,
}

#[derive(Debug, Deserialize)]
struct Transfer {
    packet_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

/// Looks up the cross-chain packet hash for a submission on the bridge indexer.
pub struct Indexer {
    client: Client,
    endpoint: String,
    attempts: u32,
    interval: Duration,
}

impl Indexer {
    /// `request_timeout` bounds each POST so a hung indexer still spends an attempt.
    pub fn new(
        endpoint: impl Into<String>,
        attempts: u32,
        interval: Duration,
        request_timeout: Duration,
    ) -> eyre::Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            attempts,
            interval,
        })
    }

    /// Polls until the indexer reports a packet hash for `tx_hash`.
    ///
    /// Returns `None` once all attempts are spent. Transport and GraphQL
    /// errors count as a spent attempt.
    pub async fn packet_hash(&self, tx_hash: TxHash) -> eyre::Result<Option<String>> {
        for attempt in 1..=self.attempts {
            match self.query(tx_hash).await {
                Ok(Some(hash)) => return Ok(Some(hash)),
                Ok(None) => tracing::debug!(attempt, %tx_hash, "packet not indexed yet"),
                Err(e) => tracing::warn!(attempt, %tx_hash, error = %e, "indexer query failed"),
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        Ok(None)
    }

    async fn query(&self, tx_hash: TxHash) -> eyre::Result<Option<String>> {
        let body = json!({
            "query": PACKET_HASH_QUERY,
            "variables": { "submission_tx_hash": tx_hash.to_string() },
        });
        let response: GraphqlResponse = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.errors.first() {
            eyre::bail!("graphql error: {}", error.message);
        }
        Ok(response
            .data
            .into_iter()
            .flat_map(|d| d.v2_transfers)
            .find_map(|t| t.packet_hash))
    }
}
