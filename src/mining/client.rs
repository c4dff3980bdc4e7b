use async_trait::async_trait;
use log::debug;
use primitive_types::U256;
use std::time::Duration;

use super::MinerError;
use crate::blockchain::Block;
use crate::blockchain::target::parse_published_target;

/// Requests to the node give up after this long.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// What the miner needs from a ledger node.
#[async_trait]
pub trait LedgerBoundary: Send + Sync {
    async fn newest_block(&self) -> Result<Block, MinerError>;

    async fn target(&self) -> Result<U256, MinerError>;

    /// Submit a finished block and return the node's response body as-is,
    /// whether the block was accepted or not.
    async fn submit_block(&self, block: &Block) -> Result<String, MinerError>;
}

/// [`LedgerBoundary`] over the node's HTTP interface.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLedger {
    pub fn new(base_url: impl Into<String>) -> Result<Self, MinerError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| MinerError::Network {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_text(&self, path: &str) -> Result<(String, String), MinerError> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| MinerError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| MinerError::Network {
            url: url.clone(),
            source,
        })?;
        if !status.is_success() {
            return Err(MinerError::Protocol {
                url,
                reason: format!("HTTP {status}: {body}"),
            });
        }
        Ok((url, body))
    }
}

#[async_trait]
impl LedgerBoundary for HttpLedger {
    async fn newest_block(&self) -> Result<Block, MinerError> {
        let (url, body) = self.get_text("/blocks/newest").await?;
        serde_json::from_str(&body).map_err(|e| MinerError::Protocol {
            url,
            reason: format!("could not decode block: {e}"),
        })
    }

    async fn target(&self) -> Result<U256, MinerError> {
        let (_, body) = self.get_text("/difficulty").await?;
        debug!("node published target {}", body.trim());
        Ok(parse_published_target(&body)?)
    }

    async fn submit_block(&self, block: &Block) -> Result<String, MinerError> {
        let url = self.url("/blocks/new");
        let response = self
            .client
            .post(&url)
            .json(block)
            .send()
            .await
            .map_err(|source| MinerError::Network {
                url: url.clone(),
                source,
            })?;
        response
            .text()
            .await
            .map_err(|source| MinerError::Network { url, source })
    }
}
