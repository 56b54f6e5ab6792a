use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::AppError;
use crate::external::retry::with_retry;
use crate::models::RawTransfer;

/// Source of on-chain block numbers and ERC-20 transfer logs. Abstracts
/// Etherscan's HTTP API the way the teacher's `PriceProvider` abstracts
/// Twelve Data/Alpha Vantage (spec §4.2).
#[async_trait]
pub trait BlockExplorerClient: Send + Sync {
    async fn block_at(&self, timestamp: i64) -> Result<i64, AppError>;

    /// One page (ascending by block number, bounded by `[from_block,
    /// to_block]`) of up to `page_size` ERC-20 `Transfer` logs for
    /// `address`. The collector advances `from_block` to the last
    /// returned tx's block number when a page comes back full (spec
    /// §4.5).
    async fn token_transfers(
        &self,
        address: &str,
        from_block: i64,
        to_block: i64,
        page_size: u32,
    ) -> Result<Vec<RawTransfer>, AppError>;
}

pub struct EtherscanClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl EtherscanClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: "https://api.etherscan.io/api".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EtherscanEnvelope<T> {
    status: String,
    message: String,
    result: T,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BlockNoResult {
    Found(String),
    Err(String),
}

#[derive(Debug, Deserialize)]
struct EtherscanTransferLog {
    #[serde(rename = "blockHash")]
    block_hash: String,
    hash: String,
    #[serde(rename = "transactionIndex")]
    transaction_index: String,
    #[serde(rename = "timeStamp")]
    timestamp: String,
    #[serde(rename = "blockNumber")]
    block_number: String,
    #[serde(rename = "contractAddress")]
    contract_address: String,
    from: String,
    to: String,
    value: String,
}

fn parse_hex_or_dec(s: &str) -> Result<i64, AppError> {
    if let Some(stripped) = s.strip_prefix("0x") {
        i64::from_str_radix(stripped, 16)
            .map_err(|e| AppError::Connection(format!("bad hex number {s}: {e}")))
    } else {
        s.parse::<i64>()
            .map_err(|e| AppError::Connection(format!("bad number {s}: {e}")))
    }
}

#[async_trait]
impl BlockExplorerClient for EtherscanClient {
    async fn block_at(&self, timestamp: i64) -> Result<i64, AppError> {
        with_retry("etherscan block_at", || async {
            let resp = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("module", "block"),
                    ("action", "getblocknobytime"),
                    ("timestamp", &timestamp.to_string()),
                    ("closest", "before"),
                    ("apikey", &self.api_key),
                ])
                .send()
                .await
                .map_err(|e| e.to_string())?;

            if !resp.status().is_success() {
                return Err(format!("non-2xx status {}", resp.status()));
            }

            let body: EtherscanEnvelope<BlockNoResult> =
                resp.json().await.map_err(|e| e.to_string())?;

            match body.result {
                BlockNoResult::Found(s) => {
                    s.parse::<i64>().map_err(|e| format!("bad block number {s}: {e}"))
                }
                BlockNoResult::Err(_) => Err(format!("etherscan error: {}", body.message)),
            }
        })
        .await
    }

    async fn token_transfers(
        &self,
        address: &str,
        from_block: i64,
        to_block: i64,
        page_size: u32,
    ) -> Result<Vec<RawTransfer>, AppError> {
        with_retry("etherscan token_transfers", || async {
            let resp = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("module", "account"),
                    ("action", "tokentx"),
                    ("address", address),
                    ("startblock", &from_block.to_string()),
                    ("endblock", &to_block.to_string()),
                    ("offset", &page_size.to_string()),
                    ("sort", "asc"),
                    ("apikey", &self.api_key),
                ])
                .send()
                .await
                .map_err(|e| e.to_string())?;

            if !resp.status().is_success() {
                return Err(format!("non-2xx status {}", resp.status()));
            }

            let body: EtherscanEnvelope<Vec<EtherscanTransferLog>> =
                resp.json().await.map_err(|e| e.to_string())?;

            if body.status != "1" && !body.result.is_empty() {
                return Err(format!("etherscan error: {}", body.message));
            }

            Ok(body.result)
        })
        .await
        .and_then(|logs| {
            logs.into_iter()
                .map(|log| {
                    Ok(RawTransfer {
                        block_hash: log.block_hash,
                        tx_hash: log.hash,
                        log_index: log.transaction_index,
                        timestamp: log.timestamp,
                        block_number: parse_hex_or_dec(&log.block_number)?,
                        token_id: log.contract_address.to_lowercase(),
                        from_address: log.from.to_lowercase(),
                        to_address: log.to.to_lowercase(),
                        value: log.value,
                    })
                })
                .collect()
        })
    }
}
