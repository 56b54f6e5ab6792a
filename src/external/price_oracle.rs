use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::AppError;
use crate::external::retry::with_retry;
use crate::models::RawPricePoint;

/// Source of historical USD prices. Mirrors DefiLlama's
/// `/batchHistorical?coins={...}` endpoint: a map from `chain:address`
/// coin key to the list of timestamps wanted for that coin, returning the
/// closest known price at-or-before each (spec §4.6).
#[async_trait]
pub trait PriceOracleClient: Send + Sync {
    async fn batch_historical(
        &self,
        query: &HashMap<String, Vec<i64>>,
    ) -> Result<HashMap<String, Vec<RawPricePoint>>, AppError>;
}

pub struct DefiLlamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for DefiLlamaClient {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://coins.llama.fi".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchHistoricalResponse {
    coins: HashMap<String, CoinHistory>,
}

#[derive(Debug, Deserialize)]
struct CoinHistory {
    prices: Vec<PricePointDto>,
}

#[derive(Debug, Deserialize)]
struct PricePointDto {
    timestamp: i64,
    price: f64,
}

#[async_trait]
impl PriceOracleClient for DefiLlamaClient {
    async fn batch_historical(
        &self,
        query: &HashMap<String, Vec<i64>>,
    ) -> Result<HashMap<String, Vec<RawPricePoint>>, AppError> {
        if query.is_empty() {
            return Ok(HashMap::new());
        }

        let coins_json = serde_json::to_string(query)
            .map_err(|e| AppError::Connection(format!("encoding batchHistorical query: {e}")))?;
        let url = format!("{}/batchHistorical", self.base_url);

        let body: BatchHistoricalResponse = with_retry("defillama batch_historical", || async {
            let resp = self
                .client
                .get(&url)
                .query(&[("coins", coins_json.as_str())])
                .send()
                .await
                .map_err(|e| e.to_string())?;

            if !resp.status().is_success() {
                return Err(format!("non-2xx status {}", resp.status()));
            }

            resp.json::<BatchHistoricalResponse>()
                .await
                .map_err(|e| e.to_string())
        })
        .await?;

        Ok(body
            .coins
            .into_iter()
            .map(|(coin, history)| {
                let points = history
                    .prices
                    .into_iter()
                    .map(|p| RawPricePoint {
                        timestamp: p.timestamp,
                        price: p.price,
                    })
                    .collect();
                (coin, points)
            })
            .collect())
    }
}
