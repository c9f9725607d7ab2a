//! Chart backend REST client

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use super::types::RestApiError;
use crate::market_data::{ChartRequest, parse_number};

/// REST client for chart pages, subscription announcements and price queries
#[derive(Debug, Clone)]
pub struct ChartRestClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl ChartRestClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one chart page
    ///
    /// The raw JSON is returned untouched; locating and normalizing the
    /// quote array is left to the caller.
    pub async fn fetch_chart(&self, request: &ChartRequest) -> Result<Value, RestApiError> {
        validate_symbol(&request.symbol)?;
        let url = format!("{}/api/stock/daily-chart/{}", self.base_url, request.symbol);

        debug!(
            "Fetching {} chart for {} (apiId={}, base_dt={:?})",
            request.timeframe,
            request.symbol,
            request.api_id(),
            request.body.base_dt
        );

        let response = self
            .client
            .post(&url)
            .query(&[("apiId", request.api_id())])
            .json(&request.body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RestApiError::HttpRequestError(e.to_string()))?;

        let payload = Self::read_json(response).await?;
        info!("Fetched {} chart page for {}", request.timeframe, request.symbol);
        Ok(payload)
    }

    /// Ask the backend to start relaying realtime ticks for `symbol`
    pub async fn announce_subscription(&self, symbol: &str, tr_id: &str) -> Result<(), RestApiError> {
        validate_symbol(symbol)?;
        let url = format!("{}/api/stock/subscribe/{}", self.base_url, symbol);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "trId": tr_id }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RestApiError::HttpRequestError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RestApiError::HttpStatusError(status.as_u16(), body));
        }

        info!("Announced realtime subscription for {}", symbol);
        Ok(())
    }

    /// Query the current price of `symbol`
    pub async fn fetch_price(&self, symbol: &str, tr_id: &str) -> Result<f64, RestApiError> {
        validate_symbol(symbol)?;
        let url = format!("{}/api/stock/price/{}", self.base_url, symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("trId", tr_id)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RestApiError::HttpRequestError(e.to_string()))?;

        let payload = Self::read_json(response).await?;
        extract_price(&payload)
            .ok_or_else(|| RestApiError::ParseError(format!("no price in response for {}", symbol)))
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, RestApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RestApiError::HttpStatusError(status.as_u16(), body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RestApiError::HttpRequestError(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| RestApiError::ParseError(e.to_string()))
    }
}

fn validate_symbol(symbol: &str) -> Result<(), RestApiError> {
    if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(RestApiError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}

fn extract_price(payload: &Value) -> Option<f64> {
    const KEYS: &[&str] = &["cur_prc", "price", "stck_prpr"];
    let sources = [Some(payload), payload.get("output")];
    sources
        .into_iter()
        .flatten()
        .find_map(|source| KEYS.iter().find_map(|key| source.get(*key).and_then(parse_number)))
}
