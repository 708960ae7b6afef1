//! Quote service client (Jupiter Ultra `/order`)
//!
//! One request per output mint returns a pre-built unsigned swap
//! transaction plus pricing metadata. The client screens upstream error
//! shapes once here so callers only ever see a typed result.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::QuoteConfig;

/// Upstream quote failure, carried back with the HTTP status when the
/// rejection happened at the HTTP level
#[derive(Error, Debug)]
#[error("{detail}")]
pub struct QuoteError {
    pub status: Option<u16>,
    pub detail: String,
}

/// Parameters for one order request
#[derive(Debug, Clone)]
pub struct OrderParams<'a> {
    pub input_mint: &'a str,
    pub output_mint: &'a str,
    pub amount: u64,
    pub taker: &'a str,
    pub slippage_bps: Option<u16>,
}

/// One quote: an unsigned transaction blob plus routing metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UltraOrder {
    #[serde(default)]
    pub transaction: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub in_amount: Option<String>,
    #[serde(default)]
    pub out_amount: Option<String>,
    #[serde(default)]
    pub other_amount_threshold: Option<String>,
    #[serde(default)]
    pub slippage_bps: Option<u16>,
    #[serde(default)]
    pub price_impact_pct: Option<serde_json::Value>,
    #[serde(default)]
    pub prioritization_fee_lamports: Option<u64>,
    #[serde(default)]
    pub route_plan: Option<serde_json::Value>,
    #[serde(default)]
    pub platform_fee: Option<serde_json::Value>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// HTTP client for the quote service
#[derive(Clone)]
pub struct QuoteClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    exclude_routers: String,
    request_timeout: Duration,
}

impl QuoteClient {
    pub fn new(config: &QuoteConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            exclude_routers: config.exclude_routers.clone(),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
        }
    }

    /// Fetch one order. Non-2xx responses, upstream error payloads, and
    /// empty transactions are all hard failures for this request.
    pub async fn fetch_order(&self, params: &OrderParams<'_>) -> Result<UltraOrder, QuoteError> {
        let url = format!("{}/order", self.base_url);

        let mut query: Vec<(&str, String)> = vec![
            ("inputMint", params.input_mint.to_string()),
            ("outputMint", params.output_mint.to_string()),
            ("amount", params.amount.to_string()),
            ("taker", params.taker.to_string()),
        ];
        if !self.exclude_routers.is_empty() {
            query.push(("excludeRouters", self.exclude_routers.clone()));
        }
        if let Some(bps) = params.slippage_bps {
            query.push(("slippageBps", bps.to_string()));
        }

        debug!(
            input_mint = params.input_mint,
            output_mint = params.output_mint,
            amount = params.amount,
            "Fetching quote"
        );
        metrics::counter!("quote_requests_total").increment(1);

        let response = self
            .http
            .get(&url)
            .header("x-api-key", &self.api_key)
            .query(&query)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                metrics::counter!("quote_failures_total").increment(1);
                QuoteError {
                    status: None,
                    detail: format!("quote request failed: {}", e),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            metrics::counter!("quote_failures_total").increment(1);
            return Err(QuoteError {
                status: Some(status.as_u16()),
                detail: body,
            });
        }

        let order: UltraOrder = response.json().await.map_err(|e| QuoteError {
            status: None,
            detail: format!("quote response decode failed: {}", e),
        })?;

        screen_order(&order)?;
        Ok(order)
    }
}

/// Reject orders carrying an upstream error or an empty transaction
fn screen_order(order: &UltraOrder) -> Result<(), QuoteError> {
    if let Some(code) = order.error_code {
        if code != 0 {
            return Err(QuoteError {
                status: None,
                detail: format!(
                    "quote API error (code {}): {}",
                    code,
                    order.error_message.as_deref().unwrap_or("unknown")
                ),
            });
        }
    }

    if let Some(err) = &order.error {
        return Err(QuoteError {
            status: None,
            detail: format!("quote API error: {}", err),
        });
    }

    match &order.transaction {
        Some(tx) if !tx.is_empty() => Ok(()),
        _ => Err(QuoteError {
            status: None,
            detail: "quote returned an empty transaction".to_string(),
        }),
    }
}
