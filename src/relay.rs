//! Relay (Jito block engine) JSON-RPC client
//!
//! Three wire operations: `sendBundle`, `getInflightBundleStatuses`
//! (polled until terminal or deadline), and `getBundleStatuses` (landed
//! transaction signatures). Confirmation payloads are decoded exactly once
//! here into the tagged [`BundleConfirmation`] enum so downstream logic
//! never probes raw JSON shapes.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RelayConfig;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("relay request failed: {0}")]
    Http(String),

    #[error("relay error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("relay did not return a bundle id")]
    MissingBundleId,

    #[error("relay response decode failed: {0}")]
    Decode(String),
}

/// Terminal-or-not confirmation state, decoded once at the wire boundary
#[derive(Debug, Clone, PartialEq)]
pub enum BundleConfirmation {
    /// Relay reports the bundle confirmed at this slot
    Confirmed { slot: u64 },
    /// Relay reports the bundle landed on-chain at this slot
    Landed { slot: u64 },
    /// Relay reports a terminal failure
    Failed { reason: String },
    /// No terminal status yet (pending, invalid, or unrecognized payload)
    Unknown { raw: Value },
}

impl BundleConfirmation {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unknown { .. })
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Confirmed { .. } | Self::Landed { .. })
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC client for the block engine bundles endpoint
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    endpoint: String,
    poll_interval: Duration,
}

impl RelayClient {
    pub fn new(config: &RelayConfig) -> Self {
        let base = config.url.trim_end_matches('/');
        let mut endpoint = format!("{}/api/v1/bundles", base);
        if !config.uuid.is_empty() {
            endpoint = format!("{}?uuid={}", endpoint, config.uuid);
        }
        Self {
            http: reqwest::Client::new(),
            endpoint,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RelayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RelayError::Http(format!("status {}: {}", status, text)));
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| RelayError::Decode(e.to_string()))?;

        if let Some(err) = envelope.error {
            return Err(RelayError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| RelayError::Decode("response carried no result".to_string()))
    }

    /// Submit one bundle of base64 signed transactions, returning the
    /// relay-assigned bundle id
    pub async fn send_bundle(&self, transactions: &[String]) -> Result<String, RelayError> {
        let result = self
            .call(
                "sendBundle",
                json!([transactions, { "encoding": "base64" }]),
            )
            .await?;

        match result.as_str() {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(RelayError::MissingBundleId),
        }
    }

    /// One inflight status probe for a bundle id
    pub async fn inflight_status(&self, bundle_id: &str) -> Result<BundleConfirmation, RelayError> {
        let result = self
            .call("getInflightBundleStatuses", json!([[bundle_id]]))
            .await?;
        Ok(decode_inflight_status(&result))
    }

    /// Poll the inflight status until it turns terminal or the deadline
    /// elapses. A non-terminal state at the deadline is returned as-is so
    /// the caller can classify it as a timeout (outcome unknown, the bundle
    /// may still land). Transient probe errors do not abort the poll.
    pub async fn confirm_bundle(
        &self,
        bundle_id: &str,
        timeout: Duration,
    ) -> Result<BundleConfirmation, RelayError> {
        let deadline = Instant::now() + timeout;
        let mut last = BundleConfirmation::Unknown { raw: Value::Null };

        loop {
            match self.inflight_status(bundle_id).await {
                Ok(confirmation) => {
                    if confirmation.is_terminal() {
                        debug!(bundle_id, ?confirmation, "Bundle reached terminal status");
                        return Ok(confirmation);
                    }
                    last = confirmation;
                }
                Err(e) => {
                    warn!(bundle_id, error = %e, "Inflight status probe failed, retrying");
                }
            }

            if Instant::now() + self.poll_interval > deadline {
                return Ok(last);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Best-effort fetch of landed transaction signatures and the landed
    /// slot for a confirmed bundle
    pub async fn bundle_signatures(
        &self,
        bundle_id: &str,
    ) -> Result<(Vec<String>, Option<u64>), RelayError> {
        let result = self
            .call("getBundleStatuses", json!([[bundle_id]]))
            .await?;

        let entry = result
            .get("value")
            .and_then(|v| v.as_array())
            .and_then(|v| v.first())
            .ok_or_else(|| RelayError::Decode("empty bundle status".to_string()))?;

        let signatures = entry
            .get("transactions")
            .and_then(|v| v.as_array())
            .map(|txs| {
                txs.iter()
                    .filter_map(|t| t.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let slot = entry.get("slot").and_then(|v| v.as_u64());
        Ok((signatures, slot))
    }
}

/// Decode one `getInflightBundleStatuses` result into the tagged enum.
/// Expected shape: `{"context":{...},"value":[{"bundle_id":"...",
/// "status":"Pending|Landed|Failed|Invalid","landed_slot":N}]}`.
fn decode_inflight_status(result: &Value) -> BundleConfirmation {
    let entry = match result
        .get("value")
        .and_then(|v| v.as_array())
        .and_then(|v| v.first())
    {
        Some(e) => e,
        None => {
            return BundleConfirmation::Unknown {
                raw: result.clone(),
            }
        }
    };

    // Some relay deployments report a confirmation_status alongside the
    // inflight status once the bundle is on-chain
    if entry
        .get("confirmation_status")
        .and_then(|v| v.as_str())
        .map(|s| s == "confirmed" || s == "finalized")
        .unwrap_or(false)
    {
        let slot = entry
            .get("slot")
            .or_else(|| entry.get("landed_slot"))
            .and_then(|v| v.as_u64())
            .unwrap_or_default();
        return BundleConfirmation::Confirmed { slot };
    }

    if let Some(err) = entry.get("err").filter(|e| !e.is_null()) {
        return BundleConfirmation::Failed {
            reason: err.to_string(),
        };
    }

    match entry.get("status").and_then(|v| v.as_str()) {
        Some("Landed") => {
            let slot = entry
                .get("landed_slot")
                .or_else(|| entry.get("slot"))
                .and_then(|v| v.as_u64())
                .unwrap_or_default();
            BundleConfirmation::Landed { slot }
        }
        Some("Failed") => BundleConfirmation::Failed {
            reason: "relay reported status Failed".to_string(),
        },
        _ => BundleConfirmation::Unknown {
            raw: entry.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_landed() {
        let result = json!({
            "context": { "slot": 100 },
            "value": [{ "bundle_id": "b1", "status": "Landed", "landed_slot": 99 }]
        });
        assert_eq!(
            decode_inflight_status(&result),
            BundleConfirmation::Landed { slot: 99 }
        );
    }

    #[test]
    fn test_decode_confirmed_status() {
        let result = json!({
            "value": [{ "bundle_id": "b1", "confirmation_status": "confirmed", "slot": 123 }]
        });
        assert_eq!(
            decode_inflight_status(&result),
            BundleConfirmation::Confirmed { slot: 123 }
        );
    }

    #[test]
    fn test_decode_failed_status_and_err_payload() {
        let by_status = json!({
            "value": [{ "bundle_id": "b1", "status": "Failed" }]
        });
        assert!(matches!(
            decode_inflight_status(&by_status),
            BundleConfirmation::Failed { .. }
        ));

        let by_err = json!({
            "value": [{ "bundle_id": "b1", "status": "Pending", "err": { "InstructionError": [0, "Custom"] } }]
        });
        match decode_inflight_status(&by_err) {
            BundleConfirmation::Failed { reason } => assert!(reason.contains("InstructionError")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_pending_is_unknown() {
        let result = json!({
            "value": [{ "bundle_id": "b1", "status": "Pending" }]
        });
        let decoded = decode_inflight_status(&result);
        assert!(!decoded.is_terminal());

        let invalid = json!({
            "value": [{ "bundle_id": "b1", "status": "Invalid" }]
        });
        assert!(!decode_inflight_status(&invalid).is_terminal());

        let empty = json!({ "value": [] });
        assert!(!decode_inflight_status(&empty).is_terminal());
    }

    #[tokio::test]
    async fn test_send_bundle_returns_id() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/api/v1/bundles")
            .match_body(mockito::Matcher::PartialJson(json!({
                "method": "sendBundle",
            })))
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"bundle-id-1"}"#)
            .create_async()
            .await;

        let client = RelayClient::new(&RelayConfig {
            url: server.url(),
            uuid: String::new(),
            confirmation_timeout_ms: 1_000,
            poll_interval_ms: 10,
            submission_mode: Default::default(),
        });

        let id = client
            .send_bundle(&["dHgx".to_string(), "dHgy".to_string()])
            .await
            .expect("send should succeed");
        assert_eq!(id, "bundle-id-1");
    }

    #[tokio::test]
    async fn test_send_bundle_missing_id_is_error() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/api/v1/bundles")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":null}"#)
            .create_async()
            .await;

        let client = RelayClient::new(&RelayConfig {
            url: server.url(),
            uuid: String::new(),
            confirmation_timeout_ms: 1_000,
            poll_interval_ms: 10,
            submission_mode: Default::default(),
        });

        let err = client.send_bundle(&["dHgx".to_string()]).await.unwrap_err();
        assert!(matches!(err, RelayError::Decode(_) | RelayError::MissingBundleId));
    }

    #[tokio::test]
    async fn test_confirm_bundle_times_out_as_unknown() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/api/v1/bundles")
            .match_body(mockito::Matcher::PartialJson(json!({
                "method": "getInflightBundleStatuses",
            })))
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"result":{"value":[{"bundle_id":"b1","status":"Pending"}]}}"#,
            )
            .expect_at_least(1)
            .create_async()
            .await;

        let client = RelayClient::new(&RelayConfig {
            url: server.url(),
            uuid: String::new(),
            confirmation_timeout_ms: 1_000,
            poll_interval_ms: 20,
            submission_mode: Default::default(),
        });

        let confirmation = client
            .confirm_bundle("b1", Duration::from_millis(100))
            .await
            .expect("poll should not error");
        assert!(!confirmation.is_terminal());
    }

    #[test]
    fn test_uuid_appended_to_endpoint() {
        let client = RelayClient::new(&RelayConfig {
            url: "http://relay.example".to_string(),
            uuid: "my-uuid".to_string(),
            confirmation_timeout_ms: 1_000,
            poll_interval_ms: 10,
            submission_mode: Default::default(),
        });
        assert_eq!(
            client.endpoint,
            "http://relay.example/api/v1/bundles?uuid=my-uuid"
        );
    }
}
