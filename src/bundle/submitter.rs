//! Bundle submission and confirmation
//!
//! Drives each bundle through send, poll, and terminal outcome. In parallel
//! mode every bundle runs its own pipeline concurrently and one bundle's
//! failure never disturbs another's. In sequential mode bundles go out
//! strictly in order and the first non-confirmed bundle stops the batch.

use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use crate::bundle::validate;
use crate::config::RelayConfig;
use crate::relay::{BundleConfirmation, RelayClient};
use crate::types::{BundleOutcome, SubmissionMode};

pub struct BundleSubmitter {
    relay: RelayClient,
    mode: SubmissionMode,
    confirmation_timeout: Duration,
}

impl BundleSubmitter {
    pub fn new(relay: RelayClient, config: &RelayConfig) -> Self {
        Self {
            relay,
            mode: config.submission_mode,
            confirmation_timeout: Duration::from_millis(config.confirmation_timeout_ms),
        }
    }

    /// Submit all bundles and wait for each attempted bundle's terminal
    /// outcome. `bundle_index` in the outcomes is 1-based request order.
    /// In sequential mode, bundles after the first non-confirmed one are
    /// never attempted and produce no outcome.
    pub async fn submit_all(&self, bundles: &[Vec<String>]) -> Vec<BundleOutcome> {
        match self.mode {
            SubmissionMode::Parallel => {
                let pipelines = bundles
                    .iter()
                    .enumerate()
                    .map(|(i, bundle)| self.submit_one(i + 1, bundle));
                join_all(pipelines).await
            }
            SubmissionMode::Sequential => {
                let mut outcomes = Vec::with_capacity(bundles.len());
                for (i, bundle) in bundles.iter().enumerate() {
                    let outcome = self.submit_one(i + 1, bundle).await;
                    let confirmed = outcome.is_confirmed();
                    outcomes.push(outcome);
                    if !confirmed {
                        warn!(
                            bundle_index = i + 1,
                            remaining = bundles.len() - i - 1,
                            "Sequential submission halted"
                        );
                        break;
                    }
                }
                outcomes
            }
        }
    }

    /// One bundle's full pipeline. Infallible: every failure mode folds
    /// into a terminal outcome so sibling bundles are never disturbed.
    async fn submit_one(&self, bundle_index: usize, transactions: &[String]) -> BundleOutcome {
        let started = std::time::Instant::now();
        let bundle_id = match self.relay.send_bundle(transactions).await {
            Ok(id) => id,
            Err(e) => {
                metrics::counter!("bundles_failed_total").increment(1);
                warn!(bundle_index, error = %e, "Bundle submission rejected");
                return BundleOutcome::Failed {
                    bundle_index,
                    bundle_id: None,
                    reason: format!("submission failed: {}", e),
                };
            }
        };
        info!(bundle_index, bundle_id, "Bundle accepted by relay");

        let confirmation = match self
            .relay
            .confirm_bundle(&bundle_id, self.confirmation_timeout)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                warn!(bundle_index, bundle_id, error = %e, "Confirmation polling failed");
                metrics::counter!("bundles_timed_out_total").increment(1);
                return BundleOutcome::TimedOut {
                    bundle_index,
                    bundle_id: Some(bundle_id),
                };
            }
        };

        match confirmation {
            BundleConfirmation::Confirmed { slot } | BundleConfirmation::Landed { slot } => {
                let (signatures, landed_slot) = self.landed_signatures(&bundle_id, transactions).await;
                metrics::counter!("bundles_confirmed_total").increment(1);
                metrics::histogram!("bundle_confirmation_seconds")
                    .record(started.elapsed().as_secs_f64());
                info!(bundle_index, bundle_id, slot, "Bundle confirmed");
                BundleOutcome::Confirmed {
                    bundle_index,
                    bundle_id,
                    slot: landed_slot.unwrap_or(slot),
                    signatures,
                }
            }
            BundleConfirmation::Failed { reason } => {
                metrics::counter!("bundles_failed_total").increment(1);
                warn!(bundle_index, bundle_id, reason, "Bundle failed");
                BundleOutcome::Failed {
                    bundle_index,
                    bundle_id: Some(bundle_id),
                    reason,
                }
            }
            BundleConfirmation::Unknown { .. } => {
                metrics::counter!("bundles_timed_out_total").increment(1);
                warn!(bundle_index, bundle_id, "Bundle confirmation timed out");
                BundleOutcome::TimedOut {
                    bundle_index,
                    bundle_id: Some(bundle_id),
                }
            }
        }
    }

    /// Landed signatures from the relay, falling back to local extraction
    /// from the submitted blobs when the relay lookup fails
    async fn landed_signatures(
        &self,
        bundle_id: &str,
        transactions: &[String],
    ) -> (Vec<String>, Option<u64>) {
        match self.relay.bundle_signatures(bundle_id).await {
            Ok((signatures, slot)) if !signatures.is_empty() => (signatures, slot),
            _ => (validate::extract_signatures(transactions), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config(server_url: &str, mode: SubmissionMode) -> RelayConfig {
        RelayConfig {
            url: server_url.to_string(),
            uuid: String::new(),
            confirmation_timeout_ms: 150,
            poll_interval_ms: 20,
            submission_mode: mode,
        }
    }

    fn submitter(server_url: &str, mode: SubmissionMode) -> BundleSubmitter {
        let config = test_config(server_url, mode);
        BundleSubmitter::new(RelayClient::new(&config), &config)
    }

    #[tokio::test]
    async fn test_send_rejection_folds_into_failed_outcome() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/bundles")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"bad bundle"}}"#)
            .create_async()
            .await;

        let submitter = submitter(&server.url(), SubmissionMode::Parallel);
        let outcomes = submitter.submit_all(&[vec!["dHgx".to_string()]]).await;

        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            BundleOutcome::Failed {
                bundle_index,
                bundle_id,
                reason,
            } => {
                assert_eq!(*bundle_index, 1);
                assert!(bundle_id.is_none());
                assert!(reason.contains("bad bundle"));
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pending_bundle_times_out() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/bundles")
            .match_body(mockito::Matcher::PartialJson(json!({"method": "sendBundle"})))
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"b1"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/api/v1/bundles")
            .match_body(mockito::Matcher::PartialJson(
                json!({"method": "getInflightBundleStatuses"}),
            ))
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"result":{"value":[{"bundle_id":"b1","status":"Pending"}]}}"#,
            )
            .expect_at_least(1)
            .create_async()
            .await;

        let submitter = submitter(&server.url(), SubmissionMode::Parallel);
        let outcomes = submitter.submit_all(&[vec!["dHgx".to_string()]]).await;

        match &outcomes[0] {
            BundleOutcome::TimedOut {
                bundle_index,
                bundle_id,
            } => {
                assert_eq!(*bundle_index, 1);
                assert_eq!(bundle_id.as_deref(), Some("b1"));
            }
            other => panic!("expected TimedOut, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sequential_halts_after_failure() {
        let mut server = mockito::Server::new_async().await;
        // First bundle's send is rejected; the second must never be sent
        let send_mock = server
            .mock("POST", "/api/v1/bundles")
            .match_body(mockito::Matcher::PartialJson(json!({"method": "sendBundle"})))
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"rejected"}}"#)
            .expect(1)
            .create_async()
            .await;

        let submitter = submitter(&server.url(), SubmissionMode::Sequential);
        let outcomes = submitter
            .submit_all(&[vec!["dHgx".to_string()], vec!["dHgy".to_string()]])
            .await;

        assert_eq!(outcomes.len(), 1, "second bundle must not be attempted");
        assert!(matches!(outcomes[0], BundleOutcome::Failed { .. }));
        send_mock.assert_async().await;
    }
}
