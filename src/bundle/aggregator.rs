//! Outcome aggregation
//!
//! Folds per-bundle outcomes into the single result the caller sees, and
//! classifies the whole call for HTTP mapping. Timeouts dominate hard
//! failures: an unknown outcome means resubmitting could double-execute,
//! so the caller must be told to treat the call as retry-with-care.

use std::sync::Arc;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_transaction_status::UiTransactionEncoding;
use tracing::debug;

use crate::bundle::validate::decode_transaction;
use crate::types::{BundleOutcome, CallClass, CallResult, SimulationDetail};

/// Partition terminal outcomes into the call result. Pure and stable:
/// outcomes land in request order within each partition.
pub fn classify(outcomes: Vec<BundleOutcome>) -> CallResult {
    let mut result = CallResult::default();
    for outcome in outcomes {
        match &outcome {
            BundleOutcome::Confirmed { .. } => result.successful_bundles.push(outcome),
            BundleOutcome::Failed { .. } => result.failed_bundles.push(outcome),
            BundleOutcome::TimedOut { bundle_index, .. } => {
                result.timeout_bundles.push(*bundle_index);
            }
        }
    }
    result
}

impl CallResult {
    /// Overall call classification. Any timeout makes the call retryable
    /// regardless of other failures, because at least one outcome is
    /// unknown.
    pub fn classification(&self) -> CallClass {
        if !self.timeout_bundles.is_empty() {
            CallClass::Retryable
        } else if !self.failed_bundles.is_empty() {
            CallClass::HardFailure
        } else {
            CallClass::Success
        }
    }

    /// HTTP status this result surfaces as
    pub fn http_status(&self) -> u16 {
        match self.classification() {
            CallClass::Success => 200,
            CallClass::Retryable => 408,
            CallClass::HardFailure => 400,
        }
    }

    pub fn total_bundles(&self) -> usize {
        self.successful_bundles.len() + self.failed_bundles.len() + self.timeout_bundles.len()
    }
}

/// Best-effort dry runs of failed bundles' transactions for diagnostics
pub struct OutcomeAggregator {
    rpc: Arc<RpcClient>,
}

impl OutcomeAggregator {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    /// Simulate every transaction of every hard-failed bundle. Never
    /// fails: anything that cannot be simulated reports "could not
    /// simulate" instead.
    pub async fn simulate_failed(
        &self,
        bundles: &[Vec<String>],
        result: &CallResult,
    ) -> Vec<SimulationDetail> {
        let mut details = Vec::new();
        for outcome in &result.failed_bundles {
            let bundle_index = outcome.bundle_index();
            let Some(bundle) = bundles.get(bundle_index - 1) else {
                continue;
            };
            for (tx_index, encoded) in bundle.iter().enumerate() {
                details.push(self.simulate_one(bundle_index, tx_index, encoded).await);
            }
        }
        details
    }

    async fn simulate_one(
        &self,
        bundle_index: usize,
        tx_index: usize,
        encoded: &str,
    ) -> SimulationDetail {
        let tx = match decode_transaction(encoded) {
            Ok(tx) => tx,
            Err(e) => {
                return SimulationDetail {
                    bundle_index,
                    transaction_index: tx_index,
                    outcome: "could not simulate".to_string(),
                    error: Some(e.to_string()),
                    logs: None,
                    units_consumed: None,
                }
            }
        };

        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            encoding: Some(UiTransactionEncoding::Base64),
            ..RpcSimulateTransactionConfig::default()
        };

        match self.rpc.simulate_transaction_with_config(&tx, config).await {
            Ok(response) => {
                let value = response.value;
                let outcome = if value.err.is_some() { "failed" } else { "passed" };
                debug!(bundle_index, tx_index, outcome, "Simulated failed-bundle transaction");
                SimulationDetail {
                    bundle_index,
                    transaction_index: tx_index,
                    outcome: outcome.to_string(),
                    error: value.err.map(|e| format!("{:?}", e)),
                    logs: value.logs,
                    units_consumed: value.units_consumed,
                }
            }
            Err(e) => SimulationDetail {
                bundle_index,
                transaction_index: tx_index,
                outcome: "could not simulate".to_string(),
                error: Some(e.to_string()),
                logs: None,
                units_consumed: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmed(index: usize) -> BundleOutcome {
        BundleOutcome::Confirmed {
            bundle_index: index,
            bundle_id: format!("b{}", index),
            slot: 100 + index as u64,
            signatures: vec![format!("sig{}", index)],
        }
    }

    fn failed(index: usize) -> BundleOutcome {
        BundleOutcome::Failed {
            bundle_index: index,
            bundle_id: Some(format!("b{}", index)),
            reason: "dropped".to_string(),
        }
    }

    fn timed_out(index: usize) -> BundleOutcome {
        BundleOutcome::TimedOut {
            bundle_index: index,
            bundle_id: Some(format!("b{}", index)),
        }
    }

    #[test]
    fn test_partition_preserves_request_order() {
        let result = classify(vec![confirmed(1), failed(2), timed_out(3), confirmed(4)]);

        assert_eq!(
            result
                .successful_bundles
                .iter()
                .map(|o| o.bundle_index())
                .collect::<Vec<_>>(),
            vec![1, 4]
        );
        assert_eq!(result.failed_bundles[0].bundle_index(), 2);
        assert_eq!(result.timeout_bundles, vec![3]);
        assert_eq!(result.total_bundles(), 4);
    }

    #[test]
    fn test_all_confirmed_is_success() {
        let result = classify(vec![confirmed(1), confirmed(2)]);
        assert_eq!(result.classification(), CallClass::Success);
        assert_eq!(result.http_status(), 200);
    }

    #[test]
    fn test_failure_without_timeout_is_hard_failure() {
        let result = classify(vec![confirmed(1), failed(2)]);
        assert_eq!(result.classification(), CallClass::HardFailure);
        assert_eq!(result.http_status(), 400);
    }

    #[test]
    fn test_timeout_dominates_failure() {
        // A mixed result with both failures and timeouts is retryable:
        // the timed-out bundle's outcome is unknown
        let result = classify(vec![failed(1), timed_out(2), confirmed(3)]);
        assert_eq!(result.classification(), CallClass::Retryable);
        assert_eq!(result.http_status(), 408);
    }

    #[test]
    fn test_classification_is_stable() {
        let outcomes = vec![confirmed(1), timed_out(2), failed(3)];
        let first = classify(outcomes.clone());
        let second = classify(outcomes);
        assert_eq!(first.classification(), second.classification());
        assert_eq!(first.timeout_bundles, second.timeout_bundles);
    }

    #[test]
    fn test_empty_outcomes_is_success() {
        let result = classify(vec![]);
        assert_eq!(result.classification(), CallClass::Success);
    }
}
