//! Common types used throughout the application

use serde::{Deserialize, Serialize};

/// Submission discipline for a batch of bundles.
///
/// Parallel fans all bundles out concurrently and waits for every one of
/// them to reach a terminal outcome. Sequential submits strictly in order
/// and stops at the first bundle that does not confirm — use it when a
/// later bundle depends on an effect of an earlier one (shared balance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMode {
    #[default]
    Parallel,
    Sequential,
}

/// Tip recipient selection policy over the configured account pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TipPolicy {
    /// Uniform-random pick per bundle
    #[default]
    Random,
    /// Rotate through the pool in order
    RoundRobin,
}

/// Terminal outcome of one submitted bundle.
///
/// Produced exactly once per bundle and immutable afterwards. `bundle_index`
/// is 1-based, matching the order of bundles in the submit request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum BundleOutcome {
    #[serde(rename_all = "camelCase")]
    Confirmed {
        bundle_index: usize,
        bundle_id: String,
        slot: u64,
        /// Landed transaction signatures (relay-reported, or extracted
        /// locally from the signed blobs as a fallback)
        signatures: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        bundle_index: usize,
        bundle_id: Option<String>,
        reason: String,
    },
    /// No terminal status within the confirmation deadline. Distinct from
    /// Failed: the bundle may still land.
    #[serde(rename_all = "camelCase")]
    TimedOut {
        bundle_index: usize,
        bundle_id: Option<String>,
    },
}

impl BundleOutcome {
    pub fn bundle_index(&self) -> usize {
        match self {
            Self::Confirmed { bundle_index, .. }
            | Self::Failed { bundle_index, .. }
            | Self::TimedOut { bundle_index, .. } => *bundle_index,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Aggregated result of one submit call: the partition of bundles into
/// confirmed, hard-failed, and timed-out. Owned by the aggregator and
/// returned to the caller as the terminal artifact of the call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    pub successful_bundles: Vec<BundleOutcome>,
    pub failed_bundles: Vec<BundleOutcome>,
    /// 1-based indices of bundles whose outcome is unknown (may still land)
    pub timeout_bundles: Vec<usize>,
}

/// Overall classification of a CallResult
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallClass {
    /// Every bundle confirmed
    Success,
    /// At least one bundle timed out; the caller may resubmit
    Retryable,
    /// At least one bundle failed hard (and none timed out)
    HardFailure,
}

// ---------------------------------------------------------------------------
// HTTP API shapes
// ---------------------------------------------------------------------------

/// Request body for POST /api/bundles/build
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildBundlesRequest {
    /// One branch per bundle; each branch is an ordered list of output mints
    pub branches: Vec<Vec<String>>,
    pub input_mint: String,
    /// Input amount per swap, in the input mint's base units
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u16>,
    /// Tip per bundle in lamports; falls back to the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_lamports: Option<u64>,
    pub signer_pubkey: String,
}

/// Response body for POST /api/bundles/build
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildBundlesResponse {
    /// One ordered list of base64 unsigned transactions per branch,
    /// tip transaction always last
    pub bundles: Vec<Vec<String>>,
    pub total_swaps: usize,
    pub total_bundles: usize,
}

/// Request body for POST /api/bundles/submit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBundlesRequest {
    /// One ordered list of base64 signed transactions per bundle
    pub bundles: Vec<Vec<String>>,
    pub signer_pubkey: String,
}

/// Request body for POST /api/quote (single-order passthrough)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u16>,
    pub signer_pubkey: String,
}

/// Per-transaction dry-run detail attached to failure reports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationDetail {
    pub bundle_index: usize,
    pub transaction_index: usize,
    /// "passed", "failed", or "could not simulate"
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units_consumed: Option<u64>,
}
