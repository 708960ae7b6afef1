//! Error taxonomy for the bundle lifecycle
//!
//! One error type covers assembly and validation, where a failure aborts
//! the call. Each variant maps to an HTTP status for the API surface and
//! to a category label for metrics. Per-bundle submission failures and
//! timeouts are not errors here: they fold into `BundleOutcome` so one
//! bundle's fate never aborts its siblings.

use thiserror::Error;

/// Error type for all bundle coordinator operations
#[derive(Error, Debug)]
pub enum BundleError {
    /// Malformed or missing request fields; no partial work performed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The quote service returned an error or an empty transaction
    #[error("Quote failed for branch {branch}, swap {swap}: {detail}")]
    QuoteUpstream {
        /// 1-based branch index
        branch: usize,
        /// 1-based swap index within the branch
        swap: usize,
        /// Upstream HTTP status when one was received
        status: Option<u16>,
        detail: String,
    },

    /// A submitted transaction failed the pre-submission guard
    /// (malformed, unsigned, or fee payer does not match the signer)
    #[error("Transaction {index} rejected: {reason}")]
    SignatureMismatch {
        /// 0-based transaction index within the flattened submission
        index: usize,
        reason: String,
    },

    /// Solana RPC communication failure (lookup tables, simulation)
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Internal invariant violation or unexpected state
    #[error("Internal error: {0}")]
    Internal(String),

    /// Wrapped error from external crates
    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl BundleError {
    /// HTTP status code this error surfaces as
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            // Propagate the upstream status when it was an HTTP-level
            // rejection, otherwise treat as a bad request
            Self::QuoteUpstream { status, .. } => status.unwrap_or(400),
            Self::SignatureMismatch { .. } => 400,
            Self::Rpc(_) => 500,
            Self::Internal(_) => 500,
            Self::External(_) => 500,
        }
    }

    /// Category label for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "input",
            Self::QuoteUpstream { .. } => "quote",
            Self::SignatureMismatch { .. } => "signature",
            Self::Rpc(_) => "rpc",
            Self::Internal(_) => "internal",
            Self::External(_) => "external",
        }
    }

    /// Whether the caller may meaningfully retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}

// Convenience constructors for common scenarios
impl BundleError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    /// Invalid-input error naming the offending branch (1-based)
    pub fn bad_branch(branch_index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidInput(format!("Branch {}: {}", branch_index, reason.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BundleError::QuoteUpstream {
            branch: 2,
            swap: 1,
            status: Some(429),
            detail: "rate limited".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Quote failed for branch 2, swap 1: rate limited"
        );

        let err = BundleError::bad_branch(3, "is empty");
        assert_eq!(err.to_string(), "Invalid input: Branch 3: is empty");
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(BundleError::invalid_input("x").http_status(), 400);
        assert_eq!(
            BundleError::SignatureMismatch {
                index: 0,
                reason: "unsigned".to_string()
            }
            .http_status(),
            400
        );
        assert_eq!(BundleError::Rpc("down".to_string()).http_status(), 500);
        assert_eq!(BundleError::internal("x").http_status(), 500);

        // Upstream quote status propagates
        let err = BundleError::QuoteUpstream {
            branch: 1,
            swap: 1,
            status: Some(503),
            detail: "down".to_string(),
        };
        assert_eq!(err.http_status(), 503);
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(BundleError::invalid_input("x").category(), "input");
        assert_eq!(BundleError::Rpc("x".to_string()).category(), "rpc");
        assert_eq!(
            BundleError::SignatureMismatch {
                index: 0,
                reason: "unsigned".to_string()
            }
            .category(),
            "signature"
        );
    }

    #[test]
    fn test_retryability() {
        assert!(BundleError::Rpc("x".to_string()).is_retryable());
        assert!(!BundleError::invalid_input("x").is_retryable());
    }
}
