//! Error types for SOLPAY

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::PublicKey;

/// Which part of a landed transaction diverged from the payment request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MismatchReason {
    /// The ledger accepted the transaction but its execution failed
    ExecutionFailed,
    Recipient,
    Asset,
    Amount,
    Memo,
}

impl MismatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MismatchReason::ExecutionFailed => "execution-failed",
            MismatchReason::Recipient => "recipient",
            MismatchReason::Asset => "asset",
            MismatchReason::Amount => "amount",
            MismatchReason::Memo => "memo",
        }
    }
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for SOLPAY
#[derive(Error, Debug)]
pub enum PayError {
    // ============ Parsing Errors ============
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    // ============ Building Errors ============
    #[error("Missing recipient")]
    MissingRecipient,

    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(String),

    // ============ Lookup Errors ============
    #[error("Reference {reference} matched {count} transactions")]
    AmbiguousReference { reference: PublicKey, count: usize },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Cancelled")]
    Cancelled,

    // ============ Validation Errors ============
    #[error("Validation mismatch: {0}")]
    ValidationMismatch(MismatchReason),

    // ============ Collaborator Errors ============
    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    // ============ Configuration Errors ============
    #[error("Configuration error: {0}")]
    Config(String),

    // ============ General Errors ============
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PayError {
    /// True for the "arrived but wrong" outcome, as opposed to "never arrived"
    pub fn is_mismatch(&self) -> bool {
        matches!(self, PayError::ValidationMismatch(_))
    }
}

impl From<std::io::Error> for PayError {
    fn from(err: std::io::Error) -> Self {
        PayError::Internal(err.to_string())
    }
}

impl From<bincode::Error> for PayError {
    fn from(err: bincode::Error) -> Self {
        PayError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for PayError {
    fn from(err: serde_json::Error) -> Self {
        PayError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_reason_names() {
        assert_eq!(MismatchReason::ExecutionFailed.to_string(), "execution-failed");
        assert_eq!(
            PayError::ValidationMismatch(MismatchReason::Amount).to_string(),
            "Validation mismatch: amount"
        );
    }

    #[test]
    fn test_mismatch_is_distinct_from_not_found() {
        assert!(PayError::ValidationMismatch(MismatchReason::Memo).is_mismatch());
        assert!(!PayError::TransactionNotFound("x".into()).is_mismatch());
    }
}
