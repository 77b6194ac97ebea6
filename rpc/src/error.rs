//! RPC transport errors

use solpay_core::PayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error {code}: {message}")]
    Server { code: i64, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Decode(err.to_string())
    }
}

impl From<RpcError> for PayError {
    fn from(err: RpcError) -> Self {
        PayError::Ledger(err.to_string())
    }
}
