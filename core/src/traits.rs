//! Core traits defining SOLPAY collaborator interfaces
//!
//! The payment layer never talks to a ledger directly. It is handed
//! implementations of these traits; both must be safe for concurrent,
//! independent use and idempotent so that polling can retry them.

use crate::message::Message;
use crate::types::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for SOLPAY operations
pub type PayResult<T> = Result<T, crate::error::PayError>;

/// One entry of a "signatures referencing account X" query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signature: Signature,
    pub slot: u64,
    /// Execution error reported by the ledger, if any
    pub err: Option<String>,
    pub confirmation_status: Option<Commitment>,
    pub block_time: Option<i64>,
}

/// Current status of a single signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureStatus {
    pub slot: u64,
    pub confirmation_status: Option<Commitment>,
    pub err: Option<String>,
}

/// Token balance entry from transaction metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: PublicKey,
    pub owner: Option<PublicKey>,
    pub amount: u64,
    pub decimals: u8,
}

/// Execution metadata attached to a landed transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMeta {
    pub err: Option<String>,
    pub fee: u64,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub log_messages: Vec<String>,
}

/// Accounts loaded through address-table lookups (version 0 messages)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedAddresses {
    pub writable: Vec<PublicKey>,
    pub readonly: Vec<PublicKey>,
}

/// A transaction as returned by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub slot: u64,
    pub block_time: Option<i64>,
    pub signatures: Vec<Signature>,
    pub message: Message,
    #[serde(default)]
    pub loaded_addresses: LoadedAddresses,
    pub meta: Option<TransactionMeta>,
}

impl LedgerTransaction {
    /// Full account key list: static keys, then loaded writable, then loaded readonly
    pub fn account_keys(&self) -> Vec<PublicKey> {
        let mut keys = self.message.account_keys.clone();
        keys.extend_from_slice(&self.loaded_addresses.writable);
        keys.extend_from_slice(&self.loaded_addresses.readonly);
        keys
    }

    /// Execution error, if the ledger reported one
    pub fn err(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|meta| meta.err.as_deref())
    }
}

/// Ledger query collaborator
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Signatures of transactions that include `address`, newest first
    async fn signatures_for_address(
        &self,
        address: &PublicKey,
        limit: usize,
        commitment: Commitment,
    ) -> PayResult<Vec<SignatureInfo>>;

    /// Status of a signature, `None` when the ledger has not seen it
    async fn signature_status(&self, signature: &Signature) -> PayResult<Option<SignatureStatus>>;

    /// Transaction detail, `None` until it reaches `commitment`
    async fn transaction(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> PayResult<Option<LedgerTransaction>>;
}

/// Token-metadata collaborator
#[async_trait]
pub trait TokenMetadataProvider: Send + Sync {
    /// Mint metadata, `None` when the account is absent or is not a mint
    async fn mint_info(&self, mint: &PublicKey) -> PayResult<Option<MintInfo>>;

    /// Whether an account exists at `address`
    async fn account_exists(&self, address: &PublicKey) -> PayResult<bool>;
}
