//! Transaction fetch and decoding

use serde::{Deserialize, Serialize};
use solpay_core::{
    CancelToken, Commitment, FetcherConfig, LedgerClient, LedgerTransaction, PayError, PayResult,
    PublicKey, Signature, TokenBalance,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::instruction::{parse_instruction, ParsedInstruction};
use crate::message::decompile;

/// One value movement found in a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "asset", rename_all = "kebab-case")]
pub enum TransferDetail {
    Native {
        source: PublicKey,
        destination: PublicKey,
        lamports: u64,
    },
    Token {
        source: PublicKey,
        /// The token account credited
        destination: PublicKey,
        /// Wallet owning `destination`, when the ledger reported it
        destination_owner: Option<PublicKey>,
        mint: Option<PublicKey>,
        authority: PublicKey,
        amount: u64,
        decimals: Option<u8>,
    },
}

impl TransferDetail {
    pub fn destination(&self) -> &PublicKey {
        match self {
            TransferDetail::Native { destination, .. }
            | TransferDetail::Token { destination, .. } => destination,
        }
    }

    /// Amount moved, in the asset's base units
    pub fn base_units(&self) -> u64 {
        match self {
            TransferDetail::Native { lamports, .. } => *lamports,
            TransferDetail::Token { amount, .. } => *amount,
        }
    }
}

/// A fetched transaction, decoded for validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub signature: Signature,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub confirmation_status: Commitment,
    /// Execution error; the transaction landed but moved nothing
    pub err: Option<String>,
    pub transfers: Vec<TransferDetail>,
    pub memos: Vec<Vec<u8>>,
    pub account_keys: Vec<PublicKey>,
}

/// Balance entry (mint, owner, decimals) for a token account in the transaction
fn token_account(
    balances: &[TokenBalance],
    account_keys: &[PublicKey],
    account: &PublicKey,
) -> Option<TokenBalance> {
    let index = account_keys.iter().position(|k| k == account)?;
    balances
        .iter()
        .find(|b| b.account_index as usize == index)
        .cloned()
}

impl TransactionRecord {
    pub fn from_transaction(
        signature: Signature,
        confirmation_status: Commitment,
        transaction: &LedgerTransaction,
    ) -> PayResult<Self> {
        let account_keys = transaction.account_keys();
        let instructions = decompile(&transaction.message, &transaction.loaded_addresses)?;

        let balances: Vec<TokenBalance> = transaction
            .meta
            .as_ref()
            .map(|meta| {
                meta.post_token_balances
                    .iter()
                    .chain(&meta.pre_token_balances)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let mut transfers = Vec::new();
        let mut memos = Vec::new();
        for ix in &instructions {
            match parse_instruction(ix) {
                ParsedInstruction::SystemTransfer { from, to, lamports } => {
                    transfers.push(TransferDetail::Native {
                        source: from,
                        destination: to,
                        lamports,
                    });
                }
                ParsedInstruction::TokenTransfer {
                    source,
                    destination,
                    authority,
                    amount,
                } => {
                    let balance = token_account(&balances, &account_keys, &destination);
                    transfers.push(TransferDetail::Token {
                        source,
                        destination,
                        destination_owner: balance.as_ref().and_then(|b| b.owner),
                        mint: balance.as_ref().map(|b| b.mint),
                        authority,
                        amount,
                        decimals: balance.as_ref().map(|b| b.decimals),
                    });
                }
                ParsedInstruction::TokenTransferChecked {
                    source,
                    mint,
                    destination,
                    authority,
                    amount,
                    decimals,
                } => {
                    let balance = token_account(&balances, &account_keys, &destination);
                    transfers.push(TransferDetail::Token {
                        source,
                        destination,
                        destination_owner: balance.and_then(|b| b.owner),
                        mint: Some(mint),
                        authority,
                        amount,
                        decimals: Some(decimals),
                    });
                }
                ParsedInstruction::Memo { data } => memos.push(data),
                ParsedInstruction::CreateAssociatedAccount { .. }
                | ParsedInstruction::Unknown { .. } => {}
            }
        }

        Ok(Self {
            signature,
            slot: transaction.slot,
            block_time: transaction.block_time,
            confirmation_status,
            err: transaction.err().map(str::to_string),
            transfers,
            memos,
            account_keys,
        })
    }

    pub fn is_success(&self) -> bool {
        self.err.is_none()
    }

    pub fn references_account(&self, key: &PublicKey) -> bool {
        self.account_keys.contains(key)
    }
}

/// Waits for a transaction to reach a confirmation level
pub struct TransactionFetcher<'a, L: ?Sized> {
    ledger: &'a L,
    config: FetcherConfig,
}

impl<'a, L: LedgerClient + ?Sized> TransactionFetcher<'a, L> {
    pub fn new(ledger: &'a L, config: FetcherConfig) -> PayResult<Self> {
        config.validate()?;
        Ok(Self { ledger, config })
    }

    /// One status check; the transaction itself is only requested once
    /// the status says it is visible at the required level
    async fn poll_once(&self, signature: &Signature) -> PayResult<Option<TransactionRecord>> {
        let minimum = self.config.min_confirmation;
        let level = match self.ledger.signature_status(signature).await? {
            Some(status) => status.confirmation_status,
            None => None,
        };
        let Some(level) = level.filter(|level| level.satisfies(minimum)) else {
            return Ok(None);
        };

        match self.ledger.transaction(signature, minimum).await? {
            Some(transaction) => Ok(Some(TransactionRecord::from_transaction(
                *signature,
                level,
                &transaction,
            )?)),
            None => Ok(None),
        }
    }

    /// Poll until the transaction is visible at `min_confirmation`
    ///
    /// A transaction whose execution failed is still returned; its error is
    /// carried in [`TransactionRecord::err`].
    pub async fn fetch(
        &self,
        signature: &Signature,
        cancel: &CancelToken,
    ) -> PayResult<TransactionRecord> {
        let started = Instant::now();
        let timeout = self.config.timeout();
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                debug!(%signature, "Fetch cancelled");
                return Err(PayError::Cancelled);
            }

            attempts += 1;
            if let Some(record) = self.poll_once(signature).await? {
                info!(
                    %signature,
                    status = %record.confirmation_status,
                    failed = record.err.is_some(),
                    "Fetched transaction"
                );
                return Ok(record);
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                warn!(%signature, attempts, "Transaction fetch timed out");
                return Err(PayError::TransactionNotFound(signature.to_string()));
            }

            let delay = self.config.poll_interval().min(timeout - elapsed);
            debug!(%signature, attempts, ?delay, "Transaction not visible yet");
            tokio::select! {
                _ = sleep(delay) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }
}
