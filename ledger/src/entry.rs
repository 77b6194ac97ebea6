//! Stored ledger entries

use serde::{Deserialize, Serialize};
use solpay_core::{Commitment, LedgerTransaction, Signature, SignatureInfo, SignatureStatus};

/// A landed transaction together with its current confirmation tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub transaction: LedgerTransaction,
    pub status: Commitment,
}

impl LedgerEntry {
    pub fn new(transaction: LedgerTransaction, status: Commitment) -> Self {
        Self { transaction, status }
    }

    /// First signature identifies the transaction
    pub fn signature(&self) -> Signature {
        self.transaction.signatures.first().copied().unwrap_or_default()
    }

    pub fn is_visible_at(&self, commitment: Commitment) -> bool {
        self.status.satisfies(commitment)
    }

    pub fn to_signature_info(&self) -> SignatureInfo {
        SignatureInfo {
            signature: self.signature(),
            slot: self.transaction.slot,
            err: self.transaction.err().map(str::to_string),
            confirmation_status: Some(self.status),
            block_time: self.transaction.block_time,
        }
    }

    pub fn to_status(&self) -> SignatureStatus {
        SignatureStatus {
            slot: self.transaction.slot,
            confirmation_status: Some(self.status),
            err: self.transaction.err().map(str::to_string),
        }
    }
}
