//! Payment validation against a fetched transaction

use serde::{Deserialize, Serialize};
use solpay_core::{
    to_base_units, Asset, MismatchReason, PayError, PayResult, PublicKey, NATIVE_DECIMALS,
};
use solpay_crypto::associated_token_address;
use tracing::debug;

use crate::descriptor::PaymentDescriptor;
use crate::fetcher::{TransactionRecord, TransferDetail};

/// Outcome of comparing a landed transaction with a payment request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "reason", rename_all = "kebab-case")]
pub enum ValidationResult {
    Match,
    Mismatch(MismatchReason),
}

impl ValidationResult {
    pub fn is_match(&self) -> bool {
        matches!(self, ValidationResult::Match)
    }

    pub fn into_result(self) -> PayResult<()> {
        match self {
            ValidationResult::Match => Ok(()),
            ValidationResult::Mismatch(reason) => Err(PayError::ValidationMismatch(reason)),
        }
    }
}

/// Checks a [`TransactionRecord`] against a [`PaymentDescriptor`]
///
/// Checks run in a fixed order and the first failure decides the result:
/// execution, recipient, asset, amount, memo. A failed execution outranks
/// everything else since it moved no value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentValidator;

impl PaymentValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(
        &self,
        record: &TransactionRecord,
        descriptor: &PaymentDescriptor,
    ) -> ValidationResult {
        let result = match check(record, descriptor) {
            Ok(()) => ValidationResult::Match,
            Err(reason) => ValidationResult::Mismatch(reason),
        };
        debug!(signature = %record.signature, ?result, "Validated payment");
        result
    }
}

/// Validate with the default validator
pub fn validate(record: &TransactionRecord, descriptor: &PaymentDescriptor) -> ValidationResult {
    PaymentValidator::new().validate(record, descriptor)
}

/// Whether `transfer` credits `recipient`, directly or through its associated account
fn pays_recipient(transfer: &TransferDetail, recipient: &PublicKey) -> bool {
    match transfer {
        TransferDetail::Native { destination, .. } => destination == recipient,
        TransferDetail::Token {
            destination,
            destination_owner,
            mint,
            ..
        } => {
            destination_owner.as_ref() == Some(recipient)
                || mint
                    .as_ref()
                    .and_then(|mint| associated_token_address(recipient, mint).ok())
                    .map_or(false, |account| account == *destination)
        }
    }
}

fn is_asset(transfer: &TransferDetail, asset: &Asset) -> bool {
    match (transfer, asset) {
        (TransferDetail::Native { .. }, Asset::Native) => true,
        (TransferDetail::Token { mint, .. }, Asset::Token(expected)) => {
            mint.as_ref() == Some(expected)
        }
        _ => false,
    }
}

fn check(record: &TransactionRecord, descriptor: &PaymentDescriptor) -> Result<(), MismatchReason> {
    if !record.is_success() {
        return Err(MismatchReason::ExecutionFailed);
    }

    let to_recipient: Vec<&TransferDetail> = record
        .transfers
        .iter()
        .filter(|t| pays_recipient(t, descriptor.recipient()))
        .collect();
    if to_recipient.is_empty() {
        return Err(MismatchReason::Recipient);
    }

    let matching: Vec<&TransferDetail> = to_recipient
        .into_iter()
        .filter(|t| is_asset(t, descriptor.asset()))
        .collect();
    if matching.is_empty() {
        return Err(MismatchReason::Asset);
    }

    let total: u128 = matching.iter().map(|t| u128::from(t.base_units())).sum();
    match descriptor.amount() {
        Some(amount) => {
            let decimals = match descriptor.asset() {
                Asset::Native => Some(NATIVE_DECIMALS),
                Asset::Token(_) => matching.iter().find_map(|t| match t {
                    TransferDetail::Token { decimals, .. } => *decimals,
                    TransferDetail::Native { .. } => None,
                }),
            };
            let expected = decimals
                .and_then(|decimals| to_base_units(&amount, decimals).ok())
                .ok_or(MismatchReason::Amount)?;
            if total != u128::from(expected) {
                return Err(MismatchReason::Amount);
            }
        }
        None if total == 0 => return Err(MismatchReason::Amount),
        None => {}
    }

    if let Some(memo) = descriptor.memo() {
        if !record.memos.iter().any(|m| m.as_slice() == memo.as_bytes()) {
            return Err(MismatchReason::Memo);
        }
    }

    Ok(())
}
