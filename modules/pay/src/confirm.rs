//! End-to-end payment confirmation: locate, fetch, validate

use serde::{Deserialize, Serialize};
use solpay_core::{CancelToken, LedgerClient, PayConfig, PayError, PayResult, Signature};
use tracing::info;

use crate::descriptor::PaymentDescriptor;
use crate::fetcher::{TransactionFetcher, TransactionRecord};
use crate::locator::ReferenceLocator;
use crate::validator::PaymentValidator;

/// A payment that landed and matched its request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub signature: Signature,
    pub record: TransactionRecord,
}

/// Wait for the payment requested by `descriptor` and check it
///
/// Fails with `TransactionNotFound` when nothing arrives in time and with
/// `ValidationMismatch` when something arrived but does not match.
pub async fn confirm_payment<L>(
    ledger: &L,
    descriptor: &PaymentDescriptor,
    config: &PayConfig,
    cancel: &CancelToken,
) -> PayResult<PaymentConfirmation>
where
    L: LedgerClient + ?Sized,
{
    let reference = descriptor.lookup_reference().ok_or_else(|| {
        PayError::Config("payment request carries no reference key to look up".into())
    })?;

    let signature = ReferenceLocator::new(ledger, config.locator.clone())?
        .find_signature(reference, cancel)
        .await?;

    let record = TransactionFetcher::new(ledger, config.fetcher.clone())?
        .fetch(&signature, cancel)
        .await?;

    PaymentValidator::new()
        .validate(&record, descriptor)
        .into_result()?;

    info!(%signature, recipient = %descriptor.recipient(), "Payment confirmed");
    Ok(PaymentConfirmation { signature, record })
}
