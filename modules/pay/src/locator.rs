//! Reference lookup on the ledger

use solpay_core::{
    CancelToken, LedgerClient, LocatorConfig, PayError, PayResult, PublicKey, Signature,
    SignatureInfo,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::poll::{LookupState, ReferencePoll};

/// Finds the one transaction that carries a reference key
pub struct ReferenceLocator<'a, L: ?Sized> {
    ledger: &'a L,
    config: LocatorConfig,
}

impl<'a, L: LedgerClient + ?Sized> ReferenceLocator<'a, L> {
    /// Fails with [`PayError::Config`] on settings that would spin or hide reuse
    pub fn new(ledger: &'a L, config: LocatorConfig) -> PayResult<Self> {
        config.validate()?;
        Ok(Self { ledger, config })
    }

    pub async fn find_signature(
        &self,
        reference: &PublicKey,
        cancel: &CancelToken,
    ) -> PayResult<Signature> {
        Ok(self.find_signature_info(reference, cancel).await?.signature)
    }

    /// Poll until exactly one transaction references `reference`
    ///
    /// Cancellation is honoured between queries and cuts a wait short. Ledger errors end the
    /// lookup at once; only "nothing yet" is retried.
    pub async fn find_signature_info(
        &self,
        reference: &PublicKey,
        cancel: &CancelToken,
    ) -> PayResult<SignatureInfo> {
        let mut poll = ReferencePoll::new(self.config.clone());
        let started = Instant::now();

        loop {
            if cancel.is_cancelled() {
                poll.cancel();
            } else {
                let signatures = self
                    .ledger
                    .signatures_for_address(
                        reference,
                        self.config.query_limit,
                        self.config.commitment,
                    )
                    .await?;
                poll.observe(signatures, started.elapsed());
            }

            match poll.state() {
                LookupState::Waiting { attempts } => {
                    let delay = poll.next_delay(started.elapsed()).unwrap_or_default();
                    debug!(%reference, attempts, ?delay, "Reference not seen yet");
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = cancel.cancelled() => {}
                    }
                }
                LookupState::Found(found) => {
                    info!(%reference, signature = %found.signature, "Reference found");
                    return Ok(found.clone());
                }
                LookupState::Ambiguous { count } => {
                    warn!(%reference, count, "Reference used by several transactions");
                    return Err(PayError::AmbiguousReference {
                        reference: *reference,
                        count: *count,
                    });
                }
                LookupState::TimedOut { attempts } => {
                    warn!(%reference, attempts, "Reference lookup timed out");
                    return Err(PayError::TransactionNotFound(format!(
                        "no transaction references {}",
                        reference
                    )));
                }
                LookupState::Cancelled => {
                    debug!(%reference, "Reference lookup cancelled");
                    return Err(PayError::Cancelled);
                }
            }
        }
    }
}
