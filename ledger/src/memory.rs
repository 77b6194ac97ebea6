//! In-memory ledger for testing and local demos

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use solpay_core::{
    Commitment, LedgerClient, LedgerTransaction, Message, MintInfo, PayError, PayResult,
    PublicKey, Signature, SignatureInfo, SignatureStatus, TokenMetadataProvider,
    TransactionMeta,
};
use solpay_crypto::signing::verify_message;
use tracing::debug;

use crate::entry::LedgerEntry;

/// In-memory ledger
///
/// Safe for concurrent use: every map is sharded and the slot counter sits
/// behind its own lock, so independent queries never serialize on each other.
pub struct MemoryLedger {
    transactions: DashMap<Signature, LedgerEntry>,
    /// Signatures per touched account, newest first
    by_address: DashMap<PublicKey, Vec<Signature>>,
    mints: DashMap<PublicKey, MintInfo>,
    accounts: DashSet<PublicKey>,
    slot: RwLock<u64>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
            by_address: DashMap::new(),
            mints: DashMap::new(),
            accounts: DashSet::new(),
            slot: RwLock::new(0),
        }
    }

    /// Register a mint; the mint address itself also becomes an existing account
    pub fn add_mint(&self, mint: PublicKey, info: MintInfo) {
        self.mints.insert(mint, info);
        self.accounts.insert(mint);
    }

    pub fn add_account(&self, address: PublicKey) {
        self.accounts.insert(address);
    }

    pub fn current_slot(&self) -> u64 {
        *self.slot.read()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Verify the signatures on a message and land it at `processed`
    pub fn submit(&self, message: Message, signatures: Vec<Signature>) -> PayResult<Signature> {
        self.submit_with_meta(message, signatures, TransactionMeta::default())
    }

    /// Like [`MemoryLedger::submit`], with explicit execution metadata
    ///
    /// A `meta.err` lands the transaction as failed: it is still indexed and
    /// fetchable, exactly like a real ledger that charged the fee.
    pub fn submit_with_meta(
        &self,
        message: Message,
        signatures: Vec<Signature>,
        meta: TransactionMeta,
    ) -> PayResult<Signature> {
        verify_message(&message, &signatures)?;

        let slot = {
            let mut slot = self.slot.write();
            *slot += 1;
            *slot
        };

        let transaction = LedgerTransaction {
            slot,
            block_time: None,
            signatures,
            message,
            loaded_addresses: Default::default(),
            meta: Some(meta),
        };
        self.land(transaction, Commitment::Processed)
    }

    /// Insert a transaction verbatim, without signature checks
    pub fn land(&self, transaction: LedgerTransaction, status: Commitment) -> PayResult<Signature> {
        let signature = transaction
            .signatures
            .first()
            .copied()
            .ok_or_else(|| PayError::Ledger("transaction carries no signature".into()))?;

        if self.transactions.contains_key(&signature) {
            return Err(PayError::Ledger(format!("duplicate signature {}", signature)));
        }

        {
            let mut slot = self.slot.write();
            *slot = (*slot).max(transaction.slot);
        }

        let mut touched = transaction.account_keys();
        touched.sort();
        touched.dedup();
        for address in touched {
            self.by_address.entry(address).or_default().insert(0, signature);
        }

        debug!(%signature, slot = transaction.slot, status = %status, "Landed transaction");
        self.transactions
            .insert(signature, LedgerEntry::new(transaction, status));
        Ok(signature)
    }

    /// Move a landed transaction to another confirmation tier
    pub fn set_confirmation(&self, signature: &Signature, status: Commitment) -> PayResult<()> {
        let mut entry = self
            .transactions
            .get_mut(signature)
            .ok_or_else(|| PayError::TransactionNotFound(signature.to_string()))?;
        entry.status = status;
        Ok(())
    }

    pub fn entry(&self, signature: &Signature) -> Option<LedgerEntry> {
        self.transactions.get(signature).map(|e| e.value().clone())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn signatures_for_address(
        &self,
        address: &PublicKey,
        limit: usize,
        commitment: Commitment,
    ) -> PayResult<Vec<SignatureInfo>> {
        let Some(signatures) = self.by_address.get(address) else {
            return Ok(Vec::new());
        };

        let infos = signatures
            .iter()
            .filter_map(|signature| self.transactions.get(signature))
            .filter(|entry| entry.is_visible_at(commitment))
            .take(limit)
            .map(|entry| entry.to_signature_info())
            .collect();
        Ok(infos)
    }

    async fn signature_status(&self, signature: &Signature) -> PayResult<Option<SignatureStatus>> {
        Ok(self.transactions.get(signature).map(|entry| entry.to_status()))
    }

    async fn transaction(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> PayResult<Option<LedgerTransaction>> {
        Ok(self
            .transactions
            .get(signature)
            .filter(|entry| entry.is_visible_at(commitment))
            .map(|entry| entry.transaction.clone()))
    }
}

#[async_trait]
impl TokenMetadataProvider for MemoryLedger {
    async fn mint_info(&self, mint: &PublicKey) -> PayResult<Option<MintInfo>> {
        Ok(self.mints.get(mint).map(|info| *info))
    }

    async fn account_exists(&self, address: &PublicKey) -> PayResult<bool> {
        Ok(self.accounts.contains(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solpay_core::{CompiledInstruction, Hash, MessageHeader, MessageVersion};
    use solpay_crypto::{sign_message, KeyPair};

    fn transfer_message(payer: &KeyPair, touched: &[PublicKey]) -> Message {
        let mut account_keys = vec![payer.public_key()];
        account_keys.extend_from_slice(touched);
        account_keys.push(PublicKey::default());
        let program_index = (account_keys.len() - 1) as u8;
        Message {
            version: MessageVersion::Legacy,
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            },
            account_keys,
            recent_blockhash: Hash::ZERO,
            instructions: vec![CompiledInstruction {
                program_id_index: program_index,
                accounts: vec![0],
                data: vec![],
            }],
            address_table_lookups: vec![],
        }
    }

    fn submit(ledger: &MemoryLedger, touched: &[PublicKey]) -> Signature {
        let payer = KeyPair::generate();
        let message = transfer_message(&payer, touched);
        let signature = sign_message(&payer, &message);
        ledger.submit(message, vec![signature]).unwrap()
    }

    #[tokio::test]
    async fn test_submit_and_query_by_address() {
        let ledger = MemoryLedger::new();
        let reference = solpay_crypto::new_reference();

        let first = submit(&ledger, &[reference]);
        let second = submit(&ledger, &[reference]);
        ledger.set_confirmation(&first, Commitment::Confirmed).unwrap();
        ledger.set_confirmation(&second, Commitment::Confirmed).unwrap();

        let found = ledger
            .signatures_for_address(&reference, 10, Commitment::Confirmed)
            .await
            .unwrap();
        let signatures: Vec<_> = found.iter().map(|info| info.signature).collect();
        assert_eq!(signatures, vec![second, first]);

        let limited = ledger
            .signatures_for_address(&reference, 1, Commitment::Confirmed)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_commitment_gates_visibility() {
        let ledger = MemoryLedger::new();
        let reference = solpay_crypto::new_reference();
        let signature = submit(&ledger, &[reference]);

        assert!(ledger
            .transaction(&signature, Commitment::Confirmed)
            .await
            .unwrap()
            .is_none());
        assert!(ledger
            .signatures_for_address(&reference, 10, Commitment::Confirmed)
            .await
            .unwrap()
            .is_empty());

        ledger.set_confirmation(&signature, Commitment::Finalized).unwrap();
        let tx = ledger
            .transaction(&signature, Commitment::Confirmed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.signatures[0], signature);

        let status = ledger.signature_status(&signature).await.unwrap().unwrap();
        assert_eq!(status.confirmation_status, Some(Commitment::Finalized));
    }

    #[test]
    fn test_rejects_bad_signature() {
        let ledger = MemoryLedger::new();
        let payer = KeyPair::generate();
        let other = KeyPair::generate();
        let message = transfer_message(&payer, &[]);
        let forged = sign_message(&other, &message);

        assert!(ledger.submit(message, vec![forged]).is_err());
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_metadata_provider() {
        let ledger = MemoryLedger::new();
        let mint = solpay_crypto::new_reference();
        ledger.add_mint(mint, MintInfo::new(6, 1_000_000));

        let info = ledger.mint_info(&mint).await.unwrap().unwrap();
        assert_eq!(info.decimals, 6);
        assert!(ledger.account_exists(&mint).await.unwrap());
        assert!(ledger
            .mint_info(&solpay_crypto::new_reference())
            .await
            .unwrap()
            .is_none());
    }
}
