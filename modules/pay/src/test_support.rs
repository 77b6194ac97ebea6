//! Scripted ledger stub shared by the polling tests

use async_trait::async_trait;
use solpay_core::{
    Commitment, Hash, LedgerClient, LedgerTransaction, PayError, PayResult, PublicKey, Signature,
    SignatureInfo, SignatureStatus, TransactionMeta,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::instruction::Instruction;
use crate::message::compile;

/// Pops the next scripted answer per call; the last answer repeats forever
pub(crate) struct Script<T: Clone>(Mutex<VecDeque<T>>);

impl<T: Clone> Script<T> {
    pub fn new(answers: Vec<T>) -> Self {
        Self(Mutex::new(answers.into()))
    }

    fn next(&self) -> Option<T> {
        let mut answers = self.0.lock().unwrap();
        if answers.len() > 1 {
            answers.pop_front()
        } else {
            answers.front().cloned()
        }
    }
}

pub(crate) struct ScriptedLedger {
    lookups: Script<Vec<SignatureInfo>>,
    statuses: Script<Option<SignatureStatus>>,
    transaction: Option<LedgerTransaction>,
    fail_lookups: bool,
    pub lookup_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl ScriptedLedger {
    pub fn with_lookups(lookups: Vec<Vec<SignatureInfo>>) -> Self {
        Self {
            lookups: Script::new(lookups),
            statuses: Script::new(vec![None]),
            transaction: None,
            fail_lookups: false,
            lookup_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_statuses(
        statuses: Vec<Option<SignatureStatus>>,
        transaction: LedgerTransaction,
    ) -> Self {
        Self {
            statuses: Script::new(statuses),
            transaction: Some(transaction),
            ..Self::with_lookups(vec![vec![]])
        }
    }

    /// Replace the lookup script
    pub fn lookups_then(mut self, lookups: Vec<Vec<SignatureInfo>>) -> Self {
        self.lookups = Script::new(lookups);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_lookups: true,
            ..Self::with_lookups(vec![vec![]])
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn status_queries(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn signatures_for_address(
        &self,
        _address: &PublicKey,
        _limit: usize,
        _commitment: Commitment,
    ) -> PayResult<Vec<SignatureInfo>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            return Err(PayError::Ledger("connection refused".into()));
        }
        Ok(self.lookups.next().unwrap_or_default())
    }

    async fn signature_status(&self, _signature: &Signature) -> PayResult<Option<SignatureStatus>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.statuses.next().flatten())
    }

    async fn transaction(
        &self,
        _signature: &Signature,
        _commitment: Commitment,
    ) -> PayResult<Option<LedgerTransaction>> {
        Ok(self.transaction.clone())
    }
}

pub(crate) fn key(byte: u8) -> PublicKey {
    PublicKey::from_bytes([byte; 32])
}

pub(crate) fn signature_info(byte: u8) -> SignatureInfo {
    SignatureInfo {
        signature: Signature::from_bytes([byte; 64]),
        slot: u64::from(byte),
        err: None,
        confirmation_status: Some(Commitment::Confirmed),
        block_time: None,
    }
}

pub(crate) fn status(level: Commitment) -> Option<SignatureStatus> {
    Some(SignatureStatus {
        slot: 1,
        confirmation_status: Some(level),
        err: None,
    })
}

/// A landed transaction carrying `instructions`, paid for by `payer`
pub(crate) fn landed(
    instructions: &[Instruction],
    payer: &PublicKey,
    meta: TransactionMeta,
) -> LedgerTransaction {
    LedgerTransaction {
        slot: 1,
        block_time: None,
        signatures: vec![Signature::from_bytes([1u8; 64])],
        message: compile(instructions, payer, Hash::ZERO).unwrap(),
        loaded_addresses: Default::default(),
        meta: Some(meta),
    }
}
