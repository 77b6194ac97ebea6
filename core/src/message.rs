//! Ledger wire message format
//!
//! Layout (legacy):
//! - header: 3 bytes (required signatures, readonly signed, readonly unsigned)
//! - account keys: compact-u16 length, then 32 bytes each
//! - recent blockhash: 32 bytes
//! - instructions: compact-u16 length, then per instruction
//!   `program_id_index`, compact accounts, compact data
//!
//! Version 0 messages prefix the same body with `0x80` and append
//! address-table lookups.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::PayError;
use crate::traits::PayResult;
use crate::types::{Hash, PublicKey, Signature};

const VERSION_PREFIX: u8 = 0x80;

/// Message header describing signer / writable partitions of the key list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

/// Instruction with accounts referenced by index into the message key list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// Address-table lookup carried by version 0 messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAddressTableLookup {
    pub account_key: PublicKey,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MessageVersion {
    #[default]
    Legacy,
    V0,
}

/// Unsigned ledger message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub version: MessageVersion,
    pub header: MessageHeader,
    pub account_keys: Vec<PublicKey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
    pub address_table_lookups: Vec<MessageAddressTableLookup>,
}

impl Message {
    /// First signer; pays fees
    pub fn fee_payer(&self) -> Option<&PublicKey> {
        self.account_keys.first()
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < self.header.num_required_signatures as usize
    }

    /// Writability for static keys only
    pub fn is_writable(&self, index: usize) -> bool {
        let signers = self.header.num_required_signatures as usize;
        if index >= self.account_keys.len() {
            return false;
        }
        if index < signers {
            index < signers.saturating_sub(self.header.num_readonly_signed_accounts as usize)
        } else {
            index
                < self
                    .account_keys
                    .len()
                    .saturating_sub(self.header.num_readonly_unsigned_accounts as usize)
        }
    }

    /// Serialize to wire bytes
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(64 + self.account_keys.len() * 32);

        if self.version == MessageVersion::V0 {
            bytes.push(VERSION_PREFIX);
        }

        bytes.push(self.header.num_required_signatures);
        bytes.push(self.header.num_readonly_signed_accounts);
        bytes.push(self.header.num_readonly_unsigned_accounts);

        encode_compact_u16(self.account_keys.len(), &mut bytes);
        for key in &self.account_keys {
            bytes.extend_from_slice(key.as_bytes());
        }

        bytes.extend_from_slice(self.recent_blockhash.as_bytes());

        encode_compact_u16(self.instructions.len(), &mut bytes);
        for ix in &self.instructions {
            bytes.push(ix.program_id_index);
            encode_compact_u16(ix.accounts.len(), &mut bytes);
            bytes.extend_from_slice(&ix.accounts);
            encode_compact_u16(ix.data.len(), &mut bytes);
            bytes.extend_from_slice(&ix.data);
        }

        if self.version == MessageVersion::V0 {
            encode_compact_u16(self.address_table_lookups.len(), &mut bytes);
            for lookup in &self.address_table_lookups {
                bytes.extend_from_slice(lookup.account_key.as_bytes());
                encode_compact_u16(lookup.writable_indexes.len(), &mut bytes);
                bytes.extend_from_slice(&lookup.writable_indexes);
                encode_compact_u16(lookup.readonly_indexes.len(), &mut bytes);
                bytes.extend_from_slice(&lookup.readonly_indexes);
            }
        }

        bytes
    }

    /// Base64 of the wire bytes, as handed to wallets for signing
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.serialize())
    }

    pub fn from_base64(encoded: &str) -> PayResult<Self> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| PayError::Serialization(format!("invalid base64: {}", e)))?;
        Self::deserialize(&bytes)
    }

    /// Deserialize from wire bytes
    pub fn deserialize(bytes: &[u8]) -> PayResult<Self> {
        let mut reader = Reader::new(bytes);
        let message = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(message)
    }

    fn read(reader: &mut Reader<'_>) -> PayResult<Self> {
        let first = reader.u8()?;
        let (version, num_required_signatures) = if first & VERSION_PREFIX != 0 {
            let version = first & !VERSION_PREFIX;
            if version != 0 {
                return Err(PayError::Deserialization(format!(
                    "unsupported message version {}",
                    version
                )));
            }
            (MessageVersion::V0, reader.u8()?)
        } else {
            (MessageVersion::Legacy, first)
        };

        let header = MessageHeader {
            num_required_signatures,
            num_readonly_signed_accounts: reader.u8()?,
            num_readonly_unsigned_accounts: reader.u8()?,
        };

        let key_count = reader.compact_u16()?;
        let mut account_keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            account_keys.push(reader.public_key()?);
        }

        let recent_blockhash = Hash::from_bytes(reader.array::<32>()?);

        let ix_count = reader.compact_u16()?;
        let mut instructions = Vec::with_capacity(ix_count);
        for _ in 0..ix_count {
            let program_id_index = reader.u8()?;
            let account_count = reader.compact_u16()?;
            let accounts = reader.take(account_count)?.to_vec();
            let data_len = reader.compact_u16()?;
            let data = reader.take(data_len)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }

        let mut address_table_lookups = Vec::new();
        if version == MessageVersion::V0 {
            let lookup_count = reader.compact_u16()?;
            for _ in 0..lookup_count {
                let account_key = reader.public_key()?;
                let writable_len = reader.compact_u16()?;
                let writable_indexes = reader.take(writable_len)?.to_vec();
                let readonly_len = reader.compact_u16()?;
                let readonly_indexes = reader.take(readonly_len)?.to_vec();
                address_table_lookups.push(MessageAddressTableLookup {
                    account_key,
                    writable_indexes,
                    readonly_indexes,
                });
            }
        }

        Ok(Self {
            version,
            header,
            account_keys,
            recent_blockhash,
            instructions,
            address_table_lookups,
        })
    }
}

/// Serialize a signed transaction: compact signature list followed by the message
pub fn serialize_transaction(signatures: &[Signature], message: &Message) -> Vec<u8> {
    let mut bytes = Vec::new();
    encode_compact_u16(signatures.len(), &mut bytes);
    for sig in signatures {
        bytes.extend_from_slice(sig.as_bytes());
    }
    bytes.extend_from_slice(&message.serialize());
    bytes
}

/// Deserialize a signed transaction into its signatures and message
pub fn deserialize_transaction(bytes: &[u8]) -> PayResult<(Vec<Signature>, Message)> {
    let mut reader = Reader::new(bytes);
    let count = reader.compact_u16()?;
    let mut signatures = Vec::with_capacity(count);
    for _ in 0..count {
        signatures.push(Signature::from_bytes(reader.array::<64>()?));
    }
    let message = Message::read(&mut reader)?;
    reader.finish()?;
    Ok((signatures, message))
}

/// Append a compact-u16 length (7 bits per byte, high bit = continuation)
pub fn encode_compact_u16(len: usize, out: &mut Vec<u8>) {
    let mut value = len as u16;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> PayResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| PayError::Deserialization("message truncated".into()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> PayResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> PayResult<[u8; N]> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.take(N)?);
        Ok(arr)
    }

    fn public_key(&mut self) -> PayResult<PublicKey> {
        Ok(PublicKey::from_bytes(self.array::<32>()?))
    }

    fn compact_u16(&mut self) -> PayResult<usize> {
        let mut value: usize = 0;
        for i in 0..3 {
            let byte = self.u8()?;
            value |= ((byte & 0x7f) as usize) << (7 * i);
            if byte & 0x80 == 0 {
                return if value > u16::MAX as usize {
                    Err(PayError::Deserialization("compact-u16 overflow".into()))
                } else {
                    Ok(value)
                };
            }
        }
        Err(PayError::Deserialization("compact-u16 too long".into()))
    }

    fn finish(&self) -> PayResult<()> {
        if self.pos == self.bytes.len() {
            Ok(())
        } else {
            Err(PayError::Deserialization(format!(
                "{} trailing bytes",
                self.bytes.len() - self.pos
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message(version: MessageVersion) -> Message {
        Message {
            version,
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 2,
            },
            account_keys: vec![
                PublicKey([1u8; 32]),
                PublicKey([2u8; 32]),
                PublicKey([3u8; 32]),
                PublicKey([0u8; 32]),
            ],
            recent_blockhash: Hash([9u8; 32]),
            instructions: vec![CompiledInstruction {
                program_id_index: 3,
                accounts: vec![0, 1, 2],
                data: vec![2, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0],
            }],
            address_table_lookups: vec![],
        }
    }

    #[test]
    fn test_compact_u16() {
        for (value, expected) in [
            (0usize, vec![0x00]),
            (0x7f, vec![0x7f]),
            (0x80, vec![0x80, 0x01]),
            (0x3fff, vec![0xff, 0x7f]),
            (0x4000, vec![0x80, 0x80, 0x01]),
        ] {
            let mut out = Vec::new();
            encode_compact_u16(value, &mut out);
            assert_eq!(out, expected);
            assert_eq!(Reader::new(&out).compact_u16().unwrap(), value);
        }
    }

    #[test]
    fn test_legacy_layout() {
        let message = sample_message(MessageVersion::Legacy);
        let bytes = message.serialize();
        // header + len + 4 keys + blockhash + len + (index + len + 3 + len + 12)
        assert_eq!(bytes.len(), 3 + 1 + 4 * 32 + 32 + 1 + (1 + 1 + 3 + 1 + 12));
        assert_eq!(&bytes[..4], &[1, 0, 2, 4]);
        assert_eq!(Message::deserialize(&bytes).unwrap(), message);
    }

    #[test]
    fn test_v0_prefix() {
        let mut message = sample_message(MessageVersion::V0);
        message.address_table_lookups.push(MessageAddressTableLookup {
            account_key: PublicKey([5u8; 32]),
            writable_indexes: vec![1],
            readonly_indexes: vec![0, 2],
        });
        let bytes = message.serialize();
        assert_eq!(bytes[0], 0x80);
        assert_eq!(Message::deserialize(&bytes).unwrap(), message);
    }

    #[test]
    fn test_signer_and_writable_partitions() {
        let message = sample_message(MessageVersion::Legacy);
        assert!(message.is_signer(0));
        assert!(message.is_writable(0));
        assert!(!message.is_signer(1));
        assert!(message.is_writable(1));
        assert!(!message.is_writable(2));
        assert!(!message.is_writable(3));
    }

    #[test]
    fn test_truncated_rejected() {
        let bytes = sample_message(MessageVersion::Legacy).serialize();
        let result = Message::deserialize(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(PayError::Deserialization(_))));
    }

    #[test]
    fn test_transaction_envelope() {
        let message = sample_message(MessageVersion::Legacy);
        let sig = Signature([4u8; 64]);
        let bytes = serialize_transaction(&[sig], &message);
        let (sigs, decoded) = deserialize_transaction(&bytes).unwrap();
        assert_eq!(sigs, vec![sig]);
        assert_eq!(decoded, message);
    }
}
