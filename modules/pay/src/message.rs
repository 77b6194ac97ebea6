//! Compiling instructions into a wire message and back

use solpay_core::{
    CompiledInstruction, Hash, LoadedAddresses, Message, MessageHeader, MessageVersion, PayError,
    PayResult, PublicKey,
};

use crate::instruction::{AccountMeta, Instruction};

/// Most accounts a legacy message can index
pub const MAX_ACCOUNT_KEYS: usize = 256;

#[derive(Debug, Clone, Copy)]
struct KeyFlags {
    pubkey: PublicKey,
    is_signer: bool,
    is_writable: bool,
}

/// Collect every key once, merging flags, in first-seen order with the payer first
fn collect_keys(instructions: &[Instruction], payer: &PublicKey) -> Vec<KeyFlags> {
    let mut keys = vec![KeyFlags {
        pubkey: *payer,
        is_signer: true,
        is_writable: true,
    }];

    let mut merge = |meta: AccountMeta| match keys.iter_mut().find(|k| k.pubkey == meta.pubkey) {
        Some(existing) => {
            existing.is_signer |= meta.is_signer;
            existing.is_writable |= meta.is_writable;
        }
        None => keys.push(KeyFlags {
            pubkey: meta.pubkey,
            is_signer: meta.is_signer,
            is_writable: meta.is_writable,
        }),
    };

    for ix in instructions {
        for meta in &ix.accounts {
            merge(*meta);
        }
    }
    for ix in instructions {
        merge(AccountMeta::new_readonly(ix.program_id, false));
    }

    keys
}

/// Compile instructions into a legacy message paid for by `payer`
///
/// Account order: writable signers (payer first), readonly signers,
/// writable non-signers, readonly non-signers.
pub fn compile(
    instructions: &[Instruction],
    payer: &PublicKey,
    recent_blockhash: Hash,
) -> PayResult<Message> {
    let keys = collect_keys(instructions, payer);
    if keys.len() > MAX_ACCOUNT_KEYS {
        return Err(PayError::Serialization(format!(
            "{} accounts exceed the message limit of {}",
            keys.len(),
            MAX_ACCOUNT_KEYS
        )));
    }

    let group = |signer: bool, writable: bool| {
        keys.iter()
            .filter(move |k| k.is_signer == signer && k.is_writable == writable)
            .map(|k| k.pubkey)
    };
    let writable_signers: Vec<_> = group(true, true).collect();
    let readonly_signers: Vec<_> = group(true, false).collect();
    let writable_unsigned: Vec<_> = group(false, true).collect();
    let readonly_unsigned: Vec<_> = group(false, false).collect();

    let header = MessageHeader {
        num_required_signatures: (writable_signers.len() + readonly_signers.len()) as u8,
        num_readonly_signed_accounts: readonly_signers.len() as u8,
        num_readonly_unsigned_accounts: readonly_unsigned.len() as u8,
    };

    let account_keys: Vec<PublicKey> = writable_signers
        .into_iter()
        .chain(readonly_signers)
        .chain(writable_unsigned)
        .chain(readonly_unsigned)
        .collect();

    let index_of = |key: &PublicKey| -> PayResult<u8> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| PayError::Internal(format!("account {} was not collected", key)))
    };

    let compiled = instructions
        .iter()
        .map(|ix| {
            Ok(CompiledInstruction {
                program_id_index: index_of(&ix.program_id)?,
                accounts: ix
                    .accounts
                    .iter()
                    .map(|meta| index_of(&meta.pubkey))
                    .collect::<PayResult<Vec<_>>>()?,
                data: ix.data.clone(),
            })
        })
        .collect::<PayResult<Vec<_>>>()?;

    Ok(Message {
        version: MessageVersion::Legacy,
        header,
        account_keys,
        recent_blockhash,
        instructions: compiled,
        address_table_lookups: Vec::new(),
    })
}

/// Recover instructions from a message
///
/// `loaded` supplies the accounts a version 0 message pulls from lookup
/// tables; pass the default for legacy messages.
pub fn decompile(message: &Message, loaded: &LoadedAddresses) -> PayResult<Vec<Instruction>> {
    let static_len = message.account_keys.len();
    let writable_len = loaded.writable.len();

    let meta_at = |index: u8| -> PayResult<AccountMeta> {
        let i = index as usize;
        let (pubkey, is_signer, is_writable) = if i < static_len {
            (message.account_keys[i], message.is_signer(i), message.is_writable(i))
        } else if i < static_len + writable_len {
            (loaded.writable[i - static_len], false, true)
        } else {
            let readonly = loaded
                .readonly
                .get(i - static_len - writable_len)
                .ok_or_else(|| {
                    PayError::Deserialization(format!("account index {} out of range", index))
                })?;
            (*readonly, false, false)
        };
        Ok(AccountMeta {
            pubkey,
            is_signer,
            is_writable,
        })
    };

    message
        .instructions
        .iter()
        .map(|ix| {
            Ok(Instruction {
                program_id: meta_at(ix.program_id_index)?.pubkey,
                accounts: ix
                    .accounts
                    .iter()
                    .map(|&index| meta_at(index))
                    .collect::<PayResult<Vec<_>>>()?,
                data: ix.data.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{memo, system_transfer, transfer_checked};
    use solpay_core::programs::{MEMO_PROGRAM_ID, SYSTEM_PROGRAM_ID};

    fn key(byte: u8) -> PublicKey {
        PublicKey::from_bytes([byte; 32])
    }

    #[test]
    fn test_compile_orders_accounts() {
        let payer = key(1);
        let reference = key(9);
        let mut transfer = system_transfer(&payer, &key(2), 10).unwrap();
        transfer
            .accounts
            .push(AccountMeta::new_readonly(reference, false));
        let instructions = vec![memo("hi"), transfer];

        let message = compile(&instructions, &payer, Hash::ZERO).unwrap();
        assert_eq!(message.header.num_required_signatures, 1);
        assert_eq!(message.header.num_readonly_signed_accounts, 0);
        // reference, memo program, system program
        assert_eq!(message.header.num_readonly_unsigned_accounts, 3);
        assert_eq!(
            message.account_keys,
            vec![payer, key(2), reference, MEMO_PROGRAM_ID, SYSTEM_PROGRAM_ID]
        );
        assert_eq!(message.fee_payer(), Some(&payer));
        assert!(message.is_writable(1));
        assert!(!message.is_writable(2));
    }

    #[test]
    fn test_readonly_signer_is_grouped() {
        let payer = key(1);
        let authority = key(4);
        let ix = transfer_checked(&key(5), &key(6), &key(7), &authority, 1, 0);
        let message = compile(&[ix], &payer, Hash::ZERO).unwrap();

        assert_eq!(message.header.num_required_signatures, 2);
        assert_eq!(message.header.num_readonly_signed_accounts, 1);
        assert_eq!(message.account_keys[1], authority);
    }

    #[test]
    fn test_decompile_inverts_compile() {
        let payer = key(1);
        let mut transfer = system_transfer(&payer, &key(2), 10).unwrap();
        transfer.accounts.push(AccountMeta::new_readonly(key(9), false));
        let instructions = vec![memo("hi"), transfer];

        let message = compile(&instructions, &payer, Hash::ZERO).unwrap();
        let bytes = message.serialize();
        let parsed = Message::deserialize(&bytes).unwrap();
        let recovered = decompile(&parsed, &LoadedAddresses::default()).unwrap();
        assert_eq!(recovered, instructions);
    }

    #[test]
    fn test_decompile_with_loaded_addresses() {
        let payer = key(1);
        let message = Message {
            version: MessageVersion::V0,
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            },
            account_keys: vec![payer, SYSTEM_PROGRAM_ID],
            recent_blockhash: Hash::ZERO,
            instructions: vec![CompiledInstruction {
                program_id_index: 1,
                accounts: vec![0, 2, 3],
                data: vec![],
            }],
            address_table_lookups: vec![],
        };
        let loaded = LoadedAddresses {
            writable: vec![key(2)],
            readonly: vec![key(3)],
        };

        let ix = &decompile(&message, &loaded).unwrap()[0];
        assert_eq!(ix.accounts[1], AccountMeta::new(key(2), false));
        assert_eq!(ix.accounts[2], AccountMeta::new_readonly(key(3), false));

        let missing = decompile(&message, &LoadedAddresses::default());
        assert!(matches!(missing, Err(PayError::Deserialization(_))));
    }
}
