//! Ledger instructions used by payments
//!
//! Covers the handful of program calls a payment needs: native transfers,
//! checked token transfers, idempotent associated-account creation and memos.
//! [`parse_instruction`] maps raw instructions back to these shapes.

use serde::{Deserialize, Serialize};
use solpay_core::programs::{
    ASSOCIATED_TOKEN_PROGRAM_ID, MEMO_PROGRAM_ID, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
use solpay_core::{PayResult, PublicKey};
use solpay_crypto::associated_token_address;

/// An account an instruction touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    pub pubkey: PublicKey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: PublicKey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(pubkey: PublicKey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A single program call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub program_id: PublicKey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// System program instructions, encoded with bincode like the program itself
///
/// Variant order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemInstruction {
    CreateAccount {
        lamports: u64,
        space: u64,
        owner: PublicKey,
    },
    Assign {
        owner: PublicKey,
    },
    Transfer {
        lamports: u64,
    },
}

/// Token program instruction tags
pub mod token_tag {
    pub const TRANSFER: u8 = 3;
    pub const TRANSFER_CHECKED: u8 = 12;
}

/// Associated-account program instruction tags
pub mod associated_tag {
    pub const CREATE: u8 = 0;
    pub const CREATE_IDEMPOTENT: u8 = 1;
}

/// Move native units between two system accounts
pub fn system_transfer(from: &PublicKey, to: &PublicKey, lamports: u64) -> PayResult<Instruction> {
    let data = bincode::serialize(&SystemInstruction::Transfer { lamports })?;
    Ok(Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![AccountMeta::new(*from, true), AccountMeta::new(*to, false)],
        data,
    })
}

/// Token transfer that also pins the mint and its decimals
pub fn transfer_checked(
    source: &PublicKey,
    mint: &PublicKey,
    destination: &PublicKey,
    authority: &PublicKey,
    amount: u64,
    decimals: u8,
) -> Instruction {
    let mut data = Vec::with_capacity(10);
    data.push(token_tag::TRANSFER_CHECKED);
    data.extend_from_slice(&amount.to_le_bytes());
    data.push(decimals);

    Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*source, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(*authority, true),
        ],
        data,
    }
}

/// Create `owner`'s associated account for `mint`; a no-op if it already exists
pub fn create_associated_token_account_idempotent(
    payer: &PublicKey,
    owner: &PublicKey,
    mint: &PublicKey,
) -> PayResult<Instruction> {
    let account = associated_token_address(owner, mint)?;
    Ok(Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(account, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        ],
        data: vec![associated_tag::CREATE_IDEMPOTENT],
    })
}

/// Literal memo; no accounts
pub fn memo(text: &str) -> Instruction {
    Instruction {
        program_id: MEMO_PROGRAM_ID,
        accounts: Vec::new(),
        data: text.as_bytes().to_vec(),
    }
}

/// What an instruction does, as far as payments care
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ParsedInstruction {
    SystemTransfer {
        from: PublicKey,
        to: PublicKey,
        lamports: u64,
    },
    TokenTransfer {
        source: PublicKey,
        destination: PublicKey,
        authority: PublicKey,
        amount: u64,
    },
    TokenTransferChecked {
        source: PublicKey,
        mint: PublicKey,
        destination: PublicKey,
        authority: PublicKey,
        amount: u64,
        decimals: u8,
    },
    CreateAssociatedAccount {
        payer: PublicKey,
        account: PublicKey,
        owner: PublicKey,
        mint: PublicKey,
    },
    Memo {
        data: Vec<u8>,
    },
    Unknown {
        program_id: PublicKey,
    },
}

fn read_u64(bytes: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

fn account(ix: &Instruction, index: usize) -> Option<PublicKey> {
    ix.accounts.get(index).map(|meta| meta.pubkey)
}

fn parse_system(ix: &Instruction) -> Option<ParsedInstruction> {
    match bincode::deserialize::<SystemInstruction>(&ix.data).ok()? {
        SystemInstruction::Transfer { lamports } => Some(ParsedInstruction::SystemTransfer {
            from: account(ix, 0)?,
            to: account(ix, 1)?,
            lamports,
        }),
        _ => None,
    }
}

fn parse_token(ix: &Instruction) -> Option<ParsedInstruction> {
    let (&tag, rest) = ix.data.split_first()?;
    match tag {
        token_tag::TRANSFER if rest.len() == 8 => Some(ParsedInstruction::TokenTransfer {
            source: account(ix, 0)?,
            destination: account(ix, 1)?,
            authority: account(ix, 2)?,
            amount: read_u64(rest)?,
        }),
        token_tag::TRANSFER_CHECKED if rest.len() == 9 => {
            Some(ParsedInstruction::TokenTransferChecked {
                source: account(ix, 0)?,
                mint: account(ix, 1)?,
                destination: account(ix, 2)?,
                authority: account(ix, 3)?,
                amount: read_u64(&rest[..8])?,
                decimals: rest[8],
            })
        }
        _ => None,
    }
}

fn parse_associated(ix: &Instruction) -> Option<ParsedInstruction> {
    match ix.data.as_slice() {
        [] | [associated_tag::CREATE] | [associated_tag::CREATE_IDEMPOTENT] => {
            Some(ParsedInstruction::CreateAssociatedAccount {
                payer: account(ix, 0)?,
                account: account(ix, 1)?,
                owner: account(ix, 2)?,
                mint: account(ix, 3)?,
            })
        }
        _ => None,
    }
}

/// Classify an instruction; anything unrecognised is [`ParsedInstruction::Unknown`]
pub fn parse_instruction(ix: &Instruction) -> ParsedInstruction {
    let parsed = if ix.program_id == SYSTEM_PROGRAM_ID {
        parse_system(ix)
    } else if ix.program_id == TOKEN_PROGRAM_ID {
        parse_token(ix)
    } else if ix.program_id == ASSOCIATED_TOKEN_PROGRAM_ID {
        parse_associated(ix)
    } else if ix.program_id == MEMO_PROGRAM_ID {
        Some(ParsedInstruction::Memo {
            data: ix.data.clone(),
        })
    } else {
        None
    };

    parsed.unwrap_or(ParsedInstruction::Unknown {
        program_id: ix.program_id,
    })
}
