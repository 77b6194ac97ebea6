//! JSON-RPC wire types and their conversion into core types

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solpay_core::programs::TOKEN_PROGRAM_ID;
use solpay_core::{
    deserialize_transaction, Commitment, Hash, LedgerTransaction, LoadedAddresses, MintInfo,
    PublicKey, Signature, SignatureInfo, SignatureStatus, TokenBalance, TransactionMeta,
};

use crate::error::RpcError;

/// Size of a token-program mint account
pub const MINT_ACCOUNT_LEN: usize = 82;

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// `{ context, value }` envelope used by most account-level methods
#[derive(Debug, Deserialize)]
pub struct WithContext<T> {
    pub value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcSignatureInfo {
    pub signature: String,
    pub slot: u64,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub confirmation_status: Option<Commitment>,
    #[serde(default)]
    pub block_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcSignatureStatus {
    pub slot: u64,
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub confirmation_status: Option<Commitment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcUiTokenAmount {
    pub amount: String,
    pub decimals: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTokenBalance {
    pub account_index: u8,
    pub mint: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub ui_token_amount: RpcUiTokenAmount,
}

#[derive(Debug, Default, Deserialize)]
pub struct RpcLoadedAddresses {
    #[serde(default)]
    pub writable: Vec<String>,
    #[serde(default)]
    pub readonly: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransactionMeta {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub pre_balances: Vec<u64>,
    #[serde(default)]
    pub post_balances: Vec<u64>,
    #[serde(default)]
    pub pre_token_balances: Option<Vec<RpcTokenBalance>>,
    #[serde(default)]
    pub post_token_balances: Option<Vec<RpcTokenBalance>>,
    #[serde(default)]
    pub log_messages: Option<Vec<String>>,
    #[serde(default)]
    pub loaded_addresses: Option<RpcLoadedAddresses>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    /// `[data, encoding]`
    pub transaction: (String, String),
    #[serde(default)]
    pub meta: Option<RpcTransactionMeta>,
}

#[derive(Debug, Deserialize)]
pub struct RpcAccount {
    /// `[data, encoding]`
    pub data: (String, String),
    pub owner: String,
    pub lamports: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

fn parse_key(s: &str) -> Result<PublicKey, RpcError> {
    s.parse().map_err(|_| RpcError::Decode(format!("bad public key {}", s)))
}

fn parse_keys(keys: &[String]) -> Result<Vec<PublicKey>, RpcError> {
    keys.iter().map(|k| parse_key(k)).collect()
}

/// Execution errors arrive as arbitrary JSON; keep their compact text form
fn error_text(err: Option<Value>) -> Option<String> {
    err.filter(|v| !v.is_null()).map(|v| v.to_string())
}

fn decode_base64(data: &(String, String)) -> Result<Vec<u8>, RpcError> {
    if data.1 != "base64" {
        return Err(RpcError::Decode(format!("unexpected encoding {}", data.1)));
    }
    STANDARD
        .decode(&data.0)
        .map_err(|e| RpcError::Decode(e.to_string()))
}

impl RpcSignatureInfo {
    pub fn into_core(self) -> Result<SignatureInfo, RpcError> {
        Ok(SignatureInfo {
            signature: self
                .signature
                .parse::<Signature>()
                .map_err(|e| RpcError::Decode(e.to_string()))?,
            slot: self.slot,
            err: error_text(self.err),
            confirmation_status: self.confirmation_status,
            block_time: self.block_time,
        })
    }
}

impl RpcSignatureStatus {
    pub fn into_core(self) -> SignatureStatus {
        SignatureStatus {
            slot: self.slot,
            confirmation_status: self.confirmation_status,
            err: error_text(self.err),
        }
    }
}

impl RpcTokenBalance {
    fn into_core(self) -> Result<TokenBalance, RpcError> {
        Ok(TokenBalance {
            account_index: self.account_index,
            mint: parse_key(&self.mint)?,
            owner: self.owner.as_deref().map(parse_key).transpose()?,
            amount: self.ui_token_amount.amount.parse().map_err(|_| {
                RpcError::Decode(format!(
                    "bad token amount {}",
                    self.ui_token_amount.amount
                ))
            })?,
            decimals: self.ui_token_amount.decimals,
        })
    }
}

fn token_balances(balances: Option<Vec<RpcTokenBalance>>) -> Result<Vec<TokenBalance>, RpcError> {
    balances
        .unwrap_or_default()
        .into_iter()
        .map(RpcTokenBalance::into_core)
        .collect()
}

impl RpcTransaction {
    pub fn into_core(self) -> Result<LedgerTransaction, RpcError> {
        let bytes = decode_base64(&self.transaction)?;
        let (signatures, message) =
            deserialize_transaction(&bytes).map_err(|e| RpcError::Decode(e.to_string()))?;

        let (meta, loaded_addresses) = match self.meta {
            Some(meta) => {
                let loaded = meta.loaded_addresses.unwrap_or_default();
                let loaded_addresses = LoadedAddresses {
                    writable: parse_keys(&loaded.writable)?,
                    readonly: parse_keys(&loaded.readonly)?,
                };
                let meta = TransactionMeta {
                    err: error_text(meta.err),
                    fee: meta.fee,
                    pre_balances: meta.pre_balances,
                    post_balances: meta.post_balances,
                    pre_token_balances: token_balances(meta.pre_token_balances)?,
                    post_token_balances: token_balances(meta.post_token_balances)?,
                    log_messages: meta.log_messages.unwrap_or_default(),
                };
                (Some(meta), loaded_addresses)
            }
            None => (None, LoadedAddresses::default()),
        };

        Ok(LedgerTransaction {
            slot: self.slot,
            block_time: self.block_time,
            signatures,
            message,
            loaded_addresses,
            meta,
        })
    }
}

impl RpcAccount {
    /// Interpret the account as a token mint, `None` if it is not one
    ///
    /// Layout: optional mint authority (4 + 32), supply (u64 LE), decimals,
    /// is_initialized, optional freeze authority (4 + 32).
    pub fn into_mint_info(self) -> Result<Option<MintInfo>, RpcError> {
        if parse_key(&self.owner)? != TOKEN_PROGRAM_ID {
            return Ok(None);
        }
        let data = decode_base64(&self.data)?;
        if data.len() != MINT_ACCOUNT_LEN {
            return Ok(None);
        }

        let mut supply = [0u8; 8];
        supply.copy_from_slice(&data[36..44]);
        Ok(Some(MintInfo {
            decimals: data[44],
            supply: u64::from_le_bytes(supply),
            is_initialized: data[45] != 0,
        }))
    }
}

impl RpcBlockhash {
    pub fn into_core(self) -> Result<Hash, RpcError> {
        self.blockhash
            .parse()
            .map_err(|_| RpcError::Decode(format!("bad blockhash {}", self.blockhash)))
    }
}

/// The node only indexes `confirmed` and `finalized` for history queries
pub fn history_commitment(commitment: Commitment) -> Commitment {
    commitment.max(Commitment::Confirmed)
}
