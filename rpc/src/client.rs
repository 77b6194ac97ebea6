//! JSON-RPC ledger client

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use solpay_core::{
    Commitment, Hash, LedgerClient, LedgerTransaction, MintInfo, PayResult, PublicKey, RpcConfig,
    Signature, SignatureInfo, SignatureStatus, TokenMetadataProvider,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::RpcError;
use crate::wire::{
    history_commitment, RpcAccount, RpcBlockhash, RpcRequest, RpcResponse, RpcSignatureInfo,
    RpcSignatureStatus, RpcTransaction, WithContext,
};

/// Ledger client speaking the node's JSON-RPC dialect
///
/// The HTTP connection is created on first use and owned by this value;
/// share the client by reference (or `Arc`) to share the connection.
pub struct RpcLedgerClient {
    config: RpcConfig,
    http: OnceCell<Client>,
    next_id: AtomicU64,
}

impl RpcLedgerClient {
    pub fn new(config: RpcConfig) -> Self {
        Self {
            config,
            http: OnceCell::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_url(url: &str) -> Self {
        Self::new(RpcConfig {
            url: url.to_string(),
            ..RpcConfig::default()
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    async fn http(&self) -> Result<&Client, RpcError> {
        self.http
            .get_or_try_init(|| async {
                Client::builder()
                    .timeout(Duration::from_secs(self.config.request_timeout_secs))
                    .build()
            })
            .await
            .map_err(RpcError::from)
    }

    /// Issue one JSON-RPC call; a JSON `null` result deserializes into `T` as-is
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!(method, id, "RPC request");
        let response: RpcResponse = self
            .http()
            .await?
            .post(&self.config.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(RpcError::Server {
                code: error.code,
                message: error.message,
            });
        }
        Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
    }

    /// Most recent blockhash, for compiling a message to hand to a signer
    pub async fn latest_blockhash(&self) -> PayResult<Hash> {
        let response: WithContext<RpcBlockhash> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.config.commitment }]),
            )
            .await?;
        Ok(response.value.into_core()?)
    }

    async fn account(&self, address: &PublicKey) -> PayResult<Option<RpcAccount>> {
        let response: WithContext<Option<RpcAccount>> = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_base58(),
                    { "encoding": "base64", "commitment": self.config.commitment }
                ]),
            )
            .await?;
        Ok(response.value)
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn signatures_for_address(
        &self,
        address: &PublicKey,
        limit: usize,
        commitment: Commitment,
    ) -> PayResult<Vec<SignatureInfo>> {
        let infos: Vec<RpcSignatureInfo> = self
            .call(
                "getSignaturesForAddress",
                json!([
                    address.to_base58(),
                    { "limit": limit, "commitment": history_commitment(commitment) }
                ]),
            )
            .await?;

        let infos = infos
            .into_iter()
            .map(RpcSignatureInfo::into_core)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(%address, count = infos.len(), "Signatures for address");
        Ok(infos)
    }

    async fn signature_status(&self, signature: &Signature) -> PayResult<Option<SignatureStatus>> {
        let response: WithContext<Vec<Option<RpcSignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(response
            .value
            .into_iter()
            .next()
            .flatten()
            .map(RpcSignatureStatus::into_core))
    }

    async fn transaction(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> PayResult<Option<LedgerTransaction>> {
        let response: Option<RpcTransaction> = self
            .call(
                "getTransaction",
                json!([
                    signature.to_string(),
                    {
                        "encoding": "base64",
                        "commitment": history_commitment(commitment),
                        "maxSupportedTransactionVersion": 0
                    }
                ]),
            )
            .await?;
        Ok(response.map(RpcTransaction::into_core).transpose()?)
    }
}

#[async_trait]
impl TokenMetadataProvider for RpcLedgerClient {
    async fn mint_info(&self, mint: &PublicKey) -> PayResult<Option<MintInfo>> {
        match self.account(mint).await? {
            Some(account) => Ok(account.into_mint_info()?),
            None => Ok(None),
        }
    }

    async fn account_exists(&self, address: &PublicKey) -> PayResult<bool> {
        Ok(self.account(address).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_is_lazy() {
        let client = RpcLedgerClient::with_url("http://127.0.0.1:8899");
        assert!(client.http.get().is_none());
        assert_eq!(client.url(), "http://127.0.0.1:8899");
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_ledger_error() {
        // Port 9 (discard) is not an RPC node; the call must fail, not hang
        let client = RpcLedgerClient::new(RpcConfig {
            url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 1,
            ..RpcConfig::default()
        });
        let err = client
            .signature_status(&Signature::default())
            .await
            .unwrap_err();
        assert!(matches!(err, solpay_core::PayError::Ledger(_)));
        assert!(client.http.get().is_some());
    }
}
