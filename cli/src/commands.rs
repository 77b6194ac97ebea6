//! CLI Commands

use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use solpay_core::{
    parse_amount, CancelToken, Hash, LedgerClient, PayConfig, PayResult, PublicKey,
    TokenMetadataProvider,
};
use solpay_crypto::associated_token_address_with_bump;
use solpay_pay::{
    confirm_payment, encode, parse_url, prepare_transfer, PaymentConfirmation, PaymentDescriptor,
};
use std::path::Path;
use tracing::{info, warn};

/// Payment request fields shared by `encode`, `watch` and `build`
#[derive(Debug, Clone, Args)]
pub struct RequestArgs {
    /// Recipient wallet (base58)
    #[arg(short, long)]
    pub recipient: PublicKey,

    /// Amount in human units, e.g. 1.5
    #[arg(short, long, value_parser = parse_amount)]
    pub amount: Option<Decimal>,

    /// Token mint; native asset when omitted
    #[arg(long)]
    pub spl_token: Option<PublicKey>,

    /// Reference key, repeatable
    #[arg(long = "reference")]
    pub references: Vec<PublicKey>,

    #[arg(long)]
    pub label: Option<String>,

    #[arg(long)]
    pub message: Option<String>,

    /// Memo attached on-chain
    #[arg(long)]
    pub memo: Option<String>,
}

impl RequestArgs {
    pub fn descriptor(&self) -> PayResult<PaymentDescriptor> {
        let mut builder = PaymentDescriptor::builder()
            .recipient(self.recipient)
            .references(self.references.iter().copied());
        if let Some(amount) = self.amount {
            builder = builder.amount(amount);
        }
        if let Some(mint) = self.spl_token {
            builder = builder.spl_token(mint);
        }
        if let Some(label) = &self.label {
            builder = builder.label(label.as_str());
        }
        if let Some(message) = &self.message {
            builder = builder.message(message.as_str());
        }
        if let Some(memo) = &self.memo {
            builder = builder.memo(memo.as_str());
        }
        builder.build()
    }
}

/// Derived associated account, as printed by `ata`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociatedAccount {
    pub owner: PublicKey,
    pub mint: PublicKey,
    pub address: PublicKey,
    pub bump: u8,
}

pub fn encode_request(args: &RequestArgs) -> PayResult<String> {
    Ok(encode(&args.descriptor()?))
}

/// Parse either URI form and render it as pretty JSON
pub fn describe_uri(uri: &str) -> PayResult<String> {
    let parsed = parse_url(uri)?;
    Ok(serde_json::to_string_pretty(&parsed)?)
}

pub fn derive_ata(owner: &PublicKey, mint: &PublicKey) -> PayResult<AssociatedAccount> {
    let (address, bump) = associated_token_address_with_bump(owner, mint)?;
    Ok(AssociatedAccount {
        owner: *owner,
        mint: *mint,
        address,
        bump,
    })
}

/// Load the config file, or defaults, then apply the `--rpc` override
pub fn load_config(path: Option<&Path>, rpc_url: Option<&str>) -> anyhow::Result<PayConfig> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            PayConfig::from_json(&content)?
        }
        None => PayConfig::default(),
    };
    if let Some(url) = rpc_url {
        config.rpc.url = url.to_string();
    }
    Ok(config)
}

/// Build the payer's unsigned transfer and return the wire message as base64
pub async fn build_payment_message<M>(
    descriptor: &PaymentDescriptor,
    sender: PublicKey,
    metadata: &M,
    recent_blockhash: Hash,
) -> PayResult<String>
where
    M: TokenMetadataProvider + ?Sized,
{
    let built = prepare_transfer(descriptor, sender, metadata).await?;
    let message = built.compile(recent_blockhash)?;
    info!(
        %sender,
        instructions = built.instructions.len(),
        accounts = message.account_keys.len(),
        "Built payment message"
    );
    Ok(message.to_base64())
}

/// Wait for the requested payment; Ctrl-C cancels at the next poll boundary
pub async fn watch_payment<L>(
    ledger: &L,
    descriptor: &PaymentDescriptor,
    config: &PayConfig,
) -> PayResult<PaymentConfirmation>
where
    L: LedgerClient + ?Sized,
{
    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current poll");
            on_signal.cancel();
        }
    });

    if let Some(reference) = descriptor.lookup_reference() {
        info!(%reference, recipient = %descriptor.recipient(), "Watching for payment");
    }
    let result = confirm_payment(ledger, descriptor, config, &cancel).await;
    watcher.abort();
    result
}
