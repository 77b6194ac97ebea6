//! Unsigned transfer construction

use serde::{Deserialize, Serialize};
use solpay_core::{
    to_base_units, Asset, Hash, Message, PayError, PayResult, PublicKey, TokenMetadataProvider,
    NATIVE_DECIMALS,
};
use solpay_crypto::associated_token_address;
use tracing::{debug, info};

use crate::descriptor::PaymentDescriptor;
use crate::instruction::{
    create_associated_token_account_idempotent, memo, system_transfer, transfer_checked,
    AccountMeta, Instruction,
};
use crate::message::compile;

/// An unsigned instruction set ready for an external signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltTransfer {
    /// Pays fees and signs the transfer
    pub fee_payer: PublicKey,
    /// In execution order; the transfer is always last
    pub instructions: Vec<Instruction>,
    /// Keys attached read-only to the transfer instruction
    pub references: Vec<PublicKey>,
}

impl BuiltTransfer {
    pub fn transfer_instruction(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    /// Compile into a wire message for the signer
    pub fn compile(&self, recent_blockhash: Hash) -> PayResult<Message> {
        compile(&self.instructions, &self.fee_payer, recent_blockhash)
    }
}

/// Builds the instructions that satisfy a [`PaymentDescriptor`]
///
/// Pure: everything that needs a ledger lookup (token decimals, whether the
/// recipient's associated account exists) is supplied up front. See
/// [`prepare_transfer`] for the variant that resolves those itself.
pub struct TransferBuilder<'a> {
    descriptor: &'a PaymentDescriptor,
    sender: PublicKey,
    decimals: Option<u8>,
    recipient_account_exists: bool,
}

impl<'a> TransferBuilder<'a> {
    pub fn new(descriptor: &'a PaymentDescriptor, sender: PublicKey) -> Self {
        Self {
            descriptor,
            sender,
            decimals: None,
            recipient_account_exists: false,
        }
    }

    /// Decimals of the descriptor's token; ignored for native payments
    pub fn decimals(mut self, decimals: u8) -> Self {
        self.decimals = Some(decimals);
        self
    }

    /// Skip the associated-account creation instruction
    pub fn recipient_account_exists(mut self, exists: bool) -> Self {
        self.recipient_account_exists = exists;
        self
    }

    pub fn build(self) -> PayResult<BuiltTransfer> {
        let descriptor = self.descriptor;
        let amount = descriptor
            .amount()
            .filter(|amount| !amount.is_zero())
            .ok_or_else(|| {
                PayError::InvalidAmount("a positive amount is required to build a transfer".into())
            })?;

        let mut instructions = Vec::with_capacity(3);

        let mut transfer = match descriptor.asset() {
            Asset::Native => {
                let lamports = to_base_units(&amount, NATIVE_DECIMALS)?;
                system_transfer(&self.sender, descriptor.recipient(), lamports)?
            }
            Asset::Token(mint) => {
                let decimals = self.decimals.ok_or_else(|| {
                    PayError::UnsupportedAsset(format!(
                        "decimals of mint {} are not resolved",
                        mint
                    ))
                })?;
                descriptor.validate_for_decimals(decimals)?;
                let units = to_base_units(&amount, decimals)?;

                let source = associated_token_address(&self.sender, mint)?;
                let destination = associated_token_address(descriptor.recipient(), mint)?;

                if !self.recipient_account_exists {
                    instructions.push(create_associated_token_account_idempotent(
                        &self.sender,
                        descriptor.recipient(),
                        mint,
                    )?);
                }

                transfer_checked(&source, mint, &destination, &self.sender, units, decimals)
            }
        };

        for reference in descriptor.references() {
            transfer
                .accounts
                .push(AccountMeta::new_readonly(*reference, false));
        }

        if let Some(text) = descriptor.memo() {
            instructions.push(memo(text));
        }
        instructions.push(transfer);

        debug!(
            recipient = %descriptor.recipient(),
            asset = %descriptor.asset(),
            instructions = instructions.len(),
            "Built transfer"
        );

        Ok(BuiltTransfer {
            fee_payer: self.sender,
            instructions,
            references: descriptor.references().to_vec(),
        })
    }
}

/// Resolve what the builder needs from token metadata, then build
pub async fn prepare_transfer<M>(
    descriptor: &PaymentDescriptor,
    sender: PublicKey,
    metadata: &M,
) -> PayResult<BuiltTransfer>
where
    M: TokenMetadataProvider + ?Sized,
{
    let mint = match descriptor.asset() {
        Asset::Native => return TransferBuilder::new(descriptor, sender).build(),
        Asset::Token(mint) => mint,
    };

    let info = metadata
        .mint_info(mint)
        .await?
        .filter(|info| info.is_initialized)
        .ok_or_else(|| PayError::UnsupportedAsset(format!("mint {} not found", mint)))?;
    descriptor.validate_for_decimals(info.decimals)?;

    let destination = associated_token_address(descriptor.recipient(), mint)?;
    let exists = metadata.account_exists(&destination).await?;

    info!(
        %mint,
        decimals = info.decimals,
        recipient_account_exists = exists,
        "Resolved token transfer"
    );

    TransferBuilder::new(descriptor, sender)
        .decimals(info.decimals)
        .recipient_account_exists(exists)
        .build()
}
