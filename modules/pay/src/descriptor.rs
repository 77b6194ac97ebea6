//! Payment descriptor: the immutable payment intent

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solpay_core::{
    fractional_digits, to_base_units, Asset, PayError, PayResult, PublicKey, NATIVE_DECIMALS,
};

/// What the payer is asked to do
///
/// Construct through [`PaymentDescriptorBuilder`]; a built descriptor always
/// has a recipient, a non-negative amount (when one is given), and distinct
/// references in their original order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDescriptor {
    recipient: PublicKey,
    amount: Option<Decimal>,
    asset: Asset,
    references: Vec<PublicKey>,
    label: Option<String>,
    message: Option<String>,
    memo: Option<String>,
}

impl PaymentDescriptor {
    pub fn builder() -> PaymentDescriptorBuilder {
        PaymentDescriptorBuilder::new()
    }

    pub fn recipient(&self) -> &PublicKey {
        &self.recipient
    }

    /// Requested amount; `None` means "pay any amount"
    pub fn amount(&self) -> Option<Decimal> {
        self.amount
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn references(&self) -> &[PublicKey] {
        &self.references
    }

    /// The key used to look the payment up on the ledger
    ///
    /// Only the first reference is queried; the rest travel as payload.
    pub fn lookup_reference(&self) -> Option<&PublicKey> {
        self.references.first()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    /// Check the amount's precision once the asset's decimals are known
    pub fn validate_for_decimals(&self, decimals: u8) -> PayResult<()> {
        if let Some(amount) = &self.amount {
            let digits = fractional_digits(amount);
            if digits > u32::from(decimals) {
                return Err(PayError::InvalidAmount(format!(
                    "{} has {} fractional digits, asset allows {}",
                    amount, digits, decimals
                )));
            }
        }
        Ok(())
    }

    /// The requested amount in base units, `None` when no amount was requested
    pub fn amount_in_base_units(&self, decimals: u8) -> PayResult<Option<u64>> {
        self.amount
            .as_ref()
            .map(|amount| to_base_units(amount, decimals))
            .transpose()
    }
}

/// Builder for [`PaymentDescriptor`]
#[derive(Debug, Clone, Default)]
pub struct PaymentDescriptorBuilder {
    recipient: Option<PublicKey>,
    amount: Option<Decimal>,
    spl_token: Option<PublicKey>,
    references: Vec<PublicKey>,
    label: Option<String>,
    message: Option<String>,
    memo: Option<String>,
}

/// Empty optional strings are the same as absent ones
fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

impl PaymentDescriptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recipient(mut self, recipient: PublicKey) -> Self {
        self.recipient = Some(recipient);
        self
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn spl_token(mut self, mint: PublicKey) -> Self {
        self.spl_token = Some(mint);
        self
    }

    /// Append one reference key
    pub fn reference(mut self, reference: PublicKey) -> Self {
        self.references.push(reference);
        self
    }

    pub fn references(mut self, references: impl IntoIterator<Item = PublicKey>) -> Self {
        self.references.extend(references);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = non_empty(label.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = non_empty(message.into());
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = non_empty(memo.into());
        self
    }

    pub fn build(self) -> PayResult<PaymentDescriptor> {
        let recipient = self.recipient.ok_or(PayError::MissingRecipient)?;

        let amount = match self.amount {
            Some(amount) if amount.is_sign_negative() && !amount.is_zero() => {
                return Err(PayError::InvalidAmount(format!("{} is negative", amount)));
            }
            Some(amount) => Some(amount.normalize()),
            None => None,
        };

        let asset = match self.spl_token {
            Some(mint) => Asset::Token(mint),
            None => Asset::Native,
        };

        let mut references: Vec<PublicKey> = Vec::with_capacity(self.references.len());
        for reference in self.references {
            if !references.contains(&reference) {
                references.push(reference);
            }
        }

        let descriptor = PaymentDescriptor {
            recipient,
            amount,
            asset,
            references,
            label: self.label,
            message: self.message,
            memo: self.memo,
        };

        // Token decimals are only known once the mint is resolved
        if descriptor.asset.is_native() {
            descriptor.validate_for_decimals(NATIVE_DECIMALS)?;
        }

        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn key(byte: u8) -> PublicKey {
        PublicKey::from_bytes([byte; 32])
    }

    #[test]
    fn test_missing_recipient() {
        let result = PaymentDescriptor::builder().amount(dec!(1)).build();
        assert!(matches!(result, Err(PayError::MissingRecipient)));
    }

    #[test]
    fn test_negative_amount() {
        let result = PaymentDescriptor::builder()
            .recipient(key(1))
            .amount(dec!(-0.5))
            .build();
        assert!(matches!(result, Err(PayError::InvalidAmount(_))));
    }

    #[test]
    fn test_native_precision_is_enforced() {
        let result = PaymentDescriptor::builder()
            .recipient(key(1))
            .amount(dec!(0.0000000001))
            .build();
        assert!(matches!(result, Err(PayError::InvalidAmount(_))));

        // Trailing zeros are not significant
        let descriptor = PaymentDescriptor::builder()
            .recipient(key(1))
            .amount(dec!(1.500000000000))
            .build()
            .unwrap();
        assert_eq!(descriptor.amount_in_base_units(9).unwrap(), Some(1_500_000_000));
    }

    #[test]
    fn test_token_precision_checked_later() {
        let descriptor = PaymentDescriptor::builder()
            .recipient(key(1))
            .spl_token(key(2))
            .amount(dec!(0.123))
            .build()
            .unwrap();

        assert_eq!(descriptor.asset(), &Asset::Token(key(2)));
        assert!(descriptor.validate_for_decimals(3).is_ok());
        assert!(matches!(
            descriptor.validate_for_decimals(2),
            Err(PayError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_duplicate_references_collapse() {
        let descriptor = PaymentDescriptor::builder()
            .recipient(key(1))
            .reference(key(5))
            .reference(key(3))
            .reference(key(5))
            .build()
            .unwrap();

        assert_eq!(descriptor.references(), &[key(5), key(3)]);
        assert_eq!(descriptor.lookup_reference(), Some(&key(5)));
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let descriptor = PaymentDescriptor::builder()
            .recipient(key(1))
            .label("")
            .memo("order-7")
            .build()
            .unwrap();

        assert_eq!(descriptor.label(), None);
        assert_eq!(descriptor.memo(), Some("order-7"));
        assert_eq!(descriptor.amount(), None);
    }
}
