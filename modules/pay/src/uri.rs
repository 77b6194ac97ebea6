//! Payment URI codec
//!
//! Two forms share the `solana:` scheme:
//! - transfer requests: `solana:<recipient>?amount=..&spl-token=..&reference=..`, plus
//!   optional `label`, `message` and `memo`
//! - transaction requests: `solana:<percent-encoded https link>?label=..&message=..`

use serde::{Serialize, Serializer};
use solpay_core::{format_amount, parse_amount, PayError, PayResult, PublicKey};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::descriptor::{PaymentDescriptor, PaymentDescriptorBuilder};

pub const SOLANA_SCHEME: &str = "solana";
pub const HTTPS_SCHEME: &str = "https";

/// Wallets stop reading URIs past this length
pub const MAX_URI_LENGTH: usize = 2048;

/// Query parameter names
pub mod params {
    pub const AMOUNT: &str = "amount";
    pub const SPL_TOKEN: &str = "spl-token";
    pub const REFERENCE: &str = "reference";
    pub const LABEL: &str = "label";
    pub const MESSAGE: &str = "message";
    pub const MEMO: &str = "memo";
}

/// Interactive request: the wallet fetches the transaction from `link`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    #[serde(serialize_with = "serialize_link")]
    link: Url,
    label: Option<String>,
    message: Option<String>,
}

fn serialize_link<S: Serializer>(link: &Url, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(link.as_str())
}

impl TransactionRequest {
    pub fn new(link: Url) -> PayResult<Self> {
        if link.scheme() != HTTPS_SCHEME {
            return Err(PayError::MalformedUrl(format!(
                "transaction request link must use https, got {}",
                link.scheme()
            )));
        }
        Ok(Self {
            link,
            label: None,
            message: None,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn link(&self) -> &Url {
        &self.link
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Either form of payment URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PaymentUrl {
    Transfer(PaymentDescriptor),
    TransactionRequest(TransactionRequest),
}

impl fmt::Display for PaymentUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_url(self))
    }
}

impl FromStr for PaymentUrl {
    type Err = PayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_url(s)
    }
}

fn push_params(uri: &mut String, params: &[(&str, String)]) {
    for (i, (name, value)) in params.iter().enumerate() {
        uri.push(if i == 0 { '?' } else { '&' });
        uri.push_str(name);
        uri.push('=');
        uri.push_str(value);
    }
}

fn encoded(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Encode a transfer request
pub fn encode(descriptor: &PaymentDescriptor) -> String {
    let mut uri = format!("{}:{}", SOLANA_SCHEME, descriptor.recipient());
    let mut query: Vec<(&str, String)> = Vec::new();

    if let Some(amount) = descriptor.amount() {
        query.push((params::AMOUNT, format_amount(&amount)));
    }
    if let Some(mint) = descriptor.asset().mint() {
        query.push((params::SPL_TOKEN, mint.to_base58()));
    }
    for reference in descriptor.references() {
        query.push((params::REFERENCE, reference.to_base58()));
    }
    if let Some(label) = descriptor.label() {
        query.push((params::LABEL, encoded(label)));
    }
    if let Some(message) = descriptor.message() {
        query.push((params::MESSAGE, encoded(message)));
    }
    if let Some(memo) = descriptor.memo() {
        query.push((params::MEMO, encoded(memo)));
    }

    push_params(&mut uri, &query);
    uri
}

/// Encode either form
pub fn encode_url(url: &PaymentUrl) -> String {
    match url {
        PaymentUrl::Transfer(descriptor) => encode(descriptor),
        PaymentUrl::TransactionRequest(request) => {
            let link = request.link.as_str().trim_end_matches('?');
            let mut uri = format!("{}:{}", SOLANA_SCHEME, encoded(link));
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(label) = request.label() {
                query.push((params::LABEL, encoded(label)));
            }
            if let Some(message) = request.message() {
                query.push((params::MESSAGE, encoded(message)));
            }
            push_params(&mut uri, &query);
            uri
        }
    }
}

/// Decode a transfer request; a transaction-request URI is malformed here
pub fn decode(uri: &str) -> PayResult<PaymentDescriptor> {
    match parse_url(uri)? {
        PaymentUrl::Transfer(descriptor) => Ok(descriptor),
        PaymentUrl::TransactionRequest(_) => Err(PayError::MalformedUrl(
            "expected a transfer request, found a transaction request".into(),
        )),
    }
}

/// Decode either form
pub fn parse_url(uri: &str) -> PayResult<PaymentUrl> {
    if uri.len() > MAX_URI_LENGTH {
        return Err(PayError::MalformedUrl(format!(
            "URI is {} characters, limit is {}",
            uri.len(),
            MAX_URI_LENGTH
        )));
    }

    let (scheme, _) = uri
        .split_once(':')
        .ok_or_else(|| PayError::MalformedUrl("missing scheme".into()))?;
    if !scheme.eq_ignore_ascii_case(SOLANA_SCHEME) {
        return Err(PayError::UnsupportedProtocol(scheme.to_string()));
    }

    let url = Url::parse(uri).map_err(|e| PayError::MalformedUrl(e.to_string()))?;
    let path = url.path();
    if path.is_empty() {
        return Err(PayError::MissingRecipient);
    }

    if is_link(path) {
        parse_transaction_request(&url).map(PaymentUrl::TransactionRequest)
    } else {
        parse_transfer(&url).map(PaymentUrl::Transfer)
    }
}

/// Whether the path holds an http(s) link rather than a recipient key
fn is_link(path: &str) -> bool {
    let Ok(decoded) = urlencoding::decode(path) else {
        return false;
    };
    let scheme = decoded.split_once(':').map(|(scheme, _)| scheme);
    matches!(scheme, Some(s) if s.eq_ignore_ascii_case("https") || s.eq_ignore_ascii_case("http"))
}

fn parse_transfer(url: &Url) -> PayResult<PaymentDescriptor> {
    let recipient: PublicKey = url.path().parse()?;
    let mut builder = PaymentDescriptorBuilder::new().recipient(recipient);

    let mut amount_seen = false;
    let mut spl_token_seen = false;
    let mut label_seen = false;
    let mut message_seen = false;
    let mut memo_seen = false;

    // First occurrence wins for single-valued parameters
    for (name, value) in url.query_pairs() {
        match name.as_ref() {
            params::AMOUNT if !amount_seen => {
                amount_seen = true;
                builder = builder.amount(parse_amount(&value)?);
            }
            params::SPL_TOKEN if !spl_token_seen => {
                spl_token_seen = true;
                builder = builder.spl_token(value.parse()?);
            }
            params::REFERENCE => {
                builder = builder.reference(value.parse()?);
            }
            params::LABEL if !label_seen => {
                label_seen = true;
                builder = builder.label(value.into_owned());
            }
            params::MESSAGE if !message_seen => {
                message_seen = true;
                builder = builder.message(value.into_owned());
            }
            params::MEMO if !memo_seen => {
                memo_seen = true;
                builder = builder.memo(value.into_owned());
            }
            _ => {}
        }
    }

    builder.build()
}

fn parse_transaction_request(url: &Url) -> PayResult<TransactionRequest> {
    let decoded =
        urlencoding::decode(url.path()).map_err(|e| PayError::MalformedUrl(e.to_string()))?;
    let link = Url::parse(&decoded).map_err(|e| PayError::MalformedUrl(e.to_string()))?;
    let mut request = TransactionRequest::new(link)?;

    let mut label_seen = false;
    let mut message_seen = false;
    for (name, value) in url.query_pairs() {
        match name.as_ref() {
            params::LABEL if !label_seen => {
                label_seen = true;
                request = request.with_label(value.into_owned());
            }
            params::MESSAGE if !message_seen => {
                message_seen = true;
                request = request.with_message(value.into_owned());
            }
            _ => {}
        }
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use solpay_core::Asset;

    fn key(byte: u8) -> PublicKey {
        PublicKey::from_bytes([byte; 32])
    }

    #[test]
    fn test_native_scenario() {
        let recipient = key(1);
        let reference = key(2);
        let descriptor = PaymentDescriptor::builder()
            .recipient(recipient)
            .amount(dec!(1.5))
            .reference(reference)
            .build()
            .unwrap();

        let uri = encode(&descriptor);
        assert_eq!(
            uri,
            format!("solana:{}?amount=1.5&reference={}", recipient, reference)
        );
        assert_eq!(decode(&uri).unwrap(), descriptor);
    }

    #[test]
    fn test_full_round_trip() {
        let descriptor = PaymentDescriptor::builder()
            .recipient(key(1))
            .amount(dec!(0.000001))
            .spl_token(key(4))
            .reference(key(2))
            .reference(key(3))
            .label("Coffee & Co.")
            .message("Thanks for your order! #42")
            .memo("order=42+blue 100%")
            .build()
            .unwrap();

        let uri = encode(&descriptor);
        assert!(uri.contains("label=Coffee%20%26%20Co."));
        let decoded = decode(&uri).unwrap();
        assert_eq!(decoded, descriptor);
        assert_eq!(decoded.references(), &[key(2), key(3)]);
    }

    #[test]
    fn test_no_params() {
        let descriptor = PaymentDescriptor::builder().recipient(key(1)).build().unwrap();
        let uri = encode(&descriptor);
        assert_eq!(uri, format!("solana:{}", key(1)));
        assert_eq!(decode(&uri).unwrap(), descriptor);
    }

    #[test]
    fn test_foreign_scheme() {
        let uri = format!("bitcoin:{}?amount=1", key(1));
        assert!(matches!(decode(&uri), Err(PayError::UnsupportedProtocol(_))));
        assert!(matches!(
            decode("https://example.com/pay"),
            Err(PayError::UnsupportedProtocol(_))
        ));
    }

    #[test]
    fn test_invalid_keys() {
        assert!(matches!(
            decode("solana:notakey0OIl?amount=1"),
            Err(PayError::InvalidPublicKey(_))
        ));

        let bad_reference = format!("solana:{}?reference=abc", key(1));
        assert!(matches!(decode(&bad_reference), Err(PayError::InvalidPublicKey(_))));

        let bad_mint = format!("solana:{}?spl-token=xyz", key(1));
        assert!(matches!(decode(&bad_mint), Err(PayError::InvalidPublicKey(_))));

        // Escapes and colons in a non-link path are still a bad key
        let escaped = format!("solana:{}%30", key(1));
        assert!(matches!(decode(&escaped), Err(PayError::InvalidPublicKey(_))));
        assert!(matches!(
            parse_url("solana:abc:def"),
            Err(PayError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_invalid_amounts() {
        for amount in ["-1", "1e3", "abc", "1.", ".5", "1.2.3", "0.0000000001"] {
            let uri = format!("solana:{}?amount={}", key(1), amount);
            assert!(
                matches!(decode(&uri), Err(PayError::InvalidAmount(_))),
                "amount {} should be rejected",
                amount
            );
        }
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(decode("no scheme here"), Err(PayError::MalformedUrl(_))));
        assert!(matches!(decode("solana:"), Err(PayError::MissingRecipient)));

        let long = format!("solana:{}?memo={}", key(1), "a".repeat(MAX_URI_LENGTH));
        assert!(matches!(decode(&long), Err(PayError::MalformedUrl(_))));
    }

    #[test]
    fn test_unknown_params_ignored() {
        let uri = format!(
            "solana:{}?amount=2&future-param=yes&redirect=https%3A%2F%2Fx.y",
            key(1)
        );
        let descriptor = decode(&uri).unwrap();
        assert_eq!(descriptor.amount(), Some(dec!(2)));
        assert_eq!(descriptor.asset(), &Asset::Native);
    }

    #[test]
    fn test_transaction_request_round_trip() {
        let link = Url::parse("https://merchant.example/api/pay?order=42").unwrap();
        let request = TransactionRequest::new(link.clone())
            .unwrap()
            .with_label("Merchant")
            .with_message("Order 42");

        let uri = encode_url(&PaymentUrl::TransactionRequest(request.clone()));
        assert!(uri.starts_with("solana:https%3A%2F%2Fmerchant.example"));

        match parse_url(&uri).unwrap() {
            PaymentUrl::TransactionRequest(parsed) => {
                assert_eq!(parsed.link(), &link);
                assert_eq!(parsed.label(), Some("Merchant"));
                assert_eq!(parsed.message(), Some("Order 42"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(decode(&uri), Err(PayError::MalformedUrl(_))));
    }

    #[test]
    fn test_transaction_request_requires_https() {
        let uri = "solana:http%3A%2F%2Fmerchant.example%2Fpay";
        assert!(matches!(parse_url(uri), Err(PayError::MalformedUrl(_))));
    }
}
