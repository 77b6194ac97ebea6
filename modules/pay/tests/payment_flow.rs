//! Merchant → wallet → ledger → merchant, against the in-memory ledger

use rust_decimal_macros::dec;
use solpay_core::{
    CancelToken, Commitment, Hash, MintInfo, MismatchReason, PayConfig, PayError, PublicKey,
    TransactionMeta,
};
use solpay_crypto::{associated_token_address, new_reference, sign_message, KeyPair};
use solpay_ledger::MemoryLedger;
use solpay_pay::{
    confirm_payment, decode, encode, prepare_transfer, ReferenceLocator, TransactionFetcher,
    PaymentDescriptor, TransferDetail, TransferBuilder,
};

fn fast_config() -> PayConfig {
    let mut config = PayConfig::default();
    config.locator.poll_interval_ms = 100;
    config.locator.timeout_ms = 2000;
    config.fetcher.poll_interval_ms = 100;
    config.fetcher.timeout_ms = 2000;
    config
}

/// Wallet side: decode the URI, build, sign and submit
async fn pay(ledger: &MemoryLedger, wallet: &KeyPair, uri: &str) -> solpay_core::Signature {
    let descriptor = decode(uri).unwrap();
    let built = prepare_transfer(&descriptor, wallet.public_key(), ledger)
        .await
        .unwrap();
    let message = built.compile(Hash::ZERO).unwrap();
    let signature = sign_message(wallet, &message);
    let signature = ledger.submit(message, vec![signature]).unwrap();
    ledger
        .set_confirmation(&signature, Commitment::Confirmed)
        .unwrap();
    signature
}

#[tokio::test]
async fn test_native_payment_flow() {
    let ledger = MemoryLedger::new();
    let merchant = KeyPair::generate().public_key();
    let wallet = KeyPair::generate();
    let reference = new_reference();

    let request = PaymentDescriptor::builder()
        .recipient(merchant)
        .amount(dec!(1.5))
        .reference(reference)
        .label("Corner Shop")
        .memo("invoice 17")
        .build()
        .unwrap();
    let uri = encode(&request);

    let paid = pay(&ledger, &wallet, &uri).await;

    let confirmation = confirm_payment(&ledger, &request, &fast_config(), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(confirmation.signature, paid);
    assert_eq!(confirmation.record.memos, vec![b"invoice 17".to_vec()]);
    assert!(confirmation.record.references_account(&reference));
    assert_eq!(
        confirmation.record.transfers,
        vec![TransferDetail::Native {
            source: wallet.public_key(),
            destination: merchant,
            lamports: 1_500_000_000
        }]
    );
}

#[tokio::test]
async fn test_token_payment_flow() {
    let ledger = MemoryLedger::new();
    let mint = new_reference();
    ledger.add_mint(mint, MintInfo::new(6, 10_000_000_000));

    let merchant = KeyPair::generate().public_key();
    let wallet = KeyPair::generate();
    let reference = new_reference();

    let request = PaymentDescriptor::builder()
        .recipient(merchant)
        .amount(dec!(12.34))
        .spl_token(mint)
        .reference(reference)
        .build()
        .unwrap();

    pay(&ledger, &wallet, &encode(&request)).await;

    let confirmation = confirm_payment(&ledger, &request, &fast_config(), &CancelToken::new())
        .await
        .unwrap();
    match &confirmation.record.transfers[..] {
        [TransferDetail::Token {
            destination,
            amount,
            decimals,
            ..
        }] => {
            assert_eq!(*destination, associated_token_address(&merchant, &mint).unwrap());
            assert_eq!(*amount, 12_340_000);
            assert_eq!(*decimals, Some(6));
        }
        other => panic!("unexpected transfers {:?}", other),
    }
}

#[tokio::test]
async fn test_underpayment_is_a_mismatch() {
    let ledger = MemoryLedger::new();
    let merchant = KeyPair::generate().public_key();
    let wallet = KeyPair::generate();
    let reference = new_reference();

    let request = PaymentDescriptor::builder()
        .recipient(merchant)
        .amount(dec!(2))
        .reference(reference)
        .build()
        .unwrap();

    // The wallet pays 1.5 under the same reference
    let tampered = PaymentDescriptor::builder()
        .recipient(merchant)
        .amount(dec!(1.5))
        .reference(reference)
        .build()
        .unwrap();
    pay(&ledger, &wallet, &encode(&tampered)).await;

    let err = confirm_payment(&ledger, &request, &fast_config(), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PayError::ValidationMismatch(MismatchReason::Amount)));
}

#[tokio::test]
async fn test_failed_execution_is_reported() {
    let ledger = MemoryLedger::new();
    let merchant = KeyPair::generate().public_key();
    let wallet = KeyPair::generate();
    let reference = new_reference();

    let request = PaymentDescriptor::builder()
        .recipient(merchant)
        .amount(dec!(1))
        .reference(reference)
        .build()
        .unwrap();
    let built = TransferBuilder::new(&request, wallet.public_key())
        .build()
        .unwrap();
    let message = built.compile(Hash::ZERO).unwrap();
    let signature = sign_message(&wallet, &message);
    let meta = TransactionMeta {
        err: Some("InsufficientFundsForRent".into()),
        ..TransactionMeta::default()
    };
    let landed = ledger.submit_with_meta(message, vec![signature], meta).unwrap();
    ledger.set_confirmation(&landed, Commitment::Finalized).unwrap();

    let config = fast_config();
    let cancel = CancelToken::new();
    let found = ReferenceLocator::new(&ledger, config.locator.clone())
        .unwrap()
        .find_signature(&reference, &cancel)
        .await
        .unwrap();
    let record = TransactionFetcher::new(&ledger, config.fetcher.clone())
        .unwrap()
        .fetch(&found, &cancel)
        .await
        .unwrap();
    assert_eq!(record.err.as_deref(), Some("InsufficientFundsForRent"));
    assert_eq!(record.confirmation_status, Commitment::Finalized);

    let err = confirm_payment(&ledger, &request, &config, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PayError::ValidationMismatch(MismatchReason::ExecutionFailed)
    ));
}

#[tokio::test]
async fn test_reused_reference_is_ambiguous() {
    let ledger = MemoryLedger::new();
    let merchant = KeyPair::generate().public_key();
    let reference = new_reference();

    let request = PaymentDescriptor::builder()
        .recipient(merchant)
        .amount(dec!(0.1))
        .reference(reference)
        .build()
        .unwrap();
    let uri = encode(&request);

    pay(&ledger, &KeyPair::generate(), &uri).await;
    pay(&ledger, &KeyPair::generate(), &uri).await;

    let err = confirm_payment(&ledger, &request, &fast_config(), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PayError::AmbiguousReference { count: 2, reference: r } if r == reference
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unpaid_request_times_out() {
    let ledger = MemoryLedger::new();
    let request = PaymentDescriptor::builder()
        .recipient(PublicKey::from_bytes([4u8; 32]))
        .amount(dec!(1))
        .reference(new_reference())
        .build()
        .unwrap();

    let err = confirm_payment(&ledger, &request, &fast_config(), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PayError::TransactionNotFound(_)));
}
