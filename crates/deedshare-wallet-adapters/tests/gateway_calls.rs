mod common;

use alloy::primitives::B256;

use common::{default_account, harness, harness_with};
use deedshare_wallet_adapters::{sim::KycState, SimulatedWallet};
use deedshare_wallet_core::{ContractName, WalletError};

#[test]
fn kyc_info_is_destructured_into_named_plain_integers() {
    let mut h = harness();
    h.with_sim(|wallet| {
        let now = wallet.chain.now_timestamp;
        wallet.chain.kyc.insert(
            default_account(),
            KycState {
                status: true,
                timestamp: now - 100,
                expiry: now + 1_000,
            },
        );
    });
    h.client.connect().expect("connect");

    let info = h
        .client
        .compliance()
        .kyc_info(&default_account().to_string())
        .expect("kyc record");
    assert!(info.kyc_status);
    assert!(info.is_valid);
    assert!(info.expiry > info.timestamp);
}

#[test]
fn reads_degrade_to_absence_before_any_binding_exists() {
    let h = harness();
    // Not connected: registry is unbound.
    assert!(h
        .client
        .compliance()
        .kyc_info(&default_account().to_string())
        .is_none());
    assert!(!h
        .client
        .compliance()
        .is_kyc_valid(&default_account().to_string()));
    assert!(matches!(
        h.client.contract(ContractName::TitleNft),
        Err(WalletError::NotInitialized)
    ));
}

#[test]
fn write_path_rejects_a_malformed_address_before_submission() {
    let mut h = harness();
    h.client.connect().expect("connect");

    let err = h
        .client
        .compliance()
        .set_kyc("not-an-address", true, 2_000_000_000, B256::ZERO)
        .expect_err("malformed address");
    assert_eq!(err, WalletError::InvalidAddress("not-an-address".to_owned()));
    // Nothing was forwarded to the wallet.
    assert_eq!(h.count_requests("eth_sendTransaction"), 0);
}

#[test]
fn batch_with_one_bad_address_rejects_the_whole_batch() {
    let mut h = harness();
    h.client.connect().expect("connect");

    let good = default_account().to_string();
    let err = h
        .client
        .compliance()
        .batch_set_kyc(&[good.as_str(), "0x1234"], true, 2_000_000_000)
        .expect_err("bad batch");
    assert!(matches!(err, WalletError::InvalidAddress(_)));
    assert_eq!(h.count_requests("eth_sendTransaction"), 0);
}

#[test]
fn set_kyc_confirms_and_lands_on_chain() {
    let mut h = harness();
    h.client.connect().expect("connect");

    let expiry = h.with_sim(|w| w.chain.now_timestamp) + 86_400;
    let receipt = h
        .client
        .compliance()
        .set_kyc(&default_account().to_string(), true, expiry, B256::ZERO)
        .expect("set kyc");
    assert!(receipt.status);
    assert!(receipt.block_number > 0);

    h.with_sim(|wallet| {
        let entry = wallet.chain.kyc.get(&default_account()).copied().expect("entry");
        assert!(entry.status);
        assert_eq!(entry.expiry, expiry);
    });
    assert!(h
        .client
        .compliance()
        .is_kyc_valid(&default_account().to_string()));
}

#[test]
fn confirmation_waits_through_pending_polls() {
    let mut wallet = SimulatedWallet::default();
    wallet.receipt_delay_polls = 3;
    let mut h = harness_with(wallet);
    h.client.connect().expect("connect");

    let receipt = h
        .client
        .compliance()
        .set_kyc(&default_account().to_string(), true, 2_000_000_000, B256::ZERO)
        .expect("confirmed despite delay");
    assert!(receipt.status);
    assert_eq!(h.count_requests("eth_getTransactionReceipt"), 4);
}

#[test]
fn contract_revert_reason_reaches_the_caller() {
    let mut h = harness();
    h.client.connect().expect("connect");
    h.with_sim(|wallet| {
        wallet.chain.paused.insert(ContractName::ComplianceRegistry);
    });

    let err = h
        .client
        .compliance()
        .set_kyc(&default_account().to_string(), true, 2_000_000_000, B256::ZERO)
        .expect_err("paused contract");
    assert_eq!(err, WalletError::ContractReverted("Pausable: paused".to_owned()));
}

#[test]
fn wallet_side_rejection_of_a_transaction_is_user_rejected() {
    let mut wallet = SimulatedWallet::default();
    wallet.reject_transactions = true;
    let mut h = harness_with(wallet);
    h.client.connect().expect("connect");

    let err = h
        .client
        .compliance()
        .set_kyc(&default_account().to_string(), true, 2_000_000_000, B256::ZERO)
        .expect_err("rejected in wallet");
    assert_eq!(err, WalletError::UserRejected);
}

#[test]
fn role_operations_are_refused_for_the_owner_managed_pool() {
    let mut h = harness();
    h.client.connect().expect("connect");

    let err = h
        .client
        .pause(ContractName::RentPoolMerkle)
        .expect_err("pool has no pause");
    assert!(matches!(err, WalletError::DecodeError(_)));
    assert_eq!(h.count_requests("eth_sendTransaction"), 0);
}
