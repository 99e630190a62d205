mod common;

use alloy::primitives::U256;

use common::{default_account, ether, harness};
use deedshare_wallet_core::WalletError;

#[test]
fn underfunded_signer_is_rejected_before_the_wallet_sees_anything() {
    let mut h = harness();
    let token_id = h.with_sim(|wallet| {
        wallet
            .chain
            .seed_property(default_account(), "12 Harbor Lane", "House", ether(2))
    });
    h.client.connect().expect("connect");

    // Balance drops below the fee after connection; the cached display
    // value still says otherwise.
    h.with_sim(|wallet| {
        wallet.set_balance(default_account(), U256::from(1u64));
    });
    assert!(h.client.snapshot().balance.starts_with("10"));

    let err = h
        .client
        .fractionalizer()
        .fractionalize(token_id, "Harbor Shares", "HBR", ether(1_000))
        .expect_err("must reject locally");
    assert_eq!(err, WalletError::InsufficientFunds);
    assert_eq!(h.count_requests("eth_sendTransaction"), 0);
}

#[test]
fn fee_is_read_fresh_and_attached_exactly() {
    let mut h = harness();
    let token_id = h.with_sim(|wallet| {
        wallet
            .chain
            .seed_property(default_account(), "12 Harbor Lane", "House", ether(2))
    });
    h.client.connect().expect("connect");

    // The fee changes after connection. The simulated contract reverts on
    // any mismatched value, so success proves the freshly-read fee was
    // attached, not a cached one.
    let new_fee = ether(1) / U256::from(4u64);
    h.with_sim(|wallet| {
        wallet.chain.fractionalization_fee = new_fee;
    });

    let receipt = h
        .client
        .fractionalizer()
        .fractionalize(token_id, "Harbor Shares", "HBR", ether(1_000))
        .expect("fractionalize");
    assert!(receipt.status);

    h.with_sim(|wallet| {
        let fraction = wallet
            .chain
            .fractionalizations
            .get(&token_id)
            .expect("recorded");
        assert!(fraction.active);
        assert_eq!(fraction.total_supply, ether(1_000));
        assert_eq!(fraction.fractionalizer, default_account());
    });
    assert!(h.client.fractionalizer().is_fractionalized(token_id));
}

#[test]
fn fractionalizing_someone_elses_property_reverts() {
    let mut h = harness();
    let token_id = h.with_sim(|wallet| {
        wallet
            .chain
            .seed_property(common::other_account(), "Else's Place", "Condo", ether(2))
    });
    h.client.connect().expect("connect");

    let err = h
        .client
        .fractionalizer()
        .fractionalize(token_id, "Nope", "NOPE", ether(10))
        .expect_err("not the owner");
    assert_eq!(
        err,
        WalletError::ContractReverted("Fractionalizer: caller is not token owner".to_owned())
    );
}

#[test]
fn defractionalize_round_trip() {
    let mut h = harness();
    let token_id = h.with_sim(|wallet| {
        wallet
            .chain
            .seed_property(default_account(), "12 Harbor Lane", "House", ether(2))
    });
    h.client.connect().expect("connect");

    h.client
        .fractionalizer()
        .fractionalize(token_id, "Harbor Shares", "HBR", ether(1_000))
        .expect("fractionalize");
    assert!(h.client.fractionalizer().is_fractionalized(token_id));

    h.client
        .fractionalizer()
        .defractionalize(token_id)
        .expect("defractionalize");
    assert!(!h.client.fractionalizer().is_fractionalized(token_id));

    let record = h
        .client
        .fractionalizer()
        .fractionalization_data(token_id)
        .expect("record still readable");
    assert!(!record.is_active);
}

#[test]
fn fee_display_degrades_to_zero_when_unbound() {
    let h = harness();
    assert_eq!(h.client.fractionalizer().fee_display(), "0");
}
