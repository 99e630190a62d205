mod common;

use common::{default_account, ether, harness, other_account};
use deedshare_wallet_adapters::sim::{merkle_leaf, merkle_parent};
use deedshare_wallet_core::WalletError;

#[test]
fn empty_proof_is_submitted_as_given_and_verified_by_the_contract() {
    let mut h = harness();
    let amount = ether(1);
    // Single-entitlement tree: the leaf is the root, so the valid proof is
    // empty. The client forwards it untouched.
    h.with_sim(|wallet| {
        wallet.chain.epochs.entry(7).or_default().root = merkle_leaf(default_account(), amount);
    });
    h.client.connect().expect("connect");

    let receipt = h
        .client
        .rent_pool()
        .claim(7, amount, &[])
        .expect("empty-proof claim");
    assert!(receipt.status);
    assert!(h
        .client
        .rent_pool()
        .is_claimed(7, &default_account().to_string()));
}

#[test]
fn invalid_proof_is_rejected_by_the_contract_not_the_client() {
    let mut h = harness();
    h.with_sim(|wallet| {
        wallet.chain.epochs.entry(7).or_default().root =
            merkle_leaf(default_account(), ether(1));
    });
    h.client.connect().expect("connect");

    // Claiming a different amount breaks the leaf; the pool reverts.
    let err = h
        .client
        .rent_pool()
        .claim(7, ether(2), &[])
        .expect_err("wrong amount");
    assert_eq!(
        err,
        WalletError::ContractReverted("RentPool: invalid proof".to_owned())
    );
}

#[test]
fn a_two_leaf_tree_verifies_with_the_sibling_as_proof() {
    let mut h = harness();
    let mine = merkle_leaf(default_account(), ether(3));
    let sibling = merkle_leaf(other_account(), ether(5));
    h.with_sim(|wallet| {
        wallet.chain.epochs.entry(2).or_default().root = merkle_parent(mine, sibling);
    });
    h.client.connect().expect("connect");

    let receipt = h
        .client
        .rent_pool()
        .claim(2, ether(3), &[sibling])
        .expect("two-leaf claim");
    assert!(receipt.status);
}

#[test]
fn double_claim_is_rejected_on_chain() {
    let mut h = harness();
    let amount = ether(1);
    h.with_sim(|wallet| {
        wallet.chain.epochs.entry(7).or_default().root = merkle_leaf(default_account(), amount);
    });
    h.client.connect().expect("connect");

    h.client.rent_pool().claim(7, amount, &[]).expect("first claim");
    let err = h
        .client
        .rent_pool()
        .claim(7, amount, &[])
        .expect_err("second claim");
    assert_eq!(
        err,
        WalletError::ContractReverted("RentPool: already claimed".to_owned())
    );
}

#[test]
fn deposits_accumulate_per_epoch() {
    let mut h = harness();
    h.client.connect().expect("connect");

    h.client
        .rent_pool()
        .deposit_rent(3, ether(2))
        .expect("first deposit");
    h.client
        .rent_pool()
        .deposit_rent(3, ether(1))
        .expect("second deposit");

    assert_eq!(h.client.rent_pool().epoch_total_deposits(3), ether(3));
    assert_eq!(
        h.client.rent_pool().epoch_total_deposits(4),
        alloy::primitives::U256::ZERO
    );
}

#[test]
fn epoch_root_configuration_is_owner_gated() {
    let mut h = harness();
    h.with_sim(|wallet| {
        wallet.chain.pool_owner = other_account();
    });
    h.client.connect().expect("connect");

    let err = h
        .client
        .rent_pool()
        .set_epoch_root(1, merkle_leaf(default_account(), ether(1)))
        .expect_err("not the owner");
    assert_eq!(
        err,
        WalletError::ContractReverted("Ownable: caller is not the owner".to_owned())
    );
}
