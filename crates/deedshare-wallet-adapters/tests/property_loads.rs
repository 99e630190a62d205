mod common;

use alloy::primitives::U256;

use common::{default_account, ether, harness};
use deedshare_wallet_core::{GuardOutcome, PropertyKind, SkipReason, DASHBOARD_GUARD_KEY};

#[test]
fn zero_properties_short_circuits_without_sub_queries() {
    let mut h = harness();
    h.client.connect().expect("connect");
    let calls_before = h.count_requests("eth_call");

    let scan = h
        .client
        .title()
        .user_properties(&default_account().to_string());
    assert!(scan.properties.is_empty());
    assert!(scan.warnings.is_empty());
    // One balance read, nothing per-token.
    assert_eq!(h.count_requests("eth_call") - calls_before, 1);
}

#[test]
fn enumeration_assembles_full_records() {
    let mut h = harness();
    h.with_sim(|wallet| {
        let chain = &mut wallet.chain;
        chain.seed_property(default_account(), "12 Harbor Lane", "House", ether(2));
        chain.seed_property(default_account(), "Unit 4, Mill Row", "Apartment", ether(1));
    });
    h.client.connect().expect("connect");

    let scan = h
        .client
        .title()
        .user_properties(&default_account().to_string());
    assert_eq!(scan.properties.len(), 2);
    assert!(scan.warnings.is_empty());

    let first = &scan.properties[0];
    assert_eq!(first.owner, default_account());
    assert_eq!(first.location, "12 Harbor Lane");
    assert_eq!(first.property_type, PropertyKind::House);
    assert_eq!(first.value, ether(2));
    assert!(first.mint_timestamp > 0);
    assert!(first.doc_uri.starts_with("ipfs://"));
    assert!(first.fractionalization.is_none());
}

#[test]
fn one_failing_token_keeps_the_rest_and_records_a_warning() {
    let mut h = harness();
    let poisoned = h.with_sim(|wallet| {
        let chain = &mut wallet.chain;
        chain.seed_property(default_account(), "A", "House", ether(1));
        let poisoned = chain.seed_property(default_account(), "B", "Condo", ether(1));
        chain.seed_property(default_account(), "C", "Land", ether(1));
        chain.fail_property_data.insert(poisoned);
        poisoned
    });
    h.client.connect().expect("connect");

    let scan = h
        .client
        .title()
        .user_properties(&default_account().to_string());
    assert_eq!(scan.properties.len(), 2);
    assert_eq!(scan.warnings.len(), 1);
    assert!(scan.warnings[0].contains(&format!("token {poisoned}")));
    assert!(scan.properties.iter().all(|p| p.token_id != poisoned));
}

#[test]
fn dashboard_attaches_fractionalization_and_the_epoch_window() {
    let mut h = harness();
    let token_id = h.with_sim(|wallet| {
        let chain = &mut wallet.chain;
        let token_id = chain.seed_property(default_account(), "12 Harbor Lane", "House", ether(2));
        chain.fractionalizations.insert(
            token_id,
            deedshare_wallet_adapters::sim::SimFraction {
                token_address: common::other_account(),
                total_supply: ether(1_000),
                fractionalizer: default_account(),
                timestamp: chain.now_timestamp,
                active: true,
            },
        );
        chain.epochs.entry(1).or_default().total_deposits = ether(5);
        token_id
    });
    h.client.connect().expect("connect");

    let view = h
        .client
        .load_dashboard(&default_account().to_string())
        .expect("guarded load")
        .completed()
        .expect("fresh load");

    assert_eq!(view.properties.len(), 1);
    let fraction = view.properties[0]
        .fractionalization
        .as_ref()
        .expect("attached fractionalization");
    assert_eq!(fraction.token_id, token_id);
    assert_eq!(fraction.total_supply, ether(1_000));
    assert!(fraction.is_active);

    assert_eq!(view.epochs.len(), 5);
    assert_eq!(view.epochs[0].epoch_id, 1);
    assert_eq!(view.epochs[0].total_deposits, ether(5));
    assert_eq!(view.epochs[1].total_deposits, U256::ZERO);
}

#[test]
fn rapid_dashboard_reloads_are_skipped_then_allowed_after_the_interval() {
    let mut h = harness();
    h.client.connect().expect("connect");
    let user = default_account().to_string();

    let first = h.client.load_dashboard(&user).expect("first load");
    assert!(matches!(first, GuardOutcome::Completed(_)));

    let second = h.client.load_dashboard(&user).expect("second load");
    assert!(second.was_skipped(), "second immediate load must be skipped");

    h.clock.advance(3_000);
    let third = h.client.load_dashboard(&user).expect("third load");
    assert!(matches!(third, GuardOutcome::Completed(_)));
}

#[test]
fn abandoning_the_dashboard_key_clears_the_throttle() {
    let mut h = harness();
    h.client.connect().expect("connect");
    let user = default_account().to_string();

    let _ = h.client.load_dashboard(&user).expect("first load");
    let throttled = h.client.load_dashboard(&user).expect("second load");
    assert_eq!(throttled, GuardOutcome::Skipped(SkipReason::Throttled));

    // Consumer teardown releases the key without waiting out the interval.
    h.client.abandon_load(DASHBOARD_GUARD_KEY);
    let after = h.client.load_dashboard(&user).expect("after teardown");
    assert!(matches!(after, GuardOutcome::Completed(_)));
}
