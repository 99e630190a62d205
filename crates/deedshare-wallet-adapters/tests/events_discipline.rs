use deedshare_wallet_adapters::{Eip1193Adapter, SimulatedWallet};
use deedshare_wallet_core::{EventClass, WalletTransport};

#[test]
fn double_subscription_delivers_each_event_once() {
    let adapter = Eip1193Adapter::simulated(SimulatedWallet::default());
    adapter
        .subscribe(EventClass::ChainChanged)
        .expect("first subscribe");
    // A re-render subscribing again must not stack a second listener.
    adapter
        .subscribe(EventClass::ChainChanged)
        .expect("second subscribe");

    adapter.debug_inject_chain_changed(43114);
    let events = adapter.drain_events().expect("drain");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].class, EventClass::ChainChanged);
    assert_eq!(events[0].payload, serde_json::json!("0xa86a"));
}

#[test]
fn events_for_unsubscribed_classes_are_dropped() {
    let adapter = Eip1193Adapter::simulated(SimulatedWallet::default());
    adapter.debug_inject_chain_changed(43114);
    assert!(adapter.drain_events().expect("drain").is_empty());
}

#[test]
fn unsubscribe_stops_delivery() {
    let adapter = Eip1193Adapter::simulated(SimulatedWallet::default());
    adapter
        .subscribe(EventClass::AccountsChanged)
        .expect("subscribe");
    adapter
        .unsubscribe(EventClass::AccountsChanged)
        .expect("unsubscribe");
    adapter.debug_inject_accounts_changed(vec![SimulatedWallet::default_account()]);
    assert!(adapter.drain_events().expect("drain").is_empty());
}

#[test]
fn drained_events_are_handed_out_once_in_order() {
    let adapter = Eip1193Adapter::simulated(SimulatedWallet::default());
    adapter
        .subscribe(EventClass::AccountsChanged)
        .expect("subscribe accounts");
    adapter
        .subscribe(EventClass::ChainChanged)
        .expect("subscribe chain");

    adapter.debug_inject_accounts_changed(vec![SimulatedWallet::default_account()]);
    adapter.debug_inject_chain_changed(43114);

    let events = adapter.drain_events().expect("drain");
    assert_eq!(events.len(), 2);
    assert!(events[0].sequence < events[1].sequence);
    assert_eq!(events[0].class, EventClass::AccountsChanged);
    assert_eq!(events[1].class, EventClass::ChainChanged);

    assert!(adapter.drain_events().expect("second drain").is_empty());
}
