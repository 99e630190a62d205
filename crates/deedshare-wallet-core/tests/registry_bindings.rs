use std::collections::BTreeMap;

use deedshare_wallet_core::config::{NativeCurrency, NetworkProfile};
use deedshare_wallet_core::{ContractName, ContractRegistry, DeploymentConfig, WalletError};

fn network(chain_id: u64) -> NetworkProfile {
    NetworkProfile {
        chain_id,
        chain_name: format!("net-{chain_id}"),
        rpc_urls: vec![format!("https://rpc.net-{chain_id}.example")],
        block_explorer_urls: vec![format!("https://scan.net-{chain_id}.example")],
        native_currency: NativeCurrency {
            name: "AVAX".to_owned(),
            symbol: "AVAX".to_owned(),
            decimals: 18,
        },
    }
}

fn test_config() -> DeploymentConfig {
    let mut contracts = BTreeMap::new();
    contracts.insert(
        ContractName::ComplianceRegistry,
        "0x0000000000000000000000000000000000000101".to_owned(),
    );
    contracts.insert(
        ContractName::TitleNft,
        "0x0000000000000000000000000000000000000102".to_owned(),
    );
    contracts.insert(
        ContractName::Fractionalizer,
        "0x0000000000000000000000000000000000000103".to_owned(),
    );
    contracts.insert(
        ContractName::RentPoolMerkle,
        "0x0000000000000000000000000000000000000104".to_owned(),
    );
    DeploymentConfig {
        contracts,
        target_network: network(43113),
        main_network: network(43114),
    }
}

#[test]
fn malformed_configured_address_is_fatal() {
    let mut config = test_config();
    config
        .contracts
        .insert(ContractName::TitleNft, "not-an-address".to_owned());
    let err = ContractRegistry::from_config(&config).expect_err("must refuse bad deployment");
    assert!(matches!(err, WalletError::InvalidAddress(_)));
}

#[test]
fn missing_configured_address_is_fatal() {
    let mut config = test_config();
    config.contracts.remove(&ContractName::RentPoolMerkle);
    let err = ContractRegistry::from_config(&config).expect_err("must refuse partial deployment");
    assert!(matches!(err, WalletError::InvalidAddress(_)));
}

#[test]
fn handles_are_empty_until_a_signer_is_bound() {
    let registry = ContractRegistry::from_config(&test_config()).expect("valid config");
    assert!(registry.handles().is_empty());
    assert!(matches!(
        registry.handle(ContractName::TitleNft),
        Err(WalletError::NotInitialized)
    ));
}

#[test]
fn rebinding_supersedes_prior_handles() {
    let mut registry = ContractRegistry::from_config(&test_config()).expect("valid config");
    let first_signer = "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("signer");
    let second_signer = "0x2000000000000000000000000000000000000002"
        .parse()
        .expect("signer");

    registry.rebind(first_signer);
    let stale = registry
        .handle(ContractName::ComplianceRegistry)
        .expect("bound handle");
    assert_eq!(stale.signer, first_signer);
    assert!(registry.is_current(&stale));
    assert_eq!(registry.handles().len(), 4);

    registry.rebind(second_signer);
    assert!(!registry.is_current(&stale));
    let fresh = registry
        .handle(ContractName::ComplianceRegistry)
        .expect("rebound handle");
    assert_eq!(fresh.signer, second_signer);
    assert!(registry.is_current(&fresh));
}

#[test]
fn clearing_unbinds_and_stales_everything() {
    let mut registry = ContractRegistry::from_config(&test_config()).expect("valid config");
    let signer = "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("signer");
    registry.rebind(signer);
    let held = registry.handle(ContractName::Fractionalizer).expect("bound");

    registry.clear();
    assert!(registry.handles().is_empty());
    assert!(!registry.is_current(&held));
    assert!(matches!(
        registry.handle(ContractName::Fractionalizer),
        Err(WalletError::NotInitialized)
    ));
}
