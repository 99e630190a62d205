use alloy::primitives::{keccak256, B256};

use deedshare_wallet_core::abi::{
    decode_revert_reason, encode_revert_reason, interface, parse_chain_id, resolve_function,
};
use deedshare_wallet_core::config::{NativeCurrency, NetworkProfile};
use deedshare_wallet_core::{roles, ContractName, WalletError};

#[test]
fn embedded_interfaces_parse_and_expose_methods() {
    for name in ContractName::ALL {
        let abi = interface(name);
        assert!(
            abi.functions().count() > 5,
            "{name} interface looks truncated"
        );
    }
}

#[test]
fn known_methods_resolve() {
    let cases = [
        (ContractName::ComplianceRegistry, "setKYC"),
        (ContractName::ComplianceRegistry, "getKYCInfo"),
        (ContractName::TitleNft, "tokenOfOwnerByIndex"),
        (ContractName::TitleNft, "mintTitle"),
        (ContractName::Fractionalizer, "fractionalize"),
        (ContractName::Fractionalizer, "fractionalizationFee"),
        (ContractName::RentPoolMerkle, "claim"),
        (ContractName::RentPoolMerkle, "owner"),
    ];
    for (name, method) in cases {
        resolve_function(interface(name), method)
            .unwrap_or_else(|e| panic!("{name}.{method} should resolve: {e}"));
    }
}

#[test]
fn unknown_method_is_a_decode_error() {
    let err = resolve_function(interface(ContractName::RentPoolMerkle), "pause")
        .expect_err("rent pool has no pause");
    assert!(matches!(err, WalletError::DecodeError(_)));
}

#[test]
fn revert_reason_round_trips() {
    let payload = encode_revert_reason("RentPool: invalid proof");
    assert_eq!(
        decode_revert_reason(&payload),
        Some("RentPool: invalid proof".to_owned())
    );
}

#[test]
fn revert_decoding_rejects_foreign_payloads() {
    assert_eq!(decode_revert_reason("0x"), None);
    assert_eq!(decode_revert_reason("0xdeadbeef"), None);
    assert_eq!(decode_revert_reason("not hex at all"), None);
}

#[test]
fn chain_ids_parse_in_both_wire_shapes() {
    assert_eq!(parse_chain_id("0xa869").expect("hex"), 43113);
    assert_eq!(parse_chain_id("43114").expect("decimal"), 43114);
    assert!(parse_chain_id("0xzz").is_err());
}

#[test]
fn add_chain_payload_uses_the_wallet_field_names() {
    let profile = NetworkProfile {
        chain_id: 43113,
        chain_name: "Avalanche Fuji Testnet".to_owned(),
        rpc_urls: vec!["https://api.avax-test.network/ext/bc/C/rpc".to_owned()],
        block_explorer_urls: vec!["https://testnet.snowtrace.io/".to_owned()],
        native_currency: NativeCurrency {
            name: "AVAX".to_owned(),
            symbol: "AVAX".to_owned(),
            decimals: 18,
        },
    };
    let payload = profile.add_chain_payload();
    assert_eq!(payload["chainId"], "0xa869");
    assert_eq!(payload["chainName"], "Avalanche Fuji Testnet");
    assert!(payload["rpcUrls"].is_array());
    assert!(payload["blockExplorerUrls"].is_array());
    assert_eq!(payload["nativeCurrency"]["name"], "AVAX");
    assert_eq!(payload["nativeCurrency"]["symbol"], "AVAX");
    assert_eq!(payload["nativeCurrency"]["decimals"], 18);
}

#[test]
fn role_identifiers_match_the_contract_convention() {
    assert_eq!(roles::DEFAULT_ADMIN_ROLE, B256::ZERO);
    assert_eq!(roles::admin_role(), keccak256("ADMIN_ROLE".as_bytes()));
    assert_eq!(
        roles::compliance_officer_role(),
        keccak256("COMPLIANCE_OFFICER_ROLE".as_bytes())
    );
    assert_ne!(roles::minter_role(), roles::burner_role());
}
