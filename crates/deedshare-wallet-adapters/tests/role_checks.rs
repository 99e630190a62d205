mod common;

use common::{default_account, harness, other_account};
use deedshare_wallet_core::{roles, ContractName};

#[test]
fn pool_ownership_check_is_case_insensitive() {
    let mut h = harness();
    h.with_sim(|wallet| {
        wallet.chain.pool_owner = default_account();
    });
    h.client.connect().expect("connect");

    let checksummed = default_account().to_string();
    let lowercased = checksummed.to_lowercase();
    assert!(h
        .client
        .has_authorization(ContractName::RentPoolMerkle, None, &checksummed));
    assert!(h
        .client
        .has_authorization(ContractName::RentPoolMerkle, None, &lowercased));
    assert!(!h
        .client
        .has_authorization(ContractName::RentPoolMerkle, None, &other_account().to_string()));
}

#[test]
fn pool_owner_read_failure_fails_closed() {
    let mut h = harness();
    h.with_sim(|wallet| {
        wallet.chain.pool_owner = default_account();
        wallet.chain.fail_owner_read = true;
    });
    h.client.connect().expect("connect");

    // A failed privilege check must never read as "has access".
    assert!(!h
        .client
        .has_authorization(ContractName::RentPoolMerkle, None, &default_account().to_string()));
}

#[test]
fn role_membership_reads_the_grant_table() {
    let mut h = harness();
    h.with_sim(|wallet| {
        wallet.chain.grant_role(
            ContractName::ComplianceRegistry,
            roles::compliance_officer_role(),
            default_account(),
        );
    });
    h.client.connect().expect("connect");

    let me = default_account().to_string();
    assert!(h.client.has_authorization(
        ContractName::ComplianceRegistry,
        Some(roles::compliance_officer_role()),
        &me,
    ));
    // Same role, different contract: grants do not leak across contracts.
    assert!(!h.client.has_authorization(
        ContractName::TitleNft,
        Some(roles::compliance_officer_role()),
        &me,
    ));
    assert!(!h.client.has_authorization(
        ContractName::ComplianceRegistry,
        Some(roles::minter_role()),
        &me,
    ));
}

#[test]
fn role_read_failure_fails_closed() {
    let mut h = harness();
    h.with_sim(|wallet| {
        wallet.chain.grant_role(
            ContractName::TitleNft,
            roles::minter_role(),
            default_account(),
        );
        wallet.chain.fail_role_reads = true;
    });
    h.client.connect().expect("connect");

    assert!(!h.client.has_authorization(
        ContractName::TitleNft,
        Some(roles::minter_role()),
        &default_account().to_string(),
    ));
}

#[test]
fn missing_role_id_on_a_role_contract_fails_closed() {
    let mut h = harness();
    h.client.connect().expect("connect");
    assert!(!h
        .client
        .has_authorization(ContractName::TitleNft, None, &default_account().to_string()));
}

#[test]
fn malformed_address_fails_closed_instead_of_erroring() {
    let mut h = harness();
    h.client.connect().expect("connect");
    assert!(!h
        .client
        .has_authorization(ContractName::RentPoolMerkle, None, "not-an-address"));
}

#[test]
fn granting_a_role_through_the_client_is_visible_to_checks() {
    let mut h = harness();
    h.client.connect().expect("connect");

    let grantee = other_account().to_string();
    assert!(!h
        .client
        .has_authorization(ContractName::TitleNft, Some(roles::minter_role()), &grantee));

    h.client
        .grant_role(ContractName::TitleNft, roles::minter_role(), &grantee)
        .expect("grant");
    assert!(h
        .client
        .has_authorization(ContractName::TitleNft, Some(roles::minter_role()), &grantee));

    h.client
        .revoke_role(ContractName::TitleNft, roles::minter_role(), &grantee)
        .expect("revoke");
    assert!(!h
        .client
        .has_authorization(ContractName::TitleNft, Some(roles::minter_role()), &grantee));
}
