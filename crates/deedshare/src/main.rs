//! deedshare: command-line shell over the wallet client.
//!
//! Wires the EIP-1193 adapter (proxy bridge when `DEEDSHARE_EIP1193_PROXY_URL`
//! is set, the deterministic simulated wallet otherwise) into the core client
//! and drives the connection lifecycle plus a few read operations.

use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::U256;
use eyre::WrapErr;

use deedshare_wallet_adapters::{
    fuji_deployment, AdapterConfig, Eip1193Adapter, SimulatedWallet, SystemClockAdapter,
};
use deedshare_wallet_core::{
    roles, ClientPolicy, ClockPort, ContractName, GuardOutcome, WalletClient, WalletTransport,
};

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("status");

    let transport = Eip1193Adapter::with_config(&AdapterConfig::from_env());
    if let Some(sim) = transport.simulation() {
        seed_demo(&sim);
    }

    let mut client = WalletClient::new(
        transport,
        SystemClockAdapter,
        fuji_deployment(),
        ClientPolicy::default(),
    )
    .wrap_err("wallet client construction failed")?;

    match command {
        "status" => {
            client.resume();
            print_snapshot(&client);
        }
        "connect" => {
            client.connect().wrap_err("wallet connection failed")?;
            print_snapshot(&client);
        }
        "properties" => {
            client.connect().wrap_err("wallet connection failed")?;
            let user = args
                .get(1)
                .cloned()
                .or_else(|| client.snapshot().account.map(|a| a.to_string()))
                .ok_or_else(|| eyre::eyre!("no account to enumerate"))?;
            match client.load_dashboard(&user)? {
                GuardOutcome::Completed(view) => {
                    println!("properties: {}", view.properties.len());
                    for p in &view.properties {
                        println!(
                            "  #{} {} ({}) verified={} fractionalized={}",
                            p.token_id,
                            p.location,
                            p.property_type,
                            p.is_verified,
                            p.fractionalization.is_some()
                        );
                    }
                    for e in &view.epochs {
                        println!(
                            "  epoch {}: deposits={} claimed={}",
                            e.epoch_id, e.total_deposits, e.is_claimed
                        );
                    }
                    for w in &view.warnings {
                        println!("  warning: {w}");
                    }
                }
                GuardOutcome::Skipped(reason) => println!("load skipped: {reason:?}"),
            }
        }
        "kyc" => {
            client.connect().wrap_err("wallet connection failed")?;
            let user = args
                .get(1)
                .cloned()
                .or_else(|| client.snapshot().account.map(|a| a.to_string()))
                .ok_or_else(|| eyre::eyre!("no account to check"))?;
            match client.compliance().kyc_info(&user) {
                Some(info) => println!(
                    "kyc: status={} valid={} expiry={}",
                    info.kyc_status, info.is_valid, info.expiry
                ),
                None => println!("kyc: no record"),
            }
        }
        "fee" => {
            client.connect().wrap_err("wallet connection failed")?;
            println!("fractionalization fee: {}", client.fractionalizer().fee_display());
        }
        "authorized" => {
            client.connect().wrap_err("wallet connection failed")?;
            let user = args
                .get(1)
                .cloned()
                .or_else(|| client.snapshot().account.map(|a| a.to_string()))
                .ok_or_else(|| eyre::eyre!("no account to check"))?;
            for contract in ContractName::ALL {
                let held = client.has_authorization(contract, Some(roles::admin_role()), &user);
                println!("  {contract}: admin={held}");
            }
        }
        other => {
            eyre::bail!(
                "unknown command '{other}' (expected status|connect|properties|kyc|fee|authorized)"
            );
        }
    }
    Ok(())
}

fn print_snapshot<T: WalletTransport, C: ClockPort>(client: &WalletClient<T, C>) {
    let snapshot = client.snapshot();
    println!("phase:   {:?}", snapshot.phase);
    match snapshot.account {
        Some(account) => println!("account: {account}"),
        None => println!("account: (none)"),
    }
    match snapshot.chain_id {
        Some(id) => println!("chain:   {id} (target {})", client.target_chain_id()),
        None => println!("chain:   (unknown)"),
    }
    println!("balance: {}", snapshot.balance);
    if let Some(err) = &snapshot.last_error {
        println!("error:   {err}");
    }
}

/// Populate the simulated wallet with enough state to make the read
/// commands show something.
fn seed_demo(sim: &Arc<Mutex<SimulatedWallet>>) {
    let mut wallet = sim.lock().unwrap_or_else(PoisonError::into_inner);
    let account = SimulatedWallet::default_account();
    wallet.authorized = vec![account];

    let chain = &mut wallet.chain;
    chain.seed_property(account, "12 Harbor Lane", "House", U256::from(250_000u64));
    chain.seed_property(account, "Unit 4, Mill Row", "Apartment", U256::from(90_000u64));
    chain.kyc.insert(
        account,
        deedshare_wallet_adapters::sim::KycState {
            status: true,
            timestamp: chain.now_timestamp,
            expiry: chain.now_timestamp + 31_536_000,
        },
    );
    chain.grant_role(
        ContractName::ComplianceRegistry,
        roles::admin_role(),
        account,
    );
    chain
        .epochs
        .entry(1)
        .or_default()
        .total_deposits = U256::from(5_000_000_000_000_000_000u64);
}
