use std::collections::BTreeMap;

use deedshare_wallet_core::{
    config::NativeCurrency, ContractName, DeploymentConfig, NetworkProfile,
};

/// Transport-level knobs. `from_env` mirrors how operators actually wire
/// the proxy bridge: one URL variable, nothing else mandatory.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// JSON-RPC endpoint of the injected-provider bridge. When unset the
    /// adapter falls back to the deterministic simulated wallet.
    pub eip1193_proxy_url: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            eip1193_proxy_url: None,
            request_timeout_ms: 15_000,
        }
    }
}

impl AdapterConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("DEEDSHARE_EIP1193_PROXY_URL") {
            if !url.trim().is_empty() {
                config.eip1193_proxy_url = Some(url);
            }
        }
        if let Some(timeout) = std::env::var("DEEDSHARE_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.parse().ok())
        {
            config.request_timeout_ms = timeout;
        }
        config
    }
}

/// The deployed contract set on Avalanche Fuji, with the two supported
/// networks. This is read-only input to the client.
pub fn fuji_deployment() -> DeploymentConfig {
    let mut contracts = BTreeMap::new();
    contracts.insert(
        ContractName::ComplianceRegistry,
        "0x954F55f370F35ffdf976fB6D04e6982296900f5E".to_owned(),
    );
    contracts.insert(
        ContractName::TitleNft,
        "0xa5151a11bBb1F9f2272d14a78736a9e2d9eBED57".to_owned(),
    );
    contracts.insert(
        ContractName::Fractionalizer,
        "0xa3874E90C79daB20e054Ed131f26Bd804a3db882".to_owned(),
    );
    contracts.insert(
        ContractName::RentPoolMerkle,
        "0xeA670F4105Ce7dD1C60fd14C07b994d3Db2e4af8".to_owned(),
    );

    DeploymentConfig {
        contracts,
        target_network: NetworkProfile {
            chain_id: 43113,
            chain_name: "Avalanche Fuji Testnet".to_owned(),
            rpc_urls: vec!["https://api.avax-test.network/ext/bc/C/rpc".to_owned()],
            block_explorer_urls: vec!["https://testnet.snowtrace.io/".to_owned()],
            native_currency: NativeCurrency {
                name: "AVAX".to_owned(),
                symbol: "AVAX".to_owned(),
                decimals: 18,
            },
        },
        main_network: NetworkProfile {
            chain_id: 43114,
            chain_name: "Avalanche C-Chain".to_owned(),
            rpc_urls: vec!["https://api.avax.network/ext/bc/C/rpc".to_owned()],
            block_explorer_urls: vec!["https://snowtrace.io/".to_owned()],
            native_currency: NativeCurrency {
                name: "AVAX".to_owned(),
                symbol: "AVAX".to_owned(),
                decimals: 18,
            },
        },
    }
}
