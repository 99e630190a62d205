use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::ContractName;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Static description of one supported network, mirroring the wallet
/// `wallet_addEthereumChain` payload field-for-field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
    pub native_currency: NativeCurrency,
}

impl NetworkProfile {
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }

    /// Wire payload for `wallet_addEthereumChain`.
    pub fn add_chain_payload(&self) -> Value {
        json!({
            "chainId": self.chain_id_hex(),
            "chainName": self.chain_name,
            "rpcUrls": self.rpc_urls,
            "blockExplorerUrls": self.block_explorer_urls,
            "nativeCurrency": {
                "name": self.native_currency.name,
                "symbol": self.native_currency.symbol,
                "decimals": self.native_currency.decimals,
            },
        })
    }
}

/// Read-only deployment description consumed at client construction:
/// contract addresses as deployed, the target network the client insists
/// on, and the production network kept alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Raw address strings; validated once when the registry is built.
    pub contracts: BTreeMap<ContractName, String>,
    pub target_network: NetworkProfile,
    pub main_network: NetworkProfile,
}

/// Client-side cadence knobs. Defaults match the observed production
/// behavior (3 s dashboard debounce, five-epoch window).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPolicy {
    pub receipt_poll_interval_ms: u64,
    pub receipt_poll_attempts: u32,
    pub dashboard_min_interval_ms: u64,
    pub dashboard_epoch_window: u64,
}

impl Default for ClientPolicy {
    fn default() -> Self {
        Self {
            receipt_poll_interval_ms: 1_000,
            receipt_poll_attempts: 60,
            dashboard_min_interval_ms: 3_000,
            dashboard_epoch_window: 5,
        }
    }
}
