//! Binding of the deployed contracts to the current signing identity.
//!
//! Handles are generation-stamped: every identity change produces a fresh
//! set, and a handle from a superseded generation is refused at the gateway
//! instead of silently signing as the wrong account.

use std::collections::BTreeMap;

use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;

use crate::abi;
use crate::config::DeploymentConfig;
use crate::domain::ContractName;
use crate::error::WalletError;

/// One contract bound to a signer generation. Cheap to clone; holding a
/// clone across an identity change is allowed, invoking it is not.
#[derive(Debug, Clone)]
pub struct ContractHandle {
    pub name: ContractName,
    pub address: Address,
    pub signer: Address,
    pub interface: &'static JsonAbi,
    generation: u64,
}

impl ContractHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
pub struct ContractRegistry {
    addresses: BTreeMap<ContractName, Address>,
    generation: u64,
    bound: Option<BTreeMap<ContractName, ContractHandle>>,
}

impl ContractRegistry {
    /// Parse and validate the configured addresses. A malformed address here
    /// is fatal: the client refuses to construct rather than limp along with
    /// a partial deployment.
    pub fn from_config(config: &DeploymentConfig) -> Result<Self, WalletError> {
        let mut addresses = BTreeMap::new();
        for name in ContractName::ALL {
            let raw = config
                .contracts
                .get(&name)
                .ok_or_else(|| WalletError::InvalidAddress(format!("missing address: {name}")))?;
            let parsed = raw
                .trim()
                .parse::<Address>()
                .map_err(|_| WalletError::InvalidAddress(format!("{name}: {raw}")))?;
            addresses.insert(name, parsed);
        }
        Ok(Self {
            addresses,
            generation: 0,
            bound: None,
        })
    }

    /// Rebuild every handle against a new signing identity. Consumers still
    /// holding handles from before this call will get `StaleBinding`.
    pub fn rebind(&mut self, signer: Address) {
        self.generation += 1;
        let generation = self.generation;
        let handles = self
            .addresses
            .iter()
            .map(|(&name, &address)| {
                (
                    name,
                    ContractHandle {
                        name,
                        address,
                        signer,
                        interface: abi::interface(name),
                        generation,
                    },
                )
            })
            .collect();
        self.bound = Some(handles);
    }

    /// Drop all bindings (disconnect / wrong network). Also advances the
    /// generation so in-flight holders go stale.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.bound = None;
    }

    /// Current handle set; empty while disconnected.
    pub fn handles(&self) -> BTreeMap<ContractName, ContractHandle> {
        self.bound.clone().unwrap_or_default()
    }

    pub fn handle(&self, name: ContractName) -> Result<ContractHandle, WalletError> {
        self.bound
            .as_ref()
            .and_then(|set| set.get(&name))
            .cloned()
            .ok_or(WalletError::NotInitialized)
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    pub fn is_current(&self, handle: &ContractHandle) -> bool {
        self.bound.is_some() && handle.generation == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
