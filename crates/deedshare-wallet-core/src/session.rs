//! The wallet-connection state machine and the client facade built on it.
//!
//! `WalletClient` is the single owner of all connection state. Every
//! mutation funnels through the operations here; the registry, gateway and
//! operation layers only read the snapshot.

use std::sync::atomic::{AtomicBool, Ordering};

use alloy::primitives::{utils::format_ether, Address, U256};
use serde_json::json;

use crate::abi;
use crate::config::{ClientPolicy, DeploymentConfig};
use crate::domain::{ConnectionPhase, ConnectionSnapshot, ContractName};
use crate::error::{WalletError, CODE_UNKNOWN_CHAIN};
use crate::guard::LoadGuard;
use crate::ports::{ClockPort, EventClass, ProviderFailure, WalletTransport};
use crate::registry::{ContractHandle, ContractRegistry};

pub struct WalletClient<T: WalletTransport, C: ClockPort> {
    pub(crate) transport: T,
    pub(crate) clock: C,
    pub(crate) policy: ClientPolicy,
    pub(crate) config: DeploymentConfig,
    pub(crate) registry: ContractRegistry,
    pub(crate) guard: LoadGuard,
    snapshot: ConnectionSnapshot,
    network_noise_logged: AtomicBool,
    fatal_reported: AtomicBool,
}

impl<T: WalletTransport, C: ClockPort> WalletClient<T, C> {
    /// Build a client over a transport. Address configuration is validated
    /// here; a malformed deployment is fatal, not retried.
    pub fn new(
        transport: T,
        clock: C,
        config: DeploymentConfig,
        policy: ClientPolicy,
    ) -> Result<Self, WalletError> {
        let registry = ContractRegistry::from_config(&config)?;
        Ok(Self {
            transport,
            clock,
            policy,
            config,
            registry,
            guard: LoadGuard::new(),
            snapshot: ConnectionSnapshot::default(),
            network_noise_logged: AtomicBool::new(false),
            fatal_reported: AtomicBool::new(false),
        })
    }

    pub fn snapshot(&self) -> &ConnectionSnapshot {
        &self.snapshot
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn target_chain_id(&self) -> u64 {
        self.config.target_network.chain_id
    }

    /// Current contract handle for `name`; `NotInitialized` while no signer
    /// is bound.
    pub fn contract(&self, name: ContractName) -> Result<ContractHandle, WalletError> {
        self.registry.handle(name)
    }

    pub fn contract_handles(
        &self,
    ) -> std::collections::BTreeMap<ContractName, ContractHandle> {
        self.registry.handles()
    }

    /// Request wallet authorization and bring the connection up. Calling
    /// while already connected is a no-op; in particular it does not kick
    /// off another balance refresh.
    pub fn connect(&mut self) -> Result<(), WalletError> {
        if self.snapshot.phase == ConnectionPhase::Connected {
            return Ok(());
        }
        if !self.transport.is_available() {
            return Err(self.fail_fatal(WalletError::ProviderUnavailable));
        }

        self.snapshot.phase = ConnectionPhase::Connecting;
        self.snapshot.last_error = None;

        let accounts = match self.request_accounts("eth_requestAccounts") {
            Ok(accounts) => accounts,
            Err(e) => return Err(self.fail_connect(e)),
        };
        let Some(account) = accounts.first().copied() else {
            return Err(self.fail_connect(WalletError::NoAccounts));
        };
        // Subscribe as soon as an identity exists: a session stuck on the
        // wrong network still needs to hear the user switch back manually.
        self.subscribe_events();

        let chain_id = match self.query_chain_id() {
            Ok(id) => id,
            Err(e) => return Err(self.fail_connect(e)),
        };

        let target = self.config.target_network.chain_id;
        let chain_id = if chain_id == target {
            chain_id
        } else {
            self.snapshot.phase = ConnectionPhase::WrongNetwork;
            self.snapshot.account = Some(account);
            self.snapshot.chain_id = Some(chain_id);
            match self.switch_to_target(chain_id) {
                Ok(id) => id,
                Err(e) => {
                    self.snapshot.last_error = Some(e.clone());
                    return Err(e);
                }
            }
        };

        self.snapshot = ConnectionSnapshot {
            account: Some(account),
            chain_id: Some(chain_id),
            phase: ConnectionPhase::Connected,
            balance: "0".to_owned(),
            last_error: None,
        };
        self.registry.rebind(account);
        self.guard.invalidate_all();
        self.network_noise_logged.store(false, Ordering::Relaxed);
        // Advisory; must not gate the Connected transition.
        self.refresh_balance();
        Ok(())
    }

    /// Silent reconnection: if the wallet already authorizes an account,
    /// adopt it without prompting. Never asks for authorization and never
    /// issues a network-switch request. Returns whether a connection came up.
    pub fn resume(&mut self) -> bool {
        if !self.transport.is_available() {
            return false;
        }
        let accounts = match self.request_accounts("eth_accounts") {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::debug!(error = %e, "silent reconnection probe failed");
                return false;
            }
        };
        let Some(account) = accounts.first().copied() else {
            return false;
        };
        let chain_id = match self.query_chain_id() {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(error = %e, "silent reconnection chain query failed");
                return false;
            }
        };

        self.subscribe_events();
        self.snapshot.account = Some(account);
        self.snapshot.chain_id = Some(chain_id);

        let target = self.config.target_network.chain_id;
        if chain_id != target {
            self.snapshot.phase = ConnectionPhase::WrongNetwork;
            self.snapshot.last_error = Some(WalletError::WrongNetwork {
                expected: target,
                actual: Some(chain_id),
            });
            return false;
        }

        self.snapshot.phase = ConnectionPhase::Connected;
        self.snapshot.last_error = None;
        self.registry.rebind(account);
        self.guard.invalidate_all();
        self.refresh_balance();
        true
    }

    /// Tear the connection down. Safe to call from any phase, any number of
    /// times.
    pub fn disconnect(&mut self) {
        self.snapshot = ConnectionSnapshot::default();
        self.registry.clear();
        self.guard.invalidate_all();
        self.network_noise_logged.store(false, Ordering::Relaxed);
    }

    /// Apply queued wallet notifications (account-set and chain changes) in
    /// arrival order.
    pub fn process_events(&mut self) {
        let events = match self.transport.drain_events() {
            Ok(events) => events,
            Err(e) => {
                tracing::debug!(error = %e, "draining wallet events failed");
                return;
            }
        };
        for event in events {
            match event.class {
                EventClass::AccountsChanged => self.apply_accounts_changed(&event.payload),
                EventClass::ChainChanged => self.apply_chain_changed(&event.payload),
            }
        }
    }

    /// Re-read the native balance for display. Failures degrade to "0";
    /// this value is advisory and never gates a write.
    pub fn refresh_balance(&mut self) {
        let Some(account) = self.snapshot.account else {
            self.snapshot.balance = "0".to_owned();
            return;
        };
        match self.query_balance(account) {
            Ok(wei) => self.snapshot.balance = format_ether(wei),
            Err(e) => {
                tracing::debug!(error = %e, "balance refresh failed");
                self.snapshot.balance = "0".to_owned();
            }
        }
    }

    /// Fresh base-unit balance for pre-submission checks. Deliberately does
    /// not consult the cached display value.
    pub fn fresh_balance_wei(&self) -> Result<U256, WalletError> {
        let account = self.snapshot.account.ok_or(WalletError::NotInitialized)?;
        self.query_balance(account)
    }

    /// Mark a guarded load's key abandoned (consumer teardown). A load still
    /// running under the key will have its result discarded.
    pub fn abandon_load(&self, key: &str) {
        self.guard.invalidate(key);
    }

    fn apply_accounts_changed(&mut self, payload: &serde_json::Value) {
        let accounts: Vec<Address> = payload
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .filter_map(|s| s.parse().ok())
                    .collect()
            })
            .unwrap_or_default();

        if accounts.is_empty() {
            self.disconnect();
            return;
        }
        let first = accounts[0];
        if self.snapshot.account == Some(first) {
            return;
        }
        if matches!(
            self.snapshot.phase,
            ConnectionPhase::Connected | ConnectionPhase::WrongNetwork
        ) {
            self.snapshot.account = Some(first);
            if self.snapshot.is_connected() {
                self.registry.rebind(first);
            }
            self.guard.invalidate_all();
            self.refresh_balance();
        }
    }

    fn apply_chain_changed(&mut self, payload: &serde_json::Value) {
        // Same discipline as account changes: no session, no reaction.
        if !matches!(
            self.snapshot.phase,
            ConnectionPhase::Connected | ConnectionPhase::WrongNetwork
        ) {
            return;
        }
        let Some(raw) = payload.as_str() else {
            tracing::debug!("chain change payload was not a string");
            return;
        };
        let Ok(chain_id) = abi::parse_chain_id(raw) else {
            tracing::debug!(payload = raw, "unparseable chain id in chain change");
            return;
        };

        self.snapshot.chain_id = Some(chain_id);
        let target = self.config.target_network.chain_id;

        if chain_id != target {
            // Never stay "connected" on the wrong network.
            let err = WalletError::WrongNetwork {
                expected: target,
                actual: Some(chain_id),
            };
            if self.snapshot.phase == ConnectionPhase::Connected {
                self.registry.clear();
                self.guard.invalidate_all();
            }
            self.snapshot.phase = ConnectionPhase::WrongNetwork;
            self.note_network_noise(&err);
            self.snapshot.last_error = Some(err);
            return;
        }

        if self.snapshot.phase == ConnectionPhase::WrongNetwork {
            if let Some(account) = self.snapshot.account {
                self.snapshot.phase = ConnectionPhase::Connected;
                self.snapshot.last_error = None;
                self.registry.rebind(account);
                self.guard.invalidate_all();
                self.network_noise_logged.store(false, Ordering::Relaxed);
                self.refresh_balance();
            }
        }
    }

    /// Ask the wallet to switch to the target network, adding it first if
    /// the wallet does not know it. Any failure surfaces as `WrongNetwork`.
    fn switch_to_target(&mut self, current: u64) -> Result<u64, WalletError> {
        let target = self.config.target_network.clone();
        let switch_params = json!([{ "chainId": target.chain_id_hex() }]);
        match self
            .transport
            .request("wallet_switchEthereumChain", switch_params)
        {
            Ok(_) => {}
            Err(failure) if failure.code == Some(CODE_UNKNOWN_CHAIN) => {
                self.transport
                    .request("wallet_addEthereumChain", json!([target.add_chain_payload()]))
                    .map_err(|e| self.switch_failure(current, e))?;
            }
            Err(failure) => return Err(self.switch_failure(current, failure)),
        }

        let chain_id = self.query_chain_id()?;
        if chain_id != target.chain_id {
            return Err(WalletError::WrongNetwork {
                expected: target.chain_id,
                actual: Some(chain_id),
            });
        }
        Ok(chain_id)
    }

    fn switch_failure(&self, current: u64, failure: ProviderFailure) -> WalletError {
        tracing::debug!(error = %failure, "network switch declined");
        WalletError::WrongNetwork {
            expected: self.config.target_network.chain_id,
            actual: Some(current),
        }
    }

    fn subscribe_events(&self) {
        for class in [EventClass::AccountsChanged, EventClass::ChainChanged] {
            if let Err(e) = self.transport.subscribe(class) {
                tracing::debug!(error = %e, ?class, "event subscription failed");
            }
        }
    }

    fn request_accounts(&self, method: &str) -> Result<Vec<Address>, WalletError> {
        let raw = self
            .transport
            .request(method, json!([]))
            .map_err(|e| self.normalize(e))?;
        let arr = raw.as_array().ok_or_else(|| {
            WalletError::DecodeError(format!("{method} must return an array"))
        })?;
        arr.iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| {
                        WalletError::DecodeError(format!("{method} entries must be strings"))
                    })
                    .and_then(|s| {
                        s.parse::<Address>().map_err(|_| {
                            WalletError::DecodeError(format!("{method} returned bad address: {s}"))
                        })
                    })
            })
            .collect()
    }

    fn query_chain_id(&self) -> Result<u64, WalletError> {
        let raw = self
            .transport
            .request("eth_chainId", json!([]))
            .map_err(|e| self.normalize(e))?;
        let s = raw.as_str().ok_or_else(|| {
            WalletError::DecodeError("eth_chainId must return a hex string".to_owned())
        })?;
        abi::parse_chain_id(s)
    }

    fn query_balance(&self, account: Address) -> Result<U256, WalletError> {
        let raw = self
            .transport
            .request("eth_getBalance", json!([account, "latest"]))
            .map_err(|e| self.normalize(e))?;
        let s = raw.as_str().ok_or_else(|| {
            WalletError::DecodeError("eth_getBalance must return a hex quantity".to_owned())
        })?;
        abi::parse_quantity(s)
    }

    /// Normalize a raw provider failure, coalescing signer/network races and
    /// keeping them from spamming the log.
    pub(crate) fn normalize(&self, failure: ProviderFailure) -> WalletError {
        let err = WalletError::from_provider(self.config.target_network.chain_id, failure);
        if matches!(err, WalletError::WrongNetwork { .. }) {
            self.note_network_noise(&err);
        }
        err
    }

    fn note_network_noise(&self, err: &WalletError) {
        if !self.network_noise_logged.swap(true, Ordering::Relaxed) {
            tracing::warn!(error = %err, "network identity changed; repeats logged at debug");
        } else {
            tracing::debug!(error = %err, "repeated network-transition failure suppressed");
        }
    }

    fn fail_connect(&mut self, err: WalletError) -> WalletError {
        self.snapshot.phase = ConnectionPhase::Disconnected;
        self.snapshot.last_error = Some(err.clone());
        err
    }

    fn fail_fatal(&mut self, err: WalletError) -> WalletError {
        if !self.fatal_reported.swap(true, Ordering::Relaxed) {
            tracing::warn!(error = %err, "wallet session is unusable");
        }
        self.snapshot.last_error = Some(err.clone());
        err
    }
}
