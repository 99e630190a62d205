//! EIP-1193 transport adapter.
//!
//! Three modes: `Unavailable` (no provider injected anywhere), `Simulated`
//! (the deterministic in-memory wallet), and `Proxy` (blocking JSON-RPC to a
//! bridge that fronts the real injected provider). Event delivery is
//! pull-based: wallet notifications are queued per subscribed class and
//! drained by the session, which keeps listener ownership single and makes
//! re-subscription harmless.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::Address;
use serde_json::{json, Value};

use deedshare_wallet_core::{EventClass, ProviderFailure, WalletEvent, WalletTransport};

use crate::config::AdapterConfig;
use crate::sim::SimulatedWallet;

#[derive(Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    listeners: Arc<Mutex<ListenerState>>,
}

#[derive(Clone)]
enum ProviderMode {
    Unavailable,
    Simulated(Arc<Mutex<SimulatedWallet>>),
    Proxy(ProxyRuntime),
}

#[derive(Clone)]
struct ProxyRuntime {
    base_url: String,
    client: reqwest::blocking::Client,
    snapshot: Arc<Mutex<ProxySnapshot>>,
}

#[derive(Default)]
struct ProxySnapshot {
    accounts: Option<Value>,
    chain_id: Option<String>,
}

#[derive(Default)]
struct ListenerState {
    subscriptions: HashSet<EventClass>,
    event_seq: u64,
    queue: Vec<WalletEvent>,
}

impl Eip1193Adapter {
    /// No provider anywhere; every request fails with the disconnected code.
    pub fn unavailable() -> Self {
        Self {
            mode: ProviderMode::Unavailable,
            listeners: Arc::default(),
        }
    }

    pub fn simulated(wallet: SimulatedWallet) -> Self {
        Self {
            mode: ProviderMode::Simulated(Arc::new(Mutex::new(wallet))),
            listeners: Arc::default(),
        }
    }

    /// Proxy when a bridge URL is configured, simulated otherwise.
    pub fn with_config(config: &AdapterConfig) -> Self {
        match &config.eip1193_proxy_url {
            Some(base_url) => {
                let timeout = std::time::Duration::from_millis(config.request_timeout_ms);
                match reqwest::blocking::Client::builder().timeout(timeout).build() {
                    Ok(client) => Self {
                        mode: ProviderMode::Proxy(ProxyRuntime {
                            base_url: base_url.clone(),
                            client,
                            snapshot: Arc::default(),
                        }),
                        listeners: Arc::default(),
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "proxy client init failed; provider unavailable");
                        Self::unavailable()
                    }
                }
            }
            None => Self::simulated(SimulatedWallet::default()),
        }
    }

    /// Handle to the simulated wallet for test setup and inspection; `None`
    /// in the other modes.
    pub fn simulation(&self) -> Option<Arc<Mutex<SimulatedWallet>>> {
        match &self.mode {
            ProviderMode::Simulated(wallet) => Some(Arc::clone(wallet)),
            _ => None,
        }
    }

    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) {
        if let Some(wallet) = self.simulation() {
            let payload = json!(accounts.iter().map(|a| a.to_string()).collect::<Vec<_>>());
            wallet
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .authorized = accounts;
            self.push_event(EventClass::AccountsChanged, payload);
        }
    }

    pub fn debug_inject_chain_changed(&self, chain_id: u64) {
        if let Some(wallet) = self.simulation() {
            wallet
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .chain_id = chain_id;
            self.push_event(EventClass::ChainChanged, json!(format!("0x{chain_id:x}")));
        }
    }

    fn push_event(&self, class: EventClass, payload: Value) {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !listeners.subscriptions.contains(&class) {
            return;
        }
        listeners.event_seq += 1;
        let sequence = listeners.event_seq;
        listeners.queue.push(WalletEvent {
            sequence,
            class,
            payload,
        });
    }

    fn drain_simulation_events(&self, wallet: &Arc<Mutex<SimulatedWallet>>) {
        let emitted = {
            let mut guard = wallet.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut guard.emitted)
        };
        for (class, payload) in emitted {
            self.push_event(class, payload);
        }
    }

    fn proxy_request(
        &self,
        proxy: &ProxyRuntime,
        method: &str,
        params: Value,
    ) -> Result<Value, ProviderFailure> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = proxy
            .client
            .post(&proxy.base_url)
            .json(&payload)
            .send()
            .map_err(|e| ProviderFailure::new(None, format!("proxy request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| ProviderFailure::new(None, format!("proxy json decode failed: {e}")))?;
        if !status.is_success() {
            return Err(ProviderFailure::new(
                None,
                format!("proxy status {status}: {body}"),
            ));
        }
        if let Some(err) = body.get("error") {
            let mut failure = ProviderFailure::new(
                err.get("code").and_then(|c| c.as_i64()),
                err.get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("provider error")
                    .to_owned(),
            );
            if let Some(data) = err.get("data") {
                failure = failure.with_data(data.clone());
            }
            return Err(failure);
        }
        let result = body
            .get("result")
            .cloned()
            .ok_or_else(|| ProviderFailure::new(None, "proxy response missing result"))?;
        self.note_proxy_changes(proxy, method, &result);
        Ok(result)
    }

    /// The proxy cannot push notifications, so account/chain changes are
    /// detected by diffing successive snapshot reads and queued as events.
    fn note_proxy_changes(&self, proxy: &ProxyRuntime, method: &str, result: &Value) {
        match method {
            "eth_accounts" | "eth_requestAccounts" => {
                let mut snapshot = proxy
                    .snapshot
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if snapshot.accounts.as_ref() != Some(result) {
                    let changed = snapshot.accounts.is_some();
                    snapshot.accounts = Some(result.clone());
                    drop(snapshot);
                    if changed {
                        self.push_event(EventClass::AccountsChanged, result.clone());
                    }
                }
            }
            "eth_chainId" => {
                let Some(chain) = result.as_str() else {
                    return;
                };
                let mut snapshot = proxy
                    .snapshot
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if snapshot.chain_id.as_deref() != Some(chain) {
                    let changed = snapshot.chain_id.is_some();
                    snapshot.chain_id = Some(chain.to_owned());
                    drop(snapshot);
                    if changed {
                        self.push_event(EventClass::ChainChanged, result.clone());
                    }
                }
            }
            _ => {}
        }
    }
}

impl WalletTransport for Eip1193Adapter {
    fn is_available(&self) -> bool {
        !matches!(self.mode, ProviderMode::Unavailable)
    }

    fn request(&self, method: &str, params: Value) -> Result<Value, ProviderFailure> {
        match &self.mode {
            ProviderMode::Unavailable => Err(ProviderFailure::new(
                4900,
                "no injected wallet provider detected",
            )),
            ProviderMode::Simulated(wallet) => {
                let result = {
                    let mut guard = wallet.lock().unwrap_or_else(PoisonError::into_inner);
                    guard.handle_request(method, &params)
                };
                self.drain_simulation_events(wallet);
                result
            }
            ProviderMode::Proxy(proxy) => self.proxy_request(proxy, method, params),
        }
    }

    fn subscribe(&self, class: EventClass) -> Result<(), ProviderFailure> {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Remove-then-add: a second subscribe must not create a second
        // listener, so queued events can never double up.
        listeners.subscriptions.remove(&class);
        listeners.subscriptions.insert(class);
        Ok(())
    }

    fn unsubscribe(&self, class: EventClass) -> Result<(), ProviderFailure> {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.subscriptions.remove(&class);
        Ok(())
    }

    fn drain_events(&self) -> Result<Vec<WalletEvent>, ProviderFailure> {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(std::mem::take(&mut listeners.queue))
    }
}
