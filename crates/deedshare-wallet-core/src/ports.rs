use serde_json::Value;
use thiserror::Error;

/// The two wallet notification classes the client subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    AccountsChanged,
    ChainChanged,
}

/// A queued wallet notification. `payload` carries the wire shape verbatim:
/// an ordered JSON array of address strings for `AccountsChanged`, a hex
/// chain-id string for `ChainChanged`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletEvent {
    pub sequence: u64,
    pub class: EventClass,
    pub payload: Value,
}

/// Raw provider rejection, before normalization into `WalletError`.
/// `code` follows EIP-1193 (4001 user rejection, 4902 unrecognized chain,
/// 4900/4901 disconnected); JSON-RPC errors keep their own codes.
#[derive(Debug, Clone, Error)]
#[error("provider rejected request (code {code:?}): {message}")]
pub struct ProviderFailure {
    pub code: Option<i64>,
    pub message: String,
    pub data: Option<Value>,
}

impl ProviderFailure {
    pub fn new(code: impl Into<Option<i64>>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Request/subscribe surface of an injected wallet provider.
///
/// Listener registration is a shared resource with at-most-one-owner per
/// event class: `subscribe` replaces any prior registration for the same
/// class instead of stacking a second one, so re-subscription across
/// re-renders can never double-fire. Events for subscribed classes are
/// queued in arrival order and handed out once through `drain_events`.
pub trait WalletTransport {
    /// Side-effect-free presence probe; callable before any connect attempt.
    fn is_available(&self) -> bool;

    fn request(&self, method: &str, params: Value) -> Result<Value, ProviderFailure>;

    fn subscribe(&self, class: EventClass) -> Result<(), ProviderFailure>;

    fn unsubscribe(&self, class: EventClass) -> Result<(), ProviderFailure>;

    fn drain_events(&self) -> Result<Vec<WalletEvent>, ProviderFailure>;
}

/// Time source for debounce bookkeeping and confirmation polling. Tests
/// substitute a deterministic clock.
pub trait ClockPort {
    fn now_ms(&self) -> u64;

    fn sleep_ms(&self, ms: u64);
}
