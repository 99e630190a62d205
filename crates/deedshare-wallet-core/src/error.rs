use alloy::primitives::U256;
use thiserror::Error;

use crate::abi;
use crate::ports::ProviderFailure;

/// Every failure surfaced by the client, normalized from raw provider
/// rejections into a closed set the embedding can match on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("no injected wallet provider detected")]
    ProviderUnavailable,
    #[error("wallet returned no authorized accounts")]
    NoAccounts,
    #[error("wrong network: expected chain id {expected}, got {actual:?}")]
    WrongNetwork { expected: u64, actual: Option<u64> },
    #[error("request rejected in the wallet")]
    UserRejected,
    #[error("insufficient funds for requested operation")]
    InsufficientFunds,
    #[error("contract reverted: {0}")]
    ContractReverted(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("failed to decode contract response: {0}")]
    DecodeError(String),
    #[error("contract handle is bound to a superseded signer")]
    StaleBinding,
    #[error("contract registry is not bound; connect a wallet first")]
    NotInitialized,
    #[error("transport error: {0}")]
    Transport(String),
}

// EIP-1193 provider error codes.
const CODE_USER_REJECTED: i64 = 4001;
const CODE_DISCONNECTED: i64 = 4900;
const CODE_CHAIN_DISCONNECTED: i64 = 4901;
/// Unrecognized chain in `wallet_switchEthereumChain`; handled by the
/// session's add-network flow before normalization ever sees it.
pub const CODE_UNKNOWN_CHAIN: i64 = 4902;

impl WalletError {
    /// Collapse a raw provider rejection into the taxonomy. Signer/network
    /// races land on [`WalletError::WrongNetwork`] so a burst of mid-flight
    /// failures reads as one condition, not many unrelated ones.
    pub fn from_provider(expected_chain: u64, failure: ProviderFailure) -> Self {
        match failure.code {
            Some(CODE_USER_REJECTED) => WalletError::UserRejected,
            Some(CODE_DISCONNECTED) | Some(CODE_CHAIN_DISCONNECTED) => {
                WalletError::ProviderUnavailable
            }
            _ => {
                let message = failure.message;
                let lower = message.to_ascii_lowercase();
                if lower.contains("insufficient funds") {
                    return WalletError::InsufficientFunds;
                }
                if lower.contains("underlying network changed")
                    || lower.contains("network changed")
                {
                    return WalletError::WrongNetwork {
                        expected: expected_chain,
                        actual: None,
                    };
                }
                if let Some(reason) = failure
                    .data
                    .as_ref()
                    .and_then(|d| d.as_str())
                    .and_then(abi::decode_revert_reason)
                {
                    return WalletError::ContractReverted(reason);
                }
                if let Some(reason) = lower
                    .contains("execution reverted")
                    .then(|| extract_revert_message(&message))
                {
                    return WalletError::ContractReverted(reason);
                }
                WalletError::Transport(message)
            }
        }
    }

    /// True for the error classes that kill the whole session rather than a
    /// single operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WalletError::ProviderUnavailable | WalletError::InvalidAddress(_)
        )
    }
}

fn extract_revert_message(message: &str) -> String {
    let trimmed = message
        .split_once("execution reverted")
        .map(|(_, rest)| rest)
        .unwrap_or(message)
        .trim_start_matches([':', ' ']);
    if trimmed.is_empty() {
        "execution reverted".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Local pre-submission funds check used by fee-bearing writes.
pub(crate) fn require_funds(available: U256, required: U256) -> Result<(), WalletError> {
    if available < required {
        return Err(WalletError::InsufficientFunds);
    }
    Ok(())
}
