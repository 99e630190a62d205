use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// The four deployed contracts the client binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContractName {
    ComplianceRegistry,
    TitleNft,
    Fractionalizer,
    RentPoolMerkle,
}

impl ContractName {
    pub const ALL: [ContractName; 4] = [
        ContractName::ComplianceRegistry,
        ContractName::TitleNft,
        ContractName::Fractionalizer,
        ContractName::RentPoolMerkle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractName::ComplianceRegistry => "ComplianceRegistry",
            ContractName::TitleNft => "TitleNFT",
            ContractName::Fractionalizer => "Fractionalizer",
            ContractName::RentPoolMerkle => "RentPoolMerkle",
        }
    }
}

impl std::fmt::Display for ContractName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wallet-connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    WrongNetwork,
}

/// Point-in-time view of the wallet connection. Mutated only by the session
/// state machine; everything else reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    pub phase: ConnectionPhase,
    /// Display-formatted native balance; advisory only, never used to gate
    /// a write.
    pub balance: String,
    pub last_error: Option<WalletError>,
}

impl Default for ConnectionSnapshot {
    fn default() -> Self {
        Self {
            account: None,
            chain_id: None,
            phase: ConnectionPhase::Disconnected,
            balance: "0".to_owned(),
            last_error: None,
        }
    }
}

impl ConnectionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.phase == ConnectionPhase::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.phase == ConnectionPhase::Connecting
    }
}

/// Property classification as recorded on-chain. Unknown labels round-trip
/// through `Other` rather than failing the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    House,
    Apartment,
    Condo,
    Commercial,
    Land,
    Other(String),
}

impl PropertyKind {
    pub fn from_label(label: &str) -> Self {
        match label {
            "House" => PropertyKind::House,
            "Apartment" => PropertyKind::Apartment,
            "Condo" => PropertyKind::Condo,
            "Commercial" => PropertyKind::Commercial,
            "Land" => PropertyKind::Land,
            other => PropertyKind::Other(other.to_owned()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PropertyKind::House => "House",
            PropertyKind::Apartment => "Apartment",
            PropertyKind::Condo => "Condo",
            PropertyKind::Commercial => "Commercial",
            PropertyKind::Land => "Land",
            PropertyKind::Other(s) => s,
        }
    }
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The on-chain property tuple used by mint and update calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyData {
    pub location: String,
    pub value: U256,
    pub area: u64,
    pub property_type: PropertyKind,
    pub is_verified: bool,
}

/// Read-only projection of one title token, assembled per query and never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub token_id: u64,
    pub owner: Address,
    pub location: String,
    pub value: U256,
    pub area: u64,
    pub property_type: PropertyKind,
    pub is_verified: bool,
    pub mint_timestamp: u64,
    pub doc_uri: String,
    pub fractionalization: Option<FractionalizationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FractionalizationRecord {
    pub token_id: u64,
    pub token_address: Address,
    pub total_supply: U256,
    pub fractionalizer: Address,
    pub timestamp: u64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch_id: u64,
    pub total_deposits: U256,
    /// Claimed status for the querying identity.
    pub is_claimed: bool,
}

/// Named fields of the registry's KYC info tuple, with chain integers
/// already converted to plain integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycInfo {
    pub kyc_status: bool,
    pub timestamp: u64,
    pub expiry: u64,
    pub is_valid: bool,
}

/// Confirmed transaction receipt returned by every write operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub status: bool,
    pub gas_used: U256,
}

/// Result of enumerating a user's properties. Sub-query failures drop the
/// affected token and leave a note in `warnings` instead of blanking the
/// whole list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyScan {
    pub properties: Vec<PropertyRecord>,
    pub warnings: Vec<String>,
}

/// Aggregate view backing the portfolio dashboard: properties with
/// fractionalization attached, plus the recent epoch window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardView {
    pub properties: Vec<PropertyRecord>,
    pub epochs: Vec<EpochRecord>,
    pub warnings: Vec<String>,
}

/// Parse a caller-supplied address string, rejecting anything a resolver
/// could misread as a name lookup.
pub fn parse_address(raw: &str) -> Result<Address, WalletError> {
    raw.trim()
        .parse::<Address>()
        .map_err(|_| WalletError::InvalidAddress(raw.to_owned()))
}
