//! Wallet-connection and contract-interaction core for the deedshare client.
//!
//! The crate is transport-agnostic: everything that talks to an injected
//! wallet goes through the [`ports::WalletTransport`] trait, so the same
//! client drives a browser bridge in production and a simulated wallet in
//! tests.

pub mod abi;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod ops;
pub mod ports;
pub mod registry;
pub mod roles;
pub mod session;

pub use config::{ClientPolicy, DeploymentConfig, NativeCurrency, NetworkProfile};
pub use domain::{
    ConnectionPhase, ConnectionSnapshot, ContractName, DashboardView, EpochRecord,
    FractionalizationRecord, KycInfo, PropertyData, PropertyKind, PropertyRecord, PropertyScan,
    TxReceipt,
};
pub use error::WalletError;
pub use guard::{GuardOutcome, LoadGuard, SkipReason};
pub use ops::{ComplianceOps, FractionalizerOps, RentPoolOps, TitleOps, DASHBOARD_GUARD_KEY};
pub use ports::{ClockPort, EventClass, ProviderFailure, WalletEvent, WalletTransport};
pub use registry::{ContractHandle, ContractRegistry};
pub use session::WalletClient;
