//! Typed operation surface over the call gateway, one sub-client per
//! deployed contract, plus the admin operations shared by the role-gated
//! contracts and the guarded dashboard aggregate.

mod compliance;
mod dashboard;
mod fractionalizer;
mod rent_pool;
mod title;

pub use compliance::ComplianceOps;
pub use dashboard::DASHBOARD_GUARD_KEY;
pub use fractionalizer::FractionalizerOps;
pub use rent_pool::RentPoolOps;
pub use title::TitleOps;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::B256;

use crate::domain::{parse_address, ContractName, TxReceipt};
use crate::error::WalletError;
use crate::ports::{ClockPort, WalletTransport};
use crate::session::WalletClient;

impl<T: WalletTransport, C: ClockPort> WalletClient<T, C> {
    pub fn compliance(&self) -> ComplianceOps<'_, T, C> {
        ComplianceOps::new(self)
    }

    pub fn title(&self) -> TitleOps<'_, T, C> {
        TitleOps::new(self)
    }

    pub fn fractionalizer(&self) -> FractionalizerOps<'_, T, C> {
        FractionalizerOps::new(self)
    }

    pub fn rent_pool(&self) -> RentPoolOps<'_, T, C> {
        RentPoolOps::new(self)
    }

    /// Pause one of the role-gated contracts.
    pub fn pause(&self, contract: ContractName) -> Result<TxReceipt, WalletError> {
        let handle = self.contract(require_role_managed(contract)?)?;
        self.write_call(&handle, "pause", &[], None)
    }

    pub fn unpause(&self, contract: ContractName) -> Result<TxReceipt, WalletError> {
        let handle = self.contract(require_role_managed(contract)?)?;
        self.write_call(&handle, "unpause", &[], None)
    }

    pub fn grant_role(
        &self,
        contract: ContractName,
        role: B256,
        address: &str,
    ) -> Result<TxReceipt, WalletError> {
        let who = parse_address(address)?;
        let handle = self.contract(require_role_managed(contract)?)?;
        self.write_call(
            &handle,
            "grantRole",
            &[DynSolValue::FixedBytes(role, 32), DynSolValue::Address(who)],
            None,
        )
    }

    pub fn revoke_role(
        &self,
        contract: ContractName,
        role: B256,
        address: &str,
    ) -> Result<TxReceipt, WalletError> {
        let who = parse_address(address)?;
        let handle = self.contract(require_role_managed(contract)?)?;
        self.write_call(
            &handle,
            "revokeRole",
            &[DynSolValue::FixedBytes(role, 32), DynSolValue::Address(who)],
            None,
        )
    }
}

/// The rent pool is owner-managed; routing a role operation at it is a
/// caller bug, refused up front rather than left to the chain.
fn require_role_managed(contract: ContractName) -> Result<ContractName, WalletError> {
    if contract == ContractName::RentPoolMerkle {
        return Err(WalletError::DecodeError(
            "RentPoolMerkle is owner-managed, not role-managed".to_owned(),
        ));
    }
    Ok(contract)
}
