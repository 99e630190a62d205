//! Uniform authorization checks over two models: role-based grants on three
//! contracts, single-owner equality on the rent pool.
//!
//! The per-contract dispatch is deliberately explicit. Inferring the model
//! from the interface would silently misclassify a future contract, so the
//! rent pool stays a named special case.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{keccak256, B256};

use crate::abi;
use crate::domain::{parse_address, ContractName};
use crate::ports::{ClockPort, WalletTransport};
use crate::session::WalletClient;

/// `DEFAULT_ADMIN_ROLE` is the zero role id by convention.
pub const DEFAULT_ADMIN_ROLE: B256 = B256::ZERO;

/// Role id as the contracts compute it: `keccak256` of the role name.
pub fn role_id(name: &str) -> B256 {
    keccak256(name.as_bytes())
}

pub fn admin_role() -> B256 {
    role_id("ADMIN_ROLE")
}

pub fn minter_role() -> B256 {
    role_id("MINTER_ROLE")
}

pub fn burner_role() -> B256 {
    role_id("BURNER_ROLE")
}

pub fn compliance_officer_role() -> B256 {
    role_id("COMPLIANCE_OFFICER_ROLE")
}

pub fn fractionalizer_role() -> B256 {
    role_id("FRACTIONALIZER_ROLE")
}

impl<T: WalletTransport, C: ClockPort> WalletClient<T, C> {
    /// Does `address` hold `role` on `contract`? Fails closed: any parse or
    /// read problem yields `false`, never an error and never a spurious
    /// grant. For the rent pool `role` is ignored and the check is owner
    /// equality (case-insensitive, since addresses compare as bytes).
    pub fn has_authorization(
        &self,
        contract: ContractName,
        role: Option<B256>,
        address: &str,
    ) -> bool {
        let Ok(who) = parse_address(address) else {
            return false;
        };
        let result = match contract {
            ContractName::RentPoolMerkle => self.read_pool_owner().map(|owner| owner == who),
            _ => {
                let Some(role) = role else {
                    return false;
                };
                self.read_role_membership(contract, role, who)
            }
        };
        match result {
            Ok(held) => held,
            Err(e) => {
                tracing::debug!(error = %e, %contract, "authorization check failed closed");
                false
            }
        }
    }

    fn read_pool_owner(&self) -> Result<alloy::primitives::Address, crate::error::WalletError> {
        let handle = self.contract(ContractName::RentPoolMerkle)?;
        let outputs = self.read_call(&handle, "owner", &[])?;
        abi::as_address(&abi::single(outputs)?)
    }

    fn read_role_membership(
        &self,
        contract: ContractName,
        role: B256,
        who: alloy::primitives::Address,
    ) -> Result<bool, crate::error::WalletError> {
        let handle = self.contract(contract)?;
        let outputs = self.read_call(
            &handle,
            "hasRole",
            &[
                DynSolValue::FixedBytes(role, 32),
                DynSolValue::Address(who),
            ],
        )?;
        abi::as_bool(&abi::single(outputs)?)
    }
}
