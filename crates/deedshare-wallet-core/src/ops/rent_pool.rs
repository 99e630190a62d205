//! Merkle-proof rental-income pool operations. Authorization here is
//! single-owner, not role-based; proof data passes through untouched.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, U256};

use crate::abi;
use crate::domain::{parse_address, ContractName, TxReceipt};
use crate::error::WalletError;
use crate::ports::{ClockPort, WalletTransport};
use crate::registry::ContractHandle;
use crate::session::WalletClient;

pub struct RentPoolOps<'a, T: WalletTransport, C: ClockPort> {
    client: &'a WalletClient<T, C>,
}

impl<'a, T: WalletTransport, C: ClockPort> RentPoolOps<'a, T, C> {
    pub(crate) fn new(client: &'a WalletClient<T, C>) -> Self {
        Self { client }
    }

    fn handle(&self) -> Result<ContractHandle, WalletError> {
        self.client.contract(ContractName::RentPoolMerkle)
    }

    /// Pooled deposits for an epoch, in base units; zero on read failure so
    /// one bad epoch does not abort a window scan.
    pub fn epoch_total_deposits(&self, epoch_id: u64) -> U256 {
        let attempt = || -> Result<U256, WalletError> {
            let handle = self.handle()?;
            let outputs = self.client.read_call(
                &handle,
                "getEpochTotalDeposits",
                &[epoch_arg(epoch_id)],
            )?;
            abi::as_u256(&abi::single(outputs)?)
        };
        match attempt() {
            Ok(total) => total,
            Err(e) => {
                tracing::debug!(error = %e, epoch_id, "epoch deposits read failed");
                U256::ZERO
            }
        }
    }

    pub fn is_claimed(&self, epoch_id: u64, user: &str) -> bool {
        let attempt = || -> Result<bool, WalletError> {
            let who = parse_address(user)?;
            let handle = self.handle()?;
            let outputs = self.client.read_call(
                &handle,
                "isClaimed",
                &[epoch_arg(epoch_id), DynSolValue::Address(who)],
            )?;
            abi::as_bool(&abi::single(outputs)?)
        };
        match attempt() {
            Ok(claimed) => claimed,
            Err(e) => {
                tracing::debug!(error = %e, epoch_id, user, "claim status read failed");
                false
            }
        }
    }

    pub fn epoch_root(&self, epoch_id: u64) -> Option<B256> {
        let attempt = || -> Result<B256, WalletError> {
            let handle = self.handle()?;
            let outputs = self
                .client
                .read_call(&handle, "epochRoot", &[epoch_arg(epoch_id)])?;
            abi::as_b256(&abi::single(outputs)?)
        };
        match attempt() {
            Ok(root) => Some(root),
            Err(e) => {
                tracing::debug!(error = %e, epoch_id, "epoch root read failed");
                None
            }
        }
    }

    pub fn encrypted_amount(&self, epoch_id: u64, user: &str) -> Option<B256> {
        let attempt = || -> Result<B256, WalletError> {
            let who = parse_address(user)?;
            let handle = self.handle()?;
            let outputs = self.client.read_call(
                &handle,
                "getEncryptedAmount",
                &[epoch_arg(epoch_id), DynSolValue::Address(who)],
            )?;
            abi::as_b256(&abi::single(outputs)?)
        };
        match attempt() {
            Ok(word) => Some(word),
            Err(e) => {
                tracing::debug!(error = %e, epoch_id, user, "encrypted amount read failed");
                None
            }
        }
    }

    pub fn owner(&self) -> Option<Address> {
        let attempt = || -> Result<Address, WalletError> {
            let handle = self.handle()?;
            let outputs = self.client.read_call(&handle, "owner", &[])?;
            abi::as_address(&abi::single(outputs)?)
        };
        match attempt() {
            Ok(owner) => Some(owner),
            Err(e) => {
                tracing::debug!(error = %e, "pool owner read failed");
                None
            }
        }
    }

    pub fn deposit_rent(&self, epoch_id: u64, amount: U256) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "depositRent",
            &[epoch_arg(epoch_id), DynSolValue::Uint(amount, 256)],
            None,
        )
    }

    pub fn set_epoch_root(&self, epoch_id: u64, root: B256) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "setEpochRoot",
            &[epoch_arg(epoch_id), DynSolValue::FixedBytes(root, 32)],
            None,
        )
    }

    /// Submit a Merkle claim. The proof is forwarded exactly as given; an
    /// empty proof is a valid submission and only the contract decides
    /// whether it verifies.
    pub fn claim(
        &self,
        epoch_id: u64,
        amount: U256,
        proof: &[B256],
    ) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        let proof_values = proof
            .iter()
            .map(|node| DynSolValue::FixedBytes(*node, 32))
            .collect();
        self.client.write_call(
            &handle,
            "claim",
            &[
                epoch_arg(epoch_id),
                DynSolValue::Uint(amount, 256),
                DynSolValue::Array(proof_values),
            ],
            None,
        )
    }

    pub fn set_encrypted_amount(
        &self,
        epoch_id: u64,
        encrypted_amount: B256,
    ) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "setEncryptedAmount",
            &[
                epoch_arg(epoch_id),
                DynSolValue::FixedBytes(encrypted_amount, 32),
            ],
            None,
        )
    }

    /// Owner-only escape hatch on the pool contract.
    pub fn emergency_withdraw(
        &self,
        token: &str,
        amount: U256,
    ) -> Result<TxReceipt, WalletError> {
        let token = parse_address(token)?;
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "emergencyWithdraw",
            &[DynSolValue::Address(token), DynSolValue::Uint(amount, 256)],
            None,
        )
    }
}

fn epoch_arg(epoch_id: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(epoch_id), 256)
}
