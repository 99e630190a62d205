//! Identity/compliance registry operations.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{B256, U256};

use crate::abi;
use crate::domain::{parse_address, ContractName, KycInfo, TxReceipt};
use crate::error::WalletError;
use crate::ports::{ClockPort, WalletTransport};
use crate::registry::ContractHandle;
use crate::session::WalletClient;

pub struct ComplianceOps<'a, T: WalletTransport, C: ClockPort> {
    client: &'a WalletClient<T, C>,
}

impl<'a, T: WalletTransport, C: ClockPort> ComplianceOps<'a, T, C> {
    pub(crate) fn new(client: &'a WalletClient<T, C>) -> Self {
        Self { client }
    }

    fn handle(&self) -> Result<ContractHandle, WalletError> {
        self.client.contract(ContractName::ComplianceRegistry)
    }

    pub fn is_kyc_valid(&self, user: &str) -> bool {
        self.read_flag("isKYCValid", user)
    }

    pub fn is_kyced(&self, user: &str) -> bool {
        self.read_flag("isKYCed", user)
    }

    /// The registry's KYC info tuple, destructured into named fields with
    /// chain integers converted down. `None` when the read fails.
    pub fn kyc_info(&self, user: &str) -> Option<KycInfo> {
        let attempt = || -> Result<KycInfo, WalletError> {
            let who = parse_address(user)?;
            let handle = self.handle()?;
            let outputs =
                self.client
                    .read_call(&handle, "getKYCInfo", &[DynSolValue::Address(who)])?;
            if outputs.len() != 4 {
                return Err(WalletError::DecodeError(format!(
                    "getKYCInfo returned {} values, expected 4",
                    outputs.len()
                )));
            }
            Ok(KycInfo {
                kyc_status: abi::as_bool(&outputs[0])?,
                timestamp: abi::as_u64(&outputs[1])?,
                expiry: abi::as_u64(&outputs[2])?,
                is_valid: abi::as_bool(&outputs[3])?,
            })
        };
        match attempt() {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::debug!(error = %e, user, "kyc info read failed");
                None
            }
        }
    }

    pub fn encrypted_kyc_data(&self, user: &str) -> Option<B256> {
        self.read_word("getEncryptedKYCData", user)
    }

    pub fn commitment_hash(&self, user: &str) -> Option<B256> {
        self.read_word("commitmentHashes", user)
    }

    pub fn set_kyc(
        &self,
        user: &str,
        status: bool,
        expiry_timestamp: u64,
        encrypted_data: B256,
    ) -> Result<TxReceipt, WalletError> {
        let who = parse_address(user)?;
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "setKYC",
            &[
                DynSolValue::Address(who),
                DynSolValue::Bool(status),
                DynSolValue::Uint(U256::from(expiry_timestamp), 256),
                DynSolValue::FixedBytes(encrypted_data, 32),
            ],
            None,
        )
    }

    /// Batch KYC update. Every address is validated up front; one malformed
    /// entry rejects the whole batch before anything is submitted.
    pub fn batch_set_kyc(
        &self,
        users: &[&str],
        status: bool,
        expiry_timestamp: u64,
    ) -> Result<TxReceipt, WalletError> {
        let parsed = parse_batch(users)?;
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "batchSetKYC",
            &[
                DynSolValue::Array(parsed),
                DynSolValue::Bool(status),
                DynSolValue::Uint(U256::from(expiry_timestamp), 256),
            ],
            None,
        )
    }

    pub fn set_encrypted_kyc_data(
        &self,
        user: &str,
        encrypted_data: B256,
    ) -> Result<TxReceipt, WalletError> {
        let who = parse_address(user)?;
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "setEncryptedKYCData",
            &[
                DynSolValue::Address(who),
                DynSolValue::FixedBytes(encrypted_data, 32),
            ],
            None,
        )
    }

    pub fn set_commitment(&self, commitment: B256) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "setCommitment",
            &[DynSolValue::FixedBytes(commitment, 32)],
            None,
        )
    }

    pub fn revoke_kyc(&self, user: &str) -> Result<TxReceipt, WalletError> {
        let who = parse_address(user)?;
        let handle = self.handle()?;
        self.client
            .write_call(&handle, "revokeKYC", &[DynSolValue::Address(who)], None)
    }

    pub fn batch_revoke_kyc(&self, users: &[&str]) -> Result<TxReceipt, WalletError> {
        let parsed = parse_batch(users)?;
        let handle = self.handle()?;
        self.client
            .write_call(&handle, "batchRevokeKYC", &[DynSolValue::Array(parsed)], None)
    }

    fn read_flag(&self, method: &'static str, user: &str) -> bool {
        let attempt = || -> Result<bool, WalletError> {
            let who = parse_address(user)?;
            let handle = self.handle()?;
            let outputs = self
                .client
                .read_call(&handle, method, &[DynSolValue::Address(who)])?;
            abi::as_bool(&abi::single(outputs)?)
        };
        match attempt() {
            Ok(flag) => flag,
            Err(e) => {
                tracing::debug!(error = %e, method, user, "kyc flag read failed");
                false
            }
        }
    }

    fn read_word(&self, method: &'static str, user: &str) -> Option<B256> {
        let attempt = || -> Result<B256, WalletError> {
            let who = parse_address(user)?;
            let handle = self.handle()?;
            let outputs = self
                .client
                .read_call(&handle, method, &[DynSolValue::Address(who)])?;
            abi::as_b256(&abi::single(outputs)?)
        };
        match attempt() {
            Ok(word) => Some(word),
            Err(e) => {
                tracing::debug!(error = %e, method, user, "registry word read failed");
                None
            }
        }
    }
}

fn parse_batch(users: &[&str]) -> Result<Vec<DynSolValue>, WalletError> {
    users
        .iter()
        .map(|raw| parse_address(raw).map(DynSolValue::Address))
        .collect()
}
