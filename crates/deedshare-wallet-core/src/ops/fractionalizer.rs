//! Fractionalization factory operations.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{utils::format_ether, Address, U256};

use crate::abi;
use crate::domain::{parse_address, ContractName, FractionalizationRecord, TxReceipt};
use crate::error::{require_funds, WalletError};
use crate::ports::{ClockPort, WalletTransport};
use crate::registry::ContractHandle;
use crate::session::WalletClient;

pub struct FractionalizerOps<'a, T: WalletTransport, C: ClockPort> {
    client: &'a WalletClient<T, C>,
}

impl<'a, T: WalletTransport, C: ClockPort> FractionalizerOps<'a, T, C> {
    pub(crate) fn new(client: &'a WalletClient<T, C>) -> Self {
        Self { client }
    }

    fn handle(&self) -> Result<ContractHandle, WalletError> {
        self.client.contract(ContractName::Fractionalizer)
    }

    pub fn fractionalization_data(&self, token_id: u64) -> Option<FractionalizationRecord> {
        let attempt = || -> Result<FractionalizationRecord, WalletError> {
            let handle = self.handle()?;
            let outputs = self.client.read_call(
                &handle,
                "getFractionalizationData",
                &[token_arg(token_id)],
            )?;
            let single = abi::single(outputs)?;
            let fields = abi::as_tuple(&single)?;
            if fields.len() != 5 {
                return Err(WalletError::DecodeError(format!(
                    "fractionalization tuple has {} fields, expected 5",
                    fields.len()
                )));
            }
            Ok(FractionalizationRecord {
                token_id,
                token_address: abi::as_address(&fields[0])?,
                total_supply: abi::as_u256(&fields[1])?,
                fractionalizer: abi::as_address(&fields[2])?,
                timestamp: abi::as_u64(&fields[3])?,
                is_active: abi::as_bool(&fields[4])?,
            })
        };
        match attempt() {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(error = %e, token_id, "fractionalization data read failed");
                None
            }
        }
    }

    pub fn is_fractionalized(&self, token_id: u64) -> bool {
        let attempt = || -> Result<bool, WalletError> {
            let handle = self.handle()?;
            let outputs = self.client.read_call(
                &handle,
                "isPropertyFractionalized",
                &[token_arg(token_id)],
            )?;
            abi::as_bool(&abi::single(outputs)?)
        };
        match attempt() {
            Ok(flag) => flag,
            Err(e) => {
                tracing::debug!(error = %e, token_id, "fractionalization check failed");
                false
            }
        }
    }

    pub fn property_from_token(&self, token_address: &str) -> Option<u64> {
        let attempt = || -> Result<u64, WalletError> {
            let token = parse_address(token_address)?;
            let handle = self.handle()?;
            let outputs = self.client.read_call(
                &handle,
                "getPropertyFromToken",
                &[DynSolValue::Address(token)],
            )?;
            abi::as_u64(&abi::single(outputs)?)
        };
        match attempt() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::debug!(error = %e, token_address, "reverse token lookup failed");
                None
            }
        }
    }

    /// Current fractionalization fee in base units. Hard error because the
    /// write path gates on it.
    pub fn fee_wei(&self) -> Result<U256, WalletError> {
        let handle = self.handle()?;
        let outputs = self
            .client
            .read_call(&handle, "fractionalizationFee", &[])?;
        abi::as_u256(&abi::single(outputs)?)
    }

    /// Display-formatted fee; degrades to "0" on read failure.
    pub fn fee_display(&self) -> String {
        match self.fee_wei() {
            Ok(fee) => format_ether(fee),
            Err(e) => {
                tracing::debug!(error = %e, "fee read failed");
                "0".to_owned()
            }
        }
    }

    pub fn fee_recipient(&self) -> Option<Address> {
        let attempt = || -> Result<Address, WalletError> {
            let handle = self.handle()?;
            let outputs = self.client.read_call(&handle, "feeRecipient", &[])?;
            abi::as_address(&abi::single(outputs)?)
        };
        match attempt() {
            Ok(addr) => Some(addr),
            Err(e) => {
                tracing::debug!(error = %e, "fee recipient read failed");
                None
            }
        }
    }

    /// Convert a title into a fungible supply. The fee is read fresh here,
    /// immediately before submission, and attached exactly; the balance
    /// check re-reads chain state rather than trusting the cached display
    /// value. An underfunded signer is rejected locally, before the wallet
    /// is ever asked for a signature.
    pub fn fractionalize(
        &self,
        token_id: u64,
        name: &str,
        symbol: &str,
        total_supply: U256,
    ) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        let fee = self.fee_wei()?;
        let balance = self.client.fresh_balance_wei()?;
        require_funds(balance, fee)?;
        self.client.write_call(
            &handle,
            "fractionalize",
            &[
                token_arg(token_id),
                DynSolValue::String(name.to_owned()),
                DynSolValue::String(symbol.to_owned()),
                DynSolValue::Uint(total_supply, 256),
            ],
            Some(fee),
        )
    }

    pub fn defractionalize(&self, token_id: u64) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client
            .write_call(&handle, "defractionalize", &[token_arg(token_id)], None)
    }

    pub fn emergency_defractionalize(&self, token_id: u64) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "emergencyDefractionalize",
            &[token_arg(token_id)],
            None,
        )
    }

    pub fn set_fee(&self, new_fee: U256) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "setFractionalizationFee",
            &[DynSolValue::Uint(new_fee, 256)],
            None,
        )
    }

    pub fn set_fee_recipient(&self, new_recipient: &str) -> Result<TxReceipt, WalletError> {
        let recipient = parse_address(new_recipient)?;
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "setFeeRecipient",
            &[DynSolValue::Address(recipient)],
            None,
        )
    }

    pub fn withdraw_fees(&self) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client.write_call(&handle, "withdrawFees", &[], None)
    }
}

fn token_arg(token_id: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(token_id), 256)
}
