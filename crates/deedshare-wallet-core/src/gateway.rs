//! Uniform call surface over bound contract handles.
//!
//! This is the only place that invokes a handle. Reads return decoded
//! values without any confirmation wait; writes submit, then block until
//! the transaction is included and hand back the confirmed receipt.

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::primitives::{B256, U256};
use serde_json::{json, Value};

use crate::abi;
use crate::domain::TxReceipt;
use crate::error::WalletError;
use crate::ports::{ClockPort, WalletTransport};
use crate::registry::ContractHandle;
use crate::session::WalletClient;

impl<T: WalletTransport, C: ClockPort> WalletClient<T, C> {
    /// Execute a view call and decode its outputs. Raw provider exceptions
    /// never reach the caller; decode problems surface as `DecodeError`.
    pub fn read_call(
        &self,
        handle: &ContractHandle,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<Vec<DynSolValue>, WalletError> {
        self.ensure_current(handle)?;
        let function = abi::resolve_function(handle.interface, method)?;
        let data = function
            .abi_encode_input(args)
            .map_err(|e| WalletError::DecodeError(format!("{method}: encoding failed: {e}")))?;

        let params = json!([
            {
                "from": handle.signer,
                "to": handle.address,
                "data": format!("0x{}", alloy::hex::encode(&data)),
            },
            "latest",
        ]);
        let raw = self
            .transport
            .request("eth_call", params)
            .map_err(|e| self.normalize(e))?;

        let hex_output = raw.as_str().ok_or_else(|| {
            WalletError::DecodeError(format!("{method}: eth_call must return hex data"))
        })?;
        let bytes = alloy::hex::decode(hex_output.trim_start_matches("0x"))
            .map_err(|e| WalletError::DecodeError(format!("{method}: bad return hex: {e}")))?;
        function
            .abi_decode_output(&bytes, true)
            .map_err(|e| WalletError::DecodeError(format!("{method}: {e}")))
    }

    /// Submit a state-changing call and wait for on-chain inclusion.
    /// `value_attached` is the exact native amount to send along; fee-bearing
    /// operations read it fresh from the contract immediately before calling
    /// this.
    pub fn write_call(
        &self,
        handle: &ContractHandle,
        method: &str,
        args: &[DynSolValue],
        value_attached: Option<U256>,
    ) -> Result<TxReceipt, WalletError> {
        self.ensure_current(handle)?;
        let function = abi::resolve_function(handle.interface, method)?;
        let data = function
            .abi_encode_input(args)
            .map_err(|e| WalletError::DecodeError(format!("{method}: encoding failed: {e}")))?;

        let mut tx = json!({
            "from": handle.signer,
            "to": handle.address,
            "data": format!("0x{}", alloy::hex::encode(&data)),
        });
        if let Some(value) = value_attached {
            tx["value"] = Value::String(format!("{value:#x}"));
        }

        let raw = self
            .transport
            .request("eth_sendTransaction", json!([tx]))
            .map_err(|e| self.normalize(e))?;
        let tx_hash: B256 = raw
            .as_str()
            .ok_or_else(|| {
                WalletError::DecodeError("eth_sendTransaction must return a hash".to_owned())
            })?
            .parse()
            .map_err(|e| WalletError::DecodeError(format!("bad transaction hash: {e}")))?;

        self.await_receipt(tx_hash)
    }

    fn await_receipt(&self, tx_hash: B256) -> Result<TxReceipt, WalletError> {
        for attempt in 0..self.policy.receipt_poll_attempts {
            if attempt > 0 {
                self.clock.sleep_ms(self.policy.receipt_poll_interval_ms);
            }
            let raw = self
                .transport
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .map_err(|e| self.normalize(e))?;
            if raw.is_null() {
                continue;
            }
            let receipt = decode_receipt(&raw)?;
            if !receipt.status {
                return Err(WalletError::ContractReverted(
                    "transaction reverted on-chain".to_owned(),
                ));
            }
            return Ok(receipt);
        }
        Err(WalletError::Transport(format!(
            "transaction {tx_hash} not confirmed within the poll budget"
        )))
    }

    fn ensure_current(&self, handle: &ContractHandle) -> Result<(), WalletError> {
        if !self.registry.is_bound() {
            return Err(WalletError::NotInitialized);
        }
        if !self.registry.is_current(handle) {
            tracing::debug!(contract = %handle.name, "refusing call on stale contract handle");
            return Err(WalletError::StaleBinding);
        }
        Ok(())
    }
}

fn decode_receipt(raw: &Value) -> Result<TxReceipt, WalletError> {
    let tx_hash: B256 = receipt_field(raw, "transactionHash")?
        .parse()
        .map_err(|e| WalletError::DecodeError(format!("receipt hash: {e}")))?;
    let block_number = u64::try_from(abi::parse_quantity(receipt_field(raw, "blockNumber")?)?)
        .map_err(|_| WalletError::DecodeError("receipt block number overflows u64".to_owned()))?;
    let status = abi::parse_quantity(receipt_field(raw, "status")?)? == U256::from(1u64);
    let gas_used = abi::parse_quantity(receipt_field(raw, "gasUsed")?)?;
    Ok(TxReceipt {
        tx_hash,
        block_number,
        status,
        gas_used,
    })
}

fn receipt_field<'a>(raw: &'a Value, name: &str) -> Result<&'a str, WalletError> {
    raw.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| WalletError::DecodeError(format!("receipt is missing field '{name}'")))
}
