//! Property-title registry operations, including the composite per-user
//! enumeration.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, U256};

use crate::abi;
use crate::domain::{
    parse_address, ContractName, PropertyData, PropertyKind, PropertyRecord, PropertyScan,
    TxReceipt,
};
use crate::error::WalletError;
use crate::ports::{ClockPort, WalletTransport};
use crate::registry::ContractHandle;
use crate::session::WalletClient;

pub struct TitleOps<'a, T: WalletTransport, C: ClockPort> {
    client: &'a WalletClient<T, C>,
}

impl<'a, T: WalletTransport, C: ClockPort> TitleOps<'a, T, C> {
    pub(crate) fn new(client: &'a WalletClient<T, C>) -> Self {
        Self { client }
    }

    fn handle(&self) -> Result<ContractHandle, WalletError> {
        self.client.contract(ContractName::TitleNft)
    }

    pub fn property_data(&self, token_id: u64) -> Option<PropertyData> {
        let attempt = || -> Result<PropertyData, WalletError> {
            let handle = self.handle()?;
            self.read_property_data(&handle, token_id)
        };
        match attempt() {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::debug!(error = %e, token_id, "property data read failed");
                None
            }
        }
    }

    pub fn property_owner(&self, token_id: u64) -> Option<Address> {
        self.read_optional(token_id, "getPropertyOwner", |v| abi::as_address(v))
    }

    pub fn mint_timestamp(&self, token_id: u64) -> Option<u64> {
        self.read_optional(token_id, "getMintTimestamp", |v| abi::as_u64(v))
    }

    pub fn doc_uri(&self, token_id: u64) -> Option<String> {
        self.read_optional(token_id, "getDocURI", |v| abi::as_string(v))
    }

    pub fn token_uri(&self, token_id: u64) -> Option<String> {
        self.read_optional(token_id, "tokenURI", |v| abi::as_string(v))
    }

    pub fn encrypted_metadata(&self, token_id: u64) -> Option<B256> {
        self.read_optional(token_id, "getEncryptedMetadata", |v| abi::as_b256(v))
    }

    pub fn total_supply(&self) -> Option<u64> {
        let attempt = || -> Result<u64, WalletError> {
            let handle = self.handle()?;
            let outputs = self.client.read_call(&handle, "totalSupply", &[])?;
            abi::as_u64(&abi::single(outputs)?)
        };
        match attempt() {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::debug!(error = %e, "total supply read failed");
                None
            }
        }
    }

    pub fn token_by_index(&self, index: u64) -> Option<u64> {
        self.read_optional(index, "tokenByIndex", |v| abi::as_u64(v))
    }

    pub fn balance_of(&self, owner: &str) -> Result<u64, WalletError> {
        let who = parse_address(owner)?;
        let handle = self.handle()?;
        let outputs =
            self.client
                .read_call(&handle, "balanceOf", &[DynSolValue::Address(who)])?;
        abi::as_u64(&abi::single(outputs)?)
    }

    pub fn token_of_owner_by_index(&self, owner: &str, index: u64) -> Result<u64, WalletError> {
        let who = parse_address(owner)?;
        let handle = self.handle()?;
        self.read_u64_call(
            &handle,
            "tokenOfOwnerByIndex",
            &[
                DynSolValue::Address(who),
                DynSolValue::Uint(U256::from(index), 256),
            ],
        )
    }

    /// Enumerate every title the address holds and assemble the read-only
    /// projections. A zero balance returns an empty scan without issuing a
    /// single per-token query; one failing token drops that token and leaves
    /// a warning instead of blanking the list.
    pub fn user_properties(&self, user: &str) -> PropertyScan {
        let mut scan = PropertyScan::default();

        let who = match parse_address(user) {
            Ok(who) => who,
            Err(e) => {
                scan.warnings.push(e.to_string());
                return scan;
            }
        };
        let handle = match self.handle() {
            Ok(handle) => handle,
            Err(e) => {
                scan.warnings.push(e.to_string());
                return scan;
            }
        };
        let balance = match self.read_u64_call(
            &handle,
            "balanceOf",
            &[DynSolValue::Address(who)],
        ) {
            Ok(balance) => balance,
            Err(e) => {
                tracing::debug!(error = %e, user, "title balance read failed");
                scan.warnings.push(format!("balance read failed: {e}"));
                return scan;
            }
        };

        for index in 0..balance {
            let token_id = match self.read_u64_call(
                &handle,
                "tokenOfOwnerByIndex",
                &[
                    DynSolValue::Address(who),
                    DynSolValue::Uint(U256::from(index), 256),
                ],
            ) {
                Ok(id) => id,
                Err(e) => {
                    scan.warnings.push(format!("token at index {index}: {e}"));
                    continue;
                }
            };
            match self.assemble_record(&handle, token_id) {
                Ok(record) => scan.properties.push(record),
                Err(e) => scan.warnings.push(format!("token {token_id}: {e}")),
            }
        }
        scan
    }

    pub fn mint_title(
        &self,
        to: &str,
        metadata_uri: &str,
        data: &PropertyData,
    ) -> Result<TxReceipt, WalletError> {
        let recipient = parse_address(to)?;
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "mintTitle",
            &[
                DynSolValue::Address(recipient),
                DynSolValue::String(metadata_uri.to_owned()),
                property_tuple(data),
            ],
            None,
        )
    }

    pub fn burn(&self, token_id: u64) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client
            .write_call(&handle, "burn", &[token_arg(token_id)], None)
    }

    pub fn update_metadata_uri(
        &self,
        token_id: u64,
        new_uri: &str,
    ) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "updateMetadataURI",
            &[token_arg(token_id), DynSolValue::String(new_uri.to_owned())],
            None,
        )
    }

    pub fn update_property_data(
        &self,
        token_id: u64,
        data: &PropertyData,
    ) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "updatePropertyData",
            &[token_arg(token_id), property_tuple(data)],
            None,
        )
    }

    pub fn set_encrypted_metadata(
        &self,
        token_id: u64,
        encrypted_data: B256,
    ) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client.write_call(
            &handle,
            "setEncryptedMetadata",
            &[token_arg(token_id), DynSolValue::FixedBytes(encrypted_data, 32)],
            None,
        )
    }

    pub fn verify_property(&self, token_id: u64) -> Result<TxReceipt, WalletError> {
        let handle = self.handle()?;
        self.client
            .write_call(&handle, "verifyProperty", &[token_arg(token_id)], None)
    }

    fn assemble_record(
        &self,
        handle: &ContractHandle,
        token_id: u64,
    ) -> Result<PropertyRecord, WalletError> {
        let data = self.read_property_data(handle, token_id)?;
        let owner_out =
            self.client
                .read_call(handle, "getPropertyOwner", &[token_arg(token_id)])?;
        let owner = abi::as_address(&abi::single(owner_out)?)?;
        let stamp_out =
            self.client
                .read_call(handle, "getMintTimestamp", &[token_arg(token_id)])?;
        let mint_timestamp = abi::as_u64(&abi::single(stamp_out)?)?;
        let doc_out = self
            .client
            .read_call(handle, "getDocURI", &[token_arg(token_id)])?;
        let doc_uri = abi::as_string(&abi::single(doc_out)?)?;

        Ok(PropertyRecord {
            token_id,
            owner,
            location: data.location,
            value: data.value,
            area: data.area,
            property_type: data.property_type,
            is_verified: data.is_verified,
            mint_timestamp,
            doc_uri,
            fractionalization: None,
        })
    }

    fn read_property_data(
        &self,
        handle: &ContractHandle,
        token_id: u64,
    ) -> Result<PropertyData, WalletError> {
        let outputs = self
            .client
            .read_call(handle, "getPropertyData", &[token_arg(token_id)])?;
        let single = abi::single(outputs)?;
        let fields = abi::as_tuple(&single)?;
        if fields.len() != 5 {
            return Err(WalletError::DecodeError(format!(
                "property tuple has {} fields, expected 5",
                fields.len()
            )));
        }
        Ok(PropertyData {
            location: abi::as_string(&fields[0])?,
            value: abi::as_u256(&fields[1])?,
            area: abi::as_u64(&fields[2])?,
            property_type: PropertyKind::from_label(&abi::as_string(&fields[3])?),
            is_verified: abi::as_bool(&fields[4])?,
        })
    }

    fn read_u64_call(
        &self,
        handle: &ContractHandle,
        method: &str,
        args: &[DynSolValue],
    ) -> Result<u64, WalletError> {
        let outputs = self.client.read_call(handle, method, args)?;
        abi::as_u64(&abi::single(outputs)?)
    }

    fn read_optional<V>(
        &self,
        token_id: u64,
        method: &'static str,
        extract: impl Fn(&DynSolValue) -> Result<V, WalletError>,
    ) -> Option<V> {
        let attempt = || -> Result<V, WalletError> {
            let handle = self.handle()?;
            let outputs = self.client.read_call(&handle, method, &[token_arg(token_id)])?;
            extract(&abi::single(outputs)?)
        };
        match attempt() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(error = %e, method, token_id, "title read failed");
                None
            }
        }
    }
}

fn token_arg(token_id: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(token_id), 256)
}

fn property_tuple(data: &PropertyData) -> DynSolValue {
    DynSolValue::Tuple(vec![
        DynSolValue::String(data.location.clone()),
        DynSolValue::Uint(data.value, 256),
        DynSolValue::Uint(U256::from(data.area), 256),
        DynSolValue::String(data.property_type.label().to_owned()),
        DynSolValue::Bool(data.is_verified),
    ])
}
