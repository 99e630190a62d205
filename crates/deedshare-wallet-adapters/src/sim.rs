//! Deterministic in-memory wallet and chain, the fallback transport when no
//! injected-provider bridge is configured and the double every integration
//! test drives.
//!
//! The simulation answers the same request surface a real wallet does
//! (accounts, chain id, balance, switch/add network, `eth_call`,
//! `eth_sendTransaction`, receipts) and executes calls against small
//! in-memory models of the four deployed contracts, decoding calldata with
//! the same embedded interfaces the gateway encodes with.

use std::collections::{BTreeMap, BTreeSet};

use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::json_abi::Function;
use alloy::primitives::{keccak256, Address, B256, U256};
use serde_json::{json, Value};

use deedshare_wallet_core::abi as core_abi;
use deedshare_wallet_core::{ContractName, EventClass, ProviderFailure};

/// One authorized dev account, funded by default.
pub const DEFAULT_ACCOUNT: &str = "0x1000000000000000000000000000000000000001";

const TARGET_CHAIN_ID: u64 = 43113;
const MAIN_CHAIN_ID: u64 = 43114;

#[derive(Debug, Clone)]
pub struct SimulatedWallet {
    /// Accounts `eth_accounts` reports (already authorized).
    pub authorized: Vec<Address>,
    /// Accounts granted when the user approves `eth_requestAccounts`.
    pub grantable: Vec<Address>,
    pub chain_id: u64,
    pub known_chains: BTreeSet<u64>,
    pub balances: BTreeMap<Address, U256>,
    pub reject_connect: bool,
    pub reject_transactions: bool,
    pub reject_switch: bool,
    /// Number of receipt polls answered `null` before a receipt appears.
    pub receipt_delay_polls: u32,
    pub chain: SimulatedChain,
    /// Methods seen, in order; tests assert on this.
    pub request_log: Vec<String>,
    /// Events produced by wallet-side actions, drained by the adapter.
    pub emitted: Vec<(EventClass, Value)>,
    receipts: BTreeMap<B256, Value>,
    pending_polls: BTreeMap<B256, u32>,
    next_nonce: u64,
    block_number: u64,
}

impl Default for SimulatedWallet {
    fn default() -> Self {
        let account: Address = DEFAULT_ACCOUNT
            .parse()
            .expect("valid built-in deterministic account");
        let mut balances = BTreeMap::new();
        balances.insert(account, U256::from(10u64) * U256::from(10u64).pow(U256::from(18u64)));
        Self {
            authorized: Vec::new(),
            grantable: vec![account],
            chain_id: TARGET_CHAIN_ID,
            known_chains: BTreeSet::from([TARGET_CHAIN_ID, MAIN_CHAIN_ID]),
            balances,
            reject_connect: false,
            reject_transactions: false,
            reject_switch: false,
            receipt_delay_polls: 0,
            chain: SimulatedChain::default(),
            request_log: Vec::new(),
            emitted: Vec::new(),
            receipts: BTreeMap::new(),
            pending_polls: BTreeMap::new(),
            next_nonce: 0,
            block_number: 0,
        }
    }
}

impl SimulatedWallet {
    /// Wallet that already authorizes the default account, as if the user
    /// approved a connection in an earlier session.
    pub fn pre_authorized() -> Self {
        let mut wallet = Self::default();
        wallet.authorized = wallet.grantable.clone();
        wallet
    }

    pub fn default_account() -> Address {
        DEFAULT_ACCOUNT
            .parse()
            .expect("valid built-in deterministic account")
    }

    pub fn count_requests(&self, method: &str) -> usize {
        self.request_log.iter().filter(|m| *m == method).count()
    }

    pub fn set_balance(&mut self, account: Address, wei: U256) {
        self.balances.insert(account, wei);
    }

    pub fn handle_request(&mut self, method: &str, params: &Value) -> Result<Value, ProviderFailure> {
        self.request_log.push(method.to_owned());
        match method {
            "eth_accounts" => Ok(address_array(&self.authorized)),
            "eth_requestAccounts" => {
                if self.reject_connect {
                    return Err(user_rejection());
                }
                if self.authorized.is_empty() {
                    self.authorized = self.grantable.clone();
                }
                Ok(address_array(&self.authorized))
            }
            "eth_chainId" => Ok(json!(format!("0x{:x}", self.chain_id))),
            "eth_getBalance" => {
                let account = param_address(params, 0)?;
                let balance = self.balances.get(&account).copied().unwrap_or(U256::ZERO);
                Ok(json!(format!("{balance:#x}")))
            }
            "wallet_switchEthereumChain" => self.switch_chain(params),
            "wallet_addEthereumChain" => self.add_chain(params),
            "eth_call" => self.eth_call(params),
            "eth_sendTransaction" => self.send_transaction(params),
            "eth_getTransactionReceipt" => self.transaction_receipt(params),
            other => Err(ProviderFailure::new(
                -32601,
                format!("method not supported: {other}"),
            )),
        }
    }

    fn switch_chain(&mut self, params: &Value) -> Result<Value, ProviderFailure> {
        let requested = params
            .get(0)
            .and_then(|p| p.get("chainId"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid_params("wallet_switchEthereumChain needs chainId"))?;
        let chain_id = parse_hex_u64(requested)
            .ok_or_else(|| invalid_params("chainId must be a hex string"))?;
        if self.reject_switch {
            return Err(user_rejection());
        }
        if !self.known_chains.contains(&chain_id) {
            return Err(ProviderFailure::new(
                4902,
                format!("Unrecognized chain ID {requested}"),
            ));
        }
        self.set_chain(chain_id);
        Ok(Value::Null)
    }

    fn add_chain(&mut self, params: &Value) -> Result<Value, ProviderFailure> {
        let payload = params
            .get(0)
            .ok_or_else(|| invalid_params("wallet_addEthereumChain needs a network payload"))?;
        for field in ["chainId", "chainName", "rpcUrls", "nativeCurrency"] {
            if payload.get(field).is_none() {
                return Err(invalid_params(&format!("network payload missing {field}")));
            }
        }
        let chain_id = payload
            .get("chainId")
            .and_then(|v| v.as_str())
            .and_then(parse_hex_u64)
            .ok_or_else(|| invalid_params("chainId must be a hex string"))?;
        self.known_chains.insert(chain_id);
        self.set_chain(chain_id);
        Ok(Value::Null)
    }

    fn set_chain(&mut self, chain_id: u64) {
        if self.chain_id != chain_id {
            self.chain_id = chain_id;
            self.emitted.push((
                EventClass::ChainChanged,
                json!(format!("0x{chain_id:x}")),
            ));
        }
    }

    fn eth_call(&mut self, params: &Value) -> Result<Value, ProviderFailure> {
        let call = params
            .get(0)
            .ok_or_else(|| invalid_params("eth_call needs a call object"))?;
        let to = object_address(call, "to")?;
        let data = object_bytes(call, "data")?;
        let name = self
            .chain
            .contract_at(to)
            .ok_or_else(|| revert_failure("call to unknown contract"))?;
        match self.chain.call(name, &data) {
            Ok(output) => Ok(json!(format!("0x{}", alloy::hex::encode(output)))),
            Err(reason) => Err(revert_failure(&reason)),
        }
    }

    fn send_transaction(&mut self, params: &Value) -> Result<Value, ProviderFailure> {
        if self.reject_transactions {
            return Err(user_rejection());
        }
        let tx = params
            .get(0)
            .ok_or_else(|| invalid_params("eth_sendTransaction needs a transaction object"))?;
        let from = object_address(tx, "from")?;
        if !self.authorized.contains(&from) {
            return Err(ProviderFailure::new(-32000, "unknown account"));
        }
        let to = object_address(tx, "to")?;
        let value = match tx.get("value").and_then(|v| v.as_str()) {
            Some(raw) => U256::from_str_radix(raw.trim_start_matches("0x"), 16)
                .map_err(|_| invalid_params("bad transaction value"))?,
            None => U256::ZERO,
        };
        let balance = self.balances.get(&from).copied().unwrap_or(U256::ZERO);
        if balance < value {
            return Err(ProviderFailure::new(
                -32000,
                "insufficient funds for gas * price + value",
            ));
        }
        let data = object_bytes(tx, "data")?;
        let name = self
            .chain
            .contract_at(to)
            .ok_or_else(|| revert_failure("call to unknown contract"))?;

        // Wallets estimate before prompting; a revert surfaces here, not as
        // a mined failure.
        self.chain
            .execute(name, from, value, &data)
            .map_err(|reason| revert_failure(&reason))?;

        if value > U256::ZERO {
            self.balances.insert(from, balance - value);
        }

        self.next_nonce += 1;
        self.block_number += 1;
        let mut seed = Vec::with_capacity(8 + data.len());
        seed.extend_from_slice(&self.next_nonce.to_be_bytes());
        seed.extend_from_slice(&data);
        let tx_hash = keccak256(seed);
        let receipt = json!({
            "transactionHash": tx_hash.to_string(),
            "blockNumber": format!("0x{:x}", self.block_number),
            "status": "0x1",
            "gasUsed": "0x5208",
        });
        if self.receipt_delay_polls > 0 {
            self.pending_polls.insert(tx_hash, self.receipt_delay_polls);
        }
        self.receipts.insert(tx_hash, receipt);
        Ok(json!(tx_hash.to_string()))
    }

    fn transaction_receipt(&mut self, params: &Value) -> Result<Value, ProviderFailure> {
        let hash: B256 = params
            .get(0)
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| invalid_params("eth_getTransactionReceipt needs a hash"))?;
        if let Some(remaining) = self.pending_polls.get_mut(&hash) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(Value::Null);
            }
        }
        Ok(self.receipts.get(&hash).cloned().unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedChain {
    pub deployment: BTreeMap<ContractName, Address>,
    pub now_timestamp: u64,
    pub paused: BTreeSet<ContractName>,
    // compliance registry
    pub kyc: BTreeMap<Address, KycState>,
    pub encrypted_kyc: BTreeMap<Address, B256>,
    pub commitments: BTreeMap<Address, B256>,
    // title registry
    pub properties: BTreeMap<u64, SimProperty>,
    pub next_token_id: u64,
    // fractionalizer
    pub fractionalizations: BTreeMap<u64, SimFraction>,
    pub fractionalization_fee: U256,
    pub fee_recipient: Address,
    // rent pool
    pub epochs: BTreeMap<u64, SimEpoch>,
    pub pool_owner: Address,
    // role grants, keyed per contract
    pub roles: BTreeMap<(ContractName, B256), BTreeSet<Address>>,
    // fault injection for fail-closed paths
    pub fail_owner_read: bool,
    pub fail_role_reads: bool,
    pub fail_property_data: BTreeSet<u64>,
}

#[derive(Debug, Clone, Copy)]
pub struct KycState {
    pub status: bool,
    pub timestamp: u64,
    pub expiry: u64,
}

#[derive(Debug, Clone)]
pub struct SimProperty {
    pub owner: Address,
    pub location: String,
    pub value: U256,
    pub area: u64,
    pub kind: String,
    pub verified: bool,
    pub minted_at: u64,
    pub doc_uri: String,
    pub metadata_uri: String,
    pub encrypted: B256,
}

#[derive(Debug, Clone)]
pub struct SimFraction {
    pub token_address: Address,
    pub total_supply: U256,
    pub fractionalizer: Address,
    pub timestamp: u64,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SimEpoch {
    pub total_deposits: U256,
    pub root: B256,
    pub claimed: BTreeSet<Address>,
    pub encrypted: BTreeMap<Address, B256>,
}

impl Default for SimulatedChain {
    fn default() -> Self {
        let deployment = crate::config::fuji_deployment()
            .contracts
            .into_iter()
            .map(|(name, raw)| {
                (
                    name,
                    raw.parse().expect("built-in deployment address is valid"),
                )
            })
            .collect();
        Self {
            deployment,
            now_timestamp: 1_750_000_000,
            paused: BTreeSet::new(),
            kyc: BTreeMap::new(),
            encrypted_kyc: BTreeMap::new(),
            commitments: BTreeMap::new(),
            properties: BTreeMap::new(),
            next_token_id: 1,
            fractionalizations: BTreeMap::new(),
            fractionalization_fee: U256::from(10u64).pow(U256::from(17u64)),
            fee_recipient: SimulatedWallet::default_account(),
            epochs: BTreeMap::new(),
            pool_owner: SimulatedWallet::default_account(),
            roles: BTreeMap::new(),
            fail_owner_read: false,
            fail_role_reads: false,
            fail_property_data: BTreeSet::new(),
        }
    }
}

impl SimulatedChain {
    pub fn contract_at(&self, address: Address) -> Option<ContractName> {
        self.deployment
            .iter()
            .find(|(_, &deployed)| deployed == address)
            .map(|(&name, _)| name)
    }

    pub fn grant_role(&mut self, contract: ContractName, role: B256, account: Address) {
        self.roles.entry((contract, role)).or_default().insert(account);
    }

    /// Seed a property directly, bypassing the mint call path.
    pub fn seed_property(&mut self, owner: Address, location: &str, kind: &str, value: U256) -> u64 {
        let token_id = self.next_token_id;
        self.next_token_id += 1;
        self.properties.insert(
            token_id,
            SimProperty {
                owner,
                location: location.to_owned(),
                value,
                area: 120,
                kind: kind.to_owned(),
                verified: false,
                minted_at: self.now_timestamp,
                doc_uri: format!("ipfs://deed-doc/{token_id}"),
                metadata_uri: format!("ipfs://deed-meta/{token_id}"),
                encrypted: B256::ZERO,
            },
        );
        token_id
    }

    /// Execute a view call against the contract models.
    pub fn call(&self, name: ContractName, calldata: &[u8]) -> Result<Vec<u8>, String> {
        let (function, args) = decode_call(name, calldata)?;
        match name {
            ContractName::ComplianceRegistry => self.call_compliance(function, &args),
            ContractName::TitleNft => self.call_title(function, &args),
            ContractName::Fractionalizer => self.call_fractionalizer(function, &args),
            ContractName::RentPoolMerkle => self.call_rent_pool(function, &args),
        }
    }

    /// Execute a state-changing call against the contract models.
    pub fn execute(
        &mut self,
        name: ContractName,
        from: Address,
        msg_value: U256,
        calldata: &[u8],
    ) -> Result<(), String> {
        let (function, args) = decode_call(name, calldata)?;
        let method = function.name.clone();
        if self.paused.contains(&name) && method != "unpause" {
            return Err("Pausable: paused".to_owned());
        }
        match name {
            ContractName::ComplianceRegistry => self.execute_compliance(&method, from, &args),
            ContractName::TitleNft => self.execute_title(&method, from, &args),
            ContractName::Fractionalizer => {
                self.execute_fractionalizer(&method, from, msg_value, &args)
            }
            ContractName::RentPoolMerkle => self.execute_rent_pool(&method, from, &args),
        }
    }

    fn call_compliance(&self, function: &Function, args: &[DynSolValue]) -> Result<Vec<u8>, String> {
        match function.name.as_str() {
            "isKYCed" => {
                let user = arg_address(args, 0)?;
                let known = self.kyc.get(&user).map(|k| k.status).unwrap_or(false);
                Ok(encode_outputs(&[DynSolValue::Bool(known)]))
            }
            "isKYCValid" => {
                let user = arg_address(args, 0)?;
                Ok(encode_outputs(&[DynSolValue::Bool(self.kyc_valid(user))]))
            }
            "getKYCInfo" => {
                let user = arg_address(args, 0)?;
                let entry = self.kyc.get(&user).copied().unwrap_or(KycState {
                    status: false,
                    timestamp: 0,
                    expiry: 0,
                });
                Ok(encode_outputs(&[
                    DynSolValue::Bool(entry.status),
                    uint(entry.timestamp),
                    uint(entry.expiry),
                    DynSolValue::Bool(self.kyc_valid(user)),
                ]))
            }
            "getEncryptedKYCData" => {
                let user = arg_address(args, 0)?;
                let word = self.encrypted_kyc.get(&user).copied().unwrap_or(B256::ZERO);
                Ok(encode_outputs(&[DynSolValue::FixedBytes(word, 32)]))
            }
            "commitmentHashes" => {
                let user = arg_address(args, 0)?;
                let word = self.commitments.get(&user).copied().unwrap_or(B256::ZERO);
                Ok(encode_outputs(&[DynSolValue::FixedBytes(word, 32)]))
            }
            "hasRole" => self.role_membership(ContractName::ComplianceRegistry, args),
            other => Err(format!("ComplianceRegistry: unknown view {other}")),
        }
    }

    fn execute_compliance(
        &mut self,
        method: &str,
        from: Address,
        args: &[DynSolValue],
    ) -> Result<(), String> {
        match method {
            "setKYC" => {
                let user = arg_address(args, 0)?;
                let status = arg_bool(args, 1)?;
                let expiry = arg_u64(args, 2)?;
                let encrypted = arg_b256(args, 3)?;
                self.kyc.insert(
                    user,
                    KycState {
                        status,
                        timestamp: self.now_timestamp,
                        expiry,
                    },
                );
                if encrypted != B256::ZERO {
                    self.encrypted_kyc.insert(user, encrypted);
                }
                Ok(())
            }
            "batchSetKYC" => {
                let users = arg_address_array(args, 0)?;
                let status = arg_bool(args, 1)?;
                let expiry = arg_u64(args, 2)?;
                for user in users {
                    self.kyc.insert(
                        user,
                        KycState {
                            status,
                            timestamp: self.now_timestamp,
                            expiry,
                        },
                    );
                }
                Ok(())
            }
            "setEncryptedKYCData" => {
                let user = arg_address(args, 0)?;
                let encrypted = arg_b256(args, 1)?;
                self.encrypted_kyc.insert(user, encrypted);
                Ok(())
            }
            "setCommitment" => {
                let commitment = arg_b256(args, 0)?;
                self.commitments.insert(from, commitment);
                Ok(())
            }
            "revokeKYC" => {
                let user = arg_address(args, 0)?;
                self.kyc.remove(&user);
                Ok(())
            }
            "batchRevokeKYC" => {
                let users = arg_address_array(args, 0)?;
                for user in users {
                    self.kyc.remove(&user);
                }
                Ok(())
            }
            "pause" => self.set_paused(ContractName::ComplianceRegistry, true),
            "unpause" => self.set_paused(ContractName::ComplianceRegistry, false),
            "grantRole" => self.change_role(ContractName::ComplianceRegistry, args, true),
            "revokeRole" => self.change_role(ContractName::ComplianceRegistry, args, false),
            other => Err(format!("ComplianceRegistry: unknown method {other}")),
        }
    }

    fn call_title(&self, function: &Function, args: &[DynSolValue]) -> Result<Vec<u8>, String> {
        match function.name.as_str() {
            "ownerOf" | "getPropertyOwner" => {
                let property = self.property(arg_u64(args, 0)?)?;
                Ok(encode_outputs(&[DynSolValue::Address(property.owner)]))
            }
            "tokenURI" => {
                let property = self.property(arg_u64(args, 0)?)?;
                Ok(encode_outputs(&[DynSolValue::String(
                    property.metadata_uri.clone(),
                )]))
            }
            "getPropertyData" => {
                let token_id = arg_u64(args, 0)?;
                if self.fail_property_data.contains(&token_id) {
                    return Err("TitleNFT: data unavailable".to_owned());
                }
                let property = self.property(token_id)?;
                Ok(encode_outputs(&[DynSolValue::Tuple(vec![
                    DynSolValue::String(property.location.clone()),
                    DynSolValue::Uint(property.value, 256),
                    uint(property.area),
                    DynSolValue::String(property.kind.clone()),
                    DynSolValue::Bool(property.verified),
                ])]))
            }
            "getMintTimestamp" => {
                let property = self.property(arg_u64(args, 0)?)?;
                Ok(encode_outputs(&[uint(property.minted_at)]))
            }
            "getDocURI" => {
                let property = self.property(arg_u64(args, 0)?)?;
                Ok(encode_outputs(&[DynSolValue::String(
                    property.doc_uri.clone(),
                )]))
            }
            "getEncryptedMetadata" => {
                let property = self.property(arg_u64(args, 0)?)?;
                Ok(encode_outputs(&[DynSolValue::FixedBytes(
                    property.encrypted,
                    32,
                )]))
            }
            "balanceOf" => {
                let owner = arg_address(args, 0)?;
                let count = self.owned_tokens(owner).len() as u64;
                Ok(encode_outputs(&[uint(count)]))
            }
            "tokenOfOwnerByIndex" => {
                let owner = arg_address(args, 0)?;
                let index = arg_u64(args, 1)? as usize;
                let owned = self.owned_tokens(owner);
                let token_id = owned
                    .get(index)
                    .copied()
                    .ok_or_else(|| "TitleNFT: owner index out of bounds".to_owned())?;
                Ok(encode_outputs(&[uint(token_id)]))
            }
            "totalSupply" => Ok(encode_outputs(&[uint(self.properties.len() as u64)])),
            "tokenByIndex" => {
                let index = arg_u64(args, 0)? as usize;
                let token_id = self
                    .properties
                    .keys()
                    .nth(index)
                    .copied()
                    .ok_or_else(|| "TitleNFT: global index out of bounds".to_owned())?;
                Ok(encode_outputs(&[uint(token_id)]))
            }
            "hasRole" => self.role_membership(ContractName::TitleNft, args),
            other => Err(format!("TitleNFT: unknown view {other}")),
        }
    }

    fn execute_title(
        &mut self,
        method: &str,
        from: Address,
        args: &[DynSolValue],
    ) -> Result<(), String> {
        match method {
            "mintTitle" => {
                let to = arg_address(args, 0)?;
                let metadata_uri = arg_string(args, 1)?;
                let tuple = arg_tuple(args, 2)?;
                let token_id = self.next_token_id;
                self.next_token_id += 1;
                self.properties.insert(
                    token_id,
                    SimProperty {
                        owner: to,
                        location: arg_string(tuple, 0)?,
                        value: arg_u256(tuple, 1)?,
                        area: arg_u64(tuple, 2)?,
                        kind: arg_string(tuple, 3)?,
                        verified: arg_bool(tuple, 4)?,
                        minted_at: self.now_timestamp,
                        doc_uri: metadata_uri.clone(),
                        metadata_uri,
                        encrypted: B256::ZERO,
                    },
                );
                Ok(())
            }
            "burn" => {
                let token_id = arg_u64(args, 0)?;
                let property = self.property(token_id)?;
                if property.owner != from {
                    return Err("TitleNFT: caller is not token owner".to_owned());
                }
                self.properties.remove(&token_id);
                self.fractionalizations.remove(&token_id);
                Ok(())
            }
            "updateMetadataURI" => {
                let token_id = arg_u64(args, 0)?;
                let new_uri = arg_string(args, 1)?;
                self.property_mut(token_id)?.metadata_uri = new_uri;
                Ok(())
            }
            "setEncryptedMetadata" => {
                let token_id = arg_u64(args, 0)?;
                let encrypted = arg_b256(args, 1)?;
                self.property_mut(token_id)?.encrypted = encrypted;
                Ok(())
            }
            "updatePropertyData" => {
                let token_id = arg_u64(args, 0)?;
                let tuple = arg_tuple(args, 1)?.to_vec();
                let property = self.property_mut(token_id)?;
                property.location = arg_string(&tuple, 0)?;
                property.value = arg_u256(&tuple, 1)?;
                property.area = arg_u64(&tuple, 2)?;
                property.kind = arg_string(&tuple, 3)?;
                property.verified = arg_bool(&tuple, 4)?;
                Ok(())
            }
            "verifyProperty" => {
                let token_id = arg_u64(args, 0)?;
                self.property_mut(token_id)?.verified = true;
                Ok(())
            }
            "pause" => self.set_paused(ContractName::TitleNft, true),
            "unpause" => self.set_paused(ContractName::TitleNft, false),
            "grantRole" => self.change_role(ContractName::TitleNft, args, true),
            "revokeRole" => self.change_role(ContractName::TitleNft, args, false),
            other => Err(format!("TitleNFT: unknown method {other}")),
        }
    }

    fn call_fractionalizer(
        &self,
        function: &Function,
        args: &[DynSolValue],
    ) -> Result<Vec<u8>, String> {
        match function.name.as_str() {
            "getFractionalizationData" => {
                let token_id = arg_u64(args, 0)?;
                let record = self.fractionalizations.get(&token_id);
                let (token_address, total_supply, fractionalizer, timestamp, active) = match record
                {
                    Some(f) => (
                        f.token_address,
                        f.total_supply,
                        f.fractionalizer,
                        f.timestamp,
                        f.active,
                    ),
                    None => (Address::ZERO, U256::ZERO, Address::ZERO, 0, false),
                };
                Ok(encode_outputs(&[DynSolValue::Tuple(vec![
                    DynSolValue::Address(token_address),
                    DynSolValue::Uint(total_supply, 256),
                    DynSolValue::Address(fractionalizer),
                    uint(timestamp),
                    DynSolValue::Bool(active),
                ])]))
            }
            "isPropertyFractionalized" => {
                let token_id = arg_u64(args, 0)?;
                let active = self
                    .fractionalizations
                    .get(&token_id)
                    .map(|f| f.active)
                    .unwrap_or(false);
                Ok(encode_outputs(&[DynSolValue::Bool(active)]))
            }
            "getPropertyFromToken" => {
                let token = arg_address(args, 0)?;
                let token_id = self
                    .fractionalizations
                    .iter()
                    .find(|(_, f)| f.token_address == token)
                    .map(|(&id, _)| id)
                    .ok_or_else(|| "Fractionalizer: unknown token".to_owned())?;
                Ok(encode_outputs(&[uint(token_id)]))
            }
            "fractionalizationFee" => Ok(encode_outputs(&[DynSolValue::Uint(
                self.fractionalization_fee,
                256,
            )])),
            "feeRecipient" => Ok(encode_outputs(&[DynSolValue::Address(self.fee_recipient)])),
            "title" => Ok(encode_outputs(&[DynSolValue::Address(
                self.deployment[&ContractName::TitleNft],
            )])),
            "registry" => Ok(encode_outputs(&[DynSolValue::Address(
                self.deployment[&ContractName::ComplianceRegistry],
            )])),
            "hasRole" => self.role_membership(ContractName::Fractionalizer, args),
            other => Err(format!("Fractionalizer: unknown view {other}")),
        }
    }

    fn execute_fractionalizer(
        &mut self,
        method: &str,
        from: Address,
        msg_value: U256,
        args: &[DynSolValue],
    ) -> Result<(), String> {
        match method {
            "fractionalize" => {
                let token_id = arg_u64(args, 0)?;
                let total_supply = arg_u256(args, 3)?;
                if msg_value != self.fractionalization_fee {
                    return Err("Fractionalizer: incorrect fee".to_owned());
                }
                let property = self.property(token_id)?;
                if property.owner != from {
                    return Err("Fractionalizer: caller is not token owner".to_owned());
                }
                if self
                    .fractionalizations
                    .get(&token_id)
                    .map(|f| f.active)
                    .unwrap_or(false)
                {
                    return Err("Fractionalizer: already fractionalized".to_owned());
                }
                let token_address =
                    Address::from_slice(&keccak256(token_id.to_be_bytes())[12..]);
                self.fractionalizations.insert(
                    token_id,
                    SimFraction {
                        token_address,
                        total_supply,
                        fractionalizer: from,
                        timestamp: self.now_timestamp,
                        active: true,
                    },
                );
                Ok(())
            }
            "defractionalize" => {
                let token_id = arg_u64(args, 0)?;
                let fraction = self
                    .fractionalizations
                    .get_mut(&token_id)
                    .filter(|f| f.active)
                    .ok_or_else(|| "Fractionalizer: not fractionalized".to_owned())?;
                if fraction.fractionalizer != from {
                    return Err("Fractionalizer: caller did not fractionalize".to_owned());
                }
                fraction.active = false;
                Ok(())
            }
            "emergencyDefractionalize" => {
                let token_id = arg_u64(args, 0)?;
                let fraction = self
                    .fractionalizations
                    .get_mut(&token_id)
                    .filter(|f| f.active)
                    .ok_or_else(|| "Fractionalizer: not fractionalized".to_owned())?;
                fraction.active = false;
                Ok(())
            }
            "setFractionalizationFee" => {
                self.fractionalization_fee = arg_u256(args, 0)?;
                Ok(())
            }
            "setFeeRecipient" => {
                self.fee_recipient = arg_address(args, 0)?;
                Ok(())
            }
            "withdrawFees" => Ok(()),
            "pause" => self.set_paused(ContractName::Fractionalizer, true),
            "unpause" => self.set_paused(ContractName::Fractionalizer, false),
            "grantRole" => self.change_role(ContractName::Fractionalizer, args, true),
            "revokeRole" => self.change_role(ContractName::Fractionalizer, args, false),
            other => Err(format!("Fractionalizer: unknown method {other}")),
        }
    }

    fn call_rent_pool(&self, function: &Function, args: &[DynSolValue]) -> Result<Vec<u8>, String> {
        match function.name.as_str() {
            "getEpochTotalDeposits" => {
                let epoch = self.epoch(arg_u64(args, 0)?);
                Ok(encode_outputs(&[DynSolValue::Uint(
                    epoch.total_deposits,
                    256,
                )]))
            }
            "isClaimed" => {
                let epoch = self.epoch(arg_u64(args, 0)?);
                let user = arg_address(args, 1)?;
                Ok(encode_outputs(&[DynSolValue::Bool(
                    epoch.claimed.contains(&user),
                )]))
            }
            "epochRoot" => {
                let epoch = self.epoch(arg_u64(args, 0)?);
                Ok(encode_outputs(&[DynSolValue::FixedBytes(epoch.root, 32)]))
            }
            "getEncryptedAmount" => {
                let epoch = self.epoch(arg_u64(args, 0)?);
                let user = arg_address(args, 1)?;
                let word = epoch.encrypted.get(&user).copied().unwrap_or(B256::ZERO);
                Ok(encode_outputs(&[DynSolValue::FixedBytes(word, 32)]))
            }
            "stable" => Ok(encode_outputs(&[DynSolValue::Address(Address::ZERO)])),
            "owner" => {
                if self.fail_owner_read {
                    return Err("RentPool: owner unavailable".to_owned());
                }
                Ok(encode_outputs(&[DynSolValue::Address(self.pool_owner)]))
            }
            other => Err(format!("RentPool: unknown view {other}")),
        }
    }

    fn execute_rent_pool(
        &mut self,
        method: &str,
        from: Address,
        args: &[DynSolValue],
    ) -> Result<(), String> {
        match method {
            "depositRent" => {
                let epoch_id = arg_u64(args, 0)?;
                let amount = arg_u256(args, 1)?;
                let epoch = self.epochs.entry(epoch_id).or_default();
                epoch.total_deposits += amount;
                Ok(())
            }
            "setEpochRoot" => {
                if from != self.pool_owner {
                    return Err("Ownable: caller is not the owner".to_owned());
                }
                let epoch_id = arg_u64(args, 0)?;
                let root = arg_b256(args, 1)?;
                self.epochs.entry(epoch_id).or_default().root = root;
                Ok(())
            }
            "claim" => {
                let epoch_id = arg_u64(args, 0)?;
                let amount = arg_u256(args, 1)?;
                let proof = arg_b256_array(args, 2)?;
                let epoch = self.epochs.entry(epoch_id).or_default();
                if epoch.claimed.contains(&from) {
                    return Err("RentPool: already claimed".to_owned());
                }
                let mut node = merkle_leaf(from, amount);
                for sibling in proof {
                    node = merkle_parent(node, sibling);
                }
                if node != epoch.root {
                    return Err("RentPool: invalid proof".to_owned());
                }
                epoch.claimed.insert(from);
                Ok(())
            }
            "setEncryptedAmount" => {
                let epoch_id = arg_u64(args, 0)?;
                let encrypted = arg_b256(args, 1)?;
                self.epochs
                    .entry(epoch_id)
                    .or_default()
                    .encrypted
                    .insert(from, encrypted);
                Ok(())
            }
            "emergencyWithdraw" => {
                if from != self.pool_owner {
                    return Err("Ownable: caller is not the owner".to_owned());
                }
                Ok(())
            }
            other => Err(format!("RentPool: unknown method {other}")),
        }
    }

    fn kyc_valid(&self, user: Address) -> bool {
        self.kyc
            .get(&user)
            .map(|k| k.status && k.expiry > self.now_timestamp)
            .unwrap_or(false)
    }

    fn property(&self, token_id: u64) -> Result<&SimProperty, String> {
        self.properties
            .get(&token_id)
            .ok_or_else(|| "TitleNFT: nonexistent token".to_owned())
    }

    fn property_mut(&mut self, token_id: u64) -> Result<&mut SimProperty, String> {
        self.properties
            .get_mut(&token_id)
            .ok_or_else(|| "TitleNFT: nonexistent token".to_owned())
    }

    fn owned_tokens(&self, owner: Address) -> Vec<u64> {
        self.properties
            .iter()
            .filter(|(_, p)| p.owner == owner)
            .map(|(&id, _)| id)
            .collect()
    }

    fn epoch(&self, epoch_id: u64) -> SimEpoch {
        self.epochs.get(&epoch_id).cloned().unwrap_or_default()
    }

    fn role_membership(
        &self,
        contract: ContractName,
        args: &[DynSolValue],
    ) -> Result<Vec<u8>, String> {
        if self.fail_role_reads {
            return Err("AccessControl: role data unavailable".to_owned());
        }
        let role = arg_b256(args, 0)?;
        let account = arg_address(args, 1)?;
        let held = self
            .roles
            .get(&(contract, role))
            .map(|set| set.contains(&account))
            .unwrap_or(false);
        Ok(encode_outputs(&[DynSolValue::Bool(held)]))
    }

    fn change_role(
        &mut self,
        contract: ContractName,
        args: &[DynSolValue],
        grant: bool,
    ) -> Result<(), String> {
        let role = arg_b256(args, 0)?;
        let account = arg_address(args, 1)?;
        let members = self.roles.entry((contract, role)).or_default();
        if grant {
            members.insert(account);
        } else {
            members.remove(&account);
        }
        Ok(())
    }

    fn set_paused(&mut self, contract: ContractName, paused: bool) -> Result<(), String> {
        if paused {
            if !self.paused.insert(contract) {
                return Err("Pausable: paused".to_owned());
            }
        } else if !self.paused.remove(&contract) {
            return Err("Pausable: not paused".to_owned());
        }
        Ok(())
    }
}

/// Leaf hash of one entitlement, matching the pool contract's scheme:
/// `keccak256(abi.encodePacked(account, amount))`.
pub fn merkle_leaf(account: Address, amount: U256) -> B256 {
    let mut packed = Vec::with_capacity(20 + 32);
    packed.extend_from_slice(account.as_slice());
    packed.extend_from_slice(&amount.to_be_bytes::<32>());
    keccak256(packed)
}

/// Sorted-pair parent hash, the usual OpenZeppelin MerkleProof ordering.
pub fn merkle_parent(a: B256, b: B256) -> B256 {
    let mut packed = Vec::with_capacity(64);
    if a <= b {
        packed.extend_from_slice(a.as_slice());
        packed.extend_from_slice(b.as_slice());
    } else {
        packed.extend_from_slice(b.as_slice());
        packed.extend_from_slice(a.as_slice());
    }
    keccak256(packed)
}

fn decode_call(
    name: ContractName,
    calldata: &[u8],
) -> Result<(&'static Function, Vec<DynSolValue>), String> {
    if calldata.len() < 4 {
        return Err("calldata too short".to_owned());
    }
    let abi = core_abi::interface(name);
    let function = abi
        .functions()
        .find(|f| f.selector().as_slice() == &calldata[0..4])
        .ok_or_else(|| format!("{name}: unknown selector"))?;
    let args = function
        .abi_decode_input(&calldata[4..], true)
        .map_err(|e| format!("{name}.{}: argument decode failed: {e}", function.name))?;
    Ok((function, args))
}

fn encode_outputs(values: &[DynSolValue]) -> Vec<u8> {
    DynSolValue::Tuple(values.to_vec()).abi_encode_params()
}

fn uint(value: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(value), 256)
}

fn arg_at<'a>(args: &'a [DynSolValue], index: usize) -> Result<&'a DynSolValue, String> {
    args.get(index)
        .ok_or_else(|| format!("missing argument {index}"))
}

fn arg_address(args: &[DynSolValue], index: usize) -> Result<Address, String> {
    match arg_at(args, index)? {
        DynSolValue::Address(a) => Ok(*a),
        _ => Err(format!("argument {index} is not an address")),
    }
}

fn arg_bool(args: &[DynSolValue], index: usize) -> Result<bool, String> {
    match arg_at(args, index)? {
        DynSolValue::Bool(b) => Ok(*b),
        _ => Err(format!("argument {index} is not a bool")),
    }
}

fn arg_u256(args: &[DynSolValue], index: usize) -> Result<U256, String> {
    match arg_at(args, index)? {
        DynSolValue::Uint(v, _) => Ok(*v),
        _ => Err(format!("argument {index} is not a uint")),
    }
}

fn arg_u64(args: &[DynSolValue], index: usize) -> Result<u64, String> {
    u64::try_from(arg_u256(args, index)?)
        .map_err(|_| format!("argument {index} does not fit in u64"))
}

fn arg_b256(args: &[DynSolValue], index: usize) -> Result<B256, String> {
    match arg_at(args, index)? {
        DynSolValue::FixedBytes(word, 32) => Ok(*word),
        _ => Err(format!("argument {index} is not bytes32")),
    }
}

fn arg_string(args: &[DynSolValue], index: usize) -> Result<String, String> {
    match arg_at(args, index)? {
        DynSolValue::String(s) => Ok(s.clone()),
        _ => Err(format!("argument {index} is not a string")),
    }
}

fn arg_tuple<'a>(args: &'a [DynSolValue], index: usize) -> Result<&'a [DynSolValue], String> {
    match arg_at(args, index)? {
        DynSolValue::Tuple(items) => Ok(items),
        _ => Err(format!("argument {index} is not a tuple")),
    }
}

fn arg_address_array(args: &[DynSolValue], index: usize) -> Result<Vec<Address>, String> {
    match arg_at(args, index)? {
        DynSolValue::Array(items) => items
            .iter()
            .map(|item| match item {
                DynSolValue::Address(a) => Ok(*a),
                _ => Err("array entry is not an address".to_owned()),
            })
            .collect(),
        _ => Err(format!("argument {index} is not an array")),
    }
}

fn arg_b256_array(args: &[DynSolValue], index: usize) -> Result<Vec<B256>, String> {
    match arg_at(args, index)? {
        DynSolValue::Array(items) => items
            .iter()
            .map(|item| match item {
                DynSolValue::FixedBytes(word, 32) => Ok(*word),
                _ => Err("array entry is not bytes32".to_owned()),
            })
            .collect(),
        _ => Err(format!("argument {index} is not an array")),
    }
}

fn address_array(accounts: &[Address]) -> Value {
    json!(accounts.iter().map(|a| a.to_string()).collect::<Vec<_>>())
}

fn param_address(params: &Value, index: usize) -> Result<Address, ProviderFailure> {
    params
        .get(index)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid_params("expected an address parameter"))
}

fn object_address(object: &Value, field: &str) -> Result<Address, ProviderFailure> {
    object
        .get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid_params(&format!("transaction field '{field}' must be an address")))
}

fn object_bytes(object: &Value, field: &str) -> Result<Vec<u8>, ProviderFailure> {
    let raw = object
        .get(field)
        .and_then(|v| v.as_str())
        .unwrap_or("0x");
    alloy::hex::decode(raw.trim_start_matches("0x"))
        .map_err(|_| invalid_params(&format!("transaction field '{field}' must be hex data")))
}

fn parse_hex_u64(raw: &str) -> Option<u64> {
    u64::from_str_radix(raw.trim_start_matches("0x").trim_start_matches("0X"), 16).ok()
}

fn user_rejection() -> ProviderFailure {
    ProviderFailure::new(4001, "User rejected the request")
}

fn invalid_params(message: &str) -> ProviderFailure {
    ProviderFailure::new(-32602, message.to_owned())
}

fn revert_failure(reason: &str) -> ProviderFailure {
    ProviderFailure::new(3, format!("execution reverted: {reason}"))
        .with_data(json!(core_abi::encode_revert_reason(reason)))
}
