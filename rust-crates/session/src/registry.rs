use crate::error::{
    Error,
    Result,
};
use alloy::primitives::{
    Address,
    TxHash,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::HashMap;
use tracing::warn;

pub const ETHEREUM: &str = "ethereum";
pub const SEPOLIA: &str = "sepolia";
pub const POLYGON: &str = "polygon";
pub const MUMBAI: &str = "mumbai";
pub const LOCAL: &str = "local";

pub const LOCAL_CHAIN_ID: u64 = 31337;
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:8545";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl NativeCurrency {
    pub fn new(name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub key: String,
    pub chain_id: u64,
    pub display_name: String,
    pub native_currency: NativeCurrency,
    /// Tried in order; the first reachable endpoint wins.
    pub rpc_urls: Vec<String>,
    pub explorer_url: Option<String>,
}

impl NetworkDescriptor {
    /// Chain id in the `0x`-prefixed form wallets exchange.
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    pub fn tx_url(&self, tx_hash: &TxHash) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{tx_hash}", base.trim_end_matches('/')))
    }

    pub fn address_url(&self, address: &Address) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/address/{address}", base.trim_end_matches('/')))
    }
}

/// Deployed betting contract per network key. A missing entry means betting
/// is unavailable on that network.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractAddressTable {
    addresses: HashMap<String, Address>,
}

impl ContractAddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, network: &str, address: Address) -> Self {
        self.insert(network, address);
        self
    }

    pub fn insert(&mut self, network: &str, address: Address) {
        self.addresses.insert(network.to_string(), address);
    }

    pub fn get(&self, network: &str) -> Option<Address> {
        self.addresses.get(network).copied()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct ChainRegistry {
    networks: Vec<NetworkDescriptor>,
    by_key: HashMap<String, usize>,
    addresses: ContractAddressTable,
}

impl ChainRegistry {
    /// Ethereum and Polygon, each with a mainnet and a testnet. No contract
    /// addresses are known until they are supplied.
    pub fn builtin() -> Self {
        let networks = vec![
            NetworkDescriptor {
                key: ETHEREUM.to_string(),
                chain_id: 1,
                display_name: "Ethereum Mainnet".to_string(),
                native_currency: NativeCurrency::new("Ether", "ETH", 18),
                rpc_urls: vec![
                    "https://eth.llamarpc.com".to_string(),
                    "https://cloudflare-eth.com".to_string(),
                ],
                explorer_url: Some("https://etherscan.io".to_string()),
            },
            NetworkDescriptor {
                key: SEPOLIA.to_string(),
                chain_id: 11_155_111,
                display_name: "Sepolia Testnet".to_string(),
                native_currency: NativeCurrency::new("Sepolia Ether", "SEP", 18),
                rpc_urls: vec![
                    "https://rpc.sepolia.org".to_string(),
                    "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
                ],
                explorer_url: Some("https://sepolia.etherscan.io".to_string()),
            },
            NetworkDescriptor {
                key: POLYGON.to_string(),
                chain_id: 137,
                display_name: "Polygon Mainnet".to_string(),
                native_currency: NativeCurrency::new("MATIC", "MATIC", 18),
                rpc_urls: vec!["https://polygon-rpc.com".to_string()],
                explorer_url: Some("https://polygonscan.com".to_string()),
            },
            NetworkDescriptor {
                key: MUMBAI.to_string(),
                chain_id: 80_001,
                display_name: "Mumbai Testnet".to_string(),
                native_currency: NativeCurrency::new("MATIC", "MATIC", 18),
                rpc_urls: vec!["https://rpc-mumbai.maticvigil.com".to_string()],
                explorer_url: Some("https://mumbai.polygonscan.com".to_string()),
            },
        ];
        let mut registry = Self {
            networks: Vec::new(),
            by_key: HashMap::new(),
            addresses: ContractAddressTable::new(),
        };
        for network in networks {
            registry.push(network);
        }
        registry
    }

    /// A development node such as anvil or hardhat.
    pub fn local_network(rpc_url: &str) -> NetworkDescriptor {
        NetworkDescriptor {
            key: LOCAL.to_string(),
            chain_id: LOCAL_CHAIN_ID,
            display_name: "Localhost".to_string(),
            native_currency: NativeCurrency::new("Ether", "ETH", 18),
            rpc_urls: vec![rpc_url.to_string()],
            explorer_url: None,
        }
    }

    /// Add or replace a network. Replacing keeps the catalog position. A
    /// network under another key with the same chain id is dropped, so every
    /// chain id maps to one descriptor.
    pub fn with_network(mut self, network: NetworkDescriptor) -> Self {
        self.push(network);
        self
    }

    pub fn with_addresses(mut self, addresses: ContractAddressTable) -> Self {
        self.addresses = addresses;
        self
    }

    fn push(&mut self, network: NetworkDescriptor) {
        if let Some(idx) = self
            .networks
            .iter()
            .position(|known| known.chain_id == network.chain_id && known.key != network.key)
        {
            let replaced = self.networks.remove(idx);
            warn!(
                chain_id = network.chain_id,
                replaced = %replaced.key,
                key = %network.key,
                "network takes over a chain id registered under another key"
            );
            self.by_key = self
                .networks
                .iter()
                .enumerate()
                .map(|(idx, known)| (known.key.clone(), idx))
                .collect();
        }
        match self.by_key.get(&network.key) {
            Some(&idx) => self.networks[idx] = network,
            None => {
                self.by_key.insert(network.key.clone(), self.networks.len());
                self.networks.push(network);
            }
        }
    }

    pub fn networks(&self) -> impl Iterator<Item = &NetworkDescriptor> {
        self.networks.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.networks.iter().map(|network| network.key.as_str())
    }

    pub fn describe_network(&self, key: &str) -> Result<&NetworkDescriptor> {
        self.by_key
            .get(key)
            .map(|&idx| &self.networks[idx])
            .ok_or_else(|| Error::NetworkNotConfigured(key.to_string()))
    }

    pub fn address_for(&self, key: &str) -> Result<Option<Address>> {
        self.describe_network(key)?;
        Ok(self.addresses.get(key))
    }

    pub fn match_by_chain_id(&self, chain_id: u64) -> Option<&NetworkDescriptor> {
        self.networks
            .iter()
            .find(|network| network.chain_id == chain_id)
    }

    pub fn address_table(&self) -> &ContractAddressTable {
        &self.addresses
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
