//! Seams between the session layer and an injected wallet provider.
//!
//! A [`WalletProvider`] speaks the browser-wallet protocol (account request,
//! chain id, chain switch/add, notifications). Contract access goes through
//! the handles it hands out: [`ContractReader`] for view calls and
//! [`ContractSigner`] for transactions signed by the connected account.

use crate::{
    error::ProviderError,
    events::ContractEvent,
    registry::NetworkDescriptor,
    types::{
        Bet,
        BettingEvent,
    },
};
use alloy::primitives::{
    Address,
    TxHash,
    U256,
};
use tokio::sync::broadcast;

/// Notifications a wallet pushes without being asked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletNotification {
    /// The authorized account set changed; empty means the wallet locked or
    /// revoked access.
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
    pub events: Vec<ContractEvent>,
}

pub trait ContractReader {
    fn address(&self) -> Address;

    fn name(&self) -> impl Future<Output = Result<String, ProviderError>>;

    fn symbol(&self) -> impl Future<Output = Result<String, ProviderError>>;

    fn decimals(&self) -> impl Future<Output = Result<u8, ProviderError>>;

    fn total_supply(&self) -> impl Future<Output = Result<U256, ProviderError>>;

    fn balance_of(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<U256, ProviderError>>;

    fn get_bet(&self, bet_id: U256) -> impl Future<Output = Result<Bet, ProviderError>>;

    fn get_betting_event(
        &self,
        event_id: &str,
    ) -> impl Future<Output = Result<BettingEvent, ProviderError>>;

    fn get_user_bets(
        &self,
        user: Address,
    ) -> impl Future<Output = Result<Vec<U256>, ProviderError>>;

    fn get_event_bets(
        &self,
        event_id: &str,
    ) -> impl Future<Output = Result<Vec<U256>, ProviderError>>;

    fn get_contract_balance(&self) -> impl Future<Output = Result<U256, ProviderError>>;

    fn get_total_bets(&self) -> impl Future<Output = Result<U256, ProviderError>>;
}

/// Write access. Every submit method returns as soon as the wallet has
/// produced a transaction hash; confirmation is a separate wait.
pub trait ContractSigner: ContractReader {
    fn transfer(
        &self,
        to: Address,
        amount: U256,
    ) -> impl Future<Output = Result<TxHash, ProviderError>>;

    fn approve(
        &self,
        spender: Address,
        amount: U256,
    ) -> impl Future<Output = Result<TxHash, ProviderError>>;

    fn transfer_from(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> impl Future<Output = Result<TxHash, ProviderError>>;

    fn place_bet(
        &self,
        event_id: &str,
        team: &str,
    ) -> impl Future<Output = Result<TxHash, ProviderError>>;

    fn claim_winnings(
        &self,
        bet_id: U256,
    ) -> impl Future<Output = Result<TxHash, ProviderError>>;

    /// Wait until the transaction is mined. A mined-but-reverted transaction
    /// is returned with `success == false`.
    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<TxReceipt, ProviderError>>;
}

pub trait WalletProvider {
    type Reader: ContractReader;
    type Signer: ContractSigner;

    /// Ask the user to authorize accounts (`eth_requestAccounts`).
    fn request_accounts(
        &self,
    ) -> impl Future<Output = Result<Vec<Address>, ProviderError>>;

    /// Accounts already authorized, without prompting (`eth_accounts`).
    fn accounts(&self) -> impl Future<Output = Result<Vec<Address>, ProviderError>>;

    fn chain_id(&self) -> impl Future<Output = Result<u64, ProviderError>>;

    /// `wallet_switchEthereumChain`. Fails with
    /// [`ProviderError::UnrecognizedChain`] when the wallet does not know it.
    fn switch_chain(&self, chain_id: u64)
    -> impl Future<Output = Result<(), ProviderError>>;

    /// `wallet_addEthereumChain`.
    fn add_chain(
        &self,
        network: &NetworkDescriptor,
    ) -> impl Future<Output = Result<(), ProviderError>>;

    /// Native currency balance on the active chain.
    fn balance(&self, account: Address)
    -> impl Future<Output = Result<U256, ProviderError>>;

    fn read_only_contract(&self, address: Address) -> Self::Reader;

    fn signing_contract(
        &self,
        address: Address,
        account: Address,
    ) -> Result<Self::Signer, ProviderError>;

    fn subscribe(&self) -> broadcast::Receiver<WalletNotification>;
}
