//! Headless wallet that signs with a local key and talks JSON-RPC.
//!
//! It behaves like an injected browser wallet: it only knows the chain it
//! was opened on until others are added, asks a [`WalletPrompt`] before
//! unlocking or approving anything, and announces account and chain changes
//! through [`WalletNotification`]s.

use crate::{
    error::ProviderError,
    events::parse_event_logs,
    registry::NetworkDescriptor,
    types::{
        Bet,
        BettingEvent,
    },
    wallet::{
        ContractReader,
        ContractSigner,
        TxReceipt,
        WalletNotification,
        WalletProvider,
    },
};
use alloy::{
    contract::Error as ContractError,
    network::{
        EthereumWallet,
        ReceiptResponse,
    },
    primitives::{
        Address,
        TxHash,
        U256,
    },
    providers::{
        DynProvider,
        Provider,
        ProviderBuilder,
    },
    signers::local::PrivateKeySigner,
    sol_types::decode_revert_reason,
    transports::TransportError,
};
use generated_abi::BettingToken::{
    self,
    BettingTokenInstance,
};
use std::{
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
    time::Duration,
};
use tokio::sync::broadcast;
use tracing::{
    debug,
    info,
    warn,
};
use url::Url;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Something the wallet needs the user to agree to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApprovalRequest {
    SwitchChain { chain_id: u64, name: String },
    AddChain { chain_id: u64, name: String },
    Transaction { to: Address, summary: String },
}

/// Stands in for the wallet's popups.
pub trait WalletPrompt {
    /// Unlock the signing key. `None` means the user declined.
    fn unlock(&self) -> Option<PrivateKeySigner>;

    fn approve(&self, request: &ApprovalRequest) -> bool;
}

#[derive(Clone)]
struct ActiveChain {
    chain_id: u64,
    url: Url,
    provider: DynProvider,
}

#[derive(Clone, Copy, Debug)]
pub struct RpcWalletOptions {
    pub poll_interval: Duration,
    pub receipt_timeout: Duration,
}

impl Default for RpcWalletOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }
}

pub struct RpcWallet {
    prompt: Arc<dyn WalletPrompt>,
    known: Mutex<Vec<NetworkDescriptor>>,
    active: Mutex<ActiveChain>,
    signer: Mutex<Option<PrivateKeySigner>>,
    notifications: broadcast::Sender<WalletNotification>,
    options: RpcWalletOptions,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn transport_error(err: TransportError) -> ProviderError {
    match err.as_error_resp() {
        Some(payload) => ProviderError::from_code(payload.code, payload.message.to_string(), 0),
        None => ProviderError::Transport(err.to_string()),
    }
}

fn contract_error(err: ContractError) -> ProviderError {
    if let Some(data) = err.as_revert_data() {
        let reason = decode_revert_reason(&data).unwrap_or_else(|| format!("0x{data:x}"));
        return ProviderError::ExecutionReverted(reason);
    }
    match err {
        ContractError::TransportError(err) => transport_error(err),
        other => ProviderError::Transport(other.to_string()),
    }
}

/// Connect to the first RPC endpoint of `network` that answers with the
/// expected chain id.
async fn open_chain(network: &NetworkDescriptor) -> Result<ActiveChain, ProviderError> {
    let mut last_error = None;
    for endpoint in &network.rpc_urls {
        let url = match endpoint.parse::<Url>() {
            Ok(url) => url,
            Err(err) => {
                warn!(endpoint, %err, "skipping invalid RPC URL");
                continue;
            }
        };
        let provider = ProviderBuilder::new().connect_http(url.clone()).erased();
        match provider.get_chain_id().await {
            Ok(chain_id) if chain_id == network.chain_id => {
                debug!(endpoint, chain_id, "RPC endpoint selected");
                return Ok(ActiveChain {
                    chain_id,
                    url,
                    provider,
                });
            }
            Ok(chain_id) => {
                warn!(
                    endpoint,
                    expected = network.chain_id,
                    actual = chain_id,
                    "RPC endpoint serves a different chain"
                );
            }
            Err(err) => {
                warn!(endpoint, %err, "RPC endpoint unreachable");
                last_error = Some(err.to_string());
            }
        }
    }
    Err(ProviderError::Transport(last_error.unwrap_or_else(|| {
        format!("no usable RPC endpoint for {}", network.key)
    })))
}

impl RpcWallet {
    /// Open the wallet on `network`, the only chain it knows initially.
    pub async fn open(
        network: NetworkDescriptor,
        prompt: Arc<dyn WalletPrompt>,
        options: RpcWalletOptions,
    ) -> Result<Self, ProviderError> {
        let active = open_chain(&network).await?;
        info!(chain_id = active.chain_id, url = %active.url, "wallet opened");
        let (notifications, _) = broadcast::channel(16);
        Ok(Self {
            prompt,
            known: Mutex::new(vec![network]),
            active: Mutex::new(active),
            signer: Mutex::new(None),
            notifications,
            options,
        })
    }

    /// Forget the unlocked key, as if the user locked the wallet.
    pub fn lock(&self) {
        if locked(&self.signer).take().is_some() {
            info!("wallet locked");
            let _ = self
                .notifications
                .send(WalletNotification::AccountsChanged(Vec::new()));
        }
    }

    fn active(&self) -> ActiveChain {
        locked(&self.active).clone()
    }

    fn approve(&self, request: ApprovalRequest) -> Result<(), ProviderError> {
        if self.prompt.approve(&request) {
            Ok(())
        } else {
            debug!(?request, "user declined");
            Err(ProviderError::UserRejected)
        }
    }
}

impl WalletProvider for RpcWallet {
    type Reader = RpcContract;
    type Signer = RpcContract;

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        if let Some(signer) = locked(&self.signer).as_ref() {
            return Ok(vec![signer.address()]);
        }
        let signer = self.prompt.unlock().ok_or(ProviderError::UserRejected)?;
        let address = signer.address();
        *locked(&self.signer) = Some(signer);
        info!(%address, "wallet unlocked");
        Ok(vec![address])
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        Ok(locked(&self.signer)
            .as_ref()
            .map(|signer| vec![signer.address()])
            .unwrap_or_default())
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Ok(locked(&self.active).chain_id)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        if self.active().chain_id == chain_id {
            return Ok(());
        }
        let network = locked(&self.known)
            .iter()
            .find(|network| network.chain_id == chain_id)
            .cloned()
            .ok_or(ProviderError::UnrecognizedChain(chain_id))?;
        self.approve(ApprovalRequest::SwitchChain {
            chain_id,
            name: network.display_name.clone(),
        })?;
        let active = open_chain(&network).await?;
        *locked(&self.active) = active;
        info!(chain_id, "wallet switched chain");
        let _ = self
            .notifications
            .send(WalletNotification::ChainChanged(chain_id));
        Ok(())
    }

    async fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), ProviderError> {
        if locked(&self.known)
            .iter()
            .any(|known| known.chain_id == network.chain_id)
        {
            return Ok(());
        }
        self.approve(ApprovalRequest::AddChain {
            chain_id: network.chain_id,
            name: network.display_name.clone(),
        })?;
        locked(&self.known).push(network.clone());
        info!(chain_id = network.chain_id, "chain added to wallet");
        Ok(())
    }

    async fn balance(&self, account: Address) -> Result<U256, ProviderError> {
        let provider = self.active().provider;
        provider.get_balance(account).await.map_err(transport_error)
    }

    fn read_only_contract(&self, address: Address) -> RpcContract {
        RpcContract {
            instance: BettingToken::new(address, self.active().provider),
            approvals: None,
            options: self.options,
        }
    }

    fn signing_contract(
        &self,
        address: Address,
        account: Address,
    ) -> Result<RpcContract, ProviderError> {
        let signer = locked(&self.signer)
            .clone()
            .filter(|signer| signer.address() == account)
            .ok_or(ProviderError::Unauthorized)?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(self.active().url)
            .erased();
        Ok(RpcContract {
            instance: BettingToken::new(address, provider),
            approvals: Some(self.prompt.clone()),
            options: self.options,
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletNotification> {
        self.notifications.subscribe()
    }
}

/// Betting contract bound to one chain, optionally able to sign.
pub struct RpcContract {
    instance: BettingTokenInstance<DynProvider>,
    approvals: Option<Arc<dyn WalletPrompt>>,
    options: RpcWalletOptions,
}

impl RpcContract {
    fn confirm(&self, summary: String) -> Result<(), ProviderError> {
        let prompt = self.approvals.as_ref().ok_or(ProviderError::Unauthorized)?;
        let request = ApprovalRequest::Transaction {
            to: *self.instance.address(),
            summary,
        };
        if prompt.approve(&request) {
            Ok(())
        } else {
            Err(ProviderError::UserRejected)
        }
    }
}

impl ContractReader for RpcContract {
    fn address(&self) -> Address {
        *self.instance.address()
    }

    async fn name(&self) -> Result<String, ProviderError> {
        self.instance.name().call().await.map_err(contract_error)
    }

    async fn symbol(&self) -> Result<String, ProviderError> {
        self.instance.symbol().call().await.map_err(contract_error)
    }

    async fn decimals(&self) -> Result<u8, ProviderError> {
        self.instance.decimals().call().await.map_err(contract_error)
    }

    async fn total_supply(&self) -> Result<U256, ProviderError> {
        self.instance.totalSupply().call().await.map_err(contract_error)
    }

    async fn balance_of(&self, account: Address) -> Result<U256, ProviderError> {
        self.instance
            .balanceOf(account)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn get_bet(&self, bet_id: U256) -> Result<Bet, ProviderError> {
        let raw = self
            .instance
            .getBet(bet_id)
            .call()
            .await
            .map_err(contract_error)?;
        Ok(Bet::from(raw))
    }

    async fn get_betting_event(&self, event_id: &str) -> Result<BettingEvent, ProviderError> {
        let raw = self
            .instance
            .getBettingEvent(event_id.to_string())
            .call()
            .await
            .map_err(contract_error)?;
        Ok(BettingEvent::from(raw))
    }

    async fn get_user_bets(&self, user: Address) -> Result<Vec<U256>, ProviderError> {
        self.instance
            .getUserBets(user)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn get_event_bets(&self, event_id: &str) -> Result<Vec<U256>, ProviderError> {
        self.instance
            .getEventBets(event_id.to_string())
            .call()
            .await
            .map_err(contract_error)
    }

    async fn get_contract_balance(&self) -> Result<U256, ProviderError> {
        self.instance
            .getContractBalance()
            .call()
            .await
            .map_err(contract_error)
    }

    async fn get_total_bets(&self) -> Result<U256, ProviderError> {
        self.instance
            .getTotalBets()
            .call()
            .await
            .map_err(contract_error)
    }
}

impl ContractSigner for RpcContract {
    async fn transfer(&self, to: Address, amount: U256) -> Result<TxHash, ProviderError> {
        self.confirm(format!("transfer {amount} to {to}"))?;
        let pending = self
            .instance
            .transfer(to, amount)
            .send()
            .await
            .map_err(contract_error)?;
        Ok(*pending.tx_hash())
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<TxHash, ProviderError> {
        self.confirm(format!("allow {spender} to spend {amount}"))?;
        let pending = self
            .instance
            .approve(spender, amount)
            .send()
            .await
            .map_err(contract_error)?;
        Ok(*pending.tx_hash())
    }

    async fn transfer_from(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, ProviderError> {
        self.confirm(format!("transfer {amount} from {from} to {to}"))?;
        let pending = self
            .instance
            .transferFrom(from, to, amount)
            .send()
            .await
            .map_err(contract_error)?;
        Ok(*pending.tx_hash())
    }

    async fn place_bet(&self, event_id: &str, team: &str) -> Result<TxHash, ProviderError> {
        self.confirm(format!("bet on {team} in {event_id}"))?;
        let pending = self
            .instance
            .placeBet(event_id.to_string(), team.to_string())
            .send()
            .await
            .map_err(contract_error)?;
        Ok(*pending.tx_hash())
    }

    async fn claim_winnings(&self, bet_id: U256) -> Result<TxHash, ProviderError> {
        self.confirm(format!("claim winnings of bet {bet_id}"))?;
        let pending = self
            .instance
            .claimWinnings(bet_id)
            .send()
            .await
            .map_err(contract_error)?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ProviderError> {
        let provider = self.instance.provider();
        let poll = async {
            loop {
                match provider
                    .get_transaction_receipt(tx_hash)
                    .await
                    .map_err(transport_error)?
                {
                    Some(receipt) => return Ok::<_, ProviderError>(receipt),
                    None => tokio::time::sleep(self.options.poll_interval).await,
                }
            }
        };
        let receipt = tokio::time::timeout(self.options.receipt_timeout, poll)
            .await
            .map_err(|_| {
                ProviderError::Transport(format!("timed out waiting for receipt of {tx_hash}"))
            })??;
        let events = parse_event_logs(*self.instance.address(), receipt.inner.logs());
        Ok(TxReceipt {
            tx_hash,
            success: receipt.status(),
            block_number: receipt.block_number,
            events,
        })
    }
}
