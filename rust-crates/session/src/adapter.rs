use crate::{
    error::{
        Error,
        ProviderError,
        Result,
    },
    registry::NetworkDescriptor,
    wallet::{
        WalletNotification,
        WalletProvider,
    },
};
use alloy::primitives::{
    Address,
    U256,
};
use tokio::sync::broadcast;
use tracing::{
    debug,
    info,
};

/// The only place that talks to the injected wallet. Turns wallet-level
/// failures into the session error taxonomy.
pub struct ProviderAdapter<W> {
    wallet: Option<W>,
}

impl<W> ProviderAdapter<W> {
    pub fn new(wallet: W) -> Self {
        Self {
            wallet: Some(wallet),
        }
    }

    /// No wallet was injected; every wallet operation fails with
    /// [`Error::WalletUnavailable`].
    pub fn unavailable() -> Self {
        Self { wallet: None }
    }

    pub fn is_available(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn wallet(&self) -> Result<&W> {
        self.wallet.as_ref().ok_or(Error::WalletUnavailable)
    }
}

impl<W: WalletProvider> ProviderAdapter<W> {
    /// Prompt for account access and return the primary account.
    pub async fn request_accounts(&self) -> Result<Address> {
        let accounts = self.wallet()?.request_accounts().await?;
        accounts.first().copied().ok_or(Error::UserRejected)
    }

    /// Primary account the wallet has already authorized, if any.
    pub async fn authorized_account(&self) -> Result<Option<Address>> {
        let accounts = self.wallet()?.accounts().await?;
        Ok(accounts.first().copied())
    }

    pub async fn current_chain_id(&self) -> Result<u64> {
        Ok(self.wallet()?.chain_id().await?)
    }

    /// Switch the wallet to `network`. When the wallet does not know the
    /// chain it is added from the descriptor and the switch retried once.
    pub async fn request_chain_switch(&self, network: &NetworkDescriptor) -> Result<()> {
        let wallet = self.wallet()?;
        let chain_id = network.chain_id;
        match wallet.switch_chain(chain_id).await {
            Ok(()) => Ok(()),
            Err(ProviderError::UnrecognizedChain(_)) => {
                info!(
                    chain_id,
                    network = %network.key,
                    "chain unknown to wallet, requesting it be added"
                );
                wallet
                    .add_chain(network)
                    .await
                    .map_err(|err| switch_error(chain_id, err))?;
                wallet
                    .switch_chain(chain_id)
                    .await
                    .map_err(|err| switch_error(chain_id, err))
            }
            Err(err) => Err(switch_error(chain_id, err)),
        }
    }

    pub async fn native_balance(&self, account: Address) -> Result<U256> {
        Ok(self.wallet()?.balance(account).await?)
    }

    pub fn read_only_contract(&self, address: Address) -> Result<W::Reader> {
        Ok(self.wallet()?.read_only_contract(address))
    }

    pub fn signing_contract(
        &self,
        address: Address,
        account: Option<Address>,
    ) -> Result<W::Signer> {
        let wallet = self.wallet()?;
        let account = account.ok_or(Error::NoSigner)?;
        debug!(%address, %account, "building signing contract handle");
        Ok(wallet.signing_contract(address, account)?)
    }

    pub fn subscribe(&self) -> Result<broadcast::Receiver<WalletNotification>> {
        Ok(self.wallet()?.subscribe())
    }
}

fn switch_error(chain_id: u64, err: ProviderError) -> Error {
    match err {
        ProviderError::UserRejected => Error::UserRejected,
        ProviderError::UnrecognizedChain(_) => Error::UnsupportedNetwork { chain_id },
        ProviderError::Transport(reason) => Error::NetworkUnreachable(reason),
        other => Error::SwitchRejected {
            chain_id,
            reason: other.to_string(),
        },
    }
}
