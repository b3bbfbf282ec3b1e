use crate::{
    adapter::ProviderAdapter,
    error::{
        Error,
        Result,
    },
    registry::{
        ChainRegistry,
        NetworkDescriptor,
    },
    units::{
        DEFAULT_DECIMALS,
        format_amount,
    },
    wallet::{
        ContractReader,
        WalletNotification,
        WalletProvider,
    },
};
use alloy::primitives::{
    Address,
    U256,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    sync::{
        Mutex,
        PoisonError,
        atomic::{
            AtomicU64,
            AtomicUsize,
            Ordering,
        },
    },
};
use tokio::sync::{
    broadcast::error::RecvError,
    watch,
};
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    SwitchingNetwork,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::SwitchingNetwork => "switching network",
            ConnectionState::Disconnecting => "disconnecting",
        };
        write!(f, "{name}")
    }
}

/// The client's wallet connection and balances. `Session::default()` is the
/// empty, disconnected session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    /// Registry key of the active chain; `None` while connected means the
    /// wallet sits on an unrecognized network.
    pub network: Option<String>,
    /// Betting contract on the active chain; `None` means betting is
    /// unavailable there.
    pub contract: Option<Address>,
    pub native_balance: U256,
    pub token_balance: U256,
    pub connection_state: ConnectionState,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }

    pub fn is_unrecognized_network(&self) -> bool {
        self.chain_id.is_some() && self.network.is_none()
    }

    pub fn native_balance_display(&self) -> String {
        format_amount(self.native_balance, DEFAULT_DECIMALS)
    }

    pub fn token_balance_display(&self) -> String {
        format_amount(self.token_balance, DEFAULT_DECIMALS)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ChainContext {
    chain_id: u64,
    network: Option<String>,
    contract: Option<Address>,
}

impl ChainContext {
    fn apply(self, session: &mut Session) {
        session.chain_id = Some(self.chain_id);
        session.network = self.network;
        session.contract = self.contract;
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Balances {
    native: U256,
    token: U256,
}

impl Balances {
    fn apply(self, session: &mut Session) {
        session.native_balance = self.native;
        session.token_balance = self.token;
    }
}

/// Held while a transaction is submitted and awaiting confirmation; network
/// switches are refused until it is dropped.
pub struct SubmissionGuard<'a> {
    pending: &'a AtomicUsize,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owner of the single [`Session`]. Every mutation goes through the
/// transitions below and is published atomically; observers read snapshots
/// or subscribe to changes.
///
/// All operations take `&self` and may be interleaved on one thread. Wallet
/// notifications are fed in with [`SessionManager::handle_notification`] or
/// [`SessionManager::run_notifications`].
pub struct SessionManager<W> {
    registry: ChainRegistry,
    adapter: ProviderAdapter<W>,
    state: watch::Sender<Session>,
    // bumped whenever the session is torn down, so in-flight transitions
    // can tell their result is stale
    epoch: AtomicU64,
    pending_submissions: AtomicUsize,
    // last chain reported by the wallet while a switch was in flight
    deferred_chain: Mutex<Option<u64>>,
}

impl<W> SessionManager<W> {
    pub fn new(registry: ChainRegistry, adapter: ProviderAdapter<W>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            registry,
            adapter,
            state,
            epoch: AtomicU64::new(0),
            pending_submissions: AtomicUsize::new(0),
            deferred_chain: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn adapter(&self) -> &ProviderAdapter<W> {
        &self.adapter
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.borrow().connection_state
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn current_network(&self) -> Option<&NetworkDescriptor> {
        let key = self.state.borrow().network.clone()?;
        self.registry.describe_network(&key).ok()
    }

    /// Clear the session. Calling it while already disconnected is a no-op.
    pub fn disconnect(&self) {
        if self.connection_state() == ConnectionState::Disconnected {
            debug!("disconnect requested while already disconnected");
            return;
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state
            .send_modify(|s| s.connection_state = ConnectionState::Disconnecting);
        self.state.send_replace(Session::default());
        info!("wallet session disconnected");
    }

    pub fn has_pending_submission(&self) -> bool {
        self.pending_submissions.load(Ordering::SeqCst) > 0
    }

    pub fn begin_submission(&self) -> SubmissionGuard<'_> {
        self.pending_submissions.fetch_add(1, Ordering::SeqCst);
        SubmissionGuard {
            pending: &self.pending_submissions,
        }
    }

    fn force_disconnect(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let previous = self.state.send_replace(Session::default());
        if previous.connection_state != ConnectionState::Disconnected {
            info!(
                from = %previous.connection_state,
                "wallet revoked all accounts, session cleared"
            );
        }
    }

    /// Move from `from` to `to`, or report why the session is not in `from`.
    fn transition(&self, from: ConnectionState, to: ConnectionState) -> Result<u64> {
        let mut observed = from;
        let moved = self.state.send_if_modified(|s| {
            observed = s.connection_state;
            if s.connection_state == from {
                s.connection_state = to;
                true
            } else {
                false
            }
        });
        if moved {
            debug!(%from, %to, "session transition");
            Ok(self.epoch.load(Ordering::SeqCst))
        } else if observed == ConnectionState::Disconnected {
            Err(Error::NoSigner)
        } else {
            Err(Error::SessionBusy { state: observed })
        }
    }

    fn replace_deferred_chain(&self, chain_id: Option<u64>) -> Option<u64> {
        let mut deferred = self
            .deferred_chain
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *deferred, chain_id)
    }

    /// Apply `update` only if nothing tore the session down since `epoch`.
    fn commit(&self, epoch: u64, update: impl FnOnce(&mut Session)) -> bool {
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return false;
        }
        self.state.send_modify(update);
        true
    }

    fn resolve_chain(&self, chain_id: u64) -> ChainContext {
        match self.registry.match_by_chain_id(chain_id) {
            Some(network) => {
                let contract = self.registry.address_table().get(&network.key);
                if contract.is_none() {
                    info!(
                        chain_id,
                        network = %network.key,
                        "no betting contract configured for network"
                    );
                }
                ChainContext {
                    chain_id,
                    network: Some(network.key.clone()),
                    contract,
                }
            }
            None => {
                warn!(chain_id, "wallet is on an unrecognized network");
                ChainContext {
                    chain_id,
                    network: None,
                    contract: None,
                }
            }
        }
    }
}

impl<W: WalletProvider> SessionManager<W> {
    /// Ask the wallet for an account and build a connected session. Calling
    /// it on a connected session is a no-op.
    pub async fn connect(&self) -> Result<()> {
        if self.connection_state() == ConnectionState::Connected {
            return Ok(());
        }
        let epoch = self.begin_connect()?;
        info!("connecting wallet");
        let result = match self.adapter.request_accounts().await {
            Ok(account) => self.establish(account).await,
            Err(err) => Err(err),
        };
        self.finish_connect(epoch, result)
    }

    /// Reconnect to an account the wallet already authorized, without a
    /// permission prompt. Returns `false` when there is nothing to restore.
    pub async fn restore(&self) -> Result<bool> {
        if self.connection_state() == ConnectionState::Connected {
            return Ok(true);
        }
        let epoch = self.begin_connect()?;
        let account = match self.adapter.authorized_account().await {
            Ok(Some(account)) => account,
            Ok(None) => {
                self.commit(epoch, |s| *s = Session::default());
                debug!("no previously authorized account to restore");
                return Ok(false);
            }
            Err(err) => {
                self.finish_connect(epoch, Err(err))?;
                return Ok(false);
            }
        };
        info!(%account, "restoring authorized wallet account");
        let result = self.establish(account).await;
        self.finish_connect(epoch, result).map(|()| true)
    }

    fn begin_connect(&self) -> Result<u64> {
        let mut observed = ConnectionState::Disconnected;
        let moved = self.state.send_if_modified(|s| {
            observed = s.connection_state;
            if s.connection_state == ConnectionState::Disconnected {
                s.connection_state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if !moved {
            return Err(Error::SessionBusy { state: observed });
        }
        Ok(self.epoch.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn finish_connect(&self, epoch: u64, result: Result<Session>) -> Result<()> {
        match result {
            Ok(session) => {
                let account = session.account;
                let chain_id = session.chain_id;
                if !self.commit(epoch, |s| *s = session) {
                    warn!("connect finished after the session was reset, discarding");
                    return Err(Error::SessionInterrupted);
                }
                info!(account = ?account, chain_id = ?chain_id, "wallet connected");
                Ok(())
            }
            Err(err) => {
                self.commit(epoch, |s| *s = Session::default());
                warn!(%err, "wallet connection failed");
                Err(err)
            }
        }
    }

    async fn establish(&self, account: Address) -> Result<Session> {
        let chain_id = self.adapter.current_chain_id().await?;
        let chain = self.resolve_chain(chain_id);
        let balances = self.fetch_balances(account, chain.contract).await?;
        let mut session = Session {
            account: Some(account),
            connection_state: ConnectionState::Connected,
            ..Session::default()
        };
        chain.apply(&mut session);
        balances.apply(&mut session);
        Ok(session)
    }

    /// Switch the wallet to the network registered under `key`. On failure
    /// the session keeps its previous chain and contract, unless the wallet
    /// reported a chain change while the switch was in flight, in which case
    /// that chain is applied once the switch settles.
    pub async fn switch_to_network(&self, key: &str) -> Result<()> {
        let network = self.registry.describe_network(key)?.clone();
        if self.has_pending_submission() {
            return Err(Error::SessionBusy {
                state: self.connection_state(),
            });
        }
        let epoch = self.transition(
            ConnectionState::Connected,
            ConnectionState::SwitchingNetwork,
        )?;
        let Some(account) = self.snapshot().account else {
            self.commit(epoch, |s| s.connection_state = ConnectionState::Connected);
            return Err(Error::NoSigner);
        };
        self.replace_deferred_chain(None);
        info!(network = %network.key, chain_id = network.chain_id, "switching network");

        let mut switched = false;
        let result = async {
            self.adapter.request_chain_switch(&network).await?;
            switched = true;
            let chain_id = self.adapter.current_chain_id().await?;
            let chain = self.resolve_chain(chain_id);
            let balances = self.fetch_balances(account, chain.contract).await?;
            Ok::<_, Error>((chain, balances))
        }
        .await;

        match result {
            Ok((chain, balances)) => {
                let chain_id = chain.chain_id;
                let mut account_moved = false;
                let committed = self.commit(epoch, |s| {
                    chain.apply(s);
                    if s.account == Some(account) {
                        balances.apply(s);
                    } else {
                        account_moved = true;
                    }
                    s.connection_state = ConnectionState::Connected;
                });
                if !committed {
                    warn!(chain_id, "network switch finished after the session was reset");
                    return Err(Error::SessionInterrupted);
                }
                info!(chain_id, "network switch complete");
                if let Some(reported) = self.replace_deferred_chain(None) {
                    if let Err(replay) = self.on_chain_changed(reported).await {
                        warn!(%replay, chain_id = reported, "failed to apply chain change reported during switch");
                    }
                }
                if account_moved {
                    self.refresh_balances().await?;
                }
                Ok(())
            }
            Err(err) => {
                self.commit(epoch, |s| s.connection_state = ConnectionState::Connected);
                warn!(%err, network = %network.key, "network switch failed");
                // the wallet may already sit on the new chain
                let reported = self
                    .replace_deferred_chain(None)
                    .or(switched.then_some(network.chain_id));
                if let Some(chain_id) = reported {
                    if let Err(replay) = self.on_chain_changed(chain_id).await {
                        warn!(%replay, chain_id, "failed to reload balances after interrupted switch");
                    }
                }
                Err(err)
            }
        }
    }

    /// Re-read native and token balances for the connected account. A result
    /// that no longer matches the session's account or chain is dropped.
    pub async fn refresh_balances(&self) -> Result<Session> {
        let snapshot = self.snapshot();
        let account = match (snapshot.connection_state, snapshot.account) {
            (ConnectionState::Connected, Some(account)) => account,
            (state, _) if state == ConnectionState::Disconnected => {
                return Err(Error::NoSigner);
            }
            (state, _) => return Err(Error::SessionBusy { state }),
        };
        let balances = self.fetch_balances(account, snapshot.contract).await?;
        let applied = self.state.send_if_modified(|s| {
            let current = s.is_connected()
                && s.account == Some(account)
                && s.chain_id == snapshot.chain_id
                && s.contract == snapshot.contract;
            if current {
                balances.apply(s);
            }
            current
        });
        if applied {
            debug!(%account, "balances refreshed");
        } else {
            debug!(%account, "discarding balances for a session that moved on");
        }
        Ok(self.snapshot())
    }

    async fn fetch_balances(
        &self,
        account: Address,
        contract: Option<Address>,
    ) -> Result<Balances> {
        let native = self.adapter.native_balance(account);
        let token = async {
            match contract {
                Some(address) => {
                    let reader = self.adapter.read_only_contract(address)?;
                    Ok::<_, Error>(reader.balance_of(account).await?)
                }
                None => Ok(U256::ZERO),
            }
        };
        let (native, token) = tokio::try_join!(native, token)?;
        Ok(Balances { native, token })
    }

    /// Apply a wallet notification to the session.
    pub async fn handle_notification(&self, notification: WalletNotification) -> Result<()> {
        match notification {
            WalletNotification::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    self.force_disconnect();
                    Ok(())
                }
                Some(&account) => self.on_account_changed(account).await,
            },
            WalletNotification::ChainChanged(chain_id) => {
                self.on_chain_changed(chain_id).await
            }
        }
    }

    /// Drive wallet notifications until the wallet drops its sender.
    pub async fn run_notifications(&self) -> Result<()> {
        let mut notifications = self.adapter.subscribe()?;
        loop {
            match notifications.recv().await {
                Ok(notification) => {
                    if let Err(err) = self.handle_notification(notification).await {
                        warn!(%err, "failed to apply wallet notification");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "missed wallet notifications, reloading session");
                    if let Err(err) = self.reload_from_wallet().await {
                        warn!(%err, "session reload after missed notifications failed");
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
        Ok(())
    }

    async fn reload_from_wallet(&self) -> Result<()> {
        if !self.snapshot().is_connected() {
            return Ok(());
        }
        match self.adapter.authorized_account().await? {
            None => {
                self.force_disconnect();
                Ok(())
            }
            Some(account) => {
                self.on_account_changed(account).await?;
                let chain_id = self.adapter.current_chain_id().await?;
                self.on_chain_changed(chain_id).await
            }
        }
    }

    async fn on_account_changed(&self, account: Address) -> Result<()> {
        let snapshot = self.snapshot();
        match snapshot.connection_state {
            ConnectionState::Connected => {}
            ConnectionState::SwitchingNetwork => {
                self.state.send_modify(|s| s.account = Some(account));
                return Ok(());
            }
            state => {
                debug!(%state, %account, "ignoring account change outside a connected session");
                return Ok(());
            }
        }
        if snapshot.account == Some(account) {
            return Ok(());
        }
        info!(%account, "wallet account changed");
        let epoch = self.epoch.load(Ordering::SeqCst);
        let fetched = self.fetch_balances(account, snapshot.contract).await;
        let balances = fetched.as_ref().copied().unwrap_or_default();
        let mut stale = false;
        self.commit(epoch, |s| match s.connection_state {
            ConnectionState::Connected => {
                s.account = Some(account);
                if s.chain_id == snapshot.chain_id && s.contract == snapshot.contract {
                    balances.apply(s);
                } else {
                    stale = true;
                }
            }
            // the switch re-reads balances for the new account when it lands
            ConnectionState::SwitchingNetwork => s.account = Some(account),
            _ => {}
        });
        if stale {
            debug!(%account, "chain moved while fetching balances, refreshing");
            self.refresh_balances().await?;
            return Ok(());
        }
        fetched.map(|_| ())
    }

    async fn on_chain_changed(&self, chain_id: u64) -> Result<()> {
        let snapshot = self.snapshot();
        if snapshot.connection_state == ConnectionState::SwitchingNetwork {
            debug!(chain_id, "chain changed during network switch, deferring");
            self.replace_deferred_chain(Some(chain_id));
            return Ok(());
        }
        if !snapshot.is_connected() {
            debug!(chain_id, state = %snapshot.connection_state, "ignoring chain change");
            return Ok(());
        }
        if snapshot.chain_id == Some(chain_id) {
            return Ok(());
        }
        let Some(account) = snapshot.account else {
            return Ok(());
        };
        info!(chain_id, "wallet chain changed, reloading session state");
        let epoch = self.epoch.load(Ordering::SeqCst);
        let chain = self.resolve_chain(chain_id);
        let fetched = self.fetch_balances(account, chain.contract).await;
        let balances = fetched.as_ref().copied().unwrap_or_default();
        self.commit(epoch, |s| {
            if s.is_connected() && s.account == Some(account) {
                chain.apply(s);
                balances.apply(s);
            }
        });
        fetched.map(|_| ())
    }
}
