//! In-memory wallet and betting contract for exercising the session layer
//! without a node.

use crate::{
    adapter::ProviderAdapter,
    error::ProviderError,
    events::{
        BetClaimedEvent,
        BetPlacedEvent,
        ContractEvent,
        EventCreatedEvent,
        EventResolvedEvent,
        TokensMovedEvent,
    },
    gateway::BettingGateway,
    registry::{
        ChainRegistry,
        ContractAddressTable,
        LOCAL,
        NetworkDescriptor,
        SEPOLIA,
    },
    session::SessionManager,
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
use alloy::primitives::{
    Address,
    TxHash,
    U256,
};
use std::{
    collections::{
        BTreeMap,
        BTreeSet,
        HashMap,
    },
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};
use tokio::sync::{
    Semaphore,
    broadcast,
};

pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;
pub const POLYGON_CHAIN_ID: u64 = 137;
pub const MUMBAI_CHAIN_ID: u64 = 80_001;
pub const LOCAL_CHAIN_ID: u64 = crate::registry::LOCAL_CHAIN_ID;

pub const TOKEN: u128 = 1_000_000_000_000_000_000;
pub const MATCH_ID: &str = "match_001";
pub const HOME_TEAM: &str = "Manchester United";
pub const AWAY_TEAM: &str = "Liverpool";

pub fn tokens(whole: u64) -> U256 {
    U256::from(whole) * U256::from(TOKEN)
}

pub fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

pub fn sepolia_contract() -> Address {
    Address::repeat_byte(0x5e)
}

pub fn local_contract() -> Address {
    Address::repeat_byte(0x10)
}

/// Wallet and contract calls the fake can count or hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
    RequestAccounts,
    Accounts,
    ChainId,
    SwitchChain,
    AddChain,
    Balance,
    Read,
    PlaceBet,
    ClaimWinnings,
    Transfer,
    Receipt,
}

/// One deployment of the betting token.
#[derive(Clone, Debug)]
pub struct Ledger {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
    pub balances: HashMap<Address, U256>,
    pub allowances: HashMap<(Address, Address), U256>,
    pub events: BTreeMap<String, BettingEvent>,
    pub bets: Vec<Bet>,
    pub clock: u64,
    /// Tokens `placeBet` takes from the caller.
    pub stake: U256,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            name: "Sports Betting Token".to_string(),
            symbol: "SBT".to_string(),
            decimals: 18,
            total_supply: U256::ZERO,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            events: BTreeMap::new(),
            bets: Vec::new(),
            clock: 1_700_000_000,
            stake: tokens(10),
        }
    }
}

impl Ledger {
    /// Address the contract itself holds staked tokens under.
    pub fn treasury() -> Address {
        Address::repeat_byte(0xee)
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    pub fn mint(&mut self, to: Address, amount: U256) -> ContractEvent {
        *self.balances.entry(to).or_default() += amount;
        self.total_supply += amount;
        ContractEvent::TokensMinted(TokensMovedEvent {
            account: to,
            amount,
        })
    }

    pub fn create_event(&mut self, event_id: &str, team_a: &str, team_b: &str) -> ContractEvent {
        let end_time = self.clock + 86_400;
        self.events.insert(
            event_id.to_string(),
            BettingEvent {
                event_id: event_id.to_string(),
                team_a: team_a.to_string(),
                team_b: team_b.to_string(),
                total_pool: U256::ZERO,
                team_a_pool: U256::ZERO,
                team_b_pool: U256::ZERO,
                is_active: true,
                is_resolved: false,
                winner: String::new(),
                end_time,
            },
        );
        ContractEvent::EventCreated(EventCreatedEvent {
            event_id: event_id.to_string(),
            team_a: team_a.to_string(),
            team_b: team_b.to_string(),
            end_time,
        })
    }

    pub fn pause_event(&mut self, event_id: &str) {
        if let Some(event) = self.events.get_mut(event_id) {
            event.is_active = false;
        }
    }

    pub fn resolve_event(&mut self, event_id: &str, winner: &str) -> ContractEvent {
        if let Some(event) = self.events.get_mut(event_id) {
            event.is_active = false;
            event.is_resolved = true;
            event.winner = winner.to_string();
        }
        for bet in self.bets.iter_mut().filter(|bet| bet.event_id == event_id) {
            bet.is_winner = bet.team == winner;
        }
        ContractEvent::EventResolved(EventResolvedEvent {
            event_id: event_id.to_string(),
            winner: winner.to_string(),
        })
    }

    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), String> {
        let available = self.balance_of(from);
        if available < amount {
            return Err("Insufficient balance".to_string());
        }
        self.balances.insert(from, available - amount);
        *self.balances.entry(to).or_default() += amount;
        Ok(())
    }

    pub fn place_bet(
        &mut self,
        bettor: Address,
        event_id: &str,
        team: &str,
        amount: U256,
    ) -> Result<ContractEvent, String> {
        let event = self
            .events
            .get(event_id)
            .ok_or_else(|| "Event does not exist".to_string())?;
        if !event.is_active || event.is_resolved {
            return Err("Event is not active".to_string());
        }
        if !event.has_team(team) {
            return Err("Invalid team".to_string());
        }
        if amount.is_zero() {
            return Err("Bet amount must be greater than 0".to_string());
        }
        self.transfer(bettor, Self::treasury(), amount)?;
        if let Some(event) = self.events.get_mut(event_id) {
            event.record_stake(team, amount);
        }
        self.clock += 1;
        let id = U256::from(self.bets.len() + 1);
        self.bets.push(Bet {
            id,
            bettor,
            amount,
            event_id: event_id.to_string(),
            team: team.to_string(),
            is_winner: false,
            is_claimed: false,
            timestamp: self.clock,
        });
        Ok(ContractEvent::BetPlaced(BetPlacedEvent {
            bet_id: id,
            bettor,
            event_id: event_id.to_string(),
            team: team.to_string(),
            amount,
        }))
    }

    fn claim(&mut self, bettor: Address, bet_id: U256) -> Result<ContractEvent, String> {
        let bet = self
            .bets
            .iter()
            .find(|bet| bet.id == bet_id)
            .cloned()
            .ok_or_else(|| "Bet does not exist".to_string())?;
        if bet.bettor != bettor {
            return Err("Not your bet".to_string());
        }
        if !bet.is_winner {
            return Err("Bet did not win".to_string());
        }
        if bet.is_claimed {
            return Err("Winnings already claimed".to_string());
        }
        let event = self
            .events
            .get(&bet.event_id)
            .cloned()
            .ok_or_else(|| "Event does not exist".to_string())?;
        let winning_pool = if bet.team == event.team_a {
            event.team_a_pool
        } else {
            event.team_b_pool
        };
        let winnings = if winning_pool.is_zero() {
            bet.amount
        } else {
            bet.amount * event.total_pool / winning_pool
        };
        self.transfer(Self::treasury(), bettor, winnings)?;
        if let Some(stored) = self.bets.iter_mut().find(|stored| stored.id == bet_id) {
            stored.is_claimed = true;
        }
        Ok(ContractEvent::BetClaimed(BetClaimedEvent {
            bet_id,
            bettor,
            winnings,
        }))
    }
}

/// Everything the fake wallet knows. Tests poke at it through
/// [`FakeWallet::state`].
#[derive(Debug)]
pub struct FakeState {
    pub chain_id: u64,
    pub known_chains: BTreeSet<u64>,
    /// Accounts returned by `eth_accounts`.
    pub authorized: Vec<Address>,
    /// What the user approves on the next account request; `None` rejects.
    pub approve_accounts: Option<Vec<Address>>,
    pub reject_switch: bool,
    pub reject_add_chain: bool,
    pub switch_failure: Option<ProviderError>,
    /// Every call fails with a transport error while set.
    pub offline: bool,
    pub reject_transactions: bool,
    /// The next mined transaction reverts.
    pub revert_next: bool,
    pub native: HashMap<(u64, Address), U256>,
    pub ledgers: HashMap<(u64, Address), Ledger>,
    receipts: HashMap<TxHash, TxReceipt>,
    next_tx: u64,
    block: u64,
}

struct Shared {
    state: Mutex<FakeState>,
    calls: Mutex<BTreeMap<Op, usize>>,
    gates: Mutex<HashMap<Op, Arc<Semaphore>>>,
    notifications: broadcast::Sender<WalletNotification>,
}

#[derive(Clone)]
pub struct FakeWallet {
    shared: Arc<Shared>,
}

impl FakeWallet {
    pub fn new(chain_id: u64) -> Self {
        let (notifications, _) = broadcast::channel(16);
        let state = FakeState {
            chain_id,
            known_chains: BTreeSet::from([1, chain_id]),
            authorized: Vec::new(),
            approve_accounts: None,
            reject_switch: false,
            reject_add_chain: false,
            switch_failure: None,
            offline: false,
            reject_transactions: false,
            revert_next: false,
            native: HashMap::new(),
            ledgers: HashMap::new(),
            receipts: HashMap::new(),
            next_tx: 0,
            block: 100,
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                calls: Mutex::new(BTreeMap::new()),
                gates: Mutex::new(HashMap::new()),
                notifications,
            }),
        }
    }

    /// The user will approve `account` when asked.
    pub fn with_account(self, account: Address) -> Self {
        self.state().approve_accounts = Some(vec![account]);
        self
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.shared.state.lock().expect("fake wallet state poisoned")
    }

    pub fn deploy(&self, chain_id: u64, address: Address) {
        self.state()
            .ledgers
            .insert((chain_id, address), Ledger::default());
    }

    pub fn ledger<R>(&self, chain_id: u64, address: Address, f: impl FnOnce(&mut Ledger) -> R) -> R {
        let mut state = self.state();
        let ledger = state
            .ledgers
            .get_mut(&(chain_id, address))
            .expect("no contract deployed at that address");
        f(ledger)
    }

    pub fn set_native_balance(&self, chain_id: u64, account: Address, amount: U256) {
        self.state().native.insert((chain_id, account), amount);
    }

    pub fn calls_to(&self, op: Op) -> usize {
        self.shared
            .calls
            .lock()
            .expect("fake wallet calls poisoned")
            .get(&op)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.shared
            .calls
            .lock()
            .expect("fake wallet calls poisoned")
            .values()
            .sum()
    }

    pub fn reset_calls(&self) {
        self.shared
            .calls
            .lock()
            .expect("fake wallet calls poisoned")
            .clear();
    }

    /// Calls to `op` block until [`FakeWallet::release`].
    pub fn hold(&self, op: Op) {
        self.shared
            .gates
            .lock()
            .expect("fake wallet gates poisoned")
            .insert(op, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, op: Op) {
        if let Some(gate) = self
            .shared
            .gates
            .lock()
            .expect("fake wallet gates poisoned")
            .remove(&op)
        {
            gate.close();
        }
    }

    pub fn emit(&self, notification: WalletNotification) {
        let _ = self.shared.notifications.send(notification);
    }

    /// The user picks another chain in the wallet UI.
    pub fn user_switches_chain(&self, chain_id: u64) {
        {
            let mut state = self.state();
            state.chain_id = chain_id;
            state.known_chains.insert(chain_id);
        }
        self.emit(WalletNotification::ChainChanged(chain_id));
    }

    pub fn user_switches_account(&self, account: Address) {
        self.state().authorized = vec![account];
        self.emit(WalletNotification::AccountsChanged(vec![account]));
    }

    pub fn user_locks(&self) {
        self.state().authorized.clear();
        self.emit(WalletNotification::AccountsChanged(Vec::new()));
    }

    async fn enter(&self, op: Op) -> Result<(), ProviderError> {
        *self
            .shared
            .calls
            .lock()
            .expect("fake wallet calls poisoned")
            .entry(op)
            .or_default() += 1;
        let gate = self
            .shared
            .gates
            .lock()
            .expect("fake wallet gates poisoned")
            .get(&op)
            .cloned();
        if let Some(gate) = gate {
            // closed on release
            let _ = gate.acquire().await;
        }
        if self.state().offline {
            return Err(ProviderError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

impl WalletProvider for FakeWallet {
    type Reader = FakeContract;
    type Signer = FakeContract;

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.enter(Op::RequestAccounts).await?;
        let mut state = self.state();
        let accounts = state
            .approve_accounts
            .clone()
            .ok_or(ProviderError::UserRejected)?;
        state.authorized = accounts.clone();
        Ok(accounts)
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.enter(Op::Accounts).await?;
        Ok(self.state().authorized.clone())
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.enter(Op::ChainId).await?;
        Ok(self.state().chain_id)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        self.enter(Op::SwitchChain).await?;
        {
            let mut state = self.state();
            if let Some(failure) = state.switch_failure.clone() {
                return Err(failure);
            }
            if state.reject_switch {
                return Err(ProviderError::UserRejected);
            }
            if !state.known_chains.contains(&chain_id) {
                return Err(ProviderError::UnrecognizedChain(chain_id));
            }
            if state.chain_id == chain_id {
                return Ok(());
            }
            state.chain_id = chain_id;
        }
        self.emit(WalletNotification::ChainChanged(chain_id));
        Ok(())
    }

    async fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), ProviderError> {
        self.enter(Op::AddChain).await?;
        let mut state = self.state();
        if state.reject_add_chain {
            return Err(ProviderError::UserRejected);
        }
        state.known_chains.insert(network.chain_id);
        Ok(())
    }

    async fn balance(&self, account: Address) -> Result<U256, ProviderError> {
        self.enter(Op::Balance).await?;
        let state = self.state();
        Ok(state
            .native
            .get(&(state.chain_id, account))
            .copied()
            .unwrap_or_default())
    }

    fn read_only_contract(&self, address: Address) -> FakeContract {
        FakeContract {
            wallet: self.clone(),
            chain_id: self.state().chain_id,
            address,
            signer: None,
        }
    }

    fn signing_contract(
        &self,
        address: Address,
        account: Address,
    ) -> Result<FakeContract, ProviderError> {
        let state = self.state();
        if !state.authorized.contains(&account) {
            return Err(ProviderError::Unauthorized);
        }
        Ok(FakeContract {
            wallet: self.clone(),
            chain_id: state.chain_id,
            address,
            signer: Some(account),
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletNotification> {
        self.shared.notifications.subscribe()
    }
}

/// Handle on a [`Ledger`] bound to the chain it was created on.
pub struct FakeContract {
    wallet: FakeWallet,
    chain_id: u64,
    address: Address,
    signer: Option<Address>,
}

impl FakeContract {
    async fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> Result<R, ProviderError> {
        self.wallet.enter(Op::Read).await?;
        let state = self.wallet.state();
        let ledger = state
            .ledgers
            .get(&(self.chain_id, self.address))
            .ok_or_else(|| ProviderError::ExecutionReverted("no contract code".to_string()))?;
        Ok(f(ledger))
    }

    async fn submit(
        &self,
        op: Op,
        f: impl FnOnce(&mut Ledger, Address) -> Result<Vec<ContractEvent>, String>,
    ) -> Result<TxHash, ProviderError> {
        self.wallet.enter(op).await?;
        let signer = self.signer.ok_or(ProviderError::Unauthorized)?;
        let mut state = self.wallet.state();
        if state.reject_transactions {
            return Err(ProviderError::UserRejected);
        }
        state.next_tx += 1;
        state.block += 1;
        let tx_hash = TxHash::left_padding_from(&state.next_tx.to_be_bytes());
        let block_number = Some(state.block);
        let receipt = if std::mem::take(&mut state.revert_next) {
            TxReceipt {
                tx_hash,
                success: false,
                block_number,
                events: Vec::new(),
            }
        } else {
            let ledger = state
                .ledgers
                .get_mut(&(self.chain_id, self.address))
                .ok_or_else(|| ProviderError::ExecutionReverted("no contract code".to_string()))?;
            let events = f(ledger, signer).map_err(ProviderError::ExecutionReverted)?;
            TxReceipt {
                tx_hash,
                success: true,
                block_number,
                events,
            }
        };
        state.receipts.insert(tx_hash, receipt);
        Ok(tx_hash)
    }
}

impl ContractReader for FakeContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn name(&self) -> Result<String, ProviderError> {
        self.read(|ledger| ledger.name.clone()).await
    }

    async fn symbol(&self) -> Result<String, ProviderError> {
        self.read(|ledger| ledger.symbol.clone()).await
    }

    async fn decimals(&self) -> Result<u8, ProviderError> {
        self.read(|ledger| ledger.decimals).await
    }

    async fn total_supply(&self) -> Result<U256, ProviderError> {
        self.read(|ledger| ledger.total_supply).await
    }

    async fn balance_of(&self, account: Address) -> Result<U256, ProviderError> {
        self.read(|ledger| ledger.balance_of(account)).await
    }

    async fn get_bet(&self, bet_id: U256) -> Result<Bet, ProviderError> {
        self.read(|ledger| ledger.bets.iter().find(|bet| bet.id == bet_id).cloned())
            .await?
            .ok_or_else(|| ProviderError::ExecutionReverted("Bet does not exist".to_string()))
    }

    async fn get_betting_event(&self, event_id: &str) -> Result<BettingEvent, ProviderError> {
        self.read(|ledger| {
            ledger
                .events
                .get(event_id)
                .cloned()
                .unwrap_or_else(|| BettingEvent {
                    event_id: String::new(),
                    team_a: String::new(),
                    team_b: String::new(),
                    total_pool: U256::ZERO,
                    team_a_pool: U256::ZERO,
                    team_b_pool: U256::ZERO,
                    is_active: false,
                    is_resolved: false,
                    winner: String::new(),
                    end_time: 0,
                })
        })
        .await
    }

    async fn get_user_bets(&self, user: Address) -> Result<Vec<U256>, ProviderError> {
        self.read(|ledger| {
            ledger
                .bets
                .iter()
                .filter(|bet| bet.bettor == user)
                .map(|bet| bet.id)
                .collect()
        })
        .await
    }

    async fn get_event_bets(&self, event_id: &str) -> Result<Vec<U256>, ProviderError> {
        self.read(|ledger| {
            ledger
                .bets
                .iter()
                .filter(|bet| bet.event_id == event_id)
                .map(|bet| bet.id)
                .collect()
        })
        .await
    }

    async fn get_contract_balance(&self) -> Result<U256, ProviderError> {
        self.read(|ledger| ledger.balance_of(Ledger::treasury())).await
    }

    async fn get_total_bets(&self) -> Result<U256, ProviderError> {
        self.read(|ledger| U256::from(ledger.bets.len())).await
    }
}

impl ContractSigner for FakeContract {
    async fn transfer(&self, to: Address, amount: U256) -> Result<TxHash, ProviderError> {
        self.submit(Op::Transfer, |ledger, from| {
            ledger.transfer(from, to, amount)?;
            Ok(Vec::new())
        })
        .await
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<TxHash, ProviderError> {
        self.submit(Op::Transfer, |ledger, owner| {
            ledger.allowances.insert((owner, spender), amount);
            Ok(Vec::new())
        })
        .await
    }

    async fn transfer_from(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxHash, ProviderError> {
        self.submit(Op::Transfer, |ledger, spender| {
            let allowance = ledger
                .allowances
                .get(&(from, spender))
                .copied()
                .unwrap_or_default();
            if allowance < amount {
                return Err("Insufficient allowance".to_string());
            }
            ledger.transfer(from, to, amount)?;
            ledger.allowances.insert((from, spender), allowance - amount);
            Ok(Vec::new())
        })
        .await
    }

    async fn place_bet(&self, event_id: &str, team: &str) -> Result<TxHash, ProviderError> {
        self.submit(Op::PlaceBet, |ledger, bettor| {
            let stake = ledger.stake;
            Ok(vec![ledger.place_bet(bettor, event_id, team, stake)?])
        })
        .await
    }

    async fn claim_winnings(&self, bet_id: U256) -> Result<TxHash, ProviderError> {
        self.submit(Op::ClaimWinnings, |ledger, bettor| {
            Ok(vec![ledger.claim(bettor, bet_id)?])
        })
        .await
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ProviderError> {
        self.wallet.enter(Op::Receipt).await?;
        self.wallet
            .state()
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| ProviderError::Transport(format!("unknown transaction {tx_hash}")))
    }
}

/// Sepolia and a local node carry the betting contract; the other builtin
/// networks do not.
pub fn test_registry() -> ChainRegistry {
    ChainRegistry::builtin()
        .with_network(ChainRegistry::local_network(crate::registry::DEFAULT_LOCAL_RPC_URL))
        .with_addresses(
            ContractAddressTable::new()
                .with_address(SEPOLIA, sepolia_contract())
                .with_address(LOCAL, local_contract()),
        )
}

/// A wallet on Sepolia holding alice's account, with the betting contract
/// deployed on Sepolia and the local chain and one open match.
pub struct TestContext {
    pub wallet: FakeWallet,
    pub session: Arc<SessionManager<FakeWallet>>,
    pub gateway: BettingGateway<FakeWallet>,
}

impl TestContext {
    pub fn new() -> Self {
        let wallet = FakeWallet::new(SEPOLIA_CHAIN_ID).with_account(alice());
        for (chain_id, contract) in [
            (SEPOLIA_CHAIN_ID, sepolia_contract()),
            (LOCAL_CHAIN_ID, local_contract()),
        ] {
            wallet.deploy(chain_id, contract);
            wallet.ledger(chain_id, contract, |ledger| {
                ledger.mint(alice(), tokens(1_000));
                ledger.mint(bob(), tokens(1_000));
                ledger.create_event(MATCH_ID, HOME_TEAM, AWAY_TEAM);
            });
        }
        wallet.set_native_balance(SEPOLIA_CHAIN_ID, alice(), tokens(2));
        wallet.set_native_balance(LOCAL_CHAIN_ID, alice(), tokens(10_000));
        wallet.state().known_chains.insert(POLYGON_CHAIN_ID);

        let session = Arc::new(SessionManager::new(
            test_registry(),
            ProviderAdapter::new(wallet.clone()),
        ));
        let gateway = BettingGateway::new(session.clone());
        Self {
            wallet,
            session,
            gateway,
        }
    }

    pub async fn connected() -> Self {
        let ctx = Self::new();
        ctx.session.connect().await.expect("connect failed");
        ctx
    }

    pub fn sepolia_ledger<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        self.wallet.ledger(SEPOLIA_CHAIN_ID, sepolia_contract(), f)
    }

    /// Stake the deployed contracts take per bet.
    pub fn set_stake(&self, stake: U256) {
        for (chain_id, contract) in [
            (SEPOLIA_CHAIN_ID, sepolia_contract()),
            (LOCAL_CHAIN_ID, local_contract()),
        ] {
            self.wallet.ledger(chain_id, contract, |ledger| ledger.stake = stake);
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
