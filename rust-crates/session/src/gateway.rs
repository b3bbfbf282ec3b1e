use crate::{
    error::{
        BetRejection,
        Error,
        Result,
    },
    events::ContractEvent,
    session::{
        ConnectionState,
        Session,
        SessionManager,
    },
    types::{
        Bet,
        BetBook,
        BettingEvent,
        ContractStats,
        TokenInfo,
    },
    wallet::{
        ContractReader,
        ContractSigner,
        TxReceipt,
        WalletProvider,
    },
};
use alloy::primitives::{
    Address,
    TxHash,
    U256,
};
use futures::future::try_join_all;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
};
use tracing::{
    debug,
    info,
    warn,
};

/// Confirmed outcome of a bet placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BetPlacement {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// Id the contract assigned, when the receipt carried a `BetPlaced` log.
    pub bet_id: Option<U256>,
    /// The connected account's bets after the placement.
    pub bets: Vec<Bet>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub bet_id: U256,
    pub winnings: Option<U256>,
}

/// What the gateway has seen of one contract deployment. Dropped whenever the
/// session moves to another contract.
#[derive(Default)]
struct ContractView {
    contract: Option<Address>,
    bets: BetBook,
    events: HashMap<String, BettingEvent>,
}

/// Contract operations for the connected session.
pub struct BettingGateway<W> {
    session: Arc<SessionManager<W>>,
    submit_lock: tokio::sync::Mutex<()>,
    view: Mutex<ContractView>,
}

impl<W> BettingGateway<W> {
    pub fn new(session: Arc<SessionManager<W>>) -> Self {
        Self {
            session,
            submit_lock: tokio::sync::Mutex::new(()),
            view: Mutex::new(ContractView::default()),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager<W>> {
        &self.session
    }

    fn view_for(&self, contract: Address) -> MutexGuard<'_, ContractView> {
        let mut view = self.view.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if view.contract != Some(contract) {
            debug!(%contract, "contract changed, dropping cached bets and events");
            *view = ContractView {
                contract: Some(contract),
                ..ContractView::default()
            };
        }
        view
    }

    /// Locally known bets of the connected account that won and are unclaimed.
    pub fn claimable_bets(&self) -> Vec<Bet> {
        let snapshot = self.session.snapshot();
        match (snapshot.account, snapshot.contract) {
            (Some(account), Some(contract)) => self.view_for(contract).bets.claimable(account),
            _ => Vec::new(),
        }
    }

    /// Locally known bets of the connected account on events not yet
    /// resolved.
    pub fn open_bets(&self) -> Vec<Bet> {
        let snapshot = self.session.snapshot();
        let (Some(account), Some(contract)) = (snapshot.account, snapshot.contract) else {
            return Vec::new();
        };
        let view = self.view_for(contract);
        view.bets.open(account, |event_id| {
            view.events
                .get(event_id)
                .is_some_and(|event| event.is_resolved)
        })
    }

    pub fn cached_event(&self, event_id: &str) -> Option<BettingEvent> {
        let contract = self.session.snapshot().contract?;
        self.view_for(contract).events.get(event_id).cloned()
    }

    /// Fold contract events into the local view. Returns `true` when one of
    /// them moved the connected account's token balance.
    pub fn reconcile(&self, events: &[ContractEvent]) -> bool {
        let snapshot = self.session.snapshot();
        let Some(contract) = snapshot.contract else {
            return false;
        };
        let mut guard = self.view_for(contract);
        let view = &mut *guard;
        let mut touches_account = false;
        for event in events {
            if snapshot.account.is_some() && event.balance_holder() == snapshot.account {
                touches_account = true;
            }
            match event {
                ContractEvent::BetPlaced(placed) => {
                    if let Some(cached) = view.events.get_mut(&placed.event_id) {
                        if view.bets.get(&placed.bet_id).is_none() {
                            cached.record_stake(&placed.team, placed.amount);
                        }
                    }
                }
                ContractEvent::BetClaimed(claimed) => {
                    view.bets.mark_claimed(&claimed.bet_id);
                }
                ContractEvent::EventCreated(created) => {
                    view.events.insert(
                        created.event_id.clone(),
                        BettingEvent {
                            event_id: created.event_id.clone(),
                            team_a: created.team_a.clone(),
                            team_b: created.team_b.clone(),
                            total_pool: U256::ZERO,
                            team_a_pool: U256::ZERO,
                            team_b_pool: U256::ZERO,
                            is_active: true,
                            is_resolved: false,
                            winner: String::new(),
                            end_time: created.end_time,
                        },
                    );
                }
                ContractEvent::EventResolved(resolved) => {
                    if let Some(cached) = view.events.get_mut(&resolved.event_id) {
                        cached.resolve(&resolved.winner);
                    }
                    view.bets.settle(&resolved.event_id, &resolved.winner);
                }
                ContractEvent::TokensMinted(_) | ContractEvent::TokensBurned(_) => {}
            }
        }
        touches_account
    }
}

fn contract_of(session: &Session) -> Result<Address> {
    let chain_id = session.chain_id.ok_or(Error::NoSigner)?;
    if session.network.is_none() {
        return Err(Error::UnsupportedNetwork { chain_id });
    }
    session.contract.ok_or(Error::BettingUnavailable { chain_id })
}

fn rejected(rejection: BetRejection) -> Error {
    debug!(%rejection, "bet request rejected before submission");
    Error::InvalidBetRequest(rejection)
}

fn ensure_confirmed(receipt: &TxReceipt) -> Result<()> {
    if receipt.success {
        Ok(())
    } else {
        Err(Error::TransactionReverted {
            tx_hash: Some(receipt.tx_hash),
            reason: "status 0 receipt".to_string(),
        })
    }
}

impl<W: WalletProvider> BettingGateway<W> {
    fn reader(&self) -> Result<(Session, W::Reader)> {
        let snapshot = self.session.snapshot();
        if !snapshot.is_connected() {
            return Err(Error::NoSigner);
        }
        let contract = contract_of(&snapshot)?;
        let reader = self.session.adapter().read_only_contract(contract)?;
        Ok((snapshot, reader))
    }

    /// Stake `amount` of the betting token on `team` in `event_id` and wait
    /// for confirmation.
    ///
    /// Requests that cannot succeed are rejected before anything is sent to
    /// the wallet. Only one submission may wait for its hash at a time.
    ///
    /// The contract call carries no amount: `amount` only gates the request
    /// locally, and the stake the contract actually took is read back from
    /// the `BetPlaced` event.
    pub async fn place_bet(
        &self,
        event_id: &str,
        team: &str,
        amount: U256,
    ) -> Result<BetPlacement> {
        let snapshot = self.session.snapshot();
        let account = match (snapshot.connection_state, snapshot.account) {
            (ConnectionState::Connected, Some(account)) => account,
            (state, _) => {
                return Err(rejected(BetRejection::NotConnected {
                    state,
                }));
            }
        };
        let contract = contract_of(&snapshot)?;
        if amount.is_zero() {
            return Err(rejected(BetRejection::NonPositiveAmount));
        }
        if amount > snapshot.token_balance {
            return Err(rejected(BetRejection::InsufficientBalance {
                requested: amount,
                available: snapshot.token_balance,
            }));
        }
        let event = self.load_event(contract, event_id).await?;
        if !event.exists() {
            return Err(rejected(BetRejection::UnknownEvent {
                event_id: event_id.to_string(),
            }));
        }
        if !event.has_team(team) {
            return Err(rejected(BetRejection::UnknownTeam {
                team: team.to_string(),
                event_id: event_id.to_string(),
            }));
        }
        if !event.accepts_bets() {
            return Err(rejected(BetRejection::EventClosed {
                event_id: event_id.to_string(),
            }));
        }

        let receipt = {
            let submitting = self
                .submit_lock
                .try_lock()
                .map_err(|_| Error::SubmissionInFlight)?;
            let _pending = self.session.begin_submission();
            let signer = self
                .session
                .adapter()
                .signing_contract(contract, Some(account))?;
            info!(%account, event_id, team, %amount, "submitting bet");
            let tx_hash = signer.place_bet(event_id, team).await?;
            drop(submitting);
            debug!(%tx_hash, "bet submitted, waiting for confirmation");
            let receipt = signer.wait_for_receipt(tx_hash).await?;
            ensure_confirmed(&receipt)?;
            receipt
        };
        info!(tx_hash = %receipt.tx_hash, block = ?receipt.block_number, "bet confirmed");

        let bet_id = receipt.events.iter().find_map(|event| match event {
            ContractEvent::BetPlaced(placed) if placed.bettor == account => {
                Some(placed.bet_id)
            }
            _ => None,
        });
        self.reconcile(&receipt.events);
        self.refresh_after_submission().await;
        let bets = match self.list_user_bets(account).await {
            Ok(bets) => bets,
            Err(err) => {
                warn!(%err, "bet confirmed but reloading bets failed");
                self.view_for(contract).bets.for_account(account)
            }
        };
        Ok(BetPlacement {
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            bet_id,
            bets,
        })
    }

    /// Claim the payout of a winning, unclaimed bet of the connected account.
    pub async fn claim_winnings(&self, bet_id: U256) -> Result<ClaimOutcome> {
        let snapshot = self.session.snapshot();
        let account = match (snapshot.connection_state, snapshot.account) {
            (ConnectionState::Connected, Some(account)) => account,
            _ => return Err(Error::NoSigner),
        };
        let contract = contract_of(&snapshot)?;
        let claimable = self
            .view_for(contract)
            .bets
            .get(&bet_id)
            .is_some_and(|bet| bet.bettor == account && bet.is_claimable());
        if !claimable {
            return Err(Error::NothingToClaim { bet_id });
        }

        let receipt = {
            let submitting = self
                .submit_lock
                .try_lock()
                .map_err(|_| Error::SubmissionInFlight)?;
            let _pending = self.session.begin_submission();
            let signer = self
                .session
                .adapter()
                .signing_contract(contract, Some(account))?;
            info!(%account, %bet_id, "submitting claim");
            let tx_hash = signer.claim_winnings(bet_id).await?;
            drop(submitting);
            let receipt = signer.wait_for_receipt(tx_hash).await?;
            ensure_confirmed(&receipt)?;
            receipt
        };
        info!(tx_hash = %receipt.tx_hash, %bet_id, "claim confirmed");

        self.view_for(contract).bets.mark_claimed(&bet_id);
        let winnings = receipt.events.iter().find_map(|event| match event {
            ContractEvent::BetClaimed(claimed) if claimed.bet_id == bet_id => {
                Some(claimed.winnings)
            }
            _ => None,
        });
        self.reconcile(&receipt.events);
        self.refresh_after_submission().await;
        Ok(ClaimOutcome {
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            bet_id,
            winnings,
        })
    }

    async fn refresh_after_submission(&self) {
        if let Err(err) = self.session.refresh_balances().await {
            warn!(%err, "transaction confirmed but balance refresh failed");
        }
    }

    /// Fold contract events into the local view and refresh balances when
    /// the connected account was involved.
    pub async fn apply_events(&self, events: &[ContractEvent]) -> Result<()> {
        if self.reconcile(events) {
            self.session.refresh_balances().await?;
        }
        Ok(())
    }

    async fn load_event(&self, contract: Address, event_id: &str) -> Result<BettingEvent> {
        if let Some(cached) = self.view_for(contract).events.get(event_id) {
            return Ok(cached.clone());
        }
        let reader = self.session.adapter().read_only_contract(contract)?;
        let event = reader.get_betting_event(event_id).await?;
        self.remember_event(contract, &event);
        Ok(event)
    }

    fn remember_event(&self, contract: Address, event: &BettingEvent) {
        if !event.exists() {
            return;
        }
        if !event.is_consistent() {
            warn!(event_id = %event.event_id, "contract reported an inconsistent event");
        }
        self.view_for(contract)
            .events
            .insert(event.event_id.clone(), event.clone());
    }

    /// Every bet `account` placed on the active contract.
    pub async fn list_user_bets(&self, account: Address) -> Result<Vec<Bet>> {
        let (snapshot, reader) = self.reader()?;
        let ids = reader.get_user_bets(account).await?;
        let bets = try_join_all(ids.into_iter().map(|id| reader.get_bet(id))).await?;
        if let Some(contract) = snapshot.contract {
            self.view_for(contract).bets.replace_for(account, &bets);
        }
        debug!(%account, count = bets.len(), "loaded bets");
        Ok(bets)
    }

    /// Bets of the connected account.
    pub async fn my_bets(&self) -> Result<Vec<Bet>> {
        let account = self.session.snapshot().account.ok_or(Error::NoSigner)?;
        self.list_user_bets(account).await
    }

    /// Look up an event. `None` when the contract does not know the id.
    pub async fn get_event(&self, event_id: &str) -> Result<Option<BettingEvent>> {
        let (snapshot, reader) = self.reader()?;
        let event = reader.get_betting_event(event_id).await?;
        if !event.exists() {
            return Ok(None);
        }
        if let Some(contract) = snapshot.contract {
            self.remember_event(contract, &event);
        }
        Ok(Some(event))
    }

    pub async fn list_event_bets(&self, event_id: &str) -> Result<Vec<Bet>> {
        let (snapshot, reader) = self.reader()?;
        let ids = reader.get_event_bets(event_id).await?;
        let bets = try_join_all(ids.into_iter().map(|id| reader.get_bet(id))).await?;
        if let Some(contract) = snapshot.contract {
            let mut view = self.view_for(contract);
            for bet in &bets {
                view.bets.upsert(bet.clone());
            }
        }
        Ok(bets)
    }

    pub async fn token_info(&self) -> Result<TokenInfo> {
        let (_, reader) = self.reader()?;
        let (name, symbol, decimals, total_supply) = futures::try_join!(
            reader.name(),
            reader.symbol(),
            reader.decimals(),
            reader.total_supply(),
        )?;
        Ok(TokenInfo {
            name,
            symbol,
            decimals,
            total_supply,
        })
    }

    pub async fn contract_stats(&self) -> Result<ContractStats> {
        let (_, reader) = self.reader()?;
        let (contract_balance, total_bets) =
            futures::try_join!(reader.get_contract_balance(), reader.get_total_bets())?;
        Ok(ContractStats {
            contract_balance,
            total_bets,
        })
    }
}
