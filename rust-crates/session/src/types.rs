use alloy::primitives::{
    Address,
    U256,
};
use generated_abi::BettingToken;
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::BTreeMap;

const BPS: u64 = 10_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BettingEvent {
    pub event_id: String,
    pub team_a: String,
    pub team_b: String,
    pub total_pool: U256,
    pub team_a_pool: U256,
    pub team_b_pool: U256,
    pub is_active: bool,
    pub is_resolved: bool,
    pub winner: String,
    pub end_time: u64,
}

impl BettingEvent {
    pub fn has_team(&self, team: &str) -> bool {
        self.team_a == team || self.team_b == team
    }

    pub fn accepts_bets(&self) -> bool {
        self.is_active && !self.is_resolved
    }

    /// The contract reports an unknown event as a zeroed struct.
    pub fn exists(&self) -> bool {
        !self.event_id.is_empty()
    }

    /// Pools add up, and a resolved event is closed with one of its own
    /// teams as winner.
    pub fn is_consistent(&self) -> bool {
        let pools_match = self
            .team_a_pool
            .checked_add(self.team_b_pool)
            .is_some_and(|sum| sum == self.total_pool);
        let resolution_ok =
            !self.is_resolved || (!self.is_active && self.has_team(&self.winner));
        pools_match && resolution_ok
    }

    /// Share of the total pool backing `team`, in basis points. Zero for an
    /// empty pool or a team that is not playing.
    pub fn pool_share_bps(&self, team: &str) -> u64 {
        let pool = if team == self.team_a {
            self.team_a_pool
        } else if team == self.team_b {
            self.team_b_pool
        } else {
            return 0;
        };
        if self.total_pool.is_zero() {
            return 0;
        }
        let share = pool.saturating_mul(U256::from(BPS)) / self.total_pool;
        share.saturating_to::<u64>()
    }

    pub(crate) fn record_stake(&mut self, team: &str, amount: U256) {
        if team == self.team_a {
            self.team_a_pool = self.team_a_pool.saturating_add(amount);
        } else if team == self.team_b {
            self.team_b_pool = self.team_b_pool.saturating_add(amount);
        } else {
            return;
        }
        self.total_pool = self.total_pool.saturating_add(amount);
    }

    pub(crate) fn resolve(&mut self, winner: &str) {
        self.is_active = false;
        self.is_resolved = true;
        self.winner = winner.to_string();
    }
}

impl From<BettingToken::BettingEvent> for BettingEvent {
    fn from(raw: BettingToken::BettingEvent) -> Self {
        Self {
            event_id: raw.eventId,
            team_a: raw.teamA,
            team_b: raw.teamB,
            total_pool: raw.totalPool,
            team_a_pool: raw.teamAPool,
            team_b_pool: raw.teamBPool,
            is_active: raw.isActive,
            is_resolved: raw.isResolved,
            winner: raw.winner,
            end_time: raw.endTime.saturating_to::<u64>(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub id: U256,
    pub bettor: Address,
    pub amount: U256,
    pub event_id: String,
    pub team: String,
    pub is_winner: bool,
    pub is_claimed: bool,
    pub timestamp: u64,
}

impl Bet {
    pub fn is_claimable(&self) -> bool {
        self.is_winner && !self.is_claimed
    }
}

impl From<BettingToken::Bet> for Bet {
    fn from(raw: BettingToken::Bet) -> Self {
        Self {
            id: raw.id,
            bettor: raw.bettor,
            amount: raw.amount,
            event_id: raw.eventId,
            team: raw.team,
            is_winner: raw.isWinner,
            is_claimed: raw.isClaimed,
            timestamp: raw.timestamp.saturating_to::<u64>(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStats {
    pub contract_balance: U256,
    pub total_bets: U256,
}

/// Locally known bets, keyed by contract-assigned id.
#[derive(Clone, Debug, Default)]
pub struct BetBook {
    bets: BTreeMap<U256, Bet>,
}

impl BetBook {
    pub fn get(&self, id: &U256) -> Option<&Bet> {
        self.bets.get(id)
    }

    pub fn upsert(&mut self, bet: Bet) {
        self.bets.insert(bet.id, bet);
    }

    /// Replace everything known about `account` with a fresh snapshot.
    pub fn replace_for(&mut self, account: Address, bets: &[Bet]) {
        self.bets.retain(|_, bet| bet.bettor != account);
        for bet in bets {
            self.upsert(bet.clone());
        }
    }

    pub fn mark_claimed(&mut self, id: &U256) -> bool {
        match self.bets.get_mut(id) {
            Some(bet) => {
                bet.is_claimed = true;
                true
            }
            None => false,
        }
    }

    /// Mark bets on a freshly resolved event. Claimed flags are left alone.
    pub fn settle(&mut self, event_id: &str, winner: &str) {
        for bet in self.bets.values_mut().filter(|bet| bet.event_id == event_id) {
            bet.is_winner = bet.team == winner;
        }
    }

    pub fn for_account(&self, account: Address) -> Vec<Bet> {
        self.bets
            .values()
            .filter(|bet| bet.bettor == account)
            .cloned()
            .collect()
    }

    pub fn claimable(&self, account: Address) -> Vec<Bet> {
        self.bets
            .values()
            .filter(|bet| bet.bettor == account && bet.is_claimable())
            .cloned()
            .collect()
    }

    /// Bets whose event has not been resolved according to `is_resolved`.
    pub fn open(&self, account: Address, is_resolved: impl Fn(&str) -> bool) -> Vec<Bet> {
        self.bets
            .values()
            .filter(|bet| bet.bettor == account && !is_resolved(&bet.event_id))
            .cloned()
            .collect()
    }

    pub fn total_wagered(&self, account: Address) -> U256 {
        self.bets
            .values()
            .filter(|bet| bet.bettor == account)
            .fold(U256::ZERO, |acc, bet| acc.saturating_add(bet.amount))
    }

    pub fn clear(&mut self) {
        self.bets.clear();
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }
}
