use alloy::{
    primitives::{
        Address,
        U256,
    },
    rpc::types::Log,
};
use generated_abi::{
    BettingTokenEvents,
    decode_betting_log,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub enum ContractEvent {
    BetPlaced(BetPlacedEvent),
    BetClaimed(BetClaimedEvent),
    EventCreated(EventCreatedEvent),
    EventResolved(EventResolvedEvent),
    TokensMinted(TokensMovedEvent),
    TokensBurned(TokensMovedEvent),
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct BetPlacedEvent {
    pub bet_id: U256,
    pub bettor: Address,
    pub event_id: String,
    pub team: String,
    pub amount: U256,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct BetClaimedEvent {
    pub bet_id: U256,
    pub bettor: Address,
    pub winnings: U256,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct EventCreatedEvent {
    pub event_id: String,
    pub team_a: String,
    pub team_b: String,
    pub end_time: u64,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct EventResolvedEvent {
    pub event_id: String,
    pub winner: String,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct TokensMovedEvent {
    pub account: Address,
    pub amount: U256,
}

impl ContractEvent {
    /// Account whose token balance this event changes, if any.
    pub fn balance_holder(&self) -> Option<Address> {
        match self {
            ContractEvent::BetPlaced(ev) => Some(ev.bettor),
            ContractEvent::BetClaimed(ev) => Some(ev.bettor),
            ContractEvent::TokensMinted(ev) | ContractEvent::TokensBurned(ev) => {
                Some(ev.account)
            }
            ContractEvent::EventCreated(_) | ContractEvent::EventResolved(_) => None,
        }
    }
}

impl From<BettingTokenEvents> for ContractEvent {
    fn from(raw: BettingTokenEvents) -> Self {
        match raw {
            BettingTokenEvents::BetPlaced(ev) => ContractEvent::BetPlaced(BetPlacedEvent {
                bet_id: ev.betId,
                bettor: ev.bettor,
                event_id: ev.eventId,
                team: ev.team,
                amount: ev.amount,
            }),
            BettingTokenEvents::BetClaimed(ev) => {
                ContractEvent::BetClaimed(BetClaimedEvent {
                    bet_id: ev.betId,
                    bettor: ev.bettor,
                    winnings: ev.winnings,
                })
            }
            BettingTokenEvents::EventCreated(ev) => {
                ContractEvent::EventCreated(EventCreatedEvent {
                    event_id: ev.eventId,
                    team_a: ev.teamA,
                    team_b: ev.teamB,
                    end_time: ev.endTime.saturating_to::<u64>(),
                })
            }
            BettingTokenEvents::EventResolved(ev) => {
                ContractEvent::EventResolved(EventResolvedEvent {
                    event_id: ev.eventId,
                    winner: ev.winner,
                })
            }
            BettingTokenEvents::TokensMinted(ev) => {
                ContractEvent::TokensMinted(TokensMovedEvent {
                    account: ev.to,
                    amount: ev.amount,
                })
            }
            BettingTokenEvents::TokensBurned(ev) => {
                ContractEvent::TokensBurned(TokensMovedEvent {
                    account: ev.from,
                    amount: ev.amount,
                })
            }
        }
    }
}

/// Decode the betting events out of receipt logs, skipping anything emitted
/// by other contracts.
pub fn parse_event_logs(contract: Address, logs: &[Log]) -> Vec<ContractEvent> {
    logs.iter()
        .filter(|log| log.address() == contract)
        .filter_map(decode_betting_log)
        .map(ContractEvent::from)
        .collect()
}
