use alloy::{
    primitives::B256,
    rpc::types::Log,
    sol,
    sol_types::{
        SolEvent,
        SolEventInterface,
    },
};

sol! {
    /// ERC20 token with a two-sided betting book on top.
    ///
    /// `placeBet` takes no amount; the contract decides how many of the
    /// caller's tokens are staked and reports it in `BetPlaced`.
    #[sol(rpc)]
    contract BettingToken {
        struct Bet {
            uint256 id;
            address bettor;
            uint256 amount;
            string eventId;
            string team;
            bool isWinner;
            bool isClaimed;
            uint256 timestamp;
        }

        struct BettingEvent {
            string eventId;
            string teamA;
            string teamB;
            uint256 totalPool;
            uint256 teamAPool;
            uint256 teamBPool;
            bool isActive;
            bool isResolved;
            string winner;
            uint256 endTime;
        }

        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);

        function placeBet(string calldata eventId, string calldata team) external;
        function claimWinnings(uint256 betId) external;
        function getBet(uint256 betId) external view returns (Bet memory);
        function getBettingEvent(string calldata eventId) external view returns (BettingEvent memory);
        function getUserBets(address user) external view returns (uint256[] memory);
        function getEventBets(string calldata eventId) external view returns (uint256[] memory);
        function getContractBalance() external view returns (uint256);
        function getTotalBets() external view returns (uint256);

        // owner only
        function createBettingEvent(string calldata eventId, string calldata teamA, string calldata teamB, uint256 duration) external;
        function resolveEvent(string calldata eventId, string calldata winner) external;
        function mint(address to, uint256 amount) external;
        function burn(address from, uint256 amount) external;
        function pauseEvent(string calldata eventId) external;
        function activateEvent(string calldata eventId) external;

        event BetPlaced(uint256 betId, address bettor, string eventId, string team, uint256 amount);
        event BetClaimed(uint256 betId, address bettor, uint256 winnings);
        event EventCreated(string eventId, string teamA, string teamB, uint256 endTime);
        event EventResolved(string eventId, string winner);
        event TokensMinted(address to, uint256 amount);
        event TokensBurned(address from, uint256 amount);
    }
}

pub use BettingToken::BettingTokenEvents;

/// Topic hashes of every event the client reconciles against.
pub fn monitored_event_signatures() -> Vec<B256> {
    vec![
        BettingToken::BetPlaced::SIGNATURE_HASH,
        BettingToken::BetClaimed::SIGNATURE_HASH,
        BettingToken::EventCreated::SIGNATURE_HASH,
        BettingToken::EventResolved::SIGNATURE_HASH,
        BettingToken::TokensMinted::SIGNATURE_HASH,
        BettingToken::TokensBurned::SIGNATURE_HASH,
    ]
}

/// Decode a log emitted by the betting contract. Logs from other contracts or
/// with unknown topics yield `None`.
pub fn decode_betting_log(log: &Log) -> Option<BettingTokenEvents> {
    BettingTokenEvents::decode_log(log.as_ref())
        .ok()
        .map(|decoded| decoded.data)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use alloy::primitives::{
        Address,
        U256,
    };

    fn log_for(data: alloy::primitives::LogData) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0x11),
                data,
            },
            ..Default::default()
        }
    }

    #[test]
    fn decode_betting_log__reads_bet_placed() {
        // given
        let event = BettingToken::BetPlaced {
            betId: U256::from(7),
            bettor: Address::repeat_byte(0xaa),
            eventId: "match_001".to_string(),
            team: "Liverpool".to_string(),
            amount: U256::from(1_000),
        };
        let log = log_for(event.encode_log_data());

        // when
        let decoded = decode_betting_log(&log);

        // then
        match decoded {
            Some(BettingTokenEvents::BetPlaced(placed)) => {
                assert_eq!(placed.betId, U256::from(7));
                assert_eq!(placed.team, "Liverpool");
                assert_eq!(placed.amount, U256::from(1_000));
            }
            _ => panic!("expected BetPlaced"),
        }
    }

    #[test]
    fn decode_betting_log__ignores_foreign_topics() {
        // given
        let data = alloy::primitives::LogData::new_unchecked(
            vec![B256::repeat_byte(0x42)],
            Default::default(),
        );

        // when
        let decoded = decode_betting_log(&log_for(data));

        // then
        assert!(decoded.is_none());
    }

    #[test]
    fn place_bet_call__takes_event_and_team_only() {
        use alloy::sol_types::SolCall;

        // given
        let call = BettingToken::placeBetCall {
            eventId: "match_001".to_string(),
            team: "Liverpool".to_string(),
        };

        // when
        let encoded = call.abi_encode();

        // then
        assert_eq!(BettingToken::placeBetCall::SIGNATURE, "placeBet(string,string)");
        assert_eq!(&encoded[..4], BettingToken::placeBetCall::SELECTOR.as_slice());
    }

    #[test]
    fn monitored_event_signatures__are_distinct() {
        let mut hashes = monitored_event_signatures();
        hashes.sort();
        hashes.dedup();
        assert_eq!(hashes.len(), 6);
    }
}
