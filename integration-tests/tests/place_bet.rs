#![allow(non_snake_case)]

use alloy::primitives::U256;
use betting_session::{
    BetRejection,
    ConnectionState,
    Error,
    test_helpers::*,
};
use proptest::prelude::*;
use tokio::runtime::Builder;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 10, .. ProptestConfig::default() })]
    #[test]
    fn place_bet__debits_the_stake_the_contract_takes(whole in 1u64..=1_000u64) {
        block_on(_place_bet__debits_the_stake_the_contract_takes(whole)).unwrap();
    }

    #[test]
    fn place_bet__over_balance_never_reaches_wallet(whole in 1_001u64..=1_000_000u64) {
        block_on(_place_bet__over_balance_never_reaches_wallet(whole)).unwrap();
    }
}

async fn _place_bet__debits_the_stake_the_contract_takes(whole: u64) -> Result<(), TestCaseError> {
    // given
    let ctx = TestContext::connected().await;
    ctx.set_stake(tokens(whole));

    // when
    ctx.gateway
        .place_bet(MATCH_ID, HOME_TEAM, tokens(whole))
        .await
        .unwrap();

    // then
    let expected = tokens(1_000) - tokens(whole);
    prop_assert_eq!(ctx.session.snapshot().token_balance, expected);
    prop_assert_eq!(ctx.sepolia_ledger(|ledger| ledger.balance_of(alice())), expected);
    Ok(())
}

async fn _place_bet__over_balance_never_reaches_wallet(whole: u64) -> Result<(), TestCaseError> {
    let ctx = TestContext::connected().await;
    ctx.wallet.reset_calls();

    // when
    let result = ctx.gateway.place_bet(MATCH_ID, HOME_TEAM, tokens(whole)).await;

    // then
    prop_assert_eq!(
        result,
        Err(Error::InvalidBetRequest(BetRejection::InsufficientBalance {
            requested: tokens(whole),
            available: tokens(1_000),
        }))
    );
    prop_assert_eq!(ctx.wallet.total_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn place_bet__confirms_and_reports_new_bet() {
    // given
    let ctx = TestContext::connected().await;
    ctx.set_stake(tokens(100));

    // when
    let placement = ctx
        .gateway
        .place_bet(MATCH_ID, AWAY_TEAM, tokens(100))
        .await
        .unwrap();

    // then
    assert_eq!(placement.bet_id, Some(U256::from(1)));
    assert!(placement.block_number.is_some());
    assert_eq!(placement.bets.len(), 1);
    let bet = &placement.bets[0];
    assert_eq!(bet.bettor, alice());
    assert_eq!(bet.event_id, MATCH_ID);
    assert_eq!(bet.team, AWAY_TEAM);
    assert_eq!(bet.amount, tokens(100));
    assert!(!bet.is_winner);
    assert!(!bet.is_claimed);

    assert_eq!(ctx.session.snapshot().token_balance, tokens(900));
    let event = ctx.gateway.cached_event(MATCH_ID).unwrap();
    assert_eq!(event.team_b_pool, tokens(100));
    assert_eq!(event.total_pool, tokens(100));
    assert_eq!(ctx.gateway.open_bets().len(), 1);
}

#[tokio::test]
async fn place_bet__pools_match_contract_after_several_bets() {
    let ctx = TestContext::connected().await;

    // when
    ctx.set_stake(tokens(30));
    ctx.gateway
        .place_bet(MATCH_ID, HOME_TEAM, tokens(30))
        .await
        .unwrap();
    ctx.set_stake(tokens(20));
    ctx.gateway
        .place_bet(MATCH_ID, AWAY_TEAM, tokens(20))
        .await
        .unwrap();

    // then
    let cached = ctx.gateway.cached_event(MATCH_ID).unwrap();
    let on_chain = ctx.gateway.get_event(MATCH_ID).await.unwrap().unwrap();
    assert_eq!(cached, on_chain);
    assert_eq!(on_chain.total_pool, tokens(50));
    assert_eq!(on_chain.pool_share_bps(HOME_TEAM), 6_000);
    assert_eq!(ctx.gateway.my_bets().await.unwrap().len(), 2);
}

#[tokio::test]
async fn place_bet__call_carries_no_amount_and_reports_contract_stake() {
    // given
    let ctx = TestContext::connected().await;
    ctx.set_stake(tokens(40));

    // when
    let placement = ctx
        .gateway
        .place_bet(MATCH_ID, HOME_TEAM, tokens(1))
        .await
        .unwrap();

    // then
    assert_eq!(placement.bets[0].amount, tokens(40));
    assert_eq!(ctx.session.snapshot().token_balance, tokens(960));
    let event = ctx.gateway.cached_event(MATCH_ID).unwrap();
    assert_eq!(event.team_a_pool, tokens(40));
}

#[tokio::test]
async fn place_bet__zero_amount_is_rejected_without_wallet_calls() {
    let ctx = TestContext::connected().await;
    ctx.wallet.reset_calls();

    let result = ctx.gateway.place_bet(MATCH_ID, HOME_TEAM, U256::ZERO).await;

    assert_eq!(
        result,
        Err(Error::InvalidBetRequest(BetRejection::NonPositiveAmount))
    );
    assert_eq!(ctx.wallet.total_calls(), 0);
}

#[tokio::test]
async fn place_bet__unknown_team_is_rejected_before_submission() {
    let ctx = TestContext::connected().await;

    let result = ctx.gateway.place_bet(MATCH_ID, "Chelsea", tokens(1)).await;

    assert_eq!(
        result,
        Err(Error::InvalidBetRequest(BetRejection::UnknownTeam {
            team: "Chelsea".to_string(),
            event_id: MATCH_ID.to_string(),
        }))
    );
    assert_eq!(ctx.wallet.calls_to(Op::PlaceBet), 0);
}

#[tokio::test]
async fn place_bet__paused_event_is_closed() {
    // given
    let ctx = TestContext::connected().await;
    ctx.sepolia_ledger(|ledger| ledger.pause_event(MATCH_ID));

    // when
    let result = ctx.gateway.place_bet(MATCH_ID, HOME_TEAM, tokens(1)).await;

    // then
    assert_eq!(
        result,
        Err(Error::InvalidBetRequest(BetRejection::EventClosed {
            event_id: MATCH_ID.to_string(),
        }))
    );
    assert_eq!(ctx.wallet.calls_to(Op::PlaceBet), 0);
}

#[tokio::test]
async fn place_bet__unknown_event_is_rejected() {
    let ctx = TestContext::connected().await;

    let result = ctx.gateway.place_bet("match_404", HOME_TEAM, tokens(1)).await;

    assert_eq!(
        result,
        Err(Error::InvalidBetRequest(BetRejection::UnknownEvent {
            event_id: "match_404".to_string(),
        }))
    );
    assert_eq!(ctx.gateway.cached_event("match_404"), None);
}

#[tokio::test]
async fn place_bet__requires_connected_session() {
    let ctx = TestContext::new();

    let result = ctx.gateway.place_bet(MATCH_ID, HOME_TEAM, tokens(1)).await;

    assert_eq!(
        result,
        Err(Error::InvalidBetRequest(BetRejection::NotConnected {
            state: ConnectionState::Disconnected,
        }))
    );
    assert_eq!(ctx.wallet.total_calls(), 0);
}

#[tokio::test]
async fn place_bet__network_without_contract_is_unavailable() {
    // given
    let ctx = TestContext::connected().await;
    ctx.session.switch_to_network("polygon").await.unwrap();
    ctx.wallet.reset_calls();

    // when
    let result = ctx.gateway.place_bet(MATCH_ID, HOME_TEAM, tokens(1)).await;

    // then
    assert_eq!(
        result,
        Err(Error::BettingUnavailable {
            chain_id: POLYGON_CHAIN_ID
        })
    );
    assert_eq!(ctx.wallet.total_calls(), 0);
}

#[tokio::test]
async fn place_bet__second_submission_is_refused_while_first_waits_for_hash() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet.hold(Op::PlaceBet);

    // when
    let (first, second) = tokio::join!(
        ctx.gateway.place_bet(MATCH_ID, HOME_TEAM, tokens(10)),
        async {
            tokio::task::yield_now().await;
            let second = ctx.gateway.place_bet(MATCH_ID, HOME_TEAM, tokens(10)).await;
            ctx.wallet.release(Op::PlaceBet);
            second
        }
    );

    // then
    assert!(first.is_ok());
    assert_eq!(second, Err(Error::SubmissionInFlight));
    assert_eq!(ctx.wallet.calls_to(Op::PlaceBet), 1);
    assert_eq!(ctx.session.snapshot().token_balance, tokens(990));
}

#[tokio::test]
async fn place_bet__next_submission_allowed_once_hash_is_known() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet.hold(Op::Receipt);

    // when
    let (first, second) = tokio::join!(
        ctx.gateway.place_bet(MATCH_ID, HOME_TEAM, tokens(10)),
        async {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            let second = ctx.gateway.place_bet(MATCH_ID, AWAY_TEAM, tokens(5));
            let release = async {
                tokio::task::yield_now().await;
                ctx.wallet.release(Op::Receipt);
            };
            let (second, ()) = tokio::join!(second, release);
            second
        }
    );

    // then
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(ctx.wallet.calls_to(Op::PlaceBet), 2);
    assert_eq!(ctx.session.snapshot().token_balance, tokens(980));
}

#[tokio::test]
async fn place_bet__reverted_transaction_leaves_balance() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet.state().revert_next = true;

    // when
    let result = ctx.gateway.place_bet(MATCH_ID, HOME_TEAM, tokens(10)).await;

    // then
    assert!(matches!(
        result,
        Err(Error::TransactionReverted {
            tx_hash: Some(_),
            ..
        })
    ));
    assert_eq!(ctx.session.snapshot().token_balance, tokens(1_000));
    assert_eq!(
        ctx.sepolia_ledger(|ledger| ledger.balance_of(alice())),
        tokens(1_000)
    );
    assert!(!ctx.session.has_pending_submission());
}

#[tokio::test]
async fn place_bet__rejected_in_wallet() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet.state().reject_transactions = true;

    // when
    let result = ctx.gateway.place_bet(MATCH_ID, HOME_TEAM, tokens(10)).await;

    // then
    assert_eq!(result, Err(Error::UserRejected));
    assert!(ctx.sepolia_ledger(|ledger| ledger.bets.is_empty()));
    // lock released, so a retry goes through
    ctx.wallet.state().reject_transactions = false;
    assert!(
        ctx.gateway
            .place_bet(MATCH_ID, HOME_TEAM, tokens(10))
            .await
            .is_ok()
    );
}
