#![allow(non_snake_case)]

use betting_session::{
    ConnectionState,
    Error,
    ProviderError,
    test_helpers::*,
};

#[tokio::test]
async fn switch_to_network__adds_unknown_chain_then_switches() {
    let ctx = TestContext::connected().await;

    // when
    ctx.session.switch_to_network("local").await.unwrap();

    // then
    let session = ctx.session.snapshot();
    assert_eq!(session.connection_state, ConnectionState::Connected);
    assert_eq!(session.chain_id, Some(LOCAL_CHAIN_ID));
    assert_eq!(session.network.as_deref(), Some("local"));
    assert_eq!(session.contract, Some(local_contract()));
    assert_eq!(session.native_balance, tokens(10_000));
    assert_eq!(session.token_balance, tokens(1_000));
    assert_eq!(ctx.wallet.calls_to(Op::AddChain), 1);
    assert_eq!(ctx.wallet.calls_to(Op::SwitchChain), 2);
}

#[tokio::test]
async fn switch_to_network__known_chain_without_contract() {
    let ctx = TestContext::connected().await;

    // when
    ctx.session.switch_to_network("polygon").await.unwrap();

    // then
    let session = ctx.session.snapshot();
    assert_eq!(session.chain_id, Some(POLYGON_CHAIN_ID));
    assert_eq!(session.network.as_deref(), Some("polygon"));
    assert_eq!(session.contract, None);
    assert_eq!(ctx.wallet.calls_to(Op::AddChain), 0);
}

#[tokio::test]
async fn switch_to_network__testnet_without_contract_resets_token_balance() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet
        .set_native_balance(MUMBAI_CHAIN_ID, alice(), tokens(3));

    // when
    ctx.session.switch_to_network("mumbai").await.unwrap();

    // then
    let session = ctx.session.snapshot();
    assert_eq!(session.chain_id, Some(MUMBAI_CHAIN_ID));
    assert_eq!(session.native_balance, tokens(3));
    assert_eq!(session.token_balance_display(), "0");
    ctx.wallet.reset_calls();
    let bet = ctx.gateway.place_bet(MATCH_ID, HOME_TEAM, tokens(1)).await;
    assert_eq!(
        bet,
        Err(Error::BettingUnavailable {
            chain_id: MUMBAI_CHAIN_ID
        })
    );
    let claim = ctx.gateway.claim_winnings(alloy::primitives::U256::from(1)).await;
    assert_eq!(
        claim,
        Err(Error::BettingUnavailable {
            chain_id: MUMBAI_CHAIN_ID
        })
    );
    assert_eq!(ctx.wallet.total_calls(), 0);
}

#[tokio::test]
async fn switch_to_network__unknown_key_is_rejected_without_wallet_calls() {
    let ctx = TestContext::connected().await;
    ctx.wallet.reset_calls();

    let result = ctx.session.switch_to_network("arbitrum").await;

    assert_eq!(
        result,
        Err(Error::NetworkNotConfigured("arbitrum".to_string()))
    );
    assert_eq!(ctx.wallet.total_calls(), 0);
}

#[tokio::test]
async fn switch_to_network__rejection_keeps_previous_session() {
    // given
    let ctx = TestContext::connected().await;
    let before = ctx.session.snapshot();
    ctx.wallet.state().reject_switch = true;

    // when
    let result = ctx.session.switch_to_network("polygon").await;

    // then
    assert_eq!(result, Err(Error::UserRejected));
    assert_eq!(ctx.session.snapshot(), before);
}

#[tokio::test]
async fn switch_to_network__declined_add_keeps_previous_session() {
    // given
    let ctx = TestContext::connected().await;
    let before = ctx.session.snapshot();
    ctx.wallet.state().reject_add_chain = true;

    // when
    let result = ctx.session.switch_to_network("mumbai").await;

    // then
    assert_eq!(result, Err(Error::UserRejected));
    assert_eq!(ctx.session.snapshot(), before);
    assert_eq!(ctx.wallet.state().chain_id, SEPOLIA_CHAIN_ID);
}

#[tokio::test]
async fn switch_to_network__wallet_error_becomes_switch_rejected() {
    // given
    let ctx = TestContext::connected().await;
    let before = ctx.session.snapshot();
    ctx.wallet.state().switch_failure = Some(ProviderError::Rpc {
        code: -32002,
        message: "request already pending".to_string(),
    });

    // when
    let result = ctx.session.switch_to_network("polygon").await;

    // then
    assert!(matches!(
        result,
        Err(Error::SwitchRejected {
            chain_id: POLYGON_CHAIN_ID,
            ..
        })
    ));
    assert_eq!(ctx.session.snapshot(), before);
}

#[tokio::test]
async fn switch_to_network__requires_connected_session() {
    let ctx = TestContext::new();

    let result = ctx.session.switch_to_network("polygon").await;

    assert_eq!(result, Err(Error::NoSigner));
    assert_eq!(ctx.wallet.calls_to(Op::SwitchChain), 0);
}

#[tokio::test]
async fn switch_to_network__refused_while_another_switch_runs() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet.hold(Op::SwitchChain);

    // when
    let (first, second) = tokio::join!(ctx.session.switch_to_network("polygon"), async {
        tokio::task::yield_now().await;
        let second = ctx.session.switch_to_network("local").await;
        ctx.wallet.release(Op::SwitchChain);
        second
    });

    // then
    assert_eq!(first, Ok(()));
    assert_eq!(
        second,
        Err(Error::SessionBusy {
            state: ConnectionState::SwitchingNetwork
        })
    );
    assert_eq!(ctx.session.snapshot().chain_id, Some(POLYGON_CHAIN_ID));
}

#[tokio::test]
async fn switch_to_network__refused_while_submission_pending() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet.hold(Op::Receipt);

    // when
    let (placed, switched) = tokio::join!(
        ctx.gateway.place_bet(MATCH_ID, AWAY_TEAM, tokens(10)),
        async {
            tokio::task::yield_now().await;
            let switched = ctx.session.switch_to_network("polygon").await;
            ctx.wallet.release(Op::Receipt);
            switched
        }
    );

    // then
    assert!(placed.is_ok());
    assert_eq!(
        switched,
        Err(Error::SessionBusy {
            state: ConnectionState::Connected
        })
    );
    assert_eq!(ctx.session.snapshot().chain_id, Some(SEPOLIA_CHAIN_ID));
}

#[tokio::test]
async fn switch_to_network__disconnect_during_switch_wins() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet.hold(Op::SwitchChain);

    // when
    let (result, ()) = tokio::join!(ctx.session.switch_to_network("polygon"), async {
        tokio::task::yield_now().await;
        ctx.session.disconnect();
        ctx.wallet.release(Op::SwitchChain);
    });

    // then
    assert_eq!(result, Err(Error::SessionInterrupted));
    assert_eq!(
        ctx.session.connection_state(),
        ConnectionState::Disconnected
    );
    assert_eq!(ctx.session.snapshot().chain_id, None);
}
