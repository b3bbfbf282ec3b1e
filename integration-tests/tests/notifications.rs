#![allow(non_snake_case)]

use alloy::primitives::U256;
use betting_session::{
    ConnectionState,
    Error,
    Session,
    test_helpers::*,
    wallet::WalletNotification,
};

#[tokio::test]
async fn accounts_changed__empty_list_disconnects() {
    let ctx = TestContext::connected().await;

    // when
    ctx.wallet.user_locks();
    ctx.session
        .handle_notification(WalletNotification::AccountsChanged(Vec::new()))
        .await
        .unwrap();

    // then
    assert_eq!(ctx.session.snapshot(), Session::default());
}

#[tokio::test]
async fn accounts_changed__empty_list_clears_balances_during_submission() {
    // given
    let ctx = TestContext::connected().await;
    ctx.sepolia_ledger(|ledger| ledger.mint(alice(), tokens(1) / U256::from(2)));
    ctx.session.refresh_balances().await.unwrap();
    ctx.wallet.hold(Op::Receipt);

    // when
    let (placed, ()) = tokio::join!(
        ctx.gateway.place_bet(MATCH_ID, HOME_TEAM, tokens(1)),
        async {
            tokio::task::yield_now().await;
            ctx.session
                .handle_notification(WalletNotification::AccountsChanged(Vec::new()))
                .await
                .unwrap();
            assert_eq!(ctx.session.snapshot().token_balance_display(), "0");
            ctx.wallet.release(Op::Receipt);
        }
    );

    // then
    assert!(placed.is_ok());
    assert_eq!(ctx.session.snapshot(), Session::default());
}

#[tokio::test]
async fn accounts_changed__new_account_is_patched_in_place() {
    let ctx = TestContext::connected().await;

    // when
    ctx.wallet.user_switches_account(bob());
    ctx.session
        .handle_notification(WalletNotification::AccountsChanged(vec![bob()]))
        .await
        .unwrap();

    // then
    let session = ctx.session.snapshot();
    assert_eq!(session.connection_state, ConnectionState::Connected);
    assert_eq!(session.account, Some(bob()));
    assert_eq!(session.chain_id, Some(SEPOLIA_CHAIN_ID));
    assert_eq!(session.native_balance, U256::ZERO);
    assert_eq!(session.token_balance, tokens(1_000));
}

#[tokio::test]
async fn accounts_changed__while_connecting_interrupts_connect() {
    // given
    let ctx = TestContext::new();
    ctx.wallet.hold(Op::RequestAccounts);

    // when
    let (result, ()) = tokio::join!(ctx.session.connect(), async {
        tokio::task::yield_now().await;
        ctx.session
            .handle_notification(WalletNotification::AccountsChanged(Vec::new()))
            .await
            .unwrap();
        ctx.wallet.release(Op::RequestAccounts);
    });

    // then
    assert_eq!(result, Err(Error::SessionInterrupted));
    assert_eq!(ctx.session.snapshot(), Session::default());
}

#[tokio::test]
async fn chain_changed__reloads_network_contract_and_balances() {
    let ctx = TestContext::connected().await;

    // when
    ctx.wallet.user_switches_chain(LOCAL_CHAIN_ID);
    ctx.session
        .handle_notification(WalletNotification::ChainChanged(LOCAL_CHAIN_ID))
        .await
        .unwrap();

    // then
    let session = ctx.session.snapshot();
    assert_eq!(session.chain_id, Some(LOCAL_CHAIN_ID));
    assert_eq!(session.network.as_deref(), Some("local"));
    assert_eq!(session.contract, Some(local_contract()));
    assert_eq!(session.native_balance, tokens(10_000));
}

#[tokio::test]
async fn chain_changed__to_unrecognized_chain_disables_betting() {
    let ctx = TestContext::connected().await;

    // when
    ctx.wallet.user_switches_chain(42_161);
    ctx.session
        .handle_notification(WalletNotification::ChainChanged(42_161))
        .await
        .unwrap();

    // then
    let session = ctx.session.snapshot();
    assert!(session.is_connected());
    assert!(session.is_unrecognized_network());
    assert_eq!(session.contract, None);
    assert_eq!(session.token_balance, U256::ZERO);
    let bet = ctx.gateway.place_bet(MATCH_ID, AWAY_TEAM, tokens(1)).await;
    assert_eq!(bet, Err(Error::UnsupportedNetwork { chain_id: 42_161 }));
}

#[tokio::test]
async fn chain_changed__same_chain_is_noop() {
    let ctx = TestContext::connected().await;
    ctx.wallet.reset_calls();

    ctx.session
        .handle_notification(WalletNotification::ChainChanged(SEPOLIA_CHAIN_ID))
        .await
        .unwrap();

    assert_eq!(ctx.wallet.total_calls(), 0);
}

#[tokio::test]
async fn chain_changed__during_switch_is_applied_once_switch_lands() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet.hold(Op::Balance);

    // when
    let (result, ()) = tokio::join!(ctx.session.switch_to_network("polygon"), async {
        while ctx.wallet.calls_to(Op::Balance) < 2 {
            tokio::task::yield_now().await;
        }
        ctx.wallet.user_switches_chain(1);
        ctx.session
            .handle_notification(WalletNotification::ChainChanged(1))
            .await
            .unwrap();
        assert_eq!(
            ctx.session.connection_state(),
            ConnectionState::SwitchingNetwork
        );
        ctx.wallet.release(Op::Balance);
    });

    // then
    assert_eq!(result, Ok(()));
    let session = ctx.session.snapshot();
    assert_eq!(session.connection_state, ConnectionState::Connected);
    assert_eq!(session.chain_id, Some(1));
    assert_eq!(session.network.as_deref(), Some("ethereum"));
}

#[tokio::test]
async fn chain_changed__during_switch_survives_failed_balance_read() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet.hold(Op::Balance);

    // when
    let (result, ()) = tokio::join!(ctx.session.switch_to_network("local"), async {
        while ctx.wallet.calls_to(Op::Balance) < 2 {
            tokio::task::yield_now().await;
        }
        ctx.session
            .handle_notification(WalletNotification::ChainChanged(LOCAL_CHAIN_ID))
            .await
            .unwrap();
        ctx.wallet.state().offline = true;
        ctx.wallet.release(Op::Balance);
    });

    // then
    assert!(matches!(result, Err(Error::NetworkUnreachable(_))));
    let session = ctx.session.snapshot();
    assert_eq!(session.connection_state, ConnectionState::Connected);
    assert_eq!(session.chain_id, Some(LOCAL_CHAIN_ID));
    assert_eq!(session.network.as_deref(), Some("local"));
    assert_eq!(session.contract, Some(local_contract()));
    assert_eq!(ctx.wallet.state().chain_id, LOCAL_CHAIN_ID);

    ctx.wallet.state().offline = false;
    let refreshed = ctx.session.refresh_balances().await.unwrap();
    assert_eq!(refreshed.native_balance, tokens(10_000));
    assert_eq!(refreshed.token_balance, tokens(1_000));
}

#[tokio::test]
async fn switch_to_network__accepted_switch_is_kept_when_balance_read_fails() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet.hold(Op::Balance);

    // when
    let (result, ()) = tokio::join!(ctx.session.switch_to_network("polygon"), async {
        while ctx.wallet.calls_to(Op::Balance) < 2 {
            tokio::task::yield_now().await;
        }
        ctx.wallet.state().offline = true;
        ctx.wallet.release(Op::Balance);
    });

    // then
    assert!(matches!(result, Err(Error::NetworkUnreachable(_))));
    let session = ctx.session.snapshot();
    assert_eq!(session.chain_id, Some(POLYGON_CHAIN_ID));
    assert_eq!(session.contract, None);
    assert_eq!(session.native_balance, U256::ZERO);
}

#[tokio::test]
async fn accounts_changed__lands_when_switch_commits_during_balance_read() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet.user_switches_account(bob());
    ctx.wallet.hold(Op::Read);

    // when
    let (changed, switched) = tokio::join!(
        ctx.session
            .handle_notification(WalletNotification::AccountsChanged(vec![bob()])),
        async {
            tokio::task::yield_now().await;
            let switched = ctx.session.switch_to_network("polygon").await;
            ctx.wallet.release(Op::Read);
            switched
        }
    );

    // then
    assert_eq!(changed, Ok(()));
    assert_eq!(switched, Ok(()));
    let session = ctx.session.snapshot();
    assert_eq!(session.connection_state, ConnectionState::Connected);
    assert_eq!(session.account, Some(bob()));
    assert_eq!(session.chain_id, Some(POLYGON_CHAIN_ID));
    assert_eq!(session.token_balance, U256::ZERO);
}

#[tokio::test]
async fn refresh_balances__discards_result_for_torn_down_session() {
    // given
    let ctx = TestContext::connected().await;
    ctx.wallet.hold(Op::Balance);

    // when
    let (refreshed, ()) = tokio::join!(ctx.session.refresh_balances(), async {
        tokio::task::yield_now().await;
        ctx.session
            .handle_notification(WalletNotification::AccountsChanged(Vec::new()))
            .await
            .unwrap();
        ctx.wallet.release(Op::Balance);
    });

    // then
    assert_eq!(refreshed.unwrap(), Session::default());
    assert_eq!(ctx.session.snapshot(), Session::default());
}

#[tokio::test]
async fn refresh_balances__picks_up_external_transfers() {
    let ctx = TestContext::connected().await;

    // when
    ctx.sepolia_ledger(|ledger| ledger.mint(alice(), tokens(5)));
    let session = ctx.session.refresh_balances().await.unwrap();

    // then
    assert_eq!(session.token_balance, tokens(1_005));
}

#[tokio::test]
async fn run_notifications__applies_wallet_events() {
    let ctx = TestContext::connected().await;

    // when
    tokio::select! {
        biased;
        _ = ctx.session.run_notifications() => panic!("notification loop ended"),
        _ = async {
            ctx.wallet.user_switches_chain(POLYGON_CHAIN_ID);
            while ctx.session.snapshot().chain_id != Some(POLYGON_CHAIN_ID) {
                tokio::task::yield_now().await;
            }
            ctx.wallet.user_locks();
            while ctx.session.snapshot().is_connected() {
                tokio::task::yield_now().await;
            }
        } => {}
    }

    // then
    assert_eq!(ctx.session.snapshot(), Session::default());
}
