mod config;
mod wallets;

use alloy::primitives::U256;
use betting_session::{
    BettingGateway,
    ProviderAdapter,
    Session,
    SessionManager,
    rpc_wallet::{
        RpcWallet,
        RpcWalletOptions,
    },
    short_address,
    types::Bet,
    units::{
        DEFAULT_DECIMALS,
        format_amount,
        parse_amount,
    },
};
use clap::{
    Parser,
    Subcommand,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

use crate::wallets::{
    TerminalPrompt,
    find_wallet,
    resolve_wallet_dir,
};

#[derive(Parser, Debug)]
#[command(
    name = "betting-cli",
    about = "Connect a keystore wallet and place sports bets on the betting token contract",
    version
)]
struct Args {
    /// Network to open the wallet on (ethereum, sepolia, polygon, mumbai, local)
    #[arg(long, default_value = "sepolia")]
    network: String,

    /// Override the RPC URL of the selected network
    #[arg(long)]
    rpc_url: Option<String>,

    /// Keystore name (file stem) to sign with
    #[arg(long)]
    wallet: String,

    /// Override keystore directory (defaults to ~/.ethereum/keystore)
    #[arg(long)]
    wallet_dir: Option<String>,

    /// Betting contract address on the selected network, instead of the
    /// deployment record
    #[arg(long)]
    contract: Option<String>,

    /// Directory holding per-network deployment records
    #[arg(long, default_value = deployments::DEPLOYMENTS_ROOT)]
    deployments_dir: String,

    /// Write logs to daily files in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<String>,

    /// How often to poll for transaction receipts, in milliseconds
    #[arg(long, default_value_t = 1_000)]
    confirm_poll_ms: u64,

    /// Approve every wallet request without asking
    #[arg(short = 'y', long)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Show account, network and balances
    Status,
    /// List configured networks and whether betting is available on them
    Networks,
    /// Switch the wallet to another network
    Switch { network: String },
    /// Show an event and its pools
    Event { event_id: String },
    /// List bets of the connected account, or of one event
    Bets {
        #[arg(long)]
        event: Option<String>,
        /// Only bets that won and are not yet claimed
        #[arg(long)]
        claimable: bool,
    },
    /// Stake tokens on a team
    Bet {
        event_id: String,
        team: String,
        /// Amount in whole tokens, e.g. 12.5
        amount: String,
    },
    /// Claim the payout of a winning bet
    Claim { bet_id: u64 },
    /// Token name, symbol, decimals and supply
    TokenInfo,
    /// Tokens held by the contract and number of bets placed
    Stats,
}

fn init_tracing(log_dir: Option<&str>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match log_dir {
        Some(dir) => {
            let dir = PathBuf::from(shellexpand::tilde(dir).into_owned());
            let appender = rolling::daily(dir, "betting-cli.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
            None
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let _log_guard = init_tracing(args.log_dir.as_deref());
    tracing::info!(network = %args.network, "starting betting-cli");

    let registry = config::build_registry(&args.network, args.rpc_url.as_deref())?;
    let deployments_root = PathBuf::from(shellexpand::tilde(&args.deployments_dir).into_owned());
    let addresses = config::load_addresses(
        &registry,
        &deployments_root,
        &args.network,
        args.contract.as_deref(),
    )?;
    let registry = registry.with_addresses(addresses);
    let network = registry
        .describe_network(&args.network)
        .map_err(|err| eyre!(err))?
        .clone();

    let wallet_dir = resolve_wallet_dir(args.wallet_dir.as_deref())
        .wrap_err("resolving keystore directory")?;
    let descriptor =
        find_wallet(&wallet_dir, &args.wallet).wrap_err("locating requested keystore")?;
    let prompt = Arc::new(TerminalPrompt::new(descriptor, args.yes));
    let options = RpcWalletOptions {
        poll_interval: Duration::from_millis(args.confirm_poll_ms),
        ..RpcWalletOptions::default()
    };
    let wallet = RpcWallet::open(network, prompt, options)
        .await
        .map_err(|err| eyre!(err))
        .wrap_err("opening wallet")?;

    let session = Arc::new(SessionManager::new(registry, ProviderAdapter::new(wallet)));
    let gateway = BettingGateway::new(session.clone());
    session
        .connect()
        .await
        .map_err(|err| eyre!(err))
        .wrap_err("connecting wallet")?;

    tokio::select! {
        result = run_command(&gateway, args.command) => result,
        result = session.run_notifications() => {
            result.map_err(|err| eyre!(err))?;
            Err(eyre!("wallet closed its notification channel"))
        }
    }
}

async fn run_command(gateway: &BettingGateway<RpcWallet>, command: Command) -> Result<()> {
    let session = gateway.session();
    match command {
        Command::Status => {
            print_session(&session.snapshot());
        }
        Command::Networks => {
            let current = session.snapshot().network;
            for network in session.registry().networks() {
                let marker = if current.as_deref() == Some(network.key.as_str()) {
                    "*"
                } else {
                    " "
                };
                let betting = match session.registry().address_table().get(&network.key) {
                    Some(address) => format!("betting at {address}"),
                    None => "no betting contract".to_string(),
                };
                println!(
                    "{marker} {:<10} {:<20} chain {:<10} {betting}",
                    network.key,
                    network.display_name,
                    network.chain_id_hex()
                );
            }
        }
        Command::Switch { network } => {
            session
                .switch_to_network(&network)
                .await
                .map_err(|err| eyre!(err))?;
            print_session(&session.snapshot());
        }
        Command::Event { event_id } => {
            let Some(event) = gateway.get_event(&event_id).await.map_err(|err| eyre!(err))?
            else {
                return Err(eyre!("event '{event_id}' does not exist"));
            };
            let status = if event.is_resolved {
                format!("resolved, winner {}", event.winner)
            } else if event.is_active {
                "open for bets".to_string()
            } else {
                "paused".to_string()
            };
            println!("{} vs {} ({status})", event.team_a, event.team_b);
            for team in [&event.team_a, &event.team_b] {
                let pool = if team == &event.team_a {
                    event.team_a_pool
                } else {
                    event.team_b_pool
                };
                let share = event.pool_share_bps(team);
                println!(
                    "  {team:<24} {:>14}  {}.{:02}%",
                    format_amount(pool, DEFAULT_DECIMALS),
                    share / 100,
                    share % 100
                );
            }
            println!("  total pool {}", format_amount(event.total_pool, DEFAULT_DECIMALS));
        }
        Command::Bets { event, claimable } => {
            let bets = match (event, claimable) {
                (_, true) => {
                    gateway.my_bets().await.map_err(|err| eyre!(err))?;
                    gateway.claimable_bets()
                }
                (Some(event_id), false) => gateway
                    .list_event_bets(&event_id)
                    .await
                    .map_err(|err| eyre!(err))?,
                (None, false) => gateway.my_bets().await.map_err(|err| eyre!(err))?,
            };
            if bets.is_empty() {
                println!("no bets");
            }
            for bet in &bets {
                print_bet(bet);
            }
        }
        Command::Bet {
            event_id,
            team,
            amount,
        } => {
            let decimals = gateway
                .token_info()
                .await
                .map(|info| info.decimals)
                .unwrap_or(DEFAULT_DECIMALS);
            let amount = parse_amount(&amount, decimals).map_err(|err| eyre!(err))?;
            let placement = gateway
                .place_bet(&event_id, &team, amount)
                .await
                .map_err(|err| eyre!(err))?;
            println!("bet confirmed in transaction {}", placement.tx_hash);
            if let Some(link) = session
                .current_network()
                .and_then(|network| network.tx_url(&placement.tx_hash))
            {
                println!("  {link}");
            }
            if let Some(bet_id) = placement.bet_id {
                println!("  bet id {bet_id}");
            }
            print_session(&session.snapshot());
        }
        Command::Claim { bet_id } => {
            gateway.my_bets().await.map_err(|err| eyre!(err))?;
            let outcome = gateway
                .claim_winnings(U256::from(bet_id))
                .await
                .map_err(|err| eyre!(err))?;
            match outcome.winnings {
                Some(winnings) => println!(
                    "claimed {} tokens in transaction {}",
                    format_amount(winnings, DEFAULT_DECIMALS),
                    outcome.tx_hash
                ),
                None => println!("claim confirmed in transaction {}", outcome.tx_hash),
            }
            print_session(&session.snapshot());
        }
        Command::TokenInfo => {
            let info = gateway.token_info().await.map_err(|err| eyre!(err))?;
            println!("{} ({})", info.name, info.symbol);
            println!("  decimals     {}", info.decimals);
            println!(
                "  total supply {}",
                format_amount(info.total_supply, info.decimals)
            );
        }
        Command::Stats => {
            let stats = gateway.contract_stats().await.map_err(|err| eyre!(err))?;
            println!(
                "contract holds {} tokens across {} bets",
                format_amount(stats.contract_balance, DEFAULT_DECIMALS),
                stats.total_bets
            );
        }
    }
    Ok(())
}

fn print_session(session: &Session) {
    let account = session
        .account
        .as_ref()
        .map(short_address)
        .unwrap_or_else(|| "-".to_string());
    let network = match (&session.network, session.chain_id) {
        (Some(key), _) => key.clone(),
        (None, Some(chain_id)) => format!("unrecognized chain {chain_id}"),
        (None, None) => "-".to_string(),
    };
    println!("{} {account} on {network}", session.connection_state);
    println!("  native {}", session.native_balance_display());
    match session.contract {
        Some(_) => println!("  tokens {}", session.token_balance_display()),
        None => println!("  betting unavailable on this network"),
    }
}

fn print_bet(bet: &Bet) {
    let status = if bet.is_claimed {
        "claimed"
    } else if bet.is_winner {
        "won"
    } else {
        "-"
    };
    println!(
        "#{:<5} {:<16} {:<24} {:>14}  {status}",
        bet.id,
        bet.event_id,
        bet.team,
        format_amount(bet.amount, DEFAULT_DECIMALS)
    );
}
