//! Wallet session and betting-contract client for the sports betting dApp.
//!
//! [`SessionManager`] owns the connection to an injected wallet and keeps a
//! single [`Session`] snapshot consistent with it. [`BettingGateway`] places
//! and claims bets through the connected account.

pub mod adapter;
pub mod error;
pub mod events;
pub mod gateway;
pub mod registry;
pub mod rpc_wallet;
pub mod session;
pub mod types;
pub mod units;
pub mod wallet;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use adapter::ProviderAdapter;
pub use error::{
    BetRejection,
    Error,
    ProviderError,
    Result,
};
pub use gateway::{
    BetPlacement,
    BettingGateway,
    ClaimOutcome,
};
pub use registry::{
    ChainRegistry,
    ContractAddressTable,
    NetworkDescriptor,
};
pub use session::{
    ConnectionState,
    Session,
    SessionManager,
};

use alloy::primitives::Address;

/// `0x1234...abcd` form used wherever an address is shown to the user.
pub fn short_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
