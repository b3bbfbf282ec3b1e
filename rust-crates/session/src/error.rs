use crate::session::ConnectionState;
use alloy::primitives::{
    TxHash,
    U256,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure a caller of the session layer can observe. None of them
/// leave the session half-updated; all are recoverable by retrying or by
/// changing the input.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("no wallet provider is available")]
    WalletUnavailable,

    #[error("the request was rejected in the wallet")]
    UserRejected,

    #[error("no signer: connect a wallet account first")]
    NoSigner,

    #[error("chain {chain_id} is not supported")]
    UnsupportedNetwork { chain_id: u64 },

    #[error("network '{0}' is not configured")]
    NetworkNotConfigured(String),

    #[error("switch to chain {chain_id} failed: {reason}")]
    SwitchRejected { chain_id: u64, reason: String },

    #[error("betting is unavailable on chain {chain_id}: no contract deployed")]
    BettingUnavailable { chain_id: u64 },

    #[error("invalid bet request: {0}")]
    InvalidBetRequest(BetRejection),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("transaction reverted{}: {reason}", .tx_hash.map(|h| format!(" ({h})")).unwrap_or_default())]
    TransactionReverted {
        tx_hash: Option<TxHash>,
        reason: String,
    },

    #[error("bet {bet_id} has nothing to claim")]
    NothingToClaim { bet_id: U256 },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("a previous submission is still waiting for its transaction hash")]
    SubmissionInFlight,

    #[error("session is busy ({state})")]
    SessionBusy { state: ConnectionState },

    #[error("the wallet session changed while the operation was in flight")]
    SessionInterrupted,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BetRejection {
    #[error("wallet is not connected (session is {state})")]
    NotConnected { state: ConnectionState },

    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    #[error("amount {requested} exceeds token balance {available}")]
    InsufficientBalance { requested: U256, available: U256 },

    #[error("team '{team}' is not playing in event '{event_id}'")]
    UnknownTeam { team: String, event_id: String },

    #[error("event '{event_id}' is not accepting bets")]
    EventClosed { event_id: String },

    #[error("event '{event_id}' does not exist")]
    UnknownEvent { event_id: String },
}

pub const USER_REJECTED_CODE: i64 = 4001;
pub const UNAUTHORIZED_CODE: i64 = 4100;
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// Failures reported by the wallet provider, using the EIP-1193 codes where
/// the wallet has one.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("user rejected the request")]
    UserRejected,

    #[error("the requested account is not authorized")]
    Unauthorized,

    #[error("chain {0} has not been added to the wallet")]
    UnrecognizedChain(u64),

    #[error("wallet request failed with code {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("execution reverted: {0}")]
    ExecutionReverted(String),

    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },
}

impl ProviderError {
    pub fn from_code(code: i64, message: impl Into<String>, chain_id: u64) -> Self {
        match code {
            USER_REJECTED_CODE => ProviderError::UserRejected,
            UNAUTHORIZED_CODE => ProviderError::Unauthorized,
            UNRECOGNIZED_CHAIN_CODE => ProviderError::UnrecognizedChain(chain_id),
            code => ProviderError::Rpc {
                code,
                message: message.into(),
            },
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ProviderError::UserRejected => USER_REJECTED_CODE,
            ProviderError::Unauthorized => UNAUTHORIZED_CODE,
            ProviderError::UnrecognizedChain(_) => UNRECOGNIZED_CHAIN_CODE,
            ProviderError::Rpc { code, .. } => *code,
            ProviderError::Transport(_)
            | ProviderError::ExecutionReverted(_)
            | ProviderError::Reverted { .. } => INTERNAL_ERROR_CODE,
        }
    }
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::UserRejected => Error::UserRejected,
            ProviderError::Unauthorized => Error::NoSigner,
            ProviderError::UnrecognizedChain(chain_id) => {
                Error::UnsupportedNetwork { chain_id }
            }
            ProviderError::Rpc { code, message } => {
                Error::NetworkUnreachable(format!("code {code}: {message}"))
            }
            ProviderError::Transport(reason) => Error::NetworkUnreachable(reason),
            ProviderError::ExecutionReverted(reason) => Error::TransactionReverted {
                tx_hash: None,
                reason,
            },
            ProviderError::Reverted { tx_hash } => Error::TransactionReverted {
                tx_hash: Some(tx_hash),
                reason: "status 0 receipt".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn from_code__maps_eip1193_codes() {
        assert_eq!(
            ProviderError::from_code(4001, "denied", 1),
            ProviderError::UserRejected
        );
        assert_eq!(
            ProviderError::from_code(4902, "unknown chain", 137),
            ProviderError::UnrecognizedChain(137)
        );
        assert_eq!(
            ProviderError::from_code(-32000, "boom", 1).code(),
            -32000
        );
    }

    #[test]
    fn error_from_provider_error__keeps_taxonomy() {
        assert_eq!(Error::from(ProviderError::UserRejected), Error::UserRejected);
        assert_eq!(Error::from(ProviderError::Unauthorized), Error::NoSigner);
        assert_eq!(
            Error::from(ProviderError::UnrecognizedChain(80001)),
            Error::UnsupportedNetwork { chain_id: 80001 }
        );
        assert!(matches!(
            Error::from(ProviderError::Transport("timeout".into())),
            Error::NetworkUnreachable(_)
        ));
    }

    #[test]
    fn transaction_reverted__display_includes_hash_when_known() {
        let err = Error::TransactionReverted {
            tx_hash: Some(TxHash::repeat_byte(0xab)),
            reason: "status 0 receipt".into(),
        };
        assert!(err.to_string().contains("0xabab"));
    }
}
