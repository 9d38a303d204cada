use alloy::{primitives::TxHash, transports::TransportError};
use thiserror::Error;

use crate::network::{Network, Token};

// JSON-RPC code nodes use for `execution reverted`
const EXECUTION_REVERTED_CODE: i64 = 3;
pub const INTERNAL_RPC_ERROR_CODE: i64 = -32603;

/// Failure reported by the chain client or contract binding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("{0}")]
    Transport(String),
}

impl From<TransportError> for ChainError {
    fn from(err: TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => {
                let message = payload.message.to_string();
                if payload.code == EXECUTION_REVERTED_CODE || message.contains("revert") {
                    ChainError::Reverted(message)
                } else {
                    ChainError::Rpc {
                        code: payload.code,
                        message,
                    }
                }
            }
            None => ChainError::Transport(err.to_string()),
        }
    }
}

impl From<alloy::contract::Error> for ChainError {
    fn from(err: alloy::contract::Error) -> Self {
        match err {
            alloy::contract::Error::TransportError(e) => e.into(),
            other => ChainError::Encoding(other.to_string()),
        }
    }
}

/// Why a claim attempt ended without a confirmed transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Please connect your wallet first.")]
    NotConnected,

    #[error("Please switch to Botanix or Plume network (chain id {chain_id}).")]
    UnsupportedNetwork { chain_id: u64 },

    #[error("Wallet is on {actual}. Switch to {expected} to claim there.")]
    WrongNetwork { expected: Network, actual: Network },

    #[error("A claim is already in progress.")]
    AlreadyInProgress,

    #[error("Contract is paused. Cannot claim now.")]
    ContractPaused,

    #[error("{token} has no address on this network.")]
    TokenUnavailable { token: Token },

    #[error("Selected token is not allowed for claiming.")]
    TokenNotAllowed,

    #[error("Transaction reverted. You may not be eligible or token is not allowed.")]
    Reverted { tx_hash: Option<TxHash> },

    #[error("Internal JSON-RPC error. Possible contract issue or network error.")]
    RpcInternal,

    #[error("Gas estimation failed. Try again or switch network.")]
    GasEstimation,

    #[error("No confirmation for {tx_hash} after {secs}s. It may still be mined.")]
    ConfirmationTimeout { tx_hash: TxHash, secs: u64 },

    #[error("Claim cancelled.")]
    Cancelled { tx_hash: Option<TxHash> },

    #[error("Error: {0}")]
    Other(String),
}

impl ClaimError {
    /// Rejections happen before anything is sent.
    pub fn is_precheck(&self) -> bool {
        matches!(
            self,
            ClaimError::NotConnected
                | ClaimError::UnsupportedNetwork { .. }
                | ClaimError::WrongNetwork { .. }
                | ClaimError::AlreadyInProgress
                | ClaimError::ContractPaused
                | ClaimError::TokenUnavailable { .. }
                | ClaimError::TokenNotAllowed
        )
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            ClaimError::Reverted { tx_hash } | ClaimError::Cancelled { tx_hash } => *tx_hash,
            ClaimError::ConfirmationTimeout { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }
}

impl From<ChainError> for ClaimError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Reverted(_) => ClaimError::Reverted { tx_hash: None },
            ChainError::Rpc {
                code: INTERNAL_RPC_ERROR_CODE,
                ..
            } => ClaimError::RpcInternal,
            ChainError::Encoding(_) => ClaimError::GasEstimation,
            ChainError::Rpc { message, .. } | ChainError::Transport(message) => {
                ClaimError::Other(if message.is_empty() {
                    "Transaction failed".to_string()
                } else {
                    message
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_errors_map_to_user_messages() {
        assert_eq!(
            ClaimError::from(ChainError::Reverted("not eligible".into())),
            ClaimError::Reverted { tx_hash: None }
        );
        assert_eq!(
            ClaimError::from(ChainError::Rpc {
                code: INTERNAL_RPC_ERROR_CODE,
                message: "internal".into()
            }),
            ClaimError::RpcInternal
        );
        assert_eq!(
            ClaimError::from(ChainError::Encoding("invalid hexlify value".into())),
            ClaimError::GasEstimation
        );
        assert_eq!(
            ClaimError::from(ChainError::Transport("connection reset".into())).to_string(),
            "Error: connection reset"
        );
        assert_eq!(
            ClaimError::from(ChainError::Transport(String::new())).to_string(),
            "Error: Transaction failed"
        );
    }

    #[test]
    fn other_rpc_codes_keep_raw_message() {
        let err = ClaimError::from(ChainError::Rpc {
            code: -32000,
            message: "insufficient funds for gas".into(),
        });
        assert_eq!(err.to_string(), "Error: insufficient funds for gas");
    }

    #[test]
    fn precheck_classification() {
        assert!(ClaimError::ContractPaused.is_precheck());
        assert!(ClaimError::TokenNotAllowed.is_precheck());
        assert!(!ClaimError::RpcInternal.is_precheck());
        assert!(!ClaimError::Cancelled { tx_hash: None }.is_precheck());
    }

    #[test]
    fn wrong_network_names_both_networks() {
        let err = ClaimError::WrongNetwork {
            expected: Network::Plume,
            actual: Network::Botanix,
        };
        assert!(err.is_precheck());
        assert_eq!(
            err.to_string(),
            "Wallet is on Botanix. Switch to Plume to claim there."
        );
    }

    #[test]
    fn timeout_carries_hash() {
        let err = ClaimError::ConfirmationTimeout {
            tx_hash: TxHash::repeat_byte(0xab),
            secs: 180,
        };
        assert_eq!(err.tx_hash(), Some(TxHash::repeat_byte(0xab)));
        assert!(err.to_string().contains("180s"));
    }
}
