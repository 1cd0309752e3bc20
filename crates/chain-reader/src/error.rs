//! Reader error types

use thiserror::Error;

/// Failures reading from the ledger
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC request timed out")]
    Timeout,

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract call failed: {0}")]
    Contract(String),

    #[error("Invalid RPC endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<alloy::transports::TransportError> for ChainError {
    fn from(e: alloy::transports::TransportError) -> Self {
        ChainError::Rpc(e.to_string())
    }
}

impl From<alloy::contract::Error> for ChainError {
    fn from(e: alloy::contract::Error) -> Self {
        match e {
            alloy::contract::Error::TransportError(e) => e.into(),
            other => ChainError::Contract(other.to_string()),
        }
    }
}
