//! Chain Reader - read-only access to the DAObi contracts
//!
//! Everything the dashboard learns about the ledger goes through the
//! [`ChainReader`] trait:
//! - Voting-contract event logs (`Registered`, `Voted`) over a block range
//! - Point queries: serving status, chancellor, balances, ballots
//! - A JSON-RPC adapter for any EVM HTTP endpoint

pub mod contracts;
pub mod error;
pub mod profile;
pub mod reader;
pub mod rpc;
pub mod types;

pub use alloy::primitives::{Address, TxHash, B256, U256};
pub use error::ChainError;
pub use profile::ParticipantProfile;
pub use reader::ChainReader;
pub use rpc::{JsonRpcChainReader, RpcReaderConfig, LOCAL_TOKEN_CONTRACT, LOCAL_VOTING_CONTRACT};
pub use types::{BlockRange, ContractKind, EventKind, LogRecord};
