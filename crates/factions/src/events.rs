//! Decoding voting-contract logs into typed events

use alloy::primitives::{Address, Log, B256};
use alloy::sol_types::SolEvent;
use chain_reader::contracts::IDaobiVoteContract::{Registered as RegisteredLog, Voted as VotedLog};
use chain_reader::LogRecord;
use thiserror::Error;

use crate::types::{Registered, VoteChanged};

/// Why a single log could not be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("ABI error: {0}")]
    Abi(#[from] alloy::sol_types::Error),

    #[error("Invalid nickname: {0}")]
    InvalidNickname(&'static str),
}

/// Read a null-terminated string out of a `bytes32` word.
///
/// The last byte must be zero, so at most 31 bytes of text fit.
fn decode_nickname(word: &B256) -> Result<String, DecodeError> {
    if word[31] != 0 {
        return Err(DecodeError::InvalidNickname("missing null terminator"));
    }
    let end = word.iter().position(|b| *b == 0).unwrap_or(31);
    String::from_utf8(word[..end].to_vec())
        .map_err(|_| DecodeError::InvalidNickname("not valid UTF-8"))
}

fn encode_nickname(name: &str) -> Result<B256, DecodeError> {
    let bytes = name.as_bytes();
    if bytes.len() > 31 {
        return Err(DecodeError::InvalidNickname("longer than 31 bytes"));
    }
    let mut word = B256::ZERO;
    word[..bytes.len()].copy_from_slice(bytes);
    Ok(word)
}

fn record(data: alloy::primitives::LogData, block_number: u64, log_index: u64) -> LogRecord {
    LogRecord {
        log: Log {
            address: Address::ZERO,
            data,
        },
        block_number,
        log_index,
    }
}

impl Registered {
    /// Decode `Registered(address indexed regVoter, bytes32 nickname, address initVote)`
    pub fn decode(log: &LogRecord) -> Result<Self, DecodeError> {
        let event = RegisteredLog::decode_log(&log.log)?.data;
        Ok(Self {
            voter: event.regVoter,
            nickname: decode_nickname(&event.nickname)?,
            initial_vote: event.initVote,
        })
    }

    /// Build the log this event would produce (fixtures and local replays)
    pub fn encode(&self, block_number: u64, log_index: u64) -> Result<LogRecord, DecodeError> {
        let event = RegisteredLog {
            regVoter: self.voter,
            nickname: encode_nickname(&self.nickname)?,
            initVote: self.initial_vote,
        };
        Ok(record(event.encode_log_data(), block_number, log_index))
    }
}

impl VoteChanged {
    /// Decode `Voted(address indexed voter, address indexed candidate)`
    pub fn decode(log: &LogRecord) -> Result<Self, DecodeError> {
        let event = VotedLog::decode_log(&log.log)?.data;
        Ok(Self {
            voter: event.voter,
            candidate: event.candidate,
        })
    }

    pub fn encode(&self, block_number: u64, log_index: u64) -> LogRecord {
        let event = VotedLog {
            voter: self.voter,
            candidate: self.candidate,
        };
        record(event.encode_log_data(), block_number, log_index)
    }
}

/// Decode registration logs in order, skipping malformed ones
pub fn decode_registrations(logs: &[LogRecord]) -> Vec<Registered> {
    logs.iter()
        .filter_map(|log| match Registered::decode(log) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(
                    block = log.block_number,
                    index = log.log_index,
                    error = %e,
                    "Skipping malformed registration event"
                );
                None
            }
        })
        .collect()
}

/// Decode vote logs in order, skipping malformed ones
pub fn decode_votes(logs: &[LogRecord]) -> Vec<VoteChanged> {
    logs.iter()
        .filter_map(|log| match VoteChanged::decode(log) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(
                    block = log.block_number,
                    index = log.log_index,
                    error = %e,
                    "Skipping malformed vote event"
                );
                None
            }
        })
        .collect()
}
