//! Core ledger types shared by the reader and its consumers

use alloy::primitives::{Log, B256};
use alloy::rpc::types::Log as RpcLog;
use alloy::sol_types::SolEvent;
use std::fmt;

use crate::contracts::IDaobiVoteContract;

/// Inclusive block range for log queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    /// The most recent `lookback` blocks ending at `head`
    pub fn lookback(head: u64, lookback: u64) -> Self {
        Self {
            from: head.saturating_sub(lookback),
            to: head,
        }
    }

    /// Number of blocks covered (0 for an inverted range)
    pub fn len(&self) -> u64 {
        if self.to < self.from {
            0
        } else {
            self.to - self.from + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split into consecutive sub-ranges of at most `chunk` blocks
    pub fn chunks(&self, chunk: u64) -> Vec<BlockRange> {
        let chunk = chunk.max(1);
        let mut out = Vec::new();
        if self.is_empty() {
            return out;
        }
        let mut from = self.from;
        loop {
            let to = from.saturating_add(chunk - 1).min(self.to);
            out.push(BlockRange { from, to });
            if to >= self.to {
                break;
            }
            from = to + 1;
        }
        out
    }
}

/// Contract events the leaderboard consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `Registered(address indexed regVoter, bytes32 nickname, address initVote)`
    Registered,
    /// `Voted(address indexed voter, address indexed candidate)`
    Voted,
}

impl EventKind {
    /// Canonical ABI signature
    pub fn signature(&self) -> &'static str {
        match self {
            EventKind::Registered => IDaobiVoteContract::Registered::SIGNATURE,
            EventKind::Voted => IDaobiVoteContract::Voted::SIGNATURE,
        }
    }

    /// topic0 for log filters
    pub fn topic(&self) -> B256 {
        match self {
            EventKind::Registered => IDaobiVoteContract::Registered::SIGNATURE_HASH,
            EventKind::Voted => IDaobiVoteContract::Voted::SIGNATURE_HASH,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Registered => write!(f, "Registered"),
            EventKind::Voted => write!(f, "Voted"),
        }
    }
}

/// Which deployed contract a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    /// ERC-20 governance token (also tracks the chancellor)
    Token,
    /// Voting credential contract (registration, ballots, status)
    Voting,
}

/// A confirmed event log with its position in the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub log: Log,
    pub block_number: u64,
    pub log_index: u64,
}

impl LogRecord {
    /// Keep a node-returned log only when it is mined and not reorged out
    pub fn from_rpc(log: RpcLog) -> Option<Self> {
        if log.removed {
            return None;
        }
        Some(Self {
            block_number: log.block_number?,
            log_index: log.log_index?,
            log: log.inner,
        })
    }
}
