//! In-memory ledger for view and source tests

use async_trait::async_trait;
use chain_reader::{
    Address, BlockRange, ChainError, ChainReader, ContractKind, EventKind, LogRecord, U256,
};
use factions::{Registered, VoteChanged};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub(crate) const HEAD: u64 = 50_000;

pub(crate) fn addr(last: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xab;
    bytes[19] = last;
    Address::new(bytes)
}

pub(crate) fn registered(voter: u8, name: &str, vote: u8) -> Registered {
    Registered {
        voter: addr(voter),
        nickname: name.to_string(),
        initial_vote: addr(vote),
    }
}

pub(crate) fn voted(voter: u8, candidate: u8) -> VoteChanged {
    VoteChanged {
        voter: addr(voter),
        candidate: addr(candidate),
    }
}

pub(crate) struct StubReader {
    chancellor: Address,
    head: AtomicU64,
    registrations: Mutex<Vec<LogRecord>>,
    votes: Mutex<Vec<LogRecord>>,
    inactive: Mutex<HashSet<Address>>,
    failing: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
    fetches: AtomicUsize,
    ranges: Mutex<Vec<BlockRange>>,
    next_index: AtomicU64,
}

impl StubReader {
    pub(crate) fn new(chancellor: Address) -> Self {
        Self {
            chancellor,
            head: AtomicU64::new(HEAD),
            registrations: Mutex::new(Vec::new()),
            votes: Mutex::new(Vec::new()),
            inactive: Mutex::new(HashSet::new()),
            failing: AtomicBool::new(false),
            gate: Mutex::new(None),
            fetches: AtomicUsize::new(0),
            ranges: Mutex::new(Vec::new()),
            next_index: AtomicU64::new(0),
        }
    }

    /// Alice and Bob both behind Bob, who is chancellor
    pub(crate) fn with_alice_and_bob() -> Self {
        let reader = Self::new(addr(2));
        reader.push_registration(registered(1, "Alice", 2));
        reader.push_registration(registered(2, "Bob", 2));
        reader
    }

    fn next_position(&self) -> (u64, u64) {
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        (self.head.load(Ordering::SeqCst) - 10, index)
    }

    pub(crate) fn push_registration(&self, event: Registered) {
        let (block, index) = self.next_position();
        let log = event.encode(block, index).unwrap();
        self.registrations.lock().push(log);
    }

    pub(crate) fn push_vote(&self, event: VoteChanged) {
        let (block, index) = self.next_position();
        self.votes.lock().push(event.encode(block, index));
    }

    /// Add a log at an explicit block
    pub(crate) fn push_raw_registration(&self, log: LogRecord) {
        self.registrations.lock().push(log);
    }

    pub(crate) fn set_inactive(&self, address: Address) {
        self.inactive.lock().insert(address);
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Block the next fetch until the returned handle is notified
    pub(crate) fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    /// Refresh passes started (one `chancellor` call each)
    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn ranges(&self) -> Vec<BlockRange> {
        self.ranges.lock().clone()
    }

    fn check(&self) -> Result<(), ChainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for StubReader {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(crate::LOCAL_CHAIN_ID)
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.check()?;
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn event_logs(
        &self,
        event: EventKind,
        range: BlockRange,
    ) -> Result<Vec<LogRecord>, ChainError> {
        self.check()?;
        self.ranges.lock().push(range);
        let logs = match event {
            EventKind::Registered => self.registrations.lock().clone(),
            EventKind::Voted => self.votes.lock().clone(),
        };
        Ok(logs
            .into_iter()
            .filter(|log| log.block_number >= range.from && log.block_number <= range.to)
            .collect())
    }

    async fn status(&self, address: &Address) -> Result<bool, ChainError> {
        self.check()?;
        Ok(!self.inactive.lock().contains(address))
    }

    async fn chancellor(&self) -> Result<Address, ChainError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check()?;
        Ok(self.chancellor)
    }

    async fn balance_of(
        &self,
        _contract: ContractKind,
        _address: &Address,
    ) -> Result<U256, ChainError> {
        self.check()?;
        Ok(U256::ZERO)
    }

    async fn assess_votes(&self, _address: &Address) -> Result<U256, ChainError> {
        self.check()?;
        Ok(U256::ZERO)
    }

    async fn ballot_of(&self, _address: &Address) -> Result<Address, ChainError> {
        self.check()?;
        Ok(Address::ZERO)
    }

    async fn stake_amount(&self) -> Result<U256, ChainError> {
        self.check()?;
        Ok(U256::ZERO)
    }
}
