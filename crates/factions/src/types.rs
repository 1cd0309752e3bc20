//! Event and leaderboard types

use chain_reader::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A participant registered and cast an initial vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    pub voter: Address,
    pub nickname: String,
    pub initial_vote: Address,
}

/// A registered participant moved their vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteChanged {
    pub voter: Address,
    pub candidate: Address,
}

/// Registry entry: display name and current vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub vote: Address,
}

/// Participants keyed by address, iterated in first-registration order.
///
/// Re-inserting an address replaces its entry but keeps its original
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    order: Vec<Address>,
    entries: HashMap<Address, Participant>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: Address, participant: Participant) {
        if self.entries.insert(address, participant).is_none() {
            self.order.push(address);
        }
    }

    pub fn get(&self, address: &Address) -> Option<&Participant> {
        self.entries.get(address)
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut Participant> {
        self.entries.get_mut(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.entries.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Addresses in insertion order
    pub fn addresses(&self) -> &[Address] {
        &self.order
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Participant)> {
        self.order
            .iter()
            .filter_map(move |addr| self.entries.get(addr).map(|p| (addr, p)))
    }
}

/// A leader and the active participants currently voting for them.
///
/// Field names match the persisted cache layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faction {
    pub leader: Address,
    pub leader_name: String,
    pub votes: u64,
    pub supporters: Vec<String>,
}

impl Faction {
    pub fn new(leader: Address, leader_name: impl Into<String>) -> Self {
        Self {
            leader,
            leader_name: leader_name.into(),
            votes: 0,
            supporters: Vec::new(),
        }
    }

    /// Record one more supporter
    pub fn add_supporter(&mut self, name: impl Into<String>) {
        self.votes += 1;
        self.supporters.push(name.into());
    }
}
