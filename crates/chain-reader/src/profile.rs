//! Participant profile - the per-account status panel of the dashboard

use alloy::primitives::{Address, U256};
use serde::Serialize;
use std::fmt::Display;

use crate::error::ChainError;
use crate::reader::ChainReader;
use crate::types::ContractKind;

/// Snapshot of one participant's standing in the DAO
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantProfile {
    pub address: Address,
    /// Governance token balance (base units)
    #[serde(serialize_with = "as_decimal_string")]
    pub token_balance: U256,
    /// Voting credential balance (0 or 1 in practice)
    #[serde(serialize_with = "as_decimal_string")]
    pub voting_balance: U256,
    /// Serving status from the voting contract
    pub active: bool,
    /// Votes currently assigned to this participant
    #[serde(serialize_with = "as_decimal_string")]
    pub votes: U256,
    /// Current ballot; zero address when unregistered
    pub ballot: Address,
    /// Stake required to mint a credential
    #[serde(serialize_with = "as_decimal_string")]
    pub stake_amount: U256,
    pub chancellor: Address,
    pub is_chancellor: bool,
}

// Token amounts overflow JSON number precision in most clients
fn as_decimal_string<T: Display, S: serde::Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

impl ParticipantProfile {
    /// Read every field of the profile; the first failing read fails the whole profile
    pub async fn fetch(
        reader: &dyn ChainReader,
        address: &Address,
    ) -> Result<ParticipantProfile, ChainError> {
        let (token_balance, voting_balance, active, votes, ballot, stake_amount, chancellor) =
            tokio::try_join!(
                reader.balance_of(ContractKind::Token, address),
                reader.balance_of(ContractKind::Voting, address),
                reader.status(address),
                reader.assess_votes(address),
                reader.ballot_of(address),
                reader.stake_amount(),
                reader.chancellor(),
            )?;

        tracing::debug!(%address, active, %votes, "Fetched participant profile");

        Ok(ParticipantProfile {
            address: *address,
            token_balance,
            voting_balance,
            active,
            votes,
            ballot,
            stake_amount,
            chancellor,
            is_chancellor: chancellor == *address,
        })
    }

    /// Registered participants hold a voting credential
    pub fn is_registered(&self) -> bool {
        !self.voting_balance.is_zero()
    }
}
