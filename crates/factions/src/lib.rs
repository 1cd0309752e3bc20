//! Factions - leaderboard derivation from on-chain events
//!
//! Pipeline:
//! - Decode `Registered` / `Voted` logs into typed events (malformed logs are skipped)
//! - Fold them into a registry of participants and their current votes
//! - Keep only participants the ledger reports as active (fail-open)
//! - Group supporters under the leader they vote for, largest faction first

pub mod events;
pub mod placeholder;
pub mod reducer;
pub mod types;

pub use events::{decode_registrations, decode_votes, DecodeError};
pub use placeholder::{placeholder_factions, placeholder_with_chancellor, FOUNDER};
pub use reducer::{
    filter_active, fold_registry, group_factions, reduce_factions, ActivityCheck,
    ReaderActivity, DEFAULT_ACTIVITY_CONCURRENCY,
};
pub use types::{Faction, Participant, Registered, Registry, VoteChanged};
