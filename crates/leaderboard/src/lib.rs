//! Leaderboard - cached faction leaderboard with a refresh policy
//!
//! This crate provides:
//! - A durable single-slot cache with network-dependent staleness
//! - A faction source that reads a recent block window and reduces it
//! - The view state machine: cached-first display, single-flight refresh,
//!   delayed refresh after transactions, visibility-triggered checks

pub mod cache;
pub mod clock;
pub mod source;
pub mod view;

#[cfg(test)]
mod testing;

pub use cache::{
    CacheEntry, CacheError, CacheStore, MemoryCacheStore, SledCacheStore, StalenessPolicy,
    FACTIONS_KEY, FETCHED_AT_KEY,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use source::{FactionSnapshot, FactionSource, DEFAULT_LOOKBACK_BLOCKS};
pub use view::{
    DisplaySnapshot, LeaderboardView, RefreshMode, RefreshOutcome, ViewConfig, ViewState,
};

/// Polygon mainnet chain id (the production network)
pub const POLYGON_CHAIN_ID: u64 = 137;

/// Chain id of a local development node
pub const LOCAL_CHAIN_ID: u64 = 1337;
