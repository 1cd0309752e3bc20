//! Faction source - reads a recent block window and reduces it

use chain_reader::{Address, BlockRange, ChainError, ChainReader, EventKind};
use factions::{
    decode_registrations, decode_votes, placeholder_with_chancellor, reduce_factions, Faction,
    ReaderActivity,
};
use std::sync::Arc;

/// Blocks read behind the head (~5 hours on Polygon)
pub const DEFAULT_LOOKBACK_BLOCKS: u64 = 10_000;

/// Result of one successful read-and-reduce pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactionSnapshot {
    pub factions: Vec<Faction>,
    pub chancellor: Address,
    /// Block window the events were read from
    pub range: BlockRange,
}

/// Chain Reader + Event Reducer, wired together
#[derive(Clone)]
pub struct FactionSource {
    reader: Arc<dyn ChainReader>,
    lookback_blocks: u64,
}

impl FactionSource {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self {
            reader,
            lookback_blocks: DEFAULT_LOOKBACK_BLOCKS,
        }
    }

    pub fn with_lookback(mut self, blocks: u64) -> Self {
        self.lookback_blocks = blocks;
        self
    }

    pub fn reader(&self) -> &Arc<dyn ChainReader> {
        &self.reader
    }

    /// Read both event streams from one block range and reduce them.
    ///
    /// Reader failures propagate; malformed events and failed activity
    /// checks do not.
    pub async fn fetch(&self) -> Result<FactionSnapshot, ChainError> {
        let chancellor = self.reader.chancellor().await?;
        let head = self.reader.block_number().await?;
        let range = BlockRange::lookback(head, self.lookback_blocks);

        let (reg_logs, vote_logs) = tokio::try_join!(
            self.reader.event_logs(EventKind::Registered, range),
            self.reader.event_logs(EventKind::Voted, range),
        )?;

        tracing::debug!(
            from = range.from,
            to = range.to,
            registrations = reg_logs.len(),
            votes = vote_logs.len(),
            "Read faction events"
        );

        let factions = if reg_logs.is_empty() && vote_logs.is_empty() {
            tracing::info!("No faction events in window, using placeholder factions");
            placeholder_with_chancellor(chancellor)
        } else {
            let registrations = decode_registrations(&reg_logs);
            let votes = decode_votes(&vote_logs);
            reduce_factions(&registrations, &votes, &ReaderActivity(self.reader.as_ref())).await
        };

        Ok(FactionSnapshot {
            factions,
            chancellor,
            range,
        })
    }
}
