//! Hardcoded faction list shown when nothing better is available

use alloy::primitives::address;
use chain_reader::Address;

use crate::types::Faction;

/// Founder account of the local development deployment
pub const FOUNDER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");

const CHALLENGER: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");

const REBEL: Address = address!("3c44cdddb6a900fa2b585dd299e03d12fa4293bc");

/// The fallback leaderboard
pub fn placeholder_factions() -> Vec<Faction> {
    let mut founder = Faction::new(FOUNDER, "The Founder");
    founder.add_supporter("The Founder");

    vec![
        founder,
        Faction::new(CHALLENGER, "The Challenger"),
        Faction::new(REBEL, "The Rebel"),
    ]
}

/// Fallback list headed by the current chancellor.
///
/// Used when the lookback window holds no registration or vote events.
pub fn placeholder_with_chancellor(chancellor: Address) -> Vec<Faction> {
    let mut factions = placeholder_factions();
    if let Some(first) = factions.first_mut() {
        first.leader = chancellor;
        first.leader_name = if chancellor == FOUNDER {
            "The Founder".to_string()
        } else {
            "Current Chancellor".to_string()
        };
    }
    factions
}
