//! Plain-text rendering for the `show` and `profile` modes

use chain_reader::ParticipantProfile;
use leaderboard::{DisplaySnapshot, ViewState};
use std::fmt::Write;

fn state_label(state: ViewState) -> &'static str {
    match state {
        ViewState::Idle => "not loaded",
        ViewState::ShowingCached => "cached",
        ViewState::Refreshing => "refreshing",
        ViewState::ShowingFresh => "fresh",
        ViewState::Failed => "unavailable (placeholder data)",
    }
}

/// Faction table, largest first, chancellor marked with `*`
pub fn render_factions(snapshot: &DisplaySnapshot) -> String {
    let mut out = String::new();

    let updated = snapshot
        .last_updated
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());
    let _ = writeln!(
        out,
        "Factions ({}), last updated {}",
        state_label(snapshot.state),
        updated
    );

    if snapshot.factions.is_empty() {
        let _ = writeln!(out, "No active factions");
        return out;
    }

    let _ = writeln!(out, "{:>3}  {:<24} {:>5}  Supporters", "#", "Leader", "Votes");
    for (rank, faction) in snapshot.factions.iter().enumerate() {
        let marker = if snapshot.is_chancellor(faction) { "*" } else { " " };
        let _ = writeln!(
            out,
            "{:>3}{} {:<24} {:>5}  {}",
            rank + 1,
            marker,
            faction.leader_name,
            faction.votes,
            faction.supporters.join(", ")
        );
    }

    if let Some(chancellor) = snapshot.chancellor {
        let _ = writeln!(out, "* current chancellor {}", chancellor);
    }
    out
}

pub fn render_profile(profile: &ParticipantProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Participant {}", profile.address);
    let _ = writeln!(out, "  Registered:    {}", profile.is_registered());
    let _ = writeln!(out, "  Active:        {}", profile.active);
    let _ = writeln!(out, "  Token balance: {}", profile.token_balance);
    let _ = writeln!(out, "  Votes:         {}", profile.votes);
    let _ = writeln!(out, "  Voting for:    {}", profile.ballot);
    let _ = writeln!(out, "  Stake amount:  {}", profile.stake_amount);
    let _ = writeln!(
        out,
        "  Chancellor:    {}{}",
        profile.chancellor,
        if profile.is_chancellor { " (you)" } else { "" }
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_reader::{Address, U256};
    use chrono::{TimeZone, Utc};
    use factions::{placeholder_factions, Faction};

    fn addr(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Address::new(bytes)
    }

    #[test]
    fn test_table_marks_chancellor() {
        let mut bob = Faction::new(addr(2), "Bob");
        bob.add_supporter("Alice");
        bob.add_supporter("Bob");
        let mut carol = Faction::new(addr(3), "Carol");
        carol.add_supporter("Carol");

        let snapshot = DisplaySnapshot {
            state: ViewState::ShowingFresh,
            factions: vec![bob, carol],
            chancellor: Some(addr(2)),
            last_updated: Utc.timestamp_millis_opt(0).single(),
            is_refreshing: false,
        };

        let text = render_factions(&snapshot);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Factions (fresh), last updated 1970-01-01 00:00:00 UTC");
        assert!(lines[2].starts_with("  1* Bob"));
        assert!(lines[2].ends_with("Alice, Bob"));
        assert!(lines[3].starts_with("  2  Carol"));
        assert!(lines[4].starts_with("* current chancellor"));
    }

    #[test]
    fn test_placeholder_state_is_labelled() {
        let snapshot = DisplaySnapshot {
            state: ViewState::Failed,
            factions: placeholder_factions(),
            chancellor: None,
            last_updated: None,
            is_refreshing: false,
        };
        let text = render_factions(&snapshot);
        assert!(text.starts_with("Factions (unavailable (placeholder data)), last updated never"));
        assert!(text.contains("The Founder"));
        assert!(!text.contains("* current chancellor"));
    }

    #[test]
    fn test_empty_table() {
        let snapshot = DisplaySnapshot {
            state: ViewState::ShowingFresh,
            factions: Vec::new(),
            chancellor: Some(addr(1)),
            last_updated: None,
            is_refreshing: false,
        };
        assert!(render_factions(&snapshot).contains("No active factions"));
    }

    #[test]
    fn test_profile_flags_own_chancellorship() {
        let profile = ParticipantProfile {
            address: addr(2),
            token_balance: U256::from(10),
            voting_balance: U256::from(1),
            active: true,
            votes: U256::from(3),
            ballot: addr(2),
            stake_amount: U256::from(5),
            chancellor: addr(2),
            is_chancellor: true,
        };
        let text = render_profile(&profile);
        assert!(text.contains("Registered:    true"));
        assert!(text.contains("(you)"));
    }
}
