//! Event Reducer - folds registration and vote events into factions

use async_trait::async_trait;
use chain_reader::{Address, ChainError, ChainReader};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;

use crate::types::{Faction, Participant, Registered, Registry, VoteChanged};

/// Activity lookups in flight at once during [`filter_active`]
pub const DEFAULT_ACTIVITY_CONCURRENCY: usize = 8;

/// Answers "is this participant still serving?"
#[async_trait]
pub trait ActivityCheck: Send + Sync {
    async fn is_active(&self, address: &Address) -> Result<bool, ChainError>;
}

/// [`ActivityCheck`] through the voting contract's `checkStatus`
pub struct ReaderActivity<'a>(pub &'a dyn ChainReader);

#[async_trait]
impl ActivityCheck for ReaderActivity<'_> {
    async fn is_active(&self, address: &Address) -> Result<bool, ChainError> {
        self.0.status(address).await
    }
}

/// Apply registrations, then vote changes, in order.
///
/// A vote change from an address that never registered is ignored.
pub fn fold_registry(registrations: &[Registered], votes: &[VoteChanged]) -> Registry {
    let mut registry = Registry::new();

    for reg in registrations {
        registry.insert(
            reg.voter,
            Participant {
                name: reg.nickname.clone(),
                vote: reg.initial_vote,
            },
        );
    }

    let mut ignored = 0usize;
    for change in votes {
        match registry.get_mut(&change.voter) {
            Some(participant) => participant.vote = change.candidate,
            None => ignored += 1,
        }
    }
    if ignored > 0 {
        tracing::debug!(ignored, "Ignored vote changes from unregistered voters");
    }

    registry
}

/// Keep only active participants, preserving registry order.
///
/// One lookup per address. A failed lookup keeps the participant (fail-open).
pub async fn filter_active(
    registry: &Registry,
    activity: &dyn ActivityCheck,
    concurrency: usize,
) -> Registry {
    let results: Vec<(Address, Result<bool, ChainError>)> =
        stream::iter(registry.addresses().iter().copied())
            .map(|address| async move { (address, activity.is_active(&address).await) })
            .buffered(concurrency.max(1))
            .collect()
            .await;

    let mut active = Registry::new();
    for (address, result) in results {
        let keep = match result {
            Ok(serving) => serving,
            Err(e) => {
                tracing::warn!(%address, error = %e, "Activity check failed, assuming active");
                true
            }
        };
        if keep {
            if let Some(participant) = registry.get(&address) {
                active.insert(address, participant.clone());
            }
        }
    }
    active
}

fn display_name(address: &Address, name: &str) -> String {
    if name.is_empty() {
        let addr = address.to_string();
        format!("Leader {}", &addr[..6])
    } else {
        name.to_string()
    }
}

/// Group active participants under the leader they vote for.
///
/// Votes for an address outside `active` form no faction. Factions come out
/// largest first; equal sizes keep discovery order.
pub fn group_factions(active: &Registry) -> Vec<Faction> {
    let mut factions: Vec<Faction> = Vec::new();
    let mut index: HashMap<Address, usize> = HashMap::new();

    for (_, participant) in active.iter() {
        let leader = participant.vote;
        let Some(leader_entry) = active.get(&leader) else {
            continue;
        };

        let slot = *index.entry(leader).or_insert_with(|| {
            factions.push(Faction::new(
                leader,
                display_name(&leader, &leader_entry.name),
            ));
            factions.len() - 1
        });
        factions[slot].add_supporter(participant.name.clone());
    }

    // Vec::sort_by is stable
    factions.sort_by(|a, b| b.votes.cmp(&a.votes));
    factions
}

/// Full reduction: fold, filter by activity, group and sort
pub async fn reduce_factions(
    registrations: &[Registered],
    votes: &[VoteChanged],
    activity: &dyn ActivityCheck,
) -> Vec<Faction> {
    let registry = fold_registry(registrations, votes);
    let active = filter_active(&registry, activity, DEFAULT_ACTIVITY_CONCURRENCY).await;
    let factions = group_factions(&active);

    tracing::debug!(
        registered = registry.len(),
        active = active.len(),
        factions = factions.len(),
        "Reduced faction events"
    );

    factions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn addr(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[0] = 0xab;
        bytes[19] = last;
        Address::new(bytes)
    }

    const A: u8 = 1;
    const B: u8 = 2;
    const C: u8 = 3;
    const Z: u8 = 26;

    fn reg(voter: u8, name: &str, vote: u8) -> Registered {
        Registered {
            voter: addr(voter),
            nickname: name.to_string(),
            initial_vote: addr(vote),
        }
    }

    fn vote(voter: u8, candidate: u8) -> VoteChanged {
        VoteChanged {
            voter: addr(voter),
            candidate: addr(candidate),
        }
    }

    /// Everyone active except `inactive`; `failing` lookups error
    #[derive(Default)]
    struct StubActivity {
        inactive: HashSet<Address>,
        failing: HashSet<Address>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ActivityCheck for StubActivity {
        async fn is_active(&self, address: &Address) -> Result<bool, ChainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(address) {
                return Err(ChainError::Timeout);
            }
            Ok(!self.inactive.contains(address))
        }
    }

    #[tokio::test]
    async fn test_two_supporters_one_faction() {
        let regs = vec![reg(A, "Alice", B), reg(B, "Bob", B)];
        let votes = vec![vote(A, B)];

        let factions = reduce_factions(&regs, &votes, &StubActivity::default()).await;

        assert_eq!(factions.len(), 1);
        assert_eq!(factions[0].leader, addr(B));
        assert_eq!(factions[0].leader_name, "Bob");
        assert_eq!(factions[0].votes, 2);
        assert_eq!(factions[0].supporters, vec!["Alice", "Bob"]);
    }

    #[tokio::test]
    async fn test_vote_for_unregistered_target_forms_no_faction() {
        let regs = vec![reg(A, "Alice", Z)];
        let factions = reduce_factions(&regs, &[], &StubActivity::default()).await;
        assert!(factions.is_empty());
    }

    #[test]
    fn test_initial_vote_counts_without_vote_event() {
        let registry = fold_registry(&[reg(A, "Alice", B), reg(B, "Bob", C)], &[]);
        assert_eq!(registry.get(&addr(A)).unwrap().vote, addr(B));
    }

    #[test]
    fn test_later_vote_overrides_initial() {
        let registry = fold_registry(
            &[reg(A, "Alice", B), reg(B, "Bob", B), reg(C, "Carol", C)],
            &[vote(A, C)],
        );
        assert_eq!(registry.get(&addr(A)).unwrap().vote, addr(C));

        let factions = group_factions(&registry);
        let carol = factions.iter().find(|f| f.leader == addr(C)).unwrap();
        assert_eq!(carol.supporters, vec!["Alice", "Carol"]);
    }

    #[test]
    fn test_vote_from_unregistered_voter_ignored() {
        let registry = fold_registry(&[reg(A, "Alice", A)], &[vote(B, A)]);
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(&addr(B)));

        let factions = group_factions(&registry);
        assert_eq!(factions.len(), 1);
        assert_eq!(factions[0].votes, 1);
    }

    #[tokio::test]
    async fn test_inactive_participant_counts_nowhere() {
        let regs = vec![
            reg(A, "Alice", B),
            reg(B, "Bob", B),
            reg(C, "Carol", C),
        ];
        // Carol is inactive: neither leader nor supporter
        let activity = StubActivity {
            inactive: [addr(C)].into_iter().collect(),
            ..Default::default()
        };
        let factions = reduce_factions(&regs, &[vote(B, C)], &activity).await;

        // Bob votes for inactive Carol, so only Alice supports Bob
        assert_eq!(factions.len(), 1);
        assert_eq!(factions[0].leader, addr(B));
        assert_eq!(factions[0].supporters, vec!["Alice"]);
        assert!(factions.iter().all(|f| !f.supporters.contains(&"Carol".to_string())));
    }

    #[tokio::test]
    async fn test_failed_activity_check_is_fail_open() {
        let regs = vec![reg(A, "Alice", A)];
        let activity = StubActivity {
            failing: [addr(A)].into_iter().collect(),
            ..Default::default()
        };
        let factions = reduce_factions(&regs, &[], &activity).await;
        assert_eq!(factions.len(), 1);
        assert_eq!(factions[0].leader, addr(A));
    }

    #[tokio::test]
    async fn test_one_activity_check_per_address() {
        let regs = vec![reg(A, "Alice", B), reg(B, "Bob", B), reg(A, "Alice", B)];
        let activity = StubActivity::default();
        reduce_factions(&regs, &[vote(A, B), vote(A, B)], &activity).await;
        assert_eq!(activity.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_filter_preserves_order_under_concurrency() {
        let regs: Vec<_> = (1..=20u8).map(|i| reg(i, &format!("p{}", i), i)).collect();
        let registry = fold_registry(&regs, &[]);
        let active = filter_active(&registry, &StubActivity::default(), 4).await;
        assert_eq!(active.addresses(), registry.addresses());
    }

    #[test]
    fn test_sorted_descending_with_stable_ties() {
        // Discovery order of leaders: A, C, B
        let registry = fold_registry(
            &[
                reg(A, "Alice", A),
                reg(C, "Carol", C),
                reg(B, "Bob", B),
                reg(4, "Dan", B),
            ],
            &[],
        );
        let factions = group_factions(&registry);
        let leaders: Vec<_> = factions.iter().map(|f| f.leader).collect();
        assert_eq!(leaders, vec![addr(B), addr(A), addr(C)]);
        assert_eq!(factions[0].votes, 2);
    }

    #[test]
    fn test_self_vote_is_faction_of_one() {
        let factions = group_factions(&fold_registry(&[reg(A, "Alice", A)], &[]));
        assert_eq!(factions.len(), 1);
        assert_eq!(factions[0].supporters, vec!["Alice"]);
    }

    #[test]
    fn test_unnamed_leader_gets_address_label() {
        let factions = group_factions(&fold_registry(&[reg(A, "", A)], &[]));
        // Checksummed prefix, compared case-insensitively
        assert_eq!(factions[0].leader_name.to_lowercase(), "leader 0xab00");
    }

    #[tokio::test]
    async fn test_reduction_is_deterministic() {
        let regs = vec![
            reg(A, "Alice", B),
            reg(B, "Bob", C),
            reg(C, "Carol", C),
            reg(4, "Dan", A),
        ];
        let votes = vec![vote(B, B), vote(4, C)];
        let first = reduce_factions(&regs, &votes, &StubActivity::default()).await;
        let second = reduce_factions(&regs, &votes, &StubActivity::default()).await;
        assert_eq!(first, second);
    }
}
