use crate::models::{Gender, PreferenceSet, QueueEntry};
use std::collections::HashSet;

/// Mutual compatibility predicate between a requester and a queued candidate
///
/// Both directions must hold: the candidate's gender is acceptable to the
/// requester, and the requester's gender is acceptable to the candidate.
/// Symmetric by construction.
#[inline]
pub fn mutually_compatible(
    requester_gender: Gender,
    requester_prefs: &PreferenceSet,
    candidate: &QueueEntry,
) -> bool {
    requester_prefs.accepts(candidate.gender)
        && candidate.preferences.accepts(requester_gender)
}

/// Full candidate filter used by the queue search
///
/// On top of mutual compatibility, the candidate must not be the requester
/// themselves and must not be on the requester's rejection blocklist.
#[inline]
pub fn is_eligible(
    requester_id: &str,
    requester_gender: Gender,
    requester_prefs: &PreferenceSet,
    excluded: &HashSet<String>,
    candidate: &QueueEntry,
) -> bool {
    candidate.user_id != requester_id
        && !excluded.contains(&candidate.user_id)
        && mutually_compatible(requester_gender, requester_prefs, candidate)
}
