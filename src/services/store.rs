use crate::core::compat::is_eligible;
use crate::models::{pair_key, ActiveMatch, Gender, PreferenceSet, Profile, QueueEntry};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use uuid::Uuid;

/// Errors from conditional store operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("user already has a queue entry")]
    AlreadyQueued,

    #[error("user has no queue entry")]
    NotQueued,

    #[error("user has no active match")]
    NotMatched,

    #[error("candidate queue entry was consumed concurrently")]
    StaleCandidate,

    #[error("requester was matched or reserved concurrently")]
    RequesterUnavailable,
}

/// Point-in-time view of one user's state, read under a single lock
#[derive(Debug, Clone)]
pub struct UserSnapshot {
    pub profile: Option<Profile>,
    pub current_match: Option<ActiveMatch>,
    pub queued: bool,
    pub pending: bool,
}

/// A claimed pair whose private channel is being provisioned
///
/// Holds the removed queue entries so an abort can restore them with their
/// original positions. Both users sit in the store's pending set until the
/// pairing is committed or aborted.
#[derive(Debug, PartialEq)]
pub struct PendingPair {
    pub requester_id: String,
    pub requester_gender: Gender,
    pub requester_prefs: PreferenceSet,
    requester_entry: Option<QueueEntry>,
    candidate_entry: QueueEntry,
}

impl PendingPair {
    pub fn candidate_id(&self) -> &str {
        &self.candidate_entry.user_id
    }
}

#[derive(Default)]
struct StoreState {
    profiles: HashMap<String, Profile>,
    /// FIFO queue keyed by assignment sequence
    queue: BTreeMap<u64, QueueEntry>,
    /// user_id -> seq, enforces one entry per user
    queue_index: HashMap<String, u64>,
    matches: HashMap<Uuid, ActiveMatch>,
    /// user_id -> match_id, enforces one active match per user
    match_index: HashMap<String, Uuid>,
    /// Users reserved by an in-flight pairing (channel being provisioned)
    pending: HashSet<String>,
    /// Permanent rejection blocklist, key-normalized unordered pairs
    rejections: HashSet<(String, String)>,
    next_seq: u64,
}

impl StoreState {
    fn is_unavailable(&self, user_id: &str) -> bool {
        self.match_index.contains_key(user_id) || self.pending.contains(user_id)
    }

    fn insert_entry(&mut self, entry: QueueEntry) {
        self.queue_index.insert(entry.user_id.clone(), entry.seq);
        self.queue.insert(entry.seq, entry);
    }

    fn remove_entry_by_user(&mut self, user_id: &str) -> Option<QueueEntry> {
        let seq = self.queue_index.remove(user_id)?;
        self.queue.remove(&seq)
    }
}

/// Owned transactional state for the matchmaking core
///
/// All profiles, queue entries, active matches and rejection records live
/// behind one mutex; every public method takes the lock exactly once, so
/// each method is one atomic transition. Nothing here awaits, the lock is
/// never held across a suspension point.
pub struct MatchmakingStore {
    state: Mutex<StoreState>,
}

impl MatchmakingStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    fn locked(&self) -> MutexGuard<'_, StoreState> {
        // A poisoned lock means a panic mid-transition; the state itself is
        // still consistent because every transition mutates behind checks.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Profiles ───────────────────────────────────────────────────────

    /// Insert or overwrite a profile
    ///
    /// If the user has a queue entry, its denormalized gender/preference
    /// copy is refreshed in the same transition and the refreshed entry is
    /// returned so the caller can re-run matching against it.
    pub fn upsert_profile(&self, profile: Profile) -> Option<QueueEntry> {
        let mut state = self.locked();

        let seq = state.queue_index.get(&profile.user_id).copied();
        let refreshed = seq.and_then(|seq| {
            let entry = state.queue.get_mut(&seq)?;
            entry.gender = profile.gender;
            entry.preferences = profile.preferences.clone();
            Some(entry.clone())
        });

        state.profiles.insert(profile.user_id.clone(), profile);
        refreshed
    }

    pub fn profile(&self, user_id: &str) -> Option<Profile> {
        self.locked().profiles.get(user_id).cloned()
    }

    /// Read profile, match, queue and pending state in one lock
    pub fn user_snapshot(&self, user_id: &str) -> UserSnapshot {
        let state = self.locked();
        let current_match = state
            .match_index
            .get(user_id)
            .and_then(|id| state.matches.get(id))
            .cloned();

        UserSnapshot {
            profile: state.profiles.get(user_id).cloned(),
            current_match,
            queued: state.queue_index.contains_key(user_id),
            pending: state.pending.contains(user_id),
        }
    }

    // ── Queue ──────────────────────────────────────────────────────────

    /// Conditional insert: fails if the user already has an entry
    pub fn enqueue(
        &self,
        user_id: &str,
        gender: Gender,
        preferences: PreferenceSet,
    ) -> Result<QueueEntry, StoreError> {
        let mut state = self.locked();
        if state.queue_index.contains_key(user_id) {
            return Err(StoreError::AlreadyQueued);
        }

        let seq = state.next_seq;
        state.next_seq += 1;

        let entry = QueueEntry {
            user_id: user_id.to_string(),
            gender,
            preferences,
            enqueued_at: Utc::now(),
            seq,
        };
        state.insert_entry(entry.clone());
        Ok(entry)
    }

    /// Conditional delete for leave-queue
    ///
    /// Reports `NotQueued` when a concurrent match already consumed the
    /// entry, rather than silently succeeding.
    pub fn remove_entry(&self, user_id: &str) -> Result<(), StoreError> {
        let mut state = self.locked();
        state
            .remove_entry_by_user(user_id)
            .map(|_| ())
            .ok_or(StoreError::NotQueued)
    }

    /// Earliest compatible, non-excluded entry in FIFO order
    ///
    /// Deterministic: entries are scanned in seq order and the first hit
    /// wins. The returned entry is a snapshot; `begin_match` re-validates
    /// it at transition time.
    pub fn find_candidate(
        &self,
        requester_id: &str,
        requester_gender: Gender,
        requester_prefs: &PreferenceSet,
        excluded: &HashSet<String>,
    ) -> Option<QueueEntry> {
        let state = self.locked();
        state
            .queue
            .values()
            .find(|entry| {
                is_eligible(requester_id, requester_gender, requester_prefs, excluded, entry)
            })
            .cloned()
    }

    pub fn queue_len(&self) -> usize {
        self.locked().queue.len()
    }

    // ── Pairing transitions ────────────────────────────────────────────

    /// Atomically claim a candidate entry for pairing
    ///
    /// Re-validates, under one lock, that the candidate entry is still
    /// present with the seq it was read at, that the candidate was not
    /// matched or reserved in the meantime, and that the pair has not been
    /// newly blocked. On success both users enter the pending set, the
    /// candidate entry (and the requester's own entry, when the requester
    /// is queued, as on the registration-refresh path) is removed, and the
    /// removed entries travel in the returned `PendingPair` for rollback.
    ///
    /// A losing concurrent caller gets `StaleCandidate` and should retry
    /// the search; a stale-but-present entry is dropped from the queue as
    /// part of the failure.
    pub fn begin_match(
        &self,
        requester_id: &str,
        requester_gender: Gender,
        requester_prefs: &PreferenceSet,
        candidate: &QueueEntry,
    ) -> Result<PendingPair, StoreError> {
        let mut state = self.locked();

        if state.is_unavailable(requester_id) {
            return Err(StoreError::RequesterUnavailable);
        }

        let present = state
            .queue_index
            .get(&candidate.user_id)
            .is_some_and(|seq| *seq == candidate.seq);
        if !present {
            return Err(StoreError::StaleCandidate);
        }

        if state.is_unavailable(&candidate.user_id)
            || state
                .rejections
                .contains(&pair_key(requester_id, &candidate.user_id))
        {
            // Entry exists but the candidate can no longer be paired with
            // this requester; drop it so the retry does not find it again.
            state.remove_entry_by_user(&candidate.user_id);
            return Err(StoreError::StaleCandidate);
        }

        let candidate_entry = state
            .remove_entry_by_user(&candidate.user_id)
            .ok_or(StoreError::StaleCandidate)?;
        let requester_entry = state.remove_entry_by_user(requester_id);

        state.pending.insert(requester_id.to_string());
        state.pending.insert(candidate_entry.user_id.clone());

        Ok(PendingPair {
            requester_id: requester_id.to_string(),
            requester_gender,
            requester_prefs: requester_prefs.clone(),
            requester_entry,
            candidate_entry,
        })
    }

    /// Roll back a claimed pair after provisioning failed
    ///
    /// Restores the candidate entry with its original seq (keeping its
    /// queue position) and re-enqueues the requester: with the original
    /// entry when there was one, otherwise with a fresh entry. Either
    /// participant may have re-registered during the provisioning window,
    /// so restored entries take their gender/preference copy from the
    /// current profile, not from the claimed snapshot.
    pub fn abort_pairing(&self, pair: PendingPair) {
        let mut state = self.locked();
        state.pending.remove(&pair.requester_id);
        state.pending.remove(&pair.candidate_entry.user_id);

        let mut candidate_entry = pair.candidate_entry;
        if let Some(profile) = state.profiles.get(&candidate_entry.user_id) {
            candidate_entry.gender = profile.gender;
            candidate_entry.preferences = profile.preferences.clone();
        }
        state.insert_entry(candidate_entry);

        let mut requester_entry = pair.requester_entry.unwrap_or_else(|| {
            let seq = state.next_seq;
            state.next_seq += 1;
            QueueEntry {
                user_id: pair.requester_id.clone(),
                gender: pair.requester_gender,
                preferences: pair.requester_prefs.clone(),
                enqueued_at: Utc::now(),
                seq,
            }
        });
        if let Some(profile) = state.profiles.get(&pair.requester_id) {
            requester_entry.gender = profile.gender;
            requester_entry.preferences = profile.preferences.clone();
        }
        state.insert_entry(requester_entry);
    }

    /// Commit a claimed pair into an active match
    pub fn commit_pairing(&self, pair: PendingPair, channel_ref: String) -> ActiveMatch {
        let mut state = self.locked();
        state.pending.remove(&pair.requester_id);
        state.pending.remove(&pair.candidate_entry.user_id);

        let record = ActiveMatch {
            match_id: Uuid::new_v4(),
            user_a: pair.requester_id,
            user_b: pair.candidate_entry.user_id,
            channel_ref,
            created_at: Utc::now(),
        };
        state
            .match_index
            .insert(record.user_a.clone(), record.match_id);
        state
            .match_index
            .insert(record.user_b.clone(), record.match_id);
        state.matches.insert(record.match_id, record.clone());
        record
    }

    // ── Ledger ─────────────────────────────────────────────────────────

    pub fn current_match(&self, user_id: &str) -> Option<ActiveMatch> {
        let state = self.locked();
        state
            .match_index
            .get(user_id)
            .and_then(|id| state.matches.get(id))
            .cloned()
    }

    /// Delete the user's active match, optionally recording a rejection
    ///
    /// The deletion and the rejection insert happen in one transition so a
    /// concurrent attempt can never pair the two users in between.
    pub fn remove_match(
        &self,
        user_id: &str,
        record_rejection: bool,
    ) -> Result<ActiveMatch, StoreError> {
        let mut state = self.locked();
        let match_id = *state.match_index.get(user_id).ok_or(StoreError::NotMatched)?;
        let record = state
            .matches
            .remove(&match_id)
            .ok_or(StoreError::NotMatched)?;

        state.match_index.remove(&record.user_a);
        state.match_index.remove(&record.user_b);

        if record_rejection {
            state
                .rejections
                .insert(pair_key(&record.user_a, &record.user_b));
        }
        Ok(record)
    }

    /// All users the given user is pair-blocked with
    pub fn rejected_partners(&self, user_id: &str) -> HashSet<String> {
        let state = self.locked();
        state
            .rejections
            .iter()
            .filter_map(|(a, b)| {
                if a == user_id {
                    Some(b.clone())
                } else if b == user_id {
                    Some(a.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn is_rejected_pair(&self, a: &str, b: &str) -> bool {
        self.locked().rejections.contains(&pair_key(a, b))
    }

    pub fn match_count(&self) -> usize {
        self.locked().matches.len()
    }

    /// All active match records, for inspection and invariant checks
    pub fn active_matches(&self) -> Vec<ActiveMatch> {
        self.locked().matches.values().cloned().collect()
    }
}

impl Default for MatchmakingStore {
    fn default() -> Self {
        Self::new()
    }
}
