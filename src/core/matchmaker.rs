use crate::core::gender::{normalize_gender, parse_preferences, RegistrationError};
use crate::models::{ActiveMatch, Gender, PreferenceSet, Profile};
use crate::services::gateway::{ChannelProvisioner, GatewayError, NotificationGateway};
use crate::services::store::{MatchmakingStore, PendingPair, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on stale-candidate retries within one attempt
///
/// A losing concurrent claim retries the queue search this many times
/// before degrading to a plain enqueue.
const MAX_PAIRING_ATTEMPTS: usize = 5;

/// Precondition and collaborator failures surfaced to the caller
///
/// The display strings double as the user-facing command replies.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("You are not registered. Please register first.")]
    NotRegistered,

    #[error("You are already matched with another user. Please check your existing match.")]
    AlreadyMatched,

    #[error("You are already in queue.")]
    AlreadyQueued,

    #[error("You are not in the queue.")]
    NotQueued,

    #[error("You are not currently matched with anyone.")]
    NotMatched,

    #[error("We could not set up your private channel. You have been added to the queue; please try again shortly.")]
    ChannelProvisioning(#[source] GatewayError),
}

/// Outcome of a find-match attempt
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Matched {
        partner_id: String,
        channel_ref: String,
    },
    Queued,
}

/// Result of a registration, including an immediate pairing when the
/// queue-refresh path found one
#[derive(Debug, Clone)]
pub struct Registration {
    pub profile: Profile,
    pub updated: bool,
    pub paired: Option<MatchOutcome>,
}

/// A closed match (confirm-date, unmatch or reject)
#[derive(Debug, Clone)]
pub struct ClosedMatch {
    pub partner_id: String,
    pub channel_ref: String,
}

struct PairingRequest {
    user_id: String,
    gender: Gender,
    preferences: PreferenceSet,
}

/// Orchestrates the matchmaking state machine
///
/// Sole writer of queue and match transitions; the store provides the
/// atomic conditional primitives, the gateways provide channel
/// provisioning and direct messages.
pub struct MatchMaker {
    store: Arc<MatchmakingStore>,
    channels: Arc<dyn ChannelProvisioner>,
    notifier: Arc<dyn NotificationGateway>,
}

impl MatchMaker {
    pub fn new(
        store: Arc<MatchmakingStore>,
        channels: Arc<dyn ChannelProvisioner>,
        notifier: Arc<dyn NotificationGateway>,
    ) -> Self {
        Self {
            store,
            channels,
            notifier,
        }
    }

    // ── Registration ───────────────────────────────────────────────────

    /// Validate, normalize and upsert a profile
    ///
    /// If the user already sits in the queue, the entry's denormalized
    /// copy is refreshed in the same store transition and matching is
    /// re-run immediately: the update may have made an existing queue
    /// member compatible.
    pub async fn register(
        &self,
        user_id: &str,
        name: &str,
        age: u8,
        gender_raw: &str,
        preference_raw: &[String],
        bio: &str,
    ) -> Result<Registration, RegistrationError> {
        let gender = normalize_gender(gender_raw).map_err(RegistrationError::InvalidGender)?;
        let preferences = parse_preferences(preference_raw)?;

        let profile = Profile {
            user_id: user_id.to_string(),
            name: name.to_string(),
            age,
            gender,
            preferences: preferences.clone(),
            bio: bio.to_string(),
        };

        let updated = self.store.profile(user_id).is_some();
        let refreshed = self.store.upsert_profile(profile.clone());
        info!(user_id, updated, "profile registered");

        let mut paired = None;
        if refreshed.is_some() {
            debug!(user_id, "queue entry refreshed, re-running matching");
            let request = PairingRequest {
                user_id: user_id.to_string(),
                gender,
                preferences,
            };
            match self.pair_from_queue(&request).await {
                Ok(outcome) => paired = outcome,
                Err(MatchError::ChannelProvisioning(e)) => {
                    // Both parties are back in the queue; registration
                    // itself still succeeded.
                    warn!(user_id, error = %e, "provisioning failed during queue refresh");
                }
                Err(e) => {
                    debug!(user_id, error = %e, "queue refresh pairing stopped");
                }
            }
        }

        Ok(Registration {
            profile,
            updated,
            paired,
        })
    }

    // ── Matching ───────────────────────────────────────────────────────

    /// Find a compatible partner or join the queue
    pub async fn attempt_match(&self, user_id: &str) -> Result<MatchOutcome, MatchError> {
        let snapshot = self.store.user_snapshot(user_id);
        let profile = snapshot.profile.ok_or(MatchError::NotRegistered)?;
        if snapshot.current_match.is_some() || snapshot.pending {
            return Err(MatchError::AlreadyMatched);
        }
        if snapshot.queued {
            return Err(MatchError::AlreadyQueued);
        }

        let request = PairingRequest {
            user_id: user_id.to_string(),
            gender: profile.gender,
            preferences: profile.preferences.clone(),
        };

        if let Some(outcome) = self.pair_from_queue(&request).await? {
            return Ok(outcome);
        }

        // No candidate (or retries exhausted): wait in the queue
        match self
            .store
            .enqueue(user_id, profile.gender, profile.preferences)
        {
            Ok(entry) => {
                info!(user_id, seq = entry.seq, "no candidate found, enqueued");
                Ok(MatchOutcome::Queued)
            }
            Err(StoreError::AlreadyQueued) => Err(MatchError::AlreadyQueued),
            Err(e) => {
                // enqueue only ever fails with AlreadyQueued
                warn!(user_id, error = %e, "unexpected enqueue failure");
                Err(MatchError::AlreadyQueued)
            }
        }
    }

    /// Search, claim and provision, with bounded stale-candidate retries
    ///
    /// `Ok(None)` means no compatible candidate was found (or retries ran
    /// out) and the requester should wait in the queue.
    async fn pair_from_queue(
        &self,
        request: &PairingRequest,
    ) -> Result<Option<MatchOutcome>, MatchError> {
        let excluded = self.store.rejected_partners(&request.user_id);

        for attempt in 0..MAX_PAIRING_ATTEMPTS {
            let Some(candidate) = self.store.find_candidate(
                &request.user_id,
                request.gender,
                &request.preferences,
                &excluded,
            ) else {
                return Ok(None);
            };

            match self.store.begin_match(
                &request.user_id,
                request.gender,
                &request.preferences,
                &candidate,
            ) {
                Ok(pair) => {
                    let outcome = self.provision_and_commit(pair).await?;
                    return Ok(Some(outcome));
                }
                Err(StoreError::StaleCandidate) => {
                    debug!(
                        requester = %request.user_id,
                        candidate = %candidate.user_id,
                        attempt,
                        "candidate went stale, retrying search"
                    );
                }
                Err(StoreError::RequesterUnavailable) => {
                    // A concurrent attempt for the same user won the claim
                    return Err(MatchError::AlreadyMatched);
                }
                Err(e) => {
                    warn!(requester = %request.user_id, error = %e, "unexpected claim failure");
                    return Ok(None);
                }
            }
        }

        debug!(requester = %request.user_id, "pairing retries exhausted, degrading to queue");
        Ok(None)
    }

    /// Provision the private channel, then commit or roll back
    async fn provision_and_commit(&self, pair: PendingPair) -> Result<MatchOutcome, MatchError> {
        let requester_id = pair.requester_id.clone();
        let partner_id = pair.candidate_id().to_string();
        let participants = [requester_id.clone(), partner_id.clone()];

        match self.channels.create_private_space(&participants).await {
            Ok(channel_ref) => {
                let record = self.store.commit_pairing(pair, channel_ref.clone());
                info!(
                    match_id = %record.match_id,
                    user_a = %record.user_a,
                    user_b = %record.user_b,
                    "match formed"
                );

                let text =
                    format!("You have been matched! Your private channel is: {}", channel_ref);
                self.notify(&requester_id, &text).await;
                self.notify(&partner_id, &text).await;

                Ok(MatchOutcome::Matched {
                    partner_id,
                    channel_ref,
                })
            }
            Err(e) => {
                warn!(
                    requester = %requester_id,
                    partner = %partner_id,
                    error = %e,
                    "channel provisioning failed, rolling back pairing"
                );
                self.store.abort_pairing(pair);
                Err(MatchError::ChannelProvisioning(e))
            }
        }
    }

    // ── Queue ──────────────────────────────────────────────────────────

    /// Explicitly leave the waiting queue
    ///
    /// Loses cleanly against a concurrent match: if the entry was already
    /// consumed, the caller gets `NotQueued` instead of a silent no-op.
    pub fn leave_queue(&self, user_id: &str) -> Result<(), MatchError> {
        self.store.remove_entry(user_id).map_err(|_| MatchError::NotQueued)?;
        info!(user_id, "left the queue");
        Ok(())
    }

    // ── Ledger verbs ───────────────────────────────────────────────────

    /// Confirm a successful date: terminal success, no rejection record
    pub async fn confirm_date(&self, user_id: &str) -> Result<ClosedMatch, MatchError> {
        let closed = self.close_match(user_id, false).await?;
        let text = "Congratulations! You and your match are now officially dating!";
        self.notify(user_id, text).await;
        self.notify(&closed.partner_id, text).await;
        Ok(closed)
    }

    /// End the match without penalty: both may match anyone again,
    /// including each other
    pub async fn unmatch(&self, user_id: &str) -> Result<ClosedMatch, MatchError> {
        let closed = self.close_match(user_id, false).await?;
        let text = "Your match has ended. You are free to find a new match.";
        self.notify(user_id, text).await;
        self.notify(&closed.partner_id, text).await;
        Ok(closed)
    }

    /// End the match and permanently block the pair
    pub async fn reject(&self, user_id: &str) -> Result<ClosedMatch, MatchError> {
        let closed = self.close_match(user_id, true).await?;
        let text = "You have been rejected. You will no longer match with this user again.";
        self.notify(user_id, text).await;
        self.notify(&closed.partner_id, text).await;
        Ok(closed)
    }

    /// Partner profile snapshot for the current match
    pub fn match_info(&self, user_id: &str) -> Result<(Profile, ActiveMatch), MatchError> {
        let record = self
            .store
            .current_match(user_id)
            .ok_or(MatchError::NotMatched)?;
        let partner_id = record
            .partner_of(user_id)
            .ok_or(MatchError::NotMatched)?
            .to_string();

        // Profiles are never deleted, so a matched partner always has one
        let partner = self
            .store
            .profile(&partner_id)
            .ok_or(MatchError::NotMatched)?;
        Ok((partner, record))
    }

    /// Delete the match (atomically, with the rejection record when asked)
    /// and tear down the channel
    async fn close_match(
        &self,
        user_id: &str,
        record_rejection: bool,
    ) -> Result<ClosedMatch, MatchError> {
        let record = self
            .store
            .remove_match(user_id, record_rejection)
            .map_err(|_| MatchError::NotMatched)?;

        let partner_id = record
            .partner_of(user_id)
            .unwrap_or(&record.user_b)
            .to_string();

        info!(
            match_id = %record.match_id,
            user_id,
            partner = %partner_id,
            rejection = record_rejection,
            "match closed"
        );

        // Channel teardown is best-effort; the ledger mutation stands
        if let Err(e) = self.channels.destroy(&record.channel_ref).await {
            warn!(channel_ref = %record.channel_ref, error = %e, "failed to destroy channel");
        }

        Ok(ClosedMatch {
            partner_id,
            channel_ref: record.channel_ref,
        })
    }

    /// Direct message, failures logged and swallowed
    async fn notify(&self, user_id: &str, text: &str) {
        if let Err(e) = self.notifier.send(user_id, text).await {
            warn!(user_id, error = %e, "failed to deliver notification");
        }
    }
}
