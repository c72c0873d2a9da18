// Integration tests for Blindmatch: full matchmaker flows against the
// in-memory store with a stubbed host platform.

use async_trait::async_trait;
use blindmatch::core::{MatchError, MatchOutcome};
use blindmatch::services::GatewayError;
use blindmatch::{ChannelProvisioner, MatchMaker, MatchmakingStore, NotificationGateway};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Stub platform: hands out sequential channel refs and records every
/// notification; provisioning can be switched to fail.
struct StubPlatform {
    fail_provisioning: AtomicBool,
    next_channel: AtomicUsize,
    destroyed: Mutex<Vec<String>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl StubPlatform {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_provisioning: AtomicBool::new(false),
            next_channel: AtomicUsize::new(1),
            destroyed: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent_to(&self, user_id: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == user_id)
            .count()
    }
}

#[async_trait]
impl ChannelProvisioner for StubPlatform {
    async fn create_private_space(
        &self,
        _participant_ids: &[String],
    ) -> Result<String, GatewayError> {
        if self.fail_provisioning.load(Ordering::SeqCst) {
            return Err(GatewayError::Api("provisioning unavailable".to_string()));
        }
        let n = self.next_channel.fetch_add(1, Ordering::SeqCst);
        Ok(format!("chan-{}", n))
    }

    async fn destroy(&self, channel_ref: &str) -> Result<(), GatewayError> {
        self.destroyed.lock().unwrap().push(channel_ref.to_string());
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for StubPlatform {
    async fn send(&self, user_id: &str, text: &str) -> Result<(), GatewayError> {
        self.sent
            .lock()
            .unwrap()
            .push((user_id.to_string(), text.to_string()));
        Ok(())
    }
}

fn setup() -> (MatchMaker, Arc<MatchmakingStore>, Arc<StubPlatform>) {
    let platform = StubPlatform::new();
    let store = Arc::new(MatchmakingStore::new());
    let maker = MatchMaker::new(store.clone(), platform.clone(), platform.clone());
    (maker, store, platform)
}

async fn register(maker: &MatchMaker, id: &str, gender: &str, prefs: &str) {
    let tokens: Vec<String> = prefs.split(',').map(|t| t.trim().to_string()).collect();
    maker
        .register(id, &format!("User {}", id), 25, gender, &tokens, "bio")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_scenario_a_queues_then_b_pairs() {
    let (maker, store, platform) = setup();
    register(&maker, "a", "Male", "Female").await;
    register(&maker, "b", "Female", "Male").await;

    assert!(matches!(
        maker.attempt_match("a").await.unwrap(),
        MatchOutcome::Queued
    ));

    let outcome = maker.attempt_match("b").await.unwrap();
    let MatchOutcome::Matched {
        partner_id,
        channel_ref,
    } = outcome
    else {
        panic!("expected a match");
    };
    assert_eq!(partner_id, "a");
    assert!(!channel_ref.is_empty());

    // A match with {a, b} exists, the queue is empty, both were notified
    let record = store.current_match("a").unwrap();
    assert!(record.involves("a") && record.involves("b"));
    assert_eq!(store.queue_len(), 0);
    assert_eq!(platform.sent_to("a"), 1);
    assert_eq!(platform.sent_to("b"), 1);
}

#[tokio::test]
async fn test_scenario_reject_then_third_party() {
    let (maker, store, _platform) = setup();
    register(&maker, "a", "Male", "Female").await;
    register(&maker, "b", "Female", "Male").await;

    maker.attempt_match("a").await.unwrap();
    maker.attempt_match("b").await.unwrap();

    maker.reject("a").await.unwrap();
    assert!(store.current_match("a").is_none());
    assert!(store.is_rejected_pair("a", "b"));

    // Both re-register and try again: no pairing between a and b
    register(&maker, "a", "Male", "Female").await;
    register(&maker, "b", "Female", "Male").await;
    assert!(matches!(
        maker.attempt_match("a").await.unwrap(),
        MatchOutcome::Queued
    ));
    assert!(matches!(
        maker.attempt_match("b").await.unwrap(),
        MatchOutcome::Queued
    ));
    assert_eq!(store.match_count(), 0);

    // Pairing a with a third compatible user c succeeds normally
    register(&maker, "c", "Female", "Male").await;
    let outcome = maker.attempt_match("c").await.unwrap();
    let MatchOutcome::Matched { partner_id, .. } = outcome else {
        panic!("expected c to match");
    };
    assert_eq!(partner_id, "a");
}

#[tokio::test]
async fn test_unmatch_round_trip_can_repair() {
    let (maker, store, platform) = setup();
    register(&maker, "a", "Male", "Female").await;
    register(&maker, "b", "Female", "Male").await;

    maker.attempt_match("a").await.unwrap();
    maker.attempt_match("b").await.unwrap();
    let first_channel = store.current_match("a").unwrap().channel_ref;

    maker.unmatch("a").await.unwrap();
    assert!(store.current_match("a").is_none());
    assert!(!store.is_rejected_pair("a", "b"));
    assert!(platform
        .destroyed
        .lock()
        .unwrap()
        .contains(&first_channel));

    // Former partners can find each other again
    maker.attempt_match("b").await.unwrap();
    let outcome = maker.attempt_match("a").await.unwrap();
    let MatchOutcome::Matched { partner_id, .. } = outcome else {
        panic!("expected re-pairing");
    };
    assert_eq!(partner_id, "b");
}

#[tokio::test]
async fn test_confirm_date_is_terminal_without_penalty() {
    let (maker, store, platform) = setup();
    register(&maker, "a", "Male", "Female").await;
    register(&maker, "b", "Female", "Male").await;

    maker.attempt_match("a").await.unwrap();
    maker.attempt_match("b").await.unwrap();

    let closed = maker.confirm_date("b").await.unwrap();
    assert_eq!(closed.partner_id, "a");
    assert!(store.current_match("a").is_none());
    assert!(!store.is_rejected_pair("a", "b"));
    // Match DM + congratulations DM for each user
    assert_eq!(platform.sent_to("a"), 2);
    assert_eq!(platform.sent_to("b"), 2);

    assert!(matches!(
        maker.confirm_date("a").await.unwrap_err(),
        MatchError::NotMatched
    ));
}

#[tokio::test]
async fn test_provisioning_failure_reports_transient_and_restores_queue() {
    let (maker, store, platform) = setup();
    register(&maker, "a", "Male", "Female").await;
    register(&maker, "b", "Female", "Male").await;

    maker.attempt_match("a").await.unwrap();
    platform.fail_provisioning.store(true, Ordering::SeqCst);

    let err = maker.attempt_match("b").await.unwrap_err();
    assert!(matches!(err, MatchError::ChannelProvisioning(_)));
    assert_eq!(store.match_count(), 0);
    assert_eq!(store.queue_len(), 2);
    // No one was told they matched
    assert_eq!(platform.sent_to("a"), 0);
    assert_eq!(platform.sent_to("b"), 0);
}

#[tokio::test]
async fn test_invalid_gender_and_preferences_reject_registration() {
    let (maker, store, _platform) = setup();

    let err = maker
        .register("a", "A", 25, "robot", &["Female".to_string()], "")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("robot"));

    let err = maker
        .register(
            "a",
            "A",
            25,
            "Female",
            &["Male".to_string(), "robot".to_string()],
            "",
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("robot"));

    // Nothing was stored
    assert!(store.profile("a").is_none());
}

#[tokio::test]
async fn test_reregistration_overwrites_profile() {
    let (maker, store, _platform) = setup();
    register(&maker, "a", "Male", "Female").await;

    let registration = maker
        .register("a", "New Name", 26, "trans-male", &["All".to_string()], "new bio")
        .await
        .unwrap();
    assert!(registration.updated);

    let profile = store.profile("a").unwrap();
    assert_eq!(profile.name, "New Name");
    assert_eq!(profile.age, 26);
    assert_eq!(profile.gender, blindmatch::Gender::TransM);
    assert_eq!(profile.preferences, blindmatch::PreferenceSet::Any);
}

#[tokio::test]
async fn test_queue_refresh_on_reregistration_pairs_immediately() {
    let (maker, store, _platform) = setup();
    register(&maker, "a", "Male", "Female").await;
    register(&maker, "b", "Male", "Female").await;

    // Both queue, incompatible with each other
    maker.attempt_match("a").await.unwrap();
    maker.attempt_match("b").await.unwrap();
    assert_eq!(store.queue_len(), 2);

    // b's update makes the pair compatible; matching re-runs on the
    // refreshed entry without an explicit find-match call
    let registration = maker
        .register("b", "User b", 25, "Female", &["Male".to_string()], "bio")
        .await
        .unwrap();

    assert!(matches!(
        registration.paired,
        Some(MatchOutcome::Matched { .. })
    ));
    assert_eq!(store.queue_len(), 0);
    assert_eq!(store.match_count(), 1);
}

#[tokio::test]
async fn test_leave_queue_reports_not_queued_after_consumption() {
    let (maker, _store, _platform) = setup();
    register(&maker, "a", "Male", "Female").await;
    register(&maker, "b", "Female", "Male").await;

    maker.attempt_match("a").await.unwrap();
    // b's attempt consumes a's entry
    maker.attempt_match("b").await.unwrap();

    // a's leave-queue must not silently no-op
    assert!(matches!(
        maker.leave_queue("a").unwrap_err(),
        MatchError::NotQueued
    ));
}

#[tokio::test]
async fn test_match_info_snapshot() {
    let (maker, _store, _platform) = setup();
    register(&maker, "a", "Male", "Female").await;
    register(&maker, "b", "Female", "Male").await;

    maker.attempt_match("a").await.unwrap();
    maker.attempt_match("b").await.unwrap();

    let (partner, record) = maker.match_info("b").unwrap();
    assert_eq!(partner.user_id, "a");
    assert_eq!(partner.name, "User a");
    assert_eq!(record.partner_of("b"), Some("a"));
}

#[tokio::test]
async fn test_wildcard_preference_matches_any_gender() {
    let (maker, _store, _platform) = setup();
    register(&maker, "a", "NonBinary", "All").await;
    register(&maker, "b", "TransF", "All").await;

    maker.attempt_match("a").await.unwrap();
    let outcome = maker.attempt_match("b").await.unwrap();
    assert!(matches!(outcome, MatchOutcome::Matched { .. }));
}
