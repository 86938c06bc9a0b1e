use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use campus_connect::test_util::mock_provider::{error_json, profile_json, session_json};
use campus_connect::{AuthState, ProfileStore, SessionTracker};
use campus_provider::{Provider, ProviderConfig};

fn tracker_for(server: &MockServer, session_file: Option<PathBuf>) -> Arc<SessionTracker> {
    let provider = Arc::new(Provider::new(ProviderConfig {
        url: server.uri(),
        anon_key: "anon-key".to_string(),
        session_file,
    }));
    SessionTracker::new(provider.clone(), ProfileStore::new(provider))
}

/// Writes a resumable session to disk and returns its path plus the user id
/// it belongs to.
fn persisted_session(dir: &tempfile::TempDir, email: &str, name: &str) -> (PathBuf, Uuid) {
    let user_id = Uuid::new_v4();
    let file = dir.path().join("session.json");
    std::fs::write(&file, session_json(user_id, email, name).to_string()).unwrap();
    (file, user_id)
}

async fn wait_for_state(tracker: &SessionTracker, expected: &AuthState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if tracker.current().await == *expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "state never became {expected:?}, still {:?}",
            tracker.current().await
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_starts_unresolved_then_resolves_to_signed_out() {
    let server = MockServer::start().await;
    let tracker = tracker_for(&server, None);

    assert_eq!(tracker.current().await, AuthState::Unresolved);
    let state = tracker.resolve().await;
    assert_eq!(state, AuthState::SignedOut);
    assert!(tracker.current().await.is_resolved());
}

#[tokio::test]
async fn test_resolve_is_idempotent() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (file, user_id) = persisted_session(&dir, "jane.doe@nmiet.edu.in", "Jane Doe");

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(profile_json(user_id, "jane.doe@nmiet.edu.in", Some("Jane Doe"))),
        )
        .mount(&server)
        .await;

    let tracker = tracker_for(&server, Some(file));
    let first = tracker.resolve().await;
    let second = tracker.resolve().await;

    assert_eq!(first, second);
    let user = first.user().expect("resolved user");
    assert_eq!(user.id, user_id);
    assert_eq!(user.name, "Jane Doe");
}

#[tokio::test]
async fn test_racing_resolutions_agree_on_the_session_state() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (file, user_id) = persisted_session(&dir, "jane.doe@nmiet.edu.in", "Jane Doe");

    // Slow profile reads force the two resolutions to overlap; both derive
    // the same user from the same session, so whichever write lands last
    // the slot holds that value.
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(profile_json(user_id, "jane.doe@nmiet.edu.in", Some("Jane Doe")))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let tracker = tracker_for(&server, Some(file));
    let (first, second) = tokio::join!(tracker.resolve(), tracker.resolve());

    assert_eq!(first, second);
    assert_eq!(tracker.current().await, first);
    assert_eq!(first.user().expect("resolved user").name, "Jane Doe");
}

#[tokio::test]
async fn test_resolve_degrades_when_profile_fetch_fails() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (file, user_id) = persisted_session(&dir, "jane.doe@nmiet.edu.in", "Jane Doe");

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(500).set_body_json(error_json("storage down")))
        .mount(&server)
        .await;

    let tracker = tracker_for(&server, Some(file));
    let state = tracker.resolve().await;

    let user = state.user().expect("degraded user");
    assert_eq!(user.id, user_id);
    assert_eq!(user.name, "jane.doe");
    assert_eq!(user.email, "jane.doe@nmiet.edu.in");
}

#[tokio::test]
async fn test_sign_out_clears_state_without_waiting_for_events() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (file, user_id) = persisted_session(&dir, "jane.doe@nmiet.edu.in", "Jane Doe");

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(profile_json(user_id, "jane.doe@nmiet.edu.in", Some("Jane Doe"))),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    // No auth-change subscription: the clear must not depend on the
    // listener echo.
    let tracker = tracker_for(&server, Some(file.clone()));
    tracker.resolve().await;
    assert!(tracker.current().await.user().is_some());

    tracker.sign_out().await;
    assert_eq!(tracker.current().await, AuthState::SignedOut);
    assert!(!file.exists());
}

#[tokio::test]
async fn test_sign_out_clears_state_even_when_remote_call_fails() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (file, user_id) = persisted_session(&dir, "jane.doe@nmiet.edu.in", "Jane Doe");

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(profile_json(user_id, "jane.doe@nmiet.edu.in", Some("Jane Doe"))),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_json(error_json("boom")))
        .mount(&server)
        .await;

    let tracker = tracker_for(&server, Some(file));
    tracker.resolve().await;
    tracker.sign_out().await;
    assert_eq!(tracker.current().await, AuthState::SignedOut);
}

#[tokio::test]
async fn test_auth_changes_flow_into_tracker_state() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(session_json(user_id, "jane.doe@nmiet.edu.in", "Jane Doe")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(profile_json(user_id, "jane.doe@nmiet.edu.in", Some("Jane Doe"))),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let provider = Arc::new(Provider::new(ProviderConfig {
        url: server.uri(),
        anon_key: "anon-key".to_string(),
        session_file: None,
    }));
    let tracker = SessionTracker::new(provider.clone(), ProfileStore::new(provider.clone()));
    tracker.resolve().await;
    tracker.subscribe_auth_changes().await;

    // A sign-in performed elsewhere (not through the onboarding form)
    // reaches the tracker through the listener.
    provider
        .auth()
        .sign_in_with_password("jane.doe@nmiet.edu.in", "secret-pw")
        .await
        .unwrap();
    let expected_user = AuthState::SignedIn(campus_connect::ApplicationUser {
        id: user_id,
        email: "jane.doe@nmiet.edu.in".to_string(),
        name: "Jane Doe".to_string(),
    });
    wait_for_state(&tracker, &expected_user).await;

    provider.auth().sign_out().await.unwrap();
    wait_for_state(&tracker, &AuthState::SignedOut).await;

    tracker.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_following_auth_changes() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(session_json(user_id, "jane.doe@nmiet.edu.in", "Jane Doe")),
        )
        .mount(&server)
        .await;

    let provider = Arc::new(Provider::new(ProviderConfig {
        url: server.uri(),
        anon_key: "anon-key".to_string(),
        session_file: None,
    }));
    let tracker = SessionTracker::new(provider.clone(), ProfileStore::new(provider.clone()));
    tracker.resolve().await;
    tracker.subscribe_auth_changes().await;
    tracker.shutdown().await;

    provider
        .auth()
        .sign_in_with_password("jane.doe@nmiet.edu.in", "secret-pw")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(tracker.current().await, AuthState::SignedOut);
}

#[tokio::test]
async fn test_watch_reports_transitions() {
    let server = MockServer::start().await;
    let tracker = tracker_for(&server, None);
    let mut transitions = tracker.watch();

    tracker.resolve().await;
    assert_eq!(transitions.recv().await.unwrap(), AuthState::SignedOut);
}
