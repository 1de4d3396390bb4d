//! Account creation over HTTP.

mod common;

use common::{parcel, PeerBehaviour, TestApp, STUDENT_REDIRECT, TEACHER_REDIRECT};
use provisioning_service::models::{CodeType, RosterEntry};
use provisioning_service::services::ProvisioningStore;

#[tokio::test]
async fn structured_code_creates_account_and_joins_roster() {
    let (app, replicator) = TestApp::spawn_with_peer(PeerBehaviour::Acknowledge).await;
    app.seed_teacher("frizzle", "ABCD1234", &["01", "02"]);

    let response = app
        .create_account(parcel(Some("US-NMHS-ABCD1234-02"), "jdoe"))
        .await;

    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["redirectUrl"], STUDENT_REDIRECT);
    assert_eq!(body["account"]["classPeriod"], 2);
    assert_eq!(body["account"]["memberName"], "Jane Doe");
    assert_eq!(body["account"]["teacher"], "Ms. Frizzle");
    assert_eq!(body["account"]["school"], "NMHS");
    assert_eq!(body["account"]["numberOfAccounts"], 2);
    assert_eq!(body["account"]["checkingAccount"]["routingNumber"], 141257185);

    assert_eq!(replicator.calls(), 1);

    let teacher = app.store.teachers().remove(0);
    assert_eq!(
        teacher.period("02").unwrap().students,
        vec![RosterEntry {
            name: "Jane Doe".into(),
            username: "jdoe".into(),
        }]
    );
    assert!(teacher.period("01").unwrap().students.is_empty());
}

#[tokio::test]
async fn unknown_code_is_rejected_without_writes() {
    let (app, replicator) = TestApp::spawn_with_peer(PeerBehaviour::Acknowledge).await;
    app.seed_teacher("frizzle", "ABCD1234", &["02"]);

    let response = app.create_account(parcel(Some("NOSUCHCODE"), "jdoe")).await;

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid or used access code");
    assert!(app.store.accounts().is_empty());
    assert_eq!(replicator.calls(), 0);
}

#[tokio::test]
async fn structured_code_for_unknown_token_is_rejected() {
    let app = TestApp::spawn().await;
    app.seed_teacher("frizzle", "ABCD1234", &["02"]);

    let response = app
        .create_account(parcel(Some("US-NMHS-FFFF0000-02"), "jdoe"))
        .await;

    assert_eq!(response.status(), 400);
    assert!(app.store.accounts().is_empty());
}

#[tokio::test]
async fn missing_code_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app.create_account(parcel(None, "jdoe")).await;

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No access code provided");
}

#[tokio::test]
async fn malformed_parcel_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .create_account(serde_json::json!(["Jane", "Doe", "CODE"]))
        .await;

    assert_eq!(response.status(), 422);
    assert!(app.store.accounts().is_empty());
}

#[tokio::test]
async fn teacher_code_returns_authorization_url_without_replication() {
    let (app, replicator) = TestApp::spawn_with_peer(PeerBehaviour::Acknowledge).await;
    app.seed_code("TEACH-REG-1", CodeType::Teacher);

    let response = app
        .create_account(parcel(Some("TEACH-REG-1"), "keating"))
        .await;

    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["isTeacher"], true);
    assert_eq!(body["redirectUrl"], TEACHER_REDIRECT);
    assert_eq!(body["account"]["username"], "keating");
    assert_eq!(body["account"]["school"], "Welton");
    assert!(body["account"].get("pin").is_none());
    assert!(body["account"].get("accessCode").is_none());
    let url = body["oauth2Url"].as_str().unwrap();
    assert!(url.contains("state=keating"));

    assert_eq!(replicator.calls(), 0);
    assert!(app.store.accounts().is_empty());

    let teacher = app
        .store
        .find_teacher_by_username("keating")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(app.cipher.decrypt(&teacher.access_code).unwrap(), "TEACH-REG-1");
    assert_ne!(teacher.pin, "1234");

    let code = app.store.find_access_code("TEACH-REG-1").await.unwrap().unwrap();
    assert!(code.used);
    assert_eq!(code.used_by.as_deref(), Some("keating"));
}

#[tokio::test]
async fn enrolled_teacher_token_works_as_structured_code() {
    let app = TestApp::spawn().await;
    app.seed_code("TEACH42", CodeType::Teacher);

    let response = app.create_account(parcel(Some("TEACH42"), "keating")).await;
    assert_eq!(response.status(), 201);

    // The new teacher has no periods yet, so the roster append finds nothing.
    let response = app
        .create_account(parcel(Some("US-WELTON-TEACH42-03"), "student1"))
        .await;
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["account"]["teacher"], "Jane Doe");
    assert_eq!(body["account"]["classPeriod"], 3);
}

#[tokio::test]
async fn peer_timeout_keeps_local_account_but_fails_request() {
    let (app, replicator) = TestApp::spawn_with_peer(PeerBehaviour::NeverRespond).await;
    app.seed_code("STUDENT-REG-1", CodeType::Student);

    let response = app
        .create_account(parcel(Some("STUDENT-REG-1"), "jdoe"))
        .await;

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Peer replication failed");
    assert_eq!(replicator.calls(), 1);

    let stored = app
        .store
        .find_account_by_username("jdoe")
        .await
        .unwrap()
        .expect("local account should survive a failed replication");
    assert_eq!(stored.teacher, "Mr. Keating");
    assert_eq!(stored.school, "Welton");
}

#[tokio::test]
async fn peer_decline_fails_request() {
    let (app, _) = TestApp::spawn_with_peer(PeerBehaviour::Decline("disk full".into())).await;
    app.seed_code("STUDENT-REG-1", CodeType::Student);

    let response = app
        .create_account(parcel(Some("STUDENT-REG-1"), "jdoe"))
        .await;

    assert_eq!(response.status(), 500);
    assert_eq!(app.store.accounts().len(), 1);
}

#[tokio::test]
async fn registry_code_cannot_be_used_twice() {
    let app = TestApp::spawn().await;
    app.seed_code("STUDENT-REG-1", CodeType::Student);

    let first = app
        .create_account(parcel(Some("STUDENT-REG-1"), "first"))
        .await;
    assert_eq!(first.status(), 201);

    let second = app
        .create_account(parcel(Some("STUDENT-REG-1"), "second"))
        .await;
    assert_eq!(second.status(), 400);

    assert_eq!(app.store.accounts().len(), 1);
}

#[tokio::test]
async fn concurrent_claims_on_one_registry_code_admit_a_single_account() {
    let app = TestApp::spawn().await;
    app.seed_code("STUDENT-REG-1", CodeType::Student);

    let requests = (0..8).map(|i| {
        let user = format!("racer{}", i);
        let app = &app;
        async move { app.create_account(parcel(Some("STUDENT-REG-1"), &user)).await }
    });
    let responses = futures::future::join_all(requests).await;

    let created = responses.iter().filter(|r| r.status() == 201).count();
    let rejected = responses.iter().filter(|r| r.status() == 400).count();
    assert_eq!(created, 1);
    assert_eq!(rejected, 7);
    assert_eq!(app.store.accounts().len(), 1);
}

#[tokio::test]
async fn structured_code_is_reusable_by_a_whole_class() {
    let app = TestApp::spawn().await;
    app.seed_teacher("frizzle", "ABCD1234", &["02"]);

    for user in ["s1", "s2", "s3"] {
        let response = app
            .create_account(parcel(Some("US-NMHS-ABCD1234-02"), user))
            .await;
        assert_eq!(response.status(), 201);
    }

    assert_eq!(app.store.accounts().len(), 3);
    assert_eq!(app.store.teachers()[0].period("02").unwrap().students.len(), 3);
}

#[tokio::test]
async fn non_numeric_pin_is_a_client_error() {
    let app = TestApp::spawn().await;
    app.seed_teacher("frizzle", "ABCD1234", &["02"]);

    let response = app
        .create_account(serde_json::json!([
            "Jane", "Doe", "US-NMHS-ABCD1234-02", "2024-01-01", "jdoe", "12ab"
        ]))
        .await;

    assert_eq!(response.status(), 400);
    assert!(app.store.accounts().is_empty());
}

#[tokio::test]
async fn numeric_parcel_entries_are_accepted() {
    let (app, _replicator) = TestApp::spawn_with_peer(PeerBehaviour::Acknowledge).await;
    app.seed_teacher("frizzle", "ABCD1234", &["02"]);

    let response = app
        .create_account(serde_json::json!([
            "Jane", "Doe", "US-NMHS-ABCD1234-02", 20240101, "jdoe", 1234
        ]))
        .await;

    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["account"]["pin"], 1234);
}

#[tokio::test]
async fn second_teacher_code_for_taken_username_is_refused() {
    let app = TestApp::spawn().await;
    app.seed_code("TEACH-A", CodeType::Teacher);
    app.seed_code("TEACH-B", CodeType::Teacher);

    let first = app.create_account(parcel(Some("TEACH-A"), "keating")).await;
    assert_eq!(first.status(), 201);

    let second = app.create_account(parcel(Some("TEACH-B"), "keating")).await;
    assert_eq!(second.status(), 400);

    assert_eq!(app.store.teachers().len(), 1);
    let code = app.store.find_access_code("TEACH-B").await.unwrap().unwrap();
    assert!(!code.used);
}

#[tokio::test]
async fn health_and_ready_report_ok() {
    let app = TestApp::spawn().await;

    let health = app
        .client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 200);
    let body: serde_json::Value = health.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "provisioning-service-test");

    let ready = app
        .client()
        .get(format!("{}/ready", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), 200);
    assert!(ready.headers().contains_key("x-request-id"));
}
