//! Test helpers for provisioning-service integration tests.
//!
//! Each `TestApp` runs the real HTTP server on a random port against the
//! in-memory store, with scripted peer and identity-provider doubles.

#![allow(dead_code)]

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use provisioning_service::{
    config::{
        CipherConfig, MongoConfig, OAuthConfig, ProvisioningConfig, RedirectConfig,
        ReplicationConfig, SecurityConfig,
    },
    models::{AccessCodeRecord, Account, CodeType, Period, Teacher},
    services::{
        AccessCodeCipher, AuthorizationCodeExchange, InMemoryStore, PeerReplicator,
        ProvisioningError, ReplicationAck, TokenSet,
    },
    startup::Application,
};
use secrecy::Secret;
use service_core::config::{Config, Environment};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_SECRET: &str = "test-access-code-secret";
pub const STUDENT_REDIRECT: &str = "https://student.test";
pub const TEACHER_REDIRECT: &str = "https://teacher.test";
pub const DASHBOARD_URL: &str = "https://dashboard.test";
pub const REPLICATION_TIMEOUT: Duration = Duration::from_millis(300);

/// How the scripted peer answers.
#[derive(Debug, Clone)]
pub enum PeerBehaviour {
    Acknowledge,
    Decline(String),
    NeverRespond,
}

pub struct ScriptedReplicator {
    behaviour: PeerBehaviour,
    calls: AtomicUsize,
}

impl ScriptedReplicator {
    pub fn new(behaviour: PeerBehaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerReplicator for ScriptedReplicator {
    async fn replicate(&self, _account: &Account) -> Result<ReplicationAck, ProvisioningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            PeerBehaviour::Acknowledge => Ok(ReplicationAck::accepted()),
            PeerBehaviour::Decline(message) => Ok(ReplicationAck::declined(message.clone())),
            PeerBehaviour::NeverRespond => std::future::pending().await,
        }
    }
}

pub struct StubOAuth {
    pub fail_exchange: bool,
    exchanges: AtomicUsize,
}

impl StubOAuth {
    pub fn new(fail_exchange: bool) -> Self {
        Self {
            fail_exchange,
            exchanges: AtomicUsize::new(0),
        }
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationCodeExchange for StubOAuth {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "https://idp.test/auth?response_type=code&access_type=offline&state={}",
            urlencoding::encode(state)
        )
    }

    async fn exchange(&self, code: &str) -> Result<TokenSet, ProvisioningError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if self.fail_exchange {
            return Err(ProvisioningError::EnrollmentExchange("invalid_grant".into()));
        }
        Ok(TokenSet {
            access_token: format!("access-{}", code),
            refresh_token: Some("refresh-token".into()),
            id_token: Some("id-token".into()),
        })
    }

    async fn fetch_email(&self, _access_token: &str) -> Result<String, ProvisioningError> {
        Ok("teacher@school.test".into())
    }
}

pub fn test_config() -> ProvisioningConfig {
    ProvisioningConfig {
        common: Config { port: 0 },
        environment: Environment::Dev,
        service_name: "provisioning-service-test".into(),
        log_level: "debug".into(),
        otlp_endpoint: None,
        mongodb: MongoConfig {
            uri: "mongodb://unused".into(),
            database: "unused".into(),
        },
        cipher: CipherConfig {
            secret: Secret::new(TEST_SECRET.into()),
        },
        replication: ReplicationConfig {
            peer_url: "http://unused".into(),
            timeout: REPLICATION_TIMEOUT,
        },
        oauth: OAuthConfig {
            auth_url: "https://idp.test/auth".into(),
            token_url: "https://idp.test/token".into(),
            userinfo_url: "https://idp.test/userinfo".into(),
            client_id: "client".into(),
            client_secret: Secret::new("secret".into()),
            redirect_uri: "http://localhost/oauth2/callback".into(),
            scope: "https://mail.google.com/".into(),
            dashboard_url: DASHBOARD_URL.into(),
        },
        redirects: RedirectConfig {
            student_url: STUDENT_REDIRECT.into(),
            teacher_url: TEACHER_REDIRECT.into(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".into()],
        },
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: InMemoryStore,
    pub cipher: AccessCodeCipher,
    pub oauth: Arc<StubOAuth>,
    client: reqwest::Client,
}

impl TestApp {
    /// Spawn with a peer that always acknowledges.
    pub async fn spawn() -> Self {
        Self::spawn_with_peer(PeerBehaviour::Acknowledge).await.0
    }

    pub async fn spawn_with_peer(behaviour: PeerBehaviour) -> (Self, Arc<ScriptedReplicator>) {
        let replicator = Arc::new(ScriptedReplicator::new(behaviour));
        let app = Self::spawn_with(replicator.clone(), Arc::new(StubOAuth::new(false))).await;
        (app, replicator)
    }

    pub async fn spawn_with_oauth(oauth: StubOAuth) -> Self {
        Self::spawn_with(
            Arc::new(ScriptedReplicator::new(PeerBehaviour::Acknowledge)),
            Arc::new(oauth),
        )
        .await
    }

    pub async fn spawn_with(
        replicator: Arc<dyn PeerReplicator>,
        oauth: Arc<StubOAuth>,
    ) -> Self {
        let config = test_config();
        let store = InMemoryStore::new();

        let app = Application::build_with(
            config.clone(),
            Arc::new(store.clone()),
            replicator,
            oauth.clone(),
        )
        .await
        .expect("Failed to build application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            let _ = app.run_until_stopped().await;
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build client");

        let test_app = Self {
            address,
            port,
            store,
            cipher: AccessCodeCipher::new(&config.cipher.secret),
            oauth,
            client,
        };
        test_app.wait_until_healthy().await;
        test_app
    }

    async fn wait_until_healthy(&self) {
        for _ in 0..50 {
            if let Ok(response) = self
                .client
                .get(format!("{}/health", self.address))
                .send()
                .await
            {
                if response.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Test server never became healthy");
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Seed a teacher whose stored access code decrypts to `token`.
    pub fn seed_teacher(&self, username: &str, token: &str, periods: &[&str]) -> Teacher {
        let teacher = Teacher {
            id: ObjectId::new(),
            name: "Ms. Frizzle".into(),
            access_code: self.cipher.encrypt(token).expect("encrypt"),
            username: username.into(),
            pin: "not-a-real-hash".into(),
            school: "NMHS".into(),
            periods: periods.iter().map(|p| Period::new(*p)).collect(),
            oauth: None,
        };
        self.store.add_teacher(teacher.clone());
        teacher
    }

    pub fn seed_code(&self, code: &str, code_type: CodeType) -> AccessCodeRecord {
        let mut record = AccessCodeRecord::new(code, code_type);
        record.teacher = Some("Mr. Keating".into());
        record.school = Some("Welton".into());
        self.store.add_access_code(record.clone());
        record
    }

    pub async fn create_account(&self, parcel: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/createAccount", self.address))
            .json(&serde_json::json!({ "parcel": parcel }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn oauth_callback(&self, query: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/oauth2/callback{}", self.address, query))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn parcel(access_code: Option<&str>, user_name: &str) -> serde_json::Value {
    serde_json::json!(["Jane", "Doe", access_code, "2024-01-01", user_name, "1234"])
}
