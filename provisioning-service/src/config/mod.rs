use secrecy::Secret;
use service_core::config::{self as core_config, get_env, get_env_parsed, Environment};
use service_core::error::AppError;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub mongodb: MongoConfig,
    pub cipher: CipherConfig,
    pub replication: ReplicationConfig,
    pub oauth: OAuthConfig,
    pub redirects: RedirectConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct CipherConfig {
    /// Shared secret both instances use to encrypt teacher access codes.
    pub secret: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Base URL of the peer instance.
    pub peer_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
    pub scope: String,
    /// Where a teacher lands after a successful callback.
    pub dashboard_url: String,
}

#[derive(Debug, Clone)]
pub struct RedirectConfig {
    pub student_url: String,
    pub teacher_url: String,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

pub const DEFAULT_REPLICATION_TIMEOUT_MS: u64 = 2000;

impl ProvisioningConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let environment = Environment::current()?;
        let is_prod = environment.is_prod();

        let timeout_ms: u64 = get_env_parsed(
            "PEER_REPLICATION_TIMEOUT_MS",
            Some(&DEFAULT_REPLICATION_TIMEOUT_MS.to_string()),
            is_prod,
        )?;

        Ok(ProvisioningConfig {
            common,
            environment,
            service_name: get_env("SERVICE_NAME", Some("provisioning-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: std::env::var("OTLP_ENDPOINT").ok(),
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("TrinityCapital"), is_prod)?,
            },
            cipher: CipherConfig {
                secret: Secret::new(get_env("ACCESS_CODE_SECRET", Some("changeme!"), is_prod)?),
            },
            replication: ReplicationConfig {
                peer_url: get_env("PEER_REPLICATION_URL", Some("http://localhost:5000"), is_prod)?,
                timeout: Duration::from_millis(timeout_ms),
            },
            oauth: OAuthConfig {
                auth_url: get_env(
                    "OAUTH2_AUTH_URL",
                    Some("https://accounts.google.com/o/oauth2/v2/auth"),
                    is_prod,
                )?,
                token_url: get_env(
                    "OAUTH2_TOKEN_URL",
                    Some("https://oauth2.googleapis.com/token"),
                    is_prod,
                )?,
                userinfo_url: get_env(
                    "OAUTH2_USERINFO_URL",
                    Some("https://www.googleapis.com/oauth2/v2/userinfo"),
                    is_prod,
                )?,
                client_id: get_env("GOOGLE_CLIENT_ID", Some(""), is_prod)?,
                client_secret: Secret::new(get_env("GOOGLE_CLIENT_SECRET", Some(""), is_prod)?),
                redirect_uri: get_env(
                    "OAUTH2_REDIRECT_URI",
                    Some("http://localhost:8080/oauth2/callback"),
                    is_prod,
                )?,
                scope: get_env("OAUTH2_SCOPE", Some("https://mail.google.com/"), is_prod)?,
                dashboard_url: get_env(
                    "OAUTH2_DASHBOARD_URL",
                    Some("https://trincapdash.netlify.app"),
                    is_prod,
                )?,
            },
            redirects: RedirectConfig {
                student_url: get_env(
                    "STUDENT_REDIRECT_URL",
                    Some("https://trinity-capital.net"),
                    is_prod,
                )?,
                teacher_url: get_env(
                    "TEACHER_REDIRECT_URL",
                    Some("https://teacher-dashboard.trinity-capital.net"),
                    is_prod,
                )?,
            },
            security: SecurityConfig {
                allowed_origins: parse_origins(&get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?),
            },
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
