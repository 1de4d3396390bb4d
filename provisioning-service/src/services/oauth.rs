//! Authorization-code exchange with the identity provider used for teacher
//! enrollment.

use crate::config::OAuthConfig;
use crate::services::error::ProvisioningError;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use service_core::observability::TracedClientExt;

/// Provider name stored alongside the credentials.
pub const PROVIDER_GOOGLE: &str = "google";

/// Tokens returned by the provider's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: Option<String>,
}

#[async_trait]
pub trait AuthorizationCodeExchange: Send + Sync {
    /// Provider name recorded on the teacher.
    fn provider(&self) -> &str {
        PROVIDER_GOOGLE
    }

    /// URL the teacher is sent to. `state` comes back verbatim on the callback.
    fn authorization_url(&self, state: &str) -> String;

    async fn exchange(&self, code: &str) -> Result<TokenSet, ProvisioningError>;

    async fn fetch_email(&self, access_token: &str) -> Result<String, ProvisioningError>;
}

#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl GoogleOAuthClient {
    pub fn new(http: reqwest::Client, config: OAuthConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl AuthorizationCodeExchange for GoogleOAuthClient {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&self.config.scope),
            urlencoding::encode(state),
        )
    }

    #[tracing::instrument(skip_all)]
    async fn exchange(&self, code: &str) -> Result<TokenSet, ProvisioningError> {
        let response = self
            .http
            .traced_post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret().as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| ProvisioningError::EnrollmentExchange(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, error = %error_text, "Token exchange failed");
            return Err(ProvisioningError::EnrollmentExchange(format!(
                "token endpoint responded with status {}",
                status
            )));
        }

        response
            .json::<TokenSet>()
            .await
            .map_err(|e| ProvisioningError::EnrollmentExchange(e.to_string()))
    }

    #[tracing::instrument(skip_all)]
    async fn fetch_email(&self, access_token: &str) -> Result<String, ProvisioningError> {
        let response = self
            .http
            .traced_get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProvisioningError::EnrollmentExchange(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProvisioningError::EnrollmentExchange(format!(
                "userinfo endpoint responded with status {}",
                response.status()
            )));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| ProvisioningError::EnrollmentExchange(e.to_string()))?;

        info.email
            .ok_or_else(|| ProvisioningError::EnrollmentExchange("no email in userinfo".into()))
    }
}
