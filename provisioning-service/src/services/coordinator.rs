//! Per-request provisioning workflow.
//!
//! ```text
//! Resolving -> Persisted(local) -> Replicating -> Committed | ReplicationFailed
//!                              \-> AwaitingExternalAuth   (teacher registry codes)
//! ```
//!
//! The local write is never retried or undone. A failed replication leaves the
//! account in the local store and surfaces a server error to the caller.

use crate::config::RedirectConfig;
use crate::models::{Account, ClassPeriod, OAuthCredentials, RosterEntry, Teacher, TeacherProfile};
use crate::services::broadcast::{
    CreationSuccessful, EventBroadcaster, ProvisioningEvent, StudentAdded,
};
use crate::services::builder::{build_student_account, build_teacher, PersonalDetails, Placement};
use crate::services::cipher::AccessCodeCipher;
use crate::services::error::ProvisioningError;
use crate::services::metrics;
use crate::services::oauth::AuthorizationCodeExchange;
use crate::services::replication::{
    replicate_with_deadline, PeerReplicator, ReplicationAck, ReplicationOutcome,
};
use crate::services::resolver::{AccessCodeResolver, Resolution};
use crate::services::store::ProvisioningStore;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use std::time::Duration;

/// Teacher period a committed student is appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterSlot {
    pub teacher_id: ObjectId,
    pub period: String,
}

#[derive(Debug, Clone)]
pub enum ProvisioningResult {
    /// Student account created and acknowledged by the peer.
    Student {
        account: Account,
        redirect_url: String,
    },
    /// Teacher record created; enrollment finishes on the OAuth2 callback.
    AwaitingExternalAuth {
        profile: TeacherProfile,
        redirect_url: String,
        oauth2_url: String,
    },
}

#[derive(Clone)]
pub struct ProvisioningCoordinator {
    store: Arc<dyn ProvisioningStore>,
    resolver: AccessCodeResolver,
    replicator: Arc<dyn PeerReplicator>,
    oauth: Arc<dyn AuthorizationCodeExchange>,
    broadcaster: EventBroadcaster,
    replication_timeout: Duration,
    redirects: RedirectConfig,
}

impl ProvisioningCoordinator {
    pub fn new(
        store: Arc<dyn ProvisioningStore>,
        cipher: AccessCodeCipher,
        replicator: Arc<dyn PeerReplicator>,
        oauth: Arc<dyn AuthorizationCodeExchange>,
        broadcaster: EventBroadcaster,
        replication_timeout: Duration,
        redirects: RedirectConfig,
    ) -> Self {
        Self {
            resolver: AccessCodeResolver::new(store.clone(), cipher),
            store,
            replicator,
            oauth,
            broadcaster,
            replication_timeout,
            redirects,
        }
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    /// Handle one account creation request end to end.
    #[tracing::instrument(skip_all, fields(user_name = %details.user_name))]
    pub async fn provision(
        &self,
        access_code: Option<&str>,
        details: &PersonalDetails,
    ) -> Result<ProvisioningResult, ProvisioningError> {
        let resolution = match self.resolver.resolve(access_code).await {
            Ok(resolution) => resolution,
            Err(e) => return Err(self.reject("unresolved", e)),
        };

        let mode = resolution.mode();
        match self.provision_resolved(resolution, details).await {
            Ok(result) => {
                let outcome = match &result {
                    ProvisioningResult::Student { .. } => "committed",
                    ProvisioningResult::AwaitingExternalAuth { .. } => "awaiting_auth",
                };
                metrics::record_provisioning(mode, outcome);
                Ok(result)
            }
            Err(e) => Err(self.reject(mode, e)),
        }
    }

    fn reject(&self, mode: &'static str, error: ProvisioningError) -> ProvisioningError {
        metrics::record_provisioning(mode, error.kind());
        if error.is_code_rejection() {
            tracing::info!(mode, reason = error.kind(), "Access code rejected");
            self.broadcaster.publish(ProvisioningEvent::code_rejected());
        } else {
            tracing::error!(mode, error = %error, "Provisioning failed");
        }
        error
    }

    async fn provision_resolved(
        &self,
        resolution: Resolution,
        details: &PersonalDetails,
    ) -> Result<ProvisioningResult, ProvisioningError> {
        match resolution {
            Resolution::Structured { teacher, period } => {
                let placement = Placement {
                    teacher: teacher.name.clone(),
                    school: teacher.school.clone(),
                    class_period: ClassPeriod::from_segment(&period),
                };
                let account = build_student_account(&placement, details)?;
                let slot = RosterSlot {
                    teacher_id: teacher.id,
                    period,
                };
                self.persist_and_replicate(account, Some(&slot)).await
            }
            Resolution::RegistryStudent { record } => {
                let placement = Placement {
                    teacher: record.teacher.clone().unwrap_or_default(),
                    school: record.school.clone().unwrap_or_default(),
                    class_period: record.class_period.clone().unwrap_or_default(),
                };
                // Built before claiming so a bad PIN does not burn the code.
                let account = build_student_account(&placement, details)?;
                self.claim(&record.code, &details.user_name).await?;
                self.persist_and_replicate(account, None).await
            }
            Resolution::RegistryTeacher { record } => {
                if self
                    .store
                    .find_teacher_by_username(&details.user_name)
                    .await?
                    .is_some()
                {
                    tracing::info!(username = %details.user_name, "Teacher username already taken");
                    return Err(ProvisioningError::Validation(format!(
                        "Username '{}' is already taken",
                        details.user_name
                    )));
                }
                let school = record.school.clone().unwrap_or_default();
                let teacher =
                    build_teacher(details, &school, &record.code, self.resolver.cipher())?;
                self.claim(&record.code, &details.user_name).await?;
                self.enroll_teacher(teacher).await
            }
        }
    }

    async fn claim(&self, code: &str, used_by: &str) -> Result<(), ProvisioningError> {
        if self.store.claim_access_code(code, used_by).await? {
            Ok(())
        } else {
            tracing::warn!(used_by, "Lost the claim on a registry code");
            Err(ProvisioningError::InvalidCode)
        }
    }

    async fn persist_and_replicate(
        &self,
        account: Account,
        slot: Option<&RosterSlot>,
    ) -> Result<ProvisioningResult, ProvisioningError> {
        self.store.insert_account(&account).await?;
        tracing::info!(user_name = %account.user_name, "Account persisted locally");

        match replicate_with_deadline(self.replicator.as_ref(), &account, self.replication_timeout)
            .await
        {
            ReplicationOutcome::Committed(_) => {
                self.apply_committed(&account, slot).await;
                Ok(ProvisioningResult::Student {
                    account,
                    redirect_url: self.redirects.student_url.clone(),
                })
            }
            ReplicationOutcome::Failed(failure) => Err(failure.into()),
        }
    }

    /// Effects of a committed creation: roster append and notifications.
    ///
    /// Not idempotent; applying the same outcome twice appends twice.
    pub async fn apply_committed(&self, account: &Account, slot: Option<&RosterSlot>) {
        if let Some(slot) = slot {
            let entry = RosterEntry {
                name: account.member_name.clone(),
                username: account.user_name.clone(),
            };
            match self
                .store
                .append_to_roster(&slot.teacher_id, &slot.period, &entry)
                .await
            {
                Ok(true) => {
                    tracing::info!(period = %slot.period, "Student added to roster");
                }
                Ok(false) => {
                    tracing::warn!(period = %slot.period, "No matching period found on teacher");
                }
                Err(e) => {
                    tracing::error!(period = %slot.period, error = %e, "Roster append failed");
                }
            }
        }

        self.broadcaster
            .publish(ProvisioningEvent::StudentAdded(StudentAdded::from(account)));
        self.broadcaster
            .publish(ProvisioningEvent::CreationSuccessful(Box::new(
                CreationSuccessful {
                    account: account.clone(),
                    redirect_url: self.redirects.student_url.clone(),
                },
            )));
    }

    async fn enroll_teacher(&self, teacher: Teacher) -> Result<ProvisioningResult, ProvisioningError> {
        self.store.insert_teacher(&teacher).await?;
        tracing::info!(username = %teacher.username, "Teacher persisted, awaiting OAuth2 consent");

        Ok(ProvisioningResult::AwaitingExternalAuth {
            oauth2_url: self.oauth.authorization_url(&teacher.username),
            profile: teacher.profile(),
            redirect_url: self.redirects.teacher_url.clone(),
        })
    }

    /// Finish teacher enrollment from the provider callback.
    ///
    /// Nothing is stored unless both the exchange and the email lookup succeed.
    #[tracing::instrument(skip(self, code))]
    pub async fn complete_enrollment(
        &self,
        code: &str,
        username: &str,
    ) -> Result<(), ProvisioningError> {
        if self.store.find_teacher_by_username(username).await?.is_none() {
            return Err(ProvisioningError::UnknownTeacher(username.to_string()));
        }

        let tokens = self.oauth.exchange(code).await?;
        let email = self.oauth.fetch_email(&tokens.access_token).await?;

        let credentials = OAuthCredentials {
            provider: self.oauth.provider().to_string(),
            email,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            id_token: tokens.id_token,
            obtained_at: Utc::now(),
        };

        if !self.store.store_teacher_oauth(username, &credentials).await? {
            return Err(ProvisioningError::UnknownTeacher(username.to_string()));
        }

        tracing::info!(email = %credentials.email, "Teacher OAuth2 credentials stored");
        Ok(())
    }

    /// Peer side of replication: keep a copy of an account created elsewhere.
    #[tracing::instrument(skip_all, fields(user_name = %account.user_name))]
    pub async fn receive_replica(&self, account: &Account) -> Result<ReplicationAck, ProvisioningError> {
        if self
            .store
            .find_account_by_username(&account.user_name)
            .await?
            .is_some()
        {
            tracing::info!("Replicated account already present");
            return Ok(ReplicationAck {
                success: true,
                message: Some("already present".to_string()),
            });
        }

        self.store.insert_account(account).await?;
        tracing::info!("Replicated account stored");
        Ok(ReplicationAck::accepted())
    }
}
