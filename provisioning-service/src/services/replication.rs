//! Acknowledgement-bounded replication of new accounts to the peer instance.

use crate::models::Account;
use crate::services::error::ProvisioningError;
use crate::services::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::time::{Duration, Instant};

/// Path the peer serves the replication receiver on.
pub const REPLICATION_PATH: &str = "/replication/student-created";

/// Payload a peer answers a replication call with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReplicationAck {
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Remote side of the replication call.
///
/// Implementations only deliver the account and report what came back; the
/// deadline is enforced by [`replicate_with_deadline`].
#[async_trait]
pub trait PeerReplicator: Send + Sync {
    async fn replicate(&self, account: &Account) -> Result<ReplicationAck, ProvisioningError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationFailure {
    Timeout(Duration),
    Rejected(String),
    Transport(String),
}

impl ReplicationFailure {
    pub fn label(&self) -> &'static str {
        match self {
            ReplicationFailure::Timeout(_) => "timeout",
            ReplicationFailure::Rejected(_) => "rejected",
            ReplicationFailure::Transport(_) => "transport",
        }
    }
}

impl From<ReplicationFailure> for ProvisioningError {
    fn from(failure: ReplicationFailure) -> Self {
        match failure {
            ReplicationFailure::Timeout(limit) => ProvisioningError::ReplicationTimeout(limit),
            ReplicationFailure::Rejected(msg) => ProvisioningError::ReplicationRejected(msg),
            ReplicationFailure::Transport(msg) => ProvisioningError::ReplicationTransport(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationOutcome {
    Committed(ReplicationAck),
    Failed(ReplicationFailure),
}

/// Run one replication call with a hard upper bound.
///
/// When the deadline fires the in-flight call is dropped; the peer is not told.
#[tracing::instrument(skip_all, fields(user_name = %account.user_name))]
pub async fn replicate_with_deadline(
    replicator: &dyn PeerReplicator,
    account: &Account,
    deadline: Duration,
) -> ReplicationOutcome {
    let started = Instant::now();

    let outcome = match tokio::time::timeout(deadline, replicator.replicate(account)).await {
        Err(_) => ReplicationOutcome::Failed(ReplicationFailure::Timeout(deadline)),
        Ok(Ok(ack)) if ack.success => ReplicationOutcome::Committed(ack),
        Ok(Ok(ack)) => ReplicationOutcome::Failed(ReplicationFailure::Rejected(
            ack.message
                .unwrap_or_else(|| "peer declined without a message".to_string()),
        )),
        Ok(Err(ProvisioningError::ReplicationRejected(msg))) => {
            ReplicationOutcome::Failed(ReplicationFailure::Rejected(msg))
        }
        Ok(Err(e)) => ReplicationOutcome::Failed(ReplicationFailure::Transport(e.to_string())),
    };

    let label = match &outcome {
        ReplicationOutcome::Committed(_) => "committed",
        ReplicationOutcome::Failed(failure) => failure.label(),
    };
    metrics::record_replication(label, started.elapsed());

    match &outcome {
        ReplicationOutcome::Committed(ack) => {
            tracing::info!(message = ?ack.message, "Peer acknowledged replication");
        }
        ReplicationOutcome::Failed(failure) => {
            tracing::error!(failure = ?failure, "Peer replication failed");
        }
    }

    outcome
}

/// Replicates over HTTP to another instance of this service.
#[derive(Clone)]
pub struct HttpPeerReplicator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPeerReplicator {
    pub fn new(client: reqwest::Client, peer_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", peer_url.trim_end_matches('/'), REPLICATION_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PeerReplicator for HttpPeerReplicator {
    async fn replicate(&self, account: &Account) -> Result<ReplicationAck, ProvisioningError> {
        let response = self
            .client
            .traced_post(&self.endpoint)
            .json(account)
            .send()
            .await
            .map_err(|e| ProvisioningError::ReplicationTransport(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status.is_client_error() {
            // A peer that answers with an error status still may carry an ack body.
            return match response.json::<ReplicationAck>().await {
                Ok(ack) => Ok(ack),
                Err(_) => Err(ProvisioningError::ReplicationRejected(format!(
                    "peer responded with status {}",
                    status
                ))),
            };
        }

        response
            .json::<ReplicationAck>()
            .await
            .map_err(|e| ProvisioningError::ReplicationTransport(e.to_string()))
    }
}
