use service_core::error::AppError;
use std::time::Duration;
use thiserror::Error;

/// Failures of a single provisioning or enrollment request.
///
/// Every variant is terminal for the request; nothing here is retried.
#[derive(Error, Debug)]
pub enum ProvisioningError {
    #[error("No access code provided")]
    MissingCode,

    #[error("Invalid or used access code")]
    InvalidCode,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Peer did not acknowledge within {0:?}")]
    ReplicationTimeout(Duration),

    #[error("Peer rejected replication: {0}")]
    ReplicationRejected(String),

    #[error("Peer replication transport error: {0}")]
    ReplicationTransport(String),

    #[error("OAuth2 exchange failed: {0}")]
    EnrollmentExchange(String),

    #[error("No teacher registered as '{0}'")]
    UnknownTeacher(String),

    #[error("Storage error: {0}")]
    Store(#[from] AppError),
}

impl ProvisioningError {
    /// Resolution failures are the caller's fault and are announced to subscribers.
    pub fn is_code_rejection(&self) -> bool {
        matches!(
            self,
            ProvisioningError::MissingCode | ProvisioningError::InvalidCode
        )
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisioningError::MissingCode => "missing_code",
            ProvisioningError::InvalidCode => "invalid_code",
            ProvisioningError::Validation(_) => "validation",
            ProvisioningError::ReplicationTimeout(_) => "replication_timeout",
            ProvisioningError::ReplicationRejected(_) => "replication_rejected",
            ProvisioningError::ReplicationTransport(_) => "replication_transport",
            ProvisioningError::EnrollmentExchange(_) => "enrollment_exchange",
            ProvisioningError::UnknownTeacher(_) => "unknown_teacher",
            ProvisioningError::Store(_) => "store",
        }
    }
}

impl From<ProvisioningError> for AppError {
    fn from(err: ProvisioningError) -> Self {
        match err {
            ProvisioningError::MissingCode => {
                AppError::BadRequest(anyhow::anyhow!("No access code provided"))
            }
            ProvisioningError::InvalidCode => {
                AppError::BadRequest(anyhow::anyhow!("Invalid or used access code"))
            }
            ProvisioningError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ProvisioningError::ReplicationTimeout(_)
            | ProvisioningError::ReplicationRejected(_)
            | ProvisioningError::ReplicationTransport(_) => {
                AppError::UpstreamError("Peer replication failed".to_string())
            }
            ProvisioningError::EnrollmentExchange(_) | ProvisioningError::UnknownTeacher(_) => {
                AppError::UpstreamError("OAuth2 setup failed".to_string())
            }
            ProvisioningError::Store(e) => e,
        }
    }
}
