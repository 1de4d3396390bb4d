use crate::models::Account;
use crate::services::ReplicationAck;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// Receive an account created on the peer instance.
///
/// POST /replication/student-created
pub async fn student_created(
    State(state): State<AppState>,
    Json(account): Json<Account>,
) -> (StatusCode, Json<ReplicationAck>) {
    match state.coordinator.receive_replica(&account).await {
        Ok(ack) => (StatusCode::OK, Json(ack)),
        Err(e) => {
            tracing::error!(user_name = %account.user_name, error = %e, "Failed to store replica");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReplicationAck::declined("failed to store replica")),
            )
        }
    }
}
