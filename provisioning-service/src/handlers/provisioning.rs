use crate::dtos::{CreateAccountRequest, StudentCreatedResponse, TeacherCreatedResponse};
use crate::services::ProvisioningResult;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

/// Create a student account or start teacher enrollment.
///
/// POST /createAccount
#[tracing::instrument(skip_all)]
pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<Response, AppError> {
    request.validate()?;

    let access_code = request.access_code();
    let details = request.personal_details();

    let result = state
        .coordinator
        .provision(access_code.as_deref(), &details)
        .await?;

    let response = match result {
        ProvisioningResult::Student {
            account,
            redirect_url,
        } => (
            StatusCode::CREATED,
            Json(StudentCreatedResponse {
                account,
                redirect_url,
            }),
        )
            .into_response(),
        ProvisioningResult::AwaitingExternalAuth {
            profile,
            redirect_url,
            oauth2_url,
        } => (
            StatusCode::CREATED,
            Json(TeacherCreatedResponse {
                account: profile,
                redirect_url,
                is_teacher: true,
                oauth2_url,
            }),
        )
            .into_response(),
    };

    Ok(response)
}
