use crate::dtos::OAuthCallbackQuery;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

pub const ENROLLMENT_FAILED_MESSAGE: &str = "OAuth2 setup failed. Please contact support.";

/// Identity provider callback. `state` carries the teacher's username.
///
/// GET /oauth2/callback
#[tracing::instrument(skip_all)]
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Response {
    let (code, username) = match (query.code, query.state) {
        (Some(code), Some(username)) if !code.is_empty() && !username.is_empty() => {
            (code, username)
        }
        _ => {
            tracing::warn!("OAuth2 callback without code or state");
            return (StatusCode::BAD_REQUEST, "Missing code or state").into_response();
        }
    };

    match state
        .coordinator
        .complete_enrollment(&code, &username)
        .await
    {
        Ok(()) => Redirect::to(&state.config.oauth.dashboard_url).into_response(),
        Err(e) => {
            tracing::error!(username = %username, error = %e, "OAuth2 callback failed");
            (StatusCode::INTERNAL_SERVER_ERROR, ENROLLMENT_FAILED_MESSAGE).into_response()
        }
    }
}
