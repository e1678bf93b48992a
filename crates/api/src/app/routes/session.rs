use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CurrentSession;

pub async fn current(session: CurrentSession) -> Json<dto::SessionResponse> {
    let user_id = session.user_id();
    Json(dto::SessionResponse {
        authenticated: user_id.is_some(),
        user_id: user_id.map(|id| id.to_string()),
    })
}

/// Supersede the session with an anonymous one; the new cookie and CSRF
/// token go out with the 204.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    mut session: CurrentSession,
) -> Response {
    match session.clear(&services.sessions).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::access_error_to_response(e),
    }
}
