use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tabkeep_core::AccessError;

/// Map the shared error taxonomy onto HTTP.
///
/// `UnknownAction` is indistinguishable from `Unauthorized` on the wire, and
/// internal messages never leave the process.
pub fn access_error_to_response(err: AccessError) -> axum::response::Response {
    match err {
        AccessError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        AccessError::Unauthorized | AccessError::UnknownAction(_) => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
        }
        AccessError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
        AccessError::Unavailable(msg) => {
            tracing::warn!(error = %msg, "backend unavailable");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "service temporarily unavailable",
            )
        }
        AccessError::Internal(msg) => {
            tracing::error!(error = %msg, "internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases = [
            (AccessError::NotFound("shop"), StatusCode::NOT_FOUND),
            (AccessError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AccessError::UnknownAction("tab:approve".into()), StatusCode::UNAUTHORIZED),
            (AccessError::Forbidden, StatusCode::FORBIDDEN),
            (AccessError::unavailable("redis"), StatusCode::SERVICE_UNAVAILABLE),
            (AccessError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(access_error_to_response(err).status(), status);
        }
    }
}
