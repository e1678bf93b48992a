use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;

use tabkeep_infra::session::{CSRF_HEADER, ResponseEffects, SESSION_COOKIE};
use tabkeep_infra::{CsrfGuard, RequestContext};

use crate::app::errors;
use crate::context::{CurrentSession, client_ip, is_secure, parse_cookie};

#[derive(Clone)]
pub struct CsrfState {
    pub guard: CsrfGuard,
    pub cookie_secure: bool,
    pub trust_forwarded_for: bool,
}

/// Resolve the session, enforce the CSRF token on unsafe methods, and expose
/// the session to handlers as [`CurrentSession`].
///
/// Session cookie and CSRF header effects are applied to every response,
/// including rejections produced here.
pub async fn csrf_middleware(
    State(state): State<CsrfState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(peer) = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
    else {
        tracing::error!("peer address unavailable; serve with connect info");
        return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error");
    };

    let headers = req.headers();
    let ctx = RequestContext::new(
        parse_cookie(headers, SESSION_COOKIE),
        client_ip(headers, peer, state.trust_forwarded_for),
        is_secure(headers, state.cookie_secure, state.trust_forwarded_for),
    );
    let presented = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let method = req.method().clone();

    let ctx = Arc::new(Mutex::new(ctx));
    let admitted = {
        let mut guard = ctx.lock().await;
        state
            .guard
            .admit(&mut guard, method.as_str(), presented.as_deref())
            .await
    };

    let mut response = match admitted {
        Ok(session) => {
            req.extensions_mut()
                .insert(CurrentSession::new(session, ctx.clone()));
            next.run(req).await
        }
        Err(e) => errors::access_error_to_response(e),
    };

    let effects = ctx.lock().await.effects().clone();
    apply_effects(&mut response, &effects);
    response
}

fn apply_effects(response: &mut Response, effects: &ResponseEffects) {
    let headers = response.headers_mut();

    if let Some(cookie) = &effects.session_cookie {
        match HeaderValue::from_str(&cookie.header_value()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::error!("session cookie is not a valid header value"),
        }
    }

    if let Some(token) = &effects.csrf_token {
        match HeaderValue::from_str(token) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(CSRF_HEADER), value);
            }
            Err(_) => tracing::error!("csrf token is not a valid header value"),
        }
    }
}
