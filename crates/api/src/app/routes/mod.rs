use axum::{
    Router,
    routing::{get, post},
};

pub mod session;
pub mod shops;
pub mod system;

/// Router for every endpoint behind the session/CSRF layer.
pub fn router() -> Router {
    Router::new()
        .route("/session", get(session::current))
        .route("/session/logout", post(session::logout))
        .nest("/shops", shops::router())
}
