//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: session cache, store, authorizer and notification bus
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Must be served with `into_make_service_with_connect_info::<SocketAddr>()`
/// so the session layer can pin sessions to the caller address.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let csrf_state = middleware::CsrfState {
        guard: services.csrf.clone(),
        cookie_secure: services.cookie_secure,
        trust_forwarded_for: services.trust_forwarded_for,
    };

    // Session-gated routes: session resolution + CSRF before any handler.
    let gated = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                csrf_state,
                middleware::csrf_middleware,
            ))
            .layer(Extension(services)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(gated)
}

pub use services::AppServices;
