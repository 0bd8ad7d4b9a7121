use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. The gate still resolves (and may rotate) the
/// session on these paths, so a signed-in visitor keeps a fresh cookie while browsing.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /
        // Site index; denied admin access lands here.
        .route("/", get(handlers::index))
        // GET /login
        // Member sign-in page; unauthenticated dashboard access lands here.
        .route("/login", get(handlers::login_page))
        // POST /auth/sign-in, /auth/sign-out
        // Create and invalidate the session cookies.
        .route("/auth/sign-in", post(handlers::sign_in))
        .route("/auth/sign-out", post(handlers::sign_out))
        // GET /courses
        // Published catalog only.
        .route("/courses", get(handlers::get_courses))
}
