use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Nested under `/admin`. The first three routes are exempt from the admin policy so an
/// operator can sign in, bootstrap the first administrator and check backend
/// connectivity. Everything else requires the `Admin` role at the gate, and the handlers
/// re-check it through the `AdminUser` extractor.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Exempt pages ---
        .route("/login", get(handlers::admin_login_page))
        .route("/test-connection", get(handlers::test_connection))
        // GET reports whether an admin exists; POST claims the role while none does.
        .route(
            "/setup",
            get(handlers::get_setup_status).post(handlers::claim_setup),
        )
        // --- CMS ---
        .route("/users", get(handlers::list_users))
        .route("/users/{id}/role", put(handlers::set_user_role))
        .route("/analytics", get(handlers::get_analytics))
        .route("/courses", get(handlers::list_all_courses))
}
