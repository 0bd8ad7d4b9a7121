use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Dashboard Router Module
///
/// Member area, nested under `/dashboard`. Every handler takes the `CurrentUser` extractor,
/// which reads the identity the gate attached to the request.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        // GET /dashboard/me
        .route("/me", get(handlers::get_me))
        // GET /dashboard/courses
        // Courses the member is enrolled in.
        .route("/courses", get(handlers::get_my_courses))
}
