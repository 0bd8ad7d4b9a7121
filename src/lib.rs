use axum::{
    extract::FromRef,
    http::HeaderName,
    Router,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod cookies;
pub mod errors;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;

// Routers grouped by access policy (public, dashboard, admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use session::{SessionStoreState, SupabaseSessionStore};

/// ApiDoc
///
/// OpenAPI document for every JSON endpoint, served at `/api-docs/openapi.json` and browsable
/// through the Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index, handlers::login_page, handlers::sign_in, handlers::sign_out,
        handlers::get_courses, handlers::admin_login_page, handlers::test_connection,
        handlers::get_setup_status, handlers::claim_setup, handlers::list_users,
        handlers::set_user_role, handlers::get_analytics, handlers::list_all_courses,
        handlers::get_me, handlers::get_my_courses,
    ),
    components(
        schemas(
            models::Role, models::Identity, models::UserProfile, models::Course,
            models::AdminStats, models::SignInRequest, models::SetRoleRequest,
            models::PageInfo, models::ConnectionReport, models::SetupStatus,
        )
    ),
    tags(
        (name = "academy", description = "Academy site API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single container of services and configuration shared by every request. Per-request
/// auth context is never stored here; the gate passes it along in request extensions.
#[derive(Clone)]
pub struct AppState {
    /// Profile directory and catalog.
    pub repo: RepositoryState,
    /// Session store: resolves, rotates, creates and invalidates sessions.
    pub sessions: SessionStoreState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionStoreState {
    fn from_ref(app_state: &AppState) -> SessionStoreState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routers, wraps all of them (fallback included) in the access gate, and
/// adds the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/dashboard", authenticated::dashboard_routes())
        .nest("/admin", admin::admin_routes())
        // The gate sees every request, including ones that match no route, so unknown
        // paths under a protected prefix are redirected rather than answered with 404.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::access_gate,
        ))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for each request, correlated by the generated `x-request-id`. Only the path is
/// recorded: query strings may carry tokens.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
