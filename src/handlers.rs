use crate::{
    AppState,
    auth::{AdminUser, CurrentUser},
    cookies::{CookieJar, with_cookies},
    errors::ApiError,
    models::{
        AdminStats, ConnectionReport, Course, PageInfo, SetRoleRequest, SetupStatus,
        SignInRequest, UserProfile,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

fn page(page: &str, title: &str) -> Json<PageInfo> {
    Json(PageInfo {
        page: page.to_string(),
        title: title.to_string(),
    })
}

// --- Public Handlers ---

/// [Public Route] Site index. Also the landing target for denied admin access.
#[utoipa::path(get, path = "/", responses((status = 200, description = "Index", body = PageInfo)))]
pub async fn index() -> Json<PageInfo> {
    page("index", "Academy")
}

/// [Public Route] Member login landing, target of unauthenticated dashboard access.
#[utoipa::path(get, path = "/login", responses((status = 200, description = "Login", body = PageInfo)))]
pub async fn login_page() -> Json<PageInfo> {
    page("login", "Sign in")
}

/// sign_in
///
/// [Public Route] Password sign-in through the auth service. On success the session cookies
/// are set on the response and the resolved identity is returned.
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = crate::models::Identity),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Response, ApiError> {
    let resolution = state
        .sessions
        .sign_in(&payload.email, &payload.password)
        .await?;
    let identity = resolution.identity.ok_or(ApiError::Unauthenticated)?;

    Ok(with_cookies(
        Json(identity).into_response(),
        &resolution.cookies,
    ))
}

/// sign_out
///
/// [Public Route] Revokes the session at the auth service and clears the session cookies.
/// The cookies are cleared even when revocation fails.
#[utoipa::path(post, path = "/auth/sign-out", responses((status = 204, description = "Signed out")))]
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let jar = CookieJar::from_headers(&headers);
    let cookies = state.sessions.sign_out(&jar).await;
    with_cookies(StatusCode::NO_CONTENT.into_response(), &cookies)
}

/// [Public Route] Published catalog.
#[utoipa::path(get, path = "/courses", responses((status = 200, description = "Published courses", body = [Course])))]
pub async fn get_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, ApiError> {
    Ok(Json(state.repo.list_courses(true).await?))
}

// --- Admin Area, Public Pages ---

/// [Public Route] Admin login landing, target of unauthenticated admin access.
#[utoipa::path(get, path = "/admin/login", responses((status = 200, description = "Admin login", body = PageInfo)))]
pub async fn admin_login_page() -> Json<PageInfo> {
    page("admin-login", "Administrator sign in")
}

/// test_connection
///
/// [Public Route] Probes both backend collaborators concurrently. Always 200; the body
/// reports which of them answered.
#[utoipa::path(
    get,
    path = "/admin/test-connection",
    responses((status = 200, description = "Reachability report", body = ConnectionReport))
)]
pub async fn test_connection(State(state): State<AppState>) -> Json<ConnectionReport> {
    let (auth, db) = tokio::join!(state.sessions.health_check(), state.repo.ping());

    if let Err(e) = &auth {
        tracing::warn!(error = %e, "auth service probe failed");
    }
    if let Err(e) = &db {
        tracing::warn!(error = %e, "database probe failed");
    }

    Json(ConnectionReport {
        auth_service: auth.is_ok(),
        database: db.is_ok(),
    })
}

/// [Public Route] Whether the first administrator has been set up.
#[utoipa::path(get, path = "/admin/setup", responses((status = 200, description = "Setup status", body = SetupStatus)))]
pub async fn get_setup_status(State(state): State<AppState>) -> Result<Json<SetupStatus>, ApiError> {
    let admins = state.repo.count_admins().await?;
    Ok(Json(SetupStatus {
        admin_exists: admins > 0,
    }))
}

/// claim_setup
///
/// [Public Route, session required] Promotes the caller to administrator, but only while
/// the site has none. Once an admin exists, roles change through `/admin/users` only.
#[utoipa::path(
    post,
    path = "/admin/setup",
    responses(
        (status = 200, description = "Caller promoted", body = UserProfile),
        (status = 401, description = "No session"),
        (status = 404, description = "Caller has no profile"),
        (status = 409, description = "An administrator already exists")
    )
)]
pub async fn claim_setup(
    CurrentUser { id, .. }: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    if state.repo.get_profile(id).await?.is_none() {
        return Err(ApiError::NotFound("Profile"));
    }

    match state.repo.claim_first_admin(id).await? {
        Some(profile) => {
            tracing::info!(user_id = %id, "first administrator claimed");
            Ok(Json(profile))
        }
        None => Err(ApiError::Conflict(
            "An administrator already exists".to_string(),
        )),
    }
}

// --- Admin Handlers ---

/// [Admin Route] Every profile, newest first.
#[utoipa::path(get, path = "/admin/users", responses((status = 200, description = "Users", body = [UserProfile])))]
pub async fn list_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    Ok(Json(state.repo.list_profiles().await?))
}

/// set_user_role
///
/// [Admin Route] Changes a member's role. Takes effect on that member's next request,
/// since the gate never caches role records.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_user_role(
    AdminUser { id: admin_id }: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state
        .repo
        .set_role(id, payload.role)
        .await?
        .ok_or(ApiError::NotFound("Profile"))?;

    tracing::info!(%admin_id, target_id = %id, role = %payload.role, "role changed");
    Ok(Json(profile))
}

/// [Admin Route] Dashboard counters.
#[utoipa::path(get, path = "/admin/analytics", responses((status = 200, description = "Stats", body = AdminStats)))]
pub async fn get_analytics(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(state.repo.get_stats().await?))
}

/// [Admin Route] Whole catalog including unpublished drafts.
#[utoipa::path(get, path = "/admin/courses", responses((status = 200, description = "All courses", body = [Course])))]
pub async fn list_all_courses(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Course>>, ApiError> {
    Ok(Json(state.repo.list_courses(false).await?))
}

// --- Dashboard Handlers ---

/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/dashboard/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 404, description = "No profile yet")
    )
)]
pub async fn get_me(
    CurrentUser { id, .. }: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .repo
        .get_profile(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Profile"))
}

/// [Authenticated Route] Courses the caller is enrolled in.
#[utoipa::path(get, path = "/dashboard/courses", responses((status = 200, description = "My courses", body = [Course])))]
pub async fn get_my_courses(
    CurrentUser { id, .. }: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Course>>, ApiError> {
    Ok(Json(state.repo.get_enrolled_courses(id).await?))
}
