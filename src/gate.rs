//! Request-time access control.
//!
//! Every request passes through [`access_gate`]: the session is resolved, the path is
//! classified against [`ROUTE_TABLE`], and the request is either forwarded or redirected.
//! Cookies rotated while resolving the session reach the client on every outcome, unless
//! the handler itself sets a cookie of the same name.

use axum::{
    extract::{OriginalUri, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    cookies::{CookieJar, CookieMutation, with_cookies},
    models::{AuthorizationRecord, Identity, Role},
    repository::Repository,
    session::SessionResolution,
};

pub const ADMIN_LOGIN_PATH: &str = "/admin/login";
pub const LOGIN_PATH: &str = "/login";
pub const SITE_ROOT: &str = "/";

/// Access
///
/// What a route requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Role(Role),
}

impl Access {
    /// Where a caller without any session is sent.
    fn sign_in_target(&self) -> &'static str {
        match self {
            Access::Role(Role::Admin) => ADMIN_LOGIN_PATH,
            Access::Role(Role::User) | Access::Authenticated | Access::Public => LOGIN_PATH,
        }
    }
}

/// Route classification, first match wins. Paths matching no prefix are public.
pub const ROUTE_TABLE: &[(&str, Access)] = &[
    ("/admin/login", Access::Public),
    ("/admin/test-connection", Access::Public),
    ("/admin/setup", Access::Public),
    ("/admin", Access::Role(Role::Admin)),
    ("/dashboard", Access::Authenticated),
];

/// Segment-aware prefix match: `/admin` covers `/admin` and `/admin/x`, not `/administer`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub fn classify(path: &str) -> Access {
    ROUTE_TABLE
        .iter()
        .find(|(prefix, _)| matches_prefix(path, prefix))
        .map(|(_, access)| *access)
        .unwrap_or(Access::Public)
}

/// Decision
///
/// The gate's verdict. A forward carries the role record when one was fetched, so
/// handlers behind the admin policy do not look it up again.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Forward(Option<AuthorizationRecord>),
    Redirect(&'static str),
}

/// decide
///
/// Applies the policy of `access` to the resolved identity. A failed or empty role lookup
/// denies access; the lookup is attempted exactly once.
pub async fn decide(
    access: Access,
    identity: Option<&Identity>,
    repo: &dyn Repository,
) -> Decision {
    let required = match access {
        Access::Public => return Decision::Forward(None),
        Access::Authenticated => {
            return match identity {
                Some(_) => Decision::Forward(None),
                None => Decision::Redirect(access.sign_in_target()),
            };
        }
        Access::Role(required) => required,
    };

    let Some(identity) = identity else {
        return Decision::Redirect(access.sign_in_target());
    };

    match repo.get_authorization(identity.id).await {
        Ok(Some(record)) if record.role.satisfies(required) => Decision::Forward(Some(record)),
        Ok(Some(record)) => {
            tracing::debug!(user_id = %identity.id, role = %record.role, "insufficient role");
            Decision::Redirect(SITE_ROOT)
        }
        Ok(None) => {
            tracing::debug!(user_id = %identity.id, "no authorization record");
            Decision::Redirect(SITE_ROOT)
        }
        Err(e) => {
            tracing::warn!(user_id = %identity.id, error = %e, "authorization lookup failed");
            Decision::Redirect(SITE_ROOT)
        }
    }
}

/// access_gate
///
/// Middleware applied to the whole router.
pub async fn access_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let mut jar = CookieJar::from_headers(request.headers());

    let SessionResolution { identity, cookies } = match state.sessions.resolve_identity(&jar).await {
        Ok(resolution) => resolution,
        Err(e) => {
            tracing::warn!(error = %e, "session resolution failed, continuing anonymously");
            SessionResolution::anonymous()
        }
    };

    // Nested routers see a stripped URI; classify what the client actually asked for.
    let path = match request.extensions().get::<OriginalUri>() {
        Some(original) => original.path().to_owned(),
        None => request.uri().path().to_owned(),
    };
    let access = classify(&path);
    let decision = decide(access, identity.as_ref(), state.repo.as_ref()).await;

    let response = match decision {
        Decision::Forward(record) => {
            if !cookies.is_empty() {
                refresh_request_cookies(&mut request, &mut jar, &cookies);
            }
            if let Some(identity) = identity {
                request.extensions_mut().insert(identity);
            }
            if let Some(record) = record {
                request.extensions_mut().insert(record);
            }
            next.run(request).await
        }
        Decision::Redirect(target) => {
            tracing::debug!(
                path = %path,
                user_id = ?identity.as_ref().map(|i| i.id),
                target,
                "redirecting"
            );
            Redirect::temporary(target).into_response()
        }
    };

    with_cookies(response, &cookies)
}

/// Downstream handlers must see the session the client is about to hold, not the stale one.
fn refresh_request_cookies(request: &mut Request, jar: &mut CookieJar, cookies: &[CookieMutation]) {
    jar.apply(cookies);
    let headers = request.headers_mut();
    headers.remove(header::COOKIE);
    if let Some(value) = jar.to_header_value() {
        headers.insert(header::COOKIE, value);
    }
}
