#![allow(dead_code)]

use academy_gate::{
    AppConfig, AppState, create_router,
    cookies::{CookieAttributes, CookieJar, CookieMutation},
    errors::{LookupError, SessionError},
    models::{AdminStats, AuthorizationRecord, Course, Identity, Role, UserProfile},
    repository::Repository,
    session::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, SessionResolution, SessionStore},
};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use chrono::Utc;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tower::ServiceExt;
use uuid::Uuid;

pub const USER_ID: Uuid = Uuid::from_u128(1);
pub const OTHER_ID: Uuid = Uuid::from_u128(2);

// --- Mock Session Store ---

pub enum SessionBehavior {
    Resolve(SessionResolution),
    Fail,
}

pub struct MockSessions {
    pub behavior: SessionBehavior,
    // Jar seen by the last resolve call.
    pub seen: Mutex<Option<CookieJar>>,
}

impl MockSessions {
    pub fn anonymous() -> Self {
        Self::resolving(SessionResolution::anonymous())
    }

    pub fn signed_in() -> Self {
        Self::resolving(SessionResolution::authenticated(identity()))
    }

    pub fn resolving(resolution: SessionResolution) -> Self {
        Self {
            behavior: SessionBehavior::Resolve(resolution),
            seen: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            behavior: SessionBehavior::Fail,
            seen: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SessionStore for MockSessions {
    async fn resolve_identity(&self, jar: &CookieJar) -> Result<SessionResolution, SessionError> {
        *self.seen.lock().unwrap() = Some(jar.clone());
        match &self.behavior {
            SessionBehavior::Resolve(resolution) => Ok(resolution.clone()),
            SessionBehavior::Fail => Err(SessionError::Backend { status: 503 }),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionResolution, SessionError> {
        if email == "member@example.com" && password == "correct-horse" {
            Ok(SessionResolution {
                identity: Some(identity()),
                cookies: vec![rotated_access_cookie()],
            })
        } else {
            Err(SessionError::InvalidCredentials)
        }
    }

    async fn sign_out(&self, _jar: &CookieJar) -> Vec<CookieMutation> {
        vec![
            CookieMutation::remove(ACCESS_TOKEN_COOKIE, false),
            CookieMutation::remove(REFRESH_TOKEN_COOKIE, false),
        ]
    }

    async fn health_check(&self) -> Result<(), SessionError> {
        match self.behavior {
            SessionBehavior::Resolve(_) => Ok(()),
            SessionBehavior::Fail => Err(SessionError::Backend { status: 503 }),
        }
    }
}

// --- Mock Repository ---

pub enum AuthorizationBehavior {
    Role(Role),
    Missing,
    Fails,
}

pub struct MockRepo {
    pub authorization: AuthorizationBehavior,
    pub profiles: Vec<UserProfile>,
    pub courses: Vec<Course>,
    pub admin_count: i64,
    pub database_up: bool,
    pub lookups: AtomicUsize,
}

impl Default for MockRepo {
    fn default() -> Self {
        Self {
            authorization: AuthorizationBehavior::Missing,
            profiles: vec![profile(USER_ID, Role::User)],
            courses: vec![course("intro-rust", true), course("draft", false)],
            admin_count: 0,
            database_up: true,
            lookups: AtomicUsize::new(0),
        }
    }
}

impl MockRepo {
    pub fn with_role(role: Role) -> Self {
        Self {
            authorization: AuthorizationBehavior::Role(role),
            ..Default::default()
        }
    }

    pub fn failing_lookup() -> Self {
        Self {
            authorization: AuthorizationBehavior::Fails,
            ..Default::default()
        }
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_authorization(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<AuthorizationRecord>, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match self.authorization {
            AuthorizationBehavior::Role(role) => Ok(Some(AuthorizationRecord { identity_id, role })),
            AuthorizationBehavior::Missing => Ok(None),
            AuthorizationBehavior::Fails => Err(LookupError::Database(sqlx::Error::PoolTimedOut)),
        }
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, LookupError> {
        Ok(self.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, LookupError> {
        Ok(self.profiles.clone())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<UserProfile>, LookupError> {
        Ok(self
            .profiles
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .map(|p| UserProfile { role, ..p }))
    }

    async fn claim_first_admin(&self, id: Uuid) -> Result<Option<UserProfile>, LookupError> {
        if self.admin_count > 0 {
            return Ok(None);
        }
        self.set_role(id, Role::Admin).await
    }

    async fn count_admins(&self) -> Result<i64, LookupError> {
        Ok(self.admin_count)
    }

    async fn list_courses(&self, published_only: bool) -> Result<Vec<Course>, LookupError> {
        Ok(self
            .courses
            .iter()
            .filter(|c| c.is_published || !published_only)
            .cloned()
            .collect())
    }

    async fn get_enrolled_courses(&self, _user_id: Uuid) -> Result<Vec<Course>, LookupError> {
        Ok(self.courses.iter().take(1).cloned().collect())
    }

    async fn get_stats(&self) -> Result<AdminStats, LookupError> {
        Ok(AdminStats {
            total_users: self.profiles.len() as i64,
            total_admins: self.admin_count,
            total_courses: self.courses.len() as i64,
            published_courses: self.courses.iter().filter(|c| c.is_published).count() as i64,
            total_enrollments: 1,
        })
    }

    async fn ping(&self) -> Result<(), LookupError> {
        if self.database_up {
            Ok(())
        } else {
            Err(LookupError::Database(sqlx::Error::PoolTimedOut))
        }
    }
}

// --- Fixtures ---

pub fn identity() -> Identity {
    Identity {
        id: USER_ID,
        email: Some("member@example.com".to_string()),
    }
}

pub fn profile(id: Uuid, role: Role) -> UserProfile {
    UserProfile {
        id,
        email: format!("{}@example.com", id.simple()),
        full_name: None,
        role,
        created_at: Utc::now(),
    }
}

pub fn course(slug: &str, is_published: bool) -> Course {
    Course {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        title: slug.to_uppercase(),
        description: None,
        is_published,
        created_at: Utc::now(),
    }
}

pub fn rotated_access_cookie() -> CookieMutation {
    CookieMutation::set(
        ACCESS_TOKEN_COOKIE,
        "rotated-access-token",
        CookieAttributes::session(3600, false),
    )
}

pub fn state(sessions: Arc<MockSessions>, repo: Arc<MockRepo>) -> AppState {
    AppState {
        repo,
        sessions,
        config: AppConfig::default(),
    }
}

pub fn app(sessions: MockSessions, repo: MockRepo) -> (Router, Arc<MockSessions>, Arc<MockRepo>) {
    let sessions = Arc::new(sessions);
    let repo = Arc::new(repo);
    let router = create_router(state(sessions.clone(), repo.clone()));
    (router, sessions, repo)
}

// --- Request Helpers ---

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn get(router: &Router, path: &str) -> Response<Body> {
    send(
        router,
        Request::builder().uri(path).body(Body::empty()).unwrap(),
    )
    .await
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
