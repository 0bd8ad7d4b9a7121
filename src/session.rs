use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    cookies::{CookieAttributes, CookieJar, CookieMutation},
    errors::SessionError,
    models::Identity,
};

/// Cookie holding the short-lived access token (a Supabase-issued JWT).
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
/// Cookie holding the long-lived refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";

const REFRESH_COOKIE_MAX_AGE: i64 = 400 * 24 * 60 * 60;

/// Claims
///
/// The subset of the Supabase access token payload this server relies on.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID, also the primary key of `public.profiles`.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub aud: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Token pair returned by the auth service's `/token` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// SessionResolution
///
/// Outcome of resolving a request's session: who the caller is (if anyone), plus the
/// cookie changes the client must receive whatever response it ends up getting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionResolution {
    pub identity: Option<Identity>,
    pub cookies: Vec<CookieMutation>,
}

impl SessionResolution {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            cookies: Vec::new(),
        }
    }
}

/// SessionStore
///
/// Contract of the service that owns sessions: it validates them, rotates them when they
/// expire, creates them on sign-in and invalidates them on sign-out.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolves the caller from the request cookies. May rotate the session; the rotated
    /// cookies are returned in the resolution.
    async fn resolve_identity(&self, jar: &CookieJar) -> Result<SessionResolution, SessionError>;

    /// Password sign-in. Returns the identity and the cookies establishing the session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionResolution, SessionError>;

    /// Revokes the session (best effort) and returns the mutations clearing its cookies.
    async fn sign_out(&self, jar: &CookieJar) -> Vec<CookieMutation>;

    /// Reachability probe for the connection test page.
    async fn health_check(&self) -> Result<(), SessionError>;
}

pub type SessionStoreState = Arc<dyn SessionStore>;

/// SupabaseSessionStore
///
/// Session store backed by the Supabase auth API. Access tokens are verified locally
/// against the project JWT secret; the API is only called to refresh, sign in, sign out.
pub struct SupabaseSessionStore {
    http: reqwest::Client,
    auth_url: String,
    anon_key: String,
    decoding_key: DecodingKey,
    validation: Validation,
    secure_cookies: bool,
}

impl SupabaseSessionStore {
    pub fn new(config: &AppConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.jwt_audience.as_str()]);
        validation.validate_exp = true;

        Self {
            http: reqwest::Client::new(),
            auth_url: format!("{}/auth/v1", config.supabase_url.trim_end_matches('/')),
            anon_key: config.supabase_anon_key.clone(),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            secure_cookies: config.secure_cookies(),
        }
    }

    fn verify(&self, token: &str) -> Result<Identity, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(Identity {
            id: data.claims.sub,
            email: data.claims.email,
        })
    }

    fn issue_cookies(&self, tokens: &SessionTokens) -> Vec<CookieMutation> {
        vec![
            CookieMutation::set(
                ACCESS_TOKEN_COOKIE,
                tokens.access_token.clone(),
                CookieAttributes::session(tokens.expires_in, self.secure_cookies),
            ),
            CookieMutation::set(
                REFRESH_TOKEN_COOKIE,
                tokens.refresh_token.clone(),
                CookieAttributes::session(REFRESH_COOKIE_MAX_AGE, self.secure_cookies),
            ),
        ]
    }

    fn clear_cookies(&self) -> Vec<CookieMutation> {
        vec![
            CookieMutation::remove(ACCESS_TOKEN_COOKIE, self.secure_cookies),
            CookieMutation::remove(REFRESH_TOKEN_COOKIE, self.secure_cookies),
        ]
    }

    fn cleared(&self) -> SessionResolution {
        SessionResolution {
            identity: None,
            cookies: self.clear_cookies(),
        }
    }

    /// Exchanges a token grant at `/token`. A client error means the grant was refused.
    async fn grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Option<SessionTokens>, SessionError> {
        let response = self
            .http
            .post(format!("{}/token?grant_type={}", self.auth_url, grant_type))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SessionError::Backend {
                status: status.as_u16(),
            });
        }
        Ok(Some(response.json::<SessionTokens>().await?))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SessionResolution, SessionError> {
        let Some(tokens) = self
            .grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?
        else {
            tracing::debug!("refresh token rejected, clearing session cookies");
            return Ok(self.cleared());
        };

        // The old refresh token is spent by now; an unusable pair means the session is over.
        let identity = match self.verify(&tokens.access_token) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(error = %e, "refreshed access token failed verification");
                return Ok(self.cleared());
            }
        };
        tracing::debug!(user_id = %identity.id, "session rotated");
        Ok(SessionResolution {
            identity: Some(identity),
            cookies: self.issue_cookies(&tokens),
        })
    }
}

#[async_trait]
impl SessionStore for SupabaseSessionStore {
    async fn resolve_identity(&self, jar: &CookieJar) -> Result<SessionResolution, SessionError> {
        let access = jar.get(ACCESS_TOKEN_COOKIE);
        let refresh = jar.get(REFRESH_TOKEN_COOKIE);

        if access.is_none() && refresh.is_none() {
            return Ok(SessionResolution::anonymous());
        }

        if let Some(token) = access {
            match self.verify(token) {
                Ok(identity) => return Ok(SessionResolution::authenticated(identity)),
                // Expired: fall through to the refresh grant.
                Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "rejecting session cookie");
                    return Ok(self.cleared());
                }
            }
        }

        match refresh {
            Some(refresh_token) => self.refresh(refresh_token).await,
            None => Ok(self.cleared()),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionResolution, SessionError> {
        let tokens = self
            .grant("password", json!({ "email": email, "password": password }))
            .await?
            .ok_or(SessionError::InvalidCredentials)?;

        let identity = self.verify(&tokens.access_token)?;
        tracing::info!(user_id = %identity.id, "signed in");
        Ok(SessionResolution {
            identity: Some(identity),
            cookies: self.issue_cookies(&tokens),
        })
    }

    async fn sign_out(&self, jar: &CookieJar) -> Vec<CookieMutation> {
        if let Some(token) = jar.get(ACCESS_TOKEN_COOKIE) {
            let result = self
                .http
                .post(format!("{}/logout", self.auth_url))
                .header("apikey", &self.anon_key)
                .bearer_auth(token)
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    tracing::warn!(status = %response.status(), "session revocation refused")
                }
                Err(e) => tracing::warn!(error = %e, "session revocation failed"),
            }
        }
        self.clear_cookies()
    }

    async fn health_check(&self) -> Result<(), SessionError> {
        let response = self
            .http
            .get(format!("{}/health", self.auth_url))
            .header("apikey", &self.anon_key)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(SessionError::Backend {
                status: response.status().as_u16(),
            })
        }
    }
}
