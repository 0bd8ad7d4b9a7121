use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::LookupError;

// --- Access Control ---

/// Role
///
/// The role attribute stored on a profile (`public.profiles.role`). Stored as the lowercase
/// strings `"user"` and `"admin"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Whether a holder of `self` may enter an area requiring `required`.
    pub fn satisfies(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::User, Role::User) => true,
            (Role::User, Role::Admin) => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(LookupError::InvalidRole(other.to_string())),
        }
    }
}

/// Identity
///
/// The user a request's session resolved to. Lives for one request only; the access gate
/// attaches it to the request extensions when forwarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
}

/// AuthorizationRecord
///
/// The role stored for an identity, fetched fresh on every protected request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationRecord {
    pub identity_id: Uuid,
    pub role: Role,
}

// --- Profiles ---

/// Raw `public.profiles` row; `role` is validated on conversion.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// UserProfile
///
/// A site member as shown on the dashboard and in the admin user list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = LookupError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: row.role.parse()?,
            created_at: row.created_at,
        })
    }
}

// --- Catalog ---

/// Course
///
/// A catalog entry from `public.courses`. Unpublished courses are only visible to admins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// AdminStats
///
/// Output of `GET /admin/analytics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_admins: i64,
    pub total_courses: i64,
    pub published_courses: i64,
    pub total_enrollments: i64,
}

// --- Request Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetRoleRequest {
    pub role: Role,
}

// --- Response Payloads ---

/// Static landing information for the public pages the gate redirects to.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageInfo {
    pub page: String,
    pub title: String,
}

/// ConnectionReport
///
/// Output of `GET /admin/test-connection`: reachability of each backend collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ConnectionReport {
    pub auth_service: bool,
    pub database: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SetupStatus {
    pub admin_exists: bool,
}
