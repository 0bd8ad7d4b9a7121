use crate::{
    errors::LookupError,
    models::{AdminStats, AuthorizationRecord, Course, ProfileRow, Role, UserProfile},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Persistence contract for the profile directory and the course catalog. Handlers and the
/// access gate only see this trait, so tests swap in in-memory implementations.
///
/// `Send + Sync` lets the trait object (`Arc<dyn Repository>`) cross axum task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Profile Directory ---
    // Role lookup for the access gate. `Ok(None)` when the identity has no profile.
    async fn get_authorization(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<AuthorizationRecord>, LookupError>;
    async fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, LookupError>;
    async fn list_profiles(&self) -> Result<Vec<UserProfile>, LookupError>;
    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<UserProfile>, LookupError>;
    // Promotes `id` to admin only while no admin exists; `Ok(None)` otherwise.
    async fn claim_first_admin(&self, id: Uuid) -> Result<Option<UserProfile>, LookupError>;
    async fn count_admins(&self) -> Result<i64, LookupError>;

    // --- Catalog ---
    async fn list_courses(&self, published_only: bool) -> Result<Vec<Course>, LookupError>;
    async fn get_enrolled_courses(&self, user_id: Uuid) -> Result<Vec<Course>, LookupError>;
    async fn get_stats(&self) -> Result<AdminStats, LookupError>;

    // Connectivity probe for the connection test page.
    async fn ping(&self) -> Result<(), LookupError>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held in the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by the Supabase Postgres database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PROFILE_COLUMNS: &str = "id, email, full_name, role, created_at";
const COURSE_COLUMNS: &str = "id, slug, title, description, is_published, created_at";
// Advisory lock key guarding the first-admin claim.
const FIRST_ADMIN_LOCK: i64 = 0x6761_7465_5f61_646d;

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_authorization(
        &self,
        identity_id: Uuid,
    ) -> Result<Option<AuthorizationRecord>, LookupError> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM profiles WHERE id = $1")
            .bind(identity_id)
            .fetch_optional(&self.pool)
            .await?;

        match role {
            Some(role) => Ok(Some(AuthorizationRecord {
                identity_id,
                role: role.parse()?,
            })),
            None => Ok(None),
        }
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, LookupError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserProfile::try_from).transpose()
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, LookupError> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(UserProfile::try_from).collect()
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<Option<UserProfile>, LookupError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE profiles SET role = $2 WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserProfile::try_from).transpose()
    }

    /// Serialized on a transaction-scoped advisory lock. Under READ COMMITTED two concurrent
    /// claims on different rows would each see "no admin" and both succeed.
    async fn claim_first_admin(&self, id: Uuid) -> Result<Option<UserProfile>, LookupError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(FIRST_ADMIN_LOCK)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE profiles SET role = 'admin' \
             WHERE id = $1 AND NOT EXISTS (SELECT 1 FROM profiles WHERE role = 'admin') \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        row.map(UserProfile::try_from).transpose()
    }

    async fn count_admins(&self) -> Result<i64, LookupError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE role = 'admin'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_courses(&self, published_only: bool) -> Result<Vec<Course>, LookupError> {
        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses \
             WHERE is_published OR NOT $1 \
             ORDER BY created_at DESC"
        ))
        .bind(published_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    async fn get_enrolled_courses(&self, user_id: Uuid) -> Result<Vec<Course>, LookupError> {
        let courses = sqlx::query_as::<_, Course>(
            "SELECT c.id, c.slug, c.title, c.description, c.is_published, c.created_at \
             FROM courses c JOIN enrollments e ON e.course_id = c.id \
             WHERE e.user_id = $1 \
             ORDER BY e.enrolled_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    async fn get_stats(&self) -> Result<AdminStats, LookupError> {
        let stats = sqlx::query_as::<_, AdminStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM profiles) AS total_users,
                (SELECT COUNT(*) FROM profiles WHERE role = 'admin') AS total_admins,
                (SELECT COUNT(*) FROM courses) AS total_courses,
                (SELECT COUNT(*) FROM courses WHERE is_published) AS published_courses,
                (SELECT COUNT(*) FROM enrollments) AS total_enrollments
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn ping(&self) -> Result<(), LookupError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
