//! Postgres-backed repository tests. They need a Supabase database (the `auth.users`
//! table must exist) and run with `cargo test -- --ignored` once `DATABASE_URL` is set.

use academy_gate::{
    models::Role,
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

/// Inserts a user into both `auth.users` and `public.profiles`.
async fn create_test_user(pool: &PgPool, role: Role) -> Uuid {
    let id = Uuid::new_v4();
    let email = format!("{id}@test.com");

    sqlx::query(
        r#"
        WITH auth_user AS (
            INSERT INTO auth.users (id, email) VALUES ($1, $2)
            RETURNING id, email
        )
        INSERT INTO public.profiles (id, email, role)
        SELECT id, email, $3 FROM auth_user
        "#,
    )
    .bind(id)
    .bind(&email)
    .bind(role.as_str())
    .execute(pool)
    .await
    .expect("Failed to create test user");

    id
}

async fn demote_all_admins(pool: &PgPool) {
    sqlx::query("UPDATE profiles SET role = 'user' WHERE role = 'admin'")
        .execute(pool)
        .await
        .expect("Failed to reset admins");
}

// --- Tests ---

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a Supabase database"]
async fn concurrent_first_admin_claims_have_one_winner() {
    let ctx = DbTestContext::setup().await;
    demote_all_admins(&ctx.pool).await;
    let first = create_test_user(&ctx.pool, Role::User).await;
    let second = create_test_user(&ctx.pool, Role::User).await;

    let repo_a = ctx.repository();
    let repo_b = ctx.repository();
    let (a, b) = tokio::join!(
        repo_a.claim_first_admin(first),
        repo_b.claim_first_admin(second)
    );

    let winners = [a.unwrap(), b.unwrap()]
        .into_iter()
        .filter(Option::is_some)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(ctx.repository().count_admins().await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a Supabase database"]
async fn claim_is_refused_once_an_admin_exists() {
    let ctx = DbTestContext::setup().await;
    demote_all_admins(&ctx.pool).await;
    create_test_user(&ctx.pool, Role::Admin).await;
    let late = create_test_user(&ctx.pool, Role::User).await;

    let claimed = ctx.repository().claim_first_admin(late).await.unwrap();

    assert!(claimed.is_none());
    let record = ctx.repository().get_authorization(late).await.unwrap().unwrap();
    assert_eq!(record.role, Role::User);
}
