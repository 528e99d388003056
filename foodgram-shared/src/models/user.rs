/// User records
///
/// Accounts are provisioned by the identity provider; this table mirrors the
/// profile fields the recipe API exposes. `avatar` holds an image-store key.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     username VARCHAR(150) NOT NULL UNIQUE,
///     email VARCHAR(254) NOT NULL UNIQUE,
///     first_name VARCHAR(150) NOT NULL,
///     last_name VARCHAR(150) NOT NULL,
///     avatar VARCHAR(512),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use foodgram_shared::models::user::{CreateUser, User};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     username: "chef".to_string(),
///     email: "chef@example.com".to_string(),
///     first_name: "Anna".to_string(),
///     last_name: "Petrova".to_string(),
/// }).await?;
///
/// let profile = User::profile(&pool, user.id, None).await?;
/// assert!(profile.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    /// Image-store key, None until an avatar is uploaded
    pub avatar: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// A user as seen by a particular viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,

    /// Whether the viewer follows this user (false for anonymous viewers)
    pub is_subscribed: bool,
}

impl User {
    /// Inserts a user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation when the username or email is taken.
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, first_name, last_name, avatar, created_at
            "#,
        )
        .bind(data.username)
        .bind(data.email)
        .bind(data.first_name)
        .bind(data.last_name)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, first_name, last_name, avatar, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Loads a user and locks the row for the rest of the transaction
    pub async fn find_for_update<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, first_name, last_name, avatar, created_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    pub async fn exists<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    /// Loads one profile with `is_subscribed` computed for `viewer_id`
    pub async fn profile<'e, E>(
        executor: E,
        id: i64,
        viewer_id: Option<i64>,
    ) -> Result<Option<UserProfile>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.avatar,
                   EXISTS (
                       SELECT 1 FROM follows f
                       WHERE f.follower_id = $2 AND f.following_id = u.id
                   ) AS is_subscribed
            FROM users u
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .bind(viewer_id)
        .fetch_optional(executor)
        .await?;

        Ok(profile)
    }

    /// One page of all profiles ordered by username
    pub async fn list_profiles<'e, E>(
        executor: E,
        viewer_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserProfile>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.avatar,
                   EXISTS (
                       SELECT 1 FROM follows f
                       WHERE f.follower_id = $1 AND f.following_id = u.id
                   ) AS is_subscribed
            FROM users u
            ORDER BY u.username, u.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(viewer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await
    }

    /// Batch variant of [`User::profile`]; order of the result is unspecified
    pub async fn profiles<'e, E>(
        executor: E,
        ids: &[i64],
        viewer_id: Option<i64>,
    ) -> Result<Vec<UserProfile>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.avatar,
                   EXISTS (
                       SELECT 1 FROM follows f
                       WHERE f.follower_id = $2 AND f.following_id = u.id
                   ) AS is_subscribed
            FROM users u
            WHERE u.id = ANY($1)
            "#,
        )
        .bind(ids)
        .bind(viewer_id)
        .fetch_all(executor)
        .await
    }

    /// Sets or clears the avatar key
    ///
    /// Returns false when the user does not exist.
    pub async fn set_avatar<'e, E>(
        executor: E,
        id: i64,
        avatar: Option<&str>,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("UPDATE users SET avatar = $2 WHERE id = $1")
            .bind(id)
            .bind(avatar)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// True when any user still references the avatar key
    pub async fn avatar_in_use<'e, E>(executor: E, key: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE avatar = $1)")
            .bind(key)
            .fetch_one(executor)
            .await
    }
}
