/// Follow records
///
/// A follow is a directed (follower, following) pair. The primary key makes
/// duplicates impossible and a CHECK constraint forbids following oneself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use super::user::UserProfile;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub follower_id: i64,
    pub following_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    /// Inserts the pair; false when it already existed
    ///
    /// Concurrent duplicates are settled by the primary key: exactly one
    /// caller sees `true`.
    pub async fn insert<'e, E>(
        executor: E,
        follower_id: i64,
        following_id: i64,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Deletes the pair; false when there was nothing to delete
    pub async fn delete<'e, E>(
        executor: E,
        follower_id: i64,
        following_id: i64,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(follower_id)
                .bind(following_id)
                .execute(executor)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Profiles of the users `follower_id` follows, ordered by username
    pub async fn followed_profiles<'e, E>(
        executor: E,
        follower_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserProfile>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.avatar,
                   TRUE AS is_subscribed
            FROM follows f
            JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = $1
            ORDER BY u.username, u.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(follower_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    pub async fn count_followed<'e, E>(executor: E, follower_id: i64) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(follower_id)
            .fetch_one(executor)
            .await
    }
}
