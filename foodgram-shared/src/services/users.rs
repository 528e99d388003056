/// Profiles and avatars

use sqlx::PgPool;

use crate::error::{ServiceError, ServiceResult};
use crate::media::{resolve_image, ImageNamespace, ImageStore};
use crate::models::user::{User, UserProfile};

pub async fn get_profile(
    pool: &PgPool,
    viewer_id: Option<i64>,
    user_id: i64,
) -> ServiceResult<UserProfile> {
    User::profile(pool, user_id, viewer_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("User {user_id} not found")))
}

/// One page of all users plus the total count
pub async fn list_users(
    pool: &PgPool,
    viewer_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> ServiceResult<(Vec<UserProfile>, i64)> {
    let mut conn = pool.acquire().await?;

    let count = User::count(&mut *conn).await?;
    let profiles = User::list_profiles(&mut *conn, viewer_id, limit, offset).await?;

    Ok((profiles, count))
}

async fn release_avatar(pool: &PgPool, images: &dyn ImageStore, key: &str) {
    match User::avatar_in_use(pool, key).await {
        Ok(true) => {}
        Ok(false) => {
            if let Err(e) = images.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to delete avatar");
            }
        }
        Err(e) => tracing::warn!(key = %key, error = %e, "Failed to check avatar usage"),
    }
}

/// Stores the avatar and returns its key; the previous one is released
pub async fn set_avatar(
    pool: &PgPool,
    images: &dyn ImageStore,
    user_id: i64,
    payload: &str,
) -> ServiceResult<String> {
    let key = resolve_image(images, ImageNamespace::Avatars, payload).await?;

    let mut tx = pool.begin().await?;
    let user = User::find_for_update(&mut *tx, user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("User {user_id} not found")))?;
    User::set_avatar(&mut *tx, user_id, Some(&key)).await?;
    tx.commit().await?;

    if let Some(previous) = user.avatar.filter(|prev| *prev != key) {
        release_avatar(pool, images, &previous).await;
    }

    tracing::info!(user_id, "Updated avatar");
    Ok(key)
}

pub async fn remove_avatar(
    pool: &PgPool,
    images: &dyn ImageStore,
    user_id: i64,
) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    let user = User::find_for_update(&mut *tx, user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("User {user_id} not found")))?;
    let previous = user
        .avatar
        .ok_or_else(|| ServiceError::not_found("Avatar is not set"))?;
    User::set_avatar(&mut *tx, user_id, None).await?;
    tx.commit().await?;

    release_avatar(pool, images, &previous).await;

    tracing::info!(user_id, "Removed avatar");
    Ok(())
}
