/// Follow management
///
/// Following yourself is a validation error whatever else is true; a second
/// follow of the same author is a `Conflict`; unfollowing someone you do not
/// follow is `NotFound`. Followed authors are returned with their newest
/// recipes, optionally capped per author by `recipes_limit`.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    follow::Follow,
    recipe::{Recipe, RecipeSummary},
    user::{User, UserProfile},
};

/// An author as shown in subscription listings
#[derive(Debug, Clone, Serialize)]
pub struct FollowedAuthor {
    pub profile: UserProfile,
    pub recipes: Vec<RecipeSummary>,

    /// All of the author's recipes, regardless of the cap
    pub recipes_count: i64,
}

/// Rejects zero and negative caps
pub fn check_recipes_limit(limit: Option<i64>) -> ServiceResult<Option<i64>> {
    match limit {
        Some(n) if n < 1 => Err(ServiceError::validation(
            "recipes_limit",
            "Must be a positive integer",
        )),
        other => Ok(other),
    }
}

async fn attach_recipes(
    conn: &mut PgConnection,
    profiles: Vec<UserProfile>,
    recipes_limit: Option<i64>,
) -> ServiceResult<Vec<FollowedAuthor>> {
    if profiles.is_empty() {
        return Ok(Vec::new());
    }

    let author_ids: Vec<i64> = profiles.iter().map(|p| p.id).collect();

    let mut recipes: HashMap<i64, Vec<RecipeSummary>> = HashMap::new();
    for row in Recipe::summaries_by_authors(&mut *conn, &author_ids, recipes_limit).await? {
        recipes.entry(row.author_id).or_default().push(row.into());
    }

    let counts: HashMap<i64, i64> = Recipe::counts_by_authors(&mut *conn, &author_ids)
        .await?
        .into_iter()
        .collect();

    Ok(profiles
        .into_iter()
        .map(|profile| FollowedAuthor {
            recipes: recipes.remove(&profile.id).unwrap_or_default(),
            recipes_count: counts.get(&profile.id).copied().unwrap_or(0),
            profile,
        })
        .collect())
}

/// Makes `follower_id` follow `target_id`
///
/// # Errors
///
/// - `Validation` when following oneself or for a bad `recipes_limit`
/// - `NotFound` when the target does not exist
/// - `Conflict` when already following
pub async fn follow(
    pool: &PgPool,
    follower_id: i64,
    target_id: i64,
    recipes_limit: Option<i64>,
) -> ServiceResult<FollowedAuthor> {
    if follower_id == target_id {
        return Err(ServiceError::validation(
            "non_field_errors",
            "You cannot subscribe to yourself",
        ));
    }
    let recipes_limit = check_recipes_limit(recipes_limit)?;

    let mut tx = pool.begin().await?;

    if !User::exists(&mut *tx, target_id).await? {
        return Err(ServiceError::not_found(format!("User {target_id} not found")));
    }

    if !Follow::insert(&mut *tx, follower_id, target_id).await? {
        return Err(ServiceError::conflict("Already subscribed to this user"));
    }

    let profile = User::profile(&mut *tx, target_id, Some(follower_id))
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("User {target_id} not found")))?;
    let author = attach_recipes(&mut tx, vec![profile], recipes_limit)
        .await?
        .pop()
        .ok_or_else(|| ServiceError::not_found(format!("User {target_id} not found")))?;

    tx.commit().await?;

    tracing::info!(follower_id, target_id, "Subscribed");
    Ok(author)
}

pub async fn unfollow(pool: &PgPool, follower_id: i64, target_id: i64) -> ServiceResult<()> {
    if !User::exists(pool, target_id).await? {
        return Err(ServiceError::not_found(format!("User {target_id} not found")));
    }

    if !Follow::delete(pool, follower_id, target_id).await? {
        return Err(ServiceError::not_found("Not subscribed to this user"));
    }

    tracing::info!(follower_id, target_id, "Unsubscribed");
    Ok(())
}

/// One page of the authors `follower_id` follows plus their total count
pub async fn subscriptions(
    pool: &PgPool,
    follower_id: i64,
    limit: i64,
    offset: i64,
    recipes_limit: Option<i64>,
) -> ServiceResult<(Vec<FollowedAuthor>, i64)> {
    let recipes_limit = check_recipes_limit(recipes_limit)?;
    let mut conn = pool.acquire().await?;

    let count = Follow::count_followed(&mut *conn, follower_id).await?;
    let profiles = Follow::followed_profiles(&mut *conn, follower_id, limit, offset).await?;
    let authors = attach_recipes(&mut conn, profiles, recipes_limit).await?;

    Ok((authors, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipes_limit() {
        assert_eq!(check_recipes_limit(None).unwrap(), None);
        assert_eq!(check_recipes_limit(Some(3)).unwrap(), Some(3));
        assert!(matches!(
            check_recipes_limit(Some(0)),
            Err(ServiceError::Validation { .. })
        ));
        assert!(check_recipes_limit(Some(-2)).is_err());
    }
}
