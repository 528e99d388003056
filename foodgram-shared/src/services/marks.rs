/// Favorite and shopping-cart toggles
///
/// Adding an existing mark is a `Conflict`, removing a missing one is
/// `NotFound`. Concurrent duplicate adds are settled by the table's primary
/// key, so exactly one of them succeeds.

use sqlx::PgPool;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    mark::{self, MarkKind},
    recipe::{Recipe, RecipeSummary},
};

/// Marks the recipe for the user and returns its summary
pub async fn add_mark(
    pool: &PgPool,
    kind: MarkKind,
    user_id: i64,
    recipe_id: i64,
) -> ServiceResult<RecipeSummary> {
    let summary = Recipe::find_summary(pool, recipe_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Recipe {recipe_id} not found")))?;

    if !mark::add(pool, kind, user_id, recipe_id).await? {
        return Err(ServiceError::conflict(format!(
            "Recipe is already in {}",
            kind.label()
        )));
    }

    tracing::debug!(user_id, recipe_id, kind = ?kind, "Added mark");
    Ok(summary)
}

pub async fn remove_mark(
    pool: &PgPool,
    kind: MarkKind,
    user_id: i64,
    recipe_id: i64,
) -> ServiceResult<()> {
    if Recipe::find_summary(pool, recipe_id).await?.is_none() {
        return Err(ServiceError::not_found(format!("Recipe {recipe_id} not found")));
    }

    if !mark::remove(pool, kind, user_id, recipe_id).await? {
        return Err(ServiceError::not_found(format!(
            "Recipe is not in {}",
            kind.label()
        )));
    }

    tracing::debug!(user_id, recipe_id, kind = ?kind, "Removed mark");
    Ok(())
}
