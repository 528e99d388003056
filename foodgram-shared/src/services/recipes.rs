/// Recipe lifecycle and read model
///
/// Create and update each run in one transaction: the recipe row, its short
/// code and its associations land together or not at all. Images are stored
/// before the transaction starts and released afterwards when nothing
/// references them any more.
///
/// Reads assemble [`RecipeDetail`] values in batches: one query per
/// association kind for a whole page, whatever its size.

use sha2::{Digest, Sha256};
use sqlx::{PgConnection, PgPool};
use std::collections::{HashMap, HashSet};

use super::associations::{replace_associations, AssociationSet};
use crate::error::{ServiceError, ServiceResult};
use crate::media::{resolve_image, ImageNamespace, ImageStore};
use crate::models::{
    mark::{self, MarkKind},
    recipe::{NewRecipe, Recipe, RecipeChanges, RecipeFilter, RecipeIngredientRow},
    tag::Tag,
    user::{User, UserProfile},
};

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 32_000;

/// Length of a recipe's short code in hex characters
pub const SHORT_CODE_LEN: usize = 10;

/// Deterministic short code for a recipe id
pub fn short_code_for(recipe_id: i64) -> String {
    let digest = Sha256::digest(recipe_id.to_string().as_bytes());
    let mut code = hex::encode(digest);
    code.truncate(SHORT_CODE_LEN);
    code
}

/// Everything needed to create a recipe
#[derive(Debug, Clone)]
pub struct RecipeInput {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,

    /// Image payload or an existing image key
    pub image: String,

    pub associations: AssociationSet,
}

/// An update always rewrites both association sets; scalars are optional
#[derive(Debug, Clone)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
    pub associations: AssociationSet,
}

/// A recipe with everything a client renders
#[derive(Debug, Clone)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub author: UserProfile,

    /// Ordered by name
    pub tags: Vec<Tag>,

    /// In submission order
    pub ingredients: Vec<RecipeIngredientRow>,

    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

fn check_cooking_time(value: i32) -> ServiceResult<()> {
    if !(MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&value) {
        return Err(ServiceError::validation(
            "cooking_time",
            format!("Cooking time must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME}"),
        ));
    }
    Ok(())
}

/// Deletes an image once no recipe references it; failures are only logged
async fn release_image(pool: &PgPool, images: &dyn ImageStore, key: &str) {
    match Recipe::image_in_use(pool, key).await {
        Ok(true) => {}
        Ok(false) => {
            if let Err(e) = images.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to delete recipe image");
            }
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to check recipe image usage");
        }
    }
}

/// Hydrates recipes for `viewer_id`, keeping the input order
pub async fn load_details(
    conn: &mut PgConnection,
    viewer_id: Option<i64>,
    recipes: Vec<Recipe>,
) -> ServiceResult<Vec<RecipeDetail>> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();
    let author_ids: Vec<i64> = recipes
        .iter()
        .map(|r| r.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let authors: HashMap<i64, UserProfile> = User::profiles(&mut *conn, &author_ids, viewer_id)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in Recipe::tags_for(&mut *conn, &ids).await? {
        tags.entry(row.recipe_id).or_default().push(Tag {
            id: row.id,
            name: row.name,
            slug: row.slug,
        });
    }

    let mut ingredients: HashMap<i64, Vec<RecipeIngredientRow>> = HashMap::new();
    for row in Recipe::ingredients_for(&mut *conn, &ids).await? {
        ingredients.entry(row.recipe_id).or_default().push(row);
    }

    let (favorited, in_cart): (HashSet<i64>, HashSet<i64>) = match viewer_id {
        Some(viewer) => (
            mark::marked_among(&mut *conn, MarkKind::Favorite, viewer, &ids)
                .await?
                .into_iter()
                .collect(),
            mark::marked_among(&mut *conn, MarkKind::ShoppingCart, viewer, &ids)
                .await?
                .into_iter()
                .collect(),
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    let mut details = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| {
            ServiceError::not_found(format!("Author {} not found", recipe.author_id))
        })?;

        details.push(RecipeDetail {
            author,
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
            is_favorited: favorited.contains(&recipe.id),
            is_in_shopping_cart: in_cart.contains(&recipe.id),
            recipe,
        });
    }

    Ok(details)
}

async fn load_one(
    conn: &mut PgConnection,
    viewer_id: Option<i64>,
    recipe: Recipe,
) -> ServiceResult<RecipeDetail> {
    let recipe_id = recipe.id;
    load_details(conn, viewer_id, vec![recipe])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::not_found(format!("Recipe {recipe_id} not found")))
}

/// Creates a recipe with its associations and short code
///
/// # Errors
///
/// - `Validation` for out-of-range fields (nothing is written)
/// - `NotFound` for unknown tags or ingredients (the recipe row is rolled back)
pub async fn create_recipe(
    pool: &PgPool,
    images: &dyn ImageStore,
    author_id: i64,
    input: RecipeInput,
) -> ServiceResult<RecipeDetail> {
    let RecipeInput {
        name,
        text,
        cooking_time,
        image,
        associations,
    } = input;
    check_cooking_time(cooking_time)?;

    let image = resolve_image(images, ImageNamespace::Recipes, &image).await?;

    let result = async {
        let mut tx = pool.begin().await?;

        let recipe = Recipe::insert(
            &mut *tx,
            &NewRecipe {
                author_id,
                name,
                text,
                cooking_time,
                image: image.clone(),
            },
        )
        .await?;

        let code = short_code_for(recipe.id);
        Recipe::set_short_code(&mut *tx, recipe.id, &code).await?;
        replace_associations(&mut tx, recipe.id, &associations).await?;

        let recipe = Recipe::find_by_id(&mut *tx, recipe.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Recipe vanished during creation"))?;
        let detail = load_one(&mut tx, Some(author_id), recipe).await?;

        tx.commit().await?;
        Ok::<_, ServiceError>(detail)
    }
    .await;

    match result {
        Ok(detail) => {
            tracing::info!(recipe_id = detail.recipe.id, author_id, "Created recipe");
            Ok(detail)
        }
        Err(e) => {
            release_image(pool, images, &image).await;
            Err(e)
        }
    }
}

/// Fails unless `editor_id` wrote the recipe
///
/// Lets callers reject strangers before looking at the payload.
pub async fn ensure_author(pool: &PgPool, editor_id: i64, recipe_id: i64) -> ServiceResult<()> {
    let existing = Recipe::find_by_id(pool, recipe_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Recipe {recipe_id} not found")))?;
    check_author(&existing, editor_id)
}

fn check_author(recipe: &Recipe, editor_id: i64) -> ServiceResult<()> {
    if recipe.author_id != editor_id {
        return Err(ServiceError::Forbidden(
            "Only the author may change this recipe".to_string(),
        ));
    }
    Ok(())
}

/// Updates a recipe owned by `editor_id`
///
/// The new image is stored before the row lock is taken.
///
/// # Errors
///
/// - `NotFound` when the recipe does not exist
/// - `Forbidden` when `editor_id` is not the author
pub async fn update_recipe(
    pool: &PgPool,
    images: &dyn ImageStore,
    editor_id: i64,
    recipe_id: i64,
    update: RecipeUpdate,
) -> ServiceResult<RecipeDetail> {
    let RecipeUpdate {
        name,
        text,
        cooking_time,
        image,
        associations,
    } = update;
    if let Some(cooking_time) = cooking_time {
        check_cooking_time(cooking_time)?;
    }
    ensure_author(pool, editor_id, recipe_id).await?;

    let new_image = match image.as_deref() {
        Some(payload) => Some(resolve_image(images, ImageNamespace::Recipes, payload).await?),
        None => None,
    };

    let result = async {
        let mut tx = pool.begin().await?;

        let existing = Recipe::find_for_update(&mut *tx, recipe_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Recipe {recipe_id} not found")))?;
        check_author(&existing, editor_id)?;

        let changes = RecipeChanges {
            name,
            text,
            cooking_time,
            image: new_image.clone(),
        };

        let recipe = Recipe::update(&mut *tx, recipe_id, &changes)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Recipe {recipe_id} not found")))?;
        replace_associations(&mut tx, recipe_id, &associations).await?;
        let detail = load_one(&mut tx, Some(editor_id), recipe).await?;

        tx.commit().await?;
        Ok::<_, ServiceError>((detail, existing.image))
    }
    .await;

    match result {
        Ok((detail, old_image)) => {
            if new_image.as_deref().is_some_and(|key| key != old_image) {
                release_image(pool, images, &old_image).await;
            }
            tracing::info!(recipe_id, editor_id, "Updated recipe");
            Ok(detail)
        }
        Err(e) => {
            if let Some(key) = new_image {
                release_image(pool, images, &key).await;
            }
            Err(e)
        }
    }
}

/// Deletes a recipe owned by `editor_id`; associations and marks cascade
pub async fn delete_recipe(
    pool: &PgPool,
    images: &dyn ImageStore,
    editor_id: i64,
    recipe_id: i64,
) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;

    let existing = Recipe::find_for_update(&mut *tx, recipe_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Recipe {recipe_id} not found")))?;
    if existing.author_id != editor_id {
        return Err(ServiceError::Forbidden(
            "Only the author may delete this recipe".to_string(),
        ));
    }

    Recipe::delete(&mut *tx, recipe_id).await?;
    tx.commit().await?;

    release_image(pool, images, &existing.image).await;
    tracing::info!(recipe_id, editor_id, "Deleted recipe");

    Ok(())
}

pub async fn get_recipe(
    pool: &PgPool,
    viewer_id: Option<i64>,
    recipe_id: i64,
) -> ServiceResult<RecipeDetail> {
    let mut conn = pool.acquire().await?;

    let recipe = Recipe::find_by_id(&mut *conn, recipe_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Recipe {recipe_id} not found")))?;

    load_one(&mut conn, viewer_id, recipe).await
}

/// One page of recipes plus the total number of matches
pub async fn list_recipes(
    pool: &PgPool,
    viewer_id: Option<i64>,
    filter: &RecipeFilter,
    limit: i64,
    offset: i64,
) -> ServiceResult<(Vec<RecipeDetail>, i64)> {
    let mut conn = pool.acquire().await?;

    let count = Recipe::count(&mut *conn, filter).await?;
    let recipes = Recipe::list(&mut *conn, filter, limit, offset).await?;
    let details = load_details(&mut conn, viewer_id, recipes).await?;

    Ok((details, count))
}

/// Short code of an existing recipe, assigning one if it is missing
pub async fn short_link_code(pool: &PgPool, recipe_id: i64) -> ServiceResult<String> {
    let recipe = Recipe::find_by_id(pool, recipe_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Recipe {recipe_id} not found")))?;

    if let Some(code) = recipe.short_code {
        return Ok(code);
    }

    let code = short_code_for(recipe.id);
    Recipe::set_short_code(pool, recipe.id, &code).await?;
    Ok(code)
}

/// Recipe id behind a short code
pub async fn resolve_short_code(pool: &PgPool, code: &str) -> ServiceResult<i64> {
    Recipe::find_by_short_code(pool, code)
        .await?
        .map(|r| r.id)
        .ok_or_else(|| ServiceError::not_found("Short link not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_code_is_stable_hex() {
        let code = short_code_for(42);
        assert_eq!(code.len(), SHORT_CODE_LEN);
        assert!(code.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(code, short_code_for(42));
        assert_ne!(code, short_code_for(43));
    }

    #[test]
    fn test_short_code_matches_sha256_prefix() {
        // sha256("1") = 6b86b273ff34fce19d6b804eff5a3f5747ada4eaa22f1d49c01e52ddb7875b4b
        assert_eq!(short_code_for(1), "6b86b273ff");
    }

    #[test]
    fn test_cooking_time_bounds() {
        assert!(check_cooking_time(MIN_COOKING_TIME).is_ok());
        assert!(check_cooking_time(MAX_COOKING_TIME).is_ok());
        assert!(check_cooking_time(0).is_err());
        assert!(check_cooking_time(MAX_COOKING_TIME + 1).is_err());
    }
}
