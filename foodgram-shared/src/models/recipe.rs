/// Recipe records and association loaders
///
/// A recipe row carries the scalar fields. Tags and ingredient lines live in
/// `recipe_tags` and `recipe_ingredients`; they are written only by
/// [`crate::services::associations`] and read here in batches keyed by
/// recipe id so that listing pages cost a fixed number of queries.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE recipes (
///     id BIGSERIAL PRIMARY KEY,
///     author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(256) NOT NULL,
///     text TEXT NOT NULL,
///     cooking_time INTEGER NOT NULL CHECK (cooking_time BETWEEN 1 AND 32000),
///     image VARCHAR(512) NOT NULL,
///     short_code VARCHAR(16) UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

const RECIPE_COLUMNS: &str =
    "r.id, r.author_id, r.name, r.text, r.cooking_time, r.image, r.short_code, r.created_at";

/// Shared WHERE clause for listing and counting
///
/// `$1` author, `$2` tag slugs (empty = any), `$3` favorited by, `$4` in cart of.
const FILTER_CLAUSE: &str = r#"
    WHERE ($1::BIGINT IS NULL OR r.author_id = $1)
      AND (cardinality($2::TEXT[]) = 0 OR EXISTS (
            SELECT 1 FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = r.id AND t.slug = ANY($2)))
      AND ($3::BIGINT IS NULL OR EXISTS (
            SELECT 1 FROM favorites f
            WHERE f.recipe_id = r.id AND f.user_id = $3))
      AND ($4::BIGINT IS NULL OR EXISTS (
            SELECT 1 FROM shopping_carts sc
            WHERE sc.recipe_id = r.id AND sc.user_id = $4))
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    pub text: String,

    /// Minutes, within [1, 32000]
    pub cooking_time: i32,

    /// Image-store key
    pub image: String,

    /// Assigned right after insert, inside the creating transaction
    pub short_code: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub author_id: i64,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: String,
}

/// Scalar changes for an update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
}

/// Compact form used by favorites, the cart and follow listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

/// Summary tagged with its author, for per-author grouping
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthoredSummary {
    pub author_id: i64,
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<AuthoredSummary> for RecipeSummary {
    fn from(row: AuthoredSummary) -> Self {
        RecipeSummary {
            id: row.id,
            name: row.name,
            image: row.image,
            cooking_time: row.cooking_time,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipeTagRow {
    pub recipe_id: i64,
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipeIngredientRow {
    pub recipe_id: i64,
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Listing filter; every field is optional
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author_id: Option<i64>,

    /// Matches recipes carrying any of these slugs; empty disables the filter
    pub tag_slugs: Vec<String>,

    pub favorited_by: Option<i64>,
    pub in_cart_of: Option<i64>,
}

impl Recipe {
    pub async fn insert<'e, E>(executor: E, data: &NewRecipe) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes (author_id, name, text, cooking_time, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, author_id, name, text, cooking_time, image, short_code, created_at
            "#,
        )
        .bind(data.author_id)
        .bind(&data.name)
        .bind(&data.text)
        .bind(data.cooking_time)
        .bind(&data.image)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = $1");
        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Loads the recipe and holds its row lock until the transaction ends
    pub async fn find_for_update<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = $1 FOR UPDATE");
        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_summary<'e, E>(
        executor: E,
        id: i64,
    ) -> Result<Option<RecipeSummary>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, RecipeSummary>(
            "SELECT id, name, image, cooking_time FROM recipes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_short_code<'e, E>(
        executor: E,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.short_code = $1");
        sqlx::query_as::<_, Recipe>(&query)
            .bind(code)
            .fetch_optional(executor)
            .await
    }

    pub async fn set_short_code<'e, E>(executor: E, id: i64, code: &str) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE recipes SET short_code = $2 WHERE id = $1")
            .bind(id)
            .bind(code)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Applies scalar changes and returns the updated row
    pub async fn update<'e, E>(
        executor: E,
        id: i64,
        changes: &RecipeChanges,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Recipe>(
            r#"
            UPDATE recipes
            SET name = COALESCE($2, name),
                text = COALESCE($3, text),
                cooking_time = COALESCE($4, cooking_time),
                image = COALESCE($5, image)
            WHERE id = $1
            RETURNING id, author_id, name, text, cooking_time, image, short_code, created_at
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.text.as_deref())
        .bind(changes.cooking_time)
        .bind(changes.image.as_deref())
        .fetch_optional(executor)
        .await
    }

    /// Deletes the recipe; associations, favorites and cart rows cascade
    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// True when any recipe still references the image key
    pub async fn image_in_use<'e, E>(executor: E, key: &str) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM recipes WHERE image = $1)")
            .bind(key)
            .fetch_one(executor)
            .await
    }

    /// One page of recipes matching `filter`, ordered by name
    pub async fn list<'e, E>(
        executor: E,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r {FILTER_CLAUSE} \
             ORDER BY r.name, r.id LIMIT $5 OFFSET $6"
        );

        sqlx::query_as::<_, Recipe>(&query)
            .bind(filter.author_id)
            .bind(filter.tag_slugs.as_slice())
            .bind(filter.favorited_by)
            .bind(filter.in_cart_of)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    pub async fn count<'e, E>(executor: E, filter: &RecipeFilter) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT COUNT(*) FROM recipes r {FILTER_CLAUSE}");

        sqlx::query_scalar::<_, i64>(&query)
            .bind(filter.author_id)
            .bind(filter.tag_slugs.as_slice())
            .bind(filter.favorited_by)
            .bind(filter.in_cart_of)
            .fetch_one(executor)
            .await
    }

    /// Tags of the given recipes, each recipe's tags ordered by name
    pub async fn tags_for<'e, E>(
        executor: E,
        recipe_ids: &[i64],
    ) -> Result<Vec<RecipeTagRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, RecipeTagRow>(
            r#"
            SELECT rt.recipe_id, t.id, t.name, t.slug
            FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = ANY($1)
            ORDER BY rt.recipe_id, t.name, t.id
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(executor)
        .await
    }

    /// Ingredient lines of the given recipes in submission order
    pub async fn ingredients_for<'e, E>(
        executor: E,
        recipe_ids: &[i64],
    ) -> Result<Vec<RecipeIngredientRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, RecipeIngredientRow>(
            r#"
            SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY ri.recipe_id, ri.id
            "#,
        )
        .bind(recipe_ids)
        .fetch_all(executor)
        .await
    }

    /// Newest recipes of each author, at most `per_author` each when given
    pub async fn summaries_by_authors<'e, E>(
        executor: E,
        author_ids: &[i64],
        per_author: Option<i64>,
    ) -> Result<Vec<AuthoredSummary>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AuthoredSummary>(
            r#"
            SELECT author_id, id, name, image, cooking_time
            FROM (
                SELECT r.author_id, r.id, r.name, r.image, r.cooking_time,
                       ROW_NUMBER() OVER (
                           PARTITION BY r.author_id
                           ORDER BY r.created_at DESC, r.id DESC
                       ) AS rn
                FROM recipes r
                WHERE r.author_id = ANY($1)
            ) ranked
            WHERE $2::BIGINT IS NULL OR rn <= $2
            ORDER BY author_id, rn
            "#,
        )
        .bind(author_ids)
        .bind(per_author)
        .fetch_all(executor)
        .await
    }

    /// Recipe count per author; authors without recipes are absent
    pub async fn counts_by_authors<'e, E>(
        executor: E,
        author_ids: &[i64],
    ) -> Result<Vec<(i64, i64)>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT author_id, COUNT(*)
            FROM recipes
            WHERE author_id = ANY($1)
            GROUP BY author_id
            "#,
        )
        .bind(author_ids)
        .fetch_all(executor)
        .await
    }
}
