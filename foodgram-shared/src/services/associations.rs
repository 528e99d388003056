/// Association Rewriter
///
/// Replaces a recipe's tags and ingredient lines with a new set. Input is
/// checked up front by [`AssociationSet::new`], so no write happens for a bad
/// request. The rewrite itself runs in its own transaction (a savepoint when
/// the caller already holds one) after locking the recipe row: concurrent
/// rewrites of the same recipe serialize, and readers only ever see the old
/// or the new set, never an empty one.
///
/// # Example
///
/// ```no_run
/// use foodgram_shared::services::associations::{replace_associations, AssociationSet, IngredientLine};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, recipe_id: i64) -> Result<(), Box<dyn std::error::Error>> {
/// let set = AssociationSet::new(
///     vec![1, 2],
///     vec![IngredientLine { ingredient_id: 7, amount: 250 }],
/// )?;
///
/// let mut tx = pool.begin().await?;
/// replace_associations(&mut tx, recipe_id, &set).await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgConnection};
use std::collections::HashSet;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{ingredient::Ingredient, recipe::Recipe, tag::Tag};

pub const MIN_AMOUNT: i32 = 1;
pub const MAX_AMOUNT: i32 = 32_000;

/// One `(ingredient, amount)` pair of a recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub ingredient_id: i64,
    pub amount: i32,
}

/// A validated set of associations
///
/// Tags are unique and non-empty; ingredient lines are non-empty, unique by
/// ingredient and keep their submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationSet {
    tag_ids: Vec<i64>,
    lines: Vec<IngredientLine>,
}

impl AssociationSet {
    pub fn new(tag_ids: Vec<i64>, lines: Vec<IngredientLine>) -> ServiceResult<Self> {
        if tag_ids.is_empty() {
            return Err(ServiceError::validation("tags", "At least one tag is required"));
        }

        let mut seen = HashSet::with_capacity(tag_ids.len());
        if let Some(dup) = tag_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(ServiceError::validation(
                "tags",
                format!("Duplicate tag {dup}"),
            ));
        }

        if lines.is_empty() {
            return Err(ServiceError::validation(
                "ingredients",
                "At least one ingredient is required",
            ));
        }

        let mut seen = HashSet::with_capacity(lines.len());
        for line in &lines {
            if !seen.insert(line.ingredient_id) {
                return Err(ServiceError::validation(
                    "ingredients",
                    format!("Duplicate ingredient {}", line.ingredient_id),
                ));
            }

            if line.amount < MIN_AMOUNT {
                return Err(ServiceError::validation(
                    "ingredients",
                    format!("Amount must be at least {MIN_AMOUNT}"),
                ));
            }

            if line.amount > MAX_AMOUNT {
                return Err(ServiceError::validation(
                    "ingredients",
                    format!("Amount must be at most {MAX_AMOUNT}"),
                ));
            }
        }

        Ok(Self { tag_ids, lines })
    }

    pub fn tag_ids(&self) -> &[i64] {
        &self.tag_ids
    }

    pub fn lines(&self) -> &[IngredientLine] {
        &self.lines
    }
}

/// Atomically swaps the recipe's associations for `set`
///
/// # Errors
///
/// - `NotFound` when the recipe, a tag or an ingredient does not exist
/// - `Database` when the transaction cannot commit; nothing is changed
pub async fn replace_associations(
    conn: &mut PgConnection,
    recipe_id: i64,
    set: &AssociationSet,
) -> ServiceResult<()> {
    let mut tx = conn.begin().await?;

    if Recipe::find_for_update(&mut *tx, recipe_id).await?.is_none() {
        return Err(ServiceError::not_found(format!("Recipe {recipe_id} not found")));
    }

    let found: HashSet<i64> = Tag::existing_ids(&mut *tx, &set.tag_ids)
        .await?
        .into_iter()
        .collect();
    if let Some(missing) = set.tag_ids.iter().find(|id| !found.contains(id)) {
        return Err(ServiceError::not_found(format!("Tag {missing} not found")));
    }

    let ingredient_ids: Vec<i64> = set.lines.iter().map(|l| l.ingredient_id).collect();
    let found: HashSet<i64> = Ingredient::existing_ids(&mut *tx, &ingredient_ids)
        .await?
        .into_iter()
        .collect();
    if let Some(missing) = ingredient_ids.iter().find(|id| !found.contains(id)) {
        return Err(ServiceError::not_found(format!(
            "Ingredient {missing} not found"
        )));
    }

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, tag_id FROM UNNEST($2::BIGINT[]) AS t(tag_id)
        "#,
    )
    .bind(recipe_id)
    .bind(&set.tag_ids)
    .execute(&mut *tx)
    .await?;

    let amounts: Vec<i32> = set.lines.iter().map(|l| l.amount).collect();
    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, l.ingredient_id, l.amount
        FROM UNNEST($2::BIGINT[], $3::INTEGER[]) WITH ORDINALITY AS l(ingredient_id, amount, ord)
        ORDER BY l.ord
        "#,
    )
    .bind(recipe_id)
    .bind(&ingredient_ids)
    .bind(&amounts)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!(
        recipe_id,
        tags = set.tag_ids.len(),
        ingredients = set.lines.len(),
        "Replaced recipe associations"
    );

    Ok(())
}
