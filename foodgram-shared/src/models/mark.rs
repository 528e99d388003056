/// Favorites and shopping-cart membership
///
/// Both are (user, recipe) pairs with identical behaviour and differ only in
/// their table, so one set of queries serves both through [`MarkKind`].

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkKind {
    Favorite,
    ShoppingCart,
}

impl MarkKind {
    fn table(self) -> &'static str {
        match self {
            MarkKind::Favorite => "favorites",
            MarkKind::ShoppingCart => "shopping_carts",
        }
    }

    /// Human name used in error messages
    pub fn label(self) -> &'static str {
        match self {
            MarkKind::Favorite => "favorites",
            MarkKind::ShoppingCart => "shopping cart",
        }
    }
}

/// Inserts the mark; false when the pair already existed
pub async fn add<'e, E>(
    executor: E,
    kind: MarkKind,
    user_id: i64,
    recipe_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let query = format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) \
         ON CONFLICT (user_id, recipe_id) DO NOTHING",
        kind.table()
    );

    let result = sqlx::query(&query)
        .bind(user_id)
        .bind(recipe_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Deletes the mark; false when it did not exist
pub async fn remove<'e, E>(
    executor: E,
    kind: MarkKind,
    user_id: i64,
    recipe_id: i64,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let query = format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        kind.table()
    );

    let result = sqlx::query(&query)
        .bind(user_id)
        .bind(recipe_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Which of `recipe_ids` the user has marked
pub async fn marked_among<'e, E>(
    executor: E,
    kind: MarkKind,
    user_id: i64,
    recipe_ids: &[i64],
) -> Result<Vec<i64>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let query = format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
        kind.table()
    );

    sqlx::query_scalar::<_, i64>(&query)
        .bind(user_id)
        .bind(recipe_ids)
        .fetch_all(executor)
        .await
}
