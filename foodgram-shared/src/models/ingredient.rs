/// Ingredient reference data
///
/// An ingredient is a (name, measurement_unit) pair, unique as a pair. The
/// listing endpoint searches by case-insensitive name prefix.

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

/// Escapes LIKE metacharacters so the input matches literally
///
/// Pairs with `ESCAPE '\'` in the query.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Ingredient {
    pub async fn create<'e, E>(
        executor: E,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            RETURNING id, name, measurement_unit
            "#,
        )
        .bind(name)
        .bind(measurement_unit)
        .fetch_one(executor)
        .await
    }

    /// Ingredients whose name starts with `prefix` (any case), ordered by name
    ///
    /// `None` or an empty prefix lists everything.
    pub async fn search<'e, E>(executor: E, prefix: Option<&str>) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let pattern = format!("{}%", escape_like(prefix.unwrap_or_default().trim()));

        sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, measurement_unit
            FROM ingredients
            WHERE LOWER(name) LIKE LOWER($1) ESCAPE '\'
            ORDER BY name, id
            "#,
        )
        .bind(pattern)
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Ingredient>(
            "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Returns the subset of `ids` that exist
    pub async fn existing_ids<'e, E>(executor: E, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i64>("SELECT id FROM ingredients WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await
    }
}
