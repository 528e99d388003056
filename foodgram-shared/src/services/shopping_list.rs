/// Shopping List Aggregator
///
/// Collapses every ingredient line of the recipes in a user's cart into one
/// line per ingredient with the amounts summed, then renders the plain-text
/// export. Grouping and ordering happen here rather than in SQL so the output
/// does not depend on the database collation: two calls over the same cart
/// produce identical bytes.
///
/// Format, with no separators between the fields of a line:
///
/// ```text
/// customer order
/// Ингредиенты:
/// <name><amount><measurement_unit>
/// ```

use sqlx::PgExecutor;
use std::collections::BTreeMap;

use crate::error::ServiceResult;

/// First two lines of every export
pub const HEADER: &str = "customer order\nИнгредиенты:\n";

/// Suggested download name
pub const FILE_NAME: &str = "shopping_cart.txt";

/// One ingredient line of one recipe in the cart
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CartLine {
    pub ingredient_id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// One line of the export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Groups lines by ingredient and sums amounts, ordered by name
///
/// Ingredients sharing a name but not a unit stay separate; they are ordered
/// by id among themselves.
pub fn aggregate<I>(lines: I) -> Vec<ShoppingItem>
where
    I: IntoIterator<Item = CartLine>,
{
    let mut groups: BTreeMap<(String, i64), ShoppingItem> = BTreeMap::new();

    for line in lines {
        groups
            .entry((line.name.clone(), line.ingredient_id))
            .and_modify(|item| item.amount += i64::from(line.amount))
            .or_insert_with(|| ShoppingItem {
                name: line.name,
                measurement_unit: line.measurement_unit,
                amount: i64::from(line.amount),
            });
    }

    groups.into_values().collect()
}

pub fn render(items: &[ShoppingItem]) -> String {
    let mut out = String::from(HEADER);
    for item in items {
        out.push_str(&item.name);
        out.push_str(&item.amount.to_string());
        out.push_str(&item.measurement_unit);
        out.push('\n');
    }
    out
}

async fn cart_lines<'e, E>(executor: E, user_id: i64) -> Result<Vec<CartLine>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, CartLine>(
        r#"
        SELECT i.id AS ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM shopping_carts sc
        JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

/// Builds the text export for `user_id`'s cart
pub async fn build_shopping_list<'e, E>(executor: E, user_id: i64) -> ServiceResult<String>
where
    E: PgExecutor<'e>,
{
    let lines = cart_lines(executor, user_id).await?;
    let line_count = lines.len();
    let items = aggregate(lines);

    tracing::debug!(
        user_id,
        lines = line_count,
        items = items.len(),
        "Built shopping list"
    );

    Ok(render(&items))
}
