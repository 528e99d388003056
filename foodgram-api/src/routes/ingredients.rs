/// Ingredient endpoints (read-only, unauthenticated)
///
/// ```text
/// GET /api/ingredients/?name=сах
/// ```
///
/// `name` is a case-insensitive prefix; `%` and `_` match literally.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use foodgram_shared::models::ingredient::Ingredient;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> ApiResult<Json<Vec<Ingredient>>> {
    let prefix = query.name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(Json(Ingredient::search(&state.db, prefix).await?))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Ingredient>> {
    Ingredient::find_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Ingredient {} not found", id)))
}
