/// Recipe endpoints
///
/// # Endpoints
///
/// - `GET /api/recipes/` - Paginated, filterable list
/// - `POST /api/recipes/` - Create (auth)
/// - `GET /api/recipes/:id/` - Detail
/// - `PATCH /api/recipes/:id/` - Update (author only)
/// - `DELETE /api/recipes/:id/` - Delete (author only)
/// - `POST|DELETE /api/recipes/:id/favorite/` - Favorite toggle (auth)
/// - `POST|DELETE /api/recipes/:id/shopping_cart/` - Cart toggle (auth)
/// - `GET /api/recipes/download_shopping_cart/` - Text export of the cart (auth)
/// - `GET /api/recipes/:id/get-link/` - Short link

use crate::{
    app::AppState,
    error::ApiResult,
    pagination::{parse_flag, parse_param, Page, PageRequest},
    routes::users::UserResponse,
};
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use foodgram_shared::{
    auth::middleware::AuthContext,
    models::{
        mark::MarkKind,
        recipe::{RecipeFilter, RecipeSummary},
        tag::Tag,
    },
    services::{
        associations::{AssociationSet, IngredientLine},
        marks,
        recipes::{self, RecipeDetail, RecipeInput, RecipeUpdate},
        shopping_list,
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One `{id, amount}` pair of a recipe payload
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IngredientAmountRequest {
    pub id: i64,
    pub amount: i32,
}

impl From<IngredientAmountRequest> for IngredientLine {
    fn from(req: IngredientAmountRequest) -> Self {
        IngredientLine {
            ingredient_id: req.id,
            amount: req.amount,
        }
    }
}

/// Create recipe request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecipeRequest {
    #[validate(length(min = 1, max = 256, message = "Name must be 1-256 characters"))]
    pub name: String,

    #[validate(length(min = 1, message = "Text is required"))]
    pub text: String,

    #[validate(range(min = 1, max = 32000, message = "Cooking time must be between 1 and 32000"))]
    pub cooking_time: i32,

    /// Data URL / base64 payload, or the key of an already stored image
    #[validate(length(min = 1, message = "Image is required"))]
    pub image: String,

    #[serde(default)]
    pub tags: Vec<i64>,

    #[serde(default)]
    pub ingredients: Vec<IngredientAmountRequest>,
}

/// Update recipe request; tags and ingredients are always rewritten
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRecipeRequest {
    #[validate(length(min = 1, max = 256, message = "Name must be 1-256 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "Text must not be empty"))]
    pub text: Option<String>,

    #[validate(range(min = 1, max = 32000, message = "Cooking time must be between 1 and 32000"))]
    pub cooking_time: Option<i32>,

    #[validate(length(min = 1, message = "Image must not be empty"))]
    pub image: Option<String>,

    #[serde(default)]
    pub tags: Vec<i64>,

    #[serde(default)]
    pub ingredients: Vec<IngredientAmountRequest>,
}

/// Query string of the list endpoint; numbers are parsed by hand so bad
/// values come back as field errors
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub author: Option<String>,

    /// Comma-separated tag slugs, matched with OR
    pub tags: Option<String>,

    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecipeIngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeResponse {
    pub fn from_detail(detail: RecipeDetail, state: &AppState) -> Self {
        Self {
            id: detail.recipe.id,
            tags: detail.tags,
            author: UserResponse::from_profile(detail.author, state),
            ingredients: detail
                .ingredients
                .into_iter()
                .map(|row| RecipeIngredientResponse {
                    id: row.id,
                    name: row.name,
                    measurement_unit: row.measurement_unit,
                    amount: row.amount,
                })
                .collect(),
            is_favorited: detail.is_favorited,
            is_in_shopping_cart: detail.is_in_shopping_cart,
            name: detail.recipe.name,
            image: state.media_url(&detail.recipe.image),
            text: detail.recipe.text,
            cooking_time: detail.recipe.cooking_time,
        }
    }
}

/// Compact recipe returned by the favorite/cart toggles and follow listings
#[derive(Debug, Serialize)]
pub struct RecipeSummaryResponse {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeSummaryResponse {
    pub fn from_summary(summary: RecipeSummary, state: &AppState) -> Self {
        Self {
            id: summary.id,
            image: state.media_url(&summary.image),
            name: summary.name,
            cooking_time: summary.cooking_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShortLinkResponse {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

fn associations(tags: Vec<i64>, ingredients: Vec<IngredientAmountRequest>) -> ApiResult<AssociationSet> {
    let lines = ingredients.into_iter().map(IngredientLine::from).collect();
    Ok(AssociationSet::new(tags, lines)?)
}

fn parse_tag_slugs(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// List recipes
///
/// ```text
/// GET /api/recipes/?page=1&limit=6&author=3&tags=breakfast,lunch&is_favorited=1
/// ```
///
/// The two mark filters only apply to authenticated viewers.
pub async fn list_recipes(
    State(state): State<AppState>,
    viewer: Option<AuthContext>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<RecipeListQuery>,
) -> ApiResult<Json<Page<RecipeResponse>>> {
    let page = PageRequest::from_params(
        query.page.as_deref(),
        query.limit.as_deref(),
        state.config.api.page_size,
    )?;

    let viewer_id = viewer.map(|v| v.user_id);
    let is_favorited = parse_flag("is_favorited", query.is_favorited.as_deref())?;
    let in_cart = parse_flag("is_in_shopping_cart", query.is_in_shopping_cart.as_deref())?;

    let filter = RecipeFilter {
        author_id: parse_param("author", query.author.as_deref())?,
        tag_slugs: parse_tag_slugs(query.tags.as_deref()),
        favorited_by: viewer_id.filter(|_| is_favorited),
        in_cart_of: viewer_id.filter(|_| in_cart),
    };

    let (details, count) =
        recipes::list_recipes(&state.db, viewer_id, &filter, page.limit, page.offset()).await?;

    let results = details
        .into_iter()
        .map(|d| RecipeResponse::from_detail(d, &state))
        .collect();

    Ok(Json(Page::new(
        results,
        count,
        page,
        &state.config.api.public_url,
        &uri,
    )))
}

/// Create recipe
///
/// ```text
/// POST /api/recipes/
/// Authorization: Bearer <token>
///
/// {
///   "name": "Syrniki",
///   "text": "...",
///   "cooking_time": 25,
///   "image": "data:image/png;base64,...",
///   "tags": [1, 2],
///   "ingredients": [{"id": 5, "amount": 300}]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: field or association validation failed
/// - `401 Unauthorized`: no credentials
/// - `404 Not Found`: unknown tag or ingredient
pub async fn create_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateRecipeRequest>,
) -> ApiResult<(StatusCode, Json<RecipeResponse>)> {
    req.validate()?;

    let input = RecipeInput {
        associations: associations(req.tags, req.ingredients)?,
        name: req.name,
        text: req.text,
        cooking_time: req.cooking_time,
        image: req.image,
    };

    let detail = recipes::create_recipe(&state.db, state.images.as_ref(), auth.user_id, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(RecipeResponse::from_detail(detail, &state)),
    ))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    viewer: Option<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RecipeResponse>> {
    let detail = recipes::get_recipe(&state.db, viewer.map(|v| v.user_id), id).await?;
    Ok(Json(RecipeResponse::from_detail(detail, &state)))
}

/// Update recipe
///
/// # Errors
///
/// - `400 Bad Request`: validation failed, including missing tags or ingredients
/// - `403 Forbidden`: caller is not the author
/// - `404 Not Found`: unknown recipe, tag or ingredient
pub async fn update_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRecipeRequest>,
) -> ApiResult<Json<RecipeResponse>> {
    recipes::ensure_author(&state.db, auth.user_id, id).await?;
    req.validate()?;

    let update = RecipeUpdate {
        associations: associations(req.tags, req.ingredients)?,
        name: req.name,
        text: req.text,
        cooking_time: req.cooking_time,
        image: req.image,
    };

    let detail =
        recipes::update_recipe(&state.db, state.images.as_ref(), auth.user_id, id, update).await?;

    Ok(Json(RecipeResponse::from_detail(detail, &state)))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    recipes::delete_recipe(&state.db, state.images.as_ref(), auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_mark(
    state: &AppState,
    kind: MarkKind,
    auth: AuthContext,
    recipe_id: i64,
) -> ApiResult<(StatusCode, Json<RecipeSummaryResponse>)> {
    let summary = marks::add_mark(&state.db, kind, auth.user_id, recipe_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RecipeSummaryResponse::from_summary(summary, state)),
    ))
}

async fn remove_mark(
    state: &AppState,
    kind: MarkKind,
    auth: AuthContext,
    recipe_id: i64,
) -> ApiResult<StatusCode> {
    marks::remove_mark(&state.db, kind, auth.user_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<RecipeSummaryResponse>)> {
    add_mark(&state, MarkKind::Favorite, auth, id).await
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    remove_mark(&state, MarkKind::Favorite, auth, id).await
}

pub async fn add_to_shopping_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<(StatusCode, Json<RecipeSummaryResponse>)> {
    add_mark(&state, MarkKind::ShoppingCart, auth, id).await
}

pub async fn remove_from_shopping_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    remove_mark(&state, MarkKind::ShoppingCart, auth, id).await
}

/// Shopping list export
///
/// Returns `text/plain` as an attachment named `shopping_cart.txt`.
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Response> {
    let text = shopping_list::build_shopping_list(&state.db, auth.user_id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", shopping_list::FILE_NAME),
            ),
        ],
        text,
    )
        .into_response())
}

pub async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ShortLinkResponse>> {
    let code = recipes::short_link_code(&state.db, id).await?;

    Ok(Json(ShortLinkResponse {
        short_link: format!("{}/s/{}", state.config.api.public_url, code),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodgram_shared::error::ServiceError;

    #[test]
    fn test_parse_tag_slugs() {
        assert_eq!(
            parse_tag_slugs(Some("breakfast, lunch,,")),
            vec!["breakfast", "lunch"]
        );
        assert!(parse_tag_slugs(None).is_empty());
    }

    #[test]
    fn test_create_request_validation() {
        let req: CreateRecipeRequest = serde_json::from_value(serde_json::json!({
            "name": "",
            "text": "x",
            "cooking_time": 0,
            "image": "data:image/png;base64,AAAA"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("cooking_time"));
        assert!(req.tags.is_empty());
    }

    #[test]
    fn test_missing_associations_are_field_errors() {
        let err = associations(vec![], vec![]).unwrap_err();
        match err {
            crate::error::ApiError::ValidationError(details) => {
                assert_eq!(details[0].field, "tags");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = AssociationSet::new(vec![1], vec![]).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { .. }));
    }

    #[test]
    fn test_short_link_key_name() {
        let body = serde_json::to_value(ShortLinkResponse {
            short_link: "http://x/s/abc".to_string(),
        })
        .unwrap();
        assert_eq!(body["short-link"], "http://x/s/abc");
    }
}
