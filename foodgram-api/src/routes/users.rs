/// User profile, avatar and subscription endpoints
///
/// Account registration and login belong to the identity provider; these
/// routes only read profiles and manage avatars and follows.

use crate::{
    app::AppState,
    error::ApiResult,
    pagination::{parse_param, Page, PageRequest},
    routes::recipes::RecipeSummaryResponse,
};
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    Json,
};
use foodgram_shared::{
    auth::middleware::AuthContext,
    models::user::UserProfile,
    services::{
        follows::{self, FollowedAuthor},
        users,
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserResponse {
    pub fn from_profile(profile: UserProfile, state: &AppState) -> Self {
        Self {
            id: profile.id,
            avatar: profile.avatar.as_deref().map(|key| state.media_url(key)),
            username: profile.username,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            is_subscribed: profile.is_subscribed,
        }
    }
}

/// A followed author with a preview of their recipes
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<RecipeSummaryResponse>,
    pub recipes_count: i64,
}

impl SubscriptionResponse {
    fn from_author(author: FollowedAuthor, state: &AppState) -> Self {
        Self {
            user: UserResponse::from_profile(author.profile, state),
            recipes: author
                .recipes
                .into_iter()
                .map(|r| RecipeSummaryResponse::from_summary(r, state))
                .collect(),
            recipes_count: author.recipes_count,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AvatarRequest {
    /// Data URL / base64 payload
    #[validate(length(min = 1, message = "Avatar is required"))]
    pub avatar: String,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipesLimitQuery {
    pub recipes_limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub recipes_limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// All users, paginated, ordered by username
///
/// ```text
/// GET /api/users/?page=1&limit=6
/// ```
pub async fn list_users(
    State(state): State<AppState>,
    viewer: Option<AuthContext>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Json<Page<UserResponse>>> {
    let page = PageRequest::from_params(
        query.page.as_deref(),
        query.limit.as_deref(),
        state.config.api.page_size,
    )?;

    let (profiles, count) = users::list_users(
        &state.db,
        viewer.map(|v| v.user_id),
        page.limit,
        page.offset(),
    )
    .await?;

    let results = profiles
        .into_iter()
        .map(|p| UserResponse::from_profile(p, &state))
        .collect();

    Ok(Json(Page::new(
        results,
        count,
        page,
        &state.config.api.public_url,
        &uri,
    )))
}

/// Current user's profile
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<UserResponse>> {
    let profile = users::get_profile(&state.db, Some(auth.user_id), auth.user_id).await?;
    Ok(Json(UserResponse::from_profile(profile, &state)))
}

pub async fn get_user(
    State(state): State<AppState>,
    viewer: Option<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserResponse>> {
    let profile = users::get_profile(&state.db, viewer.map(|v| v.user_id), id).await?;
    Ok(Json(UserResponse::from_profile(profile, &state)))
}

/// Upload avatar
///
/// ```text
/// PUT /api/users/me/avatar/
/// Authorization: Bearer <token>
///
/// {"avatar": "data:image/png;base64,..."}
/// ```
pub async fn set_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<AvatarRequest>,
) -> ApiResult<Json<AvatarResponse>> {
    req.validate()?;

    let key = users::set_avatar(&state.db, state.images.as_ref(), auth.user_id, &req.avatar).await?;

    Ok(Json(AvatarResponse {
        avatar: state.media_url(&key),
    }))
}

pub async fn remove_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<StatusCode> {
    users::remove_avatar(&state.db, state.images.as_ref(), auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Follow an author
///
/// # Errors
///
/// - `400 Bad Request`: following oneself, or a non-positive `recipes_limit`
/// - `404 Not Found`: unknown user
/// - `409 Conflict`: already following
pub async fn subscribe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
    Query(query): Query<RecipesLimitQuery>,
) -> ApiResult<(StatusCode, Json<SubscriptionResponse>)> {
    let recipes_limit = parse_param("recipes_limit", query.recipes_limit.as_deref())?;
    let author = follows::follow(&state.db, auth.user_id, id, recipes_limit).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse::from_author(author, &state)),
    ))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    follows::unfollow(&state.db, auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Authors the caller follows, paginated, ordered by username
pub async fn subscriptions(
    State(state): State<AppState>,
    auth: AuthContext,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<SubscriptionsQuery>,
) -> ApiResult<Json<Page<SubscriptionResponse>>> {
    let page = PageRequest::from_params(
        query.page.as_deref(),
        query.limit.as_deref(),
        state.config.api.page_size,
    )?;
    let recipes_limit = parse_param("recipes_limit", query.recipes_limit.as_deref())?;

    let (authors, count) = follows::subscriptions(
        &state.db,
        auth.user_id,
        page.limit,
        page.offset(),
        recipes_limit,
    )
    .await?;

    let results = authors
        .into_iter()
        .map(|a| SubscriptionResponse::from_author(a, &state))
        .collect();

    Ok(Json(Page::new(
        results,
        count,
        page,
        &state.config.api.public_url,
        &uri,
    )))
}
