/// Short-link redirect
///
/// ```text
/// GET /s/6b86b273ff  ->  302 Location: {PUBLIC_URL}/recipes/1
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use foodgram_shared::services::recipes;

pub async fn follow_short_link(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Response> {
    let recipe_id = recipes::resolve_short_code(&state.db, &code).await?;
    let location = format!("{}/recipes/{}", state.config.api.public_url, recipe_id);

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}
