use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use flashnews_types::api::{Claims, LikeResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

/// Idempotent: liking an already-liked post is a no-op success. The count
/// in the response is computed from the like rows.
pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    toggle(&state, &claims, post_id, true).await
}

/// Idempotent: unliking a never-liked post is a no-op success.
pub async fn unlike_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    toggle(&state, &claims, post_id, false).await
}

async fn toggle(
    state: &AppState,
    claims: &Claims,
    post_id: Uuid,
    desired: bool,
) -> ApiResult<Json<LikeResponse>> {
    let id = post_id.to_string();
    if state.db.get_post(&id)?.is_none() {
        return Err(ApiError::NotFound("Post not found".into()));
    }

    let user = claims.sub.to_string();
    if desired {
        state
            .db
            .insert_like(&user, &id, &chrono::Utc::now().to_rfc3339())?;
    } else {
        state.db.delete_like(&user, &id)?;
    }

    Ok(Json(LikeResponse {
        liked: desired,
        likes_count: state.db.likes_count(&id)?,
    }))
}
