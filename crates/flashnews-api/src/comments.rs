use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use flashnews_types::api::{
    Claims, CommentView, CommentsResponse, CreateCommentRequest, UserSummary,
};

use crate::auth::AppState;
use crate::authz;
use crate::error::{ApiError, ApiResult};
use crate::posts::{parse_timestamp, parse_uuid, PageQuery};

/// Comments on a post, newest first. Order is defined by server-assigned
/// timestamps, not client submission order.
pub async fn get_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    if state.db.get_post(&id)?.is_none() {
        return Err(ApiError::NotFound("Post not found".into()));
    }

    let (limit, offset) = query.limit_offset();
    let total = state.db.comments_count(&id)?;
    let rows = state.db.list_comments(&id, limit, offset)?;

    let comments = rows
        .into_iter()
        .map(|row| CommentView {
            comment_id: parse_uuid(&row.id, "comment id"),
            post_id,
            author: UserSummary {
                user_id: parse_uuid(&row.author_id, "author id"),
                username: row.author_username,
                bio: None,
                profile_picture: row.author_picture,
            },
            body: row.body,
            commented_at: parse_timestamp(&row.commented_at, &row.id),
        })
        .collect();

    Ok(Json(CommentsResponse {
        total_comments: total,
        page: query.page.max(1),
        per_page: limit,
        comments,
    }))
}

/// The response carries the server-assigned id and timestamp; optimistic
/// callers reconcile their placeholder against it.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let body = req.body.trim();
    if body.is_empty() {
        return Err(ApiError::Validation("Comment is required".into()));
    }

    let id = post_id.to_string();
    if state.db.get_post(&id)?.is_none() {
        return Err(ApiError::NotFound("Post not found".into()));
    }

    let author = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::Unauthorized)?;

    let comment_id = Uuid::new_v4();
    let now = chrono::Utc::now();

    state.db.insert_comment(
        &comment_id.to_string(),
        &id,
        &claims.sub.to_string(),
        body,
        &now.to_rfc3339(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(CommentView {
            comment_id,
            post_id,
            author: UserSummary {
                user_id: claims.sub,
                username: author.username,
                bio: author.bio,
                profile_picture: author.profile_picture,
            },
            body: body.to_string(),
            commented_at: now,
        }),
    ))
}

/// Comments are delete-only; there is no edit operation.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let comment = state
        .db
        .get_comment(&comment_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;

    if !authz::can_delete_comment(&claims.sub.to_string(), &comment) {
        return Err(ApiError::Forbidden(
            "You are not allowed to delete this comment".into(),
        ));
    }

    state.db.delete_comment(&comment.id)?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}
