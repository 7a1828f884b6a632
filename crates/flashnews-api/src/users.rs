use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use flashnews_types::api::{
    Claims, CurrentUserResponse, FollowListResponse, FollowResponse, ProfileResponse,
    UpdateUserRequest, UserSearchResponse, UserSummary,
};

use crate::auth::AppState;
use crate::authz;
use crate::collections::collections_for_user;
use crate::error::{ApiError, ApiResult};
use crate::posts::{build_post_views, parse_timestamp, parse_uuid};

const SEARCH_LIMIT: u32 = 20;
const PROFILE_POSTS_LIMIT: u32 = 50;

pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::Unauthorized)?;
    let tags = state.db.get_user_tags(&user.id)?;

    Ok(Json(CurrentUserResponse {
        user_id: claims.sub,
        username: user.username,
        email: user.email,
        bio: user.bio,
        tags,
        profile_picture: user.profile_picture,
        created_at: parse_timestamp(&user.created_at, &user.id),
    }))
}

/// Public profile: the user, their posts newest first, and their
/// collections (private ones only when the requester is looking at their
/// own profile).
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .get_user_by_username(&username)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let actor = claims.sub.to_string();
    let is_owner = user.id == actor;

    let rows = state
        .db
        .list_posts_by_author(&user.id, PROFILE_POSTS_LIMIT, 0)?;
    let posts = build_post_views(&state.db, &actor, rows)?;
    let collections = collections_for_user(&state.db, &user.id, is_owner)?;
    let tags = state.db.get_user_tags(&user.id)?;

    Ok(Json(ProfileResponse {
        user: UserSummary {
            user_id: parse_uuid(&user.id, "user id"),
            username: user.username,
            bio: user.bio,
            profile_picture: user.profile_picture,
        },
        is_owner,
        tags,
        posts,
        collections,
    }))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .get_user_by_username(&username)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !authz::can_touch_user(&claims.sub.to_string(), &user) {
        return Err(ApiError::Forbidden(
            "You are not allowed to update this account".into(),
        ));
    }

    state
        .db
        .update_user_profile(&user.id, req.bio.as_deref(), req.profile_picture.as_deref())?;
    if let Some(tags) = &req.tags {
        state.db.replace_user_tags(&user.id, tags)?;
    }

    Ok(Json(serde_json::json!({ "updated": true })))
}

/// Deletes the account and everything it owns; irreversible.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .get_user_by_username(&username)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !authz::can_touch_user(&claims.sub.to_string(), &user) {
        return Err(ApiError::Forbidden(
            "You are not allowed to delete this account".into(),
        ));
    }

    state.db.delete_user(&user.id)?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(UserSearchResponse { users: vec![] }));
    }

    let rows = state.db.search_users(q, SEARCH_LIMIT)?;
    let users = rows
        .into_iter()
        .map(|row| UserSummary {
            user_id: parse_uuid(&row.id, "user id"),
            username: row.username,
            bio: row.bio,
            profile_picture: row.profile_picture,
        })
        .collect();

    Ok(Json(UserSearchResponse { users }))
}

/// Idempotent: following an already-followed user is a no-op success.
/// The self-edge is always rejected.
pub async fn follow_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    if user_id == claims.sub {
        return Err(ApiError::Validation("Cannot follow yourself".into()));
    }

    let target = user_id.to_string();
    if state.db.get_user_by_id(&target)?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    state.db.insert_follow(
        &claims.sub.to_string(),
        &target,
        &chrono::Utc::now().to_rfc3339(),
    )?;

    Ok(Json(FollowResponse { following: true }))
}

/// Idempotent: unfollowing someone never followed is a no-op success.
pub async fn unfollow_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    if user_id == claims.sub {
        return Err(ApiError::Validation("Cannot unfollow yourself".into()));
    }

    state
        .db
        .delete_follow(&claims.sub.to_string(), &user_id.to_string())?;

    Ok(Json(FollowResponse { following: false }))
}

pub async fn get_followers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.db.list_followers(&claims.sub.to_string())?;
    Ok(Json(FollowListResponse {
        users: rows.into_iter().map(user_ref_to_summary).collect(),
    }))
}

pub async fn get_following(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let rows = state.db.list_following(&claims.sub.to_string())?;
    Ok(Json(FollowListResponse {
        users: rows.into_iter().map(user_ref_to_summary).collect(),
    }))
}

fn user_ref_to_summary(row: flashnews_db::models::UserRefRow) -> UserSummary {
    UserSummary {
        user_id: parse_uuid(&row.id, "user id"),
        username: row.username,
        bio: row.bio,
        profile_picture: row.profile_picture,
    }
}
