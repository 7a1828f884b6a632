use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use flashnews_db::models::CollectionRow;
use flashnews_db::Database;
use flashnews_types::api::{
    Claims, CollectionPostEntry, CollectionPostsResponse, CollectionView,
    CreateCollectionRequest, UpdateCollectionRequest, UserCollectionsResponse,
};

use crate::auth::AppState;
use crate::authz;
use crate::error::{ApiError, ApiResult};
use crate::posts::{build_post_views, parse_timestamp, parse_uuid};

pub async fn create_collection(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCollectionRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("Collection title is required".into()));
    }
    let emoji = req.emoji.trim();
    if emoji.is_empty() {
        return Err(ApiError::Validation("Collection emoji is required".into()));
    }

    let collection_id = Uuid::new_v4();
    let now = chrono::Utc::now();

    let inserted = state.db.insert_collection(
        &collection_id.to_string(),
        &claims.sub.to_string(),
        title,
        emoji,
        req.description.trim(),
        req.is_public,
        &now.to_rfc3339(),
    )?;
    if !inserted {
        return Err(ApiError::Validation(
            "A collection with this title already exists".into(),
        ));
    }

    Ok((
        StatusCode::CREATED,
        Json(CollectionView {
            collection_id,
            owner_id: claims.sub,
            title: title.to_string(),
            emoji: emoji.to_string(),
            description: req.description.trim().to_string(),
            is_public: req.is_public,
            created_at: now,
            articles_count: 0,
        }),
    ))
}

/// A user's collections, split public/private. The private half is present
/// only when the requester is the owner.
pub async fn get_user_collections(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let owner = user_id.to_string();
    if state.db.get_user_by_id(&owner)?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let response = collections_for_user(&state.db, &owner, claims.sub == user_id)?;
    Ok(Json(response))
}

pub(crate) fn collections_for_user(
    db: &Database,
    owner_id: &str,
    is_owner: bool,
) -> anyhow::Result<UserCollectionsResponse> {
    let public = build_collection_views(db, db.list_collections_by_owner(owner_id, true)?)?;
    let private = if is_owner {
        Some(build_collection_views(
            db,
            db.list_collections_by_owner(owner_id, false)?,
        )?)
    } else {
        None
    };
    Ok(UserCollectionsResponse { public, private })
}

/// Detail view: the collection plus its member posts, newest first, the
/// most recent flagged as featured. A private collection is reported as
/// not found to anyone but its owner, so its existence never leaks.
pub async fn get_collection_posts(
    State(state): State<AppState>,
    Path(collection_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let id = collection_id.to_string();
    let actor = claims.sub.to_string();

    let collection = state
        .db
        .get_collection(&id)?
        .filter(|c| authz::can_view_collection(&actor, c))
        .ok_or_else(|| ApiError::NotFound("Collection not found".into()))?;

    let rows = state.db.list_posts_in_collection(&id)?;
    let views = build_post_views(&state.db, &actor, rows)?;

    let collection_view = build_collection_views(&state.db, vec![collection])?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("collection view assembly dropped the row"))?;

    let posts = views
        .into_iter()
        .enumerate()
        .map(|(i, post)| CollectionPostEntry {
            post,
            featured: i == 0,
        })
        .collect();

    Ok(Json(CollectionPostsResponse {
        collection: collection_view,
        posts,
    }))
}

pub async fn update_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateCollectionRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = collection_id.to_string();
    let collection = state
        .db
        .get_collection(&id)?
        .ok_or_else(|| ApiError::NotFound("Collection not found".into()))?;

    if !authz::can_mutate_collection(&claims.sub.to_string(), &collection) {
        return Err(ApiError::Forbidden(
            "You are not allowed to update this collection".into(),
        ));
    }

    if let Some(title) = &req.title {
        if title.trim().is_empty() {
            return Err(ApiError::Validation("Collection title is required".into()));
        }
    }
    if let Some(emoji) = &req.emoji {
        if emoji.trim().is_empty() {
            return Err(ApiError::Validation("Collection emoji is required".into()));
        }
    }

    let updated = state.db.update_collection(
        &id,
        req.title.as_deref().map(str::trim),
        req.emoji.as_deref().map(str::trim),
        req.description.as_deref(),
        req.is_public,
    )?;
    if !updated {
        return Err(ApiError::Validation(
            "A collection with this title already exists".into(),
        ));
    }

    let row = state
        .db
        .get_collection(&id)?
        .ok_or_else(|| ApiError::NotFound("Collection not found".into()))?;
    let view = build_collection_views(&state.db, vec![row])?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("collection view assembly dropped the row"))?;

    Ok(Json(view))
}

/// Removes the collection and its memberships; the member posts survive.
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let id = collection_id.to_string();
    let collection = state
        .db
        .get_collection(&id)?
        .ok_or_else(|| ApiError::NotFound("Collection not found".into()))?;

    if !authz::can_mutate_collection(&claims.sub.to_string(), &collection) {
        return Err(ApiError::Forbidden(
            "You are not allowed to delete this collection".into(),
        ));
    }

    state.db.delete_collection(&id)?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// A duplicate membership answers 409 so the caller can show
/// "already saved" instead of "saved".
pub async fn add_post_to_collection(
    State(state): State<AppState>,
    Path((collection_id, post_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let cid = collection_id.to_string();
    let collection = state
        .db
        .get_collection(&cid)?
        .ok_or_else(|| ApiError::NotFound("Collection not found".into()))?;

    if !authz::can_mutate_collection(&claims.sub.to_string(), &collection) {
        return Err(ApiError::Forbidden(
            "You are not allowed to modify this collection".into(),
        ));
    }

    let pid = post_id.to_string();
    if state.db.get_post(&pid)?.is_none() {
        return Err(ApiError::NotFound("Post not found".into()));
    }

    let added = state
        .db
        .add_collection_post(&cid, &pid, &chrono::Utc::now().to_rfc3339())?;
    if !added {
        return Err(ApiError::Conflict("Post already in collection".into()));
    }

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "added": true }))))
}

pub async fn remove_post_from_collection(
    State(state): State<AppState>,
    Path((collection_id, post_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let cid = collection_id.to_string();
    let collection = state
        .db
        .get_collection(&cid)?
        .ok_or_else(|| ApiError::NotFound("Collection not found".into()))?;

    if !authz::can_mutate_collection(&claims.sub.to_string(), &collection) {
        return Err(ApiError::Forbidden(
            "You are not allowed to modify this collection".into(),
        ));
    }

    let removed = state
        .db
        .remove_collection_post(&cid, &post_id.to_string())?;
    if !removed {
        return Err(ApiError::NotFound("Post not in collection".into()));
    }

    Ok(Json(serde_json::json!({ "removed": true })))
}

pub(crate) fn build_collection_views(
    db: &Database,
    rows: Vec<CollectionRow>,
) -> anyhow::Result<Vec<CollectionView>> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let counts: HashMap<String, i64> =
        db.articles_count_for_collections(&ids)?.into_iter().collect();

    let views = rows
        .into_iter()
        .map(|row| CollectionView {
            collection_id: parse_uuid(&row.id, "collection id"),
            owner_id: parse_uuid(&row.owner_id, "owner id"),
            title: row.title,
            emoji: row.emoji,
            description: row.description,
            is_public: row.is_public,
            created_at: parse_timestamp(&row.created_at, &row.id),
            articles_count: counts.get(&row.id).copied().unwrap_or(0),
        })
        .collect();

    Ok(views)
}
