use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use flashnews_db::models::PostDetailRow;
use flashnews_db::Database;
use flashnews_types::api::{
    ArticleView, CategoriesResponse, Claims, CreatePostRequest, FeedResponse, PostView,
    UpdatePostRequest, UserSummary,
};
use flashnews_types::models::Category;

use crate::auth::AppState;
use crate::authz;
use crate::error::{ApiError, ApiResult};

const MAX_CATEGORIES: usize = 5;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

impl PageQuery {
    pub(crate) fn limit_offset(&self) -> (u32, u32) {
        let page = self.page.max(1);
        let per_page = self.per_page.clamp(1, 100);
        (per_page, (page - 1) * per_page)
    }
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let description = req.description.trim();
    if description.is_empty() {
        return Err(ApiError::Validation("Post description is required".into()));
    }
    let link = req.article.link.trim();
    if link.is_empty() || !(link.starts_with("http://") || link.starts_with("https://")) {
        return Err(ApiError::Validation("Article link is required".into()));
    }
    let categories = parse_categories(&req.categories)?;

    let article = state.db.get_or_create_article(
        &Uuid::new_v4().to_string(),
        link,
        req.article.title.as_deref(),
        req.article.source.as_deref(),
        req.article.caption.as_deref(),
        req.article.preview.as_deref(),
    )?;

    let post_id = Uuid::new_v4();
    let now = chrono::Utc::now();

    state.db.insert_post(
        &post_id.to_string(),
        &claims.sub.to_string(),
        &article.id,
        description,
        &now.to_rfc3339(),
    )?;
    if !categories.is_empty() {
        state
            .db
            .replace_post_categories(&post_id.to_string(), &categories)?;
    }

    let author = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::Unauthorized)?;

    // A brand-new post has no likes or comments yet.
    Ok((
        StatusCode::CREATED,
        Json(PostView {
            post_id,
            author: UserSummary {
                user_id: claims.sub,
                username: author.username,
                bio: author.bio,
                profile_picture: author.profile_picture,
            },
            description: description.to_string(),
            posted_at: now,
            article: ArticleView {
                article_id: parse_uuid(&article.id, "article id"),
                link: article.link,
                title: article.title,
                source: article.source,
                caption: article.caption,
                preview: article.preview,
            },
            categories,
            likes_count: 0,
            comments_count: 0,
            is_liked: false,
        }),
    ))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db
        .get_post_detail(&post_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    let view = build_post_views(&state.db, &claims.sub.to_string(), vec![row])?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("post view assembly dropped the row"))?;

    Ok(Json(view))
}

/// Every post, newest first, annotated for the requesting user.
pub async fn get_feed(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let (limit, offset) = query.limit_offset();
    let page = query.page.max(1);
    let actor = claims.sub.to_string();

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let (total, views) = tokio::task::spawn_blocking(move || {
        let total = db.db.count_posts()?;
        let rows = db.db.list_feed(limit, offset)?;
        let views = build_post_views(&db.db, &actor, rows)?;
        Ok::<_, ApiError>((total, views))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("join error: {}", e))
    })??;

    Ok(Json(FeedResponse {
        total_posts: total,
        page,
        per_page: limit,
        posts: views,
    }))
}

/// Posts authored by one user, newest first.
pub async fn get_user_posts(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let author = user_id.to_string();
    if state.db.get_user_by_id(&author)?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    let (limit, offset) = query.limit_offset();
    let total = state.db.count_posts_by_author(&author)?;
    let rows = state.db.list_posts_by_author(&author, limit, offset)?;
    let views = build_post_views(&state.db, &claims.sub.to_string(), rows)?;

    Ok(Json(FeedResponse {
        total_posts: total,
        page: query.page.max(1),
        per_page: limit,
        posts: views,
    }))
}

/// Articles are immutable once posted; only the description and categories
/// of the post itself may change.
pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    let post = state
        .db
        .get_post(&id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    if !authz::can_mutate_post(&claims.sub.to_string(), &post) {
        return Err(ApiError::Forbidden(
            "You are not allowed to update this post".into(),
        ));
    }

    if let Some(description) = &req.description {
        let description = description.trim();
        if description.is_empty() {
            return Err(ApiError::Validation("Post description is required".into()));
        }
        state.db.update_post_description(&id, description)?;
    }

    if let Some(categories) = &req.categories {
        let categories = parse_categories(categories)?;
        state.db.replace_post_categories(&id, &categories)?;
    }

    let row = state
        .db
        .get_post_detail(&id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;
    let view = build_post_views(&state.db, &claims.sub.to_string(), vec![row])?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("post view assembly dropped the row"))?;

    Ok(Json(view))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let id = post_id.to_string();
    let post = state
        .db
        .get_post(&id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    if !authz::can_mutate_post(&claims.sub.to_string(), &post) {
        return Err(ApiError::Forbidden(
            "You are not allowed to delete this post".into(),
        ));
    }

    state.db.delete_post(&id)?;

    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn get_categories() -> impl IntoResponse {
    Json(CategoriesResponse {
        categories: Category::ALL.iter().map(|c| c.to_string()).collect(),
    })
}

/// Validate category names against the vocabulary; canonical casing out.
fn parse_categories(names: &[String]) -> Result<Vec<String>, ApiError> {
    if names.len() > MAX_CATEGORIES {
        return Err(ApiError::Validation(format!(
            "Maximum of {} categories allowed",
            MAX_CATEGORIES
        )));
    }
    let mut canonical = Vec::with_capacity(names.len());
    for name in names {
        let category: Category = name
            .parse()
            .map_err(|_| ApiError::Validation(format!("Unknown category: {}", name)))?;
        let s = category.as_str().to_string();
        if !canonical.contains(&s) {
            canonical.push(s);
        }
    }
    Ok(canonical)
}

/// Assemble post rows into actor-specific views. Counts are computed from
/// the underlying rows and batch-fetched to avoid per-post queries.
pub(crate) fn build_post_views(
    db: &Database,
    actor_id: &str,
    rows: Vec<PostDetailRow>,
) -> anyhow::Result<Vec<PostView>> {
    let post_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

    let mut category_map: HashMap<String, Vec<String>> = HashMap::new();
    for (post_id, category) in db.categories_for_posts(&post_ids)? {
        category_map.entry(post_id).or_default().push(category);
    }
    let likes_map: HashMap<String, i64> = db.likes_count_for_posts(&post_ids)?.into_iter().collect();
    let comments_map: HashMap<String, i64> =
        db.comments_count_for_posts(&post_ids)?.into_iter().collect();
    let liked_set: HashSet<String> = db.liked_post_ids(actor_id, &post_ids)?.into_iter().collect();

    let views = rows
        .into_iter()
        .map(|row| {
            let categories = category_map.remove(&row.id).unwrap_or_default();
            let likes_count = likes_map.get(&row.id).copied().unwrap_or(0);
            let comments_count = comments_map.get(&row.id).copied().unwrap_or(0);
            let is_liked = liked_set.contains(&row.id);

            PostView {
                post_id: parse_uuid(&row.id, "post id"),
                author: UserSummary {
                    user_id: parse_uuid(&row.author_id, "author id"),
                    username: row.author_username,
                    bio: row.author_bio,
                    profile_picture: row.author_picture,
                },
                description: row.description,
                posted_at: parse_timestamp(&row.posted_at, &row.id),
                article: ArticleView {
                    article_id: parse_uuid(&row.article.id, "article id"),
                    link: row.article.link,
                    title: row.article.title,
                    source: row.article.source,
                    caption: row.article.caption,
                    preview: row.article.preview,
                },
                categories,
                likes_count,
                comments_count,
                is_liked,
            }
        })
        .collect();

    Ok(views)
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, value, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(value: &str, row_id: &str) -> chrono::DateTime<chrono::Utc> {
    value
        .parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite-style "YYYY-MM-DD HH:MM:SS" without timezone: treat as UTC.
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on row '{}': {}", value, row_id, e);
            chrono::DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps_bounds() {
        let q = PageQuery { page: 0, per_page: 500 };
        assert_eq!(q.limit_offset(), (100, 0));
        let q = PageQuery { page: 3, per_page: 10 };
        assert_eq!(q.limit_offset(), (10, 20));
    }

    #[test]
    fn categories_are_canonicalized_and_bounded() {
        let parsed = parse_categories(&["tech".into(), "TECH".into(), "science".into()]).unwrap();
        assert_eq!(parsed, vec!["Tech".to_string(), "Science".to_string()]);

        let unknown = parse_categories(&["Gossip".into()]);
        assert!(matches!(unknown, Err(ApiError::Validation(_))));

        let too_many: Vec<String> = Category::ALL.iter().map(|c| c.to_string()).collect();
        assert!(matches!(
            parse_categories(&too_many),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn timestamp_parsing_accepts_sqlite_format() {
        let ts = parse_timestamp("2026-08-01 10:00:00", "p1");
        assert_eq!(ts.to_rfc3339(), "2026-08-01T10:00:00+00:00");
    }
}
