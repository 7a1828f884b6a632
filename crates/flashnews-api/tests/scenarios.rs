//! End-to-end walks through the mutation and view handlers, driven without
//! HTTP: axum handlers are plain async functions, so they are called here
//! with constructed extractors against an in-memory database.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use uuid::Uuid;

use flashnews_api::auth::{AppState, AppStateInner};
use flashnews_api::error::ApiError;
use flashnews_api::{collections, comments, likes, posts, users};
use flashnews_db::Database;
use flashnews_types::api::{
    ArticleRef, Claims, CreateCollectionRequest, CreateCommentRequest, CreatePostRequest,
    TokenKind, UpdatePostRequest,
};

fn state() -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: "test-secret".into(),
    })
}

fn claims_for(state: &AppState, username: &str) -> Claims {
    let id = Uuid::new_v4();
    state
        .db
        .create_user(
            &id.to_string(),
            username,
            &format!("{username}@example.com"),
            "hash",
            "2026-08-01T10:00:00+00:00",
        )
        .unwrap();
    Claims {
        sub: id,
        username: username.to_string(),
        exp: 4_102_444_800, // far future
        typ: TokenKind::Access,
    }
}

async fn share_article(state: &AppState, author: &Claims, link: &str) -> Uuid {
    let response = posts::create_post(
        State(state.clone()),
        Extension(author.clone()),
        Json(CreatePostRequest {
            article: ArticleRef {
                link: link.to_string(),
                title: Some("Title".into()),
                source: None,
                caption: None,
                preview: None,
            },
            description: "worth a read".into(),
            categories: vec!["Tech".into()],
        }),
    )
    .await;
    assert!(response.is_ok());

    // The freshly created post is the newest one the author has.
    let rows = state
        .db
        .list_posts_by_author(&author.sub.to_string(), 1, 0)
        .unwrap();
    rows[0].id.parse().unwrap()
}

#[tokio::test]
async fn private_collection_is_invisible_to_others() {
    let state = state();
    let alice = claims_for(&state, "alice");
    let bob = claims_for(&state, "bob");

    let created = collections::create_collection(
        State(state.clone()),
        Extension(alice.clone()),
        Json(CreateCollectionRequest {
            title: "Tech".into(),
            emoji: "💻".into(),
            description: String::new(),
            is_public: false,
        }),
    )
    .await;
    assert!(created.is_ok());

    let collection_id = state
        .db
        .list_collections_by_owner(&alice.sub.to_string(), false)
        .unwrap()[0]
        .id
        .parse()
        .unwrap();

    // Bob gets not-found, never a permission hint.
    let denied = collections::get_collection_posts(
        State(state.clone()),
        Path(collection_id),
        Extension(bob),
    )
    .await;
    assert!(matches!(denied, Err(ApiError::NotFound(_))));

    // The owner sees it, empty.
    let allowed = collections::get_collection_posts(
        State(state.clone()),
        Path(collection_id),
        Extension(alice),
    )
    .await;
    match allowed {
        Ok(resp) => assert_eq!(resp.into_response().status(), StatusCode::OK),
        Err(e) => panic!("owner denied: {e}"),
    }
}

#[tokio::test]
async fn like_unlike_round_trip_restores_initial_state() {
    let state = state();
    let alice = claims_for(&state, "alice");
    let bob = claims_for(&state, "bob");

    let post_id = share_article(&state, &alice, "https://example.com/x").await;
    let pid = post_id.to_string();
    assert_eq!(state.db.likes_count(&pid).unwrap(), 0);

    likes::like_post(State(state.clone()), Path(post_id), Extension(bob.clone()))
        .await
        .unwrap();
    assert_eq!(state.db.likes_count(&pid).unwrap(), 1);

    // A repeated like is a no-op success.
    likes::like_post(State(state.clone()), Path(post_id), Extension(bob.clone()))
        .await
        .unwrap();
    assert_eq!(state.db.likes_count(&pid).unwrap(), 1);

    likes::unlike_post(State(state.clone()), Path(post_id), Extension(bob.clone()))
        .await
        .unwrap();
    assert_eq!(state.db.likes_count(&pid).unwrap(), 0);

    // Unliking again is also a no-op success.
    likes::unlike_post(State(state.clone()), Path(post_id), Extension(bob))
        .await
        .unwrap();
    assert_eq!(state.db.likes_count(&pid).unwrap(), 0);
}

#[tokio::test]
async fn deleting_a_post_takes_comments_and_memberships_with_it() {
    let state = state();
    let alice = claims_for(&state, "alice");
    let bob = claims_for(&state, "bob");

    let post_id = share_article(&state, &alice, "https://example.com/x").await;
    let pid = post_id.to_string();

    for body in ["first", "second", "third"] {
        comments::create_comment(
            State(state.clone()),
            Path(post_id),
            Extension(bob.clone()),
            Json(CreateCommentRequest { body: body.into() }),
        )
        .await
        .unwrap();
    }

    for title in ["Saved", "Later"] {
        collections::create_collection(
            State(state.clone()),
            Extension(bob.clone()),
            Json(CreateCollectionRequest {
                title: title.into(),
                emoji: "📁".into(),
                description: String::new(),
                is_public: true,
            }),
        )
        .await
        .unwrap();
    }
    let bobs_collections = state
        .db
        .list_collections_by_owner(&bob.sub.to_string(), true)
        .unwrap();
    for c in &bobs_collections {
        let cid: Uuid = c.id.parse().unwrap();
        collections::add_post_to_collection(
            State(state.clone()),
            Path((cid, post_id)),
            Extension(bob.clone()),
        )
        .await
        .unwrap();
    }

    // Only the author may delete.
    let denied =
        posts::delete_post(State(state.clone()), Path(post_id), Extension(bob.clone())).await;
    assert!(matches!(denied, Err(ApiError::Forbidden(_))));

    posts::delete_post(State(state.clone()), Path(post_id), Extension(alice.clone()))
        .await
        .unwrap();

    let gone = posts::get_post(State(state.clone()), Path(post_id), Extension(alice)).await;
    assert!(matches!(gone, Err(ApiError::NotFound(_))));
    assert_eq!(state.db.comments_count(&pid).unwrap(), 0);
    for c in &bobs_collections {
        assert!(state.db.list_posts_in_collection(&c.id).unwrap().is_empty());
    }
}

#[tokio::test]
async fn duplicate_membership_answers_conflict() {
    let state = state();
    let alice = claims_for(&state, "alice");

    let post_id = share_article(&state, &alice, "https://example.com/x").await;
    collections::create_collection(
        State(state.clone()),
        Extension(alice.clone()),
        Json(CreateCollectionRequest {
            title: "Tech".into(),
            emoji: "💻".into(),
            description: String::new(),
            is_public: true,
        }),
    )
    .await
    .unwrap();
    let cid: Uuid = state
        .db
        .list_collections_by_owner(&alice.sub.to_string(), true)
        .unwrap()[0]
        .id
        .parse()
        .unwrap();

    collections::add_post_to_collection(
        State(state.clone()),
        Path((cid, post_id)),
        Extension(alice.clone()),
    )
    .await
    .unwrap();

    let second = collections::add_post_to_collection(
        State(state.clone()),
        Path((cid, post_id)),
        Extension(alice),
    )
    .await;
    assert!(matches!(second, Err(ApiError::Conflict(_))));
}

#[tokio::test]
async fn edits_touch_description_and_categories_only() {
    let state = state();
    let alice = claims_for(&state, "alice");
    let bob = claims_for(&state, "bob");

    let post_id = share_article(&state, &alice, "https://example.com/x").await;

    let denied = posts::update_post(
        State(state.clone()),
        Path(post_id),
        Extension(bob),
        Json(UpdatePostRequest {
            description: Some("hijacked".into()),
            categories: None,
        }),
    )
    .await;
    assert!(matches!(denied, Err(ApiError::Forbidden(_))));

    posts::update_post(
        State(state.clone()),
        Path(post_id),
        Extension(alice.clone()),
        Json(UpdatePostRequest {
            description: Some("updated take".into()),
            categories: Some(vec!["Science".into(), "Health".into()]),
        }),
    )
    .await
    .unwrap();

    let row = state.db.get_post(&post_id.to_string()).unwrap().unwrap();
    assert_eq!(row.description, "updated take");
    // Authorship never changes across edits.
    assert_eq!(row.author_id, alice.sub.to_string());
}

#[tokio::test]
async fn self_follow_is_always_rejected() {
    let state = state();
    let alice = claims_for(&state, "alice");

    let result = users::follow_user(
        State(state.clone()),
        Path(alice.sub),
        Extension(alice.clone()),
    )
    .await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn empty_comment_is_rejected() {
    let state = state();
    let alice = claims_for(&state, "alice");
    let post_id = share_article(&state, &alice, "https://example.com/x").await;

    let result = comments::create_comment(
        State(state.clone()),
        Path(post_id),
        Extension(alice),
        Json(CreateCommentRequest { body: "   ".into() }),
    )
    .await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}
