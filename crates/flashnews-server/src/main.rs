use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use flashnews_api::auth::{self, AppState, AppStateInner};
use flashnews_api::middleware::require_auth;
use flashnews_api::{collections, comments, likes, posts, users};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flashnews=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("FLASHNEWS_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("FLASHNEWS_DB_PATH").unwrap_or_else(|_| "flashnews.db".into());
    let host = std::env::var("FLASHNEWS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("FLASHNEWS_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = flashnews_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner { db, jwt_secret });

    // Routes
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .with_state(state.clone());

    let protected_routes = Router::new()
        // Users
        .route("/user", get(users::get_current_user))
        .route("/user/search", get(users::search_users))
        .route("/user/followers", get(users::get_followers))
        .route("/user/following", get(users::get_following))
        .route("/user/{username}", get(users::get_profile))
        .route("/user/update/{username}", put(users::update_user))
        .route("/user/delete/{username}", delete(users::delete_user))
        .route("/user/follow/{user_id}", post(users::follow_user))
        .route("/user/unfollow/{user_id}", post(users::unfollow_user))
        // Posts
        .route("/posts", post(posts::create_post))
        .route("/posts/feed", get(posts::get_feed))
        .route("/posts/categories", get(posts::get_categories))
        .route("/posts/user/{user_id}", get(posts::get_user_posts))
        .route("/posts/{post_id}", get(posts::get_post).put(posts::update_post))
        .route("/posts/{post_id}/delete", delete(posts::delete_post))
        // Likes
        .route(
            "/likes/{post_id}",
            post(likes::like_post).delete(likes::unlike_post),
        )
        // Comments: GET/POST address a post, DELETE addresses a comment
        .route(
            "/comments/{id}",
            get(comments::get_comments)
                .post(comments::create_comment)
                .delete(comments::delete_comment),
        )
        // Collections
        .route("/collections", post(collections::create_collection))
        .route(
            "/collections/user/{user_id}",
            get(collections::get_user_collections),
        )
        .route(
            "/collections/update/{collection_id}",
            put(collections::update_collection),
        )
        .route(
            "/collections/delete/{collection_id}",
            delete(collections::delete_collection),
        )
        .route(
            "/collections/{collection_id}/posts",
            get(collections::get_collection_posts),
        )
        .route(
            "/collections/{collection_id}/posts/{post_id}",
            post(collections::add_post_to_collection),
        )
        .route(
            "/collections/{collection_id}/posts/{post_id}/remove",
            delete(collections::remove_post_from_collection),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("FlashNews server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
