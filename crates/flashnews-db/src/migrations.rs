use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE COLLATE NOCASE,
            email           TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            bio             TEXT,
            profile_picture TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_tags (
            user_id     TEXT NOT NULL REFERENCES users(id),
            tag         TEXT NOT NULL,
            PRIMARY KEY (user_id, tag)
        );

        -- Articles are deduplicated by link; posts reference them.
        CREATE TABLE IF NOT EXISTS articles (
            id          TEXT PRIMARY KEY,
            link        TEXT NOT NULL UNIQUE,
            title       TEXT,
            source      TEXT,
            caption     TEXT,
            preview     TEXT
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL REFERENCES users(id),
            article_id  TEXT NOT NULL REFERENCES articles(id),
            description TEXT NOT NULL,
            posted_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_posted_at
            ON posts(posted_at DESC);
        CREATE INDEX IF NOT EXISTS idx_posts_author
            ON posts(author_id, posted_at);

        CREATE TABLE IF NOT EXISTS post_categories (
            post_id     TEXT NOT NULL REFERENCES posts(id),
            category    TEXT NOT NULL,
            PRIMARY KEY (post_id, category)
        );

        CREATE TABLE IF NOT EXISTS collections (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            title       TEXT NOT NULL,
            emoji       TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            is_public   INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL,
            UNIQUE (owner_id, title)
        );

        CREATE TABLE IF NOT EXISTS collection_posts (
            collection_id   TEXT NOT NULL REFERENCES collections(id),
            post_id         TEXT NOT NULL REFERENCES posts(id),
            added_at        TEXT NOT NULL,
            PRIMARY KEY (collection_id, post_id)
        );

        CREATE TABLE IF NOT EXISTS comments (
            id              TEXT PRIMARY KEY,
            post_id         TEXT NOT NULL REFERENCES posts(id),
            author_id       TEXT NOT NULL REFERENCES users(id),
            body            TEXT NOT NULL,
            commented_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id, commented_at);

        CREATE TABLE IF NOT EXISTS likes (
            user_id     TEXT NOT NULL REFERENCES users(id),
            post_id     TEXT NOT NULL REFERENCES posts(id),
            liked_at    TEXT NOT NULL,
            PRIMARY KEY (user_id, post_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_post
            ON likes(post_id);

        CREATE TABLE IF NOT EXISTS follows (
            follower_id TEXT NOT NULL REFERENCES users(id),
            followee_id TEXT NOT NULL REFERENCES users(id),
            followed_at TEXT NOT NULL,
            PRIMARY KEY (follower_id, followee_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
