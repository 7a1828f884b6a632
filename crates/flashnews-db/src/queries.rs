use crate::models::{
    ArticleRow, CollectionRow, CommentDetailRow, CommentRow, PostDetailRow, PostRow, UserRefRow,
    UserRow,
};
use crate::Database;
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, username, email, password_hash, created_at),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_optional_user(conn, "SELECT id, username, email, password, bio, profile_picture, created_at FROM users WHERE username = ?1", username)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_optional_user(conn, "SELECT id, username, email, password, bio, profile_picture, created_at FROM users WHERE email = ?1", email)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_optional_user(conn, "SELECT id, username, email, password, bio, profile_picture, created_at FROM users WHERE id = ?1", id)
        })
    }

    pub fn update_user_profile(
        &self,
        id: &str,
        bio: Option<&str>,
        profile_picture: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            if let Some(bio) = bio {
                conn.execute("UPDATE users SET bio = ?2 WHERE id = ?1", (id, bio))?;
            }
            if let Some(picture) = profile_picture {
                conn.execute(
                    "UPDATE users SET profile_picture = ?2 WHERE id = ?1",
                    (id, picture),
                )?;
            }
            Ok(())
        })
    }

    pub fn replace_user_tags(&self, id: &str, tags: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM user_tags WHERE user_id = ?1", [id])?;
            for tag in tags {
                tx.execute(
                    "INSERT OR IGNORE INTO user_tags (user_id, tag) VALUES (?1, ?2)",
                    (id, tag),
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_user_tags(&self, id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT tag FROM user_tags WHERE user_id = ?1 ORDER BY tag")?;
            let tags = stmt
                .query_map([id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(tags)
        })
    }

    pub fn search_users(&self, query: &str, limit: u32) -> Result<Vec<UserRefRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, bio, profile_picture FROM users
                 WHERE instr(lower(username), lower(?1)) > 0
                 ORDER BY username
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![query, limit], map_user_ref)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Remove a user and everything they own: likes, comments, follow edges,
    /// their posts (with those posts' comments, likes and memberships), their
    /// collections (with memberships), and their tags. One transaction.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM likes WHERE user_id = ?1", [id])?;
            tx.execute("DELETE FROM comments WHERE author_id = ?1", [id])?;
            tx.execute(
                "DELETE FROM follows WHERE follower_id = ?1 OR followee_id = ?1",
                [id],
            )?;
            tx.execute(
                "DELETE FROM likes WHERE post_id IN (SELECT id FROM posts WHERE author_id = ?1)",
                [id],
            )?;
            tx.execute(
                "DELETE FROM comments WHERE post_id IN (SELECT id FROM posts WHERE author_id = ?1)",
                [id],
            )?;
            tx.execute(
                "DELETE FROM collection_posts WHERE post_id IN (SELECT id FROM posts WHERE author_id = ?1)",
                [id],
            )?;
            tx.execute(
                "DELETE FROM post_categories WHERE post_id IN (SELECT id FROM posts WHERE author_id = ?1)",
                [id],
            )?;
            tx.execute("DELETE FROM posts WHERE author_id = ?1", [id])?;
            tx.execute(
                "DELETE FROM collection_posts WHERE collection_id IN (SELECT id FROM collections WHERE owner_id = ?1)",
                [id],
            )?;
            tx.execute("DELETE FROM collections WHERE owner_id = ?1", [id])?;
            tx.execute("DELETE FROM user_tags WHERE user_id = ?1", [id])?;
            let removed = tx.execute("DELETE FROM users WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(removed > 0)
        })
    }

    // -- Articles --

    /// Look up an article by link, inserting it with the supplied metadata
    /// when it does not exist yet. Existing metadata is never overwritten.
    pub fn get_or_create_article(
        &self,
        new_id: &str,
        link: &str,
        title: Option<&str>,
        source: Option<&str>,
        caption: Option<&str>,
        preview: Option<&str>,
    ) -> Result<ArticleRow> {
        self.with_conn(|conn| {
            let existing = conn
                .query_row(
                    "SELECT id, link, title, source, caption, preview FROM articles WHERE link = ?1",
                    [link],
                    map_article,
                )
                .optional()?;

            if let Some(article) = existing {
                return Ok(article);
            }

            conn.execute(
                "INSERT INTO articles (id, link, title, source, caption, preview)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (new_id, link, title, source, caption, preview),
            )?;

            Ok(ArticleRow {
                id: new_id.to_string(),
                link: link.to_string(),
                title: title.map(str::to_string),
                source: source.map(str::to_string),
                caption: caption.map(str::to_string),
                preview: preview.map(str::to_string),
            })
        })
    }

    // -- Posts --

    pub fn insert_post(
        &self,
        id: &str,
        author_id: &str,
        article_id: &str,
        description: &str,
        posted_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author_id, article_id, description, posted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, author_id, article_id, description, posted_at),
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, author_id, article_id, description, posted_at FROM posts WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(PostRow {
                            id: row.get(0)?,
                            author_id: row.get(1)?,
                            article_id: row.get(2)?,
                            description: row.get(3)?,
                            posted_at: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_post_detail(&self, id: &str) -> Result<Option<PostDetailRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{POST_DETAIL_SELECT} WHERE p.id = ?1"),
                    [id],
                    map_post_detail,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Feed page: every post, newest first.
    pub fn list_feed(&self, limit: u32, offset: u32) -> Result<Vec<PostDetailRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_DETAIL_SELECT} ORDER BY p.posted_at DESC LIMIT ?1 OFFSET ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![limit, offset], map_post_detail)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_posts(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?)
        })
    }

    pub fn list_posts_by_author(
        &self,
        author_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<PostDetailRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_DETAIL_SELECT} WHERE p.author_id = ?1 ORDER BY p.posted_at DESC LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![author_id, limit, offset], map_post_detail)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_posts_by_author(&self, author_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM posts WHERE author_id = ?1",
                [author_id],
                |row| row.get(0),
            )?)
        })
    }

    pub fn update_post_description(&self, id: &str, description: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE posts SET description = ?2 WHERE id = ?1",
                (id, description),
            )?;
            Ok(())
        })
    }

    pub fn replace_post_categories(&self, post_id: &str, categories: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM post_categories WHERE post_id = ?1", [post_id])?;
            for category in categories {
                tx.execute(
                    "INSERT OR IGNORE INTO post_categories (post_id, category) VALUES (?1, ?2)",
                    (post_id, category),
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Batch-fetch categories for a set of post IDs.
    pub fn categories_for_posts(&self, post_ids: &[String]) -> Result<Vec<(String, String)>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders = placeholders(1, post_ids.len());
            let sql = format!(
                "SELECT post_id, category FROM post_categories WHERE post_id IN ({placeholders}) ORDER BY category"
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();
            let rows = stmt
                .query_map(params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Remove a post together with its comments, likes, memberships and
    /// category rows. The referenced article stays: other posts may share it.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM likes WHERE post_id = ?1", [id])?;
            tx.execute("DELETE FROM comments WHERE post_id = ?1", [id])?;
            tx.execute("DELETE FROM collection_posts WHERE post_id = ?1", [id])?;
            tx.execute("DELETE FROM post_categories WHERE post_id = ?1", [id])?;
            let removed = tx.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(removed > 0)
        })
    }

    // -- Likes --

    /// Returns true if a row was inserted, false if the like already existed.
    pub fn insert_like(&self, user_id: &str, post_id: &str, liked_at: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO likes (user_id, post_id, liked_at) VALUES (?1, ?2, ?3)",
                (user_id, post_id, liked_at),
            )?;
            Ok(inserted > 0)
        })
    }

    /// Returns true if a row was removed, false if no like existed.
    pub fn delete_like(&self, user_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                (user_id, post_id),
            )?;
            Ok(removed > 0)
        })
    }

    /// Like counts are always computed from the rows, never cached.
    pub fn likes_count(&self, post_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?)
        })
    }

    pub fn likes_count_for_posts(&self, post_ids: &[String]) -> Result<Vec<(String, i64)>> {
        self.grouped_count("likes", post_ids)
    }

    pub fn comments_count_for_posts(&self, post_ids: &[String]) -> Result<Vec<(String, i64)>> {
        self.grouped_count("comments", post_ids)
    }

    fn grouped_count(&self, table: &str, post_ids: &[String]) -> Result<Vec<(String, i64)>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders = placeholders(1, post_ids.len());
            let sql = format!(
                "SELECT post_id, COUNT(*) FROM {table} WHERE post_id IN ({placeholders}) GROUP BY post_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();
            let rows = stmt
                .query_map(params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Which of the given posts has this user liked?
    pub fn liked_post_ids(&self, user_id: &str, post_ids: &[String]) -> Result<Vec<String>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders = placeholders(2, post_ids.len());
            let sql = format!(
                "SELECT post_id FROM likes WHERE user_id = ?1 AND post_id IN ({placeholders})"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];
            params.extend(
                post_ids
                    .iter()
                    .map(|id| id as &dyn rusqlite::types::ToSql),
            );
            let rows = stmt
                .query_map(params.as_slice(), |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        author_id: &str,
        body: &str,
        commented_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author_id, body, commented_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, post_id, author_id, body, commented_at),
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, post_id, author_id, body, commented_at FROM comments WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(CommentRow {
                            id: row.get(0)?,
                            post_id: row.get(1)?,
                            author_id: row.get(2)?,
                            body: row.get(3)?,
                            commented_at: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_comments(
        &self,
        post_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CommentDetailRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.author_id, u.username, u.profile_picture, c.body, c.commented_at
                 FROM comments c
                 JOIN users u ON c.author_id = u.id
                 WHERE c.post_id = ?1
                 ORDER BY c.commented_at DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![post_id, limit, offset], |row| {
                    Ok(CommentDetailRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        author_id: row.get(2)?,
                        author_username: row.get(3)?,
                        author_picture: row.get(4)?,
                        body: row.get(5)?,
                        commented_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn comments_count(&self, post_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
                [post_id],
                |row| row.get(0),
            )?)
        })
    }

    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    // -- Collections --

    /// Returns false when the owner already has a collection with this title.
    pub fn insert_collection(
        &self,
        id: &str,
        owner_id: &str,
        title: &str,
        emoji: &str,
        description: &str,
        is_public: bool,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO collections (id, owner_id, title, emoji, description, is_public, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                (id, owner_id, title, emoji, description, is_public, created_at),
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_collection(&self, id: &str) -> Result<Option<CollectionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, owner_id, title, emoji, description, is_public, created_at
                     FROM collections WHERE id = ?1",
                    [id],
                    map_collection,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_collections_by_owner(
        &self,
        owner_id: &str,
        is_public: bool,
    ) -> Result<Vec<CollectionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, title, emoji, description, is_public, created_at
                 FROM collections
                 WHERE owner_id = ?1 AND is_public = ?2
                 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![owner_id, is_public], map_collection)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when a title update would collide with another of the
    /// owner's collections.
    pub fn update_collection(
        &self,
        id: &str,
        title: Option<&str>,
        emoji: Option<&str>,
        description: Option<&str>,
        is_public: Option<bool>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if let Some(title) = title {
                let result =
                    tx.execute("UPDATE collections SET title = ?2 WHERE id = ?1", (id, title));
                match result {
                    Ok(_) => {}
                    Err(e) if is_constraint_violation(&e) => return Ok(false),
                    Err(e) => return Err(e.into()),
                }
            }
            if let Some(emoji) = emoji {
                tx.execute("UPDATE collections SET emoji = ?2 WHERE id = ?1", (id, emoji))?;
            }
            if let Some(description) = description {
                tx.execute(
                    "UPDATE collections SET description = ?2 WHERE id = ?1",
                    (id, description),
                )?;
            }
            if let Some(is_public) = is_public {
                tx.execute(
                    "UPDATE collections SET is_public = ?2 WHERE id = ?1",
                    (id, is_public),
                )?;
            }
            tx.commit()?;
            Ok(true)
        })
    }

    /// Remove a collection and its memberships. Member posts stay.
    pub fn delete_collection(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM collection_posts WHERE collection_id = ?1",
                [id],
            )?;
            let removed = tx.execute("DELETE FROM collections WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(removed > 0)
        })
    }

    // -- Collection membership --

    /// Plain INSERT: a duplicate (collection, post) pair is reported as
    /// false, never silently deduplicated, so the caller can tell
    /// "already added" from "added".
    pub fn add_collection_post(
        &self,
        collection_id: &str,
        post_id: &str,
        added_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO collection_posts (collection_id, post_id, added_at) VALUES (?1, ?2, ?3)",
                (collection_id, post_id, added_at),
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn remove_collection_post(&self, collection_id: &str, post_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM collection_posts WHERE collection_id = ?1 AND post_id = ?2",
                (collection_id, post_id),
            )?;
            Ok(removed > 0)
        })
    }

    pub fn list_posts_in_collection(&self, collection_id: &str) -> Result<Vec<PostDetailRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_DETAIL_SELECT}
                 JOIN collection_posts cp ON cp.post_id = p.id
                 WHERE cp.collection_id = ?1
                 ORDER BY p.posted_at DESC"
            ))?;
            let rows = stmt
                .query_map([collection_id], map_post_detail)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch member counts for a set of collection IDs.
    pub fn articles_count_for_collections(
        &self,
        collection_ids: &[String],
    ) -> Result<Vec<(String, i64)>> {
        if collection_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders = placeholders(1, collection_ids.len());
            let sql = format!(
                "SELECT collection_id, COUNT(*) FROM collection_posts
                 WHERE collection_id IN ({placeholders}) GROUP BY collection_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = collection_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();
            let rows = stmt
                .query_map(params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Follows --

    /// Returns true if the edge was created, false if it already existed.
    pub fn insert_follow(
        &self,
        follower_id: &str,
        followee_id: &str,
        followed_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (follower_id, followee_id, followed_at)
                 VALUES (?1, ?2, ?3)",
                (follower_id, followee_id, followed_at),
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn delete_follow(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                (follower_id, followee_id),
            )?;
            Ok(removed > 0)
        })
    }

    pub fn list_followers(&self, user_id: &str) -> Result<Vec<UserRefRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.bio, u.profile_picture
                 FROM follows f
                 JOIN users u ON f.follower_id = u.id
                 WHERE f.followee_id = ?1
                 ORDER BY f.followed_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_user_ref)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_following(&self, user_id: &str) -> Result<Vec<UserRefRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.bio, u.profile_picture
                 FROM follows f
                 JOIN users u ON f.followee_id = u.id
                 WHERE f.follower_id = ?1
                 ORDER BY f.followed_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_user_ref)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// Shared SELECT for the post-with-author-and-article join.
const POST_DETAIL_SELECT: &str = "SELECT p.id, p.description, p.posted_at,
        u.id, u.username, u.bio, u.profile_picture,
        a.id, a.link, a.title, a.source, a.caption, a.preview
 FROM posts p
 JOIN users u ON p.author_id = u.id
 JOIN articles a ON p.article_id = a.id";

fn map_post_detail(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostDetailRow> {
    Ok(PostDetailRow {
        id: row.get(0)?,
        description: row.get(1)?,
        posted_at: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row.get(4)?,
        author_bio: row.get(5)?,
        author_picture: row.get(6)?,
        article: ArticleRow {
            id: row.get(7)?,
            link: row.get(8)?,
            title: row.get(9)?,
            source: row.get(10)?,
            caption: row.get(11)?,
            preview: row.get(12)?,
        },
    })
}

fn map_article(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArticleRow> {
    Ok(ArticleRow {
        id: row.get(0)?,
        link: row.get(1)?,
        title: row.get(2)?,
        source: row.get(3)?,
        caption: row.get(4)?,
        preview: row.get(5)?,
    })
}

fn map_collection(row: &rusqlite::Row<'_>) -> rusqlite::Result<CollectionRow> {
    Ok(CollectionRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        emoji: row.get(3)?,
        description: row.get(4)?,
        is_public: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_user_ref(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRefRow> {
    Ok(UserRefRow {
        id: row.get(0)?,
        username: row.get(1)?,
        bio: row.get(2)?,
        profile_picture: row.get(3)?,
    })
}

fn query_optional_user(conn: &Connection, sql: &str, param: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(sql, [param], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                bio: row.get(4)?,
                profile_picture: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    const T0: &str = "2026-08-01T10:00:00+00:00";
    const T1: &str = "2026-08-01T11:00:00+00:00";
    const T2: &str = "2026-08-01T12:00:00+00:00";

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, id: &str, username: &str) {
        db.create_user(id, username, &format!("{username}@example.com"), "hash", T0)
            .unwrap();
    }

    fn seed_post(db: &Database, id: &str, author: &str, link: &str, posted_at: &str) {
        let article = db
            .get_or_create_article(&format!("a-{id}"), link, Some("Title"), None, None, None)
            .unwrap();
        db.insert_post(id, author, &article.id, "a description", posted_at)
            .unwrap();
    }

    #[test]
    fn username_uniqueness_is_case_insensitive() {
        let db = db();
        seed_user(&db, "u1", "Alice");
        let dup = db.create_user("u2", "alice", "other@example.com", "hash", T0);
        assert!(dup.is_err());

        // Case-preserving display, case-insensitive lookup.
        let found = db.get_user_by_username("ALICE").unwrap().unwrap();
        assert_eq!(found.username, "Alice");
    }

    #[test]
    fn article_is_deduplicated_by_link() {
        let db = db();
        let first = db
            .get_or_create_article("a1", "https://example.com/x", Some("X"), None, None, None)
            .unwrap();
        let second = db
            .get_or_create_article("a2", "https://example.com/x", Some("other"), None, None, None)
            .unwrap();
        assert_eq!(first.id, second.id);
        // Existing metadata wins.
        assert_eq!(second.title.as_deref(), Some("X"));
    }

    #[test]
    fn like_toggle_is_idempotent() {
        let db = db();
        seed_user(&db, "u1", "alice");
        seed_user(&db, "u2", "bob");
        seed_post(&db, "p1", "u1", "https://example.com/1", T1);

        assert!(db.insert_like("u2", "p1", T1).unwrap());
        assert!(!db.insert_like("u2", "p1", T2).unwrap());
        assert_eq!(db.likes_count("p1").unwrap(), 1);

        assert!(db.delete_like("u2", "p1").unwrap());
        assert!(!db.delete_like("u2", "p1").unwrap());
        assert_eq!(db.likes_count("p1").unwrap(), 0);
    }

    #[test]
    fn duplicate_membership_is_reported_not_deduplicated() {
        let db = db();
        seed_user(&db, "u1", "alice");
        seed_post(&db, "p1", "u1", "https://example.com/1", T1);
        db.insert_collection("c1", "u1", "Tech", "💻", "", false, T0)
            .unwrap();

        assert!(db.add_collection_post("c1", "p1", T1).unwrap());
        assert!(!db.add_collection_post("c1", "p1", T2).unwrap());

        let posts = db.list_posts_in_collection("c1").unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[test]
    fn remove_membership_reports_absence() {
        let db = db();
        seed_user(&db, "u1", "alice");
        seed_post(&db, "p1", "u1", "https://example.com/1", T1);
        db.insert_collection("c1", "u1", "Tech", "💻", "", true, T0)
            .unwrap();

        assert!(!db.remove_collection_post("c1", "p1").unwrap());
        db.add_collection_post("c1", "p1", T1).unwrap();
        assert!(db.remove_collection_post("c1", "p1").unwrap());
    }

    #[test]
    fn delete_post_cascades_but_keeps_article() {
        let db = db();
        seed_user(&db, "u1", "alice");
        seed_user(&db, "u2", "bob");
        seed_post(&db, "p1", "u1", "https://example.com/shared", T1);
        // Second post sharing the same article.
        let article = db
            .get_or_create_article("ax", "https://example.com/shared", None, None, None, None)
            .unwrap();
        db.insert_post("p2", "u2", &article.id, "also sharing", T2)
            .unwrap();

        for (i, t) in [T0, T1, T2].iter().enumerate() {
            db.insert_comment(&format!("cm{i}"), "p1", "u2", "nice", t)
                .unwrap();
        }
        db.insert_collection("c1", "u2", "Saved", "⭐", "", true, T0)
            .unwrap();
        db.insert_collection("c2", "u2", "Later", "🕒", "", false, T0)
            .unwrap();
        db.add_collection_post("c1", "p1", T1).unwrap();
        db.add_collection_post("c2", "p1", T1).unwrap();
        db.insert_like("u2", "p1", T1).unwrap();

        assert!(db.delete_post("p1").unwrap());

        assert!(db.get_post("p1").unwrap().is_none());
        assert_eq!(db.comments_count("p1").unwrap(), 0);
        assert_eq!(db.likes_count("p1").unwrap(), 0);
        assert!(db.list_posts_in_collection("c1").unwrap().is_empty());
        assert!(db.list_posts_in_collection("c2").unwrap().is_empty());

        // The shared article and the other post survive.
        let survivor = db.get_post("p2").unwrap().unwrap();
        assert_eq!(survivor.article_id, article.id);
    }

    #[test]
    fn delete_collection_keeps_member_posts() {
        let db = db();
        seed_user(&db, "u1", "alice");
        seed_post(&db, "p1", "u1", "https://example.com/1", T1);
        db.insert_collection("c1", "u1", "Tech", "💻", "", true, T0)
            .unwrap();
        db.add_collection_post("c1", "p1", T1).unwrap();

        assert!(db.delete_collection("c1").unwrap());
        assert!(db.get_collection("c1").unwrap().is_none());
        assert!(db.get_post("p1").unwrap().is_some());
    }

    #[test]
    fn duplicate_collection_title_per_owner_is_rejected() {
        let db = db();
        seed_user(&db, "u1", "alice");
        seed_user(&db, "u2", "bob");
        assert!(db
            .insert_collection("c1", "u1", "Tech", "💻", "", true, T0)
            .unwrap());
        assert!(!db
            .insert_collection("c2", "u1", "Tech", "🤖", "", true, T0)
            .unwrap());
        // A different owner may reuse the title.
        assert!(db
            .insert_collection("c3", "u2", "Tech", "💻", "", true, T0)
            .unwrap());
    }

    #[test]
    fn feed_is_reverse_chronological() {
        let db = db();
        seed_user(&db, "u1", "alice");
        seed_post(&db, "p1", "u1", "https://example.com/1", T0);
        seed_post(&db, "p2", "u1", "https://example.com/2", T2);
        seed_post(&db, "p3", "u1", "https://example.com/3", T1);

        let feed = db.list_feed(10, 0).unwrap();
        let ids: Vec<&str> = feed.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p3", "p1"]);
        assert_eq!(db.count_posts().unwrap(), 3);

        let page2 = db.list_feed(2, 2).unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].id, "p1");
    }

    #[test]
    fn batch_counts_cover_only_requested_posts() {
        let db = db();
        seed_user(&db, "u1", "alice");
        seed_user(&db, "u2", "bob");
        seed_post(&db, "p1", "u1", "https://example.com/1", T0);
        seed_post(&db, "p2", "u1", "https://example.com/2", T1);
        db.insert_like("u2", "p1", T1).unwrap();
        db.insert_like("u1", "p1", T1).unwrap();
        db.insert_comment("cm1", "p2", "u2", "hello", T1).unwrap();

        let ids = vec!["p1".to_string(), "p2".to_string()];
        let likes = db.likes_count_for_posts(&ids).unwrap();
        assert_eq!(likes, vec![("p1".to_string(), 2)]);
        let comments = db.comments_count_for_posts(&ids).unwrap();
        assert_eq!(comments, vec![("p2".to_string(), 1)]);

        let liked = db.liked_post_ids("u2", &ids).unwrap();
        assert_eq!(liked, vec!["p1".to_string()]);
    }

    #[test]
    fn follow_edges_are_idempotent() {
        let db = db();
        seed_user(&db, "u1", "alice");
        seed_user(&db, "u2", "bob");

        assert!(db.insert_follow("u1", "u2", T0).unwrap());
        assert!(!db.insert_follow("u1", "u2", T1).unwrap());

        let followers = db.list_followers("u2").unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].username, "alice");
        let following = db.list_following("u1").unwrap();
        assert_eq!(following.len(), 1);

        assert!(db.delete_follow("u1", "u2").unwrap());
        assert!(!db.delete_follow("u1", "u2").unwrap());
    }

    #[test]
    fn search_users_is_case_insensitive_substring() {
        let db = db();
        seed_user(&db, "u1", "AliceWonder");
        seed_user(&db, "u2", "malice");
        seed_user(&db, "u3", "bob");

        let hits = db.search_users("ALICE", 20).unwrap();
        let names: Vec<&str> = hits.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["AliceWonder", "malice"]);

        let bounded = db.search_users("alice", 1).unwrap();
        assert_eq!(bounded.len(), 1);
    }

    #[test]
    fn user_tags_round_trip() {
        let db = db();
        seed_user(&db, "u1", "alice");
        db.replace_user_tags("u1", &["rust".into(), "news".into(), "rust".into()])
            .unwrap();
        assert_eq!(db.get_user_tags("u1").unwrap(), vec!["news", "rust"]);

        db.replace_user_tags("u1", &["tech".into()]).unwrap();
        assert_eq!(db.get_user_tags("u1").unwrap(), vec!["tech"]);
    }

    #[test]
    fn delete_user_removes_everything_they_own() {
        let db = db();
        seed_user(&db, "u1", "alice");
        seed_user(&db, "u2", "bob");
        seed_post(&db, "p1", "u1", "https://example.com/1", T0);
        seed_post(&db, "p2", "u2", "https://example.com/2", T1);
        db.insert_comment("cm1", "p2", "u1", "from alice", T1).unwrap();
        db.insert_comment("cm2", "p1", "u2", "from bob", T1).unwrap();
        db.insert_like("u2", "p1", T1).unwrap();
        db.insert_like("u1", "p2", T1).unwrap();
        db.insert_follow("u1", "u2", T0).unwrap();
        db.insert_follow("u2", "u1", T0).unwrap();
        db.insert_collection("c1", "u1", "Mine", "📁", "", false, T0)
            .unwrap();
        db.add_collection_post("c1", "p2", T1).unwrap();
        db.insert_collection("c2", "u2", "Bobs", "📁", "", true, T0)
            .unwrap();
        db.add_collection_post("c2", "p1", T1).unwrap();
        db.replace_user_tags("u1", &["rust".into()]).unwrap();

        assert!(db.delete_user("u1").unwrap());

        assert!(db.get_user_by_id("u1").unwrap().is_none());
        assert!(db.get_post("p1").unwrap().is_none());
        assert!(db.get_collection("c1").unwrap().is_none());
        assert_eq!(db.comments_count("p2").unwrap(), 0);
        assert_eq!(db.likes_count("p2").unwrap(), 0);
        assert!(db.list_followers("u2").unwrap().is_empty());
        assert!(db.list_following("u2").unwrap().is_empty());
        // Bob's collection survives, emptied of alice's post.
        assert!(db.get_collection("c2").unwrap().is_some());
        assert!(db.list_posts_in_collection("c2").unwrap().is_empty());

        // Bob's own post is untouched.
        assert!(db.get_post("p2").unwrap().is_some());
    }
}
