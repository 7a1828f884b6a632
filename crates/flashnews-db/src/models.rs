/// Row structs read straight out of SQLite. Kept separate from the
/// flashnews-types API models so the storage layer stays independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: String,
}

pub struct ArticleRow {
    pub id: String,
    pub link: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub caption: Option<String>,
    pub preview: Option<String>,
}

pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub article_id: String,
    pub description: String,
    pub posted_at: String,
}

/// A post joined with its author and article, as read views consume it.
pub struct PostDetailRow {
    pub id: String,
    pub description: String,
    pub posted_at: String,
    pub author_id: String,
    pub author_username: String,
    pub author_bio: Option<String>,
    pub author_picture: Option<String>,
    pub article: ArticleRow,
}

pub struct CollectionRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub emoji: String,
    pub description: String,
    pub is_public: bool,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub body: String,
    pub commented_at: String,
}

/// A comment joined with its author, for listings.
pub struct CommentDetailRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_username: String,
    pub author_picture: Option<String>,
    pub body: String,
    pub commented_at: String,
}

/// Compact user reference for search results and follow listings.
pub struct UserRefRow {
    pub id: String,
    pub username: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}
