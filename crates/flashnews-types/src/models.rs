use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub tags: Vec<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The shared external content a post links to. Articles are deduplicated
/// by link and several posts may reference the same row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub link: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub caption: Option<String>,
    pub preview: Option<String>,
}

/// A user's act of sharing an article, distinct from the article itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub article_id: Uuid,
    pub description: String,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub emoji: String,
    pub description: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub commented_at: DateTime<Utc>,
}

/// Fixed category vocabulary. Posts carry a subset of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Politics,
    Tech,
    Health,
    Sports,
    Entertainment,
    Science,
    Business,
    Environment,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Politics,
        Category::Tech,
        Category::Health,
        Category::Sports,
        Category::Entertainment,
        Category::Science,
        Category::Business,
        Category::Environment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Politics => "Politics",
            Category::Tech => "Tech",
            Category::Health => "Health",
            Category::Sports => "Sports",
            Category::Entertainment => "Entertainment",
            Category::Science => "Science",
            Category::Business => "Business",
            Category::Environment => "Environment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl std::str::FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
