use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared between flashnews-api (middleware, token issuance)
/// and flashnews-client (token inspection). Canonical definition lives
/// here in flashnews-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
    pub typ: TokenKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

// -- Users --

/// Author / search-result card: the compact user shape embedded in posts,
/// comments and search listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: Uuid,
    pub username: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub tags: Vec<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserSummary,
    pub is_owner: bool,
    pub tags: Vec<String>,
    pub posts: Vec<PostView>,
    pub collections: UserCollectionsResponse,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub bio: Option<String>,
    pub tags: Option<Vec<String>>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSearchResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    pub following: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowListResponse {
    pub users: Vec<UserSummary>,
}

// -- Posts --

/// Caller-supplied article metadata. The link is the identity; the rest is
/// whatever the caller scraped from the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArticleRef {
    pub link: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub caption: Option<String>,
    pub preview: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub article: ArticleRef,
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleView {
    pub article_id: Uuid,
    pub link: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub caption: Option<String>,
    pub preview: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub post_id: Uuid,
    pub author: UserSummary,
    pub description: String,
    pub posted_at: DateTime<Utc>,
    pub article: ArticleView,
    pub categories: Vec<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub total_posts: i64,
    pub page: u32,
    pub per_page: u32,
    pub posts: Vec<PostView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

// -- Likes --

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: i64,
}

// -- Comments --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub comment_id: Uuid,
    pub post_id: Uuid,
    pub author: UserSummary,
    pub body: String,
    pub commented_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentsResponse {
    pub total_comments: i64,
    pub page: u32,
    pub per_page: u32,
    pub comments: Vec<CommentView>,
}

// -- Collections --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCollectionRequest {
    pub title: String,
    pub emoji: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_is_public")]
    pub is_public: bool,
}

fn default_is_public() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCollectionRequest {
    pub title: Option<String>,
    pub emoji: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionView {
    pub collection_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub emoji: String,
    pub description: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub articles_count: i64,
}

/// Private collections are present only when the requester owns them.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserCollectionsResponse {
    pub public: Vec<CollectionView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<Vec<CollectionView>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionPostEntry {
    #[serde(flatten)]
    pub post: PostView,
    pub featured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionPostsResponse {
    pub collection: CollectionView,
    pub posts: Vec<CollectionPostEntry>,
}

// -- Errors --

/// Body shape for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
