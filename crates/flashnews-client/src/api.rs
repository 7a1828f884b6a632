use reqwest::Client;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use flashnews_types::api::{
    CategoriesResponse, CollectionPostsResponse, CommentView, CommentsResponse,
    CreateCollectionRequest, CreateCommentRequest, CreatePostRequest, CurrentUserResponse,
    ErrorResponse, FeedResponse, FollowListResponse, FollowResponse, LikeResponse, LoginRequest,
    LoginResponse, PostView, ProfileResponse, RefreshRequest, RefreshResponse, RegisterRequest,
    RegisterResponse, UpdateCollectionRequest, UpdatePostRequest, UpdateUserRequest,
    UserCollectionsResponse, UserSearchResponse,
};

/// Client-side failure taxonomy. `Network` is transport-level and transient:
/// the UI may offer a manual retry but nothing here retries automatically,
/// since mutations are not idempotent at the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response {status}: {message}")]
    Api { status: u16, message: String },
}

/// Typed client for the FlashNews REST surface. The server stays the
/// source of truth; this type only moves bytes and classifies failures.
pub struct ApiClient {
    base_url: String,
    http: Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
            token: None,
        }
    }

    /// The session context: set once after login, threaded through every
    /// authenticated call.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|e| e.error)
            .unwrap_or_else(|_| status.to_string());

        Err(match status.as_u16() {
            400 => ClientError::Validation(message),
            401 => ClientError::Unauthorized,
            403 => ClientError::Forbidden(message),
            404 => ClientError::NotFound(message),
            409 => ClientError::Conflict(message),
            code => ClientError::Api {
                status: code,
                message,
            },
        })
    }

    // -- Auth --

    pub async fn register(&self, req: &RegisterRequest) -> Result<RegisterResponse, ClientError> {
        self.execute(self.http.post(self.url("/register")).json(req))
            .await
    }

    /// On success the access token becomes the session token.
    pub async fn login(&mut self, req: &LoginRequest) -> Result<LoginResponse, ClientError> {
        let response: LoginResponse = self
            .execute(self.http.post(self.url("/login")).json(req))
            .await?;
        self.token = Some(response.access_token.clone());
        Ok(response)
    }

    pub async fn refresh(&mut self, refresh_token: &str) -> Result<RefreshResponse, ClientError> {
        let response: RefreshResponse = self
            .execute(self.http.post(self.url("/refresh")).json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            }))
            .await?;
        self.token = Some(response.access_token.clone());
        Ok(response)
    }

    // -- Users --

    pub async fn current_user(&self) -> Result<CurrentUserResponse, ClientError> {
        self.execute(self.http.get(self.url("/user"))).await
    }

    pub async fn profile(&self, username: &str) -> Result<ProfileResponse, ClientError> {
        self.execute(self.http.get(self.url(&format!("/user/{username}"))))
            .await
    }

    pub async fn update_user(
        &self,
        username: &str,
        req: &UpdateUserRequest,
    ) -> Result<serde_json::Value, ClientError> {
        self.execute(
            self.http
                .put(self.url(&format!("/user/update/{username}")))
                .json(req),
        )
        .await
    }

    pub async fn delete_user(&self, username: &str) -> Result<serde_json::Value, ClientError> {
        self.execute(self.http.delete(self.url(&format!("/user/delete/{username}"))))
            .await
    }

    pub async fn search_users(&self, query: &str) -> Result<UserSearchResponse, ClientError> {
        self.execute(
            self.http
                .get(self.url("/user/search"))
                .query(&[("q", query)]),
        )
        .await
    }

    pub async fn follow(&self, user_id: Uuid) -> Result<FollowResponse, ClientError> {
        self.execute(self.http.post(self.url(&format!("/user/follow/{user_id}"))))
            .await
    }

    pub async fn unfollow(&self, user_id: Uuid) -> Result<FollowResponse, ClientError> {
        self.execute(self.http.post(self.url(&format!("/user/unfollow/{user_id}"))))
            .await
    }

    pub async fn followers(&self) -> Result<FollowListResponse, ClientError> {
        self.execute(self.http.get(self.url("/user/followers"))).await
    }

    pub async fn following(&self) -> Result<FollowListResponse, ClientError> {
        self.execute(self.http.get(self.url("/user/following"))).await
    }

    // -- Posts --

    pub async fn feed(&self, page: u32, per_page: u32) -> Result<FeedResponse, ClientError> {
        self.execute(
            self.http
                .get(self.url("/posts/feed"))
                .query(&[("page", page), ("per_page", per_page)]),
        )
        .await
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostView, ClientError> {
        self.execute(self.http.get(self.url(&format!("/posts/{post_id}"))))
            .await
    }

    pub async fn create_post(&self, req: &CreatePostRequest) -> Result<PostView, ClientError> {
        self.execute(self.http.post(self.url("/posts")).json(req)).await
    }

    pub async fn update_post(
        &self,
        post_id: Uuid,
        req: &UpdatePostRequest,
    ) -> Result<PostView, ClientError> {
        self.execute(self.http.put(self.url(&format!("/posts/{post_id}"))).json(req))
            .await
    }

    pub async fn delete_post(&self, post_id: Uuid) -> Result<serde_json::Value, ClientError> {
        self.execute(self.http.delete(self.url(&format!("/posts/{post_id}/delete"))))
            .await
    }

    pub async fn categories(&self) -> Result<CategoriesResponse, ClientError> {
        self.execute(self.http.get(self.url("/posts/categories"))).await
    }

    pub async fn user_posts(
        &self,
        user_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> Result<FeedResponse, ClientError> {
        self.execute(
            self.http
                .get(self.url(&format!("/posts/user/{user_id}")))
                .query(&[("page", page), ("per_page", per_page)]),
        )
        .await
    }

    // -- Likes --

    pub async fn like(&self, post_id: Uuid) -> Result<LikeResponse, ClientError> {
        self.execute(self.http.post(self.url(&format!("/likes/{post_id}"))))
            .await
    }

    pub async fn unlike(&self, post_id: Uuid) -> Result<LikeResponse, ClientError> {
        self.execute(self.http.delete(self.url(&format!("/likes/{post_id}"))))
            .await
    }

    // -- Comments --

    pub async fn comments(
        &self,
        post_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> Result<CommentsResponse, ClientError> {
        self.execute(
            self.http
                .get(self.url(&format!("/comments/{post_id}")))
                .query(&[("page", page), ("per_page", per_page)]),
        )
        .await
    }

    pub async fn create_comment(
        &self,
        post_id: Uuid,
        body: &str,
    ) -> Result<CommentView, ClientError> {
        self.execute(
            self.http
                .post(self.url(&format!("/comments/{post_id}")))
                .json(&CreateCommentRequest {
                    body: body.to_string(),
                }),
        )
        .await
    }

    pub async fn delete_comment(&self, comment_id: Uuid) -> Result<serde_json::Value, ClientError> {
        self.execute(self.http.delete(self.url(&format!("/comments/{comment_id}"))))
            .await
    }

    // -- Collections --

    pub async fn user_collections(
        &self,
        user_id: Uuid,
    ) -> Result<UserCollectionsResponse, ClientError> {
        self.execute(self.http.get(self.url(&format!("/collections/user/{user_id}"))))
            .await
    }

    pub async fn create_collection(
        &self,
        req: &CreateCollectionRequest,
    ) -> Result<serde_json::Value, ClientError> {
        self.execute(self.http.post(self.url("/collections")).json(req))
            .await
    }

    pub async fn update_collection(
        &self,
        collection_id: Uuid,
        req: &UpdateCollectionRequest,
    ) -> Result<serde_json::Value, ClientError> {
        self.execute(
            self.http
                .put(self.url(&format!("/collections/update/{collection_id}")))
                .json(req),
        )
        .await
    }

    pub async fn delete_collection(
        &self,
        collection_id: Uuid,
    ) -> Result<serde_json::Value, ClientError> {
        self.execute(
            self.http
                .delete(self.url(&format!("/collections/delete/{collection_id}"))),
        )
        .await
    }

    pub async fn collection_posts(
        &self,
        collection_id: Uuid,
    ) -> Result<CollectionPostsResponse, ClientError> {
        self.execute(
            self.http
                .get(self.url(&format!("/collections/{collection_id}/posts"))),
        )
        .await
    }

    pub async fn add_post_to_collection(
        &self,
        collection_id: Uuid,
        post_id: Uuid,
    ) -> Result<serde_json::Value, ClientError> {
        self.execute(
            self.http
                .post(self.url(&format!("/collections/{collection_id}/posts/{post_id}"))),
        )
        .await
    }

    pub async fn remove_post_from_collection(
        &self,
        collection_id: Uuid,
        post_id: Uuid,
    ) -> Result<serde_json::Value, ClientError> {
        self.execute(self.http.delete(self.url(&format!(
            "/collections/{collection_id}/posts/{post_id}/remove"
        ))))
        .await
    }
}
