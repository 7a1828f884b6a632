use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{extract::State, response::IntoResponse, Json};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use flashnews_db::Database;
use flashnews_types::api::{
    Claims, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest,
    RegisterResponse, TokenKind,
};

use crate::error::{ApiError, ApiResult};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

const ACCESS_TOKEN_DAYS: i64 = 1;
const REFRESH_TOKEN_DAYS: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim();
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::Validation(
            "Username must be between 3 and 32 characters".into(),
        ));
    }
    if !is_plausible_email(&req.email) {
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    // Uniqueness is case-insensitive on username; the stored casing is
    // preserved for display.
    if state.db.get_user_by_username(username)?.is_some() {
        return Err(ApiError::Validation("Username already taken".into()));
    }
    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::Validation("Email already registered".into()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();
    let now = chrono::Utc::now();

    state.db.create_user(
        &user_id.to_string(),
        username,
        &req.email,
        &password_hash,
        &now.to_rfc3339(),
    )?;

    Ok(Json(RegisterResponse {
        user_id,
        username: username.to_string(),
        email: req.email,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or(ApiError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored password hash unreadable: {}", e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username.clone(),
        access_token: create_token(&state.jwt_secret, user_id, &user.username, TokenKind::Access)?,
        refresh_token: create_token(
            &state.jwt_secret,
            user_id,
            &user.username,
            TokenKind::Refresh,
        )?,
    }))
}

/// Exchange a refresh token for a fresh access token.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let token_data = decode::<Claims>(
        &req.refresh_token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    if token_data.claims.typ != TokenKind::Refresh {
        return Err(ApiError::Unauthorized);
    }

    Ok(Json(RefreshResponse {
        access_token: create_token(
            &state.jwt_secret,
            token_data.claims.sub,
            &token_data.claims.username,
            TokenKind::Access,
        )?,
    }))
}

fn create_token(
    secret: &str,
    user_id: Uuid,
    username: &str,
    kind: TokenKind,
) -> anyhow::Result<String> {
    let days = match kind {
        TokenKind::Access => ACCESS_TOKEN_DAYS,
        TokenKind::Refresh => REFRESH_TOKEN_DAYS,
    };
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(days)).timestamp() as usize,
        typ: kind,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(is_plausible_email("alice@example.com"));
        assert!(is_plausible_email("a.b@news.example.org"));
        assert!(!is_plausible_email("alice"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("alice@nodot"));
        assert!(!is_plausible_email("alice@.com"));
    }

    #[test]
    fn token_round_trip_preserves_kind() {
        let id = Uuid::new_v4();
        let token = create_token("test-secret", id, "alice", TokenKind::Refresh).unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, id);
        assert_eq!(data.claims.typ, TokenKind::Refresh);
    }
}
