use argon2::{PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use commons_db::models::UserRow;
use commons_db::{Database, DbError};
use commons_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest, UserView};

use crate::error::{ApiError, method_not_allowed};
use crate::extract::{non_blank, parse_json};
use crate::middleware::Viewer;
use crate::state::{AppState, blocking};

const USERNAME_TAKEN: &str = "Username already taken.";
const BAD_CREDENTIALS: &str = "Invalid username and/or password.";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register).fallback(method_not_allowed("POST request required.")))
        .route("/login", post(login).fallback(method_not_allowed("POST request required.")))
        .route("/logout", post(logout).fallback(method_not_allowed("POST request required.")))
        .route("/check_auth", get(check_auth).fallback(method_not_allowed("GET request required.")))
}

pub async fn register(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse, ApiError> {
    let req: RegisterRequest = parse_json(&body)?;

    // Passwords are compared untrimmed; only blankness is checked.
    let (Some(username), Some(email), Some(password), Some(confirmation)) = (
        non_blank(req.username),
        non_blank(req.email),
        req.password.filter(|p| !p.trim().is_empty()),
        req.confirmation.filter(|p| !p.trim().is_empty()),
    ) else {
        return Err(ApiError::bad_request("All fields are required."));
    };

    if password != confirmation {
        return Err(ApiError::bad_request("Passwords must match."));
    }

    // Check if username is taken before paying for the hash
    let name = username.clone();
    let taken = blocking(&state, move |s| Ok(s.db.get_user_by_username(&name)?.is_some())).await?;
    if taken {
        return Err(ApiError::bad_request(USERNAME_TAKEN));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = state
        .hasher
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .to_string();

    let user = blocking(&state, move |s| {
        // The UNIQUE constraint catches a registration racing the check above.
        let id = match s.db.create_user(&username, &email, &password_hash) {
            Ok(id) => id,
            Err(DbError::Integrity(_)) => return Err(ApiError::bad_request(USERNAME_TAKEN)),
            Err(e) => return Err(e.into()),
        };
        let row = s.db.get_user_by_id(id)?.ok_or(ApiError::Database)?;
        Ok(user_view(&s.db, &row)?)
    })
    .await?;

    let token = create_token(&state, user.id, &user.username)?;
    info!("Registered user {} ({})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registration successful",
            user,
            token,
        }),
    ))
}

pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<impl IntoResponse, ApiError> {
    let req: LoginRequest = parse_json(&body)?;

    let (Some(username), Some(password)) = (
        non_blank(req.username),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Username and password are required."));
    };

    let row = blocking(&state, move |s| Ok(s.db.get_user_by_username(&username)?))
        .await?
        .ok_or(ApiError::Unauthorized(BAD_CREDENTIALS))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&row.password).map_err(|e| ApiError::Internal(e.to_string()))?;
    state
        .hasher
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized(BAD_CREDENTIALS))?;

    let user = blocking(&state, move |s| Ok(user_view(&s.db, &row)?)).await?;
    let token = create_token(&state, user.id, &user.username)?;

    Ok(Json(AuthResponse {
        message: "Login successful",
        user,
        token,
    }))
}

/// Revokes the presented token. Other tokens of the same user stay valid.
pub async fn logout(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = viewer
        .claims()
        .ok_or_else(|| ApiError::bad_request("No user is currently logged in."))?;

    let jti = claims.jti.to_string();
    blocking(&state, move |s| Ok(s.db.revoke_token(&jti)?)).await?;
    info!("User {} logged out", claims.username);

    Ok(Json(json!({ "message": "Logged out successfully." })))
}

pub async fn check_auth(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    const NOT_AUTHENTICATED: &str = "User not authenticated";

    let user_id = viewer.user_id().ok_or(ApiError::Unauthorized(NOT_AUTHENTICATED))?;
    let user = blocking(&state, move |s| match s.db.get_user_by_id(user_id)? {
        Some(row) => Ok(Some(user_view(&s.db, &row)?)),
        None => Ok(None),
    })
    .await?
    .ok_or(ApiError::Unauthorized(NOT_AUTHENTICATED))?;

    Ok(Json(json!({ "message": "User is authenticated", "user": user })))
}

pub(crate) fn user_view(db: &Database, row: &UserRow) -> Result<UserView, DbError> {
    let (following_count, follower_count) = db.follow_counts(row.id)?;
    Ok(UserView {
        id: row.id,
        username: row.username.clone(),
        email: row.email.clone(),
        following_count,
        follower_count,
    })
}

pub(crate) fn create_token(state: &AppState, user_id: i64, username: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        jti: Uuid::new_v4(),
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.to_string()))
}
