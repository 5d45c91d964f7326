use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::{debug, error};

use commons_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// The user making the request, if their bearer token checks out.
#[derive(Debug, Clone, Default)]
pub struct Viewer(Option<Claims>);

impl Viewer {
    pub fn claims(&self) -> Option<&Claims> {
        self.0.as_ref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|c| c.sub)
    }

    /// The viewer's claims, or a 401 carrying `message`.
    pub fn require(&self, message: &'static str) -> Result<&Claims, ApiError> {
        self.0.as_ref().ok_or(ApiError::Unauthorized(message))
    }
}

/// Resolves the optional bearer token into a `Viewer` extension.
///
/// A missing, malformed, expired or revoked token leaves the request
/// anonymous; handlers decide whether that warrants a 401.
pub async fn resolve_viewer(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let claims = bearer_token(req.headers()).and_then(|token| {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| debug!("Rejected bearer token: {}", e))
        .ok()
        .map(|data| data.claims)
    });

    let claims = match claims {
        Some(claims) => match is_revoked(&state, &claims).await {
            Ok(false) => Some(claims),
            Ok(true) => {
                debug!("Revoked token presented by {}", claims.username);
                None
            }
            Err(e) => {
                error!("Token revocation lookup failed: {}", e);
                None
            }
        },
        None => None,
    };

    req.extensions_mut().insert(Viewer(claims));
    next.run(req).await
}

async fn is_revoked(state: &AppState, claims: &Claims) -> Result<bool, ApiError> {
    let jti = claims.jti.to_string();
    blocking(state, move |s| Ok(s.db.is_token_revoked(&jti)?)).await
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}
