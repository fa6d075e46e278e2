use crate::{errors::AppError, models::Claims, state::AppState};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;
use uuid::Uuid;

/// Authenticated caller, resolved from the bearer token issued by the session service.
/// Add `auth: AuthActor` as a parameter in any handler that requires authentication.
#[derive(Debug, Clone)]
pub struct AuthActor {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub role: Option<String>,
}

impl AuthActor {
    pub fn role_label(&self) -> &str {
        self.role.as_deref().unwrap_or("unassigned")
    }
}

impl FromRequestParts<AppState> for AuthActor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let headers: &HeaderMap = &parts.headers;

        let auth_header = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format".to_string()))?;

        let actor = decode_token(token, &state.config.jwt_secret)?;
        debug!(
            "Authenticated {} ({}) as {} for company {}",
            actor.name,
            actor.user_id,
            actor.role_label(),
            actor.company_id
        );
        Ok(actor)
    }
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthActor, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    let claims = token_data.claims;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
    let company_id = Uuid::parse_str(&claims.company_id).map_err(|_| AppError::InvalidToken)?;

    Ok(AuthActor {
        user_id,
        company_id,
        name: claims.name,
        role: claims.role,
    })
}
