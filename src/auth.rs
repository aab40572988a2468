use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use headers::{Authorization, authorization::Bearer};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::{errors::AppError, models::Claims, state::AppState};

pub struct AuthClaims(pub Claims);

/// Same as [`AuthClaims`] but rejects tokens without the admin role.
pub struct AdminClaims(pub Claims);

impl FromRequestParts<AppState> for AuthClaims {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    (
                        StatusCode::UNAUTHORIZED,
                        "Missing or invalid Authorization header".into(),
                    )
                })?;

        AuthClaims::from_token(bearer.token(), &state.config.jwt_secret)
            .map_err(|e| e.to_response())
    }
}

impl FromRequestParts<AppState> for AdminClaims {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthClaims(claims) = AuthClaims::from_request_parts(parts, state).await?;

        if !claims.is_admin() {
            tracing::warn!("Non-admin user {} attempted an admin action", claims.sub);
            return Err(AppError::Forbidden("Admin privileges required".into()).to_response());
        }

        Ok(AdminClaims(claims))
    }
}

impl AuthClaims {
    pub fn from_token(token: &str, secret: &str) -> Result<Self, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        Ok(Self(token_data.claims))
    }
}

impl Claims {
    pub fn user_id(&self) -> Result<i32, AppError> {
        self.sub
            .parse::<i32>()
            .map_err(|_| AppError::Unauthorized("Invalid user ID in token".into()))
    }
}

pub fn generate_jwt(user_id: i32, role: &str, secret: &str) -> Result<String, AppError> {
    let expiration = (Utc::now() + Duration::hours(24)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(AppError::JwtError)
}
