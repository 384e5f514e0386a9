use crate::auth::models::{JwtClaims, UserContext};
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use glossa_core::AppError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;

/// Shared state for the auth middleware: the HS256 decoding key and the
/// validation settings applied to every token.
#[derive(Clone)]
pub struct AuthState {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthState {
    pub fn from_secret(jwt_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
        }
    }
}

/// Validate and decode a bearer token into its claims.
pub fn decode_token(token: &str, auth_state: &AuthState) -> Result<JwtClaims, AppError> {
    let token_data = decode::<JwtClaims>(token, &auth_state.decoding_key, &auth_state.validation)
        .map_err(|e| {
        tracing::debug!("JWT validation failed: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Unauthorized("Token has expired".to_string())
            }
            jsonwebtoken::errors::ErrorKind::ImmatureSignature => {
                AppError::Unauthorized("Token is not yet valid (nbf)".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                AppError::Unauthorized("Invalid token signature".to_string())
            }
            _ => AppError::Unauthorized(format!("Invalid or expired token: {}", e)),
        }
    })?;
    Ok(token_data.claims)
}

/// Authentication middleware for all protected routes.
///
/// Expects `Authorization: Bearer <jwt>`; on success a [`UserContext`] is
/// inserted into request extensions for handlers to extract.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    if !auth_header.starts_with("Bearer ") {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    }

    let token = &auth_header[7..]; // Remove "Bearer " prefix

    let claims = match decode_token(token, &auth_state) {
        Ok(claims) => claims,
        Err(e) => return HttpAppError(e).into_response(),
    };

    request.extensions_mut().insert(UserContext::from(&claims));

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    const SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

    fn make_token(secret: &str, exp_offset_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            sub: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            exp: now + exp_offset_secs,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode token")
    }

    #[test]
    fn test_decode_token_accepts_valid_token() {
        let auth_state = AuthState::from_secret(SECRET);
        let token = make_token(SECRET, 3600);
        let claims = decode_token(&token, &auth_state).expect("valid token");
        assert_eq!(claims.email, "ana@example.com");
    }

    #[test]
    fn test_decode_token_rejects_expired_token() {
        let auth_state = AuthState::from_secret(SECRET);
        let token = make_token(SECRET, -3600);
        let err = decode_token(&token, &auth_state).unwrap_err();
        match err {
            AppError::Unauthorized(msg) => assert_eq!(msg, "Token has expired"),
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_token_rejects_wrong_secret() {
        let auth_state = AuthState::from_secret(SECRET);
        let token = make_token("a-completely-different-32-character-secret", 3600);
        let err = decode_token(&token, &auth_state).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_decode_token_rejects_garbage() {
        let auth_state = AuthState::from_secret(SECRET);
        let err = decode_token("not-a-jwt", &auth_state).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
