//! Request identity from a bearer token issued by the sign-in service.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use db::models::user::UserRole;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use services::services::identity::Caller;
use tracing::debug;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: u64,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Caller {
            id: claims.sub,
            role: claims.role,
            name: claims.name,
        }
    }
}

pub fn decode_caller(key: &DecodingKey, token: &str) -> Result<Caller, ApiError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, key, &validation).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        ApiError::InvalidToken
    })?;
    Ok(data.claims.into())
}

/// The caller behind a request, or `None` when no `Authorization` header was sent.
/// A header that is present but invalid rejects the request.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<Caller>);

impl MaybeCaller {
    pub fn caller(&self) -> Option<&Caller> {
        self.0.as_ref()
    }
}

impl FromRequestParts<DeploymentImpl> for MaybeCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(MaybeCaller(None));
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InvalidToken)?;

        let caller = decode_caller(state.auth_key(), bearer.token())?;
        Ok(MaybeCaller(Some(caller)))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;
    use db::DBService;
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;
    use crate::config::Config;

    const SECRET: &[u8] = b"test-secret";

    async fn deployment() -> DeploymentImpl {
        let config = Config::from_lookup(|key| {
            (key == "AUTH_JWT_SECRET").then(|| String::from_utf8_lossy(SECRET).into_owned())
        })
        .unwrap();
        DeploymentImpl::new(DBService::new_in_memory().await.unwrap(), &config)
    }

    async fn extract(authorization: Option<&str>) -> Result<MaybeCaller, ApiError> {
        let mut request = Request::builder().uri("/api/queues");
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        let (mut parts, _) = request.body(()).unwrap().into_parts();
        MaybeCaller::from_request_parts(&mut parts, &deployment().await).await
    }

    fn token(claims: &Claims, secret: &[u8]) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn claims(exp_offset_secs: i64) -> Claims {
        let exp = chrono::Utc::now().timestamp() + exp_offset_secs;
        Claims {
            sub: Uuid::new_v4(),
            role: UserRole::Barber,
            name: Some("Joe".to_string()),
            exp: exp as u64,
        }
    }

    #[test]
    fn valid_token_yields_caller() {
        let claims = claims(3600);
        let caller = decode_caller(&DecodingKey::from_secret(SECRET), &token(&claims, SECRET)).unwrap();
        assert_eq!(caller.id, claims.sub);
        assert_eq!(caller.role, UserRole::Barber);
        assert_eq!(caller.name.as_deref(), Some("Joe"));
    }

    #[test]
    fn expired_or_foreign_tokens_are_rejected() {
        let key = DecodingKey::from_secret(SECRET);

        let expired = token(&claims(-3600), SECRET);
        assert!(matches!(decode_caller(&key, &expired), Err(ApiError::InvalidToken)));

        let foreign = token(&claims(3600), b"someone-else");
        assert!(matches!(decode_caller(&key, &foreign), Err(ApiError::InvalidToken)));

        assert!(matches!(decode_caller(&key, "not-a-jwt"), Err(ApiError::InvalidToken)));
    }

    #[tokio::test]
    async fn missing_header_is_anonymous() {
        let MaybeCaller(caller) = extract(None).await.unwrap();
        assert!(caller.is_none());
    }

    #[tokio::test]
    async fn bearer_token_becomes_the_caller() {
        let claims = claims(3600);
        let header = format!("Bearer {}", token(&claims, SECRET));
        let MaybeCaller(caller) = extract(Some(&header)).await.unwrap();
        let caller = caller.unwrap();
        assert_eq!(caller.id, claims.sub);
        assert_eq!(caller.role, UserRole::Barber);
    }

    #[tokio::test]
    async fn present_but_unusable_header_is_rejected() {
        let foreign = format!("Bearer {}", token(&claims(3600), b"someone-else"));
        for header in ["Basic xyz", "Bearer not-a-jwt", "Bearer", foreign.as_str()] {
            assert!(
                matches!(extract(Some(header)).await, Err(ApiError::InvalidToken)),
                "{header}"
            );
        }
    }
}
