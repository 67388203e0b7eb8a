//! Bearer-token authentication for the REST API.
//!
//! Tokens are HS256 JWTs carrying the username, role and bound zone. The token is
//! the only session state; every request re-derives its [`Identity`] from the
//! `Authorization` header via the [`AuthUser`] extractor.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use refer_core::session::{Identity, Role};
use refer_core::{ReferError, ReferResult};

use crate::api::ApiError;
use crate::state::AppState;

/// JWT claim set.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Username.
    pub sub: String,
    pub role: String,
    /// Bound zone, for `hc` users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
    /// Expiry, seconds since the epoch.
    pub exp: usize,
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl_minutes: u64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_minutes: u64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl_minutes,
        }
    }

    pub fn issue(&self, identity: &Identity) -> ReferResult<String> {
        let exp = Utc::now() + chrono::Duration::minutes(self.ttl_minutes as i64);
        let claims = Claims {
            sub: identity.username.clone(),
            role: identity.role.as_str().to_string(),
            loc: identity.location.clone(),
            exp: exp.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| ReferError::Gateway(format!("token encode: {e}")))
    }

    /// Decode and validate a token. Every failure mode (bad signature, expired,
    /// malformed role) collapses to [`ReferError::Unauthorized`].
    pub fn verify(&self, token: &str) -> ReferResult<Identity> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &Validation::default(),
        )
        .map_err(|_| ReferError::Unauthorized)?;

        let role: Role = data
            .claims
            .role
            .parse()
            .map_err(|_| ReferError::Unauthorized)?;

        Ok(Identity::new(data.claims.sub, role, data.claims.loc))
    }
}

/// The authenticated caller, extracted from the `Authorization: Bearer` header.
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ReferError::Unauthorized)?;

        let identity = state.tokens.verify(token)?;
        Ok(AuthUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> TokenService {
        TokenService::new("test-secret", 60)
    }

    #[test]
    fn issued_tokens_verify_back_to_the_identity() {
        let service = tokens();
        let identity = Identity::new("nurse1", Role::Hc, Some("Ban Puan Phu HPH".into()));

        let token = service.issue(&identity).expect("issue");
        let verified = service.verify(&token).expect("verify");
        assert_eq!(verified, identity);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let identity = Identity::new("clerk", Role::Hospital, None);
        let token = tokens().issue(&identity).expect("issue");

        let other = TokenService::new("other-secret", 60);
        assert!(matches!(
            other.verify(&token),
            Err(ReferError::Unauthorized)
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let service = tokens();
        let past = Utc::now() - chrono::Duration::hours(2);
        let claims = Claims {
            sub: "clerk".into(),
            role: "hospital".into(),
            loc: None,
            exp: past.timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .expect("encode");

        assert!(matches!(
            service.verify(&token),
            Err(ReferError::Unauthorized)
        ));
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert!(tokens().verify("not-a-token").is_err());
    }
}
