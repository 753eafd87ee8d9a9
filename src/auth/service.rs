use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (user_id as string)
    pub exp: usize,  // Expiration time (as UTC timestamp)
    pub iat: usize,  // Issued at
}

impl Claims {
    /// Numeric user id carried by the token
    pub fn user_id(&self) -> i64 {
        self.sub.parse::<i64>().unwrap_or_default()
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Verifies bearer tokens issued by the external auth service
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    /// Verify JWT and return Claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )?;
        Ok(token_data.claims)
    }

    /// Issue a token for the given user id (operator tooling and tests;
    /// production tokens come from the auth service)
    pub fn issue_token(&self, user_id: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::hours(24)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify_roundtrip() {
        let auth = AuthService::new("test-secret".to_string());
        let token = auth.issue_token(1001).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.user_id(), 1001);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let issuer = AuthService::new("secret-a".to_string());
        let verifier = AuthService::new("secret-b".to_string());
        let token = issuer.issue_token(1001).unwrap();
        assert!(verifier.verify_token(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        let auth = AuthService::new("test-secret".to_string());
        assert!(auth.verify_token("not-a-jwt").is_err());
    }
}
