use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::shared::AppError;

/// Claims carried by a player's bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerClaims {
    pub user_id: String,
    pub exp: usize,
}

/// Verifies HMAC-signed player tokens issued by the account service
#[derive(Clone)]
pub struct TokenVerifier {
    secret: String,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    /// Issues a token; used by tooling and tests, the game itself only verifies
    #[instrument(skip(self))]
    pub fn create_token(&self, user_id: &str, valid_for: Duration) -> Result<String, AppError> {
        let claims = PlayerClaims {
            user_id: user_id.to_string(),
            exp: (Utc::now() + valid_for).timestamp().max(0) as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode JWT token");
            AppError::JwtError(e.to_string())
        })
    }

    /// Validates signature and expiry, returning the claims
    #[instrument(skip(self, token))]
    pub fn verify(&self, token: &str) -> Result<PlayerClaims, AppError> {
        decode::<PlayerClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(user_id = %data.claims.user_id, exp = data.claims.exp, "JWT token verified");
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            AppError::JwtError(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_verify_token() {
        let verifier = TokenVerifier::new("test-secret");
        let token = verifier.create_token("alice", Duration::hours(1)).unwrap();

        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.user_id, "alice");
        assert!(claims.exp as i64 > Utc::now().timestamp());
    }

    #[test]
    fn test_invalid_token() {
        let verifier = TokenVerifier::new("test-secret");
        let result = verifier.verify("invalid.token.here");
        assert!(matches!(result, Err(AppError::JwtError(_))));
    }

    #[test]
    fn test_token_with_different_secret() {
        let issuer = TokenVerifier::new("secret-one");
        let other = TokenVerifier::new("secret-two");
        let token = issuer.create_token("alice", Duration::hours(1)).unwrap();

        assert!(issuer.verify(&token).is_ok());
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = TokenVerifier::new("test-secret");
        let token = verifier.create_token("alice", Duration::hours(-2)).unwrap();

        assert!(verifier.verify(&token).is_err());
    }
}
