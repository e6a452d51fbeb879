//! Credential hashing, token issuance and login.
//!
//! Passwords are hashed with Argon2 (salted, one-way) before they ever
//! reach the durable store. Tokens are HS256 JWTs whose expiry window
//! matches the session TTL in the cache; the cache entry, not the token
//! signature, is authoritative for session liveness.

use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use bg_core::traits::{IdentityStore, SessionCache};
use bg_core::types::Credentials;
use chrono::Utc;
use errors::CoreError;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, CoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|digest| digest.to_string())
        .map_err(|e| CoreError::internal(format!("password hashing failed: {e}")))
}

/// Verify a plaintext password against a stored digest. Any parse or
/// verification failure counts as a mismatch.
pub fn verify_password(plain: &str, digest: &str) -> bool {
    PasswordHash::new(digest)
        .map(|parsed| {
            Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// JWT claims. `user_id` is optional on the decode path: a token can carry
/// a valid signature yet a payload missing the subject, which the guard
/// treats as a distinct failure from a bad signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub exp: i64,
}

/// HS256 token issuance and verification.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_minutes: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_seconds: ttl_minutes * 60,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Issue a token for `user_id`, expiring after the configured TTL.
    pub fn issue(&self, user_id: i64) -> Result<String, CoreError> {
        let claims = Claims {
            sub: user_id.to_string(),
            user_id: Some(user_id),
            exp: Utc::now().timestamp() + self.ttl_seconds as i64,
        };
        self.sign(&claims)
    }

    /// Sign an arbitrary claims payload.
    pub fn sign(&self, claims: &Claims) -> Result<String, CoreError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| CoreError::internal(format!("token signing failed: {e}")))
    }

    /// Verify signature and expiry. Bad signature, expired and malformed
    /// all collapse into `Forbidden`.
    pub fn verify(&self, token: &str) -> Result<Claims, CoreError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| CoreError::forbidden("invalid token signature or expiration"))
    }
}

/// Login response. Both `token` and `access_token` carry the same value:
/// the former for the application clients, the latter for standard OAuth
/// tooling.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user_id: i64,
    pub token: String,
    pub access_token: String,
    pub token_type: String,
}

/// Login against the durable store, issuing a token and registering the
/// session in the cache.
pub struct AuthService {
    identity: Arc<dyn IdentityStore>,
    cache: Arc<dyn SessionCache>,
    tokens: Arc<TokenIssuer>,
}

impl AuthService {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        cache: Arc<dyn SessionCache>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            identity,
            cache,
            tokens,
        }
    }

    /// Verify credentials and open a session.
    ///
    /// A wrong email and a wrong password are indistinguishable to the
    /// caller.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, CoreError> {
        let user = self
            .identity
            .get_user_by_email(&credentials.email)
            .await
            .map_err(|e| CoreError::internal(e.to_string()))?;

        let Some(user) = user else {
            return Err(CoreError::unauthenticated("invalid email or password"));
        };
        if !verify_password(&credentials.password, &user.password_hash) {
            return Err(CoreError::unauthenticated("invalid email or password"));
        }

        let token = self.tokens.issue(user.id)?;
        self.cache
            .put_session(&token, user.id, self.tokens.ttl_seconds())
            .await
            .map_err(|e| CoreError::internal(e.to_string()))?;

        tracing::info!(user_id = user.id, "session opened");

        Ok(LoginResponse {
            message: "Login successful".to_string(),
            user_id: user.id,
            token: token.clone(),
            access_token: token,
            token_type: "bearer".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let digest = hash_password("hunter2!").unwrap();
        assert!(verify_password("hunter2!", &digest));
        assert!(!verify_password("hunter3!", &digest));
    }

    #[test]
    fn garbage_digest_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn token_round_trip_carries_user_id() {
        let issuer = TokenIssuer::new("a-test-secret-of-sufficient-length", 30);
        let token = issuer.issue(42).unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.user_id, Some(42));
        assert_eq!(claims.sub, "42");
    }

    #[test]
    fn expired_token_is_forbidden() {
        let issuer = TokenIssuer::new("a-test-secret-of-sufficient-length", 30);
        let claims = Claims {
            sub: "7".to_string(),
            user_id: Some(7),
            exp: Utc::now().timestamp() - 120,
        };
        let token = issuer.sign(&claims).unwrap();
        let err = issuer.verify(&token).unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn token_signed_with_other_secret_is_forbidden() {
        let issuer = TokenIssuer::new("a-test-secret-of-sufficient-length", 30);
        let other = TokenIssuer::new("a-different-secret-of-equal-size!!", 30);
        let token = other.issue(7).unwrap();
        let err = issuer.verify(&token).unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }
}
