//! Session guard: bearer-token validation backed by the session cache.
//!
//! Per-request state machine: Unauthenticated → TokenPresent → TokenValid
//! → SessionActive → Authorized, rejecting at the first failed transition.
//! The token signature proves integrity only; the cache entry is
//! authoritative for liveness, so a mathematically valid token whose
//! session key has expired is still rejected.

use std::sync::Arc;

use bg_core::traits::SessionCache;
use errors::CoreError;

use crate::auth::{Claims, TokenIssuer};

/// The identity attached to a request after all guard checks pass.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub claims: Claims,
}

pub struct SessionGuard {
    tokens: Arc<TokenIssuer>,
    cache: Arc<dyn SessionCache>,
}

impl SessionGuard {
    pub fn new(tokens: Arc<TokenIssuer>, cache: Arc<dyn SessionCache>) -> Self {
        Self { tokens, cache }
    }

    /// Validate the `Authorization` header value for one request.
    pub async fn authorize(
        &self,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedUser, CoreError> {
        let header = authorization
            .ok_or_else(|| CoreError::unauthenticated("not authenticated"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| CoreError::forbidden("invalid authentication scheme"))?;

        let claims = self.tokens.verify(token)?;

        // Valid signature but no subject: malformed payload, a distinct
        // condition from a signature failure.
        let user_id = claims
            .user_id
            .ok_or_else(|| CoreError::unauthenticated("token payload missing user id"))?;

        let active = self
            .cache
            .session_exists(token)
            .await
            .map_err(|e| CoreError::internal(e.to_string()))?;
        if !active {
            return Err(CoreError::unauthenticated("session expired or logged out"));
        }

        Ok(AuthenticatedUser { user_id, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bg_core::traits::SessionCache as _;
    use chrono::Utc;
    use testing::InMemorySessionCache;

    fn issuer() -> Arc<TokenIssuer> {
        Arc::new(TokenIssuer::new("a-test-secret-of-sufficient-length", 30))
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let guard = SessionGuard::new(issuer(), Arc::new(InMemorySessionCache::new()));
        let err = guard.authorize(None).await.unwrap_err();
        assert_eq!(err.code(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_forbidden() {
        let guard = SessionGuard::new(issuer(), Arc::new(InMemorySessionCache::new()));
        let err = guard.authorize(Some("Basic dXNlcg==")).await.unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn garbage_token_is_forbidden() {
        let guard = SessionGuard::new(issuer(), Arc::new(InMemorySessionCache::new()));
        let err = guard
            .authorize(Some("Bearer not.a.jwt"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn valid_token_without_user_id_is_unauthenticated() {
        let tokens = issuer();
        let cache = Arc::new(InMemorySessionCache::new());
        let claims = Claims {
            sub: "7".to_string(),
            user_id: None,
            exp: Utc::now().timestamp() + 600,
        };
        let token = tokens.sign(&claims).unwrap();
        cache.put_session(&token, 7, 600).await.unwrap();

        let guard = SessionGuard::new(tokens, cache);
        let err = guard
            .authorize(Some(&format!("Bearer {token}")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn valid_token_with_absent_session_is_unauthenticated() {
        let tokens = issuer();
        let cache = Arc::new(InMemorySessionCache::new());
        let token = tokens.issue(7).unwrap();
        // No session stored: signature verification alone must not grant
        // access.
        let guard = SessionGuard::new(tokens, cache);
        let err = guard
            .authorize(Some(&format!("Bearer {token}")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHENTICATED");
        assert!(err.to_string().contains("session expired"));
    }

    #[tokio::test]
    async fn live_session_authorizes() {
        let tokens = issuer();
        let cache = Arc::new(InMemorySessionCache::new());
        let token = tokens.issue(7).unwrap();
        cache.put_session(&token, 7, 1800).await.unwrap();

        let guard = SessionGuard::new(tokens, cache.clone());
        let authed = guard
            .authorize(Some(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert_eq!(authed.user_id, 7);
    }

    #[tokio::test]
    async fn session_expiry_revokes_access() {
        let tokens = issuer();
        let cache = Arc::new(InMemorySessionCache::new());
        let token = tokens.issue(7).unwrap();
        cache.put_session(&token, 7, 60).await.unwrap();
        cache.advance(std::time::Duration::from_secs(61));

        let guard = SessionGuard::new(tokens, cache);
        let err = guard
            .authorize(Some(&format!("Bearer {token}")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHENTICATED");
    }
}
