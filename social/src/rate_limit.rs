//! Fixed-window rate limiting backed by the session cache.
//!
//! The counter increment and the conditional expiry execute as one atomic
//! pipelined unit in the cache, so concurrent bursts from the same client
//! cannot race past the cap. The window is fixed, not sliding: the expiry
//! is set on the first hit of a window and never refreshed.

use std::sync::Arc;

use bg_core::traits::SessionCache;
use errors::CoreError;

pub struct RateLimiter {
    cache: Arc<dyn SessionCache>,
    max_requests: u64,
    window_seconds: u64,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn SessionCache>, max_requests: u64, window_seconds: u64) -> Self {
        Self {
            cache,
            max_requests,
            window_seconds,
        }
    }

    /// Count one request for `client_key` (the client's network origin)
    /// and reject once the window cap is exceeded.
    pub async fn check(&self, client_key: &str) -> Result<(), CoreError> {
        let key = format!("rate_limit:{client_key}");
        let count = self
            .cache
            .incr_fixed_window(&key, self.window_seconds)
            .await
            .map_err(|e| CoreError::internal(e.to_string()))?;

        if count > self.max_requests {
            tracing::warn!(client_key, count, "rate limit exceeded");
            return Err(CoreError::RateLimited {
                retry_after: self.window_seconds,
            });
        }

        tracing::debug!(client_key, count, cap = self.max_requests, "rate check");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use testing::InMemorySessionCache;

    #[tokio::test]
    async fn sixth_request_in_window_is_rejected() {
        let cache = Arc::new(InMemorySessionCache::new());
        let limiter = RateLimiter::new(cache, 5, 60);

        for _ in 0..5 {
            limiter.check("10.0.0.1").await.unwrap();
        }
        let err = limiter.check("10.0.0.1").await.unwrap_err();
        assert_eq!(err.code(), "RATE_LIMITED");
    }

    #[tokio::test]
    async fn window_expiry_resets_the_counter() {
        let cache = Arc::new(InMemorySessionCache::new());
        let limiter = RateLimiter::new(cache.clone(), 5, 60);

        for _ in 0..5 {
            limiter.check("10.0.0.1").await.unwrap();
        }
        assert!(limiter.check("10.0.0.1").await.is_err());

        cache.advance(Duration::from_secs(61));
        limiter.check("10.0.0.1").await.unwrap();
    }

    #[tokio::test]
    async fn clients_are_limited_independently() {
        let cache = Arc::new(InMemorySessionCache::new());
        let limiter = RateLimiter::new(cache, 5, 60);

        for _ in 0..5 {
            limiter.check("10.0.0.1").await.unwrap();
        }
        assert!(limiter.check("10.0.0.1").await.is_err());
        limiter.check("10.0.0.2").await.unwrap();
    }
}
