//! Key-value adapter for session tracking and rate-limit counters.

use async_trait::async_trait;
use bg_core::traits::SessionCache;
use errors::StoreError;
use redis::AsyncCommands;

pub struct RedisSessionCache {
    connection_manager: redis::aio::ConnectionManager,
}

fn query_error(err: redis::RedisError) -> StoreError {
    StoreError::Query {
        backend: "Redis".to_string(),
        reason: err.to_string(),
    }
}

fn session_key(token: &str) -> String {
    format!("session:{token}")
}

impl RedisSessionCache {
    pub async fn new(connection_string: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(connection_string).map_err(|e| StoreError::Connection {
                backend: "Redis".to_string(),
                reason: e.to_string(),
            })?;

        let connection_manager =
            client
                .get_connection_manager()
                .await
                .map_err(|e| StoreError::Connection {
                    backend: "Redis".to_string(),
                    reason: e.to_string(),
                })?;

        Ok(Self { connection_manager })
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn put_session(
        &self,
        token: &str,
        user_id: i64,
        ttl_seconds: u64,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection_manager.clone();
        conn.set_ex::<_, _, ()>(session_key(token), user_id, ttl_seconds)
            .await
            .map_err(query_error)
    }

    async fn session_exists(&self, token: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection_manager.clone();
        conn.exists(session_key(token)).await.map_err(query_error)
    }

    async fn incr_fixed_window(
        &self,
        key: &str,
        window_seconds: u64,
    ) -> Result<u64, StoreError> {
        let mut conn = self.connection_manager.clone();

        // INCR and conditional EXPIRE run as one atomic pipeline. NX keeps
        // the window fixed: the expiry is set on the first hit only, never
        // refreshed by later requests.
        let (count,): (u64,) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(key)
            .cmd("EXPIRE")
            .arg(key)
            .arg(window_seconds)
            .arg("NX")
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(query_error)?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_keys_are_namespaced() {
        assert_eq!(session_key("abc.def.ghi"), "session:abc.def.ghi");
    }
}
