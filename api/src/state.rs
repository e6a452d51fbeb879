//! Shared application state for the bookgraph API.

use std::sync::Arc;
use std::time::Duration;

use bg_core::traits::{CatalogStore, IdentityStore, SessionCache, SocialGraphStore};
use config::BookgraphConfig;
use social::{
    AuthService, CatalogService, RateLimiter, RecommendationEngine, SessionGuard, TokenIssuer,
    WriteCoordinator,
};
use sqlx::PgPool;
use storage::{MongoCatalogStore, Neo4jGraphStore, PostgresIdentityStore, RedisSessionCache};

use crate::error::{ApiError, Result};

/// Shared state for Axum handlers: the service layer plus the relational
/// pool kept around for health checks.
pub struct AppState {
    pub coordinator: WriteCoordinator,
    pub auth: AuthService,
    pub guard: SessionGuard,
    pub catalog: CatalogService,
    pub engine: RecommendationEngine,
    pub limiter: RateLimiter,
    pub config: Arc<BookgraphConfig>,
    /// `None` when the state was assembled from in-memory stores.
    pub pool: Option<PgPool>,
}

impl AppState {
    /// Connect all four backends and assemble the service layer. Schema
    /// and index setup run here so a fresh deployment is self-contained.
    pub async fn connect(config: BookgraphConfig) -> Result<Self> {
        let identity = PostgresIdentityStore::new(
            &config.postgres.url,
            config.postgres.max_connections,
        )
        .await
        .map_err(startup)?;
        identity.ensure_schema().await.map_err(startup)?;
        let pool = identity.pool().clone();

        let catalog = MongoCatalogStore::new(&config.mongo.uri, &config.mongo.database)
            .await
            .map_err(startup)?;
        catalog.ensure_indexes().await.map_err(startup)?;

        let cache = RedisSessionCache::new(&config.redis.url)
            .await
            .map_err(startup)?;

        let graph = Neo4jGraphStore::new(
            &config.neo4j.uri,
            &config.neo4j.user,
            &config.neo4j.password,
            Duration::from_millis(config.neo4j.op_timeout_ms),
        )
        .await
        .map_err(startup)?;

        Ok(Self::assemble(
            Arc::new(identity),
            Arc::new(catalog),
            Arc::new(cache),
            Arc::new(graph),
            config,
            Some(pool),
        ))
    }

    /// Assemble the state from already-built stores. Used by tests with
    /// in-memory fakes.
    pub fn with_stores(
        identity: Arc<dyn IdentityStore>,
        catalog: Arc<dyn CatalogStore>,
        cache: Arc<dyn SessionCache>,
        graph: Arc<dyn SocialGraphStore>,
        config: BookgraphConfig,
    ) -> Self {
        Self::assemble(identity, catalog, cache, graph, config, None)
    }

    fn assemble(
        identity: Arc<dyn IdentityStore>,
        catalog: Arc<dyn CatalogStore>,
        cache: Arc<dyn SessionCache>,
        graph: Arc<dyn SocialGraphStore>,
        config: BookgraphConfig,
        pool: Option<PgPool>,
    ) -> Self {
        let tokens = Arc::new(TokenIssuer::new(
            &config.auth.jwt_secret,
            config.auth.token_ttl_minutes,
        ));

        Self {
            coordinator: WriteCoordinator::new(identity.clone(), catalog.clone(), graph.clone()),
            auth: AuthService::new(identity, cache.clone(), tokens.clone()),
            guard: SessionGuard::new(tokens, cache.clone()),
            catalog: CatalogService::new(catalog),
            engine: RecommendationEngine::new(graph),
            limiter: RateLimiter::new(
                cache,
                config.rate_limit.max_requests,
                config.rate_limit.window_seconds,
            ),
            config: Arc::new(config),
            pool,
        }
    }
}

fn startup(err: errors::StoreError) -> ApiError {
    ApiError::Server(err.to_string())
}
