//! # Configuration
//!
//! Environment-driven configuration for the bookgraph backend, following
//! 12-factor principles: every store connection and policy knob comes from
//! the environment with a sensible local-development default.

mod config;

pub use config::{
    AuthConfig, BookgraphConfig, ConfigError, MongoConfig, Neo4jConfig, PostgresConfig,
    RateLimitConfig, RedisConfig, ServerConfig,
};
pub use validator::Validate;
