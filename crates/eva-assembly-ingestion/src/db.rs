//! Metadata database connection pool

use crate::config::AssemblyConfig;
use crate::error::Result;
use eva_common::maven::MavenProfile;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl DbConfig {
    pub fn from_assembly_config(config: &AssemblyConfig, profile: &MavenProfile) -> Result<Self> {
        Ok(Self {
            url: config.metadata_database_url(profile)?,
            max_connections: config.max_connections(),
            connect_timeout_secs: config.connect_timeout_secs(),
        })
    }

    /// Connection settings for a bare URL, used by tools without an assembly config
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: crate::config::DEFAULT_DATABASE_MAX_CONNECTIONS,
            connect_timeout_secs: crate::config::DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
        }
    }
}

pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        "Metadata database connection pool created"
    );

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url_defaults() {
        let config = DbConfig::from_url("postgresql://localhost/evapro");
        assert_eq!(config.max_connections, crate::config::DEFAULT_DATABASE_MAX_CONNECTIONS);
        assert!(config.url.ends_with("/evapro"));
    }
}
