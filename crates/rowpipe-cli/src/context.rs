//! Settings and connections shared by every command

use rowpipe_server::config::Config;
use rowpipe_server::db;
use rowpipe_server::jobs::PgStore;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;

/// Loaded configuration plus the command-line overrides
pub struct Context {
    pub config: Config,
}

impl Context {
    /// Load the worker's environment configuration; `--database-url` wins over `DATABASE_URL`
    pub fn load(database_url: Option<String>) -> Result<Self> {
        let mut config = Config::load()?;
        if let Some(url) = database_url {
            config.database.url = url;
            config.database.validate()?;
        }
        Ok(Self::new(config))
    }

    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Connect to PostgreSQL and bring the schema up to date
    pub async fn connect(&self) -> Result<Arc<PgStore>> {
        let pool = db::create_pool(&self.config.database).await?;
        db::health_check(&pool).await?;
        db::run_migrations(&pool).await?;
        debug!("Connected to PostgreSQL");
        Ok(Arc::new(PgStore::new(pool)))
    }
}
