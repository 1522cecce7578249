use std::sync::Arc;

use anyhow::Context;
use chrono::FixedOffset;
use sqlx::PgPool;

use shopfloor_infra::store::{
    InMemoryProductionStore, InMemoryToolStore, PostgresProductionStore, PostgresToolStore,
    ProductionStore, ToolStore, ensure_schema,
};
use shopfloor_infra::{ProductionLog, StockLedger};

use crate::config::ApiConfig;

pub type DynToolStore = Arc<dyn ToolStore>;
pub type DynProductionStore = Arc<dyn ProductionStore>;

/// Shared handles for every request.
pub struct AppServices {
    pub ledger: StockLedger<DynToolStore>,
    pub production: ProductionLog<DynProductionStore>,
    /// Offset used to render timestamps in responses.
    pub utc_offset: FixedOffset,
}

impl AppServices {
    pub fn new(tools: DynToolStore, production: DynProductionStore, utc_offset: FixedOffset) -> Self {
        Self {
            ledger: StockLedger::new(tools),
            production: ProductionLog::new(production),
            utc_offset,
        }
    }

    pub fn in_memory(utc_offset: FixedOffset) -> Self {
        Self::new(
            Arc::new(InMemoryToolStore::new()),
            Arc::new(InMemoryProductionStore::new()),
            utc_offset,
        )
    }
}

pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => build_persistent_services(url, config.utc_offset).await,
        None => {
            tracing::info!("using in-memory stores");
            Ok(AppServices::in_memory(config.utc_offset))
        }
    }
}

async fn build_persistent_services(
    database_url: &str,
    utc_offset: FixedOffset,
) -> anyhow::Result<AppServices> {
    let pool = PgPool::connect(database_url)
        .await
        .context("failed to connect to Postgres")?;
    ensure_schema(&pool)
        .await
        .context("failed to prepare database schema")?;
    tracing::info!("using Postgres stores");

    Ok(AppServices::new(
        Arc::new(PostgresToolStore::new(pool.clone())),
        Arc::new(PostgresProductionStore::new(pool)),
        utc_offset,
    ))
}
