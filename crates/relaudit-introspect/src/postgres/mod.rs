use std::collections::BTreeSet;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use relaudit_core::{
    ColumnDescriptor, ColumnStatistic, ConstraintInfo, IndexInfo, OrphanedReference, Result,
    TableColumn, TriggerAction, TriggerInfo,
};

use crate::adapter::{Catalog, OrphanProbe, TriggerSpec};
use crate::options::ConnectOptions;

mod mapper;
mod queries;

/// Catalog backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Create a new catalog using a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Open a pool for `url` according to `opts`.
pub async fn connect(url: &str, opts: &ConnectOptions) -> Result<PostgresCatalog> {
    let statement_timeout = opts.statement_timeout.map(|timeout| timeout.as_millis());

    let pool = PgPoolOptions::new()
        .max_connections(opts.max_connections)
        .acquire_timeout(opts.acquire_timeout)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                if let Some(millis) = statement_timeout {
                    conn.execute(format!("set statement_timeout = {millis}").as_str())
                        .await?;
                }
                Ok(())
            })
        })
        .connect(url)
        .await
        .map_err(|err| relaudit_core::Error::Db(err.to_string()))?;

    tracing::debug!(
        event = "pool_connected",
        max_connections = opts.max_connections
    );

    Ok(PostgresCatalog::new(pool))
}

#[async_trait::async_trait]
impl Catalog for PostgresCatalog {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        queries::list_tables(&self.pool, schema).await
    }

    async fn list_schema_columns(&self, schema: &str) -> Result<Vec<TableColumn>> {
        let raw = queries::list_schema_columns(&self.pool, schema).await?;
        Ok(mapper::map_schema_columns(raw))
    }

    async fn columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let raw = queries::list_columns(&self.pool, schema, table).await?;
        Ok(mapper::map_columns(raw))
    }

    async fn constraints(&self, schema: &str, table: &str) -> Result<Vec<ConstraintInfo>> {
        let raw = queries::list_constraint_columns(&self.pool, schema, table).await?;
        Ok(mapper::map_constraints(raw))
    }

    async fn triggers(&self, schema: &str, table: &str) -> Result<Vec<TriggerInfo>> {
        let raw = queries::list_triggers(&self.pool, schema, table).await?;
        Ok(mapper::map_triggers(raw, table))
    }

    async fn indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexInfo>> {
        let raw = queries::list_indexes(&self.pool, schema, table).await?;
        Ok(mapper::map_indexes(raw))
    }

    async fn column_statistics(&self, schema: &str, table: &str) -> Result<Vec<ColumnStatistic>> {
        let raw = queries::list_column_statistics(&self.pool, schema, table).await?;
        Ok(mapper::map_statistics(raw))
    }

    async fn distinct_values(
        &self,
        schema: &str,
        table: &str,
        column: &str,
        limit: usize,
    ) -> Result<Option<BTreeSet<String>>> {
        queries::fetch_distinct_values(&self.pool, schema, table, column, limit).await
    }

    async fn orphaned_values(&self, probe: &OrphanProbe) -> Result<Vec<OrphanedReference>> {
        queries::fetch_orphaned_values(&self.pool, probe).await
    }

    async fn ensure_trigger_function(&self, spec: &TriggerSpec) -> Result<()> {
        queries::create_trigger_function(&self.pool, spec).await
    }

    async fn install_trigger(&self, spec: &TriggerSpec, table: &str) -> Result<TriggerAction> {
        queries::install_trigger(&self.pool, spec, table).await
    }
}
