use std::collections::BTreeSet;

use async_trait::async_trait;

use relaudit_core::{
    ColumnDescriptor, ColumnStatistic, ConstraintInfo, IndexInfo, OrphanedReference, Result,
    TableColumn, TriggerAction, TriggerInfo,
};

/// Audit query for one convention column.
///
/// Every identifier must come from the discovered catalog; implementations
/// quote them but do not re-validate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrphanProbe {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub parent_table: String,
    pub parent_column: String,
}

/// Maintenance trigger that stamps `column` on every update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
    pub schema: String,
    pub column: String,
    pub trigger_name: String,
    pub function_name: String,
}

impl TriggerSpec {
    /// Conventional names for a stamping trigger on `column`.
    pub fn for_column(schema: &str, column: &str) -> Self {
        Self {
            schema: schema.to_string(),
            column: column.to_string(),
            trigger_name: format!("set_{column}"),
            function_name: format!("relaudit_set_{column}"),
        }
    }
}

/// Read and maintenance access to a database catalog.
///
/// Unknown tables yield empty results rather than errors.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Base tables of `schema`, sorted by name.
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>>;

    /// Every column of every base table in `schema`.
    async fn list_schema_columns(&self, schema: &str) -> Result<Vec<TableColumn>>;

    async fn columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>>;

    async fn constraints(&self, schema: &str, table: &str) -> Result<Vec<ConstraintInfo>>;

    async fn triggers(&self, schema: &str, table: &str) -> Result<Vec<TriggerInfo>>;

    async fn indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexInfo>>;

    /// Planner statistics for every column of `table`.
    async fn column_statistics(&self, schema: &str, table: &str) -> Result<Vec<ColumnStatistic>>;

    /// Distinct non-null values of a column in text form, or `None` when
    /// there are more than `limit` of them.
    async fn distinct_values(
        &self,
        schema: &str,
        table: &str,
        column: &str,
        limit: usize,
    ) -> Result<Option<BTreeSet<String>>>;

    /// Non-null values without a parent row, grouped with their row counts.
    async fn orphaned_values(&self, probe: &OrphanProbe) -> Result<Vec<OrphanedReference>>;

    /// Create or replace the stamping function used by `spec`.
    async fn ensure_trigger_function(&self, spec: &TriggerSpec) -> Result<()>;

    /// Install the trigger on `table` unless it already exists.
    ///
    /// Runs in its own transaction; safe to repeat.
    async fn install_trigger(&self, spec: &TriggerSpec, table: &str) -> Result<TriggerAction>;
}
