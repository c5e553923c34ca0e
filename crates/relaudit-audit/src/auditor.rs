use tokio_util::sync::CancellationToken;

use relaudit_core::{
    ColumnStatistic, Result, TableDescription, TriggerSummary, UniquenessReport, score_columns,
    validate_description,
};
use relaudit_introspect::Catalog;

use crate::options::AuditOptions;
use crate::pool::RunLimits;

/// Snapshot reads attempted before an inconsistent catalog is reported.
const MAX_DESCRIBE_ATTEMPTS: usize = 3;

/// Schema audit engine over a [`Catalog`].
///
/// Holds no state between operations besides its options and cancellation
/// token; every call re-reads the catalog.
#[derive(Debug)]
pub struct Auditor<C> {
    catalog: C,
    options: AuditOptions,
    cancel: CancellationToken,
}

impl<C: Catalog> Auditor<C> {
    pub fn new(catalog: C, options: AuditOptions) -> Self {
        Self {
            catalog,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Use a caller-owned token to stop issuing per-table work.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &AuditOptions {
        &self.options
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub(crate) fn schema(&self) -> &str {
        &self.options.schema
    }

    pub(crate) fn limits(&self) -> RunLimits {
        RunLimits {
            parallelism: self.options.parallelism(),
            timeout: self.options.timeout(),
            cancel: self.cancel.clone(),
        }
    }

    /// Columns, constraints, triggers and indexes of `table`.
    ///
    /// An unknown table yields an empty description. A snapshot whose
    /// ordinals or constraint columns are inconsistent is read again.
    pub async fn describe_table(&self, table: &str) -> Result<TableDescription> {
        let mut attempt = 1;
        loop {
            let description = self.read_description(table).await?;
            match validate_description(&description) {
                Ok(()) => return Ok(description),
                Err(err) if attempt >= MAX_DESCRIBE_ATTEMPTS => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        event = "snapshot_inconsistent",
                        table = %table,
                        attempt = attempt,
                        error = %err
                    );
                    attempt += 1;
                }
            }
        }
    }

    async fn read_description(&self, table: &str) -> Result<TableDescription> {
        let schema = self.schema();
        let columns = self.catalog.columns(schema, table).await?;
        if columns.is_empty() {
            tracing::debug!(event = "table_not_found", table = %table);
            return Ok(TableDescription::empty(schema, table));
        }

        let (constraints, triggers, indexes) = futures::try_join!(
            self.catalog.constraints(schema, table),
            self.catalog.triggers(schema, table),
            self.catalog.indexes(schema, table),
        )?;
        let trigger_summary = TriggerSummary::from_triggers(&triggers);

        Ok(TableDescription {
            schema: schema.to_string(),
            table: table.to_string(),
            columns,
            constraints,
            triggers,
            indexes,
            trigger_summary,
        })
    }

    /// Planner statistics for `table`; empty when they cannot be read.
    pub async fn column_statistics(&self, table: &str) -> Vec<ColumnStatistic> {
        match self.catalog.column_statistics(self.schema(), table).await {
            Ok(statistics) => statistics,
            Err(err) => {
                tracing::warn!(event = "statistics_unavailable", table = %table, error = %err);
                Vec::new()
            }
        }
    }

    /// Score every column of `table` for uniqueness.
    ///
    /// Missing statistics degrade to ratio 0 with a diagnostic.
    pub async fn analyze_uniqueness(&self, table: &str) -> Result<UniquenessReport> {
        let (description, statistics) =
            futures::join!(self.describe_table(table), self.column_statistics(table));
        Ok(score_columns(&description?, &statistics))
    }
}
