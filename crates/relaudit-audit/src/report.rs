use relaudit_core::{Result, TableReport, column_defaults, suggest_constraints};
use relaudit_introspect::Catalog;

use crate::auditor::Auditor;

impl<C: Catalog> Auditor<C> {
    /// Merge description, uniqueness, relationships, defaults and constraint
    /// suggestions for `table` into one report.
    ///
    /// Sections are read in turn; only the relationship scan fans out.
    pub async fn compose_report(&self, table: &str) -> Result<TableReport> {
        let restrict = self.options().candidate_tables.as_deref();
        let description = self.describe_table(table).await?;
        let statistics = self.column_statistics(table).await;
        let scan = self.scan_relationships(table, restrict).await?;

        let uniqueness = relaudit_core::score_columns(&description, &statistics);
        let mut diagnostics = uniqueness.diagnostics.clone();
        diagnostics.extend(scan.diagnostics);

        tracing::info!(
            event = "report_composed",
            table = %table,
            columns = description.columns.len(),
            diagnostics = diagnostics.len()
        );

        Ok(TableReport {
            schema: description.schema.clone(),
            table: description.table.clone(),
            column_count: description.columns.len(),
            trigger_summary: description.trigger_summary.clone(),
            uniqueness,
            relationships: scan.candidates,
            defaults: column_defaults(&description),
            suggestions: suggest_constraints(&description),
            diagnostics,
        })
    }
}
