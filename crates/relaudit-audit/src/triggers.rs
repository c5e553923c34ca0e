use relaudit_core::{AuditOutcome, FailureKind, Result, TableFailure, TriggerAction, TriggerOutcome};
use relaudit_introspect::Catalog;

use crate::auditor::Auditor;
use crate::pool::run_bounded;

impl<C: Catalog> Auditor<C> {
    /// Install the update-stamping trigger on every table that carries the
    /// audit column.
    ///
    /// Each table is handled in its own transaction; repeating the call
    /// reports `AlreadyPresent` for tables done earlier.
    pub async fn ensure_update_triggers(&self) -> Result<AuditOutcome<TriggerOutcome>> {
        let spec = self.options().trigger_spec();
        let schema = self.schema();

        let mut tables: Vec<String> = self
            .catalog()
            .list_schema_columns(schema)
            .await?
            .into_iter()
            .filter(|column| column.column == spec.column)
            .map(|column| column.table)
            .collect();
        tables.sort();
        tables.dedup();

        if tables.is_empty() {
            tracing::info!(event = "no_audit_column", column = %spec.column);
            return Ok(AuditOutcome::default());
        }

        if let Err(err) = self.catalog().ensure_trigger_function(&spec).await {
            tracing::error!(
                event = "trigger_function_failed",
                function = %spec.function_name,
                error = %err
            );
            let message = format!("stamping function unavailable: {err}");
            return Ok(AuditOutcome {
                items: Vec::new(),
                failures: tables
                    .iter()
                    .map(|table| TableFailure::new(table, FailureKind::Ddl, message.clone()))
                    .collect(),
            });
        }

        let spec = &spec;
        let batch = run_bounded(tables, &self.limits(), |table| async move {
            self.catalog().install_trigger(spec, &table).await
        })
        .await;

        let mut outcome = AuditOutcome::default();
        for table in batch.skipped {
            outcome.failures.push(TableFailure::cancelled(&table));
        }
        for (table, result) in batch.finished {
            match result {
                Ok(action) => {
                    match action {
                        TriggerAction::Installed => tracing::info!(
                            event = "trigger_installed",
                            table = %table,
                            trigger = %spec.trigger_name
                        ),
                        TriggerAction::AlreadyPresent => tracing::debug!(
                            event = "trigger_present",
                            table = %table,
                            trigger = %spec.trigger_name
                        ),
                    }
                    outcome.items.push(TriggerOutcome { table, action });
                }
                Err(err) => {
                    tracing::warn!(event = "trigger_install_failed", table = %table, error = %err);
                    outcome
                        .failures
                        .push(TableFailure::new(&table, FailureKind::Ddl, err.to_string()));
                }
            }
        }

        outcome.items.sort_by(|left, right| left.table.cmp(&right.table));
        outcome.failures.sort_by(|left, right| left.table.cmp(&right.table));
        Ok(outcome)
    }
}
