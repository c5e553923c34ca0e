use std::collections::{BTreeMap, BTreeSet};

use relaudit_core::{
    AuditOutcome, ConstraintKind, FailureKind, ForeignKeyAudit, ForeignKeyConvention,
    IntegrityFinding, OrphanedReference, ParentRef, Result, TableFailure, ensure_discovered,
    foreign_key_sql, resolve_parent,
};
use relaudit_introspect::{Catalog, OrphanProbe};

use crate::auditor::Auditor;
use crate::pool::{Batch, run_bounded};

/// Convention column located in the catalog.
#[derive(Debug, Clone)]
struct ConventionColumn {
    table: String,
    column: String,
    parent: ParentRef,
    has_column: bool,
}

/// Discovered tables and the columns each one carries.
struct Discovery {
    tables: BTreeSet<String>,
    columns: BTreeMap<String, BTreeSet<String>>,
}

impl Discovery {
    fn has_column(&self, table: &str, column: &str) -> bool {
        self.columns
            .get(table)
            .is_some_and(|columns| columns.contains(column))
    }
}

impl<C: Catalog> Auditor<C> {
    /// Convention columns and whether a foreign key is declared on them.
    ///
    /// Tables whose constraints cannot be read are reported in `failures`.
    pub async fn find_columns_needing_foreign_key(&self) -> Result<AuditOutcome<ForeignKeyAudit>> {
        let discovery = self.discover().await?;
        let found = self.convention_columns(&discovery);

        let mut by_table: BTreeMap<String, Vec<ConventionColumn>> = BTreeMap::new();
        for item in found {
            by_table.entry(item.table.clone()).or_default().push(item);
        }

        let schema = self.schema();
        let keys: Vec<String> = by_table.keys().cloned().collect();
        let batch = run_bounded(keys, &self.limits(), |table| async move {
            self.catalog().constraints(schema, &table).await
        })
        .await;

        let mut outcome = AuditOutcome {
            items: Vec::new(),
            failures: collect_failures(&batch, "table_audit_failed"),
        };
        for (table, result) in batch.finished {
            let Ok(constraints) = result else {
                continue;
            };
            for item in by_table.remove(&table).unwrap_or_default() {
                let declared = constraints.iter().find(|constraint| {
                    constraint.kind == ConstraintKind::ForeignKey && constraint.involves(&item.column)
                });
                let sql = (item.has_column && declared.is_none())
                    .then(|| foreign_key_sql(schema, &item.table, &item.column, &item.parent));
                outcome.items.push(ForeignKeyAudit {
                    table: item.table,
                    column: item.column,
                    parent_table: item.parent.table,
                    has_column: item.has_column,
                    has_declared_foreign_key: declared.is_some(),
                    constraint_name: declared.map(|constraint| constraint.name.clone()),
                    on_delete: declared.and_then(|constraint| constraint.on_delete),
                    sql,
                });
            }
        }

        outcome
            .items
            .sort_by(|left, right| (&left.table, &left.column).cmp(&(&right.table, &right.column)));
        tracing::info!(
            event = "foreign_key_audit_finished",
            rows = outcome.items.len(),
            missing = outcome.items.iter().filter(|item| item.needs_foreign_key()).count(),
            failures = outcome.failures.len()
        );
        Ok(outcome)
    }

    /// Convention-column values without a matching parent row.
    ///
    /// One probe per convention column; a failing probe is recorded and the
    /// rest still run. Never modifies data.
    pub async fn find_orphaned_references(&self) -> Result<AuditOutcome<OrphanedReference>> {
        let discovery = self.discover().await?;
        let probes = self.orphan_probes(&discovery)?;

        let batch = run_bounded(probes, &self.limits(), |probe| async move {
            self.catalog().orphaned_values(&probe).await
        })
        .await;

        let mut outcome = AuditOutcome::default();
        for probe in &batch.skipped {
            outcome
                .failures
                .push(TableFailure::cancelled(&probe.table).with_column(&probe.column));
        }
        for (probe, result) in batch.finished {
            match result {
                Ok(rows) => outcome.items.extend(rows),
                Err(err) => {
                    tracing::warn!(
                        event = "orphan_probe_failed",
                        table = %probe.table,
                        column = %probe.column,
                        error = %err
                    );
                    outcome.failures.push(
                        TableFailure::new(&probe.table, FailureKind::Audit, err.to_string())
                            .with_column(&probe.column),
                    );
                }
            }
        }

        outcome.items.sort_by(|left, right| {
            (&left.table, &left.column, &left.offending_value).cmp(&(
                &right.table,
                &right.column,
                &right.offending_value,
            ))
        });
        tracing::info!(
            event = "orphan_audit_finished",
            orphans = outcome.items.len(),
            failures = outcome.failures.len()
        );
        Ok(outcome)
    }

    /// Missing foreign keys and orphaned values in one outcome.
    ///
    /// The two audits run one after the other so at most `max_parallelism`
    /// per-table queries are in flight.
    pub async fn audit_integrity(&self) -> Result<AuditOutcome<IntegrityFinding>> {
        let missing = self.find_columns_needing_foreign_key().await?;
        let orphans = self.find_orphaned_references().await?;

        let mut outcome = AuditOutcome {
            items: Vec::new(),
            failures: missing.failures,
        };
        outcome.items.extend(
            missing
                .items
                .into_iter()
                .filter(ForeignKeyAudit::needs_foreign_key)
                .map(|item| IntegrityFinding::MissingForeignKey {
                    table: item.table,
                    column: item.column,
                }),
        );
        outcome
            .items
            .extend(orphans.items.into_iter().map(IntegrityFinding::from));
        outcome.failures.extend(orphans.failures);
        Ok(outcome)
    }

    async fn discover(&self) -> Result<Discovery> {
        let schema = self.schema();
        let (tables, schema_columns) = futures::try_join!(
            self.catalog().list_tables(schema),
            self.catalog().list_schema_columns(schema),
        )?;

        let mut columns: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for item in schema_columns {
            columns.entry(item.table).or_default().insert(item.column);
        }
        tracing::debug!(event = "catalog_discovered", tables = tables.len());

        Ok(Discovery {
            tables: tables.into_iter().collect(),
            columns,
        })
    }

    /// Apply every convention; the first convention to claim a column wins.
    fn convention_columns(&self, discovery: &Discovery) -> Vec<ConventionColumn> {
        let mut found: BTreeMap<(String, String), ConventionColumn> = BTreeMap::new();

        for convention in &self.options().conventions {
            match convention {
                ForeignKeyConvention::Column {
                    column,
                    parent_table,
                    parent_column,
                } => {
                    if !discovery.tables.contains(parent_table) {
                        tracing::debug!(
                            event = "convention_parent_missing",
                            column = %column,
                            parent_table = %parent_table
                        );
                        continue;
                    }
                    for table in discovery.tables.iter().filter(|table| *table != parent_table) {
                        found
                            .entry((table.clone(), column.clone()))
                            .or_insert_with(|| ConventionColumn {
                                table: table.clone(),
                                column: column.clone(),
                                parent: ParentRef {
                                    table: parent_table.clone(),
                                    column: parent_column.clone(),
                                },
                                has_column: discovery.has_column(table, column),
                            });
                    }
                }
                ForeignKeyConvention::IdSuffix { .. } => {
                    let rule = std::slice::from_ref(convention);
                    for (table, columns) in &discovery.columns {
                        for column in columns {
                            let Some(parent) = resolve_parent(rule, column, &discovery.tables)
                            else {
                                continue;
                            };
                            found
                                .entry((table.clone(), column.clone()))
                                .or_insert_with(|| ConventionColumn {
                                    table: table.clone(),
                                    column: column.clone(),
                                    parent,
                                    has_column: true,
                                });
                        }
                    }
                }
            }
        }

        found.into_values().collect()
    }

    /// Probes for convention columns whose table and parent both exist.
    fn orphan_probes(&self, discovery: &Discovery) -> Result<Vec<OrphanProbe>> {
        let mut probes = Vec::new();
        for item in self.convention_columns(discovery) {
            if !item.has_column {
                continue;
            }
            if !discovery.has_column(&item.parent.table, &item.parent.column) {
                tracing::debug!(
                    event = "parent_column_missing",
                    table = %item.table,
                    column = %item.column,
                    parent_table = %item.parent.table,
                    parent_column = %item.parent.column
                );
                continue;
            }
            ensure_discovered(&item.table, &discovery.tables)?;
            ensure_discovered(&item.parent.table, &discovery.tables)?;
            probes.push(OrphanProbe {
                schema: self.schema().to_string(),
                table: item.table,
                column: item.column,
                parent_table: item.parent.table,
                parent_column: item.parent.column,
            });
        }
        Ok(probes)
    }
}

fn collect_failures<T>(batch: &Batch<String, T>, event: &'static str) -> Vec<TableFailure> {
    let mut failures: Vec<TableFailure> = batch
        .skipped
        .iter()
        .map(|table| TableFailure::cancelled(table))
        .collect();
    for (table, result) in &batch.finished {
        if let Err(err) = result {
            tracing::warn!(event = event, table = %table, error = %err);
            failures.push(TableFailure::new(table, FailureKind::Audit, err.to_string()));
        }
    }
    failures
}
