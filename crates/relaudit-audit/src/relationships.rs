use std::collections::BTreeSet;

use relaudit_core::{
    FailureKind, RelationshipCandidate, Result, TableFailure, ValueSet, ensure_discovered,
    rank_candidates,
};
use relaudit_introspect::Catalog;

use crate::auditor::Auditor;
use crate::pool::run_bounded;

/// Candidates plus the columns that could not be compared.
#[derive(Debug, Default)]
pub(crate) struct RelationshipScan {
    pub candidates: Vec<RelationshipCandidate>,
    pub diagnostics: Vec<TableFailure>,
}

impl<C: Catalog> Auditor<C> {
    /// Undeclared foreign keys of `table` inferred from value overlap.
    ///
    /// Targets are the configured `candidate_tables`, or every other table
    /// up to `max_candidate_tables`.
    pub async fn detect_foreign_key_candidates(
        &self,
        table: &str,
    ) -> Result<Vec<RelationshipCandidate>> {
        let restrict = self.options().candidate_tables.as_deref();
        Ok(self.scan_relationships(table, restrict).await?.candidates)
    }

    /// Like [`Self::detect_foreign_key_candidates`], comparing only against
    /// `targets`. Every target must be a discovered table.
    pub async fn detect_foreign_key_candidates_among(
        &self,
        table: &str,
        targets: &[String],
    ) -> Result<Vec<RelationshipCandidate>> {
        Ok(self.scan_relationships(table, Some(targets)).await?.candidates)
    }

    pub(crate) async fn scan_relationships(
        &self,
        table: &str,
        restrict: Option<&[String]>,
    ) -> Result<RelationshipScan> {
        let schema = self.schema();
        let tables: BTreeSet<String> = self
            .catalog()
            .list_tables(schema)
            .await?
            .into_iter()
            .collect();
        if !tables.contains(table) {
            tracing::debug!(event = "table_not_found", table = %table);
            return Ok(RelationshipScan::default());
        }

        let targets = self.target_tables(table, &tables, restrict)?;
        let keys: Vec<(String, String)> = self
            .catalog()
            .list_schema_columns(schema)
            .await?
            .into_iter()
            .filter(|column| column.table == table || targets.contains(&column.table))
            .map(|column| (column.table, column.column))
            .collect();

        tracing::debug!(
            event = "relationship_scan_started",
            table = %table,
            targets = targets.len(),
            columns = keys.len()
        );

        let limit = self.options().max_distinct_values;
        let batch = run_bounded(keys, &self.limits(), |(owner, column)| async move {
            self.catalog()
                .distinct_values(schema, &owner, &column, limit)
                .await
        })
        .await;

        let mut scan = RelationshipScan::default();
        let mut sources = Vec::new();
        let mut others = Vec::new();
        for ((owner, column), result) in batch.finished {
            match result {
                Ok(Some(values)) => {
                    let set = ValueSet {
                        table: owner,
                        column,
                        values,
                    };
                    if set.table == table {
                        sources.push(set);
                    } else {
                        others.push(set);
                    }
                }
                Ok(None) => {
                    tracing::info!(
                        event = "column_skipped",
                        table = %owner,
                        column = %column,
                        max_distinct_values = limit
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        event = "distinct_values_failed",
                        table = %owner,
                        column = %column,
                        error = %err
                    );
                    scan.diagnostics.push(
                        TableFailure::new(&owner, FailureKind::Audit, err.to_string())
                            .with_column(&column),
                    );
                }
            }
        }
        for (owner, column) in batch.skipped {
            scan.diagnostics
                .push(TableFailure::cancelled(&owner).with_column(&column));
        }

        scan.candidates = rank_candidates(&sources, &others);
        tracing::info!(
            event = "relationship_scan_finished",
            table = %table,
            candidates = scan.candidates.len()
        );
        Ok(scan)
    }

    fn target_tables(
        &self,
        table: &str,
        tables: &BTreeSet<String>,
        restrict: Option<&[String]>,
    ) -> Result<BTreeSet<String>> {
        if let Some(names) = restrict {
            for name in names {
                ensure_discovered(name, tables)?;
            }
            return Ok(names
                .iter()
                .filter(|name| name.as_str() != table)
                .cloned()
                .collect());
        }

        let cap = self.options().max_candidate_tables;
        let others = tables.iter().filter(|name| name.as_str() != table);
        if tables.len().saturating_sub(1) > cap {
            tracing::info!(
                event = "candidate_tables_capped",
                table = %table,
                max_candidate_tables = cap
            );
        }
        Ok(others.take(cap).cloned().collect())
    }
}
