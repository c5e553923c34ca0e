#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use relaudit_core::{
    ColumnDescriptor, ColumnStatistic, ConstraintInfo, ConstraintKind, Error, FkAction, IndexInfo,
    OrphanedReference, Result, TableColumn, TriggerAction, TriggerInfo,
};
use relaudit_introspect::{Catalog, OrphanProbe, TriggerSpec};

#[derive(Debug, Clone)]
pub struct MemoryColumn {
    pub name: String,
    pub declared_type: String,
    pub values: Vec<Option<String>>,
}

/// Table held entirely in memory, column-major.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub columns: Vec<MemoryColumn>,
    pub constraints: Vec<ConstraintInfo>,
    pub indexes: Vec<IndexInfo>,
    pub statistics: Vec<ColumnStatistic>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: &str, declared_type: &str, values: &[Option<&str>]) -> Self {
        self.columns.push(MemoryColumn {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            values: values.iter().map(|value| value.map(str::to_string)).collect(),
        });
        self
    }

    pub fn ints(self, name: &str, values: &[i64]) -> Self {
        let values: Vec<String> = values.iter().map(i64::to_string).collect();
        let refs: Vec<Option<&str>> = values.iter().map(|value| Some(value.as_str())).collect();
        self.column(name, "integer", &refs)
    }

    pub fn primary_key(mut self, column: &str) -> Self {
        self.constraints.push(ConstraintInfo {
            kind: ConstraintKind::PrimaryKey,
            name: format!("{column}_pkey"),
            columns: vec![column.to_string()],
            referenced_table: None,
            referenced_columns: None,
            on_delete: None,
        });
        self
    }

    pub fn foreign_key(mut self, column: &str, parent: &str, on_delete: FkAction) -> Self {
        self.constraints.push(ConstraintInfo {
            kind: ConstraintKind::ForeignKey,
            name: format!("{column}_fkey"),
            columns: vec![column.to_string()],
            referenced_table: Some(parent.to_string()),
            referenced_columns: Some(vec!["id".to_string()]),
            on_delete: Some(on_delete),
        });
        self
    }

    pub fn statistic(mut self, column: &str, distinct: Option<f64>, rows: f64) -> Self {
        self.statistics.push(ColumnStatistic {
            column: column.to_string(),
            distinct_estimate: distinct,
            null_fraction: 0.0,
            total_rows_estimate: rows,
        });
        self
    }

    fn values(&self, column: &str) -> Option<&[Option<String>]> {
        self.columns
            .iter()
            .find(|item| item.name == column)
            .map(|item| item.values.as_slice())
    }
}

/// `Catalog` over in-memory tables with injectable failures.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: BTreeMap<String, MemoryTable>,
    failing: BTreeSet<String>,
    fail_trigger_function: bool,
    triggers: Mutex<BTreeMap<String, Vec<String>>>,
    functions: Mutex<BTreeSet<String>>,
    gapped_reads: Mutex<BTreeMap<String, usize>>,
    column_reads: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, table: MemoryTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    /// Every per-table query against `name` fails.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn failing_trigger_function(mut self) -> Self {
        self.fail_trigger_function = true;
        self
    }

    pub fn with_trigger(self, table: &str, trigger: &str) -> Self {
        self.triggers
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(trigger.to_string());
        self
    }

    /// The next `reads` column listings of `table` skip ordinal 2.
    pub fn with_gapped_reads(self, table: &str, reads: usize) -> Self {
        self.gapped_reads
            .lock()
            .unwrap()
            .insert(table.to_string(), reads);
        self
    }

    pub fn column_reads(&self) -> usize {
        self.column_reads.load(Ordering::SeqCst)
    }

    /// Most per-table queries observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Count a per-table query as running across one scheduler yield.
    async fn track(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn take_gapped_read(&self, table: &str) -> bool {
        let mut gapped = self.gapped_reads.lock().unwrap();
        match gapped.get_mut(table) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn trigger_names(&self, table: &str) -> Vec<String> {
        self.triggers
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self, table: &str) -> Result<()> {
        if self.failing.contains(table) {
            Err(Error::Db(format!("relation {table} is locked")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    fn engine(&self) -> &'static str {
        "memory"
    }

    async fn list_tables(&self, _schema: &str) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn list_schema_columns(&self, _schema: &str) -> Result<Vec<TableColumn>> {
        Ok(self
            .tables
            .iter()
            .flat_map(|(table, data)| {
                data.columns.iter().map(move |column| TableColumn {
                    table: table.clone(),
                    column: column.name.clone(),
                    declared_type: column.declared_type.clone(),
                })
            })
            .collect())
    }

    async fn columns(&self, _schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.column_reads.fetch_add(1, Ordering::SeqCst);
        let Some(data) = self.tables.get(table) else {
            return Ok(Vec::new());
        };
        let gap = i32::from(self.take_gapped_read(table));
        Ok(data
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| ColumnDescriptor {
                ordinal: index as i32 + 1 + if index > 0 { gap } else { 0 },
                name: column.name.clone(),
                declared_type: column.declared_type.clone(),
                nullable: column.values.iter().any(Option::is_none),
                default_expr: None,
                key_constraints: data
                    .constraints
                    .iter()
                    .filter(|constraint| constraint.involves(&column.name))
                    .map(|constraint| constraint.name.clone())
                    .collect(),
            })
            .collect())
    }

    async fn constraints(&self, _schema: &str, table: &str) -> Result<Vec<ConstraintInfo>> {
        self.track().await;
        self.check(table)?;
        Ok(self
            .tables
            .get(table)
            .map(|data| data.constraints.clone())
            .unwrap_or_default())
    }

    async fn triggers(&self, _schema: &str, table: &str) -> Result<Vec<TriggerInfo>> {
        Ok(self
            .trigger_names(table)
            .into_iter()
            .map(|name| TriggerInfo {
                name,
                table: table.to_string(),
            })
            .collect())
    }

    async fn indexes(&self, _schema: &str, table: &str) -> Result<Vec<IndexInfo>> {
        Ok(self
            .tables
            .get(table)
            .map(|data| data.indexes.clone())
            .unwrap_or_default())
    }

    async fn column_statistics(&self, _schema: &str, table: &str) -> Result<Vec<ColumnStatistic>> {
        self.check(table)?;
        Ok(self
            .tables
            .get(table)
            .map(|data| data.statistics.clone())
            .unwrap_or_default())
    }

    async fn distinct_values(
        &self,
        _schema: &str,
        table: &str,
        column: &str,
        limit: usize,
    ) -> Result<Option<BTreeSet<String>>> {
        self.track().await;
        self.check(table)?;
        let values: BTreeSet<String> = self
            .tables
            .get(table)
            .and_then(|data| data.values(column))
            .unwrap_or_default()
            .iter()
            .flatten()
            .cloned()
            .collect();
        Ok((values.len() <= limit).then_some(values))
    }

    async fn orphaned_values(&self, probe: &OrphanProbe) -> Result<Vec<OrphanedReference>> {
        self.track().await;
        self.check(&probe.table)?;
        let parents: BTreeSet<&String> = self
            .tables
            .get(&probe.parent_table)
            .and_then(|data| data.values(&probe.parent_column))
            .unwrap_or_default()
            .iter()
            .flatten()
            .collect();

        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        let children = self
            .tables
            .get(&probe.table)
            .and_then(|data| data.values(&probe.column))
            .unwrap_or_default();
        for value in children.iter().flatten() {
            if !parents.contains(value) {
                *counts.entry(value.clone()).or_default() += 1;
            }
        }

        Ok(counts
            .into_iter()
            .map(|(offending_value, occurrence_count)| OrphanedReference {
                table: probe.table.clone(),
                column: probe.column.clone(),
                offending_value,
                occurrence_count,
            })
            .collect())
    }

    async fn ensure_trigger_function(&self, spec: &TriggerSpec) -> Result<()> {
        if self.fail_trigger_function {
            return Err(Error::Db("permission denied for schema public".to_string()));
        }
        self.functions
            .lock()
            .unwrap()
            .insert(spec.function_name.clone());
        Ok(())
    }

    async fn install_trigger(&self, spec: &TriggerSpec, table: &str) -> Result<TriggerAction> {
        self.check(table)?;
        if !self.functions.lock().unwrap().contains(&spec.function_name) {
            return Err(Error::Db(format!("function {} does not exist", spec.function_name)));
        }
        let mut triggers = self.triggers.lock().unwrap();
        let names = triggers.entry(table.to_string()).or_default();
        if names.contains(&spec.trigger_name) {
            return Ok(TriggerAction::AlreadyPresent);
        }
        names.push(spec.trigger_name.clone());
        Ok(TriggerAction::Installed)
    }
}

/// `customers` and `orders` with one order pointing at a missing customer.
pub fn shop() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_table(
            "customers",
            MemoryTable::new()
                .ints("id", &[1, 2])
                .column(
                    "email",
                    "character varying(255)",
                    &[Some("a@example.com"), Some("b@example.com")],
                )
                .column(
                    "updated_at",
                    "timestamp with time zone",
                    &[Some("2024-01-01"), None],
                )
                .primary_key("id"),
        )
        .with_table(
            "orders",
            MemoryTable::new()
                .ints("id", &[10, 11, 12, 13])
                .ints("customer_id", &[1, 1, 2, 3])
                .column("status", "text", &[Some("new"), None, Some("paid"), Some("new")])
                .column(
                    "updated_at",
                    "timestamp with time zone",
                    &[None, None, None, None],
                )
                .primary_key("id"),
        )
}
