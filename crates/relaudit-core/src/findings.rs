use serde::{Deserialize, Serialize};

use crate::constraints::FkAction;

/// Category of a per-table diagnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A read-only audit query failed for this table.
    Audit,
    /// A DDL statement failed for this table.
    Ddl,
    /// Planner statistics were missing; the column was scored as ratio 0.
    StatisticsUnavailable,
    /// The operation was cancelled or timed out before this table started.
    Cancelled,
}

/// Diagnostic recorded for one table (and optionally one column).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableFailure {
    pub table: String,
    pub column: Option<String>,
    pub kind: FailureKind,
    pub message: String,
}

impl TableFailure {
    pub fn new(table: &str, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            table: table.to_string(),
            column: None,
            kind,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }

    pub fn statistics_unavailable(table: &str, column: &str) -> Self {
        Self::new(
            table,
            FailureKind::StatisticsUnavailable,
            "no planner statistics collected",
        )
        .with_column(column)
    }

    pub fn cancelled(table: &str) -> Self {
        Self::new(table, FailureKind::Cancelled, "not started before cancellation")
    }
}

/// Partial result of a table-set-wide operation.
///
/// `failures` lists tables whose work failed or never started; the operation
/// itself still succeeded for everything in `items`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditOutcome<T> {
    pub items: Vec<T>,
    pub failures: Vec<TableFailure>,
}

impl<T> Default for AuditOutcome<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> AuditOutcome<T> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> AuditOutcome<U> {
        AuditOutcome {
            items: self.items.into_iter().map(f).collect(),
            failures: self.failures,
        }
    }
}

/// Convention-column audit row for one table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForeignKeyAudit {
    pub table: String,
    pub column: String,
    pub parent_table: String,
    pub has_column: bool,
    pub has_declared_foreign_key: bool,
    pub constraint_name: Option<String>,
    pub on_delete: Option<FkAction>,
    /// Statement declaring the missing foreign key; set only when
    /// [`Self::needs_foreign_key`] holds.
    pub sql: Option<String>,
}

impl ForeignKeyAudit {
    pub fn needs_foreign_key(&self) -> bool {
        self.has_column && !self.has_declared_foreign_key
    }

    pub fn constraint_label(&self) -> &str {
        self.constraint_name.as_deref().unwrap_or("none")
    }

    pub fn on_delete_label(&self) -> &str {
        self.on_delete.map(|action| action.as_sql()).unwrap_or("none")
    }
}

/// Grouped rows whose convention-column value has no parent row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrphanedReference {
    pub table: String,
    pub column: String,
    pub offending_value: String,
    pub occurrence_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum IntegrityFinding {
    MissingForeignKey {
        table: String,
        column: String,
    },
    OrphanedReference {
        table: String,
        column: String,
        offending_value: String,
        occurrence_count: i64,
    },
}

impl From<OrphanedReference> for IntegrityFinding {
    fn from(value: OrphanedReference) -> Self {
        Self::OrphanedReference {
            table: value.table,
            column: value.column,
            offending_value: value.offending_value,
            occurrence_count: value.occurrence_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerAction {
    Installed,
    AlreadyPresent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub table: String,
    pub action: TriggerAction,
}
